use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GetInputFocusReply};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use crate::emitter::KeystrokeEmitter;
use crate::keyboard::{keystroke_for_key, KeyStroke, KEY_LEFTSHIFT};
use crate::model::{Key, KeyState};
use crate::playback::backends::COMMON_MODIFIER_KEYCODES;

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn key_state_to_x11_event_type(state: KeyState) -> u8 {
    match state {
        KeyState::Pressed => xproto::KEY_PRESS_EVENT,
        KeyState::Released => xproto::KEY_RELEASE_EVENT,
    }
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }

    let _ = conn
        .xtest_get_version(2, 2)
        .ok()
        .and_then(|cookie| cookie.reply().ok());

    Ok(())
}

fn get_focus(conn: &impl Connection) -> Result<GetInputFocusReply> {
    conn.get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")
}

fn require_explicit_focus(conn: &impl Connection) -> Result<()> {
    // X11 special focus value: PointerRoot means the focused window follows the pointer.
    const POINTER_ROOT: xproto::Window = 1;

    let focus = get_focus(conn)?;
    if focus.focus == x11rb::NONE {
        return Err(anyhow!(
            "no X11 input focus detected; click into the target window before typing starts"
        ));
    }
    if focus.focus == POINTER_ROOT {
        return Err(anyhow!(
            "X11 input focus is set to PointerRoot; click into the target window to give it explicit focus"
        ));
    }
    Ok(())
}

fn keysym_for_keycode(conn: &impl Connection, keycode: u8, index: usize) -> Result<xproto::Keysym> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .context("failed to request keyboard mapping")?
        .reply()
        .context("failed to read keyboard mapping")?;

    if reply.keysyms_per_keycode == 0 {
        return Err(anyhow!("X server returned 0 keysyms per keycode"));
    }

    Ok(reply
        .keysyms
        .get(index)
        .copied()
        .unwrap_or(x11rb::NO_SYMBOL))
}

/// Checks a few representative keys against the US layout the keycode
/// table assumes. For Latin-1, X11 keysyms equal the character code.
fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    for (plain, shifted) in [('a', 'A'), ('q', 'Q'), ('1', '!'), ('-', '_'), ('\'', '"')] {
        let stroke = crate::keyboard::char_to_keystroke(plain)
            .ok_or_else(|| anyhow!("no keystroke for {plain:?}"))?;
        let keycode = evdev_to_x11_keycode(stroke.keycode)?;
        let got0 = keysym_for_keycode(conn, keycode, 0)?;
        let got1 = keysym_for_keycode(conn, keycode, 1)?;

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(anyhow!(
                "X11 backend could not validate the X server keymap (keycode {keycode}: got {got0:#x}/{got1:#x}). This backend assumes X11 keycodes are evdev+8 and requires a US keymap."
            ));
        }

        if got0 != plain as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but the X server keymap does not match (keycode {keycode}: got {got0:#x}/{got1:#x}). Try `setxkbmap us`."
            ));
        }
    }

    Ok(())
}

fn xtest_key(
    conn: &impl Connection,
    root: xproto::Window,
    keycode: u8,
    state: KeyState,
) -> Result<()> {
    let type_ = key_state_to_x11_event_type(state);
    conn.xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, root, 0, 0, 0)
        .context("failed to send XTEST fake input")?;
    Ok(())
}

fn reset_common_modifiers_best_effort(conn: &impl Connection, root: xproto::Window) {
    // Releases may be sent for keys that are not down; X ignores those.
    for keycode in COMMON_MODIFIER_KEYCODES {
        if let Ok(code) = evdev_to_x11_keycode(keycode) {
            let _ = xtest_key(conn, root, code, KeyState::Released);
        }
    }
    let _ = conn.flush();
}

/// Injects key events into the focused X11 window through XTEST.
pub struct X11Emitter {
    conn: RustConnection,
    root: xproto::Window,
    focus_checked: bool,
}

impl X11Emitter {
    /// Connects to `$DISPLAY` and checks XTEST and the keymap. Input focus is
    /// checked on the first keystroke so the user can focus the target window
    /// during the start delay.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;

        // X11 has no per-client modifier state; start from a neutral one.
        reset_common_modifiers_best_effort(&conn, root);
        tracing::debug!(screen = screen_num, "connected to X11 for XTEST input");

        Ok(Self {
            conn,
            root,
            focus_checked: false,
        })
    }

    fn stroke(key: Key) -> Result<KeyStroke> {
        keystroke_for_key(key)
            .ok_or_else(|| anyhow!("{} cannot be typed on a US layout", key.label()))
    }

    fn send(&self, evdev_keycode: u32, state: KeyState) -> Result<()> {
        let keycode = evdev_to_x11_keycode(evdev_keycode)?;
        xtest_key(&self.conn, self.root, keycode, state)
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush().context("failed to flush X11 connection")?;
        Ok(())
    }
}

impl KeystrokeEmitter for X11Emitter {
    fn press(&mut self, key: Key) -> Result<()> {
        if !self.focus_checked {
            require_explicit_focus(&self.conn)?;
            self.focus_checked = true;
        }

        let stroke = Self::stroke(key)?;
        if stroke.shift {
            self.send(KEY_LEFTSHIFT, KeyState::Pressed)?;
        }
        self.send(stroke.keycode, KeyState::Pressed)?;
        self.flush()
    }

    fn release(&mut self, key: Key) -> Result<()> {
        let stroke = Self::stroke(key)?;
        self.send(stroke.keycode, KeyState::Released)?;
        if stroke.shift {
            self.send(KEY_LEFTSHIFT, KeyState::Released)?;
        }
        self.flush()
    }
}

impl Drop for X11Emitter {
    fn drop(&mut self) {
        reset_common_modifiers_best_effort(&self.conn, self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evdev_keycodes_are_offset_by_eight() {
        assert_eq!(evdev_to_x11_keycode(crate::keyboard::KEY_A).unwrap(), 38);
        assert!(evdev_to_x11_keycode(300).is_err());
    }

    #[test]
    fn key_states_map_to_x11_event_types() {
        assert_eq!(
            key_state_to_x11_event_type(KeyState::Pressed),
            xproto::KEY_PRESS_EVENT
        );
        assert_eq!(
            key_state_to_x11_event_type(KeyState::Released),
            xproto::KEY_RELEASE_EVENT
        );
    }
}
