use anyhow::Result;

use crate::model::{Key, KeyEvent, KeyState};

/// Side-effect sink for key events.
///
/// The engine always calls `press` and `release` as a pair for one key
/// before touching the next.
pub trait KeystrokeEmitter {
    fn press(&mut self, key: Key) -> Result<()>;
    fn release(&mut self, key: Key) -> Result<()>;
}

impl<E: KeystrokeEmitter + ?Sized> KeystrokeEmitter for Box<E> {
    fn press(&mut self, key: Key) -> Result<()> {
        (**self).press(key)
    }

    fn release(&mut self, key: Key) -> Result<()> {
        (**self).release(key)
    }
}

/// Press then release `key`.
pub fn tap<E: KeystrokeEmitter + ?Sized>(emitter: &mut E, key: Key) -> Result<()> {
    emitter.press(key)?;
    emitter.release(key)
}

/// Sends every event to two emitters, `primary` first.
#[derive(Debug)]
pub struct Tee<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: KeystrokeEmitter, B: KeystrokeEmitter> KeystrokeEmitter for Tee<A, B> {
    fn press(&mut self, key: Key) -> Result<()> {
        self.primary.press(key)?;
        self.secondary.press(key)
    }

    fn release(&mut self, key: Key) -> Result<()> {
        self.primary.release(key)?;
        self.secondary.release(key)
    }
}

/// Keeps every event in memory. Used for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingEmitter {
    events: Vec<KeyEvent>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    /// Keys in the order they were pressed.
    pub fn pressed_keys(&self) -> Vec<Key> {
        self.events
            .iter()
            .filter(|e| e.state == KeyState::Pressed)
            .map(|e| e.key)
            .collect()
    }

    /// Replays the presses into the text an editor would end up with.
    pub fn typed_text(&self) -> String {
        let mut buf = Vec::new();
        for key in self.pressed_keys() {
            match key {
                Key::Char(c) => buf.push(c),
                Key::Enter => buf.push('\n'),
                Key::Backspace => {
                    buf.pop();
                }
            }
        }
        buf.into_iter().collect()
    }
}

impl KeystrokeEmitter for RecordingEmitter {
    fn press(&mut self, key: Key) -> Result<()> {
        self.events.push(KeyEvent::pressed(key));
        Ok(())
    }

    fn release(&mut self, key: Key) -> Result<()> {
        self.events.push(KeyEvent::released(key));
        Ok(())
    }
}

/// Prints what would be typed instead of touching an input device.
///
/// Typos are shown in yellow; the character that follows a correction
/// is printed after the backspace marker.
#[derive(Debug)]
pub struct ConsoleTraceEmitter {
    line: String,
}

impl ConsoleTraceEmitter {
    const RESET: &'static str = "\x1b[0m";
    const TYPING: &'static str = "\x1b[34m";
    const REPLACE: &'static str = "\x1b[33m";

    pub fn new() -> Self {
        Self {
            line: String::new(),
        }
    }

    fn flush_line(&mut self) {
        if !self.line.is_empty() {
            eprintln!("{}Typing{} {}", Self::TYPING, Self::RESET, self.line);
            self.line.clear();
        }
    }
}

impl Default for ConsoleTraceEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl KeystrokeEmitter for ConsoleTraceEmitter {
    fn press(&mut self, key: Key) -> Result<()> {
        match key {
            Key::Char(c) => self.line.push(c),
            Key::Enter => self.flush_line(),
            Key::Backspace => {
                if let Some(wrong) = self.line.pop() {
                    self.flush_line();
                    eprintln!(
                        "{}Replace{} {wrong:?} (typo)",
                        Self::REPLACE,
                        Self::RESET
                    );
                }
            }
        }
        Ok(())
    }

    fn release(&mut self, _key: Key) -> Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleTraceEmitter {
    fn drop(&mut self) {
        self.flush_line();
    }
}
