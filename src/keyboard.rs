use crate::model::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_2: u32 = 3;
pub const KEY_3: u32 = 4;
pub const KEY_4: u32 = 5;
pub const KEY_5: u32 = 6;
pub const KEY_6: u32 = 7;
pub const KEY_7: u32 = 8;
pub const KEY_8: u32 = 9;
pub const KEY_9: u32 = 10;
pub const KEY_0: u32 = 11;
pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_TAB: u32 = 15;
pub const KEY_Q: u32 = 16;
pub const KEY_W: u32 = 17;
pub const KEY_E: u32 = 18;
pub const KEY_R: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_Y: u32 = 21;
pub const KEY_U: u32 = 22;
pub const KEY_I: u32 = 23;
pub const KEY_O: u32 = 24;
pub const KEY_P: u32 = 25;
pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_D: u32 = 32;
pub const KEY_F: u32 = 33;
pub const KEY_G: u32 = 34;
pub const KEY_H: u32 = 35;
pub const KEY_J: u32 = 36;
pub const KEY_K: u32 = 37;
pub const KEY_L: u32 = 38;
pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_BACKSLASH: u32 = 43;
pub const KEY_Z: u32 = 44;
pub const KEY_X: u32 = 45;
pub const KEY_C: u32 = 46;
pub const KEY_V: u32 = 47;
pub const KEY_B: u32 = 48;
pub const KEY_N: u32 = 49;
pub const KEY_M: u32 = 50;
pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_RIGHTCTRL: u32 = 97;

// (keycode, unshifted, shifted) for every printable key on a US layout.
const US_QWERTY: &[(u32, char, char)] = &[
    (KEY_GRAVE, '`', '~'),
    (KEY_1, '1', '!'),
    (KEY_2, '2', '@'),
    (KEY_3, '3', '#'),
    (KEY_4, '4', '$'),
    (KEY_5, '5', '%'),
    (KEY_6, '6', '^'),
    (KEY_7, '7', '&'),
    (KEY_8, '8', '*'),
    (KEY_9, '9', '('),
    (KEY_0, '0', ')'),
    (KEY_MINUS, '-', '_'),
    (KEY_EQUAL, '=', '+'),
    (KEY_Q, 'q', 'Q'),
    (KEY_W, 'w', 'W'),
    (KEY_E, 'e', 'E'),
    (KEY_R, 'r', 'R'),
    (KEY_T, 't', 'T'),
    (KEY_Y, 'y', 'Y'),
    (KEY_U, 'u', 'U'),
    (KEY_I, 'i', 'I'),
    (KEY_O, 'o', 'O'),
    (KEY_P, 'p', 'P'),
    (KEY_LEFTBRACE, '[', '{'),
    (KEY_RIGHTBRACE, ']', '}'),
    (KEY_BACKSLASH, '\\', '|'),
    (KEY_A, 'a', 'A'),
    (KEY_S, 's', 'S'),
    (KEY_D, 'd', 'D'),
    (KEY_F, 'f', 'F'),
    (KEY_G, 'g', 'G'),
    (KEY_H, 'h', 'H'),
    (KEY_J, 'j', 'J'),
    (KEY_K, 'k', 'K'),
    (KEY_L, 'l', 'L'),
    (KEY_SEMICOLON, ';', ':'),
    (KEY_APOSTROPHE, '\'', '"'),
    (KEY_Z, 'z', 'Z'),
    (KEY_X, 'x', 'X'),
    (KEY_C, 'c', 'C'),
    (KEY_V, 'v', 'V'),
    (KEY_B, 'b', 'B'),
    (KEY_N, 'n', 'N'),
    (KEY_M, 'm', 'M'),
    (KEY_COMMA, ',', '<'),
    (KEY_DOT, '.', '>'),
    (KEY_SLASH, '/', '?'),
];

/// The ASCII character actually typed for `c`.
pub fn typed_char_for_output_char(c: char) -> Option<char> {
    match c {
        // Smart quotes are left to the editor's auto-substitution.
        '’' | '‘' => Some('\''),
        '”' | '“' => Some('"'),
        '\t' | '\n' | ' ' => Some(c),
        c if c.is_ascii_graphic() => Some(c),
        _ => None,
    }
}

pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    let unshifted = |keycode| KeyStroke {
        keycode,
        shift: false,
    };
    match c {
        ' ' => return Some(unshifted(KEY_SPACE)),
        '\n' => return Some(unshifted(KEY_ENTER)),
        '\t' => return Some(unshifted(KEY_TAB)),
        _ => {}
    }

    US_QWERTY.iter().find_map(|&(keycode, plain, shifted)| {
        if c == plain {
            Some(unshifted(keycode))
        } else if c == shifted {
            Some(KeyStroke {
                keycode,
                shift: true,
            })
        } else {
            None
        }
    })
}

pub fn keystroke_for_key(key: Key) -> Option<KeyStroke> {
    match key {
        Key::Enter => char_to_keystroke('\n'),
        Key::Backspace => Some(KeyStroke {
            keycode: KEY_BACKSPACE,
            shift: false,
        }),
        Key::Char(c) => typed_char_for_output_char(c).and_then(char_to_keystroke),
    }
}

/// First character of `text` the US layout cannot type, with its byte offset.
pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| keystroke_for_key(Key::Char(c)).is_none())
}
