#[cfg(feature = "x11")]
pub mod x11;

// Modifiers we try to "unstick" when a backend opens or closes.
//
// The engine only ever holds Shift, but a previous aborted run or a key the
// user was holding may leave others down.
// Note: if a user is physically holding a modifier while this runs, the target app's
// perceived state may temporarily desync until the key is tapped again.
#[cfg_attr(not(feature = "x11"), allow(dead_code))]
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 5] = [
    crate::keyboard::KEY_LEFTSHIFT,
    crate::keyboard::KEY_RIGHTSHIFT,
    crate::keyboard::KEY_LEFTCTRL,
    crate::keyboard::KEY_RIGHTCTRL,
    crate::keyboard::KEY_LEFTALT,
];
