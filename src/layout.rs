//! Key-to-character translation given a synthetic modifier vector.
//!
//! Shift is probed live from the OS at translation time; caps-lock state is
//! the session's own toggle so a software caps indicator stays consistent
//! even when the OS LED state drifts (global-hotkey quirks on some hosts).

use crate::keys::{VK_RETURN, VK_SHIFT};

/// Synthetic modifier vector handed to the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub shift: bool,
    pub caps_lock: bool,
}

/// Zero, one, or two character codes for a single key. Two characters come
/// out of dead-key composition; both are appended to the edit buffer in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    None,
    One(char),
    Two(char, char),
}

impl Translation {
    pub fn append_to(self, buffer: &mut String) {
        match self {
            Translation::None => {}
            Translation::One(ch) => buffer.push(ch),
            Translation::Two(first, second) => {
                buffer.push(first);
                buffer.push(second);
            }
        }
    }
}

/// Locale-aware key-to-character mapping. The shipped [`UsLayout`] covers the
/// US map; hosts with other locales implement this against their own OS call.
pub trait KeyboardLayout: Send {
    fn translate(&self, code: u16, mods: ModifierState) -> Translation;
}

/// Live key-state queries against the OS input layer. The session asks for
/// shift on every translation and for the Return key on every hidden-side
/// poll tick.
pub trait KeyStateProbe: Send {
    fn key_down(&self, code: u16) -> bool;

    /// OS caps-lock toggle state, sampled once when the console opens to seed
    /// the session's own toggle.
    fn caps_lock_on(&self) -> bool;

    fn shift_down(&self) -> bool {
        self.key_down(VK_SHIFT)
    }

    fn return_down(&self) -> bool {
        self.key_down(VK_RETURN)
    }
}

/// Fixed probe for headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticKeyState {
    pub shift: bool,
    pub caps_lock: bool,
    pub return_key: bool,
}

impl KeyStateProbe for StaticKeyState {
    fn key_down(&self, code: u16) -> bool {
        match code {
            VK_SHIFT => self.shift,
            VK_RETURN => self.return_key,
            _ => false,
        }
    }

    fn caps_lock_on(&self) -> bool {
        self.caps_lock
    }
}

/// US keyboard map over raw virtual-key codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsLayout;

impl KeyboardLayout for UsLayout {
    fn translate(&self, code: u16, mods: ModifierState) -> Translation {
        match code {
            // Letters: caps-lock flips the shift casing.
            0x41..=0x5A => {
                let base = (b'a' + (code - 0x41) as u8) as char;
                if mods.shift != mods.caps_lock {
                    Translation::One(base.to_ascii_uppercase())
                } else {
                    Translation::One(base)
                }
            }
            // Digit row: shift selects the symbol, caps-lock is ignored.
            0x30..=0x39 => {
                let index = (code - 0x30) as usize;
                if mods.shift {
                    Translation::One(DIGIT_SHIFTED[index])
                } else {
                    Translation::One((b'0' + index as u8) as char)
                }
            }
            0x20 => Translation::One(' '),
            // Numpad digits and operators are unaffected by modifiers.
            0x60..=0x69 => Translation::One((b'0' + (code - 0x60) as u8) as char),
            0x6A => Translation::One('*'),
            0x6B => Translation::One('+'),
            0x6D => Translation::One('-'),
            0x6E => Translation::One('.'),
            0x6F => Translation::One('/'),
            // OEM punctuation.
            0xBA => shifted(mods, ';', ':'),
            0xBB => shifted(mods, '=', '+'),
            0xBC => shifted(mods, ',', '<'),
            0xBD => shifted(mods, '-', '_'),
            0xBE => shifted(mods, '.', '>'),
            0xBF => shifted(mods, '/', '?'),
            0xC0 => shifted(mods, '`', '~'),
            0xDB => shifted(mods, '[', '{'),
            0xDC => shifted(mods, '\\', '|'),
            0xDD => shifted(mods, ']', '}'),
            0xDE => shifted(mods, '\'', '"'),
            _ => Translation::None,
        }
    }
}

const DIGIT_SHIFTED: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

fn shifted(mods: ModifierState, plain: char, with_shift: char) -> Translation {
    if mods.shift {
        Translation::One(with_shift)
    } else {
        Translation::One(plain)
    }
}
