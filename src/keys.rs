//! Raw virtual-key codes delivered by the host input hook.
//!
//! Codes follow the conventional VK numbering so the hook can forward what
//! the OS hands it without remapping.

pub const VK_BACK: u16 = 0x08;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CAPITAL: u16 = 0x14;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_F1: u16 = 0x70;
pub const VK_F2: u16 = 0x71;
pub const VK_F3: u16 = 0x72;

/// The keys the console dispatch table reacts to. Everything else is carried
/// through as `Other` and handed to the keyboard layout for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualKey {
    Return,
    Escape,
    Backspace,
    F1,
    F2,
    F3,
    CapsLock,
    PageUp,
    PageDown,
    Other(u16),
}

impl VirtualKey {
    pub fn from_code(code: u16) -> Self {
        match code {
            VK_RETURN => VirtualKey::Return,
            VK_ESCAPE => VirtualKey::Escape,
            VK_BACK => VirtualKey::Backspace,
            VK_F1 => VirtualKey::F1,
            VK_F2 => VirtualKey::F2,
            VK_F3 => VirtualKey::F3,
            VK_CAPITAL => VirtualKey::CapsLock,
            VK_PRIOR => VirtualKey::PageUp,
            VK_NEXT => VirtualKey::PageDown,
            other => VirtualKey::Other(other),
        }
    }
}
