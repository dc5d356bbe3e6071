//! Mouse button state and the HID report type sent to the host.
//!
//! The output report is [`usbd_hid::descriptor::MouseReport`]; this module
//! adds the button bitset the key dispatcher maintains.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use bitfield_struct::bitfield;
pub use usbd_hid::descriptor::MouseReport;

/// Mouse buttons
#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Eq, PartialEq)]
pub struct MouseButtons {
    #[bits(1)]
    pub button1: bool, //left
    #[bits(1)]
    pub button2: bool, //right
    #[bits(1)]
    pub button3: bool, //middle
    #[bits(5)]
    _reserved: u8,
}

impl BitOr for MouseButtons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}
impl BitAnd for MouseButtons {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() & rhs.into_bits())
    }
}
impl Not for MouseButtons {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_bits(!self.into_bits())
    }
}
impl BitAndAssign for MouseButtons {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}
impl BitOrAssign for MouseButtons {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl MouseButtons {
    pub const BUTTON1: Self = Self::new().with_button1(true);
    pub const BUTTON2: Self = Self::new().with_button2(true);
    pub const BUTTON3: Self = Self::new().with_button3(true);

    /// Button bit for a zero-based button index.
    pub const fn from_index(index: u8) -> Self {
        Self::from_bits(1 << index)
    }

    /// Whether no button is pressed.
    pub const fn is_empty(self) -> bool {
        self.into_bits() == 0
    }
}
