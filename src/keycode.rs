//! Key identifiers consumed by the mouse layer dispatcher.
//!
//! The dispatcher sits ahead of normal key-to-action resolution, so it sees
//! every key transition as a [`KeyCode`]. Standard keys use their HID usage
//! ids; the keys the mouse layer intercepts live in a custom block above the
//! HID range, like QMK's `SAFE_RANGE` keycodes.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};
use strum::FromRepr;

/// Start of the custom keycode block.
pub const CUSTOM_KEYCODE_START: u16 = 0x200;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, FromRepr, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum KeyCode {
    /// Reserved, no-op key. Unknown keycodes map here via [`KeyCode::from_u16`].
    No = 0x0000,
    A = 0x0004,
    B = 0x0005,
    C = 0x0006,
    D = 0x0007,
    E = 0x0008,
    F = 0x0009,
    G = 0x000A,
    H = 0x000B,
    I = 0x000C,
    J = 0x000D,
    K = 0x000E,
    L = 0x000F,
    M = 0x0010,
    N = 0x0011,
    O = 0x0012,
    P = 0x0013,
    Q = 0x0014,
    R = 0x0015,
    S = 0x0016,
    T = 0x0017,
    U = 0x0018,
    V = 0x0019,
    W = 0x001A,
    X = 0x001B,
    Y = 0x001C,
    Z = 0x001D,
    Kc1 = 0x001E,
    Kc2 = 0x001F,
    Kc3 = 0x0020,
    Kc4 = 0x0021,
    Kc5 = 0x0022,
    Kc6 = 0x0023,
    Kc7 = 0x0024,
    Kc8 = 0x0025,
    Kc9 = 0x0026,
    Kc0 = 0x0027,
    Enter = 0x0028,
    Escape = 0x0029,
    Backspace = 0x002A,
    Tab = 0x002B,
    Space = 0x002C,
    Right = 0x004F,
    Left = 0x0050,
    Down = 0x0051,
    Up = 0x0052,
    LCtrl = 0x00E0,
    LShift = 0x00E1,
    LAlt = 0x00E2,
    LGui = 0x00E3,
    RCtrl = 0x00E4,
    RShift = 0x00E5,
    RAlt = 0x00E6,
    RGui = 0x00E7,
    /// Mouse button 1 (left), intercepted by the mouse layer.
    MouseBtn1 = 0x0200,
    /// Mouse button 2 (right), intercepted by the mouse layer.
    MouseBtn2 = 0x0201,
    /// Mouse button 3 (middle), intercepted by the mouse layer.
    MouseBtn3 = 0x0202,
    /// Hold to convert motion into scroll steps.
    ScrollMode = 0x0203,
    /// Raise the activation distance by one step.
    ActivationDistanceInc = 0x0204,
    /// Lower the activation distance by one step.
    ActivationDistanceDec = 0x0205,
    /// Toggle the vertical scroll direction.
    ScrollReverseV = 0x0206,
    /// Toggle the horizontal scroll direction.
    ScrollReverseH = 0x0207,
    /// Hold to reinterpret all motion as scroll (drag scroll).
    DragScroll = 0x0208,
}

impl KeyCode {
    /// Convert a raw keycode, falling back to [`KeyCode::No`] for unknown values.
    pub fn from_u16(value: u16) -> Self {
        Self::from_repr(value).unwrap_or(KeyCode::No)
    }

    /// Whether this key is one of the intercepted mouse buttons.
    pub fn is_mouse_button(self) -> bool {
        matches!(self, KeyCode::MouseBtn1 | KeyCode::MouseBtn2 | KeyCode::MouseBtn3)
    }

    /// Zero-based index of a mouse button key, `None` for other keys.
    pub fn mouse_button_index(self) -> Option<u8> {
        if self.is_mouse_button() {
            Some((self as u16 - KeyCode::MouseBtn1 as u16) as u8)
        } else {
            None
        }
    }
}
