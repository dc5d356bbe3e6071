//! Input events flowing from devices to the mouse layer processor.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;

/// A discrete physical key transition, delivered ahead of normal
/// key-to-action resolution.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub key: KeyCode,
    pub pressed: bool,
}

/// Raw relative motion for one polling tick, as reported by the sensor.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionEvent {
    pub dx: i16,
    pub dy: i16,
}

/// Events consumed by the mouse layer processor.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Key(KeyEvent),
    Motion(MotionEvent),
}
