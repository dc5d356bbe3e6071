//! Tunable configuration for the mouse layer, plus the persisted settings record.

use embassy_time::Duration;
use heapless::Vec;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;

/// Pointer settings persisted to flash.
///
/// Mutated only by the dedicated settings keys and written through to
/// storage immediately after each mutation. An explicit struct with named
/// fields; encoding happens at the storage boundary.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerSettings {
    /// Cumulative motion required before the click layer is raised.
    pub activation_distance: i16,
    /// Invert the vertical scroll direction.
    pub reverse_vertical_scroll: bool,
    /// Invert the horizontal scroll direction.
    pub reverse_horizontal_scroll: bool,
}

impl PointerSettings {
    /// Step applied by the activation distance adjust keys.
    pub const DISTANCE_STEP: i16 = 5;
    /// Lower clamp for the activation distance.
    pub const MIN_DISTANCE: i16 = 5;

    pub fn increase_activation_distance(&mut self) {
        self.activation_distance = self.activation_distance.saturating_add(Self::DISTANCE_STEP);
    }

    /// Lower the activation distance, clamped at [`Self::MIN_DISTANCE`].
    pub fn decrease_activation_distance(&mut self) {
        self.activation_distance = (self.activation_distance - Self::DISTANCE_STEP).max(Self::MIN_DISTANCE);
    }
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            activation_distance: 50,
            reverse_vertical_scroll: false,
            reverse_horizontal_scroll: false,
        }
    }
}

/// Config for the mouse layer controller.
#[derive(Clone, Debug)]
pub struct MouseLayerConfig {
    /// Keymap layer exposing the click/scroll key bindings.
    pub layer: u8,
    /// Inactivity timeout after which the click layer is dropped.
    pub layer_timeout: Duration,
    /// Gap after which partially accumulated motion is discarded.
    pub settle_timeout: Duration,
    /// Motion to suppress right after a button press, against accidental drags.
    pub lock_distance: i16,
    /// Motion per one vertical scroll step.
    pub scroll_v_threshold: i16,
    /// Motion per one horizontal scroll step.
    pub scroll_h_threshold: i16,
    /// Keys that keep the click layer up and still pass through, e.g. the
    /// modifiers used to chord with the mouse buttons.
    pub layer_hold_keys: Vec<KeyCode, 4>,
}

impl Default for MouseLayerConfig {
    fn default() -> Self {
        let mut layer_hold_keys = Vec::new();
        let _ = layer_hold_keys.push(KeyCode::LGui);
        let _ = layer_hold_keys.push(KeyCode::LCtrl);
        Self {
            layer: 8,
            layer_timeout: Duration::from_millis(1000),
            settle_timeout: Duration::from_millis(50),
            lock_distance: 30,
            scroll_v_threshold: 50,
            scroll_h_threshold: 50,
            layer_hold_keys,
        }
    }
}

/// Config for storage
#[derive(Clone, Copy, Debug)]
pub struct StorageConfig {
    /// Start address of local storage, MUST BE start of a sector.
    /// If start_addr is set to 0(this is the default value), the last `num_sectors` sectors will be used.
    pub start_addr: usize,
    // Number of sectors used for storage, >= 2.
    pub num_sectors: u8,
    pub clear_storage: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            start_addr: 0,
            num_sectors: 2,
            clear_storage: false,
        }
    }
}
