//! Operating state of the mouse layer controller.

/// The mutually exclusive operating states. Exactly one is active per tick;
/// transitions happen only in the key dispatcher and the per-tick transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseLayerState {
    /// No recent pointer activity, the click layer is down.
    #[default]
    Idle,
    /// Motion seen recently, summing it towards the activation distance.
    Accumulating,
    /// The click layer is up, the cursor moves freely.
    LayerActive,
    /// A mouse button is held; motion is locked briefly after the press.
    ButtonHeld,
    /// Motion is converted into scroll steps.
    Scrolling,
}

impl MouseLayerState {
    /// Whether the click layer is up in this state.
    pub fn is_layer_active(self) -> bool {
        matches!(
            self,
            MouseLayerState::LayerActive | MouseLayerState::ButtonHeld | MouseLayerState::Scrolling
        )
    }
}
