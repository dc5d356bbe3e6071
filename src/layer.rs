//! Seam to the host firmware's layer mechanism.

/// Raises and lowers a keymap layer.
///
/// Implemented by the host firmware's keymap. Both operations are expected
/// to be idempotent and immediate; the controller may call them redundantly.
pub trait LayerSwitch {
    fn activate(&mut self, layer: u8);
    fn deactivate(&mut self, layer: u8);
}
