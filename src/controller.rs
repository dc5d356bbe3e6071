//! The mouse layer mode controller.
//!
//! A finite-state controller that turns raw relative pointer motion into
//! cursor movement, click-and-hold, drag scroll or directional scrolling,
//! raising a temporary keymap layer with the click/scroll bindings while the
//! pointer is active.
//!
//! Two entry points, both driven by [`crate::processor::MouseLayerProcessor`]:
//! [`MouseLayerController::process_key`] for discrete key transitions and
//! [`MouseLayerController::transform_report`] once per polling tick for
//! motion. Key events always win over motion-driven transitions within a
//! tick, because the processor handles them first.

use embassy_time::Instant;
use usbd_hid::descriptor::MouseReport;

#[cfg(feature = "storage")]
use crate::channel::FLASH_CHANNEL;
use crate::channel::MOUSE_REPORT_CHANNEL;
use crate::config::{MouseLayerConfig, PointerSettings};
use crate::hid::MouseButtons;
use crate::keycode::KeyCode;
use crate::layer::LayerSwitch;
use crate::state::MouseLayerState;
#[cfg(feature = "storage")]
use crate::storage::FlashOperationMessage;

/// Owns the whole mutable context of the mode controller. One instance per
/// device, alive for the device's uptime.
pub struct MouseLayerController<L: LayerSwitch> {
    state: MouseLayerState,
    /// Refreshed whenever the click layer is raised and on free movement.
    click_timer: Instant,
    /// Motion summed while `Accumulating`, reset on every mode exit.
    accumulated_movement: i16,
    /// Counts down while `ButtonHeld`; motion is suppressed until it crosses zero.
    after_click_lock: i16,
    scroll_v_counter: i16,
    scroll_h_counter: i16,
    /// Held semantics: true exactly while the drag scroll key is down.
    drag_scroll: bool,
    buttons: MouseButtons,
    settings: PointerSettings,
    config: MouseLayerConfig,
    layer: L,
}

impl<L: LayerSwitch> MouseLayerController<L> {
    pub fn new(config: MouseLayerConfig, settings: PointerSettings, layer: L) -> Self {
        Self {
            state: MouseLayerState::Idle,
            click_timer: Instant::now(),
            accumulated_movement: 0,
            after_click_lock: 0,
            scroll_v_counter: 0,
            scroll_h_counter: 0,
            drag_scroll: false,
            buttons: MouseButtons::new(),
            settings,
            config,
            layer,
        }
    }

    pub fn state(&self) -> MouseLayerState {
        self.state
    }

    pub fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    pub fn settings(&self) -> &PointerSettings {
        &self.settings
    }

    pub fn layer_switch(&self) -> &L {
        &self.layer
    }

    /// Raise the click layer and rearm the inactivity timer.
    fn enable_click_layer(&mut self) {
        self.layer.activate(self.config.layer);
        self.click_timer = Instant::now();
        self.state = MouseLayerState::LayerActive;
    }

    /// Drop the click layer and clear the scroll accumulators.
    fn disable_click_layer(&mut self) {
        self.state = MouseLayerState::Idle;
        self.layer.deactivate(self.config.layer);
        self.scroll_v_counter = 0;
        self.scroll_h_counter = 0;
    }

    /// Write-through save. Persistence is fire-and-forget: losing one update
    /// is user-visible but not critical, so there is no retry.
    async fn save_settings(&self) {
        #[cfg(feature = "storage")]
        FLASH_CHANNEL
            .send(FlashOperationMessage::PointerSettings(self.settings))
            .await;
    }

    /// Send a button-only report right away, without waiting for the next
    /// motion tick.
    async fn send_button_report(&self) {
        MOUSE_REPORT_CHANNEL
            .send(MouseReport {
                buttons: self.buttons.into_bits(),
                x: 0,
                y: 0,
                wheel: 0,
                pan: 0,
            })
            .await;
    }

    /// Handle one discrete key transition, ahead of normal key processing.
    ///
    /// Returns whether the key should still be processed normally (`true`)
    /// or is fully absorbed by the mouse layer (`false`).
    pub async fn process_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        match key {
            KeyCode::MouseBtn1 | KeyCode::MouseBtn2 | KeyCode::MouseBtn3 => {
                // Index is Some for the three button keys matched above.
                let button = match key.mouse_button_index() {
                    Some(index) => MouseButtons::from_index(index),
                    None => MouseButtons::new(),
                };
                if pressed {
                    self.buttons |= button;
                    self.after_click_lock = self.config.lock_distance;
                } else {
                    self.buttons &= !button;
                }
                // Rearms the timer on both edges; a press then holds the
                // button state, so the layer keeps up while clicking.
                self.enable_click_layer();
                if pressed {
                    self.state = MouseLayerState::ButtonHeld;
                }
                self.send_button_report().await;
                false
            }
            KeyCode::ScrollMode => {
                if pressed {
                    self.state = MouseLayerState::Scrolling;
                } else {
                    self.enable_click_layer();
                }
                false
            }
            KeyCode::ActivationDistanceInc => {
                if pressed {
                    self.settings.increase_activation_distance();
                    debug!("activation distance -> {}", self.settings.activation_distance);
                    self.save_settings().await;
                }
                false
            }
            KeyCode::ActivationDistanceDec => {
                if pressed {
                    self.settings.decrease_activation_distance();
                    debug!("activation distance -> {}", self.settings.activation_distance);
                    self.save_settings().await;
                }
                false
            }
            KeyCode::ScrollReverseV => {
                if pressed {
                    self.settings.reverse_vertical_scroll = !self.settings.reverse_vertical_scroll;
                    self.save_settings().await;
                }
                false
            }
            KeyCode::ScrollReverseH => {
                if pressed {
                    self.settings.reverse_horizontal_scroll = !self.settings.reverse_horizontal_scroll;
                    self.save_settings().await;
                }
                false
            }
            KeyCode::DragScroll => {
                self.drag_scroll = pressed;
                false
            }
            _ => {
                if pressed {
                    // While clicking or scrolling, any other key only dismisses
                    // back to the plain click layer and is absorbed.
                    if matches!(self.state, MouseLayerState::ButtonHeld | MouseLayerState::Scrolling) {
                        self.enable_click_layer();
                        return false;
                    }
                    // Chord modifiers keep the layer up and still pass through.
                    if self.config.layer_hold_keys.contains(&key) {
                        self.enable_click_layer();
                        return true;
                    }
                    // Typing cancels the layer so it does not linger.
                    self.disable_click_layer();
                }
                true
            }
        }
    }

    /// Transform the raw motion of one polling tick in place.
    ///
    /// Consumes `x`/`y` and fills `pan`/`wheel`; for any tick at most one of
    /// the motion pair and the scroll pair is non-zero. Buttons are owned by
    /// the key path and left untouched. Must be called every tick, also with
    /// zero motion, since the timeouts are polled here.
    pub fn transform_report(&mut self, report: &mut MouseReport) {
        let mut x = report.x as i16;
        let mut y = report.y as i16;
        let mut h = 0i16;
        let mut v = 0i16;

        if x != 0 || y != 0 {
            if self.drag_scroll {
                // Drag scroll wins over the state machine and leaves it alone.
                h = x;
                v = -y;
                x = 0;
                y = 0;
            } else {
                match self.state {
                    MouseLayerState::LayerActive => {
                        // Free movement keeps the layer alive.
                        self.click_timer = Instant::now();
                    }
                    MouseLayerState::ButtonHeld => {
                        self.after_click_lock = self.after_click_lock.saturating_sub(x.abs() + y.abs());
                        if self.after_click_lock > 0 {
                            x = 0;
                            y = 0;
                        }
                    }
                    MouseLayerState::Scrolling => {
                        (h, v) = self.quantize_scroll(x, y);
                        x = 0;
                        y = 0;
                    }
                    MouseLayerState::Accumulating => {
                        self.click_timer = Instant::now();
                        self.accumulated_movement = self.accumulated_movement.saturating_add(x.abs() + y.abs());
                        if self.accumulated_movement >= self.settings.activation_distance {
                            self.accumulated_movement = 0;
                            self.enable_click_layer();
                        }
                    }
                    MouseLayerState::Idle => {
                        self.click_timer = Instant::now();
                        self.accumulated_movement = 0;
                        self.state = MouseLayerState::Accumulating;
                    }
                }
            }
        } else {
            match self.state {
                // No timeout: these persist until a key event ends them.
                MouseLayerState::ButtonHeld | MouseLayerState::Scrolling => {}
                MouseLayerState::LayerActive => {
                    if self.click_timer.elapsed() > self.config.layer_timeout {
                        debug!("click layer timed out");
                        self.disable_click_layer();
                    }
                }
                MouseLayerState::Accumulating => {
                    if self.click_timer.elapsed() > self.config.settle_timeout {
                        self.accumulated_movement = 0;
                        self.state = MouseLayerState::Idle;
                    }
                }
                MouseLayerState::Idle => {
                    self.accumulated_movement = 0;
                }
            }
        }

        report.x = x.clamp(i8::MIN as i16, i8::MAX as i16) as i8;
        report.y = y.clamp(i8::MIN as i16, i8::MAX as i16) as i8;
        report.pan = h.clamp(i8::MIN as i16, i8::MAX as i16) as i8;
        report.wheel = v.clamp(i8::MIN as i16, i8::MAX as i16) as i8;
    }

    /// Convert motion into discrete scroll steps.
    ///
    /// The dominant axis (vertical when `2*|dy| > |dx|`) folds into its
    /// accumulator, which then drains in threshold-sized steps toward zero,
    /// one output unit per drained step. The other axis stays untouched, so
    /// only one axis scrolls per tick.
    fn quantize_scroll(&mut self, dx: i16, dy: i16) -> (i16, i16) {
        let mut h = 0i16;
        let mut v = 0i16;

        if dy.abs() * 2 > dx.abs() {
            self.scroll_v_counter += dy;
            let mut steps = 0i16;
            while self.scroll_v_counter.abs() > self.config.scroll_v_threshold {
                if self.scroll_v_counter < 0 {
                    self.scroll_v_counter += self.config.scroll_v_threshold;
                    steps += 1;
                } else {
                    self.scroll_v_counter -= self.config.scroll_v_threshold;
                    steps -= 1;
                }
            }
            // Moving the pointer down scrolls down, unless reversed.
            v = -steps * if self.settings.reverse_vertical_scroll { -1 } else { 1 };
        } else {
            self.scroll_h_counter += dx;
            let mut steps = 0i16;
            while self.scroll_h_counter.abs() > self.config.scroll_h_threshold {
                if self.scroll_h_counter < 0 {
                    self.scroll_h_counter += self.config.scroll_h_threshold;
                    steps += 1;
                } else {
                    self.scroll_h_counter -= self.config.scroll_h_threshold;
                    steps -= 1;
                }
            }
            h = steps * if self.settings.reverse_horizontal_scroll { -1 } else { 1 };
        }

        (h, v)
    }
}
