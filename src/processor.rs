//! Input processors which process the event from input devices.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Timer};
use usbd_hid::descriptor::MouseReport;

use crate::channel::{EVENT_CHANNEL, KEY_FORWARD_CHANNEL, MOUSE_REPORT_CHANNEL};
use crate::controller::MouseLayerController;
use crate::event::Event;
use crate::layer::LayerSwitch;

/// An input processor takes events from the event channel and turns them
/// into mouse reports.
pub trait InputProcessor {
    /// Process one incoming event.
    async fn process(&mut self, event: Event);

    /// Read one event from the event channel.
    ///
    /// By default, this reads the shared [`EVENT_CHANNEL`].
    async fn read_event(&self) -> Event {
        EVENT_CHANNEL.receive().await
    }

    /// Send a processed report to the transport task.
    async fn send_report(&self, report: MouseReport) {
        MOUSE_REPORT_CHANNEL.send(report).await
    }

    /// Default implementation of the processor loop.
    async fn run(&mut self) {
        loop {
            let event = self.read_event().await;
            self.process(event).await;
        }
    }
}

/// A processor with an internal polling period.
///
/// The mouse layer timeouts are polled, so the processor has to run even
/// when no events arrive. `poll` fires once per interval of event silence;
/// events arriving within the interval are processed immediately.
pub trait PollingProcessor: InputProcessor {
    /// The polling interval.
    fn interval(&self) -> Duration;

    /// Called once per interval when no event arrived.
    async fn poll(&mut self);

    /// Processor loop interleaving events with the polling tick.
    async fn run_polling(&mut self) {
        loop {
            match select(Timer::after(self.interval()), self.read_event()).await {
                Either::First(_) => self.poll().await,
                Either::Second(event) => self.process(event).await,
            }
        }
    }
}

/// The processor wiring the [`MouseLayerController`] to the channels.
///
/// Key events go through the controller's dispatcher first; absorbed keys
/// stop here, the rest is forwarded to [`KEY_FORWARD_CHANNEL`] for normal
/// keymap processing. Motion events are folded into a mouse report through
/// the controller's per-tick transform. A zero-motion transform runs once
/// per polling interval so the timeouts make progress during idle spans.
pub struct MouseLayerProcessor<L: LayerSwitch> {
    controller: MouseLayerController<L>,
    interval: Duration,
}

impl<L: LayerSwitch> MouseLayerProcessor<L> {
    pub fn new(controller: MouseLayerController<L>) -> Self {
        Self {
            controller,
            interval: Duration::from_millis(1),
        }
    }

    pub fn controller(&self) -> &MouseLayerController<L> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MouseLayerController<L> {
        &mut self.controller
    }

    /// Run one motion tick through the controller and send the report if it
    /// carries anything.
    async fn motion_tick(&mut self, dx: i16, dy: i16) {
        let mut report = MouseReport {
            buttons: self.controller.buttons().into_bits(),
            x: dx.clamp(i8::MIN as i16, i8::MAX as i16) as i8,
            y: dy.clamp(i8::MIN as i16, i8::MAX as i16) as i8,
            wheel: 0,
            pan: 0,
        };
        self.controller.transform_report(&mut report);
        if report.x != 0 || report.y != 0 || report.wheel != 0 || report.pan != 0 {
            self.send_report(report).await;
        }
    }
}

impl<L: LayerSwitch> InputProcessor for MouseLayerProcessor<L> {
    async fn process(&mut self, event: Event) {
        match event {
            Event::Key(key_event) => {
                trace!("key event: {:?}", key_event);
                if self.controller.process_key(key_event.key, key_event.pressed).await {
                    KEY_FORWARD_CHANNEL.send(key_event).await;
                }
            }
            Event::Motion(motion) => {
                self.motion_tick(motion.dx, motion.dy).await;
            }
        }
    }
}

impl<L: LayerSwitch> PollingProcessor for MouseLayerProcessor<L> {
    fn interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) {
        // Zero motion, drives the timeout branches.
        self.motion_tick(0, 0).await;
    }
}
