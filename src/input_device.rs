//! Input devices and the macros to run them.
//!
//! An input device produces [`Event`]s, one at a time, from its hardware.
//! The `run_devices!` macro binds any number of devices to an event channel
//! and runs them concurrently; the processors consume the other end.

use crate::event::Event;

/// The trait for input devices.
///
/// Devices are expected to wait (not spin) in `read_event` until the
/// hardware has something to report.
///
/// # Example
/// ```ignore
/// struct MyInputDevice;
///
/// impl InputDevice for MyInputDevice {
///     async fn read_event(&mut self) -> Event {
///         // Read the hardware
///     }
/// }
///
/// let mut d1 = MyInputDevice {};
/// let device_future = run_devices! {
///     (d1) => mouse_layer::channel::EVENT_CHANNEL,
/// };
/// ```
pub trait InputDevice {
    /// Read the raw input event.
    async fn read_event(&mut self) -> Event;
}

/// Macro to bind input devices to event channels and run all of them.
///
/// Each `(devices) => channel` group races its devices' `read_event` futures
/// and sends every event to the given channel; groups run concurrently.
#[macro_export]
macro_rules! run_devices {
    ( $( ( $( $dev:ident ),* ) => $channel:ident ),+ $(,)? ) => {{
        use $crate::futures::{self, future::FutureExt, select_biased};
        use $crate::input_device::InputDevice;
        $crate::join_all!(
            $(
                async {
                    loop {
                        let e = select_biased! {
                            $(
                                e = $dev.read_event().fuse() => e,
                            )*
                        };
                        $channel.send(e).await;
                    }
                }
            ),+
        )
    }};
}

/// Macro to bind input devices and an input processor directly, skipping
/// the shared channel.
#[macro_export]
macro_rules! bind_device_and_processor_and_run {
    (($( $dev:ident),*) => $proc:ident) => {
        async {
            use $crate::futures::{self, FutureExt, select_biased};
            use $crate::input_device::InputDevice;
            use $crate::processor::InputProcessor;
            loop {
                let e = select_biased! {
                    $(
                        e = $dev.read_event().fuse() => e,
                    )*
                };
                $proc.process(e).await;
            }
        }
    };
}

/// Helper macro for joining all futures
#[macro_export]
macro_rules! join_all {
    ($first:expr, $second:expr, $($rest:expr),*) => {
        $crate::futures::future::join(
            $first,
            $crate::join_all!($second, $($rest),*)
        )
    };
    ($a:expr, $b:expr) => {
        $crate::futures::future::join($a, $b)
    };
    ($single:expr) => { $single };
}
