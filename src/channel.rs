//! Exposed channels which can be used to share data across devices & processors

use embassy_sync::channel::Channel;
pub use embassy_sync::{blocking_mutex, channel};
use usbd_hid::descriptor::MouseReport;

use crate::event::{Event, KeyEvent};
#[cfg(feature = "storage")]
use crate::storage::FlashOperationMessage;
#[cfg(feature = "storage")]
use crate::FLASH_CHANNEL_SIZE;
use crate::{EVENT_CHANNEL_SIZE, KEY_FORWARD_CHANNEL_SIZE, RawMutex, REPORT_CHANNEL_SIZE};

/// Channel of input events from devices to the mouse layer processor.
pub static EVENT_CHANNEL: Channel<RawMutex, Event, EVENT_CHANNEL_SIZE> = Channel::new();

/// Key events the dispatcher let through, to be consumed by the normal
/// keymap processing task.
pub static KEY_FORWARD_CHANNEL: Channel<RawMutex, KeyEvent, KEY_FORWARD_CHANNEL_SIZE> = Channel::new();

/// Final mouse reports for the transport (USB/BLE) task.
pub static MOUSE_REPORT_CHANNEL: Channel<RawMutex, MouseReport, REPORT_CHANNEL_SIZE> = Channel::new();

/// Channel of write-through settings saves, consumed by the storage task.
#[cfg(feature = "storage")]
pub static FLASH_CHANNEL: Channel<RawMutex, FlashOperationMessage, FLASH_CHANNEL_SIZE> = Channel::new();
