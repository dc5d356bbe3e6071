#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod channel;
pub mod config;
pub mod controller;
pub mod event;
pub mod hid;
pub mod input_device;
pub mod keycode;
pub mod layer;
pub mod pointing;
pub mod processor;
pub mod state;
#[cfg(feature = "storage")]
pub mod storage;

// Re-exported for the macros in `input_device`.
pub use {embassy_futures, futures};

/// Size of the channel for input events from devices.
pub const EVENT_CHANNEL_SIZE: usize = 16;
/// Size of the channel for key events forwarded to normal key processing.
pub const KEY_FORWARD_CHANNEL_SIZE: usize = 16;
/// Size of the channel for final mouse reports.
pub const REPORT_CHANNEL_SIZE: usize = 16;
/// Size of the channel for flash operations.
#[cfg(feature = "storage")]
pub const FLASH_CHANNEL_SIZE: usize = 4;

/// The mutex type used by all channels in this crate.
pub type RawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
