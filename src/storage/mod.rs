//! Flash-backed persistence for the pointer settings.
//!
//! A thin wear-leveled key-value store built on `sequential-storage`. The
//! controller publishes write-through saves on [`FLASH_CHANNEL`]; the
//! storage task consumes them in [`Storage::run`]. Saves are best effort,
//! a failed write costs one settings update and nothing else.

pub mod dummy_flash;

use core::ops::Range;

use byteorder::{BigEndian, ByteOrder};
use embassy_embedded_hal::adapter::BlockingAsync;
use embedded_storage::nor_flash::NorFlash;
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use sequential_storage::Error as SSError;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{SerializationError, Value, fetch_item, store_item};

use crate::channel::FLASH_CHANNEL;
use crate::config::{PointerSettings, StorageConfig};

/// Bumped when the on-flash encoding of any record changes; a mismatch
/// invalidates the stored data on boot.
pub(crate) const STORAGE_FORMAT_VERSION: u32 = 1;

/// Message sent to the storage task, which will do the saving or clearing
/// operation.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashOperationMessage {
    /// Pointer settings to be saved
    PointerSettings(PointerSettings),
    /// Clear the storage
    Reset,
}

/// StorageKeys is the prefix byte stored in the flash, it's used to identify
/// the type of the stored data.
///
/// The whole storage item is a Rust enum due to the limitation of
/// `sequential_storage`. When deserializing, the first byte of the stored
/// data tells how to parse the rest.
#[repr(u32)]
pub(crate) enum StorageKeys {
    StorageConfig,
    PointerSettings,
}

impl StorageKeys {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKeys::StorageConfig),
            1 => Some(StorageKeys::PointerSettings),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum StorageData {
    StorageConfig(LocalStorageConfig),
    PointerSettings(PointerSettings),
}

impl Value<'_> for StorageData {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.len() < 6 {
            return Err(SerializationError::BufferTooSmall);
        }
        match self {
            StorageData::StorageConfig(c) => {
                buffer[0] = StorageKeys::StorageConfig as u8;
                // If enabled, write 0 to flash (1 is the erased state).
                if c.enable {
                    buffer[1] = 0;
                } else {
                    buffer[1] = 1;
                }
                BigEndian::write_u32(&mut buffer[2..6], c.format_version);
                Ok(6)
            }
            StorageData::PointerSettings(settings) => {
                buffer[0] = StorageKeys::PointerSettings as u8;
                let serialized = postcard::to_slice(settings, &mut buffer[1..])
                    .map_err(|_| SerializationError::BufferTooSmall)?;
                Ok(1 + serialized.len())
            }
        }
    }

    fn deserialize_from(buffer: &[u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        if buffer.is_empty() {
            return Err(SerializationError::InvalidFormat);
        }
        if let Some(key_type) = StorageKeys::from_u8(buffer[0]) {
            match key_type {
                StorageKeys::StorageConfig => {
                    if buffer.len() < 6 {
                        return Err(SerializationError::BufferTooSmall);
                    }
                    // 1 is the initial state of flash, so it means storage is NOT initialized
                    if buffer[1] == 1 {
                        Ok(StorageData::StorageConfig(LocalStorageConfig {
                            enable: false,
                            format_version: STORAGE_FORMAT_VERSION,
                        }))
                    } else {
                        let format_version = BigEndian::read_u32(&buffer[2..6]);
                        Ok(StorageData::StorageConfig(LocalStorageConfig {
                            enable: true,
                            format_version,
                        }))
                    }
                }
                StorageKeys::PointerSettings => {
                    let settings =
                        postcard::from_bytes(&buffer[1..]).map_err(|_| SerializationError::InvalidData)?;
                    Ok(StorageData::PointerSettings(settings))
                }
            }
        } else {
            Err(SerializationError::Custom(1))
        }
    }
}

impl StorageData {
    fn key(&self) -> u32 {
        match self {
            StorageData::StorageConfig(_) => StorageKeys::StorageConfig as u32,
            StorageData::PointerSettings(_) => StorageKeys::PointerSettings as u32,
        }
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct LocalStorageConfig {
    enable: bool,
    format_version: u32,
}

pub fn async_flash_wrapper<F: NorFlash>(flash: F) -> BlockingAsync<F> {
    embassy_embedded_hal::adapter::BlockingAsync::new(flash)
}

pub struct Storage<F: AsyncNorFlash> {
    pub(crate) flash: F,
    pub(crate) storage_range: Range<u32>,
    pub(crate) buffer: [u8; get_buffer_size()],
}

impl<F: AsyncNorFlash> Storage<F> {
    pub async fn new(flash: F, default_settings: &PointerSettings, config: &StorageConfig) -> Self {
        assert!(
            config.num_sectors >= 2,
            "Number of used sector for storage must larger than 1"
        );

        let start_addr = config.start_addr;

        info!(
            "Flash capacity {} KB, using {} KB({} sectors) starting from 0x{:X} as storage",
            flash.capacity() / 1024,
            (F::ERASE_SIZE * config.num_sectors as usize) / 1024,
            config.num_sectors,
            config.start_addr,
        );

        // start_addr == 0 means the last num_sectors sectors of the flash.
        let storage_range = if start_addr == 0 {
            (flash.capacity() - config.num_sectors as usize * F::ERASE_SIZE) as u32..flash.capacity() as u32
        } else {
            assert!(
                start_addr % F::ERASE_SIZE == 0,
                "Storage's start addr MUST BE a multiplier of sector size"
            );
            start_addr as u32..(start_addr + config.num_sectors as usize * F::ERASE_SIZE) as u32
        };

        let mut storage = Self {
            flash,
            storage_range,
            buffer: [0; get_buffer_size()],
        };

        // First boot, format change or explicit clear: reinitialize from the
        // defaults.
        if !storage.check_enable().await || config.clear_storage {
            debug!("Clearing storage!");
            let _ = sequential_storage::erase_all(&mut storage.flash, storage.storage_range.clone()).await;

            if storage.initialize_with_defaults(default_settings).await.is_err() {
                // On error, save `enable: false` back so a partially
                // initialized storage is not mistaken for a valid one.
                store_item(
                    &mut storage.flash,
                    storage.storage_range.clone(),
                    &mut NoCache::new(),
                    &mut storage.buffer,
                    &(StorageKeys::StorageConfig as u32),
                    &StorageData::StorageConfig(LocalStorageConfig {
                        enable: false,
                        format_version: STORAGE_FORMAT_VERSION,
                    }),
                )
                .await
                .ok();
            }
        }

        storage
    }

    /// The storage task: apply saves arriving on [`FLASH_CHANNEL`].
    pub async fn run(&mut self) {
        let mut storage_cache = NoCache::new();
        loop {
            let info: FlashOperationMessage = FLASH_CHANNEL.receive().await;
            debug!("Flash operation: {:?}", info);
            if let Err(e) = match info {
                FlashOperationMessage::PointerSettings(settings) => {
                    let data = StorageData::PointerSettings(settings);
                    store_item(
                        &mut self.flash,
                        self.storage_range.clone(),
                        &mut storage_cache,
                        &mut self.buffer,
                        &data.key(),
                        &data,
                    )
                    .await
                }
                FlashOperationMessage::Reset => {
                    sequential_storage::erase_all(&mut self.flash, self.storage_range.clone()).await
                }
            } {
                print_storage_error::<F>(e);
            }
        }
    }

    /// Read the persisted pointer settings, `None` if nothing valid is stored.
    pub async fn read_settings(&mut self) -> Option<PointerSettings> {
        match fetch_item::<u32, StorageData, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::PointerSettings as u32),
        )
        .await
        {
            Ok(Some(StorageData::PointerSettings(settings))) => Some(settings),
            Ok(_) => None,
            Err(e) => {
                print_storage_error::<F>(e);
                None
            }
        }
    }

    async fn initialize_with_defaults(
        &mut self,
        default_settings: &PointerSettings,
    ) -> Result<(), SSError<F::Error>> {
        let settings = StorageData::PointerSettings(*default_settings);
        store_item(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &settings.key(),
            &settings,
        )
        .await?;

        let config = StorageData::StorageConfig(LocalStorageConfig {
            enable: true,
            format_version: STORAGE_FORMAT_VERSION,
        });
        store_item(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &config.key(),
            &config,
        )
        .await
    }

    async fn check_enable(&mut self) -> bool {
        if let Ok(Some(StorageData::StorageConfig(config))) = fetch_item::<u32, StorageData, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::StorageConfig as u32),
        )
        .await
        {
            if config.enable && config.format_version == STORAGE_FORMAT_VERSION {
                return true;
            }
        }
        false
    }
}

fn print_storage_error<F: AsyncNorFlash>(e: SSError<F::Error>) {
    match e {
        #[cfg(feature = "defmt")]
        SSError::Storage { value: e } => error!("Flash error: {:?}", defmt::Debug2Format(&e)),
        #[cfg(not(feature = "defmt"))]
        SSError::Storage { value: _e } => error!("Flash error"),
        SSError::FullStorage => error!("Storage is full"),
        SSError::Corrupted {} => error!("Storage is corrupted"),
        SSError::BufferTooBig => error!("Buffer too big"),
        SSError::BufferTooSmall(x) => error!("Buffer too small, needs {} bytes", x),
        _ => error!("Unknown storage error"),
    }
}

/// Buffer size for (de)serializing storage items. `sequential-storage`
/// wants the buffer aligned to 32 bytes for some flashes, and 32 already
/// fits every record this crate stores.
const fn get_buffer_size() -> usize {
    32
}
