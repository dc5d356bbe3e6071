//! An empty implementation of `NorFlash`, which can be used when flash
//! storage is not available.

#[derive(Debug)]
pub struct EmptyFlashError {}

impl embedded_storage::nor_flash::NorFlashError for EmptyFlashError {
    fn kind(&self) -> embedded_storage::nor_flash::NorFlashErrorKind {
        embedded_storage::nor_flash::NorFlashErrorKind::Other
    }
}

/// An empty implementation of `NorFlash`
#[derive(Default)]
pub struct DummyFlash {}

impl DummyFlash {
    pub fn new() -> Self {
        Self {}
    }
}

impl embedded_storage::nor_flash::ErrorType for DummyFlash {
    type Error = EmptyFlashError;
}

impl embedded_storage_async::nor_flash::NorFlash for DummyFlash {
    const WRITE_SIZE: usize = 0;
    const ERASE_SIZE: usize = 0;

    async fn erase(&mut self, _from: u32, _to: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_storage_async::nor_flash::ReadNorFlash for DummyFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, _offset: u32, _bytes: &mut [u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn capacity(&self) -> usize {
        0
    }
}
