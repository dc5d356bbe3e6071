use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::{Duration, MockDriver};
use mouse_layer::config::{MouseLayerConfig, PointerSettings};
use mouse_layer::controller::MouseLayerController;
use mouse_layer::hid::MouseReport;
use mouse_layer::layer::LayerSwitch;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

static NOOP_VTABLE: RawWakerVTable = RawWakerVTable::new(
    |_| RawWaker::new(core::ptr::null(), &NOOP_VTABLE),
    |_| {},
    |_| {},
    |_| {},
);

/// Poll a future to completion, advancing the mock clock by 1ms on every
/// pending poll. Timers fire in simulated time, so tests spanning seconds
/// finish instantly and deterministically.
pub fn test_block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);
    let waker = unsafe { Waker::from_raw(RawWaker::new(core::ptr::null(), &NOOP_VTABLE)) };
    let mut cx = Context::from_waker(&waker);
    // 10 minutes of simulated time before declaring the test hung.
    for _ in 0..600_000 {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => MockDriver::get().advance(Duration::from_millis(1)),
        }
    }
    panic!("future did not complete within 10 minutes of simulated time");
}

/// Advance the mock clock without running anything.
pub fn advance_ms(ms: u64) {
    MockDriver::get().advance(Duration::from_millis(ms));
}

/// Layer switch stub recording which layers are up.
#[derive(Default)]
pub struct TestLayer {
    pub active: [bool; 16],
}

impl LayerSwitch for TestLayer {
    fn activate(&mut self, layer: u8) {
        self.active[layer as usize] = true;
    }

    fn deactivate(&mut self, layer: u8) {
        self.active[layer as usize] = false;
    }
}

pub fn new_controller() -> MouseLayerController<TestLayer> {
    MouseLayerController::new(
        MouseLayerConfig::default(),
        PointerSettings::default(),
        TestLayer::default(),
    )
}

/// Run one motion tick through the controller, the way the processor does.
pub fn motion_tick(ctrl: &mut MouseLayerController<TestLayer>, dx: i8, dy: i8) -> MouseReport {
    let mut report = MouseReport {
        buttons: ctrl.buttons().into_bits(),
        x: dx,
        y: dy,
        wheel: 0,
        pan: 0,
    };
    ctrl.transform_report(&mut report);
    report
}

const SECTOR_SIZE: usize = 1024;
const SECTOR_COUNT: usize = 2;

#[derive(Debug)]
pub struct MemFlashError;

impl embedded_storage::nor_flash::NorFlashError for MemFlashError {
    fn kind(&self) -> embedded_storage::nor_flash::NorFlashErrorKind {
        embedded_storage::nor_flash::NorFlashErrorKind::Other
    }
}

/// In-memory NOR flash with two erase sectors. Clones share the same cells,
/// so a test can "reboot" storage on top of the previous contents.
#[derive(Clone)]
pub struct MemFlash {
    data: Rc<RefCell<[u8; SECTOR_SIZE * SECTOR_COUNT]>>,
}

impl Default for MemFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFlash {
    pub fn new() -> Self {
        Self {
            data: Rc::new(RefCell::new([0xFF; SECTOR_SIZE * SECTOR_COUNT])),
        }
    }
}

impl embedded_storage::nor_flash::ErrorType for MemFlash {
    type Error = MemFlashError;
}

impl embedded_storage_async::nor_flash::ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        bytes.copy_from_slice(&self.data.borrow()[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SECTOR_SIZE * SECTOR_COUNT
    }
}

impl embedded_storage_async::nor_flash::NorFlash for MemFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert_eq!(from as usize % SECTOR_SIZE, 0);
        assert_eq!(to as usize % SECTOR_SIZE, 0);
        self.data.borrow_mut()[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert_eq!(offset as usize % Self::WRITE_SIZE, 0);
        assert_eq!(bytes.len() % Self::WRITE_SIZE, 0);
        let mut data = self.data.borrow_mut();
        for (i, byte) in bytes.iter().enumerate() {
            // NOR semantics: writes only clear bits.
            data[offset as usize + i] &= byte;
        }
        Ok(())
    }
}
