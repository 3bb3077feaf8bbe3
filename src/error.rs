use core::cell::Cell;

use critical_section::Mutex;

/// Setup failures raised by the scanner and the peripherals that share its pins.
///
/// None of these are retried. The routine that hits one registers it with the
/// [`ErrorRegister`] and returns without finishing its pin configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Error {
    /// Row count or column pin numbers exceed what the build supports.
    ConfigTooLarge = 0,
    /// A pin claim collided with an earlier claim.
    PinMappingConflict = 1,
    /// The scan plan names a wiring mode this scanner does not know.
    UnsupportedScanMode = 2,
    /// A claim touched a pin that the board does not expose.
    UnusablePin = 3,
    /// The radio did not answer on its SPI bus.
    RadioSpiConnection = 4,
}

impl Error {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Process wide error sink.
///
/// Holds one bit per [`Error`] kind. Kept behind a critical section rather
/// than an atomic because the Cortex-M0+ has no atomic read-modify-write.
pub struct ErrorRegister {
    raised: Mutex<Cell<u8>>,
}

impl ErrorRegister {
    pub const fn new() -> Self {
        Self { raised: Mutex::new(Cell::new(0)) }
    }

    pub fn register(&self, error: Error) {
        error!("register error: {}", error);
        critical_section::with(|cs| {
            let raised = self.raised.borrow(cs);
            raised.set(raised.get() | error.bit());
        });
    }

    pub fn contains(&self, error: Error) -> bool {
        self.bits() & error.bit() != 0
    }

    /// Any error registered so far leaves the firmware in a degraded state.
    pub fn has_critical_error(&self) -> bool {
        self.bits() != 0
    }

    pub fn bits(&self) -> u8 {
        critical_section::with(|cs| self.raised.borrow(cs).get())
    }

    pub fn clear(&self) {
        critical_section::with(|cs| self.raised.borrow(cs).set(0));
    }
}

impl Default for ErrorRegister {
    fn default() -> Self {
        Self::new()
    }
}

/// Register `result`'s error, if any, and hand the result back unchanged.
pub(crate) fn report<T>(errors: &ErrorRegister, result: Result<T, Error>) -> Result<T, Error> {
    if let Err(error) = result {
        errors.register(error);
    }
    result
}
