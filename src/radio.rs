//! nRF24L01+ link setup.
//!
//! Only the parts that share the scanner's pin ledger live here: claiming the
//! SPI, CE and IRQ lines, checking the chip answers, and powering it down. The
//! radio protocol itself is built on [`Nrf24::transfer`].

use core::convert::Infallible;

use embedded_hal::{
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::{
    error::{report, Error, ErrorRegister},
    ledger::PinLedger,
    port::{PinRef, PortMask},
};

const R_REGISTER: u8 = 0x00;
const W_REGISTER: u8 = 0x20;
const NRF_NOP: u8 = 0xff;

const CONFIG: u8 = 0x00;
const PWR_UP: u8 = 1 << 1;

/// Reserved bit of STATUS, reads 0 on a live chip. A floating MISO reads 1.
const STATUS_RESERVED: u8 = 1 << 7;

/// Pins the radio takes from the ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RadioPins {
    pub spi_port: u8,
    pub spi_mask: PortMask,
    pub ce_pin: u8,
    pub irq_pin: u8,
}

pub struct Nrf24<SPI, CE, IRQ> {
    spi: SPI,
    ce: CE,
    irq: IRQ,
    pins: RadioPins,
    /// Pins stay claimed when the chip does not answer, so a retry must not claim them again.
    claimed: bool,
    initialized: bool,
}

impl<SPI, CE, IRQ> Nrf24<SPI, CE, IRQ>
where
    SPI: SpiDevice,
    CE: OutputPin<Error = Infallible>,
    IRQ: InputPin<Error = Infallible>,
{
    pub fn new(spi: SPI, ce: CE, irq: IRQ, pins: RadioPins) -> Self {
        Self { spi, ce, irq, pins, claimed: false, initialized: false }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Claim the radio's pins and check the chip answers on SPI.
    ///
    /// Does nothing when already up or when the radio is `disabled` in the
    /// settings.
    pub fn init<const PORTS: usize>(
        &mut self,
        ledger: &mut PinLedger<PORTS>,
        errors: &ErrorRegister,
        disabled: bool,
    ) -> Result<(), Error> {
        if self.initialized || disabled {
            return Ok(());
        }

        let result = self.setup(ledger);
        report(errors, result)
    }

    fn setup<const PORTS: usize>(&mut self, ledger: &mut PinLedger<PORTS>) -> Result<(), Error> {
        if !self.claimed {
            ledger.claim(self.pins.spi_port, self.pins.spi_mask)?;
            for pin in [self.pins.ce_pin, self.pins.irq_pin] {
                let pin = PinRef::from_pin_number(pin);
                ledger.claim(pin.port, pin.mask())?;
            }
            self.claimed = true;
        }

        let status = self.command(NRF_NOP)?;
        if status & STATUS_RESERVED != 0 {
            error!("radio status {=u8:#b}, nothing on the bus", status);
            return Err(Error::RadioSpiConnection);
        }

        self.ce(false);
        self.initialized = true;
        debug!("radio up, status {=u8:#b}", status);
        Ok(())
    }

    /// Power the chip down and release CE.
    pub fn disable(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Ok(());
        }

        let config = self.read_register(CONFIG)?;
        self.write_register(CONFIG, config & !PWR_UP)?;
        self.ce(false);
        self.initialized = false;
        Ok(())
    }

    pub fn ce(&mut self, enable: bool) {
        infallible(if enable { self.ce.set_high() } else { self.ce.set_low() });
    }

    /// The IRQ line is active low.
    pub fn irq_asserted(&mut self) -> bool {
        infallible(self.irq.is_low())
    }

    /// Clock `bytes` out with CSN held low, replacing them with the reply.
    pub fn transfer(&mut self, bytes: &mut [u8]) -> Result<(), Error> {
        self.spi.transfer_in_place(bytes).map_err(|_| Error::RadioSpiConnection)
    }

    fn command(&mut self, command: u8) -> Result<u8, Error> {
        let mut buf = [command];
        self.transfer(&mut buf)?;
        Ok(buf[0])
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error> {
        let mut buf = [R_REGISTER | register, NRF_NOP];
        self.transfer(&mut buf)?;
        Ok(buf[1])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error> {
        self.transfer(&mut [W_REGISTER | register, value])
    }

    pub fn free(self) -> (SPI, CE, IRQ) {
        (self.spi, self.ce, self.irq)
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
