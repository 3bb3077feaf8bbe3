//! Register level view of the GPIO ports shared by the scanner and its
//! neighbours.
//!
//! Pins are numbered flat across the chip. Pin `n` lives on port `n / 8` as bit
//! `n % 8`, so every port register is one byte wide.

/// Number of pins in one port.
pub const PORT_SIZE: u8 = 8;

/// One bit per pin of a port.
pub type PortMask = u8;

/// Location of a physical pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinRef {
    pub port: u8,
    pub bit: u8,
}

impl PinRef {
    pub const fn from_pin_number(pin: u8) -> Self {
        Self { port: pin / PORT_SIZE, bit: pin % PORT_SIZE }
    }

    pub const fn mask(self) -> PortMask {
        1 << self.bit
    }
}

/// Highest pin number addressable with `ports` ports.
pub const fn max_pin_number(ports: usize) -> u8 {
    (ports * PORT_SIZE as usize - 1) as u8
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    Up,
    Down,
}

/// Which input transitions latch the port's interrupt flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sense {
    BothEdges,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputConfig {
    pub pull: Pull,
    /// Invert the level before it reaches the input register.
    pub inverted: bool,
    pub sense: Sense,
}

/// Output stage that only ever drives one level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drive {
    /// Drives low, disconnects when the pin level is 1.
    WiredAnd,
    /// Drives high, disconnects when the pin level is 0.
    WiredOr,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputConfig {
    /// Invert the latch before it reaches the output stage.
    pub inverted: bool,
    pub drive: Drive,
}

impl OutputConfig {
    /// Latch value that makes the output stage drive the pin.
    pub const fn driving_latch(self) -> bool {
        let level = matches!(self.drive, Drive::WiredOr);
        level ^ self.inverted
    }
}

/// Interrupt priority of a port's pin change interrupt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqLevel {
    Off,
    Low,
}

/// The part of a port an interrupt handler is allowed to touch.
pub trait IrqFlags {
    /// Acknowledge every pending pin change flag of the port.
    fn clear_irq_flags(&mut self);
}

/// Exclusive handle to one GPIO port.
///
/// Only the owner of a handle may reconfigure pins of that port. The
/// [`PinLedger`](crate::PinLedger) decides which pins a setup routine may use.
pub trait Port: IrqFlags {
    /// Make the pins in `mask` inputs with the given electrical policy.
    fn configure_inputs(&mut self, mask: PortMask, config: InputConfig);

    /// Make the pins in `mask` outputs with the given electrical policy.
    fn configure_outputs(&mut self, mask: PortMask, config: OutputConfig);

    /// Write 1 to the output latch of the pins in `mask`.
    fn out_set(&mut self, mask: PortMask);

    /// Write 0 to the output latch of the pins in `mask`.
    fn out_clear(&mut self, mask: PortMask);

    /// Input register, after any configured inversion.
    fn read(&self) -> PortMask;

    /// Add the pins in `mask` to the port's pin change interrupt.
    fn enable_irq_pins(&mut self, mask: PortMask);

    /// Set the port's pin change interrupt priority, `IrqLevel::Off` disables it.
    fn set_irq_level(&mut self, level: IrqLevel);
}
