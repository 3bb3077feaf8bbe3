//! Keyboard matrix scanning for microcontrollers with 8-bit GPIO ports.
//!
//! A [`Scanner`] owns the matrix's [`Port`]s. It claims its pins through a
//! shared [`PinLedger`], drives one row at a time, and hands each row's column
//! bits to a [`Debounce`] implementation. Between scans it can arm a column
//! interrupt that wakes the firmware on any keypress, see [`idle_wake`].

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module.
mod fmt;

pub mod cipher;
pub mod debounce;
pub mod driver;
pub mod error;
pub mod idle_wake;
pub mod ledger;
pub mod plan;
pub mod port;
pub mod radio;
pub mod scanner;
pub mod timing;

#[cfg(test)]
mod mock;

pub use debounce::{Debounce, EagerDebounce};
pub use error::{Error, ErrorRegister};
pub use idle_wake::{service_interrupt, WakeFlag};
pub use ledger::PinLedger;
pub use plan::{ScanMode, ScanPlan};
pub use port::{IrqFlags, Port, PortMask};
pub use scanner::Scanner;
pub use timing::{ClockConfig, ClockMode, CycleDelay, Timing};
