//! Wake on keypress.
//!
//! While armed, every row is driven so any pressed key pulls its column to the
//! active level, and the columns' pin change interrupt wakes the firmware. The
//! interrupt handler only acknowledges the port and raises the [`WakeFlag`];
//! scanning stays on the main line.
//!
//! Between [`Scanner::irq_enable`] and [`Scanner::irq_disable`] nothing else
//! may touch the row pins.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{
    port::{IrqFlags, IrqLevel, Port},
    scanner::Scanner,
    timing::CycleDelay,
};

/// The one piece of state shared between the column interrupt and the main
/// loop. The handler sets it, the main loop reads and clears it.
pub struct WakeFlag(AtomicBool);

impl WakeFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of the column pin change interrupt handler.
pub fn service_interrupt<F: IrqFlags + ?Sized>(flags: &mut F, wake: &WakeFlag) {
    flags.clear_irq_flags();
    wake.trigger();
}

impl<P: Port, const PORTS: usize, const MAX_ROWS: usize> Scanner<'_, P, PORTS, MAX_ROWS> {
    /// Drive every row and let a column change wake the firmware.
    pub fn irq_enable<W: CycleDelay>(&mut self, delay: &mut W) {
        self.select_all_rows();
        delay.delay_cycles(self.timing.idle());

        let col_masks = *self.pins.col_masks();
        for (port, &mask) in self.ports.iter_mut().zip(&col_masks) {
            if mask != 0 {
                port.clear_irq_flags();
            }
        }
        self.irq_clear();

        for (port, &mask) in self.ports.iter_mut().zip(&col_masks) {
            if mask != 0 {
                port.set_irq_level(IrqLevel::Low);
            }
        }
        trace!("idle wake armed");
    }

    /// Stop listening for column changes and float every row.
    pub fn irq_disable(&mut self) {
        let col_masks = *self.pins.col_masks();
        for (port, &mask) in self.ports.iter_mut().zip(&col_masks) {
            if mask != 0 {
                port.set_irq_level(IrqLevel::Off);
            }
        }
        self.unselect_all_rows();
    }

    pub fn irq_has_triggered(&self) -> bool {
        self.wake.is_set()
    }

    pub fn irq_clear(&self) {
        self.wake.clear();
    }
}
