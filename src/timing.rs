//! Row settle delays scaled to the running core clock.
//!
//! The nominal delays in a [`ScanPlan`](crate::ScanPlan) are cycle counts at
//! the reference clock. They are rescaled once at init and never re-derived
//! while scanning.

use fugit::HertzU32;

/// Which of the two supported core clocks the firmware is running on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMode {
    Fast,
    Slow,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    /// Clock the nominal delays were measured at.
    pub reference: HertzU32,
    pub fast: HertzU32,
    pub slow: HertzU32,
    pub mode: ClockMode,
}

impl ClockConfig {
    pub fn active(&self) -> HertzU32 {
        match self.mode {
            ClockMode::Fast => self.fast,
            ClockMode::Slow => self.slow,
        }
    }

    /// Rescale a nominal cycle count to the active clock, rounding toward zero.
    pub fn scale(&self, nominal: u8) -> u32 {
        let reference = self.reference.to_Hz() as u64;
        if reference == 0 {
            return 0;
        }
        let cycles = nominal as u64 * self.active().to_Hz() as u64 / reference;
        u32::try_from(cycles).unwrap_or(u32::MAX)
    }
}

/// Busy wait primitive used for settle delays. Not a yield point.
pub trait CycleDelay {
    fn delay_cycles(&mut self, cycles: u32);
}

/// Settle delays for the active clock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    idle: u32,
    debouncing: u32,
}

impl Timing {
    pub fn new(idle: u8, debouncing: u8, clock: &ClockConfig) -> Self {
        let timing = Self { idle: clock.scale(idle), debouncing: clock.scale(debouncing) };
        debug!(
            "settle delays: idle {=u32} debouncing {=u32} cycles ({})",
            timing.idle,
            timing.debouncing,
            clock.mode
        );
        timing
    }

    pub fn idle(&self) -> u32 {
        self.idle
    }

    pub fn debouncing(&self) -> u32 {
        self.debouncing
    }

    /// Cycles to wait after asserting a row.
    pub fn settle_cycles(&self, debouncing: bool) -> u32 {
        if debouncing {
            self.debouncing
        } else {
            self.idle
        }
    }
}
