//! Debounce contract used by the scanner, plus a simple-as-possible eager
//! debouncer to go with it.

use crate::port::{PortMask, PORT_SIZE};

/// Stateful per row debouncer.
///
/// The scanner calls [`Debounce::debounce_row`] once per row per scan, rows in
/// ascending order. `sample` holds the column bits of each port, of which the
/// first `bytes_per_row` are meaningful.
pub trait Debounce {
    /// Feed one raw row sample, returns whether the debounced row changed.
    fn debounce_row(&mut self, row: u8, sample: &[PortMask], bytes_per_row: usize) -> bool;

    /// Number of switches currently between raw and debounced state.
    fn keys_debouncing(&self) -> usize;
}

/// `EagerDebounce` is a tick-based allocation-free "eager" (reports keypresses immediately)
/// debouncer.
///
/// # Algorithm
/// Its main purpose is to prevent rapid double-keypress events (i.e. when a key is
/// reported as not pressed, then immediately re-pressed). It does this by maintaining
/// a countdown per key, where if a key is un-pressed and re-pressed within
/// `expiration` ticks, `EagerDebounce` will report it as one continuous keypress.
/// A key that is counting down while its raw state reads released is debouncing.
///
/// # Ticks
/// One tick is one call for the row, i.e. one scan.
pub struct EagerDebounce<const NUM_ROWS: usize, const PORTS: usize> {
    countdown: [[[u8; PORT_SIZE as usize]; PORTS]; NUM_ROWS],
    debounced: [[PortMask; PORTS]; NUM_ROWS],
    debouncing: [u8; NUM_ROWS],
    expiration: u8,
}

impl<const NUM_ROWS: usize, const PORTS: usize> EagerDebounce<NUM_ROWS, PORTS> {
    /// Create an `EagerDebounce` with a custom expiration tick amount.
    pub fn with_expiration(expiration: u8) -> Self {
        Self {
            countdown: [[[0; PORT_SIZE as usize]; PORTS]; NUM_ROWS],
            debounced: [[0; PORTS]; NUM_ROWS],
            debouncing: [0; NUM_ROWS],
            // A zero expiration would never report a press.
            expiration: expiration.max(1),
        }
    }

    /// Debounced column bits of `row`, one byte per port.
    pub fn row(&self, row: u8) -> Option<&[PortMask; PORTS]> {
        self.debounced.get(row as usize)
    }

    pub fn is_pressed(&self, row: u8, col_pin: u8) -> bool {
        let port = (col_pin / PORT_SIZE) as usize;
        let bit = col_pin % PORT_SIZE;
        self.row(row)
            .and_then(|ports| ports.get(port))
            .is_some_and(|&bits| bits & (1 << bit) != 0)
    }
}

impl<const NUM_ROWS: usize, const PORTS: usize> Debounce for EagerDebounce<NUM_ROWS, PORTS> {
    fn debounce_row(&mut self, row: u8, sample: &[PortMask], bytes_per_row: usize) -> bool {
        let row = row as usize;
        let expiration = self.expiration;
        let (Some(countdown), Some(debounced), Some(debouncing)) = (
            self.countdown.get_mut(row),
            self.debounced.get_mut(row),
            self.debouncing.get_mut(row),
        ) else {
            return false;
        };

        let mut changed = false;
        let mut bouncing = 0;
        for ((keys, reported), &raw) in
            countdown.iter_mut().zip(debounced.iter_mut()).zip(sample).take(bytes_per_row)
        {
            let mut bits = 0;
            for (bit, expiration_key) in keys.iter_mut().enumerate() {
                let pressed = raw & (1 << bit) != 0;
                *expiration_key = match (pressed, *expiration_key) {
                    // A new "true" keypress is recorded
                    (true, _) => expiration,
                    // No keypress detected
                    (false, 0) => 0,
                    // Continue expiring all previous keypresses
                    (false, ticks) => ticks - 1,
                };

                if *expiration_key != 0 {
                    bits |= 1 << bit;
                    if !pressed {
                        bouncing += 1;
                    }
                }
            }

            changed |= *reported != bits;
            *reported = bits;
        }

        *debouncing = bouncing;
        changed
    }

    fn keys_debouncing(&self) -> usize {
        self.debouncing.iter().map(|&keys| keys as usize).sum()
    }
}
