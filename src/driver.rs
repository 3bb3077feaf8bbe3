//! Electrical setup and drive of the matrix rows and columns.
//!
//! | mode      | wiring                           | columns                      | rows                         |
//! |-----------|----------------------------------|------------------------------|------------------------------|
//! | `RowCol`  | `row -->\|-- col`, or GPIO → VCC | pull-down, non-inverted      | inverted, wired-OR           |
//! | `ColRow`  | `col -->\|-- row`, or GPIO → GND | pull-up, inverted            | non-inverted, wired-AND      |
//! | `PinVcc`  | GPIO --switch--> VCC             | pull-down, non-inverted      | -                            |
//! | `PinGnd`  | GPIO --switch--> GND             | pull-up, inverted            | -                            |
//!
//! Columns always interrupt on both edges so they can wake the scanner.
//!
//! With either row policy, writing 0 to a row's latch drives it to the level
//! that makes a closed switch read as active, and writing 1 disconnects it.

use crate::{
    error::Error,
    ledger::PinLedger,
    plan::{ScanMode, ScanPlan},
    port::{Drive, InputConfig, OutputConfig, PinRef, Port, PortMask, Pull, Sense},
};

pub fn column_config(mode: ScanMode) -> InputConfig {
    match mode {
        ScanMode::RowCol | ScanMode::PinVcc => {
            InputConfig { pull: Pull::Down, inverted: false, sense: Sense::BothEdges }
        }
        ScanMode::ColRow | ScanMode::PinGnd => {
            InputConfig { pull: Pull::Up, inverted: true, sense: Sense::BothEdges }
        }
    }
}

/// `None` for the pin modes, which have no row pins.
pub fn row_config(mode: ScanMode) -> Option<OutputConfig> {
    match mode {
        ScanMode::RowCol => Some(OutputConfig { inverted: true, drive: Drive::WiredOr }),
        ScanMode::ColRow => Some(OutputConfig { inverted: false, drive: Drive::WiredAnd }),
        ScanMode::PinVcc | ScanMode::PinGnd => None,
    }
}

/// Where a row's pin lives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RowPin {
    /// Index into the scanner's ports.
    pub port: u8,
    pub mask: PortMask,
}

/// Pin masks and row table built during setup, read only afterwards.
pub struct MatrixPins<const PORTS: usize, const MAX_ROWS: usize> {
    col_masks: [PortMask; PORTS],
    row_port_masks: [PortMask; PORTS],
    rows: [RowPin; MAX_ROWS],
    row_count: usize,
}

impl<const PORTS: usize, const MAX_ROWS: usize> MatrixPins<PORTS, MAX_ROWS> {
    pub const fn new() -> Self {
        Self {
            col_masks: [0; PORTS],
            row_port_masks: [0; PORTS],
            rows: [RowPin { port: 0, mask: 0 }; MAX_ROWS],
            row_count: 0,
        }
    }

    /// Claim the column pins, make them inputs and arm their pin change
    /// sensitivity. Expects a validated plan.
    pub fn setup_columns<P: Port>(
        &mut self,
        ports: &mut [P; PORTS],
        ledger: &mut PinLedger<PORTS>,
        plan: &ScanPlan<'_>,
        mode: ScanMode,
    ) -> Result<(), Error> {
        let mut col_masks = [0; PORTS];
        for &pin in plan.col_pins.iter().take(plan.cols as usize) {
            let pin = PinRef::from_pin_number(pin);
            let mask = col_masks.get_mut(pin.port as usize).ok_or(Error::ConfigTooLarge)?;
            *mask |= pin.mask();
        }

        let config = column_config(mode);
        let used_ports = plan.bytes_per_row().min(PORTS);
        let columns = ports.iter_mut().zip(&col_masks).enumerate().take(used_ports);
        for (index, (port, &mask)) in columns {
            if mask == 0 {
                continue;
            }

            ledger.claim(index as u8, mask)?;

            port.configure_inputs(mask, config);
            port.enable_irq_pins(mask);
            self.col_masks[index] = mask;
            debug!("port {} columns {=u8:#b}", index, mask);
        }

        Ok(())
    }

    /// Claim the row pins and make them wired outputs, released.
    pub fn setup_rows<P: Port>(
        &mut self,
        ports: &mut [P; PORTS],
        ledger: &mut PinLedger<PORTS>,
        plan: &ScanPlan<'_>,
        mode: ScanMode,
    ) -> Result<(), Error> {
        let config = row_config(mode).ok_or(Error::UnsupportedScanMode)?;

        for (row, &pin) in plan.row_pins.iter().take(plan.rows as usize).enumerate() {
            let pin = PinRef::from_pin_number(pin);
            let slot = self.rows.get_mut(row).ok_or(Error::ConfigTooLarge)?;
            let port = ports.get_mut(pin.port as usize).ok_or(Error::ConfigTooLarge)?;

            ledger.claim(pin.port, pin.mask())?;

            self.row_port_masks[pin.port as usize] |= pin.mask();
            *slot = RowPin { port: pin.port, mask: pin.mask() };
            self.row_count = row + 1;

            port.out_set(pin.mask());
            port.configure_outputs(pin.mask(), config);
        }

        debug!("{=usize} rows ready", self.row_count);
        Ok(())
    }

    pub fn col_mask(&self, port: u8) -> PortMask {
        self.col_masks.get(port as usize).copied().unwrap_or(0)
    }

    pub fn col_masks(&self) -> &[PortMask; PORTS] {
        &self.col_masks
    }

    pub fn row(&self, row: u8) -> Option<RowPin> {
        self.rows.get(..self.row_count)?.get(row as usize).copied()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn select_row<P: Port>(&self, ports: &mut [P; PORTS], row: u8) {
        if let Some(RowPin { port, mask }) = self.row(row) {
            ports[port as usize].out_clear(mask);
        }
    }

    pub fn unselect_row<P: Port>(&self, ports: &mut [P; PORTS], row: u8) {
        if let Some(RowPin { port, mask }) = self.row(row) {
            ports[port as usize].out_set(mask);
        }
    }

    pub fn select_all_rows<P: Port>(&self, ports: &mut [P; PORTS]) {
        for (port, &mask) in ports.iter_mut().zip(&self.row_port_masks) {
            if mask != 0 {
                port.out_clear(mask);
            }
        }
    }

    /// Float every row.
    pub fn unselect_all_rows<P: Port>(&self, ports: &mut [P; PORTS]) {
        for (port, &mask) in ports.iter_mut().zip(&self.row_port_masks) {
            if mask != 0 {
                port.out_set(mask);
            }
        }
    }

    /// Column bits of every port into `sample`, zero for ports without columns.
    pub fn sample<P: Port>(&self, ports: &[P; PORTS], sample: &mut [PortMask; PORTS]) {
        for ((port, &mask), value) in ports.iter().zip(&self.col_masks).zip(sample.iter_mut()) {
            *value = if mask != 0 { port.read() & mask } else { 0 };
        }
    }

    /// Any column active on any port.
    pub fn any_column_active<P: Port>(&self, ports: &[P; PORTS]) -> bool {
        ports.iter().zip(&self.col_masks).any(|(port, &mask)| mask != 0 && port.read() & mask != 0)
    }
}

impl<const PORTS: usize, const MAX_ROWS: usize> Default for MatrixPins<PORTS, MAX_ROWS> {
    fn default() -> Self {
        Self::new()
    }
}
