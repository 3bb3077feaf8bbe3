use crate::{
    error::Error,
    port::{max_pin_number, PORT_SIZE},
};

/// How the switches are wired to the microcontroller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ScanMode {
    /// Diodes point from column to row (`col -->|-- row`).
    ColRow = 0x01,
    /// Diodes point from row to column (`row -->|-- col`).
    RowCol = 0x02,
    /// One pin per switch, the switch connects the pin to GND.
    PinGnd = 0x03,
    /// One pin per switch, the switch connects the pin to VCC.
    PinVcc = 0x04,
}

impl ScanMode {
    /// Row and column modes drive rows, pin modes only sample.
    pub const fn has_rows(self) -> bool {
        matches!(self, ScanMode::ColRow | ScanMode::RowCol)
    }
}

impl TryFrom<u8> for ScanMode {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x01 => Ok(ScanMode::ColRow),
            0x02 => Ok(ScanMode::RowCol),
            0x03 => Ok(ScanMode::PinGnd),
            0x04 => Ok(ScanMode::PinVcc),
            _ => Err(Error::UnsupportedScanMode),
        }
    }
}

impl From<ScanMode> for u8 {
    fn from(mode: ScanMode) -> Self {
        mode as u8
    }
}

/// Matrix description as it comes out of the keyboard settings.
///
/// `Default` is the all zero plan a rejected configuration is replaced with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPlan<'a> {
    /// Raw [`ScanMode`] value.
    pub mode: u8,
    pub rows: u8,
    pub cols: u8,
    /// Highest pin number used by any column.
    pub max_col_pin_number: u8,
    /// Row settle time while nothing is debouncing, in cycles of the reference clock.
    pub parasitic_discharge_delay_idle: u8,
    /// Row settle time while any key is debouncing, in cycles of the reference clock.
    pub parasitic_discharge_delay_debouncing: u8,
    pub row_pins: &'a [u8],
    pub col_pins: &'a [u8],
}

impl ScanPlan<'_> {
    /// Check that the plan fits the build before any pin gets touched.
    pub fn validate(&self, max_rows: usize, ports: usize) -> Result<(), Error> {
        let max_pin = max_pin_number(ports);

        if self.rows as usize > max_rows || self.max_col_pin_number > max_pin {
            return Err(Error::ConfigTooLarge);
        }

        let cols = self.col_pins.get(..self.cols as usize).ok_or(Error::ConfigTooLarge)?;
        if cols.iter().any(|&pin| pin > self.max_col_pin_number) {
            return Err(Error::ConfigTooLarge);
        }

        if ScanMode::try_from(self.mode).is_ok_and(ScanMode::has_rows) {
            let rows = self.row_pins.get(..self.rows as usize).ok_or(Error::ConfigTooLarge)?;
            if rows.iter().any(|&pin| pin > max_pin) {
                return Err(Error::ConfigTooLarge);
            }
        }

        Ok(())
    }

    /// Number of port bytes that hold column bits.
    pub fn bytes_per_row(&self) -> usize {
        (self.max_col_pin_number as usize + 1).div_ceil(PORT_SIZE as usize)
    }
}
