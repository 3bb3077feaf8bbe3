//! GPIO bank 0 of the RP2040, cut into four 8-bit ports.
//!
//! The chip has no open-drain or wired-AND/OR output stage, so wired drive is
//! emulated: the SIO output level of a row pin is fixed at the level it drives,
//! and the port's latch only switches the pin's output enable.

use key_scanner::{
    port::{Drive, InputConfig, IrqLevel, OutputConfig, Pull},
    IrqFlags, Port, PortMask,
};
use rp2040_hal::{gpio::Pins, pac};

pub const PORTS: usize = 4;

const NUM_GPIO: usize = 30;
const FUNCSEL_SIO: u32 = 5;

const PADS_PDE: u32 = 1 << 2;
const PADS_PUE: u32 = 1 << 3;
const PADS_IE: u32 = 1 << 6;

const EDGE_LOW: u32 = 1 << 2;
const EDGE_HIGH: u32 = 1 << 3;

fn sio() -> &'static pac::sio::RegisterBlock {
    // SAFETY: only the atomic set/clear aliases and GPIO_IN are touched.
    unsafe { &*pac::SIO::ptr() }
}

fn io_bank0() -> &'static pac::io_bank0::RegisterBlock {
    // SAFETY: every port only writes the CTRL and interrupt registers of its
    // own pins. INTR is write-one-to-clear.
    unsafe { &*pac::IO_BANK0::ptr() }
}

fn pads_bank0() -> &'static pac::pads_bank0::RegisterBlock {
    // SAFETY: every port only writes the pads of its own pins.
    unsafe { &*pac::PADS_BANK0::ptr() }
}

/// Both edge bits of every pin in `mask`, laid out like INTR and PROC0_INTE.
fn edge_bits(mask: PortMask) -> u32 {
    (0..8)
        .filter(|bit| mask & (1 << bit) != 0)
        .fold(0, |bits, bit| bits | (EDGE_LOW | EDGE_HIGH) << (4 * bit))
}

pub struct Bank0Port {
    index: u8,
    latch: PortMask,
    outputs: PortMask,
    /// Output pins whose latch bit set means "drive".
    drive_on_set: PortMask,
    inverted: PortMask,
    irq_pins: PortMask,
}

impl Bank0Port {
    /// Takes over every bank 0 pin. `pins` is consumed so the HAL cannot hand
    /// them out a second time.
    pub fn take(_pins: Pins) -> [Self; PORTS] {
        core::array::from_fn(|index| Self {
            index: index as u8,
            latch: 0,
            outputs: 0,
            drive_on_set: 0,
            inverted: 0,
            irq_pins: 0,
        })
    }

    fn gpios(&self, mask: PortMask) -> impl Iterator<Item = usize> {
        let base = self.index as usize * 8;
        (0..8)
            .filter(move |bit| mask & (1 << bit) != 0)
            .map(move |bit| base + bit)
            .filter(|&gpio| gpio < NUM_GPIO)
    }

    fn wide(&self, mask: PortMask) -> u32 {
        (mask as u32) << (8 * self.index as u32)
    }

    fn set_function(&self, mask: PortMask, pads: u32) {
        for gpio in self.gpios(mask) {
            pads_bank0().gpio(gpio).write(|w| unsafe { w.bits(pads) });
            io_bank0().gpio(gpio).gpio_ctrl().write(|w| unsafe { w.bits(FUNCSEL_SIO) });
        }
    }

    /// Push the latch bits of `mask` out to the output enables.
    fn apply_latch(&self, mask: PortMask) {
        let mask = mask & self.outputs;
        let driving = !(self.latch ^ self.drive_on_set) & mask;
        sio().gpio_oe_set().write(|w| unsafe { w.bits(self.wide(driving)) });
        sio().gpio_oe_clr().write(|w| unsafe { w.bits(self.wide(mask & !driving)) });
    }
}

impl IrqFlags for Bank0Port {
    fn clear_irq_flags(&mut self) {
        let bits = edge_bits(self.irq_pins);
        io_bank0().intr(self.index as usize).write(|w| unsafe { w.bits(bits) });
    }
}

impl Port for Bank0Port {
    fn configure_inputs(&mut self, mask: PortMask, config: InputConfig) {
        sio().gpio_oe_clr().write(|w| unsafe { w.bits(self.wide(mask)) });
        self.outputs &= !mask;

        let pull = match config.pull {
            Pull::Up => PADS_PUE,
            Pull::Down => PADS_PDE,
        };
        self.set_function(mask, PADS_IE | pull);

        if config.inverted {
            self.inverted |= mask;
        } else {
            self.inverted &= !mask;
        }
    }

    fn configure_outputs(&mut self, mask: PortMask, config: OutputConfig) {
        let level = self.wide(mask);
        if config.driving_latch() {
            self.drive_on_set |= mask;
        } else {
            self.drive_on_set &= !mask;
        }

        // Level of the output stage while enabled.
        match config.drive {
            Drive::WiredOr => sio().gpio_out_set().write(|w| unsafe { w.bits(level) }),
            Drive::WiredAnd => sio().gpio_out_clr().write(|w| unsafe { w.bits(level) }),
        }

        self.set_function(mask, PADS_IE);
        self.outputs |= mask;
        self.inverted &= !mask;
        self.apply_latch(mask);
    }

    fn out_set(&mut self, mask: PortMask) {
        self.latch |= mask;
        self.apply_latch(mask);
    }

    fn out_clear(&mut self, mask: PortMask) {
        self.latch &= !mask;
        self.apply_latch(mask);
    }

    fn read(&self) -> PortMask {
        let level = (sio().gpio_in().read().bits() >> (8 * self.index as u32)) as PortMask;
        level ^ self.inverted
    }

    fn enable_irq_pins(&mut self, mask: PortMask) {
        self.irq_pins |= mask;
    }

    fn set_irq_level(&mut self, level: IrqLevel) {
        let bits = edge_bits(self.irq_pins);
        io_bank0().proc0_inte(self.index as usize).modify(|r, w| unsafe {
            match level {
                IrqLevel::Off => w.bits(r.bits() & !bits),
                IrqLevel::Low => w.bits(r.bits() | bits),
            }
        });
    }
}

/// Interrupt side handle: acknowledges the column edges of every port.
pub struct EdgeFlags {
    masks: [PortMask; PORTS],
}

impl EdgeFlags {
    pub fn new(masks: [PortMask; PORTS]) -> Self {
        Self { masks }
    }
}

impl IrqFlags for EdgeFlags {
    fn clear_irq_flags(&mut self) {
        for (index, &mask) in self.masks.iter().enumerate() {
            if mask != 0 {
                io_bank0().intr(index).write(|w| unsafe { w.bits(edge_bits(mask)) });
            }
        }
    }
}
