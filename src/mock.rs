//! Recording fake of the GPIO ports, wired up as a switch matrix.

use std::{cell::RefCell, rc::Rc, vec::Vec};

use crate::port::{InputConfig, IrqFlags, IrqLevel, OutputConfig, PinRef, Port, PortMask, PORT_SIZE};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    ConfigureInputs(u8, PortMask, InputConfig),
    ConfigureOutputs(u8, PortMask, OutputConfig),
    OutSet(u8, PortMask),
    OutClear(u8, PortMask),
    EnableIrqPins(u8, PortMask),
    IrqLevel(u8, IrqLevel),
    ClearIrqFlags(u8),
    Read(u8),
}

#[derive(Default)]
struct PortState {
    latch: PortMask,
    levels: PortMask,
    inputs: [Option<InputConfig>; PORT_SIZE as usize],
    outputs: [Option<OutputConfig>; PORT_SIZE as usize],
    irq_pins: PortMask,
    irq_level: Option<IrqLevel>,
    /// Latched pin change flags.
    pending: PortMask,
}

#[derive(Default)]
pub struct Bus {
    ports: Vec<PortState>,
    /// Closed switches as (driven pin, sensed pin).
    switches: Vec<(PinRef, PinRef)>,
    pub events: Vec<Event>,
    /// Number of driven outputs at every input read.
    pub driven_at_read: Vec<usize>,
}

impl Bus {
    /// Force the sensed level of a pin, as seen after input inversion.
    pub fn set_level(&mut self, pin: u8, active: bool) {
        let pin = PinRef::from_pin_number(pin);
        let levels = &mut self.ports[pin.port as usize].levels;
        if active {
            *levels |= pin.mask();
        } else {
            *levels &= !pin.mask();
        }
    }

    pub fn press(&mut self, driven: u8, sensed: u8) {
        self.switches.push((PinRef::from_pin_number(driven), PinRef::from_pin_number(sensed)));
    }

    pub fn release_all(&mut self) {
        self.switches.clear();
    }

    pub fn input_config(&self, pin: u8) -> Option<InputConfig> {
        let pin = PinRef::from_pin_number(pin);
        self.ports[pin.port as usize].inputs[pin.bit as usize]
    }

    pub fn output_config(&self, pin: u8) -> Option<OutputConfig> {
        let pin = PinRef::from_pin_number(pin);
        self.ports[pin.port as usize].outputs[pin.bit as usize]
    }

    pub fn irq_pins(&self, port: u8) -> PortMask {
        self.ports[port as usize].irq_pins
    }

    pub fn irq_level(&self, port: u8) -> Option<IrqLevel> {
        self.ports[port as usize].irq_level
    }

    /// Latch a level change on `pin`, returns whether the port interrupt fires.
    pub fn edge(&mut self, pin: u8) -> bool {
        let pin = PinRef::from_pin_number(pin);
        let port = &mut self.ports[pin.port as usize];
        if port.irq_pins & pin.mask() == 0 {
            return false;
        }
        port.pending |= pin.mask();
        port.irq_level == Some(IrqLevel::Low)
    }

    pub fn pending(&self, port: u8) -> PortMask {
        self.ports[port as usize].pending
    }

    pub fn is_driven(&self, pin: u8) -> bool {
        let pin = PinRef::from_pin_number(pin);
        self.driven(pin)
    }

    fn driven(&self, pin: PinRef) -> bool {
        let port = &self.ports[pin.port as usize];
        match port.outputs[pin.bit as usize] {
            Some(config) => (port.latch & pin.mask() != 0) == config.driving_latch(),
            None => false,
        }
    }

    fn driven_count(&self) -> usize {
        (0..self.ports.len() as u8)
            .flat_map(|port| (0..PORT_SIZE).map(move |bit| PinRef { port, bit }))
            .filter(|&pin| self.driven(pin))
            .count()
    }

    fn read(&mut self, port: u8) -> PortMask {
        self.events.push(Event::Read(port));
        let driven = self.driven_count();
        self.driven_at_read.push(driven);

        let mut value = self.ports[port as usize].levels;
        for &(row, col) in &self.switches {
            if col.port == port && self.driven(row) {
                value |= col.mask();
            }
        }
        value
    }

    /// Configuration writes seen so far, ignoring latch writes and reads.
    pub fn config_events(&self) -> usize {
        self.events
            .iter()
            .filter(|event| {
                matches!(event, Event::ConfigureInputs(..) | Event::ConfigureOutputs(..))
            })
            .count()
    }
}

pub struct MockPort {
    index: u8,
    bus: Rc<RefCell<Bus>>,
}

pub fn ports<const PORTS: usize>() -> (Rc<RefCell<Bus>>, [MockPort; PORTS]) {
    let bus = Rc::new(RefCell::new(Bus::default()));
    bus.borrow_mut().ports.resize_with(PORTS, PortState::default);
    let ports = core::array::from_fn(|index| handle(&bus, index as u8));
    (bus, ports)
}

/// Second handle on a port, the way an interrupt handler sees it.
pub fn handle(bus: &Rc<RefCell<Bus>>, index: u8) -> MockPort {
    MockPort { index, bus: bus.clone() }
}

impl IrqFlags for MockPort {
    fn clear_irq_flags(&mut self) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::ClearIrqFlags(self.index));
        bus.ports[self.index as usize].pending = 0;
    }
}

impl Port for MockPort {
    fn configure_inputs(&mut self, mask: PortMask, config: InputConfig) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::ConfigureInputs(self.index, mask, config));
        let port = &mut bus.ports[self.index as usize];
        for bit in 0..PORT_SIZE as usize {
            if mask & (1 << bit) != 0 {
                port.inputs[bit] = Some(config);
                port.outputs[bit] = None;
            }
        }
    }

    fn configure_outputs(&mut self, mask: PortMask, config: OutputConfig) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::ConfigureOutputs(self.index, mask, config));
        let port = &mut bus.ports[self.index as usize];
        for bit in 0..PORT_SIZE as usize {
            if mask & (1 << bit) != 0 {
                port.outputs[bit] = Some(config);
                port.inputs[bit] = None;
            }
        }
    }

    fn out_set(&mut self, mask: PortMask) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::OutSet(self.index, mask));
        bus.ports[self.index as usize].latch |= mask;
    }

    fn out_clear(&mut self, mask: PortMask) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::OutClear(self.index, mask));
        bus.ports[self.index as usize].latch &= !mask;
    }

    fn read(&self) -> PortMask {
        self.bus.borrow_mut().read(self.index)
    }

    fn enable_irq_pins(&mut self, mask: PortMask) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::EnableIrqPins(self.index, mask));
        bus.ports[self.index as usize].irq_pins |= mask;
    }

    fn set_irq_level(&mut self, level: IrqLevel) {
        let mut bus = self.bus.borrow_mut();
        bus.events.push(Event::IrqLevel(self.index, level));
        bus.ports[self.index as usize].irq_level = Some(level);
    }
}
