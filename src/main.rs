// Matrix scanner firmware for the key ripper board, sleeping between keypresses.

#![no_main]
#![no_std]

use core::cell::RefCell;

use critical_section::Mutex;
use defmt::{debug, error, info};
use defmt_rtt as _;
use fugit::RateExtU32;
use key_scanner::{
    service_interrupt, ClockConfig, ClockMode, CycleDelay, Debounce, EagerDebounce, ErrorRegister,
    PinLedger, PortMask, ScanMode, ScanPlan, Scanner, WakeFlag,
};
use panic_probe as _;
use rp2040_hal::{
    pac::{self, interrupt},
    Clock, Watchdog,
};

use crate::bank0::{Bank0Port, EdgeFlags, PORTS};

mod bank0;

/// The linker will place this boot block at the start of our program image. We
/// need this to help the ROM bootloader get our code up and running.
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

const MAX_ROWS: usize = 14;

/// GPIO 0 to 29.
const USABLE_PINS: [PortMask; PORTS] = [0xff, 0xff, 0xff, 0x3f];

const ROW_PINS: [u8; MAX_ROWS] = [29, 16, 17, 18, 9, 10, 19, 11, 12, 13, 14, 20, 22, 23];
const COL_PINS: [u8; 6] = [26, 25, 27, 28, 15, 24];

const SCAN_PLAN: ScanPlan<'static> = ScanPlan {
    mode: ScanMode::RowCol as u8,
    rows: ROW_PINS.len() as u8,
    cols: COL_PINS.len() as u8,
    max_col_pin_number: 28,
    // Cycles at the crystal frequency: 2µs and 10µs.
    parasitic_discharge_delay_idle: 24,
    parasitic_discharge_delay_debouncing: 120,
    row_pins: &ROW_PINS,
    col_pins: &COL_PINS,
};

const EXTERNAL_CRYSTAL_FREQUENCY_HZ: u32 = 12_000_000;

const SCAN_PERIOD_MS: u32 = 1;
const DEBOUNCE_SCANS: u8 = 5;
/// Quiet scans before arming the wake interrupt and sleeping.
const IDLE_SCANS: u32 = 500;

static ERRORS: ErrorRegister = ErrorRegister::new();
static WAKE: WakeFlag = WakeFlag::new();
static EDGES: Mutex<RefCell<Option<EdgeFlags>>> = Mutex::new(RefCell::new(None));

struct BusyWait;

impl CycleDelay for BusyWait {
    fn delay_cycles(&mut self, cycles: u32) {
        cortex_m::asm::delay(cycles);
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

#[cortex_m_rt::entry]
fn main() -> ! {
    info!("Start of main()");
    let mut pac = defmt::unwrap!(pac::Peripherals::take());
    let mut core = defmt::unwrap!(pac::CorePeripherals::take());

    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    let clocks = defmt::unwrap!(rp2040_hal::clocks::init_clocks_and_plls(
        EXTERNAL_CRYSTAL_FREQUENCY_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok());

    let clock = ClockConfig {
        reference: EXTERNAL_CRYSTAL_FREQUENCY_HZ.Hz(),
        fast: clocks.system_clock.freq(),
        slow: EXTERNAL_CRYSTAL_FREQUENCY_HZ.Hz(),
        mode: ClockMode::Fast,
    };

    // Get the GPIO peripherals.
    let sio = rp2040_hal::Sio::new(pac.SIO);
    let pins =
        rp2040_hal::gpio::Pins::new(pac.IO_BANK0, pac.PADS_BANK0, sio.gpio_bank0, &mut pac.RESETS);

    let mut ledger = PinLedger::new(USABLE_PINS);
    let mut scanner: Scanner<'static, _, PORTS, MAX_ROWS> =
        Scanner::new(Bank0Port::take(pins), SCAN_PLAN, &WAKE);

    // A failed init is already in ERRORS, keep running without a matrix.
    if scanner.init(&mut ledger, &ERRORS, &clock).is_ok() {
        let masks = core::array::from_fn(|port| scanner.col_mask(port as u8));
        critical_section::with(|cs| EDGES.borrow_ref_mut(cs).replace(EdgeFlags::new(masks)));

        // SAFETY: the handler only touches EDGES and WAKE, both ready above.
        unsafe {
            core.NVIC.set_priority(pac::Interrupt::IO_IRQ_BANK0, 0xc0);
            pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
        }
    } else {
        error!("matrix disabled, errors {=u8:#b}", ERRORS.bits());
    }

    let mut delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());
    let mut debounce = EagerDebounce::<MAX_ROWS, PORTS>::with_expiration(DEBOUNCE_SCANS);
    let mut quiet_scans: u32 = 0;

    info!("Start main loop");

    loop {
        if scanner.scan(&mut debounce, &mut BusyWait) {
            quiet_scans = 0;
            log_keys(&debounce);
        } else {
            quiet_scans = quiet_scans.saturating_add(1);
        }

        if scanner.is_initialized() && quiet_scans >= IDLE_SCANS && debounce.keys_debouncing() == 0
        {
            sleep_until_keypress(&mut scanner);
            quiet_scans = 0;
        }

        delay.delay_ms(SCAN_PERIOD_MS);
    }
}

fn sleep_until_keypress(scanner: &mut Scanner<'static, Bank0Port, PORTS, MAX_ROWS>) {
    scanner.irq_enable(&mut BusyWait);

    // A key held down while arming would never produce an edge.
    if !scanner.has_active_row() {
        debug!("sleeping");
        cortex_m::interrupt::disable();
        while !scanner.irq_has_triggered() {
            // Wakes on the pending interrupt even with interrupts masked.
            cortex_m::asm::wfi();
            // SAFETY: not inside a critical section.
            unsafe { cortex_m::interrupt::enable() };
            cortex_m::interrupt::disable();
        }
        // SAFETY: as above.
        unsafe { cortex_m::interrupt::enable() };
        debug!("woken");
    }

    scanner.irq_disable();
    scanner.irq_clear();
}

fn log_keys(debounce: &EagerDebounce<MAX_ROWS, PORTS>) {
    for row in 0..MAX_ROWS as u8 {
        for &col in &COL_PINS {
            if debounce.is_pressed(row, col) {
                info!("row {=u8} col gpio{=u8} down", row, col);
            }
        }
    }
}

#[interrupt]
fn IO_IRQ_BANK0() {
    critical_section::with(|cs| {
        if let Some(edges) = EDGES.borrow_ref_mut(cs).as_mut() {
            service_interrupt(edges, &WAKE);
        }
    });
}
