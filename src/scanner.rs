use crate::{
    debounce::Debounce,
    driver::MatrixPins,
    error::{report, Error, ErrorRegister},
    idle_wake::WakeFlag,
    ledger::PinLedger,
    plan::{ScanMode, ScanPlan},
    port::{Port, PortMask},
    timing::{ClockConfig, CycleDelay, Timing},
};

/// Matrix scanner over `PORTS` ports with room for `MAX_ROWS` rows.
///
/// Built in two steps: [`Scanner::new`] takes ownership of the port handles,
/// [`Scanner::init`] claims and configures pins. A scanner whose init failed
/// stays usable but never reports a change.
pub struct Scanner<'a, P, const PORTS: usize, const MAX_ROWS: usize> {
    pub(crate) ports: [P; PORTS],
    pub(crate) pins: MatrixPins<PORTS, MAX_ROWS>,
    pub(crate) timing: Timing,
    pub(crate) wake: &'a WakeFlag,
    plan: ScanPlan<'a>,
    mode: Option<ScanMode>,
    bytes_per_row: usize,
}

impl<'a, P: Port, const PORTS: usize, const MAX_ROWS: usize> Scanner<'a, P, PORTS, MAX_ROWS> {
    pub fn new(ports: [P; PORTS], plan: ScanPlan<'a>, wake: &'a WakeFlag) -> Self {
        Self {
            ports,
            pins: MatrixPins::new(),
            timing: Timing::default(),
            wake,
            plan,
            mode: None,
            bytes_per_row: 0,
        }
    }

    /// Claim and configure the matrix pins and derive the settle delays.
    ///
    /// Any error is registered with `errors` before it is returned. A plan
    /// that does not fit the build is replaced with the zeroed plan before a
    /// single pin is touched.
    pub fn init(
        &mut self,
        ledger: &mut PinLedger<PORTS>,
        errors: &ErrorRegister,
        clock: &ClockConfig,
    ) -> Result<(), Error> {
        let result = self.setup(ledger, clock);
        report(errors, result)
    }

    fn setup(&mut self, ledger: &mut PinLedger<PORTS>, clock: &ClockConfig) -> Result<(), Error> {
        if let Err(error) = self.plan.validate(MAX_ROWS, PORTS) {
            self.plan = ScanPlan::default();
            return Err(error);
        }

        let mode = ScanMode::try_from(self.plan.mode)?;
        self.bytes_per_row = self.plan.bytes_per_row();

        if mode.has_rows() {
            self.pins.setup_rows(&mut self.ports, ledger, &self.plan, mode)?;
        }
        self.pins.setup_columns(&mut self.ports, ledger, &self.plan, mode)?;

        // Rows released, wake interrupt off.
        self.irq_disable();

        self.timing = Timing::new(
            self.plan.parasitic_discharge_delay_idle,
            self.plan.parasitic_discharge_delay_debouncing,
            clock,
        );
        self.mode = Some(mode);

        info!(
            "scanner ready: {} {=u8} rows {=u8} cols",
            mode,
            self.plan.rows,
            self.plan.cols
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.mode.is_some()
    }

    pub fn plan(&self) -> &ScanPlan<'a> {
        &self.plan
    }

    pub fn mode(&self) -> Option<ScanMode> {
        self.mode
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    /// Column pins of `port` that belong to the matrix.
    pub fn col_mask(&self, port: u8) -> PortMask {
        self.pins.col_mask(port)
    }

    pub fn select_row(&mut self, row: u8) {
        self.pins.select_row(&mut self.ports, row);
    }

    pub fn unselect_row(&mut self, row: u8) {
        self.pins.unselect_row(&mut self.ports, row);
    }

    pub fn select_all_rows(&mut self) {
        self.pins.select_all_rows(&mut self.ports);
    }

    pub fn unselect_all_rows(&mut self) {
        self.pins.unselect_all_rows(&mut self.ports);
    }

    /// With every row selected, whether any key anywhere is down.
    ///
    /// Meaningless mid scan, where only one row is driven.
    pub fn has_active_row(&self) -> bool {
        self.pins.any_column_active(&self.ports)
    }

    /// Run one full scan cycle, returns whether any row's debounced state changed.
    pub fn scan<D: Debounce, W: CycleDelay>(&mut self, debounce: &mut D, delay: &mut W) -> bool {
        match self.mode {
            Some(mode) if mode.has_rows() => self.scan_rows(debounce, delay),
            Some(_) => self.scan_row(0, debounce),
            None => false,
        }
    }

    fn scan_rows<D: Debounce, W: CycleDelay>(&mut self, debounce: &mut D, delay: &mut W) -> bool {
        let mut changed = false;

        for row in 0..self.plan.rows {
            self.select_row(row);

            // After driving a row, a column does not follow instantly: each
            // pin, diode and switch on the column adds parasitic capacitance
            // that the pull resistor has to charge. With a 24kΩ pull, 10pF per
            // pin and 2pF per switch/diode pair, t = 2RC is about 2µs for 16
            // columns. The plan's delays are sized for that.
            //
            // One key debouncing anywhere selects the longer delay for every row.
            let debouncing = debounce.keys_debouncing() != 0;
            delay.delay_cycles(self.timing.settle_cycles(debouncing));

            changed |= self.scan_row(row, debounce);
            self.unselect_row(row);
        }

        changed
    }

    fn scan_row<D: Debounce>(&self, row: u8, debounce: &mut D) -> bool {
        let mut sample = [0; PORTS];
        self.pins.sample(&self.ports, &mut sample);
        debounce.debounce_row(row, &sample, self.bytes_per_row)
    }
}
