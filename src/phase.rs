use embedded_hal::digital::v2::OutputPin;

/// Full-wave power modulation of the heater.
///
/// The triac gate switches on whole AC half-cycles only, so instead of real
/// PWM a counter runs over `period` half-cycles and the gate is held high for
/// the first `duty` of them.
pub struct PhaseModulator<GATE> {
    gate: GATE,
    period: u8,
    cnt: u8,
    duty: u8,
    active: bool,
    last_period: u32,
}

impl<GATE: OutputPin> PhaseModulator<GATE> {
    pub fn new(mut gate: GATE, period: u8) -> Self {
        let _ = gate.set_low();
        PhaseModulator {
            gate,
            period: period.max(2),
            cnt: 0,
            duty: 0,
            active: false,
            last_period: 0,
        }
    }

    /// Advance one half-cycle, returns true at the start of a new period.
    pub fn sync(&mut self, now_ms: u32) -> bool {
        self.cnt += 1;
        if self.cnt >= self.period {
            self.cnt = 0;
            self.last_period = now_ms;
            if !self.active && self.duty > 0 {
                let _ = self.gate.set_high();
                self.active = true;
            }
        } else if self.cnt >= self.duty && self.active {
            let _ = self.gate.set_low();
            self.active = false;
        }
        self.cnt == 0
    }

    /// New duty for the following half-cycles, limited to `period - 1`.
    pub fn set_duty(&mut self, duty: u8) {
        self.duty = duty.min(self.period - 1);
        if self.duty == 0 {
            self.cut();
        }
    }

    /// Drop the gate now instead of waiting for the counter.
    pub fn cut(&mut self) {
        self.duty = 0;
        let _ = self.gate.set_low();
        self.active = false;
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn counter(&self) -> u8 {
        self.cnt
    }

    pub fn period(&self) -> u8 {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_period(&self) -> u32 {
        self.last_period
    }
}
