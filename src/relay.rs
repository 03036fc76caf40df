use embedded_hal::digital::v2::OutputPin;

// The mains relay needs some time to close its contacts, so after energizing
// it the heater stays off for `settle` control periods.
pub struct SafetyRelay<RELAY> {
    pin: RELAY,
    settle: u8,
    ready_cnt: u8,
    energized: bool,
}

impl<RELAY: OutputPin> SafetyRelay<RELAY> {
    pub fn new(mut pin: RELAY, settle: u8) -> Self {
        let _ = pin.set_low();
        SafetyRelay {
            pin,
            settle,
            ready_cnt: 0,
            energized: false,
        }
    }

    pub fn set(&mut self, energize: bool) {
        if energize {
            let _ = self.pin.set_high();
            self.ready_cnt = self.settle;
        } else {
            let _ = self.pin.set_low();
            self.ready_cnt = 0;
        }
        self.energized = energize;
    }

    /// Called once per control period while power is wanted. Returns true
    /// when the relay is ready, otherwise counts the wait down.
    pub fn settled(&mut self) -> bool {
        if self.ready_cnt > 0 {
            self.ready_cnt -= 1;
            false
        } else {
            true
        }
    }

    pub fn countdown(&self) -> u8 {
        self.ready_cnt
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }
}
