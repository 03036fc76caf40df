// Mocks of the hot air gun hardware shared by the unit tests.
// Clones share their state, so a test keeps one handle and moves the other
// into the code under test.

use core::convert::Infallible;
use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::digital::v2::OutputPin;

use crate::devices::fan::Fan;
use crate::devices::sensor::Sensor;

#[derive(Clone, Default)]
pub struct MockPin {
    high: Rc<Cell<bool>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl OutputPin for MockPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockSensor {
    value: Rc<Cell<u16>>,
    busy: Rc<Cell<bool>>,
}

impl MockSensor {
    pub fn new(value: u16) -> Self {
        MockSensor {
            value: Rc::new(Cell::new(value)),
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn set(&self, value: u16) {
        self.value.set(value);
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.set(busy);
    }
}

impl Sensor for MockSensor {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u16, Self::Error> {
        if self.busy.get() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(self.value.get())
        }
    }
}

#[derive(Clone, Default)]
pub struct MockFan {
    duty: Rc<Cell<u16>>,
}

impl MockFan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u16 {
        self.duty.get()
    }

    /// Simulate the fan stalling or being unplugged.
    pub fn force(&self, duty: u16) {
        self.duty.set(duty);
    }
}

impl Fan for MockFan {
    fn set_duty(&mut self, duty: u16) {
        self.duty.set(duty);
    }

    fn duty(&self) -> u16 {
        self.duty.get()
    }
}
