use core::marker::PhantomData;
use embedded_hal::adc::{Channel, OneShot};

/// Source of the raw heater temperature, one reading per AC half-cycle.
///
/// Must not block: return `nb::Error::WouldBlock` if no conversion is ready,
/// the tick then keeps the previous history.
pub trait Sensor {
    type Error;

    fn read(&mut self) -> nb::Result<u16, Self::Error>;
}

/// Thermocouple amplifier wired to an ADC input.
pub struct AdcSensor<A, ADC, PIN> {
    adc: A,
    pin: PIN,
    _adc: PhantomData<ADC>,
}

impl<A, ADC, PIN> AdcSensor<A, ADC, PIN>
where
    A: OneShot<ADC, u16, PIN>,
    PIN: Channel<ADC>,
{
    pub fn new(adc: A, pin: PIN) -> Self {
        AdcSensor {
            adc,
            pin,
            _adc: PhantomData,
        }
    }

    pub fn release(self) -> (A, PIN) {
        (self.adc, self.pin)
    }
}

impl<A, ADC, PIN> Sensor for AdcSensor<A, ADC, PIN>
where
    A: OneShot<ADC, u16, PIN>,
    PIN: Channel<ADC>,
{
    type Error = A::Error;

    fn read(&mut self) -> nb::Result<u16, Self::Error> {
        self.adc.read(&mut self.pin)
    }
}
