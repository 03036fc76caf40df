use embedded_hal::PwmPin;

/// Hot air gun fan, duty in logical units `0..=max_fan_speed`.
pub trait Fan {
    fn set_duty(&mut self, duty: u16);
    fn duty(&self) -> u16;
}

/// Fan driven by a timer PWM channel, the logical range is scaled onto the
/// channel's max duty.
pub struct FanPwm<P> {
    pwm: P,
    full_scale: u16,
    duty: u16,
}

impl<P> FanPwm<P>
where
    P: PwmPin<Duty = u16>,
{
    pub fn new(mut pwm: P, full_scale: u16) -> Self {
        pwm.set_duty(0);
        pwm.enable();
        FanPwm {
            pwm,
            full_scale: full_scale.max(1),
            duty: 0,
        }
    }
}

impl<P> Fan for FanPwm<P>
where
    P: PwmPin<Duty = u16>,
{
    fn set_duty(&mut self, duty: u16) {
        self.duty = duty.min(self.full_scale);
        let max_duty = self.pwm.get_max_duty() as u32;
        let raw = self.duty as u32 * max_duty / self.full_scale as u32;
        self.pwm.set_duty(raw as u16);
    }

    fn duty(&self) -> u16 {
        self.duty
    }
}
