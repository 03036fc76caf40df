use log::{debug, trace};

use crate::config::GunConfig;

// temperatures outside of this range cannot prime the history
const PLAUSIBLE_TEMP: core::ops::Range<i32> = 1..1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PidParam {
    Kp,
    Ki,
    Kd,
}

impl TryFrom<u8> for PidParam {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PidParam::Kp),
            2 => Ok(PidParam::Ki),
            3 => Ok(PidParam::Kd),
            other => Err(other),
        }
    }
}

/// Fixed-point PID keeping the heater temperature.
///
/// Until the temperature comes within `iterate_band` of the target the
/// direct formula is used:
///
/// `U = Kp*(Xs - X) + Ki*sum(Xs - Xj)`
///
/// After that the iterative one:
///
/// `Un = Un-1 + Kp*(Xn-1 - Xn) + Ki*(Xs - Xn) + Kd*(Xn-2 + Xn - 2*Xn-1)`
///
/// Gains and the power accumulator are multiplied by `2^denominator`.
#[derive(Clone, Debug)]
pub struct PID {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
    prev0: i32,
    prev1: i32,
    iterate: bool,
    i_summ: i64,
    power: i64,
    denominator: u8,
    iterate_band: i32,
}

impl PID {
    pub fn new(config: &GunConfig) -> Self {
        PID {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            prev0: 0,
            prev1: 0,
            iterate: false,
            i_summ: 0,
            power: 0,
            denominator: config.pid_denominator,
            iterate_band: config.pid_iterate_band,
        }
    }

    /// Drop the history. A plausible `seed` becomes the previous sample.
    pub fn reset(&mut self, seed: i32) {
        self.prev0 = 0;
        self.power = 0;
        self.i_summ = 0;
        self.iterate = false;
        self.prev1 = if PLAUSIBLE_TEMP.contains(&seed) { seed } else { 0 };
    }

    /// Set a gain, a negative `value` only queries it.
    pub fn change(&mut self, param: PidParam, value: i32) -> i32 {
        let gain = match param {
            PidParam::Kp => &mut self.kp,
            PidParam::Ki => &mut self.ki,
            PidParam::Kd => &mut self.kd,
        };
        if value >= 0 {
            *gain = value;
        }
        *gain
    }

    pub fn is_iterating(&self) -> bool {
        self.prev0 != 0
    }

    pub fn req_power(&mut self, target: i32, current: i32) -> i32 {
        let error = target - current;
        if self.prev0 == 0 {
            if error.abs() < self.iterate_band && !self.iterate {
                debug!("pid: {} close to target {}, preparing iterations", current, target);
                self.iterate = true;
                self.power = 0;
                self.i_summ = 0;
            }
            self.i_summ = self.i_summ.saturating_add(error as i64);
            self.power = (self.kp as i64 * error as i64)
                .saturating_add((self.ki as i64).saturating_mul(self.i_summ));
        } else {
            let kp = self.kp as i64 * (self.prev1 - current) as i64;
            let ki = self.ki as i64 * error as i64;
            let kd = self.kd as i64 * (self.prev0 + current - 2 * self.prev1) as i64;
            let delta_p = kp + ki + kd;
            trace!("pid: kp={}, ki={}, kd={}, delta={}", kp, ki, kd, delta_p);
            self.power = self.power.saturating_add(delta_p);
        }
        if self.iterate {
            self.prev0 = self.prev1;
        }
        self.prev1 = current;
        self.scaled_power()
    }

    fn scaled_power(&self) -> i32 {
        let round = 1i64 << (self.denominator - 1);
        let pwr = self.power.saturating_add(round) >> self.denominator;
        pwr.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}
