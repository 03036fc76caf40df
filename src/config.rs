// src/config.rs
use core::fmt;

// Configuration struct to store the hot air gun constants.
// All temperatures are in internal (sensor) units, times in ms.
#[derive(Clone, Debug, PartialEq)]
pub struct GunConfig {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
    /// Power-of-two denominator of the PID gains, 11 means divide by 2048
    pub pid_denominator: u8,
    /// Error below which the PID switches to the iterative formula
    pub pid_iterate_band: i32,
    /// AC half-cycles per power period
    pub period: u8,
    /// Control periods to wait after the relay has been energized
    pub relay_settle: u8,
    pub max_power: u8,
    pub max_fix_power: u8,
    pub temp_max: u16,
    pub overheat_margin: u16,
    pub overshoot_limit: u16,
    pub chill_recover: u16,
    pub temp_cold: u16,
    pub min_fan_speed: u16,
    pub max_fan_speed: u16,
    pub max_cool_fan: u16,
    pub extra_cooling_ms: u32,
    pub fan_off_timeout_ms: u32,
    pub sync_timeout_ms: u32,
    pub power_trend_len: u16,
    pub deviation_trend_len: u16,
}

impl Default for GunConfig {
    fn default() -> Self {
        GunConfig {
            kp: 50,
            ki: 16,
            kd: 50,
            pid_denominator: 11,
            pid_iterate_band: 30,
            period: 100,
            relay_settle: 2,
            max_power: 99,
            max_fix_power: 70,
            temp_max: 950,
            overheat_margin: 30,
            overshoot_limit: 100,
            chill_recover: 2,
            temp_cold: 20,
            min_fan_speed: 600,
            max_fan_speed: 1999,
            max_cool_fan: 1700,
            extra_cooling_ms: 60_000,
            fan_off_timeout_ms: 5 * 60 * 1000,
            sync_timeout_ms: 1500,
            power_trend_len: 10,
            deviation_trend_len: 200,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    PeriodTooShort(u8),
    PowerExceedsPeriod { max_power: u8, period: u8 },
    FixedPowerExceedsMax { max_fix_power: u8, max_power: u8 },
    FanRange { min: u16, max: u16 },
    CoolingFanOutOfRange(u16),
    Denominator(u8),
    TrendLength,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PeriodTooShort(p) => write!(f, "phase period {} is too short", p),
            ConfigError::PowerExceedsPeriod { max_power, period } => {
                write!(f, "max power {} must be below the period {}", max_power, period)
            }
            ConfigError::FixedPowerExceedsMax {
                max_fix_power,
                max_power,
            } => write!(f, "max fixed power {} exceeds max power {}", max_fix_power, max_power),
            ConfigError::FanRange { min, max } => {
                write!(f, "fan speed range {}..{} is empty", min, max)
            }
            ConfigError::CoolingFanOutOfRange(v) => {
                write!(f, "cooling fan speed {} is outside the fan range", v)
            }
            ConfigError::Denominator(d) => write!(f, "PID denominator 2^{} is not supported", d),
            ConfigError::TrendLength => write!(f, "trend filter length must be positive"),
        }
    }
}

impl GunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period < 2 {
            return Err(ConfigError::PeriodTooShort(self.period));
        }
        if self.max_power >= self.period {
            return Err(ConfigError::PowerExceedsPeriod {
                max_power: self.max_power,
                period: self.period,
            });
        }
        if self.max_fix_power > self.max_power {
            return Err(ConfigError::FixedPowerExceedsMax {
                max_fix_power: self.max_fix_power,
                max_power: self.max_power,
            });
        }
        if self.min_fan_speed > self.max_fan_speed {
            return Err(ConfigError::FanRange {
                min: self.min_fan_speed,
                max: self.max_fan_speed,
            });
        }
        if self.max_cool_fan < self.min_fan_speed || self.max_cool_fan > self.max_fan_speed {
            return Err(ConfigError::CoolingFanOutOfRange(self.max_cool_fan));
        }
        // the rounding term 2^(d-1) and the gains have to fit into an i32 accumulator
        if self.pid_denominator == 0 || self.pid_denominator > 20 {
            return Err(ConfigError::Denominator(self.pid_denominator));
        }
        if self.power_trend_len == 0 || self.deviation_trend_len == 0 {
            return Err(ConfigError::TrendLength);
        }
        Ok(())
    }
}
