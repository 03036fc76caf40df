use embedded_hal::digital::v2::OutputPin;
use log::{info, trace, warn};

use crate::calibration::TempUnits;
use crate::config::{ConfigError, GunConfig};
use crate::devices::fan::Fan;
use crate::devices::sensor::Sensor;
use crate::ema::TrendFilter;
use crate::intrpt::TickPath;
use crate::pid::{PidParam, PID};
use crate::relay::SafetyRelay;
use crate::utils::{map, PowerMode, Telemetry};

// true once `now` is at or past `deadline`, survives the u32 ms wrap
fn reached(now_ms: u32, deadline: u32) -> bool {
    now_ms.wrapping_sub(deadline) as i32 >= 0
}

/// Hot air gun manager.
///
/// `advance()` is the supervisory step, call it once per power period
/// (when [`TickPath::sync_cb`] reports the end of a period). The setters are
/// for the menu layer and may be called at any time in between.
pub struct HotGun<'a, GATE, SENSOR, RELAY, FAN> {
    tick: &'a TickPath<GATE, SENSOR>,
    relay: SafetyRelay<RELAY>,
    fan: FAN,
    pid: PID,
    config: GunConfig,
    mode: PowerMode,
    fix_power: u8,
    chill: bool,
    temp_set: u16,
    fan_speed: u16,
    fan_off_time: Option<u32>,
    extra_cooling: Option<u32>,
    h_power: TrendFilter,
    d_power: TrendFilter,
}

impl<'a, GATE, SENSOR, RELAY, FAN> HotGun<'a, GATE, SENSOR, RELAY, FAN>
where
    GATE: OutputPin,
    SENSOR: Sensor,
    RELAY: OutputPin,
    FAN: Fan,
{
    pub fn new(
        tick: &'a TickPath<GATE, SENSOR>,
        relay: RELAY,
        fan: FAN,
        config: GunConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut gun = HotGun {
            tick,
            relay: SafetyRelay::new(relay, config.relay_settle),
            fan,
            pid: PID::new(&config),
            mode: PowerMode::Off,
            fix_power: 0,
            chill: false,
            temp_set: 0,
            fan_speed: 0,
            fan_off_time: None,
            extra_cooling: None,
            h_power: TrendFilter::new(config.power_trend_len),
            d_power: TrendFilter::new(config.deviation_trend_len),
            config,
        };
        gun.init();
        Ok(gun)
    }

    /// Completely stop the gun and forget all history.
    pub fn init(&mut self) {
        self.mode = PowerMode::Off;
        self.fan_speed = 0;
        self.fix_power = 0;
        self.chill = false;
        self.fan_off_time = None;
        self.extra_cooling = None;
        self.tick.cut();
        self.relay.set(false);
        self.fan.set_duty(0);
        self.tick.reset_temp();
        self.h_power.set_length(self.config.power_trend_len);
        self.d_power.set_length(self.config.deviation_trend_len);
        self.pid.reset(-1);
    }

    pub fn config(&self) -> &GunConfig {
        &self.config
    }

    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    pub fn is_on(&self) -> bool {
        matches!(self.mode, PowerMode::On | PowerMode::Fixed)
    }

    pub fn preset_temp(&self) -> u16 {
        self.temp_set
    }

    pub fn preset_fan(&self) -> u16 {
        self.fan_speed
    }

    pub fn average_temp(&self) -> u16 {
        self.tick.average_temp()
    }

    /// Last raw sensor reading
    pub fn curr_temp(&self) -> u16 {
        self.tick.last_temp()
    }

    pub fn average_power(&self) -> u16 {
        self.h_power.read().max(0) as u16
    }

    /// Duty currently fed to the heater, 0..period-1
    pub fn applied_power(&self) -> u8 {
        self.tick.duty()
    }

    pub fn fan_speed(&self) -> u16 {
        self.fan.duty()
    }

    pub fn max_fan_speed(&self) -> u16 {
        self.config.max_fan_speed
    }

    pub fn max_fix_power(&self) -> u8 {
        self.config.max_fix_power
    }

    pub fn is_cold(&self) -> bool {
        self.average_temp() < self.config.temp_cold
    }

    pub fn is_fan_working(&self) -> bool {
        self.fan_speed() >= self.config.min_fan_speed
    }

    pub fn is_chilling(&self) -> bool {
        self.chill
    }

    /// When the fan is expected to be off again, informational only.
    pub fn cooling_deadline(&self) -> Option<u32> {
        self.fan_off_time
    }

    pub fn relay_countdown(&self) -> u8 {
        self.relay.countdown()
    }

    pub fn is_relay_energized(&self) -> bool {
        self.relay.is_energized()
    }

    pub fn temp_dispersion(&self) -> u16 {
        self.tick.temp_dispersion()
    }

    pub fn pwr_dispersion(&self) -> u16 {
        self.d_power.read().clamp(0, u16::MAX as i32) as u16
    }

    /// Mains zero-cross interrupts are still coming in.
    pub fn is_synchronized(&self, now_ms: u32) -> bool {
        self.tick.is_synchronized(now_ms, self.config.sync_timeout_ms)
    }

    pub fn avg_power_pcnt(&self) -> u8 {
        let pcnt = if self.mode == PowerMode::Fixed {
            map(self.fix_power as i32, 0, self.config.max_fix_power as i32, 0, 100)
        } else {
            map(self.h_power.read(), 0, self.config.max_power as i32, 0, 100)
        };
        pcnt.clamp(0, 100) as u8
    }

    pub fn preset_fan_pcnt(&self) -> u8 {
        map(self.fan_speed as i32, 0, self.config.max_fan_speed as i32, 0, 100).clamp(0, 100) as u8
    }

    pub fn set_temp(&mut self, temp: u16) {
        self.temp_set = temp.min(self.config.temp_max);
    }

    pub fn set_fan(&mut self, fan: u16) {
        self.fan_speed = fan.clamp(self.config.min_fan_speed, self.config.max_fan_speed);
    }

    /// Drive the fan directly, e.g. while tuning.
    pub fn fan_fixed(&mut self, duty: u16) {
        self.fan.set_duty(duty.min(self.config.max_fan_speed));
    }

    /// Set or query (negative value) a PID gain.
    pub fn change_pid(&mut self, param: PidParam, value: i32) -> i32 {
        self.pid.change(param, value)
    }

    pub fn switch_power(&mut self, on: bool, now_ms: u32) {
        self.fan_off_time = None;
        let fan = self.is_fan_working();
        match self.mode {
            PowerMode::Off => {
                if on {
                    self.start_heating();
                } else if fan {
                    self.cool_or_shutdown(now_ms);
                } else {
                    // TODO: confirm with the safety requirements whether the relay
                    // should really be energized here without a power request
                    warn!("gun: power off requested without a fan, relay energized");
                    self.safety_relay(true);
                }
            }
            PowerMode::On => {
                if !on {
                    self.start_cooling(now_ms);
                }
            }
            PowerMode::Fixed => {
                if fan {
                    if on {
                        self.enter_on();
                    } else {
                        self.cool_or_shutdown(now_ms);
                    }
                } else if !on {
                    self.shutdown();
                }
            }
            PowerMode::Cooling => {
                if on {
                    self.start_heating();
                } else if fan && self.is_cold() {
                    self.shutdown();
                }
            }
        }
        self.h_power.reset();
        self.d_power.reset();
    }

    /// Supply fixed power to the heater, zero switches the gun off.
    pub fn fix_power(&mut self, power: u8, now_ms: u32) {
        if power == 0 {
            self.switch_power(false, now_ms);
            return;
        }
        self.fix_power = power.min(self.config.max_power);
        self.set_mode(PowerMode::Fixed);
        self.safety_relay(true);
    }

    /// Stop everything now: heater gate, relay and fan.
    pub fn shutdown(&mut self) {
        self.set_mode(PowerMode::Off);
        self.fan.set_duty(0);
        self.safety_relay(false);
        self.fan_off_time = None;
        self.extra_cooling = None;
    }

    /// The supervisory step: compute the heater power for the next period.
    /// Returns the duty handed to the phase modulator.
    pub fn advance(&mut self, now_ms: u32) -> u8 {
        let t = self.average_temp();

        // prevent global over heating
        if t >= self.config.temp_max.saturating_add(self.config.overheat_margin)
            || t > self.temp_set.saturating_add(self.config.overshoot_limit)
        {
            if self.mode == PowerMode::On && !self.chill {
                warn!("gun: overheat at {}, preset {}, chilling", t, self.temp_set);
                self.chill = true;
            }
        }

        let mut p: i32 = 0;
        match self.mode {
            PowerMode::Off => {}
            PowerMode::On => {
                // the fan goes first, the heater is only powered with a working fan
                self.fan.set_duty(self.fan_speed);
                if self.chill && t < self.temp_set.saturating_sub(self.config.chill_recover) {
                    info!("gun: cooled down to {}, resuming", t);
                    self.chill = false;
                    self.pid.reset(-1);
                }
                if !self.chill && self.relay.settled() {
                    p = self
                        .pid
                        .req_power(self.temp_set as i32, t as i32)
                        .clamp(0, self.config.max_power as i32);
                }
            }
            PowerMode::Fixed => {
                if self.relay.settled() {
                    p = self.fix_power as i32;
                }
                self.fan.set_duty(self.fan_speed);
            }
            PowerMode::Cooling => self.keep_cooling(t, now_ms),
        }

        // only supply the power to the heater if the gun is connected
        if !self.is_fan_working() {
            p = 0;
        }
        let ap = self.h_power.average(p);
        self.h_power.update(p);
        let diff = ap - p;
        self.d_power.update(diff.saturating_mul(diff));

        let duty = p.clamp(0, self.config.period as i32 - 1) as u8;
        trace!("gun: mode {}, t={}, power={}", self.mode.as_str(), t, duty);
        self.tick.set_duty(duty);
        duty
    }

    pub fn telemetry<U: TempUnits>(&self, units: &U) -> Telemetry {
        Telemetry {
            mode: self.mode,
            preset_temp: units.human(self.temp_set),
            preset_fan: self.fan_speed,
            average_temp: units.human(self.average_temp()),
            average_power: self.average_power(),
            applied_power: self.applied_power(),
            avg_power_pcnt: self.avg_power_pcnt(),
            fan_speed: self.fan_speed(),
            is_on: self.is_on(),
            is_cold: self.is_cold(),
            is_fan_working: self.is_fan_working(),
            chill: self.chill,
            temp_dispersion: self.temp_dispersion(),
            pwr_dispersion: self.pwr_dispersion(),
        }
    }

    fn keep_cooling(&mut self, t: u16, now_ms: u32) {
        if !self.is_fan_working() {
            info!("gun: fan stopped while cooling, shutting down");
            self.shutdown();
        } else if self.is_cold() {
            match self.extra_cooling {
                // wait a bit more to completely cool the gun
                None => self.extra_cooling = Some(now_ms.wrapping_add(self.config.extra_cooling_ms)),
                Some(deadline) if reached(now_ms, deadline) => self.shutdown(),
                Some(_) => {}
            }
        } else {
            let fan = map(
                t as i32,
                self.config.temp_cold as i32,
                self.temp_set as i32,
                self.config.max_cool_fan as i32,
                self.config.min_fan_speed as i32,
            );
            let fan = fan.clamp(
                self.config.min_fan_speed as i32,
                self.config.max_fan_speed as i32,
            );
            self.fan.set_duty(fan as u16);
        }
    }

    fn start_heating(&mut self) {
        self.safety_relay(true);
        self.enter_on();
    }

    fn enter_on(&mut self) {
        if self.mode != PowerMode::On {
            self.pid.reset(self.average_temp() as i32);
        }
        self.fan_off_time = None;
        self.extra_cooling = None;
        self.set_mode(PowerMode::On);
    }

    fn start_cooling(&mut self, now_ms: u32) {
        self.fan_off_time = Some(now_ms.wrapping_add(self.config.fan_off_timeout_ms));
        self.extra_cooling = None;
        self.set_mode(PowerMode::Cooling);
    }

    fn cool_or_shutdown(&mut self, now_ms: u32) {
        if self.is_cold() {
            self.shutdown();
        } else {
            self.start_cooling(now_ms);
        }
    }

    fn set_mode(&mut self, mode: PowerMode) {
        if self.mode != mode {
            info!("gun: {} -> {}", self.mode.as_str(), mode.as_str());
            self.mode = mode;
            self.h_power.reset();
            self.d_power.reset();
        }
        if !self.is_on() {
            self.tick.cut();
        }
    }

    // the heater must not be powered until the relay contacts have settled
    fn safety_relay(&mut self, energize: bool) {
        self.tick.cut();
        self.relay.set(energize);
    }
}
