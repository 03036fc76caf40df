use core::fmt;

use arrform::{arrform, ArrForm};
use embedded_hal::digital::v2::OutputPin;

use crate::calibration::TempUnits;
use crate::devices::fan::Fan;
use crate::devices::sensor::Sensor;
use crate::gun::HotGun;
use crate::pid::PidParam;
use crate::utils::Telemetry;

// Commands received over the serial port
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GunCommand {
    /// Preset temperature in Celsius
    SetTemp(u16),
    SetFan(u16),
    Power(bool),
    FixPower(u8),
    /// Set a PID gain, negative value only queries it
    Pid(PidParam, i32),
    Housekeeping(bool),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    NotACommand,
    Invalid,
    NoValue,
    OutOfRange,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::NotACommand => write!(f, "not a command"),
            CommandError::Invalid => write!(f, "command invalid"),
            CommandError::NoValue => write!(f, "no value found"),
            CommandError::OutOfRange => write!(f, "value out of range"),
        }
    }
}

fn extract_value(cmd: &str) -> Option<i32> {
    let start_index = cmd.find('=')? + 1;
    let rest = &cmd[start_index..];
    let end_index = rest
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    rest[..end_index].parse::<i32>().ok()
}

fn bounded<T: TryFrom<i32>>(value: i32) -> Result<T, CommandError> {
    T::try_from(value).map_err(|_| CommandError::OutOfRange)
}

pub fn parse_command(line: &str) -> Result<GunCommand, CommandError> {
    let cmd = match line.find("[CMD]") {
        None => return Err(CommandError::NotACommand),
        Some(i) => line[i + 5..].trim_start(),
    };
    let name = match cmd.find('=') {
        None => return Err(CommandError::NoValue),
        Some(i) => &cmd[..i],
    };
    let value = extract_value(cmd).ok_or(CommandError::NoValue)?;
    match name {
        "setTemp" => Ok(GunCommand::SetTemp(bounded(value)?)),
        "setFan" => Ok(GunCommand::SetFan(bounded(value)?)),
        "power" => Ok(GunCommand::Power(value != 0)),
        "fixPower" => Ok(GunCommand::FixPower(bounded(value)?)),
        "setKp" => Ok(GunCommand::Pid(PidParam::Kp, value)),
        "setKi" => Ok(GunCommand::Pid(PidParam::Ki, value)),
        "setKd" => Ok(GunCommand::Pid(PidParam::Kd, value)),
        "hk" => Ok(GunCommand::Housekeeping(value != 0)),
        _ => Err(CommandError::Invalid),
    }
}

/// Parse one line and apply it to the gun, returns the answer for the host.
pub fn extract_command<GATE, SENSOR, RELAY, FAN, U>(
    line: &str,
    gun: &mut HotGun<'_, GATE, SENSOR, RELAY, FAN>,
    units: &U,
    hk: &mut bool,
    now_ms: u32,
) -> ArrForm<64>
where
    GATE: OutputPin,
    SENSOR: Sensor,
    RELAY: OutputPin,
    FAN: Fan,
    U: TempUnits,
{
    match parse_command(line) {
        Ok(cmd) => execute(cmd, gun, units, hk, now_ms),
        Err(err) => arrform!(64, "[ACK] ERR {}", err),
    }
}

pub fn execute<GATE, SENSOR, RELAY, FAN, U>(
    cmd: GunCommand,
    gun: &mut HotGun<'_, GATE, SENSOR, RELAY, FAN>,
    units: &U,
    hk: &mut bool,
    now_ms: u32,
) -> ArrForm<64>
where
    GATE: OutputPin,
    SENSOR: Sensor,
    RELAY: OutputPin,
    FAN: Fan,
    U: TempUnits,
{
    match cmd {
        GunCommand::SetTemp(celsius) => {
            gun.set_temp(units.internal(celsius));
            arrform!(64, "[ACK] cmd OK, set temperature = {}", units.human(gun.preset_temp()))
        }
        GunCommand::SetFan(fan) => {
            gun.set_fan(fan);
            arrform!(64, "[ACK] cmd OK, set fan = {}", gun.preset_fan())
        }
        GunCommand::Power(on) => {
            gun.switch_power(on, now_ms);
            arrform!(64, "[ACK] cmd OK, mode = {}", gun.mode().as_str())
        }
        GunCommand::FixPower(power) => {
            gun.fix_power(power, now_ms);
            arrform!(64, "[ACK] cmd OK, mode = {}", gun.mode().as_str())
        }
        GunCommand::Pid(param, value) => {
            let gain = gun.change_pid(param, value);
            arrform!(64, "[ACK] cmd OK, {:?} = {}", param, gain)
        }
        GunCommand::Housekeeping(on) => {
            *hk = on;
            arrform!(64, "[ACK] cmd OK, housekeeping = {}", on)
        }
    }
}

pub fn send_housekeeping(t: &Telemetry) -> ArrForm<128> {
    arrform!(
        128,
        "[HG] {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}",
        t.mode.as_str(),
        t.preset_temp,
        t.preset_fan,
        t.average_temp,
        t.average_power,
        t.applied_power,
        t.avg_power_pcnt,
        t.fan_speed,
        t.is_on as u8,
        t.is_cold as u8,
        t.is_fan_working as u8,
        t.chill as u8,
        t.temp_dispersion,
        t.pwr_dispersion,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::config::GunConfig;
    use crate::intrpt::TickPath;
    use crate::phase::PhaseModulator;
    use crate::test_utils::{MockFan, MockPin, MockSensor};
    use crate::utils::PowerMode;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("[CMD] setTemp=250"), Ok(GunCommand::SetTemp(250)));
        assert_eq!(parse_command("[CMD] setFan=1200\r\n"), Ok(GunCommand::SetFan(1200)));
        assert_eq!(parse_command("[CMD] power=1"), Ok(GunCommand::Power(true)));
        assert_eq!(parse_command("[CMD] power=0"), Ok(GunCommand::Power(false)));
        assert_eq!(parse_command("[CMD] fixPower=40"), Ok(GunCommand::FixPower(40)));
        assert_eq!(
            parse_command("[CMD] setKi=-1"),
            Ok(GunCommand::Pid(PidParam::Ki, -1))
        );
        assert_eq!(parse_command("[CMD] hk=1"), Ok(GunCommand::Housekeeping(true)));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_command("setTemp=250"), Err(CommandError::NotACommand));
        assert_eq!(parse_command("[CMD] setTemp"), Err(CommandError::NoValue));
        assert_eq!(parse_command("[CMD] setTemp=abc"), Err(CommandError::NoValue));
        assert_eq!(parse_command("[CMD] boil=1"), Err(CommandError::Invalid));
        assert_eq!(parse_command("[CMD] fixPower=300"), Err(CommandError::OutOfRange));
        assert_eq!(parse_command("[CMD] setTemp=-5"), Err(CommandError::OutOfRange));
    }

    #[test]
    fn commands_drive_the_gun() {
        let tick = TickPath::new(PhaseModulator::new(MockPin::new(), 100), MockSensor::new(300));
        let fan = MockFan::new();
        let mut gun = HotGun::new(&tick, MockPin::new(), fan.clone(), GunConfig::default()).unwrap();
        let units = Calibration::default();
        let mut hk = false;

        let ack = extract_command("[CMD] setTemp=300", &mut gun, &units, &mut hk, 0);
        assert_eq!(ack.as_str(), "[ACK] cmd OK, set temperature = 300");
        assert_eq!(gun.preset_temp(), 751);

        extract_command("[CMD] setFan=1200", &mut gun, &units, &mut hk, 0);
        assert_eq!(gun.preset_fan(), 1200);

        let ack = extract_command("[CMD] power=1", &mut gun, &units, &mut hk, 0);
        assert_eq!(ack.as_str(), "[ACK] cmd OK, mode = ON");
        assert_eq!(gun.mode(), PowerMode::On);

        let ack = extract_command("[CMD] setKd=-1", &mut gun, &units, &mut hk, 0);
        assert_eq!(ack.as_str(), "[ACK] cmd OK, Kd = 50");

        extract_command("[CMD] hk=1", &mut gun, &units, &mut hk, 0);
        assert!(hk);

        let ack = extract_command("hello", &mut gun, &units, &mut hk, 0);
        assert_eq!(ack.as_str(), "[ACK] ERR not a command");
    }

    #[test]
    fn housekeeping_line() {
        let t = Telemetry {
            mode: PowerMode::Cooling,
            preset_temp: 300,
            preset_fan: 1200,
            average_temp: 250,
            average_power: 0,
            applied_power: 0,
            avg_power_pcnt: 0,
            fan_speed: 1100,
            is_on: false,
            is_cold: false,
            is_fan_working: true,
            chill: false,
            temp_dispersion: 4,
            pwr_dispersion: 0,
        };
        assert_eq!(
            send_housekeeping(&t).as_str(),
            "[HG] COOLING, 300, 1200, 250, 0, 0, 0, 1100, 0, 0, 1, 0, 4, 0"
        );
    }
}
