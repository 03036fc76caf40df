#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Completely stopped, no power on the fan either
    Off,
    /// Keeping the preset temperature
    On,
    /// Fixed power supplied to the heater
    Fixed,
    /// Heater off, fan running until the gun is cold
    Cooling,
}

impl PowerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerMode::Off => "OFF",
            PowerMode::On => "ON",
            PowerMode::Fixed => "FIXED",
            PowerMode::Cooling => "COOLING",
        }
    }
}

// Snapshot of the gun state for the display / serial collaborators,
// temperatures in human units.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub mode: PowerMode,
    pub preset_temp: u16,
    pub preset_fan: u16,
    pub average_temp: u16,
    pub average_power: u16,
    pub applied_power: u8,
    pub avg_power_pcnt: u8,
    pub fan_speed: u16,
    pub is_on: bool,
    pub is_cold: bool,
    pub is_fan_working: bool,
    pub chill: bool,
    pub temp_dispersion: u16,
    pub pwr_dispersion: u16,
}

/// Linear re-mapping of `x` from one range onto another, `in_min == in_max`
/// maps everything onto `out_min`.
pub fn map(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    ((x - in_min) as i64 * (out_max - out_min) as i64 / (in_max - in_min) as i64) as i32 + out_min
}
