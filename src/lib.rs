#![cfg_attr(not(test), no_std)]

//! Thermal control core of a hot air rework station.
//!
//! The zero-cross interrupt drives [`TickPath`], the main loop drives
//! [`HotGun::advance`] once per power period.

pub mod calibration;
pub mod commands;
pub mod config;
pub mod devices;
pub mod ema;
pub mod gun;
pub mod hist;
pub mod intrpt;
pub mod phase;
pub mod pid;
pub mod relay;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use calibration::{Calibration, TempUnits};
pub use config::{ConfigError, GunConfig};
pub use gun::HotGun;
pub use intrpt::TickPath;
pub use phase::PhaseModulator;
pub use pid::{PidParam, PID};
pub use utils::{PowerMode, Telemetry};
