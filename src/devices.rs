pub mod fan;
pub mod sensor;
