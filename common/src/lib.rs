pub mod config;
pub mod history;
pub mod reconnect;
pub mod thermostat;
pub mod topics;
pub mod types;

pub use config::{ControlConfig, NetworkConfig, RuntimeConfig};
pub use history::{Sample, SampleParseError, HISTORY_MAX_BYTES, MAX_RECORDS, TRIM_KEEP};
pub use reconnect::ReconnectGate;
pub use thermostat::Thermostat;
pub use topics::*;
pub use types::{StatusPayload, TelemetryReading};
