use serde::Serialize;

/// Status page payload. `currentTemp` is null until the first valid
/// sensor reading lands.
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f32>,
    #[serde(rename = "targetTemp")]
    pub target_temp: f32,
    #[serde(rename = "relayOn")]
    pub relay_on: bool,
}

/// Per-tick reading published on the telemetry channel.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryReading {
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: u64,
    pub temperature: f32,
    #[serde(rename = "targetTemp")]
    pub target_temp: f32,
    #[serde(rename = "relayOn")]
    pub relay_on: bool,
}
