use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub tick_interval_ms: u64,
    pub history_interval_ms: u64,
    pub hysteresis_band: f32,
    pub default_setpoint: f32,
    pub setpoint_step: f32,
    pub retry_interval_ms: u64,
    pub min_valid_temp: f32,
    pub max_valid_temp: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2_000,
            history_interval_ms: 600_000,
            hysteresis_band: 0.3,
            default_setpoint: 23.0,
            setpoint_step: 0.5,
            retry_interval_ms: 5_000,
            min_valid_temp: -40.0,
            max_valid_temp: 125.0,
        }
    }
}

impl ControlConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
        if self.history_interval_ms == 0 {
            self.history_interval_ms = defaults.history_interval_ms;
        }
        if self.retry_interval_ms == 0 {
            self.retry_interval_ms = defaults.retry_interval_ms;
        }
        if !self.hysteresis_band.is_finite() || self.hysteresis_band < 0.0 {
            self.hysteresis_band = defaults.hysteresis_band;
        }
        if !self.default_setpoint.is_finite() {
            self.default_setpoint = defaults.default_setpoint;
        }
        if !self.setpoint_step.is_finite() || self.setpoint_step <= 0.0 {
            self.setpoint_step = defaults.setpoint_step;
        }
        if !self.min_valid_temp.is_finite()
            || !self.max_valid_temp.is_finite()
            || self.min_valid_temp >= self.max_valid_temp
        {
            self.min_valid_temp = defaults.min_valid_temp;
            self.max_valid_temp = defaults.max_valid_temp;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "relaystat-controller".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub control: ControlConfig,
    pub network: NetworkConfig,
}
