use tracing::{debug, warn};

use relaystat_common::history::Sample;
use relaystat_common::{ControlConfig, StatusPayload, TelemetryReading, Thermostat};

use crate::ports::{Actuator, Sensor};
use crate::store::{HistoryLog, Storage};

/// Outbound seam for per-tick readings. Implementations must not block;
/// readings are advisory and a slow transport never delays the relay.
pub trait ReadingPublisher: Send {
    fn publish(&self, reading: &TelemetryReading);
}

/// All mutable control state, owned in one place and driven by the
/// periodic tick. HTTP handlers mutate it through the same lock, so a
/// setpoint change lands between ticks and is picked up by the next
/// evaluate call.
pub struct Controller<S, P> {
    config: ControlConfig,
    thermostat: Thermostat,
    sensor: Box<dyn Sensor>,
    actuator: Box<dyn Actuator>,
    history: HistoryLog<S>,
    publisher: P,
    current_temp: Option<f32>,
    last_history_write_ms: Option<u64>,
}

impl<S: Storage, P: ReadingPublisher> Controller<S, P> {
    pub fn new(
        config: ControlConfig,
        thermostat: Thermostat,
        sensor: Box<dyn Sensor>,
        actuator: Box<dyn Actuator>,
        history: HistoryLog<S>,
        publisher: P,
    ) -> Self {
        Self {
            config,
            thermostat,
            sensor,
            actuator,
            history,
            publisher,
            current_temp: None,
            last_history_write_ms: None,
        }
    }

    pub fn target(&self) -> f32 {
        self.thermostat.target()
    }

    pub fn set_target(&mut self, target: f32) -> bool {
        self.thermostat.set_target(target)
    }

    pub fn status(&self) -> StatusPayload {
        StatusPayload {
            current_temp: self.current_temp,
            target_temp: self.thermostat.target(),
            relay_on: self.actuator.relay_on(),
        }
    }

    /// One control tick: read, evaluate, drive the relay, publish, and
    /// (throttled) persist a history sample. A sensor fault skips the
    /// whole tick; relay correctness is never delayed by telemetry or
    /// storage, which come strictly after the actuator command.
    pub async fn tick(&mut self, now_ms: u64) {
        let measured = self.sensor.read_temperature();
        if !self.is_valid_reading(measured) {
            warn!("sensor fault (read {measured}), skipping tick");
            return;
        }
        self.current_temp = Some(measured);

        let relay_on = self.thermostat.evaluate(measured);
        self.actuator.set_relay(relay_on);

        self.publisher.publish(&TelemetryReading {
            timestamp_ms: now_ms,
            temperature: measured,
            target_temp: self.thermostat.target(),
            relay_on,
        });

        if self.history_due(now_ms) {
            self.history
                .append(Sample {
                    timestamp_ms: now_ms,
                    temperature: measured,
                })
                .await;
            let dropped = self.history.trim_to_tail().await;
            if dropped > 0 {
                debug!("history trimmed, {dropped} records discarded");
            }
            self.last_history_write_ms = Some(now_ms);
        }
    }

    fn is_valid_reading(&self, measured: f32) -> bool {
        measured.is_finite()
            && (self.config.min_valid_temp..=self.config.max_valid_temp).contains(&measured)
    }

    fn history_due(&self, now_ms: u64) -> bool {
        match self.last_history_write_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.config.history_interval_ms,
            None => true,
        }
    }
}
