use std::sync::OnceLock;
use std::time::Instant;

use tracing::info;

/// Ambient temperature source. Returns NaN on a failed read; the control
/// loop treats NaN as a sensor fault and skips the tick.
pub trait Sensor: Send {
    fn read_temperature(&mut self) -> f32;
}

/// Binary relay output.
pub trait Actuator: Send {
    fn set_relay(&mut self, on: bool);
    fn relay_on(&self) -> bool;
}

/// Monotonic millisecond time source, injectable so tests can simulate
/// elapsed time without real delays.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        static START: OnceLock<Instant> = OnceLock::new();
        START
            .get_or_init(Instant::now)
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

/// Host stand-in for the ambient sensor.
pub struct SimulatedSensor {
    base: f32,
    tick: u64,
}

impl SimulatedSensor {
    pub fn new(base: f32) -> Self {
        Self { base, tick: 0 }
    }
}

impl Sensor for SimulatedSensor {
    fn read_temperature(&mut self) -> f32 {
        self.tick = self.tick.saturating_add(1);

        // Hardware integration point:
        // replace this simulated reading with the DHT driver on device targets.
        self.base + ((self.tick % 8) as f32) * 0.2
    }
}

/// Host stand-in for the relay driver; logs state transitions.
#[derive(Default)]
pub struct LoggingRelay {
    on: bool,
}

impl Actuator for LoggingRelay {
    fn set_relay(&mut self, on: bool) {
        if self.on != on {
            info!("relay {}", if on { "on" } else { "off" });
        }
        self.on = on;
    }

    fn relay_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_sensor_stays_in_band() {
        let mut sensor = SimulatedSensor::new(21.0);
        for _ in 0..32 {
            let reading = sensor.read_temperature();
            assert!(reading.is_finite());
            assert!((21.0..=22.4).contains(&reading));
        }
    }

    #[test]
    fn logging_relay_mirrors_commands() {
        let mut relay = LoggingRelay::default();
        assert!(!relay.relay_on());

        relay.set_relay(true);
        assert!(relay.relay_on());

        relay.set_relay(true);
        relay.set_relay(false);
        assert!(!relay.relay_on());
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock;
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(second >= first);
    }
}
