/// Hysteresis relay state machine.
///
/// The band sits entirely above the target: below target the relay is
/// always commanded on, more than `band` above target it is commanded
/// off, and inside `[target, target + band]` the previous command is
/// held so the relay does not chatter around the setpoint.
///
/// Callers must reject NaN readings before calling [`Thermostat::evaluate`];
/// there is no fault handling here.
#[derive(Debug, Clone)]
pub struct Thermostat {
    band: f32,
    target: f32,
    relay_on: bool,
}

impl Thermostat {
    pub fn new(band: f32, target: f32) -> Self {
        Self {
            band,
            target,
            relay_on: false,
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on
    }

    /// Update the setpoint. Takes effect on the next `evaluate` call.
    pub fn set_target(&mut self, target: f32) -> bool {
        if (self.target - target).abs() > f32::EPSILON {
            self.target = target;
            true
        } else {
            false
        }
    }

    /// Map a measured temperature to a relay command.
    pub fn evaluate(&mut self, measured: f32) -> bool {
        if measured < self.target {
            self.relay_on = true;
        } else if measured > self.target + self.band {
            self.relay_on = false;
        }
        self.relay_on
    }
}
