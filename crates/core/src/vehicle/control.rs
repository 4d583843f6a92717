//! Driver inputs and AI settings sent over a vehicle connection.

use serde::Serialize;

/// Driver inputs. Only the fields that are set are sent; the rest keep their
/// current value in the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Control {
    /// Steering, -1.0 (full left) to 1.0 (full right)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steering: Option<f64>,
    /// Throttle, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<f64>,
    /// Brake, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brake: Option<f64>,
    /// Parking brake, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parkingbrake: Option<f64>,
    /// Clutch, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clutch: Option<f64>,
    /// Gear; -1 is reverse, 0 neutral
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gear: Option<i32>,
}

impl Control {
    pub fn steering(mut self, value: f64) -> Self {
        self.steering = Some(value);
        self
    }

    pub fn throttle(mut self, value: f64) -> Self {
        self.throttle = Some(value);
        self
    }

    pub fn brake(mut self, value: f64) -> Self {
        self.brake = Some(value);
        self
    }

    pub fn parkingbrake(mut self, value: f64) -> Self {
        self.parkingbrake = Some(value);
        self
    }

    pub fn clutch(mut self, value: f64) -> Self {
        self.clutch = Some(value);
        self
    }

    pub fn gear(mut self, value: i32) -> Self {
        self.gear = Some(value);
        self
    }

    /// True when no input is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Behaviour of the simulator's built-in driver AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    Disabled,
    Random,
    Span,
    Manual,
    Chase,
    Flee,
    Stopping,
}

/// How an AI speed is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiSpeedMode {
    /// Drive at most this fast
    Limit,
    /// Try to hold this speed
    Set,
}
