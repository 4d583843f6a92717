//! Vehicle-side sensors
//!
//! Sensors attached to a [`Vehicle`](super::Vehicle) are polled together with
//! its state in [`Vehicle::poll_sensors`](super::Vehicle::poll_sensors). Each
//! sensor contributes one entry to a single `SensorRequest`, and decodes its
//! own entry of the `SensorData` reply.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::error::BngError;

/// Decoded readings of one sensor, keyed by field name.
pub type SensorReading = Map<String, Value>;

/// A sensor that can be polled over a vehicle connection.
pub trait Sensor: Send + fmt::Debug {
    /// Sensor type name understood by the simulator (e.g. `"Electrics"`).
    fn sensor_type(&self) -> &'static str;

    /// Entry for this sensor in the `sensors` map of a `SensorRequest`.
    fn encode_request(&self) -> Value {
        json!({ "type": self.sensor_type() })
    }

    /// Turn this sensor's entry of the `SensorData` reply into readings.
    ///
    /// # Errors
    /// Returns [`BngError::Protocol`] if the entry is not a map.
    fn decode_response(&self, raw: Value) -> Result<SensorReading, BngError> {
        expect_map(self.sensor_type(), raw)
    }
}

fn expect_map(sensor_type: &str, raw: Value) -> Result<SensorReading, BngError> {
    match raw {
        Value::Object(map) => Ok(map),
        other => Err(BngError::Protocol(format!(
            "{sensor_type} sensor returned a non-map reading: {other}"
        ))),
    }
}

/// Electrical and drivetrain values (wheel speed, gear, rpm, lights, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct Electrics;

impl Sensor for Electrics {
    fn sensor_type(&self) -> &'static str {
        "Electrics"
    }

    /// The simulator nests the interesting values under `values`; lift them
    /// to the top level so callers can read `reading["wheelspeed"]`.
    fn decode_response(&self, raw: Value) -> Result<SensorReading, BngError> {
        let mut reading = expect_map(self.sensor_type(), raw)?;
        if let Some(Value::Object(values)) = reading.remove("values") {
            for (key, value) in values {
                reading.entry(key).or_insert(value);
            }
        }
        Ok(reading)
    }
}

/// Accumulated damage, overall and per part.
#[derive(Debug, Clone, Copy, Default)]
pub struct Damage;

impl Sensor for Damage {
    fn sensor_type(&self) -> &'static str {
        "Damage"
    }
}

/// Acceleration felt by the vehicle, in g.
#[derive(Debug, Clone, Copy, Default)]
pub struct GForces;

impl Sensor for GForces {
    fn sensor_type(&self) -> &'static str {
        "GForces"
    }
}

/// Simulation time as seen by the vehicle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer;

impl Sensor for Timer {
    fn sensor_type(&self) -> &'static str {
        "Timer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_entry_names_type() {
        assert_eq!(Damage.encode_request(), json!({"type": "Damage"}));
    }

    #[test]
    fn test_electrics_flattens_values() {
        let reading = Electrics
            .decode_response(json!({"values": {"wheelspeed": 3.5, "gear": "N"}}))
            .unwrap();
        assert_eq!(reading["wheelspeed"], 3.5);
        assert_eq!(reading["gear"], "N");
        assert!(!reading.contains_key("values"));
    }

    #[test]
    fn test_non_map_reading_rejected() {
        let err = GForces.decode_response(json!(1.0)).unwrap_err();
        assert!(matches!(err, BngError::Protocol(msg) if msg.contains("GForces")));
    }
}
