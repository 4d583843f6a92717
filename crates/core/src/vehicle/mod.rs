//! Vehicles and their dedicated connections
//!
//! A [`Vehicle`] starts out as a plain description (id, model, options) that
//! can be placed in a [`Scenario`](crate::scenario::Scenario) or spawned into
//! a running one. Once [connected](Vehicle::connect) it owns a second TCP
//! channel to the simulator over which its state and sensors are polled and
//! driver inputs are sent.

pub mod control;
pub mod sensors;
pub mod state;

pub use control::{AiMode, AiSpeedMode, Control};
pub use sensors::{Damage, Electrics, GForces, Sensor, SensorReading, Timer};
pub use state::VehicleState;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Map;
use tracing::{debug, info, warn};

use crate::beamng::BeamNg;
use crate::connection::Connection;
use crate::error::BngError;
use crate::protocol::messages::{Request, SensorDataResponse, VehicleUpdateResponse};

/// Appearance and configuration options sent with a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Licence plate text
    #[serde(rename = "licenseText", skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Path of a `.pc` part configuration
    #[serde(rename = "partConfig", skip_serializing_if = "Option::is_none")]
    pub part_config: Option<String>,
}

/// A vehicle known to the client.
#[derive(Debug)]
pub struct Vehicle {
    vid: String,
    model: String,
    options: VehicleOptions,
    state: Option<VehicleState>,
    sensors: BTreeMap<String, Box<dyn Sensor>>,
    sensor_data: BTreeMap<String, SensorReading>,
    connection: Option<Connection>,
}

impl Vehicle {
    /// Create a vehicle `vid` of the given model (e.g. `"etk800"`).
    pub fn new(vid: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            vid: vid.into(),
            model: model.into(),
            options: VehicleOptions::default(),
            state: None,
            sensors: BTreeMap::new(),
            sensor_data: BTreeMap::new(),
            connection: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.options.color = Some(color.into());
        self
    }

    pub fn with_license(mut self, text: impl Into<String>) -> Self {
        self.options.license = Some(text.into());
        self
    }

    /// British spelling of [`Vehicle::with_license`].
    ///
    /// Both spellings set the same licence plate option. This one logs a
    /// warning so mixed spellings in caller code stay visible.
    pub fn with_licence(self, text: impl Into<String>) -> Self {
        let text = text.into();
        warn!(
            vid = %self.vid,
            licence = %text,
            "'licence' spelling used; stored as the 'license' option"
        );
        self.with_license(text)
    }

    pub fn with_part_config(mut self, path: impl Into<String>) -> Self {
        self.options.part_config = Some(path.into());
        self
    }

    pub fn vid(&self) -> &str {
        &self.vid
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &VehicleOptions {
        &self.options
    }

    /// Attach `sensor` under `name`, replacing any sensor of the same name.
    pub fn attach_sensor(&mut self, name: impl Into<String>, sensor: Box<dyn Sensor>) {
        let name = name.into();
        debug!(vid = %self.vid, sensor = %name, kind = sensor.sensor_type(), "Attaching sensor");
        self.sensor_data.remove(&name);
        self.sensors.insert(name, sensor);
    }

    /// Detach the sensor called `name`, returning it if it was attached.
    pub fn detach_sensor(&mut self, name: &str) -> Option<Box<dyn Sensor>> {
        self.sensor_data.remove(name);
        self.sensors.remove(name)
    }

    /// Open this vehicle's own connection to the simulator.
    ///
    /// The vehicle must already exist in the simulator (spawned, or part of
    /// a loaded scenario). Reconnecting replaces the previous connection.
    ///
    /// # Errors
    /// Returns an error if the simulator does not hand out a port, the port
    /// cannot be reached, or the handshake fails.
    pub fn connect(&mut self, bng: &mut BeamNg) -> Result<(), BngError> {
        let port = bng.start_vehicle_connection(&self.vid)?;
        let config = bng.config();
        let mut connection = Connection::open(
            &config.host,
            port,
            config.connect_timeout,
            config.request_timeout,
        )?;
        connection.hello()?;
        info!(vid = %self.vid, port, "Vehicle connected");
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, BngError> {
        self.connection
            .as_mut()
            .ok_or_else(|| BngError::VehicleNotConnected(self.vid.clone()))
    }

    /// Refresh the cached state and every attached sensor.
    ///
    /// Either everything is updated or, on error, nothing is.
    ///
    /// # Errors
    /// Returns [`BngError::VehicleNotConnected`] before [`Vehicle::connect`],
    /// otherwise any transport or decoding error.
    pub fn poll_sensors(&mut self) -> Result<(), BngError> {
        let connection = self.connection_mut()?;
        let reply = connection.request(&Request::UpdateVehicle, "VehicleUpdate")?;
        let update: VehicleUpdateResponse = serde_json::from_value(reply)?;

        let mut readings = BTreeMap::new();
        if !self.sensors.is_empty() {
            let sensors: Map<_, _> = self
                .sensors
                .iter()
                .map(|(name, sensor)| (name.clone(), sensor.encode_request()))
                .collect();
            let connection = self.connection_mut()?;
            let reply = connection.request(&Request::SensorRequest { sensors }, "SensorData")?;
            let response: SensorDataResponse = serde_json::from_value(reply)?;
            readings = decode_readings(&self.sensors, response)?;
        }

        debug!(vid = %self.vid, pos = ?update.state.pos, "Vehicle state updated");
        self.state = Some(update.state);
        self.sensor_data.extend(readings);
        Ok(())
    }

    /// State from the last successful [`Vehicle::poll_sensors`].
    pub fn state(&self) -> Option<&VehicleState> {
        self.state.as_ref()
    }

    /// Last readings of the sensor called `name`.
    pub fn sensor_data(&self, name: &str) -> Option<&SensorReading> {
        self.sensor_data.get(name)
    }

    /// Apply driver inputs. Fields left unset keep their current value.
    ///
    /// # Errors
    /// Returns [`BngError::VehicleNotConnected`] or any transport error.
    pub fn control(&mut self, control: &Control) -> Result<(), BngError> {
        if control.is_empty() {
            return Ok(());
        }
        self.connection_mut()?
            .request(&Request::Control(control.clone()), "Controlled")?;
        Ok(())
    }

    /// Hand the vehicle to the simulator's driver AI.
    ///
    /// # Errors
    /// Returns [`BngError::VehicleNotConnected`] or any transport error.
    pub fn ai_set_mode(&mut self, mode: AiMode) -> Result<(), BngError> {
        self.connection_mut()?
            .request(&Request::SetAiMode { mode }, "AiModeSet")?;
        Ok(())
    }

    /// Set the AI target speed in m/s.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidValue`] for a negative or non-finite speed,
    /// [`BngError::VehicleNotConnected`], or any transport error.
    pub fn ai_set_speed(&mut self, speed: f64, mode: AiSpeedMode) -> Result<(), BngError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(BngError::InvalidValue(format!(
                "AI speed must be a non-negative number, got {speed}"
            )));
        }
        self.connection_mut()?
            .request(&Request::SetAiSpeed { speed, mode }, "AiSpeedSet")?;
        Ok(())
    }

    /// Close the vehicle connection. The vehicle stays in the simulator.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!(vid = %self.vid, "Vehicle disconnected");
        }
    }
}

/// Decode one reading per attached sensor. A missing reading fails the batch.
fn decode_readings(
    sensors: &BTreeMap<String, Box<dyn Sensor>>,
    mut response: SensorDataResponse,
) -> Result<BTreeMap<String, SensorReading>, BngError> {
    sensors
        .iter()
        .map(|(name, sensor)| {
            let raw = response.data.remove(name).ok_or_else(|| {
                BngError::Protocol(format!("SensorData has no reading for sensor '{name}'"))
            })?;
            Ok((name.clone(), sensor.decode_response(raw)?))
        })
        .collect()
}
