//! Game session
//!
//! [`BeamNg`] owns the game channel to a running simulator. Opening one
//! performs the protocol handshake; dropping it closes the channel, so a
//! session is always torn down when it goes out of scope, including on early
//! returns through `?`.
//!
//! # Usage
//! ```no_run
//! use beamng_remote_core::{BeamNg, Orientation, Pose, Vec3, Vehicle};
//!
//! # fn main() -> Result<(), beamng_remote_core::BngError> {
//! let mut bng = BeamNg::connect("localhost", 64256)?;
//! let pickup = Vehicle::new("pickup", "pickup");
//! bng.spawn_vehicle(&pickup, Pose::at(Vec3::new(-15.0, 0.0, 0.0)), true)?;
//! bng.teleport_vehicle("pickup", Vec3::new(-15.0, 0.0, 0.0), Some(Orientation::euler(0.0, 45.0, 0.0)), true)?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::BngConfig;
use crate::connection::Connection;
use crate::core_types::vec3::ensure_finite;
use crate::core_types::{Orientation, Pose, Vec3};
use crate::error::BngError;
use crate::protocol::messages::{
    CurrentVehiclesResponse, Request, ResultResponse, SuccessResponse, VehicleInfo,
};
use crate::scenario::{Scenario, ScenarioObject};
use crate::vehicle::Vehicle;

/// A session with a running simulator.
#[derive(Debug)]
pub struct BeamNg {
    config: BngConfig,
    connection: Connection,
}

impl BeamNg {
    /// Connect to `host:port` with default timeouts.
    ///
    /// # Errors
    /// See [`BeamNg::open`].
    pub fn connect(host: &str, port: u16) -> Result<Self, BngError> {
        Self::open(BngConfig::new(host, port))
    }

    /// Connect using `config` and perform the handshake.
    ///
    /// # Errors
    /// Returns [`BngError::ConnectionFailed`] if the simulator cannot be
    /// reached and [`BngError::ProtocolMismatch`] if it speaks another
    /// protocol version.
    pub fn open(config: BngConfig) -> Result<Self, BngError> {
        info!(host = %config.host, port = config.port, "Connecting to simulator");
        let mut connection = Connection::open(
            &config.host,
            config.port,
            config.connect_timeout,
            config.request_timeout,
        )?;
        connection.hello()?;
        info!(peer = %connection.peer_addr(), "Session open");
        Ok(Self { config, connection })
    }

    pub fn config(&self) -> &BngConfig {
        &self.config
    }

    /// End the session. Dropping the session has the same effect.
    pub fn close(self) {
        drop(self);
    }

    fn call(&mut self, request: &Request, expected: &str) -> Result<Value, BngError> {
        let reply = self.connection.request(request, expected)?;
        debug!(request = request.type_name(), response = expected, "Request completed");
        Ok(reply)
    }

    /// Register a scenario with the simulator and return its path there.
    ///
    /// Most callers want [`Scenario::make`], which renders `prefab` and
    /// `info` itself.
    ///
    /// # Errors
    /// Returns any transport or simulator error.
    pub fn create_scenario(
        &mut self,
        level: &str,
        name: &str,
        prefab: &str,
        info: &Value,
    ) -> Result<String, BngError> {
        let request = Request::CreateScenario {
            level: level.to_string(),
            name: name.to_string(),
            prefab: prefab.to_string(),
            info: info.clone(),
        };
        let reply: ResultResponse<String> =
            serde_json::from_value(self.call(&request, "CreateScenario")?)?;
        info!(level, name, path = %reply.result, "Scenario created");
        Ok(reply.result)
    }

    /// Load a made scenario and connect every vehicle it contains.
    ///
    /// Level loading can take minutes, so the reply is awaited under the
    /// configured load timeout instead of the request timeout.
    ///
    /// # Errors
    /// Returns [`BngError::ScenarioNotMade`] if [`Scenario::make`] has not
    /// been called, otherwise any transport or simulator error.
    pub fn load_scenario(&mut self, scenario: &mut Scenario) -> Result<(), BngError> {
        let path = scenario
            .path()
            .ok_or_else(|| BngError::ScenarioNotMade(scenario.name().to_string()))?
            .to_string();

        info!(%path, "Loading scenario");
        let request = Request::LoadScenario { path };
        let load_timeout = self.config.load_timeout;
        self.connection
            .request_with_timeout(&request, "MapLoaded", load_timeout)?;

        for entry in scenario.vehicles_mut() {
            entry.vehicle.connect(self)?;
        }
        info!(name = scenario.name(), "Scenario loaded");
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn start_scenario(&mut self) -> Result<(), BngError> {
        self.call(&Request::StartScenario, "ScenarioStarted")?;
        info!("Scenario started");
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn restart_scenario(&mut self) -> Result<(), BngError> {
        self.call(&Request::RestartScenario, "ScenarioRestarted")?;
        info!("Scenario restarted");
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn stop_scenario(&mut self) -> Result<(), BngError> {
        self.call(&Request::StopScenario, "ScenarioStopped")?;
        info!("Scenario stopped");
        Ok(())
    }

    /// Spawn `vehicle` into the running scenario at `pose`.
    ///
    /// With `cling` set the simulator drops the vehicle onto the ground below
    /// `pose.pos`.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidPose`] or [`BngError::InvalidOrientation`]
    /// for a bad pose, and [`BngError::Simulator`] if the simulator reports
    /// that the spawn failed.
    pub fn spawn_vehicle(
        &mut self,
        vehicle: &Vehicle,
        pose: Pose,
        cling: bool,
    ) -> Result<(), BngError> {
        pose.validate()?;
        let request = Request::SpawnVehicle {
            name: vehicle.vid().to_string(),
            model: vehicle.model().to_string(),
            pos: pose.pos.into(),
            rot: pose.rot.to_wire()?,
            cling,
            options: vehicle.options().clone(),
        };
        let reply: SuccessResponse =
            serde_json::from_value(self.call(&request, "VehicleSpawned")?)?;
        if !reply.success {
            return Err(BngError::Simulator(format!(
                "could not spawn vehicle '{}'",
                vehicle.vid()
            )));
        }
        info!(vid = vehicle.vid(), model = vehicle.model(), pos = ?pose.pos, "Vehicle spawned");
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn despawn_vehicle(&mut self, vid: &str) -> Result<(), BngError> {
        let request = Request::DespawnVehicle {
            vid: vid.to_string(),
        };
        self.call(&request, "VehicleDespawned")?;
        info!(vid, "Vehicle despawned");
        Ok(())
    }

    /// Every vehicle currently in the simulation, keyed by id.
    ///
    /// Scenario objects of type `BeamNGVehicle` are vehicles to the simulator
    /// and show up here as well.
    ///
    /// # Errors
    /// Returns any transport or simulator error.
    pub fn get_current_vehicles(&mut self) -> Result<BTreeMap<String, VehicleInfo>, BngError> {
        let reply: CurrentVehiclesResponse =
            serde_json::from_value(self.call(&Request::GetCurrentVehicles, "CurrentVehicles")?)?;
        Ok(reply.vehicles)
    }

    /// Move vehicle `vid` to `pos`, optionally rotating it.
    ///
    /// `None` keeps the current rotation. With `reset` the vehicle is also
    /// repaired and brought to rest. Returns the simulator's success flag.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidPose`] or [`BngError::InvalidOrientation`]
    /// for bad input, otherwise any transport or simulator error.
    pub fn teleport_vehicle(
        &mut self,
        vid: &str,
        pos: Vec3,
        rot: Option<Orientation>,
        reset: bool,
    ) -> Result<bool, BngError> {
        ensure_finite("pos", &pos)?;
        let request = Request::TeleportVehicle {
            vehicle: vid.to_string(),
            pos: pos.into(),
            rot: rot.as_ref().map(Orientation::to_wire).transpose()?,
            reset,
        };
        let reply: SuccessResponse = serde_json::from_value(self.call(&request, "Teleported")?)?;
        info!(vid, ?pos, ?rot, success = reply.success, "Vehicle teleported");
        Ok(reply.success)
    }

    /// Move a scenario object to `pos`, optionally rotating it.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidValue`] if the simulator does not know the
    /// object, otherwise as [`BeamNg::teleport_vehicle`].
    pub fn teleport_scenario_object(
        &mut self,
        object: &ScenarioObject,
        pos: Vec3,
        rot: Option<Orientation>,
    ) -> Result<(), BngError> {
        ensure_finite("pos", &pos)?;
        let request = Request::TeleportScenarioObject {
            id: object.oid().to_string(),
            pos: pos.into(),
            rot: rot.as_ref().map(Orientation::to_wire).transpose()?,
        };
        self.call(&request, "ScenarioObjectTeleported")?;
        info!(oid = object.oid(), ?pos, ?rot, "Scenario object teleported");
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn pause(&mut self) -> Result<(), BngError> {
        self.call(&Request::Pause, "Paused")?;
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn resume(&mut self) -> Result<(), BngError> {
        self.call(&Request::Resume, "Resumed")?;
        Ok(())
    }

    /// Advance a paused simulation by `count` physics steps and wait until
    /// they are done.
    ///
    /// # Errors
    /// Returns any transport or simulator error.
    pub fn step(&mut self, count: u32) -> Result<(), BngError> {
        self.call(&Request::Step { count, ack: true }, "Stepped")?;
        debug!(count, "Stepped");
        Ok(())
    }

    /// Run physics at a fixed rate independent of rendering.
    ///
    /// # Errors
    /// Returns any transport or simulator error.
    pub fn set_deterministic(&mut self) -> Result<(), BngError> {
        self.call(&Request::SetPhysicsDeterministic, "SetPhysicsDeterministic")?;
        Ok(())
    }

    /// # Errors
    /// Returns any transport or simulator error.
    pub fn set_nondeterministic(&mut self) -> Result<(), BngError> {
        self.call(
            &Request::SetPhysicsNonDeterministic,
            "SetPhysicsNonDeterministic",
        )?;
        Ok(())
    }

    /// Limit the simulation to `fps` steps per second.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidValue`] for zero, otherwise any transport
    /// or simulator error.
    pub fn set_steps_per_second(&mut self, fps: u32) -> Result<(), BngError> {
        if fps == 0 {
            return Err(BngError::InvalidValue(
                "steps per second must be positive".to_string(),
            ));
        }
        self.call(&Request::FpsLimit { fps }, "SetFPSLimit")?;
        Ok(())
    }

    /// Ask the simulator to open a channel for vehicle `vid` and return its
    /// port.
    ///
    /// # Errors
    /// Returns any transport or simulator error.
    pub fn start_vehicle_connection(&mut self, vid: &str) -> Result<u16, BngError> {
        let request = Request::StartVehicleConnection {
            vid: vid.to_string(),
            exts: Vec::new(),
        };
        let reply: ResultResponse<u16> =
            serde_json::from_value(self.call(&request, "StartVehicleConnection")?)?;
        Ok(reply.result)
    }
}

impl Drop for BeamNg {
    fn drop(&mut self) {
        info!(peer = %self.connection.peer_addr(), "Closing session");
    }
}
