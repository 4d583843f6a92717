//! Remote Control Core Library for `BeamNG.drive`
//!
//! A blocking client for driving the simulator over its TCP
//! remote-control protocol. Build a scenario, load it, spawn and teleport
//! vehicles and scenario objects, and poll vehicle state and sensors.
//!
//! ## Layout
//!
//! - [`core_types`]: positions, orientations (Euler or quaternion) and poses
//! - [`protocol`] and [`connection`]: framing, request catalogue and the TCP channel
//! - [`beamng`]: the game session
//! - [`scenario`]: scenario building and prefab rendering
//! - [`vehicle`]: vehicles, their own connections, controls and sensors
//!
//! Orientation is always an explicit [`Orientation`] value, so a pose can never
//! carry both an Euler triple and a quaternion.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;
pub mod logging;

// Wire level
pub mod connection;
pub mod protocol;

// Simulator objects
pub mod beamng;
pub mod scenario;
pub mod vehicle;

// Re-export core types
pub use config::BngConfig;
pub use core_types::{Orientation, Pose, Vec3};
pub use error::BngError;
pub use logging::setup_logging;

// Re-export session types
pub use beamng::BeamNg;
pub use protocol::VehicleInfo;
pub use scenario::{Scenario, ScenarioObject};
pub use vehicle::{
    AiMode, AiSpeedMode, Control, Damage, Electrics, GForces, Sensor, Timer, Vehicle,
    VehicleState,
};
