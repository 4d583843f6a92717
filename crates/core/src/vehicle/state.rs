//! Vehicle state as reported by `UpdateVehicle`

use serde::Deserialize;

use crate::core_types::{Orientation, Vec3};

/// Snapshot of a vehicle's kinematic state.
///
/// `pos` is the position of the vehicle's reference node, which is generally
/// not the point the vehicle was spawned or teleported to. It moves when the
/// vehicle is rotated in place.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawVehicleState")]
pub struct VehicleState {
    pub pos: Vec3,
    /// Forward direction
    pub dir: Vec3,
    pub up: Vec3,
    pub vel: Vec3,
    pub front: Option<Vec3>,
    pub rotation: Option<Orientation>,
}

#[derive(Deserialize)]
struct RawVehicleState {
    pos: [f64; 3],
    dir: [f64; 3],
    up: [f64; 3],
    #[serde(default)]
    vel: [f64; 3],
    #[serde(default)]
    front: Option<[f64; 3]>,
    #[serde(default)]
    rotation: Option<[f64; 4]>,
}

impl From<RawVehicleState> for VehicleState {
    fn from(raw: RawVehicleState) -> Self {
        Self {
            pos: Vec3::from(raw.pos),
            dir: Vec3::from(raw.dir),
            up: Vec3::from(raw.up),
            vel: Vec3::from(raw.vel),
            front: raw.front.map(Vec3::from),
            rotation: raw
                .rotation
                .map(|[x, y, z, w]| Orientation::quaternion(x, y, z, w)),
        }
    }
}
