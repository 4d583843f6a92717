//! Orientation and pose types
//!
//! The simulator accepts a rotation either as Euler angles (degrees) or as a
//! quaternion. Instead of two optional fields with a precedence rule, the
//! choice is made explicit with the [`Orientation`] enum. Whatever the caller
//! picks, the wire always carries a normalized `[x, y, z, w]` quaternion and
//! prefab files carry a row-major rotation matrix.
//!
//! # Usage
//! ```
//! use beamng_remote_core::core_types::{Orientation, Pose, Vec3};
//!
//! let yawed = Orientation::euler(0.0, 0.0, 90.0);
//! let q = yawed.to_wire().unwrap();
//! assert!((q[2] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
//!
//! let pose = Pose::new(Vec3::new(-15.0, 0.0, 0.0), Orientation::IDENTITY);
//! assert!(pose.validate().is_ok());
//! ```

use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

use super::vec3::{ensure_finite, Vec3};
use crate::error::BngError;

/// Quaternions with a norm below this cannot be normalized meaningfully.
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Matrix entries closer to zero than this are written as plain `0`.
const MATRIX_SNAP_EPSILON: f64 = 1e-12;

/// Rotation of a vehicle or scenario object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Orientation {
    /// Euler angles in degrees about the x (roll), y (pitch) and z (yaw) axes.
    Euler { x: f64, y: f64, z: f64 },
    /// Rotation quaternion. Need not be normalized, but must not be zero.
    Quaternion { x: f64, y: f64, z: f64, w: f64 },
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Orientation {
    /// The "no rotation" orientation.
    pub const IDENTITY: Self = Self::Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Euler angles in degrees.
    pub fn euler(x: f64, y: f64, z: f64) -> Self {
        Self::Euler { x, y, z }
    }

    /// Quaternion in `(x, y, z, w)` order.
    pub fn quaternion(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self::Quaternion { x, y, z, w }
    }

    /// Convert to a unit quaternion.
    ///
    /// Euler angles are applied roll first, then pitch, then yaw (extrinsic
    /// x-y-z, i.e. `R = Rz(yaw) * Ry(pitch) * Rx(roll)`).
    ///
    /// # Errors
    /// Returns [`BngError::InvalidOrientation`] for non-finite components or a
    /// zero quaternion.
    pub fn to_unit_quaternion(&self) -> Result<UnitQuaternion<f64>, BngError> {
        match *self {
            Self::Euler { x, y, z } => {
                if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                    return Err(BngError::InvalidOrientation(format!(
                        "Euler angles must be finite, got ({x}, {y}, {z})"
                    )));
                }
                Ok(UnitQuaternion::from_euler_angles(
                    x.to_radians(),
                    y.to_radians(),
                    z.to_radians(),
                ))
            }
            Self::Quaternion { x, y, z, w } => {
                let q = Quaternion::new(w, x, y, z);
                if !q.coords.iter().all(|c| c.is_finite()) {
                    return Err(BngError::InvalidOrientation(format!(
                        "quaternion must be finite, got ({x}, {y}, {z}, {w})"
                    )));
                }
                if q.norm() < MIN_QUATERNION_NORM {
                    return Err(BngError::InvalidOrientation(
                        "quaternion has zero length".to_string(),
                    ));
                }
                Ok(UnitQuaternion::from_quaternion(q))
            }
        }
    }

    /// Normalized quaternion as sent to the simulator: `[x, y, z, w]`.
    ///
    /// # Errors
    /// See [`Orientation::to_unit_quaternion`].
    pub fn to_wire(&self) -> Result<[f64; 4], BngError> {
        let c = self.to_unit_quaternion()?.into_inner().coords;
        Ok([c.x, c.y, c.z, c.w])
    }

    /// Row-major 3×3 rotation matrix as nine space separated numbers.
    ///
    /// This is the `rotationMatrix` field of a prefab entry.
    ///
    /// # Errors
    /// See [`Orientation::to_unit_quaternion`].
    pub fn rotation_matrix_string(&self) -> Result<String, BngError> {
        let rotation = self.to_unit_quaternion()?.to_rotation_matrix();
        let m = rotation.matrix();
        let entries: Vec<String> = (0..3)
            .flat_map(|row| (0..3).map(move |col| m[(row, col)]))
            .map(format_matrix_entry)
            .collect();
        Ok(entries.join(" "))
    }
}

fn format_matrix_entry(value: f64) -> String {
    if value.abs() < MATRIX_SNAP_EPSILON {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub pos: Vec3,
    pub rot: Orientation,
}

impl Pose {
    pub fn new(pos: Vec3, rot: Orientation) -> Self {
        Self { pos, rot }
    }

    /// Pose at `pos` with no rotation.
    pub fn at(pos: Vec3) -> Self {
        Self::new(pos, Orientation::IDENTITY)
    }

    /// Check that the position is finite and the rotation is usable.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidPose`] or [`BngError::InvalidOrientation`].
    pub fn validate(&self) -> Result<(), BngError> {
        ensure_finite("pos", &self.pos)?;
        self.rot.to_unit_quaternion().map(|_| ())
    }
}
