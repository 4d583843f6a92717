//! Vector type alias for 3D positions and directions.

use nalgebra::Vector3;

use crate::error::BngError;

/// 3D vector type for positions, velocities, scales and directions.
///
/// This is a simple alias for `nalgebra::Vector3<f64>`. With nalgebra's
/// `serde-serialize` feature it goes over the wire as `[x, y, z]`, which is
/// the shape the simulator expects for `pos` and friends.
pub type Vec3 = Vector3<f64>;

/// Reject positions containing NaN or infinite components.
///
/// # Errors
/// Returns [`BngError::InvalidPose`] naming the offending field.
pub fn ensure_finite(field: &str, v: &Vec3) -> Result<(), BngError> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(BngError::InvalidPose(format!(
            "{field} must be finite, got ({}, {}, {})",
            v.x, v.y, v.z
        )))
    }
}

/// Format a vector the way prefab files expect: space separated, no brackets.
pub fn to_prefab_string(v: &Vec3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}
