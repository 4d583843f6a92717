//! Static and dynamic objects placed in a scenario

use std::collections::BTreeMap;

use crate::core_types::vec3::ensure_finite;
use crate::core_types::{Pose, Vec3};
use crate::error::BngError;

/// Prefab fields written for every object; options may not override them.
const RESERVED_FIELDS: [&str; 4] = ["name", "position", "rotationMatrix", "scale"];

/// An object placed in a scenario's prefab.
///
/// `otype` is the simulator class (`BeamNGVehicle`, `TSStatic`, ...). Any
/// class-specific fields, such as `JBeam` or `dataBlock`, go into
/// [`options`](ScenarioObject::options).
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioObject {
    oid: String,
    name: String,
    otype: String,
    pose: Pose,
    scale: Vec3,
    options: BTreeMap<String, String>,
}

impl ScenarioObject {
    pub fn new(
        oid: impl Into<String>,
        name: impl Into<String>,
        otype: impl Into<String>,
        pose: Pose,
    ) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            otype: otype.into(),
            pose,
            scale: Vec3::new(1.0, 1.0, 1.0),
            options: BTreeMap::new(),
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Add a class-specific prefab field.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn otype(&self) -> &str {
        &self.otype
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn scale(&self) -> &Vec3 {
        &self.scale
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub(crate) fn validate(&self) -> Result<(), BngError> {
        super::validate_identifier(&self.oid)?;
        super::validate_identifier(&self.otype)?;
        self.pose.validate()?;
        ensure_finite("scale", &self.scale)?;
        for key in self.options.keys() {
            super::validate_identifier(key)?;
            if RESERVED_FIELDS.contains(&key.as_str()) {
                return Err(BngError::InvalidValue(format!(
                    "option '{key}' of object '{}' clashes with a built-in field",
                    self.oid
                )));
            }
        }
        Ok(())
    }
}
