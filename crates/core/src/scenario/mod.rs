//! Scenario building
//!
//! A [`Scenario`] collects vehicles with their start poses and additional
//! objects for one level. Before it can be loaded it has to be *made*: the
//! client renders a prefab and an info document and hands both to the
//! simulator, which stores them and answers with the scenario's path.
//!
//! # Usage
//! ```
//! use beamng_remote_core::{Orientation, Pose, Scenario, ScenarioObject, Vec3, Vehicle};
//!
//! let mut scenario = Scenario::new("smallgrid", "test_quat");
//! scenario
//!     .add_vehicle(
//!         Vehicle::new("ego_vehicle", "etk800").with_color("Blue"),
//!         Pose::new(Vec3::zeros(), Orientation::euler(0.0, 0.0, 0.0)),
//!     )
//!     .unwrap();
//! scenario
//!     .add_object(
//!         ScenarioObject::new("cones", "cones", "BeamNGVehicle", Pose::at(Vec3::new(0.0, -5.0, 0.0)))
//!             .with_option("JBeam", "cones"),
//!     )
//!     .unwrap();
//!
//! let prefab = scenario.prefab().unwrap();
//! assert!(prefab.contains("new BeamNGVehicle(ego_vehicle)"));
//! assert!(prefab.contains("new BeamNGVehicle(cones)"));
//! ```

pub mod object;
mod prefab;

pub use object::ScenarioObject;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::beamng::BeamNg;
use crate::core_types::Pose;
use crate::error::BngError;
use crate::vehicle::Vehicle;

/// A vehicle together with the pose it starts the scenario in.
#[derive(Debug)]
pub struct ScenarioVehicle {
    pub vehicle: Vehicle,
    pub pose: Pose,
}

/// Per-vehicle entry of the scenario info document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioVehicleInfo {
    pub player_usable: bool,
    pub start_focus: bool,
}

/// The scenario info document (`<name>.json`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    pub difficulty: u32,
    pub authors: String,
    pub lap_config: Vec<String>,
    pub vehicles: BTreeMap<String, ScenarioVehicleInfo>,
    pub prefabs: Vec<String>,
}

/// Paths written by [`Scenario::write_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioFiles {
    pub info: PathBuf,
    pub prefab: PathBuf,
}

/// A scenario on one level.
#[derive(Debug)]
pub struct Scenario {
    level: String,
    name: String,
    description: String,
    authors: String,
    difficulty: u32,
    vehicles: Vec<ScenarioVehicle>,
    objects: Vec<ScenarioObject>,
    path: Option<String>,
}

impl Scenario {
    /// Empty scenario `name` on `level` (e.g. `"smallgrid"`).
    pub fn new(level: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            name: name.into(),
            description: String::new(),
            authors: String::new(),
            difficulty: 0,
            vehicles: Vec::new(),
            objects: Vec::new(),
            path: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = authors.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the scenario inside the simulator, once made.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Add a vehicle that starts at `pose`.
    ///
    /// The first vehicle added gets the camera focus when the scenario
    /// starts. Adding anything after [`Scenario::make`] means the scenario
    /// has to be made again.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidIdentifier`] for an unusable id,
    /// [`BngError::DuplicateId`] if a vehicle or object already uses it, and
    /// pose validation errors.
    pub fn add_vehicle(&mut self, vehicle: Vehicle, pose: Pose) -> Result<(), BngError> {
        validate_identifier(vehicle.vid())?;
        pose.validate()?;
        self.ensure_unused(vehicle.vid())?;
        debug!(scenario = %self.name, vid = vehicle.vid(), "Adding vehicle");
        self.vehicles.push(ScenarioVehicle { vehicle, pose });
        self.path = None;
        Ok(())
    }

    /// Add an object to the prefab.
    ///
    /// # Errors
    /// Same as [`Scenario::add_vehicle`], plus [`BngError::InvalidValue`] for
    /// options that clash with built-in prefab fields.
    pub fn add_object(&mut self, object: ScenarioObject) -> Result<(), BngError> {
        object.validate()?;
        self.ensure_unused(object.oid())?;
        debug!(scenario = %self.name, oid = object.oid(), "Adding object");
        self.objects.push(object);
        self.path = None;
        Ok(())
    }

    fn ensure_unused(&self, id: &str) -> Result<(), BngError> {
        let taken = self.vehicles.iter().any(|v| v.vehicle.vid() == id)
            || self.objects.iter().any(|o| o.oid() == id);
        if taken {
            Err(BngError::DuplicateId(id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn vehicle(&self, vid: &str) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .map(|entry| &entry.vehicle)
            .find(|v| v.vid() == vid)
    }

    pub fn vehicle_mut(&mut self, vid: &str) -> Option<&mut Vehicle> {
        self.vehicles
            .iter_mut()
            .map(|entry| &mut entry.vehicle)
            .find(|v| v.vid() == vid)
    }

    pub fn vehicles(&self) -> &[ScenarioVehicle] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> impl Iterator<Item = &mut ScenarioVehicle> {
        self.vehicles.iter_mut()
    }

    pub fn object(&self, oid: &str) -> Option<&ScenarioObject> {
        self.objects.iter().find(|o| o.oid() == oid)
    }

    pub fn objects(&self) -> &[ScenarioObject] {
        &self.objects
    }

    /// Render the prefab document.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidOrientation`] if a rotation cannot be
    /// turned into a matrix.
    pub fn prefab(&self) -> Result<String, BngError> {
        prefab::render(&self.vehicles, &self.objects)
    }

    /// Build the info document.
    pub fn info(&self) -> ScenarioInfo {
        let vehicles = self
            .vehicles
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                (
                    entry.vehicle.vid().to_string(),
                    ScenarioVehicleInfo {
                        player_usable: true,
                        start_focus: i == 0,
                    },
                )
            })
            .collect();

        ScenarioInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty,
            authors: self.authors.clone(),
            lap_config: Vec::new(),
            vehicles,
            prefabs: vec![format!(
                "levels/{}/scenarios/{}.prefab",
                self.level, self.name
            )],
        }
    }

    /// Register the scenario with the simulator.
    ///
    /// # Errors
    /// Returns [`BngError::InvalidIdentifier`] for an unusable level or
    /// scenario name, otherwise rendering, transport or simulator errors.
    pub fn make(&mut self, bng: &mut BeamNg) -> Result<(), BngError> {
        self.validate_names()?;
        let prefab = self.prefab()?;
        let info = serde_json::to_value(self.info())?;
        let path = bng.create_scenario(&self.level, &self.name, &prefab, &info)?;
        info!(
            scenario = %self.name,
            vehicles = self.vehicles.len(),
            objects = self.objects.len(),
            "Scenario made"
        );
        self.path = Some(path);
        Ok(())
    }

    /// Write `<name>.prefab` and `<name>.json` into `dir`.
    ///
    /// For setups where the client can write to the simulator's scenario
    /// folder directly.
    ///
    /// # Errors
    /// Returns [`BngError::Io`] if the files cannot be written.
    pub fn write_files(&self, dir: &Path) -> Result<ScenarioFiles, BngError> {
        self.validate_names()?;
        fs::create_dir_all(dir)?;

        let files = ScenarioFiles {
            info: dir.join(format!("{}.json", self.name)),
            prefab: dir.join(format!("{}.prefab", self.name)),
        };
        fs::write(&files.prefab, self.prefab()?)?;
        fs::write(&files.info, serde_json::to_string_pretty(&self.info())?)?;

        info!(scenario = %self.name, dir = %dir.display(), "Scenario files written");
        Ok(files)
    }

    fn validate_names(&self) -> Result<(), BngError> {
        validate_identifier(&self.level)?;
        validate_identifier(&self.name)
    }
}

/// Ids end up as Torque object names and file names, so only ASCII
/// letters, digits and underscores are allowed.
pub(crate) fn validate_identifier(id: &str) -> Result<(), BngError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BngError::InvalidIdentifier(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Orientation, Vec3};

    fn quat_scenario() -> Scenario {
        let mut scenario = Scenario::new("smallgrid", "test_quat").with_authors("BeamNG");
        scenario
            .add_vehicle(
                Vehicle::new("ego_vehicle", "etk800")
                    .with_color("Blue")
                    .with_licence("angle"),
                Pose::new(Vec3::zeros(), Orientation::euler(0.0, 0.0, 0.0)),
            )
            .unwrap();
        scenario
            .add_vehicle(
                Vehicle::new("ego_vehicle2", "etk800")
                    .with_color("Green")
                    .with_license("quat"),
                Pose::new(
                    Vec3::new(5.0, 0.0, 0.0),
                    Orientation::quaternion(-0.00333699025, -0.00218820246, -0.689169466, 0.724589229),
                ),
            )
            .unwrap();
        scenario
    }

    #[test]
    fn test_duplicate_vehicle_rejected() {
        let mut scenario = quat_scenario();
        let err = scenario
            .add_vehicle(Vehicle::new("ego_vehicle", "pickup"), Pose::default())
            .unwrap_err();
        assert!(matches!(err, BngError::DuplicateId(id) if id == "ego_vehicle"));
        assert_eq!(scenario.vehicles().len(), 2);
    }

    #[test]
    fn test_object_cannot_reuse_vehicle_id() {
        let mut scenario = quat_scenario();
        let object = ScenarioObject::new("ego_vehicle2", "cones", "BeamNGVehicle", Pose::default());
        assert!(matches!(
            scenario.add_object(object),
            Err(BngError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let mut scenario = quat_scenario();
        let err = scenario
            .add_vehicle(Vehicle::new("ego vehicle", "pickup"), Pose::default())
            .unwrap_err();
        assert!(matches!(err, BngError::InvalidIdentifier(_)));
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("ego_vehicle4").is_ok());
    }

    #[test]
    fn test_info_focus_and_prefab_path() {
        let info = quat_scenario().info();
        assert!(info.vehicles["ego_vehicle"].start_focus);
        assert!(!info.vehicles["ego_vehicle2"].start_focus);
        assert!(info.vehicles.values().all(|v| v.player_usable));
        assert_eq!(info.prefabs, vec!["levels/smallgrid/scenarios/test_quat.prefab"]);

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["vehicles"]["ego_vehicle"]["startFocus"], true);
        assert_eq!(value["authors"], "BeamNG");
        assert!(value["lapConfig"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_prefab_contains_vehicle_fields() {
        let prefab = quat_scenario().prefab().unwrap();
        assert!(prefab.contains("new BeamNGVehicle(ego_vehicle) {"));
        assert!(prefab.contains("JBeam = \"etk800\";"));
        assert!(prefab.contains("licenseText = \"angle\";"));
        assert!(prefab.contains("licenseText = \"quat\";"));
        assert!(prefab.contains("rotationMatrix = \"1 0 0 0 1 0 0 0 1\";"));
        assert!(prefab.contains("position = \"5 0 0\";"));
    }

    #[test]
    fn test_scenario_starts_unmade() {
        let scenario = quat_scenario();
        assert!(scenario.path().is_none());
        assert_eq!(scenario.level(), "smallgrid");
    }

    #[test]
    fn test_vehicle_lookup() {
        let mut scenario = quat_scenario();
        assert_eq!(scenario.vehicle("ego_vehicle2").map(Vehicle::model), Some("etk800"));
        assert!(scenario.vehicle_mut("missing").is_none());
    }

    #[test]
    fn test_write_files() {
        let dir = std::env::temp_dir().join(format!("bng_scenario_test_{}", std::process::id()));
        let files = quat_scenario().write_files(&dir).unwrap();

        let prefab = fs::read_to_string(&files.prefab).unwrap();
        assert!(prefab.contains("new BeamNGVehicle(ego_vehicle2)"));
        let info: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&files.info).unwrap()).unwrap();
        assert_eq!(info["name"], "test_quat");

        let _ = fs::remove_dir_all(&dir);
    }
}
