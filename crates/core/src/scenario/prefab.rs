//! Prefab document rendering
//!
//! A prefab is a Torque script fragment that declares every scenario vehicle
//! and object inside one `SimGroup`:
//!
//! ```text
//! $ScenarioObjectsGroup = new SimGroup(ScenarioObjectsGroup) {
//!     canSave = "1";
//!     canSaveDynamicFields = "1";
//!
//!     new BeamNGVehicle(ego_vehicle) {
//!         JBeam = "etk800";
//!         dataBlock = "default_vehicle";
//!         position = "0 0 0";
//!         rotationMatrix = "1 0 0 0 1 0 0 0 1";
//!         color = "Blue";
//!     };
//! };
//! ```

use super::object::ScenarioObject;
use super::ScenarioVehicle;
use crate::core_types::vec3::to_prefab_string;
use crate::error::BngError;

const INDENT: &str = "    ";

/// Render the prefab for the given vehicles and objects.
pub(crate) fn render(
    vehicles: &[ScenarioVehicle],
    objects: &[ScenarioObject],
) -> Result<String, BngError> {
    let mut lines = vec![
        "$ScenarioObjectsGroup = new SimGroup(ScenarioObjectsGroup) {".to_string(),
        field(1, "canSave", "1"),
        field(1, "canSaveDynamicFields", "1"),
    ];

    for entry in vehicles {
        lines.push(String::new());
        lines.extend(vehicle_block(entry)?);
    }
    for object in objects {
        lines.push(String::new());
        lines.extend(object_block(object)?);
    }

    lines.push("};".to_string());
    lines.push(String::new());
    Ok(lines.join("\n"))
}

fn vehicle_block(entry: &ScenarioVehicle) -> Result<Vec<String>, BngError> {
    let vehicle = &entry.vehicle;
    let options = vehicle.options();
    let mut lines = vec![
        format!("{INDENT}new BeamNGVehicle({}) {{", vehicle.vid()),
        field(2, "JBeam", vehicle.model()),
        field(2, "dataBlock", "default_vehicle"),
        field(2, "position", &to_prefab_string(&entry.pose.pos)),
        field(2, "rotationMatrix", &entry.pose.rot.rotation_matrix_string()?),
    ];
    if let Some(color) = &options.color {
        lines.push(field(2, "color", color));
    }
    if let Some(license) = &options.license {
        lines.push(field(2, "licenseText", license));
    }
    if let Some(part_config) = &options.part_config {
        lines.push(field(2, "partConfig", part_config));
    }
    lines.push(format!("{INDENT}}};"));
    Ok(lines)
}

fn object_block(object: &ScenarioObject) -> Result<Vec<String>, BngError> {
    let pose = object.pose();
    let mut lines = vec![
        format!("{INDENT}new {}({}) {{", object.otype(), object.oid()),
        field(2, "name", object.name()),
        field(2, "position", &to_prefab_string(&pose.pos)),
        field(2, "rotationMatrix", &pose.rot.rotation_matrix_string()?),
        field(2, "scale", &to_prefab_string(object.scale())),
    ];
    lines.extend(
        object
            .options()
            .iter()
            .map(|(key, value)| field(2, key, value)),
    );
    lines.push(format!("{INDENT}}};"));
    Ok(lines)
}

fn field(depth: usize, key: &str, value: &str) -> String {
    format!("{}{key} = \"{}\";", INDENT.repeat(depth), escape(value))
}

/// Escape a value for use inside a double-quoted Torque script string.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
