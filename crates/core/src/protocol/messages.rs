//! Request and response payloads
//!
//! Requests are an internally tagged enum: the variant name (or its rename)
//! becomes the `type` field of the outgoing map. Responses arrive as dynamic
//! maps and are narrowed into the small structs below once their `type` has
//! been checked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::vehicle::{AiMode, AiSpeedMode, Control, VehicleOptions, VehicleState};

/// A request to the simulator, on either the game or a vehicle channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Request {
    // --- both channels ---
    Hello {
        #[serde(rename = "protocolVersion")]
        protocol_version: String,
    },

    // --- game channel ---
    CreateScenario {
        level: String,
        name: String,
        prefab: String,
        info: Value,
    },
    LoadScenario {
        path: String,
    },
    StartScenario,
    RestartScenario,
    StopScenario,
    SpawnVehicle {
        name: String,
        model: String,
        pos: [f64; 3],
        rot: [f64; 4],
        cling: bool,
        options: VehicleOptions,
    },
    DespawnVehicle {
        vid: String,
    },
    GetCurrentVehicles,
    TeleportVehicle {
        vehicle: String,
        pos: [f64; 3],
        #[serde(skip_serializing_if = "Option::is_none")]
        rot: Option<[f64; 4]>,
        reset: bool,
    },
    TeleportScenarioObject {
        id: String,
        pos: [f64; 3],
        #[serde(skip_serializing_if = "Option::is_none")]
        rot: Option<[f64; 4]>,
    },
    StartVehicleConnection {
        vid: String,
        exts: Vec<String>,
    },
    Pause,
    Resume,
    Step {
        count: u32,
        ack: bool,
    },
    SetPhysicsDeterministic,
    SetPhysicsNonDeterministic,
    #[serde(rename = "FPSLimit")]
    FpsLimit {
        fps: u32,
    },

    // --- vehicle channel ---
    UpdateVehicle,
    SensorRequest {
        sensors: Map<String, Value>,
    },
    Control(Control),
    SetAiMode {
        mode: AiMode,
    },
    SetAiSpeed {
        speed: f64,
        mode: AiSpeedMode,
    },
}

impl Request {
    /// Wire name of this request, as written into the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::CreateScenario { .. } => "CreateScenario",
            Self::LoadScenario { .. } => "LoadScenario",
            Self::StartScenario => "StartScenario",
            Self::RestartScenario => "RestartScenario",
            Self::StopScenario => "StopScenario",
            Self::SpawnVehicle { .. } => "SpawnVehicle",
            Self::DespawnVehicle { .. } => "DespawnVehicle",
            Self::GetCurrentVehicles => "GetCurrentVehicles",
            Self::TeleportVehicle { .. } => "TeleportVehicle",
            Self::TeleportScenarioObject { .. } => "TeleportScenarioObject",
            Self::StartVehicleConnection { .. } => "StartVehicleConnection",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Step { .. } => "Step",
            Self::SetPhysicsDeterministic => "SetPhysicsDeterministic",
            Self::SetPhysicsNonDeterministic => "SetPhysicsNonDeterministic",
            Self::FpsLimit { .. } => "FPSLimit",
            Self::UpdateVehicle => "UpdateVehicle",
            Self::SensorRequest { .. } => "SensorRequest",
            Self::Control(_) => "Control",
            Self::SetAiMode { .. } => "SetAiMode",
            Self::SetAiSpeed { .. } => "SetAiSpeed",
        }
    }
}

/// Reply to `Hello`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
}

/// Reply carrying a success flag (`VehicleSpawned`, `Teleported`).
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Reply carrying a single `result` value (`CreateScenario`, `StartVehicleConnection`).
#[derive(Debug, Clone, Deserialize)]
pub struct ResultResponse<T> {
    pub result: T,
}

/// One entry of the simulator's current vehicle list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleInfo {
    #[serde(default)]
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// Reply to `GetCurrentVehicles`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentVehiclesResponse {
    #[serde(default)]
    pub vehicles: BTreeMap<String, VehicleInfo>,
}

/// Reply to `UpdateVehicle`.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleUpdateResponse {
    pub state: VehicleState,
}

/// Reply to `SensorRequest`.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorDataResponse {
    #[serde(default)]
    pub data: Map<String, Value>,
}
