//! In-process mock simulator for integration tests
//!
//! Speaks the wire protocol on a loopback listener. It keeps just enough state
//! to answer like the real simulator: registered scenarios, vehicles and
//! scenario objects, and a per-vehicle listener for vehicle connections.
//!
//! A vehicle's reported `pos` is its reference node, which sits at
//! [`REF_NODE_OFFSET`] from the spawn/teleport point in the vehicle frame.
//! Rotating a vehicle in place therefore moves its reported position.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use beamng_remote_core::protocol::{codec, PROTOCOL_VERSION};
use beamng_remote_core::BngConfig;
use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde_json::{json, Map, Value};

/// Offset of the reference node from the vehicle origin, vehicle frame.
pub const REF_NODE_OFFSET: [f64; 3] = [0.5, 1.2, 0.4];

#[derive(Debug, Clone)]
pub struct MockVehicle {
    pub model: String,
    pub options: Map<String, Value>,
    pub pos: Vector3<f64>,
    pub rot: UnitQuaternion<f64>,
    pub last_control: Option<Value>,
    pub ai_mode: Option<String>,
    pub ai_speed: Option<f64>,
}

impl MockVehicle {
    fn new(model: &str, pos: Vector3<f64>, rot: UnitQuaternion<f64>) -> Self {
        Self {
            model: model.to_string(),
            options: Map::new(),
            pos,
            rot,
            last_control: None,
            ai_mode: None,
            ai_speed: None,
        }
    }

    pub fn ref_node(&self) -> Vector3<f64> {
        self.pos + self.rot * Vector3::from(REF_NODE_OFFSET)
    }
}

#[derive(Debug, Clone)]
pub struct MockObject {
    pub class: String,
    pub pos: Vector3<f64>,
    pub rot: UnitQuaternion<f64>,
}

#[derive(Debug, Default)]
pub struct SimState {
    /// Registered scenarios by path: (prefab, info)
    pub scenarios: BTreeMap<String, (String, Value)>,
    pub loaded: Option<String>,
    pub running: bool,
    pub paused: bool,
    pub steps: u32,
    pub deterministic: bool,
    pub fps_limit: Option<u64>,
    pub vehicles: BTreeMap<String, MockVehicle>,
    pub objects: BTreeMap<String, MockObject>,
    /// Every request received on the game channel, in order
    pub requests: Vec<Value>,
    /// Vehicles with an open vehicle connection
    pub connected: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub protocol_version: String,
    /// Request types that are swallowed without a reply
    pub silenced: HashSet<String>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            silenced: HashSet::new(),
        }
    }
}

impl MockOptions {
    pub fn protocol_version(mut self, version: &str) -> Self {
        self.protocol_version = version.to_string();
        self
    }

    pub fn silence(mut self, request_type: &str) -> Self {
        self.silenced.insert(request_type.to_string());
        self
    }
}

type Shared = Arc<Mutex<SimState>>;

pub struct MockSimulator {
    port: u16,
    state: Shared,
}

impl MockSimulator {
    pub fn start() -> Self {
        Self::with_options(MockOptions::default())
    }

    pub fn with_options(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state: Shared = Arc::default();

        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let shared = Arc::clone(&shared);
                let options = options.clone();
                thread::spawn(move || serve_game(stream, &shared, &options));
            }
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client configuration pointing at this mock, with short timeouts.
    pub fn config(&self) -> BngConfig {
        BngConfig::new("127.0.0.1", self.port)
            .with_request_timeout(Duration::from_secs(5))
            .with_load_timeout(Duration::from_secs(5))
    }

    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    /// Types of all game channel requests seen so far.
    pub fn request_types(&self) -> Vec<String> {
        self.state()
            .requests
            .iter()
            .filter_map(|r| r["type"].as_str().map(str::to_string))
            .collect()
    }
}

fn send(stream: &mut TcpStream, request: &Value, mut response: Value) {
    response[codec::ID_KEY] = request[codec::ID_KEY].clone();
    let payload = codec::encode_message(&response).unwrap();
    codec::write_frame(stream, &payload).unwrap();
}

fn read_request(stream: &mut TcpStream) -> Option<Value> {
    let frame = codec::read_frame(stream).ok()?;
    codec::decode_message(&frame).ok()
}

fn vec3(value: &Value) -> Vector3<f64> {
    let a: Vec<f64> = serde_json::from_value(value.clone()).unwrap();
    Vector3::new(a[0], a[1], a[2])
}

fn quat(value: &Value) -> UnitQuaternion<f64> {
    let a: Vec<f64> = serde_json::from_value(value.clone()).unwrap();
    UnitQuaternion::from_quaternion(Quaternion::new(a[3], a[0], a[1], a[2]))
}

fn quat_wire(q: &UnitQuaternion<f64>) -> Value {
    let c = q.coords;
    json!([c.x, c.y, c.z, c.w])
}

fn serve_game(mut stream: TcpStream, shared: &Shared, options: &MockOptions) {
    while let Some(request) = read_request(&mut stream) {
        let kind = request["type"].as_str().unwrap_or_default().to_string();
        shared.lock().unwrap().requests.push(request.clone());
        if options.silenced.contains(&kind) {
            continue;
        }
        let response = handle_game(&kind, &request, shared, options);
        send(&mut stream, &request, response);
    }
}

fn handle_game(kind: &str, request: &Value, shared: &Shared, options: &MockOptions) -> Value {
    let mut state = shared.lock().unwrap();
    match kind {
        "Hello" => json!({"type": "Hello", "protocolVersion": options.protocol_version}),
        "CreateScenario" => {
            let level = request["level"].as_str().unwrap();
            let name = request["name"].as_str().unwrap();
            let path = format!("levels/{level}/scenarios/{name}.json");
            let prefab = request["prefab"].as_str().unwrap().to_string();
            state
                .scenarios
                .insert(path.clone(), (prefab, request["info"].clone()));
            json!({"type": "CreateScenario", "result": path})
        }
        "LoadScenario" => {
            let path = request["path"].as_str().unwrap();
            let Some((prefab, _)) = state.scenarios.get(path).cloned() else {
                return json!({"type": "LoadScenario", "bngError": format!("no scenario at {path}")});
            };
            state.vehicles.clear();
            state.objects.clear();
            for block in parse_prefab(&prefab) {
                if block.class == "BeamNGVehicle" {
                    let mut vehicle = MockVehicle::new(&block.model, block.pos, block.rot);
                    for (key, value) in &block.fields {
                        vehicle.options.insert(key.clone(), json!(value));
                    }
                    state.vehicles.insert(block.id.clone(), vehicle);
                }
                state.objects.insert(
                    block.id,
                    MockObject {
                        class: block.class,
                        pos: block.pos,
                        rot: block.rot,
                    },
                );
            }
            state.loaded = Some(path.to_string());
            json!({"type": "MapLoaded"})
        }
        "StartScenario" => {
            state.running = true;
            json!({"type": "ScenarioStarted"})
        }
        "RestartScenario" => {
            state.running = true;
            json!({"type": "ScenarioRestarted"})
        }
        "StopScenario" => {
            state.running = false;
            json!({"type": "ScenarioStopped"})
        }
        "SpawnVehicle" => {
            let vid = request["name"].as_str().unwrap().to_string();
            if state.vehicles.contains_key(&vid) {
                return json!({"type": "VehicleSpawned", "success": false});
            }
            let mut vehicle = MockVehicle::new(
                request["model"].as_str().unwrap(),
                vec3(&request["pos"]),
                quat(&request["rot"]),
            );
            if let Some(opts) = request["options"].as_object() {
                vehicle.options = opts.clone();
            }
            state.vehicles.insert(vid, vehicle);
            json!({"type": "VehicleSpawned", "success": true})
        }
        "DespawnVehicle" => {
            let vid = request["vid"].as_str().unwrap();
            if state.vehicles.remove(vid).is_none() {
                return json!({"type": "VehicleDespawned", "bngValueError": format!("no vehicle {vid}")});
            }
            state.objects.remove(vid);
            json!({"type": "VehicleDespawned"})
        }
        "GetCurrentVehicles" => {
            let vehicles: Map<String, Value> = state
                .vehicles
                .iter()
                .map(|(vid, v)| {
                    (
                        vid.clone(),
                        json!({"name": vid, "model": v.model, "options": v.options}),
                    )
                })
                .collect();
            json!({"type": "CurrentVehicles", "vehicles": vehicles})
        }
        "TeleportVehicle" => {
            let vid = request["vehicle"].as_str().unwrap();
            let Some(vehicle) = state.vehicles.get_mut(vid) else {
                return json!({"type": "Teleported", "success": false});
            };
            vehicle.pos = vec3(&request["pos"]);
            if let Some(rot) = request.get("rot") {
                vehicle.rot = quat(rot);
            }
            json!({"type": "Teleported", "success": true})
        }
        "TeleportScenarioObject" => {
            let id = request["id"].as_str().unwrap().to_string();
            let pos = vec3(&request["pos"]);
            let rot = request.get("rot").map(quat);
            let Some(object) = state.objects.get_mut(&id) else {
                return json!({
                    "type": "ScenarioObjectTeleported",
                    "bngValueError": format!("unknown scenario object {id}")
                });
            };
            object.pos = pos;
            if let Some(rot) = rot {
                object.rot = rot;
            }
            if let Some(vehicle) = state.vehicles.get_mut(&id) {
                vehicle.pos = pos;
                if let Some(rot) = rot {
                    vehicle.rot = rot;
                }
            }
            json!({"type": "ScenarioObjectTeleported"})
        }
        "StartVehicleConnection" => {
            let vid = request["vid"].as_str().unwrap().to_string();
            if !state.vehicles.contains_key(&vid) {
                return json!({
                    "type": "StartVehicleConnection",
                    "bngValueError": format!("no vehicle {vid}")
                });
            }
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            let shared = Arc::clone(shared);
            let options = options.clone();
            thread::spawn(move || {
                if let Ok((stream, _)) = listener.accept() {
                    serve_vehicle(stream, &vid, &shared, &options);
                }
            });
            json!({"type": "StartVehicleConnection", "result": port})
        }
        "Pause" => {
            state.paused = true;
            json!({"type": "Paused"})
        }
        "Resume" => {
            state.paused = false;
            json!({"type": "Resumed"})
        }
        "Step" => {
            state.steps += u32::try_from(request["count"].as_u64().unwrap()).unwrap();
            json!({"type": "Stepped"})
        }
        "SetPhysicsDeterministic" => {
            state.deterministic = true;
            json!({"type": "SetPhysicsDeterministic"})
        }
        "SetPhysicsNonDeterministic" => {
            state.deterministic = false;
            json!({"type": "SetPhysicsNonDeterministic"})
        }
        "FPSLimit" => {
            state.fps_limit = request["fps"].as_u64();
            json!({"type": "SetFPSLimit"})
        }
        other => json!({"type": other, "bngError": format!("unknown request {other}")}),
    }
}

fn serve_vehicle(mut stream: TcpStream, vid: &str, shared: &Shared, options: &MockOptions) {
    shared.lock().unwrap().connected.push(vid.to_string());
    while let Some(request) = read_request(&mut stream) {
        let kind = request["type"].as_str().unwrap_or_default().to_string();
        if options.silenced.contains(&kind) {
            continue;
        }
        let response = handle_vehicle(&kind, &request, vid, shared, options);
        send(&mut stream, &request, response);
    }
}

fn handle_vehicle(
    kind: &str,
    request: &Value,
    vid: &str,
    shared: &Shared,
    options: &MockOptions,
) -> Value {
    let mut state = shared.lock().unwrap();
    let steps = state.steps;
    let Some(vehicle) = state.vehicles.get_mut(vid) else {
        return json!({"type": kind, "bngError": format!("vehicle {vid} is gone")});
    };
    match kind {
        "Hello" => json!({"type": "Hello", "protocolVersion": options.protocol_version}),
        "UpdateVehicle" => {
            let pos = vehicle.ref_node();
            let dir = vehicle.rot * Vector3::new(0.0, -1.0, 0.0);
            let up = vehicle.rot * Vector3::new(0.0, 0.0, 1.0);
            json!({
                "type": "VehicleUpdate",
                "state": {
                    "pos": [pos.x, pos.y, pos.z],
                    "dir": [dir.x, dir.y, dir.z],
                    "up": [up.x, up.y, up.z],
                    "vel": [0.0, 0.0, 0.0],
                    "rotation": quat_wire(&vehicle.rot),
                }
            })
        }
        "SensorRequest" => {
            let mut data = Map::new();
            for (name, sensor) in request["sensors"].as_object().unwrap() {
                let reading = match sensor["type"].as_str().unwrap() {
                    "Electrics" => json!({
                        "values": {"wheelspeed": 0.0, "gear": "N", "running": true}
                    }),
                    "Damage" => json!({"damage": 0.0, "part_damage": {}}),
                    "GForces" => json!({"gx": 0.0, "gy": 0.0, "gz": -1.0}),
                    "Timer" => json!({"time": f64::from(steps) * 0.0005}),
                    other => {
                        return json!({
                            "type": "SensorData",
                            "bngValueError": format!("unknown sensor type {other}")
                        })
                    }
                };
                data.insert(name.clone(), reading);
            }
            json!({"type": "SensorData", "data": data})
        }
        "Control" => {
            let mut control = request.clone();
            if let Some(map) = control.as_object_mut() {
                map.remove("type");
                map.remove(codec::ID_KEY);
            }
            vehicle.last_control = Some(control);
            json!({"type": "Controlled"})
        }
        "SetAiMode" => {
            vehicle.ai_mode = request["mode"].as_str().map(str::to_string);
            json!({"type": "AiModeSet"})
        }
        "SetAiSpeed" => {
            vehicle.ai_speed = request["speed"].as_f64();
            json!({"type": "AiSpeedSet"})
        }
        other => json!({"type": other, "bngError": format!("unknown vehicle request {other}")}),
    }
}

struct PrefabBlock {
    class: String,
    id: String,
    model: String,
    pos: Vector3<f64>,
    rot: UnitQuaternion<f64>,
    fields: Vec<(String, String)>,
}

/// Pull `new Class(id) { ... };` blocks out of a prefab document.
fn parse_prefab(prefab: &str) -> Vec<PrefabBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<PrefabBlock> = None;

    for line in prefab.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("new ") {
            if rest.starts_with("SimGroup") {
                continue;
            }
            let (class, tail) = rest.split_once('(').unwrap();
            let id = tail.split_once(')').unwrap().0;
            current = Some(PrefabBlock {
                class: class.to_string(),
                id: id.to_string(),
                model: String::new(),
                pos: Vector3::zeros(),
                rot: UnitQuaternion::identity(),
                fields: Vec::new(),
            });
        } else if line == "};" {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
        } else if let Some(block) = current.as_mut() {
            let Some((key, value)) = line.split_once(" = ") else {
                continue;
            };
            let value = value.trim_end_matches(';').trim_matches('"').to_string();
            match key {
                "JBeam" => block.model.clone_from(&value),
                "position" => block.pos = Vector3::from_iterator(numbers(&value)),
                "rotationMatrix" => {
                    let m = Matrix3::from_row_iterator(numbers(&value));
                    block.rot =
                        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m));
                }
                _ => {}
            }
            if key == "color" || key == "licenseText" || key == "partConfig" {
                block.fields.push((key.to_string(), value));
            }
        }
    }
    blocks
}

fn numbers(text: &str) -> impl Iterator<Item = f64> + '_ {
    text.split_whitespace().map(|n| n.parse::<f64>().unwrap())
}
