use std::process::ExitCode;

use beamng_remote_core::{
    setup_logging, BeamNg, BngConfig, BngError, Orientation, Pose, Scenario, ScenarioObject, Vec3,
    Vehicle,
};
use clap::Parser;
use tracing::error;

/// Quaternion teleport demo against a running BeamNG.drive
#[derive(Parser, Debug)]
#[command(name = "beamng-demo")]
#[command(about = "Spawn vehicles and teleport them using Euler and quaternion rotations", long_about = None)]
struct Args {
    /// Simulator host (default: BNG_HOST, then localhost)
    #[arg(long)]
    host: Option<String>,

    /// Simulator remote-control port (default: BNG_PORT, then 64256)
    #[arg(short, long)]
    port: Option<u16>,

    /// Level to build the scenario on
    #[arg(short, long, default_value = "smallgrid")]
    level: String,
}

const QUAT: (f64, f64, f64, f64) = (-0.00333699025, -0.00218820246, -0.689169466, 0.724589229);

fn main() -> ExitCode {
    setup_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), BngError> {
    println!("=== BeamNG Quaternion Demo ===\n");
    let mut config = BngConfig::from_env()?;
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    let mut bng = BeamNg::open(config)?;
    let quat = Orientation::quaternion(QUAT.0, QUAT.1, QUAT.2, QUAT.3);

    let mut scenario = Scenario::new(&args.level, "test_quat")
        .with_description("Euler and quaternion poses side by side");
    scenario.add_vehicle(
        Vehicle::new("ego_vehicle", "etk800")
            .with_color("Blue")
            .with_licence("angle"),
        Pose::new(Vec3::zeros(), Orientation::euler(0.0, 0.0, 0.0)),
    )?;
    scenario.add_vehicle(
        Vehicle::new("ego_vehicle2", "etk800")
            .with_color("Green")
            .with_license("quat"),
        Pose::new(Vec3::new(5.0, 0.0, 0.0), quat),
    )?;

    let roadblock = ScenarioObject::new(
        "roadblock",
        "sawhorse",
        "BeamNGVehicle",
        Pose::new(Vec3::new(-10.0, -5.0, 0.0), Orientation::euler(0.0, 0.0, 0.0)),
    )
    .with_option("JBeam", "sawhorse")
    .with_option("dataBlock", "default_vehicle");
    scenario.add_object(roadblock.clone())?;
    scenario.add_object(
        ScenarioObject::new(
            "cones",
            "cones",
            "BeamNGVehicle",
            Pose::new(Vec3::new(0.0, -5.0, 0.0), Orientation::IDENTITY),
        )
        .with_option("JBeam", "cones")
        .with_option("dataBlock", "default_vehicle"),
    )?;

    scenario.make(&mut bng)?;
    bng.load_scenario(&mut scenario)?;
    bng.start_scenario()?;
    println!("Scenario '{}' running on {}", scenario.name(), scenario.level());

    let white_etk = Vehicle::new("ego_vehicle3", "etk800").with_color("White");
    bng.spawn_vehicle(
        &white_etk,
        Pose::new(Vec3::new(-10.0, 0.0, 0.0), Orientation::euler(0.0, 0.0, 0.0)),
        true,
    )?;

    let mut pickup = Vehicle::new("ego_vehicle4", "pickup");
    let pos = Vec3::new(-15.0, 0.0, 0.0);
    bng.spawn_vehicle(&pickup, Pose::new(pos, Orientation::IDENTITY), true)?;

    let current = bng.get_current_vehicles()?;
    println!("Vehicles in simulation: {}", current.len());
    for (vid, info) in &current {
        println!("  {vid:<14} {}", info.model);
    }
    println!();

    pickup.connect(&mut bng)?;
    for (label, rot) in [
        ("Euler (0, 45, 0)", Orientation::euler(0.0, 45.0, 0.0)),
        ("quaternion", quat),
    ] {
        pickup.poll_sensors()?;
        let before = pickup.state().map(|s| s.pos);
        bng.teleport_vehicle(pickup.vid(), pos, Some(rot), true)?;
        pickup.poll_sensors()?;
        let after = pickup.state().map(|s| s.pos);
        println!("Teleport with {label}:");
        println!("  before: {}", format_pos(before));
        println!("  after:  {}", format_pos(after));
    }

    let target = Vec3::new(-10.0, 5.0, 0.0);
    bng.teleport_scenario_object(&roadblock, target, Some(Orientation::euler(-45.0, 0.0, 0.0)))?;
    bng.teleport_scenario_object(
        &roadblock,
        target,
        Some(Orientation::quaternion(-0.003337, -0.0021882, -0.6891695, 0.7245892)),
    )?;
    println!("\nRoadblock teleported with Euler and quaternion rotations");

    pickup.disconnect();
    bng.close();
    Ok(())
}

fn format_pos(pos: Option<Vec3>) -> String {
    match pos {
        Some(p) => format!("({:.3}, {:.3}, {:.3})", p.x, p.y, p.z),
        None => "unknown".to_string(),
    }
}
