use anyhow::Result;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use traffic_flow::simulation::{
    ConnectionPoint, RoadNetwork, SegmentEnd, TrafficSimulation, Vec2,
};

#[derive(Parser)]
#[command(name = "traffic_flow")]
#[command(about = "Headless traffic simulation demo")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Number of vehicles to spawn
    #[arg(long, default_value = "20")]
    vehicles: u32,

    /// Seed for vehicle placement
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut sim = TrafficSimulation::new();
    sim.initialize(1000.0, 1000.0)?;
    sim.set_road_network(build_demo_network()?);

    if let Some(network) = sim.road_network() {
        let lanes: usize = network.segments().map(|segment| segment.lane_count()).sum();
        info!(
            "network: {} segments, {} lanes, {} intersections",
            network.segment_count(),
            lanes,
            network.intersection_count()
        );
    }

    spawn_vehicles(&mut sim, cli.vehicles, cli.seed)?;
    info!(
        "running {} ticks at {}s per tick with {} vehicles",
        cli.ticks,
        cli.delta,
        sim.vehicle_count()
    );

    for tick in 0..cli.ticks {
        sim.update(cli.delta);
        if tick % 100 == 0 {
            info!("tick {}: {} entities", tick, sim.world.entity_count());
        }
    }

    println!(
        "simulated {:.1}s across {} ticks, {} vehicles",
        cli.ticks as f32 * cli.delta,
        cli.ticks,
        sim.vehicle_count()
    );
    Ok(())
}

/// A small map: two avenues and a cross street joined end to end with
/// signalized intersections.
fn build_demo_network() -> Result<RoadNetwork> {
    let mut network = RoadNetwork::new();

    let right = Vec2::new(1.0, 0.0);
    let up = Vec2::new(0.0, 1.0);

    let avenue_a = network.create_segment(
        ConnectionPoint::new(Vec2::new(100.0, 300.0), right),
        ConnectionPoint::new(Vec2::new(500.0, 300.0), right),
    );
    let avenue_b = network.create_segment(
        ConnectionPoint::new(Vec2::new(500.0, 300.0), right),
        ConnectionPoint::new(Vec2::new(900.0, 300.0), right),
    );
    let street_a = network.create_segment(
        ConnectionPoint::new(Vec2::new(500.0, 300.0), up),
        ConnectionPoint::new(Vec2::new(500.0, 700.0), up),
    );
    let street_b = network.create_segment(
        ConnectionPoint::new(Vec2::new(500.0, 700.0), right),
        ConnectionPoint::new(Vec2::new(900.0, 700.0), right),
    );

    network.connect_with_intersection(avenue_a, SegmentEnd::End, avenue_b, SegmentEnd::Start)?;
    network.connect_with_intersection(avenue_a, SegmentEnd::End, street_a, SegmentEnd::Start)?;
    network.connect_with_intersection(street_a, SegmentEnd::End, street_b, SegmentEnd::Start)?;

    Ok(network)
}

fn spawn_vehicles(sim: &mut TrafficSimulation, count: u32, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    sim.reserve_vehicles(count as usize);

    for _ in 0..count {
        let position = Vec2::new(
            rng.random_range(100.0..900.0),
            rng.random_range(280.0..320.0),
        );
        let id = sim.create_vehicle(position, Vec2::ZERO)?;
        let destination = Vec2::new(
            rng.random_range(500.0..900.0),
            rng.random_range(680.0..720.0),
        );
        if !sim.create_path(id, position, destination) {
            info!("vehicle {:?}: no route to {:?}", id, destination);
        }
    }
    Ok(())
}
