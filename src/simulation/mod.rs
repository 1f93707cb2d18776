//! Simulation core: entity world, road network, routing and systems.

pub mod components;
pub mod engine;
pub mod pathfinder;
pub mod road_network;
pub mod systems;
pub mod types;
pub mod world;

pub use components::{
    Bounds, Collision, Component, ComponentKind, ComponentMask, PathFollowing, Renderable,
    Selectable, Shape, Signal, Transform, Vehicle, VehicleKind,
};
pub use engine::TrafficSimulation;
pub use road_network::{
    ConnectionPoint, Intersection, Lane, LaneKind, LaneLink, RoadNetwork, RoadSegment,
    SegmentEnd, SignalPhase, TrafficSignal,
};
pub use types::{EntityId, IntersectionId, LaneId, PathStep, SegmentId, Vec2};
pub use world::World;
