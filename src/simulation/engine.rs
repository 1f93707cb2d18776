//! Simulation facade
//!
//! Owns the entity world and the optional road network and drives the
//! per-tick system pipeline. This is the surface embedders talk to;
//! everything underneath stays reachable through `world` for callers
//! that need direct component access.

use anyhow::Result;

use super::components::{
    Bounds, Collision, PathFollowing, Renderable, Transform, Vehicle,
};
use super::road_network::RoadNetwork;
use super::systems;
use super::types::{EntityId, Vec2, DEFAULT_COLLISION_RADIUS};
use super::world::World;

pub struct TrafficSimulation {
    pub world: World,
    road_network: Option<RoadNetwork>,
    bounds_entity: Option<EntityId>,
    keep_in_bounds: bool,
}

impl Default for TrafficSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficSimulation {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            road_network: None,
            bounds_entity: None,
            keep_in_bounds: true,
        }
    }

    /// Set up the world rectangle. Replaces the previous bounds entity if
    /// one exists, so repeated initialization never stacks bounds.
    pub fn initialize(&mut self, width: f32, height: f32) -> Result<()> {
        if let Some(old) = self.bounds_entity.take() {
            self.world.destroy_entity(old);
        }
        let id = self.world.create_entity();
        let mut bounds = Bounds::new(width, height);
        bounds.keep_in_bounds = self.keep_in_bounds;
        self.world.add_component(id, bounds)?;
        self.bounds_entity = Some(id);
        Ok(())
    }

    /// Spawn a vehicle entity at a position with an initial velocity.
    pub fn create_vehicle(&mut self, position: Vec2, velocity: Vec2) -> Result<EntityId> {
        let id = self.world.create_entity();
        self.world
            .add_component(id, Transform::new(position, velocity))?;
        self.world.add_component(id, Vehicle::default())?;
        self.world
            .add_component(id, Collision::new(DEFAULT_COLLISION_RADIUS))?;
        self.world.add_component(id, Renderable::default())?;
        Ok(id)
    }

    pub fn destroy_vehicle(&mut self, id: EntityId) {
        self.world.destroy_entity(id);
    }

    /// Route a vehicle between two world points; the start is given
    /// explicitly and need not be the vehicle's current position.
    /// Returns whether a route was found; on failure the vehicle keeps
    /// whatever path state it already had.
    pub fn create_path(&mut self, vehicle: EntityId, start: Vec2, destination: Vec2) -> bool {
        let Some(network) = self.road_network.as_ref() else {
            return false;
        };
        if !self.world.is_live(vehicle) {
            return false;
        }
        let path = network.find_path(start, destination);
        if path.is_empty() {
            return false;
        }
        match self.world.get_component_mut::<PathFollowing>(vehicle) {
            Ok(following) => following.set_path(path),
            Err(_) => {
                if self
                    .world
                    .add_component(vehicle, PathFollowing::with_path(path))
                    .is_err()
                {
                    return false;
                }
            }
        }
        true
    }

    /// Position of an entity, or zero when it has no transform. Reads are
    /// tolerant so embedders can poll entities they just destroyed.
    pub fn vehicle_position(&self, id: EntityId) -> Vec2 {
        self.world
            .get_component::<Transform>(id)
            .map(|transform| transform.position)
            .unwrap_or(Vec2::ZERO)
    }

    /// Velocity of an entity, or zero when it has no transform.
    pub fn vehicle_velocity(&self, id: EntityId) -> Vec2 {
        self.world
            .get_component::<Transform>(id)
            .map(|transform| transform.velocity)
            .unwrap_or(Vec2::ZERO)
    }

    /// Heading of an entity in radians, or zero when it has no transform.
    pub fn vehicle_rotation(&self, id: EntityId) -> f32 {
        self.world
            .get_component::<Transform>(id)
            .map(|transform| transform.rotation)
            .unwrap_or(0.0)
    }

    pub fn vehicle_count(&self) -> usize {
        self.world
            .count_with(super::components::ComponentMask::of::<Vehicle>())
    }

    /// Advance the simulation by one tick.
    pub fn update(&mut self, dt: f32) {
        systems::movement_system(&mut self.world, dt);
        systems::bounds_system(&mut self.world);
        if let Some(network) = self.road_network.as_ref() {
            systems::path_following_system(&mut self.world, network, dt);
        }
        systems::collision_system(&mut self.world);
        systems::signal_system(&mut self.world, dt);
        if let Some(network) = self.road_network.as_mut() {
            network.update(dt);
        }
    }

    /// Destroy every entity, including the bounds entity. The road
    /// network is untouched; call again after `initialize` to keep
    /// clamping. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.world.clear_entities();
        self.bounds_entity = None;
    }

    /// Capacity hint for a batch of vehicles about to be spawned.
    pub fn reserve_vehicles(&mut self, count: usize) {
        self.world.reserve(count);
    }

    pub fn set_keep_in_bounds(&mut self, keep: bool) {
        self.keep_in_bounds = keep;
        if let Some(id) = self.bounds_entity {
            if let Ok(bounds) = self.world.get_component_mut::<Bounds>(id) {
                bounds.keep_in_bounds = keep;
            }
        }
    }

    pub fn keep_in_bounds(&self) -> bool {
        self.keep_in_bounds
    }

    pub fn set_road_network(&mut self, network: RoadNetwork) {
        self.road_network = Some(network);
    }

    pub fn road_network(&self) -> Option<&RoadNetwork> {
        self.road_network.as_ref()
    }

    pub fn road_network_mut(&mut self) -> Option<&mut RoadNetwork> {
        self.road_network.as_mut()
    }
}
