//! Per-tick simulation systems
//!
//! Free functions over the world, called in a fixed order each tick:
//! movement, bounds, path following, collision, signals. The order is
//! part of the observable behavior and must not be shuffled.

use log::warn;

use super::components::{
    Bounds, Collision, ComponentMask, PathFollowing, Signal, Transform, Vehicle,
};
use super::road_network::RoadNetwork;
use super::types::{
    EntityId, Vec2, BOUNCE_RESTITUTION, COLLISION_DAMPING, GEOM_EPSILON, LOOK_AHEAD_BASE,
    LOOK_AHEAD_SPEED_FACTOR, ROTATION_DEADBAND,
};
use super::world::World;

/// Integrate velocity into position and derive heading from velocity.
/// Heading is held while the entity is near-stationary, so vehicles do
/// not snap to zero rotation when they stop.
pub fn movement_system(world: &mut World, dt: f32) {
    for id in world.entities_with(ComponentMask::of::<Transform>()) {
        let Ok(transform) = world.get_component_mut::<Transform>(id) else {
            continue;
        };
        transform.position += transform.velocity * dt;
        if transform.velocity.length() > ROTATION_DEADBAND {
            transform.rotation = transform.velocity.y.atan2(transform.velocity.x);
        }
    }
}

/// Clamp vehicles into the world rectangle, reflecting and damping the
/// velocity component that crossed an edge. The bounds come from the
/// lowest-id entity holding a `Bounds` component; with no such entity,
/// or with clamping disabled on it, this is a no-op.
pub fn bounds_system(world: &mut World) {
    let Some(&bounds_entity) = world.entities_with(ComponentMask::of::<Bounds>()).first() else {
        return;
    };
    let Ok(bounds) = world.get_component::<Bounds>(bounds_entity).copied() else {
        return;
    };
    if !bounds.keep_in_bounds {
        return;
    }

    let contained = ComponentMask::of::<Transform>() | ComponentMask::of::<Vehicle>();
    for id in world.entities_with(contained) {
        let Ok(transform) = world.get_component_mut::<Transform>(id) else {
            continue;
        };
        if transform.position.x < 0.0 {
            transform.position.x = 0.0;
            transform.velocity.x = -transform.velocity.x * BOUNCE_RESTITUTION;
        } else if transform.position.x > bounds.width {
            transform.position.x = bounds.width;
            transform.velocity.x = -transform.velocity.x * BOUNCE_RESTITUTION;
        }
        if transform.position.y < 0.0 {
            transform.position.y = 0.0;
            transform.velocity.y = -transform.velocity.y * BOUNCE_RESTITUTION;
        } else if transform.position.y > bounds.height {
            transform.position.y = bounds.height;
            transform.velocity.y = -transform.velocity.y * BOUNCE_RESTITUTION;
        }
    }
}

/// Steer path-following vehicles toward a look-ahead point on their
/// current lane and advance their progress along the path.
pub fn path_following_system(world: &mut World, network: &RoadNetwork, dt: f32) {
    let required = ComponentMask::of::<Transform>()
        | ComponentMask::of::<Vehicle>()
        | ComponentMask::of::<PathFollowing>();

    for id in world.entities_with(required) {
        let Ok(transform) = world.get_component::<Transform>(id).copied() else {
            continue;
        };
        let Ok(vehicle) = world.get_component::<Vehicle>(id).copied() else {
            continue;
        };
        let Ok(following) = world.get_component::<PathFollowing>(id) else {
            continue;
        };

        if following.reached_destination() {
            if let Ok(vehicle) = world.get_component_mut::<Vehicle>(id) {
                vehicle.target_speed = 0.0;
            }
            continue;
        }

        let step = following.path[following.current_index];
        let mut current_index = following.current_index;
        let mut distance = following.distance_along_segment;
        let look_ahead = vehicle.current_speed * LOOK_AHEAD_SPEED_FACTOR + LOOK_AHEAD_BASE;

        let Some(segment) = network.segment(step.segment) else {
            warn!(
                "entity {:?} follows unknown segment {:?}, skipping step",
                id, step.segment
            );
            if let Ok(following) = world.get_component_mut::<PathFollowing>(id) {
                following.current_index += 1;
                following.distance_along_segment = 0.0;
            }
            continue;
        };

        // Advance once the look-ahead point would leave the segment.
        let mut active = step;
        if distance + look_ahead > segment.length() {
            current_index += 1;
            distance = 0.0;

            if current_index >= following.path.len() {
                if let Ok(following) = world.get_component_mut::<PathFollowing>(id) {
                    following.current_index = current_index;
                    following.distance_along_segment = 0.0;
                }
                if let Ok(vehicle) = world.get_component_mut::<Vehicle>(id) {
                    vehicle.target_speed = 0.0;
                }
                continue;
            }
            active = following.path[current_index];
        }

        let Some(active_segment) = network.segment(active.segment) else {
            warn!(
                "entity {:?} follows unknown segment {:?}, skipping step",
                id, active.segment
            );
            if let Ok(following) = world.get_component_mut::<PathFollowing>(id) {
                following.current_index = current_index + 1;
                following.distance_along_segment = 0.0;
            }
            continue;
        };

        let target =
            active_segment.lane_position_at_distance(active.lane, distance + look_ahead);

        let desired = (target - transform.position).normalized() * vehicle.max_speed;
        let steering = desired - transform.velocity;
        let mut velocity = transform.velocity + steering * dt;
        let speed = velocity.length();
        if speed > vehicle.max_speed && speed > GEOM_EPSILON {
            velocity = velocity * (vehicle.max_speed / speed);
        }
        let new_speed = speed.min(vehicle.max_speed);

        if let Ok(transform) = world.get_component_mut::<Transform>(id) {
            transform.velocity = velocity;
        }
        if let Ok(vehicle) = world.get_component_mut::<Vehicle>(id) {
            vehicle.current_speed = new_speed;
            vehicle.target_speed = vehicle.max_speed;
        }
        if let Ok(following) = world.get_component_mut::<PathFollowing>(id) {
            following.current_index = current_index;
            following.distance_along_segment = distance + new_speed * dt;
        }
    }
}

/// Detect and resolve overlaps between bounding circles. Every pair is
/// tested; overlapping entities are pushed apart by half the penetration
/// each, and vehicle pairs additionally exchange damped velocities.
pub fn collision_system(world: &mut World) {
    let required = ComponentMask::of::<Transform>() | ComponentMask::of::<Collision>();
    let ids = world.entities_with(required);

    // Reset last tick's contact state before re-testing.
    for &id in &ids {
        if let Ok(collision) = world.get_component_mut::<Collision>(id) {
            collision.colliding = false;
            collision.colliding_with.clear();
        }
    }

    let snapshot: Vec<(EntityId, Vec2, f32)> = ids
        .iter()
        .filter_map(|&id| {
            let position = world.get_component::<Transform>(id).ok()?.position;
            let radius = world.get_component::<Collision>(id).ok()?.radius;
            Some((id, position, radius))
        })
        .collect();

    for i in 0..snapshot.len() {
        for j in (i + 1)..snapshot.len() {
            let (id_a, pos_a, radius_a) = snapshot[i];
            let (id_b, pos_b, radius_b) = snapshot[j];

            let offset = pos_b - pos_a;
            let distance = offset.length();
            let combined = radius_a + radius_b;
            if distance >= combined {
                continue;
            }

            // Coincident centers have no separation direction; push along
            // the x axis.
            let normal = if distance < GEOM_EPSILON {
                Vec2::new(1.0, 0.0)
            } else {
                offset * (1.0 / distance)
            };
            let push = normal * ((combined - distance) * 0.5);

            if let Ok(transform) = world.get_component_mut::<Transform>(id_a) {
                transform.position += -push;
            }
            if let Ok(transform) = world.get_component_mut::<Transform>(id_b) {
                transform.position += push;
            }

            let both_vehicles =
                world.has_component::<Vehicle>(id_a) && world.has_component::<Vehicle>(id_b);
            if both_vehicles {
                let velocity_a = world
                    .get_component::<Transform>(id_a)
                    .map(|t| t.velocity)
                    .unwrap_or(Vec2::ZERO);
                let velocity_b = world
                    .get_component::<Transform>(id_b)
                    .map(|t| t.velocity)
                    .unwrap_or(Vec2::ZERO);
                if let Ok(transform) = world.get_component_mut::<Transform>(id_a) {
                    transform.velocity = velocity_b * COLLISION_DAMPING;
                }
                if let Ok(transform) = world.get_component_mut::<Transform>(id_b) {
                    transform.velocity = velocity_a * COLLISION_DAMPING;
                }
            }

            if let Ok(collision) = world.get_component_mut::<Collision>(id_a) {
                collision.colliding = true;
                collision.colliding_with.push(id_b);
            }
            if let Ok(collision) = world.get_component_mut::<Collision>(id_b) {
                collision.colliding = true;
                collision.colliding_with.push(id_a);
            }
        }
    }
}

/// Advance every signal component's running timer.
pub fn signal_system(world: &mut World, dt: f32) {
    for id in world.entities_with(ComponentMask::of::<Signal>()) {
        if let Ok(signal) = world.get_component_mut::<Signal>(id) {
            signal.timing.advance(dt);
        }
    }
}
