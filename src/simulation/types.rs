//! Core types for the traffic simulation
//!
//! Geometry primitives, id newtypes and the shared tuning constants.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D vector used for positions, velocities and directions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Returns the unit vector in this direction, or zero for degenerate input.
    pub fn normalized(&self) -> Vec2 {
        let len = self.length();
        if len < GEOM_EPSILON {
            return Vec2::ZERO;
        }
        Vec2::new(self.x / len, self.y / len)
    }

    pub fn dot(&self, other: &Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: &Vec2) -> f32 {
        (*other - *self).length()
    }

    pub fn lerp(&self, other: &Vec2, t: f32) -> Vec2 {
        Vec2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Left-hand perpendicular (rotate 90 degrees counter-clockwise).
    pub fn perpendicular(&self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, scalar: f32) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Vec2) {
        self.x += other.x;
        self.y += other.y;
    }
}

/// A unique identifier for entities in the simulation world.
/// Ids are recycled after destruction; liveness is decided by the world,
/// not by comparing raw ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// A wrapper type for road segment ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

/// A wrapper type for lane ids. Unique only within the owning segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub u32);

/// A wrapper type for intersection ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub u32);

/// One step of a routed path: a road segment and the lane to use on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub segment: SegmentId,
    pub lane: LaneId,
}

impl PathStep {
    pub fn new(segment: SegmentId, lane: LaneId) -> Self {
        Self { segment, lane }
    }
}

/// Threshold below which directions and distances are treated as degenerate.
pub const GEOM_EPSILON: f32 = 1e-4;

/// Collision radius attached to vehicles created through the facade.
pub const DEFAULT_COLLISION_RADIUS: f32 = 2.0;

/// Velocity magnitude below which rotation is left unchanged.
pub const ROTATION_DEADBAND: f32 = 0.1;

/// Velocity damping applied when a vehicle bounces off the world edge.
pub const BOUNCE_RESTITUTION: f32 = 0.5;

/// Velocity damping applied to both parties of a vehicle collision.
pub const COLLISION_DAMPING: f32 = 0.9;

/// Path-following look-ahead: `current_speed * FACTOR + BASE` units.
pub const LOOK_AHEAD_SPEED_FACTOR: f32 = 2.0;
pub const LOOK_AHEAD_BASE: f32 = 5.0;

/// Width of the default driving lane added to every new segment.
pub const DEFAULT_LANE_WIDTH: f32 = 3.5;

/// Radius used when snapping route endpoints to the nearest segment.
pub const DEFAULT_SEARCH_RADIUS: f32 = 50.0;
