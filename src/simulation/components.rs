//! Component records and the fixed component-kind registry
//!
//! Component kinds are a closed, explicitly numbered enum rather than a
//! lazily assigned global counter, so pool indices and masks never depend
//! on first-use order.

use crate::simulation::road_network::TrafficSignal;
use crate::simulation::types::{EntityId, PathStep, Vec2};

/// Upper bound on concurrently registered component kinds.
pub const MAX_COMPONENT_KINDS: usize = 32;

/// Every component kind known to the simulation, with a fixed pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ComponentKind {
    Transform = 0,
    Vehicle = 1,
    PathFollowing = 2,
    Bounds = 3,
    Collision = 4,
    Renderable = 5,
    Selectable = 6,
    Signal = 7,
}

impl ComponentKind {
    pub const COUNT: usize = 8;

    pub fn index(self) -> usize {
        self as usize
    }
}

const _: () = assert!(ComponentKind::COUNT <= MAX_COMPONENT_KINDS);

/// A plain data record attachable to at most one entity per kind.
pub trait Component: 'static {
    const KIND: ComponentKind;
    /// Static type name, for diagnostics.
    const NAME: &'static str;
}

/// Bitset recording which component kinds an entity currently has.
/// This mask is the single source of truth for membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentMask(u32);

impl ComponentMask {
    pub const EMPTY: ComponentMask = ComponentMask(0);

    pub fn of<T: Component>() -> Self {
        ComponentMask(1 << T::KIND.index())
    }

    pub fn with(self, kind: ComponentKind) -> Self {
        ComponentMask(self.0 | (1 << kind.index()))
    }

    pub fn without(self, kind: ComponentKind) -> Self {
        ComponentMask(self.0 & !(1 << kind.index()))
    }

    pub fn contains(self, kind: ComponentKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    /// True when this mask holds every kind in `required`.
    pub fn contains_all(self, required: ComponentMask) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ComponentMask {
    type Output = ComponentMask;

    fn bitor(self, other: ComponentMask) -> ComponentMask {
        ComponentMask(self.0 | other.0)
    }
}

/// Position, velocity and heading of a simulated agent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Heading in radians, derived from velocity while moving.
    pub rotation: f32,
}

impl Transform {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            rotation: 0.0,
        }
    }
}

impl Component for Transform {
    const KIND: ComponentKind = ComponentKind::Transform;
    const NAME: &'static str = "Transform";
}

/// Class of vehicle, used for lane admission and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleKind {
    #[default]
    Car,
    Truck,
    Bus,
    Motorcycle,
}

/// Vehicle-specific driving properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vehicle {
    /// Maximum speed in units/second.
    pub max_speed: f32,
    /// Current speed in units/second.
    pub current_speed: f32,
    /// Speed the vehicle is trying to reach.
    pub target_speed: f32,
    /// Acceleration rate in units/second^2.
    pub acceleration: f32,
    /// Braking rate in units/second^2.
    pub braking: f32,
    /// Physical length in units.
    pub length: f32,
    /// Physical width in units.
    pub width: f32,
    pub kind: VehicleKind,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self {
            max_speed: 100.0,
            current_speed: 0.0,
            target_speed: 0.0,
            acceleration: 20.0,
            braking: 40.0,
            length: 4.5,
            width: 2.0,
            kind: VehicleKind::Car,
        }
    }
}

impl Vehicle {
    /// Bounding circle radius for simple collision checks.
    pub fn bounding_radius(&self) -> f32 {
        self.length.max(self.width) * 0.5
    }
}

impl Component for Vehicle {
    const KIND: ComponentKind = ComponentKind::Vehicle;
    const NAME: &'static str = "Vehicle";
}

/// Routed path state for vehicles steering along the road network.
#[derive(Debug, Clone, Default)]
pub struct PathFollowing {
    /// Ordered (segment, lane) steps produced by route search.
    pub path: Vec<PathStep>,
    /// Index of the step currently being traversed.
    pub current_index: usize,
    /// Distance traveled along the current segment.
    pub distance_along_segment: f32,
}

impl PathFollowing {
    pub fn with_path(path: Vec<PathStep>) -> Self {
        Self {
            path,
            current_index: 0,
            distance_along_segment: 0.0,
        }
    }

    /// Replace the path and restart traversal from its first step.
    pub fn set_path(&mut self, path: Vec<PathStep>) {
        self.path = path;
        self.current_index = 0;
        self.distance_along_segment = 0.0;
    }

    pub fn reached_destination(&self) -> bool {
        self.path.is_empty() || self.current_index >= self.path.len()
    }
}

impl Component for PathFollowing {
    const KIND: ComponentKind = ComponentKind::PathFollowing;
    const NAME: &'static str = "PathFollowing";
}

/// World rectangle that vehicles may be clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
    pub keep_in_bounds: bool,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            keep_in_bounds: true,
        }
    }
}

impl Component for Bounds {
    const KIND: ComponentKind = ComponentKind::Bounds;
    const NAME: &'static str = "Bounds";
}

/// Bounding-circle collision state.
#[derive(Debug, Clone, Default)]
pub struct Collision {
    pub radius: f32,
    pub colliding: bool,
    /// Entities currently overlapping this one.
    pub colliding_with: Vec<EntityId>,
}

impl Collision {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            colliding: false,
            colliding_with: Vec::new(),
        }
    }
}

impl Component for Collision {
    const KIND: ComponentKind = ComponentKind::Collision;
    const NAME: &'static str = "Collision";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    Circle,
    #[default]
    Rectangle,
    Triangle,
}

/// Presentation-only draw state; never touched by simulation systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub shape: Shape,
    pub color: [f32; 4],
    pub scale: f32,
    pub visible: bool,
}

impl Default for Renderable {
    fn default() -> Self {
        Self {
            shape: Shape::Rectangle,
            color: [0.2, 0.6, 0.8, 1.0],
            scale: 1.0,
            visible: true,
        }
    }
}

impl Component for Renderable {
    const KIND: ComponentKind = ComponentKind::Renderable;
    const NAME: &'static str = "Renderable";
}

/// Presentation-only selection flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selectable {
    pub selected: bool,
}

impl Component for Selectable {
    const KIND: ComponentKind = ComponentKind::Selectable;
    const NAME: &'static str = "Selectable";
}

/// Signal display state attached to an entity, advanced every tick by
/// the signal system.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pub timing: TrafficSignal,
}

impl Signal {
    pub fn new(timing: TrafficSignal) -> Self {
        Self { timing }
    }
}

impl Component for Signal {
    const KIND: ComponentKind = ComponentKind::Signal;
    const NAME: &'static str = "Signal";
}
