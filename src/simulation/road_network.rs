//! Road network model
//!
//! Segments, lanes, intersections and signal timing, plus the segment
//! adjacency graph used for routing. Segments and intersections refer to
//! each other by id only; the network owns both sides and answers every
//! lookup, so no dangling references are possible.

use anyhow::{Context, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use std::cell::OnceCell;
use std::collections::HashMap;

use super::pathfinder;
use super::types::{
    IntersectionId, LaneId, PathStep, SegmentId, Vec2, DEFAULT_LANE_WIDTH, GEOM_EPSILON,
};

/// A segment endpoint: position plus normalized travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConnectionPoint {
    pub position: Vec2,
    pub direction: Vec2,
}

impl ConnectionPoint {
    pub fn new(position: Vec2, direction: Vec2) -> Self {
        Self {
            position,
            direction: direction.normalized(),
        }
    }
}

/// Functional type of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    Driving,
    Parking,
    Bicycle,
    Bus,
    Emergency,
    Sidewalk,
}

/// Left/right boundary polylines of a lane, offset from its center line.
#[derive(Debug, Clone, Default)]
pub struct LaneBoundaries {
    pub left: Vec<Vec2>,
    pub right: Vec<Vec2>,
}

/// A single lane within a road segment. The lane id is its index within
/// the segment, stable because lanes are only ever appended.
#[derive(Debug)]
pub struct Lane {
    id: LaneId,
    width: f32,
    kind: LaneKind,
    center_line: Vec<Vec2>,
    boundaries: OnceCell<LaneBoundaries>,
}

impl Lane {
    fn new(id: LaneId, width: f32, kind: LaneKind, center_line: Vec<Vec2>) -> Self {
        Self {
            id,
            width,
            kind,
            center_line,
            boundaries: OnceCell::new(),
        }
    }

    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn kind(&self) -> LaneKind {
        self.kind
    }

    pub fn center_line(&self) -> &[Vec2] {
        &self.center_line
    }

    /// Whether a vehicle class may travel in this lane. Only driving lanes
    /// admit simulated vehicles for now.
    pub fn can_be_used_by(&self, _kind: super::components::VehicleKind) -> bool {
        self.kind == LaneKind::Driving
    }

    pub fn left_boundary(&self) -> &[Vec2] {
        &self.boundaries().left
    }

    pub fn right_boundary(&self) -> &[Vec2] {
        &self.boundaries().right
    }

    fn boundaries(&self) -> &LaneBoundaries {
        self.boundaries
            .get_or_init(|| offset_polyline(&self.center_line, self.width * 0.5))
    }
}

/// Offset a polyline by `half_width` on each side. Interior points use the
/// averaged direction of the two adjacent edges so the offset stays
/// continuous across vertices.
fn offset_polyline(points: &[Vec2], half_width: f32) -> LaneBoundaries {
    let mut boundaries = LaneBoundaries::default();
    if points.len() < 2 {
        return boundaries;
    }

    for i in 0..points.len() {
        let direction = if i == 0 {
            (points[1] - points[0]).normalized()
        } else if i == points.len() - 1 {
            (points[i] - points[i - 1]).normalized()
        } else {
            let incoming = (points[i] - points[i - 1]).normalized();
            let outgoing = (points[i + 1] - points[i]).normalized();
            (incoming + outgoing).normalized()
        };
        let normal = direction.perpendicular();
        boundaries.left.push(points[i] + normal * half_width);
        boundaries.right.push(points[i] + normal * -half_width);
    }

    boundaries
}

/// A stretch of road between two endpoints. The center line is currently
/// a straight line; the distance queries keep working unchanged if it
/// ever grows more vertices.
#[derive(Debug)]
pub struct RoadSegment {
    id: SegmentId,
    start: ConnectionPoint,
    end: ConnectionPoint,
    length: f32,
    lanes: Vec<Lane>,
    start_intersection: Option<IntersectionId>,
    end_intersection: Option<IntersectionId>,
}

/// Which end of a segment an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    Start,
    End,
}

impl RoadSegment {
    fn new(id: SegmentId, start: ConnectionPoint, end: ConnectionPoint) -> Self {
        let length = start.position.distance(&end.position);
        Self {
            id,
            start,
            end,
            length,
            lanes: Vec::new(),
            start_intersection: None,
            end_intersection: None,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn start(&self) -> &ConnectionPoint {
        &self.start
    }

    pub fn end(&self) -> &ConnectionPoint {
        &self.end
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// Total width across all lanes.
    pub fn width(&self) -> f32 {
        self.lanes.iter().map(Lane::width).sum()
    }

    pub fn midpoint(&self) -> Vec2 {
        (self.start.position + self.end.position) * 0.5
    }

    /// Append a lane; the returned id is the lane's index in this segment.
    pub fn add_lane(&mut self, width: f32, kind: LaneKind) -> LaneId {
        let id = LaneId(self.lanes.len() as u32);
        let center_line = vec![self.start.position, self.end.position];
        self.lanes.push(Lane::new(id, width, kind, center_line));
        id
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id.0 as usize)
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn start_intersection(&self) -> Option<IntersectionId> {
        self.start_intersection
    }

    pub fn end_intersection(&self) -> Option<IntersectionId> {
        self.end_intersection
    }

    /// Point along the segment at a distance from its start, clamped to
    /// `[0, length]`.
    pub fn point_at_distance(&self, distance: f32) -> Vec2 {
        if self.length < GEOM_EPSILON {
            return self.start.position;
        }
        let t = (distance.clamp(0.0, self.length)) / self.length;
        self.start.position.lerp(&self.end.position, t)
    }

    /// Travel direction at a distance. Constant for a straight segment.
    pub fn direction_at_distance(&self, _distance: f32) -> Vec2 {
        (self.end.position - self.start.position).normalized()
    }

    /// Center of a lane at a distance along the segment. Even lane indices
    /// offset toward the left normal of the travel direction, odd ones
    /// toward the right, so lanes fan out on alternating sides.
    pub fn lane_position_at_distance(&self, lane: LaneId, distance: f32) -> Vec2 {
        let Some(lane) = self.lane(lane) else {
            return self.point_at_distance(distance);
        };
        let point = self.point_at_distance(distance);
        let normal = self.direction_at_distance(distance).perpendicular();
        let index = lane.id().0;
        let width = lane.width();
        let offset = if index % 2 == 0 {
            (index / 2) as f32 * width + width * 0.5
        } else {
            -(((index + 1) / 2) as f32 * width + width * 0.5)
        };
        point + normal * offset
    }
}

/// Signal phase, one of the three lights of a fixed-timing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPhase {
    Green,
    Yellow,
    Red,
}

/// A cyclic fixed-timing traffic signal. The phase is derived from the
/// running timer modulo the cycle, so timer overshoot carries over into
/// the next phase instead of snapping to the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficSignal {
    green: f32,
    yellow: f32,
    red: f32,
    cycle: f32,
    timer: f32,
}

impl Default for TrafficSignal {
    fn default() -> Self {
        Self::new(30.0, 5.0, 30.0)
    }
}

impl TrafficSignal {
    pub fn new(green: f32, yellow: f32, red: f32) -> Self {
        let mut signal = Self {
            green: 0.0,
            yellow: 0.0,
            red: 0.0,
            cycle: 0.0,
            timer: 0.0,
        };
        signal.configure(green, yellow, red);
        signal
    }

    /// Replace the phase durations, keeping the running timer.
    pub fn configure(&mut self, green: f32, yellow: f32, red: f32) {
        self.green = green.max(0.0);
        self.yellow = yellow.max(0.0);
        self.red = red.max(0.0);
        self.cycle = self.green + self.yellow + self.red;
    }

    /// Advance the running timer, wrapping at the cycle length.
    pub fn advance(&mut self, dt: f32) {
        if self.cycle < GEOM_EPSILON {
            return;
        }
        self.timer += dt;
        while self.timer >= self.cycle {
            self.timer -= self.cycle;
        }
    }

    pub fn phase(&self) -> SignalPhase {
        if self.timer < self.green {
            SignalPhase::Green
        } else if self.timer < self.green + self.yellow {
            SignalPhase::Yellow
        } else {
            SignalPhase::Red
        }
    }

    /// Seconds until the next phase transition.
    pub fn time_until_change(&self) -> f32 {
        match self.phase() {
            SignalPhase::Green => self.green - self.timer,
            SignalPhase::Yellow => self.green + self.yellow - self.timer,
            SignalPhase::Red => self.cycle - self.timer,
        }
    }
}

/// One permitted movement out of an intersection, guarded by its own
/// independently timed signal.
#[derive(Debug, Clone)]
pub struct LaneLink {
    pub segment: SegmentId,
    pub lane: LaneId,
    pub signal: TrafficSignal,
}

impl LaneLink {
    fn new(segment: SegmentId, lane: LaneId) -> Self {
        Self {
            segment,
            lane,
            signal: TrafficSignal::default(),
        }
    }
}

/// A junction linking the ends of multiple road segments. Holds the
/// connection table from each incoming (segment, lane) to its allowed
/// outgoing (segment, lane) destinations.
#[derive(Debug)]
pub struct Intersection {
    id: IntersectionId,
    position: Vec2,
    /// Connected segment ids, ascending, deduplicated.
    segments: Vec<SegmentId>,
    connections: HashMap<(SegmentId, LaneId), Vec<LaneLink>>,
}

impl Intersection {
    fn new(id: IntersectionId, position: Vec2) -> Self {
        Self {
            id,
            position,
            segments: Vec::new(),
            connections: HashMap::new(),
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn connected_segments(&self) -> &[SegmentId] {
        &self.segments
    }

    fn attach_segment(&mut self, segment: SegmentId) {
        if let Err(index) = self.segments.binary_search(&segment) {
            self.segments.insert(index, segment);
        }
    }

    /// Allow travel from an incoming lane to an outgoing lane, guarded by
    /// a fresh signal.
    pub fn define_connection(
        &mut self,
        in_segment: SegmentId,
        in_lane: LaneId,
        out_segment: SegmentId,
        out_lane: LaneId,
    ) {
        self.connections
            .entry((in_segment, in_lane))
            .or_default()
            .push(LaneLink::new(out_segment, out_lane));
    }

    /// Destinations reachable from an incoming (segment, lane), if any.
    pub fn connections_from(&self, segment: SegmentId, lane: LaneId) -> Option<&[LaneLink]> {
        self.connections
            .get(&(segment, lane))
            .map(Vec::as_slice)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.values().map(Vec::len).sum()
    }

    pub fn update_signals(&mut self, dt: f32) {
        for links in self.connections.values_mut() {
            for link in links {
                link.signal.advance(dt);
            }
        }
    }

    /// Apply one timing to every signal at this intersection.
    pub fn configure_signal_timing(&mut self, green: f32, yellow: f32, red: f32) {
        for links in self.connections.values_mut() {
            for link in links {
                link.signal.configure(green, yellow, red);
            }
        }
    }
}

/// The road network: exclusive owner of all segments and intersections,
/// keyed by id, plus the segment adjacency graph used for routing. Two
/// segments are adjacent when some intersection connects them; the graph
/// gains one edge per `connect_with_intersection` call and is only ever
/// reset by `clear`.
#[derive(Default)]
pub struct RoadNetwork {
    segments: HashMap<SegmentId, RoadSegment>,
    intersections: HashMap<IntersectionId, Intersection>,
    graph: UnGraph<SegmentId, IntersectionId>,
    segment_nodes: HashMap<SegmentId, NodeIndex>,
    node_segments: HashMap<NodeIndex, SegmentId>,
    next_segment_id: u32,
    next_intersection_id: u32,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a segment between two endpoints, with one default driving
    /// lane.
    pub fn create_segment(&mut self, start: ConnectionPoint, end: ConnectionPoint) -> SegmentId {
        let id = SegmentId(self.next_segment_id);
        self.next_segment_id += 1;

        let mut segment = RoadSegment::new(id, start, end);
        segment.add_lane(DEFAULT_LANE_WIDTH, LaneKind::Driving);
        self.segments.insert(id, segment);

        let node = self.graph.add_node(id);
        self.segment_nodes.insert(id, node);
        self.node_segments.insert(node, id);

        id
    }

    /// Append a lane to a segment. Fails when the segment is unknown.
    pub fn add_lane(&mut self, segment: SegmentId, width: f32, kind: LaneKind) -> Result<LaneId> {
        let segment = self
            .segments
            .get_mut(&segment)
            .with_context(|| format!("segment {:?} not found", segment))?;
        Ok(segment.add_lane(width, kind))
    }

    /// Create a free-standing intersection with an empty connection table.
    pub fn create_intersection(&mut self, position: Vec2) -> IntersectionId {
        let id = IntersectionId(self.next_intersection_id);
        self.next_intersection_id += 1;
        self.intersections.insert(id, Intersection::new(id, position));
        id
    }

    /// Join two segment ends with a new intersection at their midpoint.
    /// Every lane of one segment is connected to every lane of the other,
    /// in both directions, each movement with its own signal. This is a
    /// convenience default, not a traffic-rule engine.
    pub fn connect_with_intersection(
        &mut self,
        segment_a: SegmentId,
        end_a: SegmentEnd,
        segment_b: SegmentId,
        end_b: SegmentEnd,
    ) -> Result<IntersectionId> {
        let (point_a, lanes_a) = {
            let segment = self
                .segments
                .get(&segment_a)
                .with_context(|| format!("segment {:?} not found", segment_a))?;
            let point = match end_a {
                SegmentEnd::Start => segment.start.position,
                SegmentEnd::End => segment.end.position,
            };
            (point, segment.lane_count() as u32)
        };
        let (point_b, lanes_b) = {
            let segment = self
                .segments
                .get(&segment_b)
                .with_context(|| format!("segment {:?} not found", segment_b))?;
            let point = match end_b {
                SegmentEnd::Start => segment.start.position,
                SegmentEnd::End => segment.end.position,
            };
            (point, segment.lane_count() as u32)
        };

        let midpoint = (point_a + point_b) * 0.5;
        let id = self.create_intersection(midpoint);

        self.link_segment_end(segment_a, end_a, id);
        self.link_segment_end(segment_b, end_b, id);

        let intersection = self
            .intersections
            .get_mut(&id)
            .context("intersection just created")?;
        intersection.attach_segment(segment_a);
        intersection.attach_segment(segment_b);
        for lane_a in 0..lanes_a {
            for lane_b in 0..lanes_b {
                intersection.define_connection(
                    segment_a,
                    LaneId(lane_a),
                    segment_b,
                    LaneId(lane_b),
                );
                intersection.define_connection(
                    segment_b,
                    LaneId(lane_b),
                    segment_a,
                    LaneId(lane_a),
                );
            }
        }

        let node_a = self.segment_nodes[&segment_a];
        let node_b = self.segment_nodes[&segment_b];
        self.graph.add_edge(node_a, node_b, id);

        Ok(id)
    }

    fn link_segment_end(&mut self, segment: SegmentId, end: SegmentEnd, id: IntersectionId) {
        if let Some(segment) = self.segments.get_mut(&segment) {
            match end {
                SegmentEnd::Start => segment.start_intersection = Some(id),
                SegmentEnd::End => segment.end_intersection = Some(id),
            }
        }
    }

    pub fn segment(&self, id: SegmentId) -> Option<&RoadSegment> {
        self.segments.get(&id)
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(&id)
    }

    pub fn intersection_mut(&mut self, id: IntersectionId) -> Option<&mut Intersection> {
        self.intersections.get_mut(&id)
    }

    pub fn segments(&self) -> impl Iterator<Item = &RoadSegment> {
        self.segments.values()
    }

    pub fn intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.intersections.values()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.len()
    }

    /// Segments sharing an intersection with `id`, ascending, deduplicated.
    pub fn adjacent_segments(&self, id: SegmentId) -> Vec<SegmentId> {
        let Some(&node) = self.segment_nodes.get(&id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<SegmentId> = self
            .graph
            .neighbors(node)
            .filter_map(|neighbor| self.node_segments.get(&neighbor).copied())
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// The segment whose closest point (on the finite segment, not the
    /// infinite line) lies nearest to `point`, if one is within
    /// `max_distance`. Ties resolve toward the lower segment id.
    pub fn find_nearest_segment(&self, point: Vec2, max_distance: f32) -> Option<SegmentId> {
        let mut nearest: Option<(f32, SegmentId)> = None;
        for (&id, segment) in &self.segments {
            let closest = closest_point_on_segment(
                point,
                segment.start.position,
                segment.end.position,
            );
            let distance = point.distance(&closest);
            if distance > max_distance {
                continue;
            }
            let better = match nearest {
                None => true,
                Some((best, best_id)) => {
                    distance < best || (distance == best && id < best_id)
                }
            };
            if better {
                nearest = Some((distance, id));
            }
        }
        nearest.map(|(_, id)| id)
    }

    /// The intersection nearest to `point` within `max_distance`. Ties
    /// resolve toward the lower intersection id.
    pub fn find_nearest_intersection(
        &self,
        point: Vec2,
        max_distance: f32,
    ) -> Option<IntersectionId> {
        let mut nearest: Option<(f32, IntersectionId)> = None;
        for (&id, intersection) in &self.intersections {
            let distance = point.distance(&intersection.position);
            if distance > max_distance {
                continue;
            }
            let better = match nearest {
                None => true,
                Some((best, best_id)) => {
                    distance < best || (distance == best && id < best_id)
                }
            };
            if better {
                nearest = Some((distance, id));
            }
        }
        nearest.map(|(_, id)| id)
    }

    /// Route between two world points. Empty result means no route.
    pub fn find_path(&self, start: Vec2, end: Vec2) -> Vec<PathStep> {
        pathfinder::find_route(self, start, end)
    }

    /// Advance every signal at every intersection.
    pub fn update(&mut self, dt: f32) {
        for intersection in self.intersections.values_mut() {
            intersection.update_signals(dt);
        }
    }

    /// Drop all segments and intersections and reset id counters.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.intersections.clear();
        self.graph = UnGraph::default();
        self.segment_nodes.clear();
        self.node_segments.clear();
        self.next_segment_id = 0;
        self.next_intersection_id = 0;
    }
}

/// Closest point to `point` on the finite segment `start`..`end`.
fn closest_point_on_segment(point: Vec2, start: Vec2, end: Vec2) -> Vec2 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared < GEOM_EPSILON * GEOM_EPSILON {
        return start;
    }
    let t = ((point - start).dot(&segment) / length_squared).clamp(0.0, 1.0);
    start + segment * t
}
