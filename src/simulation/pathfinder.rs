//! Route search over the road network
//!
//! A* over segment adjacency. Nodes are road segments; two segments are
//! neighbors when an intersection joins them. Cost is accumulated segment
//! length and the heuristic is straight-line distance between segment
//! midpoints, which never overestimates the remaining driving distance.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use super::road_network::RoadNetwork;
use super::types::{LaneId, PathStep, SegmentId, Vec2, DEFAULT_SEARCH_RADIUS};

/// Find a route between two world points, expressed as ordered
/// (segment, lane) steps. Endpoints snap to the nearest segment within
/// `DEFAULT_SEARCH_RADIUS`. Returns an empty vec when either endpoint has
/// no nearby segment or the segments are not connected.
pub fn find_route(network: &RoadNetwork, start: Vec2, end: Vec2) -> Vec<PathStep> {
    let Some(start_segment) = network.find_nearest_segment(start, DEFAULT_SEARCH_RADIUS) else {
        return Vec::new();
    };
    let Some(end_segment) = network.find_nearest_segment(end, DEFAULT_SEARCH_RADIUS) else {
        return Vec::new();
    };

    search(network, start_segment, end_segment)
        .into_iter()
        .map(|segment| PathStep::new(segment, LaneId(0)))
        .collect()
}

/// A* between two segments. The open set is keyed by (f-score, segment id)
/// so equal scores pop in ascending id order and results are stable across
/// runs.
fn search(network: &RoadNetwork, start: SegmentId, goal: SegmentId) -> Vec<SegmentId> {
    if start == goal {
        return vec![start];
    }

    let goal_midpoint = match network.segment(goal) {
        Some(segment) => segment.midpoint(),
        None => return Vec::new(),
    };
    let heuristic = |id: SegmentId| -> f32 {
        network
            .segment(id)
            .map(|segment| segment.midpoint().distance(&goal_midpoint))
            .unwrap_or(0.0)
    };

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<SegmentId, SegmentId> = HashMap::new();
    let mut g_score: HashMap<SegmentId, f32> = HashMap::new();

    g_score.insert(start, 0.0);
    open.push(Reverse((OrderedFloat(heuristic(start)), start)));

    while let Some(Reverse((_, current))) = open.pop() {
        if current == goal {
            return reconstruct(&came_from, current);
        }

        let current_g = g_score[&current];
        for neighbor in network.adjacent_segments(current) {
            let step_cost = network
                .segment(neighbor)
                .map(|segment| segment.length())
                .unwrap_or(f32::INFINITY);
            let tentative = current_g + step_cost;
            let known = g_score.get(&neighbor).copied().unwrap_or(f32::INFINITY);
            if tentative < known {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative);
                open.push(Reverse((
                    OrderedFloat(tentative + heuristic(neighbor)),
                    neighbor,
                )));
            }
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &HashMap<SegmentId, SegmentId>, goal: SegmentId) -> Vec<SegmentId> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}
