//! Road network and routing validation tests

use traffic_flow::simulation::{
    ConnectionPoint, LaneId, LaneKind, PathStep, RoadNetwork, SegmentEnd, SegmentId,
    SignalPhase, TrafficSignal, Vec2, VehicleKind,
};

fn horizontal_segment(network: &mut RoadNetwork, x0: f32, x1: f32, y: f32) -> SegmentId {
    let direction = Vec2::new(if x1 >= x0 { 1.0 } else { -1.0 }, 0.0);
    network.create_segment(
        ConnectionPoint::new(Vec2::new(x0, y), direction),
        ConnectionPoint::new(Vec2::new(x1, y), direction),
    )
}

#[test]
fn test_segment_has_default_driving_lane_and_length() {
    let mut network = RoadNetwork::new();
    let id = horizontal_segment(&mut network, 0.0, 100.0, 0.0);

    let segment = network.segment(id).expect("segment");
    assert!((segment.length() - 100.0).abs() < 1e-4);
    assert_eq!(segment.lane_count(), 1);
    assert_eq!(segment.lane(LaneId(0)).expect("lane").kind(), LaneKind::Driving);
    assert_eq!(segment.start().position, Vec2::new(0.0, 0.0));
    assert_eq!(segment.end().position, Vec2::new(100.0, 0.0));
}

#[test]
fn test_connection_points_normalize_direction() {
    let point = ConnectionPoint::new(Vec2::ZERO, Vec2::new(2.0, 0.0));
    assert_eq!(point.direction, Vec2::new(1.0, 0.0));
}

#[test]
fn test_segment_width_sums_lane_widths() {
    let mut network = RoadNetwork::new();
    let id = horizontal_segment(&mut network, 0.0, 100.0, 0.0);
    network.add_lane(id, 2.0, LaneKind::Sidewalk).expect("lane");

    let segment = network.segment(id).expect("segment");
    assert!((segment.width() - 5.5).abs() < 1e-4);
}

#[test]
fn test_point_and_direction_queries_clamp() {
    let mut network = RoadNetwork::new();
    let id = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let segment = network.segment(id).expect("segment");

    assert_eq!(segment.point_at_distance(5.0), Vec2::new(5.0, 0.0));
    assert_eq!(segment.point_at_distance(-3.0), Vec2::new(0.0, 0.0));
    assert_eq!(segment.point_at_distance(25.0), Vec2::new(10.0, 0.0));
    assert_eq!(segment.direction_at_distance(5.0), Vec2::new(1.0, 0.0));
}

#[test]
fn test_lane_offsets_alternate_sides() {
    let mut network = RoadNetwork::new();
    let id = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    network
        .add_lane(id, 3.5, LaneKind::Driving)
        .expect("add lane");
    let segment = network.segment(id).expect("segment");

    // Direction +x, so the left normal points +y. Lane 0 offsets to +y,
    // lane 1 to -y.
    let lane0 = segment.lane_position_at_distance(LaneId(0), 5.0);
    let lane1 = segment.lane_position_at_distance(LaneId(1), 5.0);
    assert!((lane0.y - 1.75).abs() < 1e-4);
    assert!((lane1.y + 5.25).abs() < 1e-4);

    // Unknown lanes fall back to the center line.
    let fallback = segment.lane_position_at_distance(LaneId(9), 5.0);
    assert_eq!(fallback, Vec2::new(5.0, 0.0));
}

#[test]
fn test_only_driving_lanes_admit_vehicles() {
    let mut network = RoadNetwork::new();
    let id = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let sidewalk = network
        .add_lane(id, 2.0, LaneKind::Sidewalk)
        .expect("add lane");
    let segment = network.segment(id).expect("segment");

    let car = VehicleKind::Car;
    assert!(segment.lane(LaneId(0)).expect("lane").can_be_used_by(car));
    assert!(!segment.lane(sidewalk).expect("lane").can_be_used_by(car));
}

#[test]
fn test_lane_boundaries_are_cached_offsets() {
    let mut network = RoadNetwork::new();
    let id = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let segment = network.segment(id).expect("segment");
    let lane = segment.lane(LaneId(0)).expect("lane");

    assert_eq!(lane.center_line(), &[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]);
    let left = lane.left_boundary();
    let right = lane.right_boundary();
    assert_eq!(left.len(), 2);
    assert!((left[0].y - lane.width() * 0.5).abs() < 1e-4);
    assert!((right[0].y + lane.width() * 0.5).abs() < 1e-4);
}

#[test]
fn test_signal_phases_follow_the_cycle() {
    let mut signal = TrafficSignal::new(10.0, 2.0, 8.0);
    assert_eq!(signal.phase(), SignalPhase::Green);

    signal.advance(11.0);
    assert_eq!(signal.phase(), SignalPhase::Yellow);
    assert!((signal.time_until_change() - 1.0).abs() < 1e-4);

    signal.advance(2.0);
    assert_eq!(signal.phase(), SignalPhase::Red);

    // Timer reaches 20, a full cycle, and wraps back to green.
    signal.advance(7.0);
    assert_eq!(signal.phase(), SignalPhase::Green);
}

#[test]
fn test_signal_overshoot_carries_into_the_next_cycle() {
    let mut signal = TrafficSignal::new(10.0, 2.0, 8.0);
    // 23 mod 20 = 3 seconds into green.
    signal.advance(23.0);
    assert_eq!(signal.phase(), SignalPhase::Green);
    assert!((signal.time_until_change() - 7.0).abs() < 1e-4);
}

#[test]
fn test_connect_builds_all_lane_pairs_both_ways() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let b = horizontal_segment(&mut network, 10.0, 20.0, 0.0);
    network.add_lane(a, 3.5, LaneKind::Driving).expect("lane");

    let id = network
        .connect_with_intersection(a, SegmentEnd::End, b, SegmentEnd::Start)
        .expect("connect");

    let intersection = network.intersection(id).expect("intersection");
    assert_eq!(intersection.position(), Vec2::new(10.0, 0.0));
    assert_eq!(intersection.connected_segments(), &[a, b]);
    // 2 lanes x 1 lane, both directions.
    assert_eq!(intersection.connection_count(), 4);

    let links = intersection
        .connections_from(a, LaneId(1))
        .expect("links from lane 1");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].segment, b);
    assert_eq!(links[0].lane, LaneId(0));

    // Back references land on the connected ends.
    assert_eq!(network.segment(a).unwrap().end_intersection(), Some(id));
    assert_eq!(network.segment(b).unwrap().start_intersection(), Some(id));
}

#[test]
fn test_connect_unknown_segment_fails() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let missing = SegmentId(99);

    assert!(network
        .connect_with_intersection(a, SegmentEnd::End, missing, SegmentEnd::Start)
        .is_err());
    // The failed call must not leave a half-built intersection behind.
    assert_eq!(network.intersection_count(), 0);
}

#[test]
fn test_adjacency_is_symmetric_and_deduplicated() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let b = horizontal_segment(&mut network, 10.0, 20.0, 0.0);
    let c = horizontal_segment(&mut network, 20.0, 30.0, 0.0);

    network
        .connect_with_intersection(a, SegmentEnd::End, b, SegmentEnd::Start)
        .expect("connect");
    network
        .connect_with_intersection(b, SegmentEnd::End, c, SegmentEnd::Start)
        .expect("connect");
    // A second junction between the same pair must not duplicate adjacency.
    network
        .connect_with_intersection(a, SegmentEnd::End, b, SegmentEnd::Start)
        .expect("connect");

    assert_eq!(network.adjacent_segments(a), vec![b]);
    assert_eq!(network.adjacent_segments(b), vec![a, c]);
    assert_eq!(network.adjacent_segments(c), vec![b]);
}

#[test]
fn test_find_nearest_segment_respects_radius() {
    let mut network = RoadNetwork::new();
    let near = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let _far = horizontal_segment(&mut network, 0.0, 10.0, 500.0);

    assert_eq!(
        network.find_nearest_segment(Vec2::new(5.0, 3.0), 50.0),
        Some(near)
    );
    assert_eq!(network.find_nearest_segment(Vec2::new(5.0, 200.0), 50.0), None);
}

#[test]
fn test_find_nearest_segment_uses_closest_point_not_midpoint() {
    let mut network = RoadNetwork::new();
    // A long segment whose midpoint is far away but whose end is close.
    let long = horizontal_segment(&mut network, 0.0, 1000.0, 0.0);
    let short = horizontal_segment(&mut network, 400.0, 420.0, 100.0);

    // (1, 5) is 5 units from the long segment but ~410 from the short one.
    assert_eq!(
        network.find_nearest_segment(Vec2::new(1.0, 5.0), 50.0),
        Some(long)
    );
    assert_eq!(
        network.find_nearest_segment(Vec2::new(410.0, 95.0), 50.0),
        Some(short)
    );
}

#[test]
fn test_find_nearest_intersection() {
    let mut network = RoadNetwork::new();
    let a = network.create_intersection(Vec2::new(0.0, 0.0));
    let _b = network.create_intersection(Vec2::new(100.0, 0.0));

    assert_eq!(
        network.find_nearest_intersection(Vec2::new(10.0, 0.0), 50.0),
        Some(a)
    );
    assert_eq!(
        network.find_nearest_intersection(Vec2::new(500.0, 0.0), 50.0),
        None
    );
}

#[test]
fn test_find_path_across_two_segments() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let b = horizontal_segment(&mut network, 10.0, 20.0, 0.0);
    network
        .connect_with_intersection(a, SegmentEnd::End, b, SegmentEnd::Start)
        .expect("connect");

    let path = network.find_path(Vec2::new(1.0, 0.0), Vec2::new(19.0, 0.0));
    assert_eq!(
        path,
        vec![PathStep::new(a, LaneId(0)), PathStep::new(b, LaneId(0))]
    );
}

#[test]
fn test_find_path_same_segment_is_single_step() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);

    let path = network.find_path(Vec2::new(1.0, 0.0), Vec2::new(9.0, 0.0));
    assert_eq!(path, vec![PathStep::new(a, LaneId(0))]);
}

#[test]
fn test_find_path_between_disconnected_segments_is_empty() {
    let mut network = RoadNetwork::new();
    let _a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let _b = horizontal_segment(&mut network, 100.0, 110.0, 0.0);

    let path = network.find_path(Vec2::new(5.0, 0.0), Vec2::new(105.0, 0.0));
    assert!(path.is_empty());
}

#[test]
fn test_find_path_far_from_any_segment_is_empty() {
    let mut network = RoadNetwork::new();
    let _a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);

    let path = network.find_path(Vec2::new(5.0, 500.0), Vec2::new(5.0, 0.0));
    assert!(path.is_empty());
}

#[test]
fn test_find_path_equal_cost_routes_prefer_lower_segment_id() {
    let mut network = RoadNetwork::new();
    // A diamond: two equal-length middle segments between start and end.
    let start = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let upper = network.create_segment(
        ConnectionPoint::new(Vec2::new(10.0, 2.0), Vec2::new(1.0, 0.0)),
        ConnectionPoint::new(Vec2::new(20.0, 2.0), Vec2::new(1.0, 0.0)),
    );
    let lower = network.create_segment(
        ConnectionPoint::new(Vec2::new(10.0, -2.0), Vec2::new(1.0, 0.0)),
        ConnectionPoint::new(Vec2::new(20.0, -2.0), Vec2::new(1.0, 0.0)),
    );
    let end = horizontal_segment(&mut network, 20.0, 30.0, 0.0);

    network
        .connect_with_intersection(start, SegmentEnd::End, upper, SegmentEnd::Start)
        .expect("connect");
    network
        .connect_with_intersection(start, SegmentEnd::End, lower, SegmentEnd::Start)
        .expect("connect");
    network
        .connect_with_intersection(upper, SegmentEnd::End, end, SegmentEnd::Start)
        .expect("connect");
    network
        .connect_with_intersection(lower, SegmentEnd::End, end, SegmentEnd::Start)
        .expect("connect");

    let path = network.find_path(Vec2::new(5.0, 0.0), Vec2::new(25.0, 0.0));
    // Both middle segments cost the same; the tie resolves to the lower id.
    assert_eq!(
        path,
        vec![
            PathStep::new(start, LaneId(0)),
            PathStep::new(upper, LaneId(0)),
            PathStep::new(end, LaneId(0)),
        ]
    );
}

#[test]
fn test_intersection_signals_advance_with_network_update() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let b = horizontal_segment(&mut network, 10.0, 20.0, 0.0);
    let id = network
        .connect_with_intersection(a, SegmentEnd::End, b, SegmentEnd::Start)
        .expect("connect");

    network
        .intersection_mut(id)
        .expect("intersection")
        .configure_signal_timing(10.0, 2.0, 8.0);
    network.update(11.0);

    let intersection = network.intersection(id).expect("intersection");
    let links = intersection.connections_from(a, LaneId(0)).expect("links");
    assert_eq!(links[0].signal.phase(), SignalPhase::Yellow);
}

#[test]
fn test_clear_resets_ids_and_graph() {
    let mut network = RoadNetwork::new();
    let a = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    let b = horizontal_segment(&mut network, 10.0, 20.0, 0.0);
    network
        .connect_with_intersection(a, SegmentEnd::End, b, SegmentEnd::Start)
        .expect("connect");

    network.clear();
    assert_eq!(network.segment_count(), 0);
    assert_eq!(network.intersection_count(), 0);

    // Id allocation starts over.
    let fresh = horizontal_segment(&mut network, 0.0, 10.0, 0.0);
    assert_eq!(fresh, a);
    assert!(network.adjacent_segments(fresh).is_empty());
}
