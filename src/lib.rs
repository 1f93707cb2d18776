//! Traffic Flow Library
//!
//! A small real-time traffic simulation core: an entity-component world
//! for per-vehicle state, a road network with intersections and signal
//! timing, and the per-tick systems that move vehicles along routed paths.

pub mod simulation;
