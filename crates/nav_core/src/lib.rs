//! # Nav Core
//!
//! Deterministic unit navigation for EvaFrontier.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No floating-point motion math (uses fixed-point)
//!
//! This separation enables:
//! - Headless scenario runs
//! - Snapshot/restore of agent state
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`pathfinding`] - Generic A* search, grid route planning
//! - [`waypoints`] - Waypoint queue and move orders
//! - [`terrain`] - Terrain queries and the tile collision map
//! - [`steering`] - Speed and heading model
//! - [`direction`] - Compass octants
//! - [`movement`] - Collision probe and turn penalty
//! - [`agent`] - Movable agents and their per-tick update
//! - [`world`] - Agent container and tick loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod agent;
pub mod animation;
pub mod cargo;
pub mod data;
pub mod direction;
pub mod error;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod steering;
pub mod terrain;
pub mod unit_kind;
pub mod waypoints;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::Agent;
    pub use crate::cargo::{CargoHold, Resource, ResourceStore, AMOUNT_PER_CARGO};
    pub use crate::data::{ArrivalBehavior, UnitKindData};
    pub use crate::direction::{quantize_direction, Octant};
    pub use crate::error::{NavError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::MoveOutcome;
    pub use crate::pathfinding::{find_path, plan_route, HasNeighbours, NavGrid, Path};
    pub use crate::steering::{FacingModel, SteeringConfig, SteeringMode};
    pub use crate::terrain::{CollisionMap, OpenTerrain, TerrainQuery};
    pub use crate::unit_kind::UnitKindRegistry;
    pub use crate::waypoints::{OrderMode, WaypointQueue};
    pub use crate::world::{AgentId, NavWorld, TickEvents};
}
