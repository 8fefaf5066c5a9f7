//! Headless navigation scenarios.
//!
//! A scenario is a RON file describing an ASCII terrain map, a set of
//! agents with their orders, and how long to run. [`run_scenario`] builds a
//! [`NavWorld`] from it, ticks it and reports where everyone ended up.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "ford",
//!     map: ["....~~....", ".........."],
//!     legend: { '~': "Water" },
//!     ticks: 200,
//!     agents: [
//!         AgentPlacement(kind: "truck", position: (16, 16), waypoints: [(300, 16)], route: true),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use nav_core::data::UnitKindData;
use nav_core::direction::Octant;
use nav_core::error::NavError;
use nav_core::math::{fixed_decimal_serde, Fixed, Vec2Fixed};
use nav_core::pathfinding::plan_waypoints;
use nav_core::steering::SteeringConfig;
use nav_core::terrain::CollisionMap;
use nav_core::unit_kind::UnitKindRegistry;
use nav_core::waypoints::OrderMode;
use nav_core::world::{AgentId, NavWorld};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Failed to read the scenario file.
    #[error("Failed to read scenario '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the scenario RON.
    #[error("Failed to parse scenario '{path}': {source}")]
    ParseError {
        /// Path or label of the scenario.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The scenario describes something impossible.
    #[error("Invalid scenario '{name}': {message}")]
    Invalid {
        /// Scenario name.
        name: String,
        /// What is wrong.
        message: String,
    },

    /// Navigation core rejected part of the setup.
    #[error(transparent)]
    Nav(#[from] NavError),
}

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// One agent in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPlacement {
    /// Unit kind id.
    pub kind: String,
    /// Spawn position in pixels.
    pub position: (i32, i32),
    /// Home position for kinds that return after arriving.
    #[serde(default)]
    pub home: Option<(i32, i32)>,
    /// Points to visit in order.
    #[serde(default)]
    pub waypoints: Vec<(i32, i32)>,
    /// Plan a grid route between waypoints instead of driving straight.
    #[serde(default)]
    pub route: bool,
    /// Engine level to select at spawn. Also sets the initial speed.
    #[serde(default)]
    pub engine_level: Option<usize>,
}

/// A headless navigation scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name used in logs.
    pub name: String,
    /// ASCII terrain rows. `.` and space are open ground.
    pub map: Vec<String>,
    /// Terrain class for each map symbol.
    #[serde(default)]
    pub legend: BTreeMap<char, String>,
    /// Tile edge length in pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Seconds per tick.
    #[serde(with = "fixed_decimal_serde", default = "default_tick_length")]
    pub tick_length: Fixed,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Steering settings shared by every agent.
    #[serde(default)]
    pub steering: SteeringConfig,
    /// Extra unit kinds on top of the builtin roster.
    #[serde(default)]
    pub unit_kinds: Vec<UnitKindData>,
    /// Agents to spawn, in id order.
    pub agents: Vec<AgentPlacement>,
}

const fn default_tile_size() -> u32 {
    32
}

fn default_tick_length() -> Fixed {
    Fixed::ONE / Fixed::from_num(nav_core::world::TICK_RATE)
}

fn point((x, y): (i32, i32)) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

impl Scenario {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::ParseError` if the RON is malformed.
    pub fn from_ron_str(label: &str, source: &str) -> ScenarioResult<Self> {
        ron::from_str(source).map_err(|e| ScenarioError::ParseError {
            path: label.to_string(),
            source: e,
        })
    }

    /// Read and parse a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> ScenarioResult<Self> {
        let path_str = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| ScenarioError::IoError {
            path: path_str.clone(),
            source: e,
        })?;
        Self::from_ron_str(&path_str, &contents)
    }

    fn invalid(&self, message: impl Into<String>) -> ScenarioError {
        ScenarioError::Invalid {
            name: self.name.clone(),
            message: message.into(),
        }
    }

    /// Build the world described by the scenario, with every order issued.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed map, unknown unit kinds, bad engine
    /// levels or unroutable waypoints.
    pub fn build_world(&self) -> ScenarioResult<NavWorld<CollisionMap>> {
        if self.tick_length <= Fixed::ZERO {
            return Err(self.invalid(format!("tick_length must be positive ({})", self.tick_length)));
        }

        let map = CollisionMap::from_ascii(&self.map, self.tile_size, &self.legend)?;

        let mut registry = UnitKindRegistry::builtin();
        for kind in &self.unit_kinds {
            registry.insert(kind.clone())?;
        }

        let mut world = NavWorld::with_registry(map, self.steering, registry);

        for placement in &self.agents {
            let id = world.spawn(&placement.kind, point(placement.position), placement.home.map(point))?;
            if let Some(level) = placement.engine_level {
                world.agent_mut(id)?.set_engine_level(level)?;
            }
            self.issue_orders(&mut world, id, placement)?;
        }

        tracing::info!(
            scenario = %self.name,
            agents = world.agents().len(),
            "Scenario world built"
        );
        Ok(world)
    }

    fn issue_orders(
        &self,
        world: &mut NavWorld<CollisionMap>,
        id: AgentId,
        placement: &AgentPlacement,
    ) -> ScenarioResult<()> {
        if !placement.route {
            for waypoint in &placement.waypoints {
                world.order_move(id, point(*waypoint), OrderMode::Append)?;
            }
            return Ok(());
        }

        let grid = world.terrain().nav_grid(world.agent(id)?.blocking_terrain());
        let mut from = point(placement.position);
        let mut legs = Vec::new();
        for waypoint in &placement.waypoints {
            let goal = point(*waypoint);
            let leg = plan_waypoints(&grid, from, goal).map_err(|e| {
                self.invalid(format!("{} has no route to {waypoint:?}: {e}", placement.kind))
            })?;
            legs.extend(leg);
            from = goal;
        }
        tracing::debug!(id, kind = %placement.kind, waypoints = legs.len(), "Routed agent");
        world.agent_mut(id)?.follow_route(&legs, OrderMode::Append);
        Ok(())
    }
}

/// Final state of one agent after a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Agent id.
    pub id: AgentId,
    /// Unit kind id.
    pub kind: String,
    /// Final position, for display.
    pub position: (f64, f64),
    /// Final facing.
    pub direction: Octant,
    /// Sprite frame index.
    pub frame: u32,
    /// Collision rollbacks over the run.
    pub collisions: u32,
    /// Arrivals over the run.
    pub arrivals: u32,
    /// Waypoints still queued.
    pub waypoints_left: usize,
}

/// Outcome of [`run_scenario`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Ticks run.
    pub ticks: u64,
    /// Per-agent results in id order.
    pub agents: Vec<AgentReport>,
    /// World state hash after the last tick.
    pub state_hash: u64,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} after {} ticks (hash {:016x})", self.name, self.ticks, self.state_hash)?;
        for agent in &self.agents {
            writeln!(
                f,
                "  #{} {:<8} at ({:.1}, {:.1}) facing {:?}, frame {}, {} collisions, {} arrivals, {} waypoints left",
                agent.id,
                agent.kind,
                agent.position.0,
                agent.position.1,
                agent.direction,
                agent.frame,
                agent.collisions,
                agent.arrivals,
                agent.waypoints_left
            )?;
        }
        Ok(())
    }
}

/// Build and run a scenario for its configured number of ticks.
///
/// # Errors
///
/// Returns an error if the world cannot be built.
pub fn run_scenario(scenario: &Scenario) -> ScenarioResult<ScenarioReport> {
    run_scenario_for(scenario, scenario.ticks)
}

/// Build and run a scenario for `ticks` ticks.
///
/// # Errors
///
/// Returns an error if the world cannot be built.
pub fn run_scenario_for(scenario: &Scenario, ticks: u64) -> ScenarioResult<ScenarioReport> {
    let mut world = scenario.build_world()?;
    let mut collisions: BTreeMap<AgentId, u32> = BTreeMap::new();
    let mut arrivals: BTreeMap<AgentId, u32> = BTreeMap::new();

    for _ in 0..ticks {
        let events = world.tick(scenario.tick_length);
        for id in events.collisions {
            *collisions.entry(id).or_default() += 1;
        }
        for id in events.arrivals {
            *arrivals.entry(id).or_default() += 1;
        }
    }

    let agents = world
        .agents()
        .iter()
        .map(|(id, agent)| AgentReport {
            id,
            kind: agent.kind().to_string(),
            position: (
                agent.position().x.to_num::<f64>(),
                agent.position().y.to_num::<f64>(),
            ),
            direction: agent.direction(),
            frame: agent.current_frame(),
            collisions: collisions.get(&id).copied().unwrap_or_default(),
            arrivals: arrivals.get(&id).copied().unwrap_or_default(),
            waypoints_left: agent.waypoints().len(),
        })
        .collect();

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        ticks,
        agents,
        state_hash: world.state_hash(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_test_utils::fixtures::fixed;
    use std::io::Write;

    const FORD: &str = r#"Scenario(
        name: "ford",
        map: [
            "....~~....",
            "....~~....",
            "..........",
            "....~~....",
        ],
        legend: { '~': "Water" },
        ticks: 400,
        agents: [
            AgentPlacement(kind: "car", position: (16, 16), waypoints: [(300, 16)]),
            AgentPlacement(kind: "truck", position: (16, 112), waypoints: [(300, 112)], route: true),
            AgentPlacement(kind: "osprey", position: (16, 48), waypoints: [(300, 48)], engine_level: Some(0)),
        ],
    )"#;

    fn ford() -> Scenario {
        Scenario::from_ron_str("ford", FORD).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let scenario = ford();
        assert_eq!(scenario.tile_size, 32);
        assert_eq!(scenario.tick_length * fixed(20), fixed(1));
        assert_eq!(scenario.steering, SteeringConfig::default());
        assert!(scenario.agents[1].route);
        assert_eq!(scenario.agents[0].home, None);
    }

    #[test]
    fn test_build_world_issues_orders() {
        let world = ford().build_world().unwrap();
        assert_eq!(world.agents().len(), 3);
        assert_eq!(world.agent(1).unwrap().waypoints().len(), 1);
        // Routed through the gap row.
        assert!(world.agent(2).unwrap().waypoints().len() >= 2);
        // Engine level sets the starting speed.
        assert_eq!(world.agent(3).unwrap().speed(), fixed(11));
    }

    #[test]
    fn test_unknown_kind_fails() {
        let mut scenario = ford();
        scenario.agents[0].kind = "tank".into();
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::Nav(NavError::UnknownUnitKind(_)))
        ));
    }

    #[test]
    fn test_unroutable_waypoint_fails() {
        let mut scenario = ford();
        scenario.agents[1].waypoints = vec![(150, 16)];
        assert!(matches!(scenario.build_world(), Err(ScenarioError::Invalid { .. })));
    }

    #[test]
    fn test_bad_tick_length_fails() {
        let mut scenario = ford();
        scenario.tick_length = Fixed::ZERO;
        assert!(matches!(scenario.build_world(), Err(ScenarioError::Invalid { .. })));
    }

    #[test]
    fn test_run_reports_every_agent() {
        let report = run_scenario_for(&ford(), 300).unwrap();
        assert_eq!(report.ticks, 300);
        assert_eq!(report.agents.len(), 3);

        let car = &report.agents[0];
        assert!(car.collisions > 0);
        assert!(car.position.0 < 128.0);

        let osprey = &report.agents[2];
        assert_eq!(osprey.collisions, 0);
        assert!(osprey.position.0 > 128.0);

        assert!(report.to_string().contains("ford after 300 ticks"));
    }

    #[test]
    fn test_runs_are_reproducible() {
        let a = run_scenario_for(&ford(), 150).unwrap();
        let b = run_scenario_for(&ford(), 150).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FORD.as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.name, "ford");

        assert!(matches!(
            Scenario::load(Path::new("/definitely/not/here.ron")),
            Err(ScenarioError::IoError { .. })
        ));
    }

    #[test]
    fn test_shipped_scenario_runs() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/scenarios/river_crossing.ron");
        let scenario = Scenario::load(&path).unwrap();
        let report = run_scenario_for(&scenario, 100).unwrap();
        assert_eq!(report.agents.len(), 3);
    }
}
