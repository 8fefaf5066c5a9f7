//! Navigation world.
//!
//! [`NavWorld`] owns every agent in a session together with the terrain
//! they move over and the steering settings they share. It is passed by
//! reference to whatever drives the game loop; there is no global state.
//!
//! # Determinism
//!
//! - All motion math is fixed-point
//! - Agents are updated in ascending id order
//! - Identical spawns, orders and `dt` sequences give identical state hashes
//!
//! # Example
//!
//! ```
//! use nav_core::math::{Fixed, Vec2Fixed};
//! use nav_core::steering::SteeringConfig;
//! use nav_core::terrain::OpenTerrain;
//! use nav_core::waypoints::OrderMode;
//! use nav_core::world::NavWorld;
//!
//! let mut world = NavWorld::new(OpenTerrain, SteeringConfig::default());
//! let car = world.spawn("car", Vec2Fixed::ZERO, None).unwrap();
//! world
//!     .order_move(car, Vec2Fixed::from_ints(200, 0), OrderMode::Replace)
//!     .unwrap();
//!
//! let dt = Fixed::from_num(1) / Fixed::from_num(20);
//! for _ in 0..20 {
//!     world.tick(dt);
//! }
//! assert!(world.agent(car).unwrap().position().x > Fixed::ZERO);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::error::{NavError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding::NavGrid;
use crate::steering::SteeringConfig;
use crate::terrain::{OpenTerrain, TerrainQuery};
use crate::unit_kind::UnitKindRegistry;
use crate::waypoints::OrderMode;

/// Unique agent identifier within a world.
pub type AgentId = u64;

/// Ticks per second the host loop is expected to run at.
pub const TICK_RATE: u32 = 20;

/// Agents by id, iterated in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStorage {
    agents: BTreeMap<AgentId, Agent>,
    next_id: AgentId,
}

impl AgentStorage {
    /// Create empty storage. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert an agent and return its id.
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        let id = self.next_id;
        self.next_id += 1;
        self.agents.insert(id, agent);
        id
    }

    /// Remove an agent.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    /// Get an agent.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Get an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.agents.iter().map(|(id, agent)| (*id, agent))
    }
}

impl Default for AgentStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Agents affected by one tick, each list in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Agents whose position advanced.
    pub moved: Vec<AgentId>,
    /// Agents rolled back by a collision.
    pub collisions: Vec<AgentId>,
    /// Agents that reached their destination and stopped.
    pub arrivals: Vec<AgentId>,
    /// Agents that reached a queued waypoint.
    pub waypoints_reached: Vec<AgentId>,
}

#[derive(Serialize, Deserialize)]
struct WorldSnapshot {
    tick: u64,
    agents: AgentStorage,
}

/// Every agent in a session plus the terrain they move over.
#[derive(Debug, Clone)]
pub struct NavWorld<T = OpenTerrain> {
    tick: u64,
    agents: AgentStorage,
    terrain: T,
    config: SteeringConfig,
    registry: UnitKindRegistry,
}

impl<T: TerrainQuery> NavWorld<T> {
    /// Create an empty world using the builtin unit kinds.
    #[must_use]
    pub fn new(terrain: T, config: SteeringConfig) -> Self {
        Self::with_registry(terrain, config, UnitKindRegistry::builtin())
    }

    /// Create an empty world with a custom unit kind registry.
    #[must_use]
    pub fn with_registry(terrain: T, config: SteeringConfig, registry: UnitKindRegistry) -> Self {
        Self {
            tick: 0,
            agents: AgentStorage::new(),
            terrain,
            config,
            registry,
        }
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Shared steering settings.
    #[must_use]
    pub const fn config(&self) -> SteeringConfig {
        self.config
    }

    /// Change the steering settings for subsequent ticks.
    pub fn set_config(&mut self, config: SteeringConfig) {
        self.config = config;
    }

    /// Terrain agents collide with.
    #[must_use]
    pub const fn terrain(&self) -> &T {
        &self.terrain
    }

    /// Unit kinds available to [`spawn`](Self::spawn).
    #[must_use]
    pub const fn registry(&self) -> &UnitKindRegistry {
        &self.registry
    }

    /// All agents.
    #[must_use]
    pub const fn agents(&self) -> &AgentStorage {
        &self.agents
    }

    /// Spawn an idle agent of `kind` at `position`.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownUnitKind` if `kind` is not registered.
    pub fn spawn(&mut self, kind: &str, position: Vec2Fixed, home: Option<Vec2Fixed>) -> Result<AgentId> {
        let mut agent = Agent::new(self.registry.get(kind)?, position);
        agent.set_home(home);
        let id = self.agents.insert(agent);
        tracing::debug!(id, kind, ?position, "Spawned agent");
        Ok(id)
    }

    /// Remove an agent from the world.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownAgent` if the agent does not exist.
    pub fn despawn(&mut self, id: AgentId) -> Result<Agent> {
        self.agents.remove(id).ok_or(NavError::UnknownAgent(id))
    }

    /// Look up an agent.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownAgent` if the agent does not exist.
    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        self.agents.get(id).ok_or(NavError::UnknownAgent(id))
    }

    /// Look up an agent mutably.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownAgent` if the agent does not exist.
    pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.agents.get_mut(id).ok_or(NavError::UnknownAgent(id))
    }

    /// Issue a move order to an agent.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownAgent` if the agent does not exist.
    pub fn order_move(&mut self, id: AgentId, point: Vec2Fixed, mode: OrderMode) -> Result<()> {
        self.agent_mut(id)?.order_move(point, mode);
        Ok(())
    }

    /// Plan a grid route for an agent and queue it.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownAgent` if the agent does not exist and
    /// `NavError::InvalidState` if no route exists.
    pub fn route_to(&mut self, id: AgentId, grid: &NavGrid, goal: Vec2Fixed, mode: OrderMode) -> Result<usize> {
        self.agent_mut(id)?.route_to(grid, goal, mode)
    }

    /// Advance every agent by `dt` seconds.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut events = TickEvents::default();

        for id in self.agents.sorted_ids() {
            let Some(agent) = self.agents.get_mut(id) else {
                continue;
            };
            let outcome = agent.update(dt, self.config, &self.terrain);

            if outcome.moved {
                events.moved.push(id);
            }
            if outcome.collided {
                events.collisions.push(id);
            }
            if outcome.arrived {
                events.arrivals.push(id);
            }
            if outcome.waypoint_reached {
                events.waypoints_reached.push(id);
            }
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "World state hash");
        }

        events
    }

    /// Hash of the tick counter and every agent's motion state.
    ///
    /// Two worlds with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.agents.len().hash(&mut hasher);

        for (id, agent) in self.agents.iter() {
            id.hash(&mut hasher);
            agent.kind().hash(&mut hasher);
            agent.position().hash(&mut hasher);
            agent.destination().hash(&mut hasher);
            agent.speed().to_bits().hash(&mut hasher);
            agent.heading().to_bits().hash(&mut hasher);
            agent.direction().hash(&mut hasher);
            agent.last_movement().hash(&mut hasher);
            agent.engine_level().hash(&mut hasher);
            agent.waypoints().len().hash(&mut hasher);
            for waypoint in agent.waypoints().iter() {
                waypoint.hash(&mut hasher);
            }
            agent.current_frame().hash(&mut hasher);
            agent.cargo().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the tick counter and agents.
    ///
    /// Terrain, steering settings and the registry are not included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = WorldSnapshot {
            tick: self.tick,
            agents: self.agents.clone(),
        };
        bincode::serialize(&snapshot)
            .map_err(|e| NavError::InvalidState(format!("Failed to serialize world: {e}")))
    }

    /// Replace the tick counter and agents with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid snapshot; the world is
    /// left unchanged in that case.
    pub fn restore_agents(&mut self, data: &[u8]) -> Result<()> {
        let snapshot: WorldSnapshot = bincode::deserialize(data)
            .map_err(|e| NavError::InvalidState(format!("Failed to deserialize world: {e}")))?;

        self.tick = snapshot.tick;
        self.agents = snapshot.agents;
        tracing::debug!(tick = self.tick, agents = self.agents.len(), "Restored world");
        Ok(())
    }
}
