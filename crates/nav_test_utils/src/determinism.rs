//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a navigation world produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and snapshot/restore only work if navigation is 100%
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`nav_core::math::Fixed`] throughout,
//!   including the trigonometry used for steering.
//!
//! - **Map iteration order**: Agents are stored in a sorted map and updated
//!   in ascending id order.
//!
//! - **Wall-clock time**: `dt` is always supplied by the caller.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (steering, quantizer, etc.)
//! 2. **Property tests**: Random spawns and orders still replay exactly
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N worlds on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use nav_core::math::Fixed;
use nav_core::terrain::TerrainQuery;
use nav_core::world::NavWorld;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Navigation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use nav_core::math::Fixed;
/// use nav_core::steering::SteeringConfig;
/// use nav_core::terrain::OpenTerrain;
/// use nav_core::world::NavWorld;
/// use nav_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     3,
///     100,
///     || NavWorld::new(OpenTerrain, SteeringConfig::default()),
///     |world| {
///         world.tick(Fixed::from_num(1) / Fixed::from_num(20));
///     },
///     NavWorld::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a world twice with identical setup and compare final hashes.
pub fn verify_world_determinism<T, F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    T: TerrainQuery,
    F: Fn() -> NavWorld<T>,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |world| {
            world.tick(dt);
        },
        NavWorld::state_hash,
    );
    result.is_deterministic
}

/// Result of parallel world runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Final state hash from each world.
    pub hashes: Vec<u64>,
    /// Number of ticks each world ran.
    pub ticks: u64,
    /// Number of worlds run.
    pub num_worlds: usize,
}

impl ParallelRunResult {
    /// Check if all worlds produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all worlds matched.
    ///
    /// # Panics
    ///
    /// Panics if worlds produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel worlds diverged!\n\
                 Worlds: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_worlds,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N worlds on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different thread
/// scheduling or memory layout.
pub fn run_parallel_worlds<T, F>(setup_fn: F, num_worlds: usize, num_ticks: u64, dt: Fixed) -> ParallelRunResult
where
    T: TerrainQuery + Send,
    F: Fn() -> NavWorld<T> + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        world.tick(dt);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    ParallelRunResult {
        hashes,
        ticks: num_ticks,
        num_worlds,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` for the first tick at
/// which the hashes differ.
pub fn find_first_divergence<T, F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> Option<u64>
where
    T: TerrainQuery,
    F: Fn() -> NavWorld<T>,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        tracing::warn!("Worlds differ before the first tick");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick(dt);
        b.tick(dt);

        let (hash_a, hash_b) = (a.state_hash(), b.state_hash());
        if hash_a != hash_b {
            tracing::warn!(tick, hash_a, hash_b, "Worlds diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that snapshot/restore preserves agent state exactly, and that the
/// restored world keeps evolving identically to the original.
pub fn verify_snapshot_determinism<T, F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    T: TerrainQuery,
    F: Fn() -> NavWorld<T>,
{
    let mut world = setup_fn();
    for _ in 0..num_ticks {
        world.tick(dt);
    }

    let bytes = match world.snapshot() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Snapshot failed: {e}");
            return false;
        }
    };

    let mut restored = setup_fn();
    if let Err(e) = restored.restore_agents(&bytes) {
        tracing::warn!("Restore failed: {e}");
        return false;
    }
    if restored.state_hash() != world.state_hash() {
        tracing::warn!(tick = world.get_tick(), "Restored world hashes differently");
        return false;
    }

    for _ in 0..num_ticks {
        world.tick(dt);
        restored.tick(dt);
    }

    world.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for navigation testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use nav_core::direction::Octant;
    use nav_core::math::{Fixed, Vec2Fixed};
    use nav_core::steering::{FacingModel, SteeringConfig, SteeringMode};
    use nav_core::waypoints::OrderMode;
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate.
    ///
    /// Range: -2000 to 2000 (a few screens of map).
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-2000i32..2000i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point speed.
    ///
    /// Range: 1 to 20 (units per tick)
    pub fn arb_fixed_speed() -> impl Strategy<Value = Fixed> {
        (1i32..20i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a non-zero direction vector.
    pub fn arb_direction() -> impl Strategy<Value = Vec2Fixed> {
        (-100i32..100i32, -100i32..100i32)
            .prop_filter("non-zero", |(x, y)| *x != 0 || *y != 0)
            .prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Generate a tick length between 1 ms and 100 ms.
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        (1i32..=100i32).prop_map(|ms| Fixed::from_num(ms) / Fixed::from_num(1000))
    }

    /// Generate an octant.
    pub fn arb_octant() -> impl Strategy<Value = Octant> {
        (0u8..8u8).prop_map(Octant::from_index)
    }

    /// Generate a steering configuration.
    pub fn arb_steering_config() -> impl Strategy<Value = SteeringConfig> {
        (
            prop_oneof![Just(SteeringMode::Linear), Just(SteeringMode::Steering)],
            prop_oneof![Just(FacingModel::Corrected), Just(FacingModel::LegacyMixedAxis)],
        )
            .prop_map(|(mode, facing)| SteeringConfig { mode, facing })
    }

    /// Generate a builtin unit kind id.
    pub fn arb_kind_id() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("car"), Just("truck"), Just("uav"), Just("osprey")]
    }

    /// Generate a move order.
    pub fn arb_order() -> impl Strategy<Value = (Vec2Fixed, OrderMode)> {
        (
            arb_vec2_position(),
            prop_oneof![Just(OrderMode::Replace), Just(OrderMode::Append)],
        )
    }

    /// Generate a sequence of move orders.
    pub fn arb_order_sequence(max_len: usize) -> impl Strategy<Value = Vec<(Vec2Fixed, OrderMode)>> {
        proptest::collection::vec(arb_order(), 0..max_len)
    }

    /// Parameters for spawning a test agent.
    #[derive(Debug, Clone)]
    pub struct TestAgentParams {
        /// Unit kind id.
        pub kind: &'static str,
        /// Spawn position.
        pub position: Vec2Fixed,
        /// First move order target.
        pub target: Vec2Fixed,
    }

    /// Generate parameters for a test agent.
    pub fn arb_agent_params() -> impl Strategy<Value = TestAgentParams> {
        (arb_kind_id(), arb_vec2_position(), arb_vec2_position()).prop_map(
            |(kind, position, target)| TestAgentParams {
                kind,
                position,
                target,
            },
        )
    }

    /// Generate a list of agent spawn parameters.
    pub fn arb_agent_list(max_agents: usize) -> impl Strategy<Value = Vec<TestAgentParams>> {
        proptest::collection::vec(arb_agent_params(), 1..max_agents)
    }
}
