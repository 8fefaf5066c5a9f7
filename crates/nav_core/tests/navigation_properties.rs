//! Property tests for the navigation core.

use nav_core::math::PI;
use nav_core::pathfinding::CellType;
use nav_core::prelude::*;
use nav_core::steering::{clamp_speed, steer, MotionLimits, SteeringInput};
use nav_test_utils::determinism::strategies::*;
use nav_test_utils::determinism::{find_first_divergence, run_parallel_worlds, verify_world_determinism};
use nav_test_utils::fixtures::{dt_default, fixed, water_channel_world};
use proptest::prelude::*;

const GRID: u32 = 8;

fn random_grid(blocked: &[bool]) -> NavGrid {
    NavGrid::from_fn(GRID, GRID, fixed(16), |x, y| {
        let corner = (x == 0 && y == 0) || (x == GRID - 1 && y == GRID - 1);
        if !corner && blocked[(y * GRID + x) as usize] {
            CellType::Blocked
        } else {
            CellType::Walkable
        }
    })
}

fn chebyshev(x: u32, y: u32) -> Fixed {
    Fixed::from_num(x.abs_diff(GRID - 1).max(y.abs_diff(GRID - 1)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A* with an admissible heuristic finds the same cost as uniform-cost
    /// search, and both agree on reachability.
    #[test]
    fn prop_astar_matches_uniform_cost(blocked in proptest::collection::vec(proptest::bool::weighted(0.3), (GRID * GRID) as usize)) {
        let grid = random_grid(&blocked);
        let goal = grid.node(GRID - 1, GRID - 1);

        let informed = find_path(grid.node(0, 0), &goal, |_, _| Fixed::ONE, |n| chebyshev(n.x, n.y));
        let uniform = find_path(grid.node(0, 0), &goal, |_, _| Fixed::ONE, |_| Fixed::ZERO);

        match (informed, uniform) {
            (Some(a), Some(b)) => prop_assert_eq!(a.total_cost(), b.total_cost()),
            (None, None) => {}
            (a, b) => prop_assert!(false, "reachability differs: {:?} vs {:?}", a.is_some(), b.is_some()),
        };
    }

    /// Enumerating a path walks from destination back to start with one
    /// more node than hops.
    #[test]
    fn prop_path_reconstruction(blocked in proptest::collection::vec(proptest::bool::weighted(0.2), (GRID * GRID) as usize)) {
        let grid = random_grid(&blocked);
        let goal = grid.node(GRID - 1, GRID - 1);

        if let Some(path) = find_path(grid.node(0, 0), &goal, |_, _| Fixed::ONE, |n| chebyshev(n.x, n.y)) {
            let nodes: Vec<_> = path.iter().collect();
            prop_assert_eq!(nodes.len(), path.hops() + 1);
            prop_assert_eq!(*nodes[0], goal);
            prop_assert_eq!(*nodes[nodes.len() - 1], grid.node(0, 0));
            prop_assert_eq!(path.total_cost(), Fixed::from_num(path.hops()));
        };
    }

    /// The steering model never changes speed by more than the acceleration
    /// budget for the tick.
    #[test]
    fn prop_steering_speed_clamp(
        position in arb_vec2_position(),
        destination in arb_vec2_position(),
        speed in arb_fixed_speed(),
        max_speed in arb_fixed_speed(),
        heading_steps in -31i32..=31i32,
        dt in arb_dt(),
    ) {
        let limits = MotionLimits { max_speed, max_angular_velocity: PI };
        let input = SteeringInput {
            position,
            destination,
            heading: PI * Fixed::from_num(heading_steps) / Fixed::from_num(32),
            speed,
            limits,
            dt,
        };
        let output = steer(&input, SteeringConfig::STEERING);
        prop_assert!((output.speed - speed).abs() <= limits.max_speed_delta() * dt);
        prop_assert!(output.heading >= -PI && output.heading <= PI);
    }

    #[test]
    fn prop_clamp_speed_bounds(
        desired in arb_fixed_speed(),
        previous in arb_fixed_speed(),
        max_delta in arb_fixed_speed(),
        dt in arb_dt(),
    ) {
        let clamped = clamp_speed(desired, previous, max_delta, dt);
        prop_assert!(clamped >= previous - max_delta * dt);
        prop_assert!(clamped <= previous + max_delta * dt);
    }

    /// Only the angle of a movement matters for its octant.
    #[test]
    fn prop_octant_scale_invariant(direction in arb_direction(), scale in 1i32..50) {
        let scaled = direction * Fixed::from_num(scale);
        prop_assert_eq!(quantize_direction(direction), quantize_direction(scaled));
    }

    /// A rollback after a successful move returns the agent to where it
    /// started the tick.
    #[test]
    fn prop_collision_undoes_last_move(
        start in arb_vec2_position(),
        target in arb_vec2_position(),
        speed in arb_fixed_speed(),
    ) {
        prop_assume!(start.distance(target) > fixed(40));
        let kind = UnitKindData::new("probe", vec![speed], &[], 1);
        let mut agent = Agent::new(&kind, start);
        agent.set_speed(speed);
        agent.set_destination(target);

        let outcome = agent.update(Fixed::ONE, SteeringConfig::LINEAR, &OpenTerrain);
        prop_assert!(outcome.moved);
        let step = agent.last_movement();
        agent.collision();
        prop_assert_eq!(agent.position(), start);
        prop_assert_eq!(agent.destination(), start - step);
    }

    /// A ground agent moving no further per tick than the probe reaches
    /// never enters blocking terrain.
    #[test]
    fn prop_ground_agent_never_crosses_wall(start_y in 16i32..144, speed in 1i32..=5) {
        let speed = fixed(speed);
        let wall = |p: Vec2Fixed, class: &str| class == "Water" && p.x >= fixed(200);
        let registry = UnitKindRegistry::builtin();
        let mut car = Agent::new(registry.get("car").unwrap(), Vec2Fixed::from_ints(0, start_y));
        car.set_speed(speed);
        car.order_move(Vec2Fixed::from_ints(400, start_y), OrderMode::Replace);

        for _ in 0..100 {
            car.update(Fixed::ONE, SteeringConfig::LINEAR, &wall);
            prop_assert!(car.position().x < fixed(200));
        }
    }
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn water_channel_is_deterministic() {
    assert!(verify_world_determinism(water_channel_world, 300, dt_default()));
    assert_eq!(find_first_divergence(water_channel_world, 300, dt_default()), None);
}

#[test]
fn parallel_worlds_agree() {
    run_parallel_worlds(water_channel_world, 4, 200, dt_default()).assert_deterministic();
}

#[test]
fn legacy_facing_is_deterministic_too() {
    let setup = || {
        let mut world = NavWorld::new(
            OpenTerrain,
            SteeringConfig {
                mode: SteeringMode::Steering,
                facing: FacingModel::LegacyMixedAxis,
            },
        );
        for kind in ["car", "truck", "uav", "osprey"] {
            let id = world.spawn(kind, Vec2Fixed::from_ints(10, 10), None).unwrap();
            world
                .order_move(id, Vec2Fixed::from_ints(-300, 450), OrderMode::Replace)
                .unwrap();
        }
        world
    };
    assert!(verify_world_determinism(setup, 200, dt_default()));
}
