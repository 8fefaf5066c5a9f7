//! Test fixtures and helpers.
//!
//! Pre-built maps, worlds and unit kinds for consistent testing.

use std::collections::BTreeMap;
use std::fmt::Debug;

use fixed::types::I32F32;
use nav_core::data::UnitKindData;
use nav_core::math::Vec2Fixed;
use nav_core::pathfinding::{CellType, NavGrid};
use nav_core::steering::SteeringConfig;
use nav_core::terrain::{CollisionMap, OpenTerrain};
use nav_core::waypoints::OrderMode;
use nav_core::world::{AgentId, NavWorld, TICK_RATE};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In navigation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for an integer-valued vector.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Length of one tick at the default tick rate.
#[must_use]
pub fn dt_default() -> I32F32 {
    I32F32::ONE / I32F32::from_num(TICK_RATE)
}

/// Assert two fixed-point values are within `tolerance` of each other.
///
/// # Panics
///
/// Panics with both values if they differ by more than `tolerance`.
pub fn assert_close(actual: I32F32, expected: I32F32, tolerance: I32F32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} (+/- {tolerance}), got {actual}"
    );
}

/// Serialize `value` to RON and back, asserting nothing was lost.
///
/// # Panics
///
/// Panics if serialization fails or the parsed value differs.
pub fn assert_ron_roundtrip<T>(value: &T) -> T
where
    T: Serialize + DeserializeOwned + PartialEq + Debug,
{
    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .unwrap_or_else(|e| panic!("failed to serialize {value:?}: {e}"));
    let parsed: T = ron::from_str(&text).unwrap_or_else(|e| panic!("failed to parse {text}: {e}"));
    assert_eq!(&parsed, value, "RON round trip changed the value");
    parsed
}

/// Build a legend from `(symbol, terrain class)` pairs.
#[must_use]
pub fn legend(entries: &[(char, &str)]) -> BTreeMap<char, String> {
    entries
        .iter()
        .map(|(symbol, class)| (*symbol, (*class).to_string()))
        .collect()
}

/// Legend used by most fixtures: `~` water, `^` mountain.
#[must_use]
pub fn default_legend() -> BTreeMap<char, String> {
    legend(&[('~', "Water"), ('^', "Mountain")])
}

/// Build a collision map from ASCII rows with the default legend.
///
/// # Panics
///
/// Panics if the rows are not a valid map.
#[must_use]
pub fn ascii_map(rows: &[&str], tile_size: u32) -> CollisionMap {
    CollisionMap::from_ascii(rows, tile_size, &default_legend())
        .unwrap_or_else(|e| panic!("invalid fixture map: {e}"))
}

/// A 10x5 map of 32px tiles with a vertical water channel at columns 5-6.
#[must_use]
pub fn water_channel_map() -> CollisionMap {
    ascii_map(
        &[
            ".....~~...",
            ".....~~...",
            ".....~~...",
            ".....~~...",
            ".....~~...",
        ],
        32,
    )
}

/// A world over [`water_channel_map`] with a car driving into the water
/// and a UAV flying over it.
///
/// # Panics
///
/// Panics if the builtin unit kinds are missing.
#[must_use]
pub fn water_channel_world() -> NavWorld<CollisionMap> {
    let mut world = NavWorld::new(water_channel_map(), SteeringConfig::default());

    let car = world.spawn("car", vec2(48, 48), None).unwrap_or_else(|e| panic!("{e}"));
    world
        .order_move(car, vec2(290, 48), OrderMode::Replace)
        .unwrap_or_else(|e| panic!("{e}"));

    let uav = world
        .spawn("uav", vec2(48, 112), Some(vec2(48, 112)))
        .unwrap_or_else(|e| panic!("{e}"));
    world
        .order_move(uav, vec2(290, 112), OrderMode::Replace)
        .unwrap_or_else(|e| panic!("{e}"));

    world
}

/// An empty world with the given steering settings.
#[must_use]
pub fn open_world(config: SteeringConfig) -> NavWorld<OpenTerrain> {
    NavWorld::new(OpenTerrain, config)
}

/// Spawn `count` agents of `kind` in a row along the x axis, all ordered to
/// `target`. Returns their ids in spawn order.
///
/// # Panics
///
/// Panics if `kind` is not registered in the world.
pub fn spawn_convoy<T>(world: &mut NavWorld<T>, kind: &str, count: u32, target: Vec2Fixed) -> Vec<AgentId>
where
    T: nav_core::terrain::TerrainQuery,
{
    (0..count)
        .map(|i| {
            let start = vec2(i as i32 * 40, 0);
            let id = world
                .spawn(kind, start, Some(start))
                .unwrap_or_else(|e| panic!("cannot spawn {kind}: {e}"));
            world
                .order_move(id, target, OrderMode::Replace)
                .unwrap_or_else(|e| panic!("{e}"));
            id
        })
        .collect()
}

/// A ground unit kind with a single engine level.
#[must_use]
pub fn ground_kind(id: &str, speed: i32) -> UnitKindData {
    UnitKindData::new(id, vec![fixed(speed)], &["Water", "Mountain"], 4)
}

/// An aerial unit kind with a single engine level.
#[must_use]
pub fn aerial_kind(id: &str, speed: i32) -> UnitKindData {
    UnitKindData::new(id, vec![fixed(speed)], &[], 4)
}

/// A `width` x `height` grid of walkable cells with a wall at column
/// `wall_x` that has a single gap at row `gap_y`.
#[must_use]
pub fn grid_with_gap(width: u32, height: u32, wall_x: u32, gap_y: u32) -> NavGrid {
    NavGrid::from_fn(width, height, fixed(32), |x, y| {
        if x == wall_x && y != gap_y {
            CellType::Blocked
        } else {
            CellType::Walkable
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_core::pathfinding::plan_route;
    use nav_core::terrain::TerrainQuery;

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3), I32F32::from_num(3));
        assert_close(fixed_f(0.25), I32F32::from_num(1) / 4, I32F32::ZERO);
        assert_eq!(vec2(1, -2), Vec2Fixed::new(fixed(1), fixed(-2)));
        assert_eq!(dt_default() * fixed(20), fixed(1));
    }

    #[test]
    fn test_water_channel_blocks_ground_only() {
        let map = water_channel_map();
        assert!(map.is_blocked(vec2(170, 40), "Water"));
        assert!(!map.is_blocked(vec2(100, 40), "Water"));
        assert!(!map.is_blocked(vec2(170, 40), "Mountain"));
    }

    #[test]
    fn test_convoy_ids() {
        let mut world = open_world(SteeringConfig::default());
        let ids = spawn_convoy(&mut world, "car", 3, vec2(100, 100));
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(world.agent(3).unwrap().position(), vec2(80, 0));
    }

    #[test]
    fn test_kind_builders() {
        assert!(!ground_kind("jeep", 5).is_aerial());
        assert!(aerial_kind("drone", 9).is_aerial());
        assert!(ground_kind("jeep", 5).validate().is_empty());
    }

    #[test]
    fn test_grid_with_gap_is_routable() {
        let grid = grid_with_gap(8, 5, 4, 2);
        let route = plan_route(&grid, vec2(16, 16), vec2(240, 16)).unwrap();
        assert!(route.iter().any(|p| *p == grid.grid_to_world(4, 2)));
    }

    #[test]
    fn test_ron_roundtrip_helper() {
        assert_ron_roundtrip(&SteeringConfig::LINEAR);
        assert_ron_roundtrip(&ground_kind("jeep", 5));
    }
}
