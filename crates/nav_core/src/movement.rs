//! Movement and collision primitives.
//!
//! The per-tick driver lives in [`Agent::update`](crate::agent::Agent::update);
//! this module holds the pieces it is built from.

use crate::math::{Fixed, Vec2Fixed, HALF};
use crate::terrain::TerrainQuery;

/// How far ahead of the agent, along its travel direction, terrain is probed.
pub const PROBE_DISTANCE: Fixed = Fixed::from_bits(5 << 32);

/// Speed multiplier applied when the agent's octant changes (0.7).
pub const TURN_PENALTY_FACTOR: Fixed = Fixed::from_bits(3_006_477_107);

/// What happened to an agent during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The agent's position advanced.
    pub moved: bool,
    /// The probe hit blocking terrain and the last movement was rolled back.
    pub collided: bool,
    /// The agent reached its destination and stopped.
    pub arrived: bool,
    /// A waypoint was reached and removed from the queue.
    pub waypoint_reached: bool,
}

/// Check whether the point `PROBE_DISTANCE` ahead of `position` along
/// `direction` is blocked for any of `blocking_classes`.
///
/// Agents with no blocking classes never collide.
#[must_use]
pub fn probe_blocked<T, S>(
    terrain: &T,
    position: Vec2Fixed,
    direction: Vec2Fixed,
    blocking_classes: &[S],
) -> bool
where
    T: TerrainQuery + ?Sized,
    S: AsRef<str>,
{
    let probe = position + direction * PROBE_DISTANCE;
    blocking_classes
        .iter()
        .any(|class| terrain.is_blocked(probe, class.as_ref()))
}

/// Speed after an octant change: `max(max_speed / 2, speed * 0.7)`.
#[must_use]
pub fn penalized_speed(speed: Fixed, max_speed: Fixed) -> Fixed {
    (max_speed * HALF).max(speed * TURN_PENALTY_FACTOR)
}
