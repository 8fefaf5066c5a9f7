//! Steering and heading model.
//!
//! Given where an agent is, where it wants to go, how fast it is moving and
//! which way it faces, computes the next speed and travel direction. Two
//! modes are available:
//!
//! - [`SteeringMode::Linear`]: head straight for the destination, speed
//!   untouched.
//! - [`SteeringMode::Steering`]: slow down when the destination lies inside
//!   the turning circle, accelerate/decelerate at a bounded rate and turn at
//!   a bounded angular velocity along the shortest arc.

use serde::{Deserialize, Serialize};

use crate::math::{atan2, wrap_angle, Fixed, Vec2Fixed, HALF};

/// Movement model selected for a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SteeringMode {
    /// Straight-line movement toward the destination.
    Linear,
    /// Turn-rate and acceleration limited movement.
    #[default]
    Steering,
}

/// How the desired facing angle is derived from position and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FacingModel {
    /// `atan2(dest.y - pos.y, dest.x - pos.x)`.
    #[default]
    Corrected,
    /// `atan2(dest.y - pos.x, dest.x - pos.x)`, the mixed-axis formula older
    /// builds shipped with. Kept for replays recorded with those builds.
    LegacyMixedAxis,
}

/// Steering settings shared by every agent in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SteeringConfig {
    /// Movement model.
    #[serde(default)]
    pub mode: SteeringMode,
    /// Facing formula used in [`SteeringMode::Steering`].
    #[serde(default)]
    pub facing: FacingModel,
}

impl SteeringConfig {
    /// Straight-line movement.
    pub const LINEAR: Self = Self {
        mode: SteeringMode::Linear,
        facing: FacingModel::Corrected,
    };

    /// Limited-turn movement with the corrected facing formula.
    pub const STEERING: Self = Self {
        mode: SteeringMode::Steering,
        facing: FacingModel::Corrected,
    };
}

/// Physical limits of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionLimits {
    /// Top speed (distance per tick).
    pub max_speed: Fixed,
    /// Turn rate in radians per second.
    pub max_angular_velocity: Fixed,
}

impl MotionLimits {
    /// Most the speed may change in one second.
    #[must_use]
    pub fn max_speed_delta(&self) -> Fixed {
        self.max_speed * HALF
    }

    /// Tightest turn radius at top speed, `None` for agents that cannot turn.
    #[must_use]
    pub fn turning_radius(&self) -> Option<Fixed> {
        if self.max_angular_velocity <= Fixed::ZERO {
            return None;
        }
        self.max_speed.checked_div(self.max_angular_velocity)
    }
}

/// Everything the steering step reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteeringInput {
    /// Current position.
    pub position: Vec2Fixed,
    /// Steering target.
    pub destination: Vec2Fixed,
    /// Current facing angle in radians.
    pub heading: Fixed,
    /// Current speed.
    pub speed: Fixed,
    /// Physical limits.
    pub limits: MotionLimits,
    /// Elapsed time in seconds.
    pub dt: Fixed,
}

/// Result of a steering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteeringOutput {
    /// New speed.
    pub speed: Fixed,
    /// New facing angle in radians.
    pub heading: Fixed,
    /// Unit travel direction (zero if already at the destination in linear mode).
    pub direction: Vec2Fixed,
}

/// Run one steering step.
#[must_use]
pub fn steer(input: &SteeringInput, config: SteeringConfig) -> SteeringOutput {
    let to_destination = input.destination - input.position;

    match config.mode {
        SteeringMode::Linear => {
            let direction = to_destination.normalize();
            let heading = if direction.is_zero() {
                input.heading
            } else {
                direction.angle()
            };
            SteeringOutput {
                speed: input.speed,
                heading,
                direction,
            }
        }
        SteeringMode::Steering => {
            let dt = input.dt.max(Fixed::ZERO);
            let facing = Vec2Fixed::from_angle(input.heading);

            let desired = desired_speed(input.position, input.destination, facing, input.limits);
            let speed = clamp_speed(desired, input.speed, input.limits.max_speed_delta(), dt);

            let heading = turn_to_face(
                input.position,
                input.destination,
                input.heading,
                input.limits.max_angular_velocity * dt,
                config.facing,
            );

            SteeringOutput {
                speed,
                heading,
                direction: Vec2Fixed::from_angle(heading),
            }
        }
    }
}

/// Speed the agent should aim for given its turning circle.
///
/// The two candidate turning circles touch the agent's position and are
/// centered a turning radius to either side of `facing`. If the destination
/// lies inside either, the agent cannot reach it at top speed and should
/// slow to `max_angular_velocity * distance / 2`.
#[must_use]
pub fn desired_speed(
    position: Vec2Fixed,
    destination: Vec2Fixed,
    facing: Vec2Fixed,
    limits: MotionLimits,
) -> Fixed {
    let Some(radius) = limits.turning_radius() else {
        return limits.max_speed;
    };

    let offset = facing.perpendicular() * radius;
    let closest = destination
        .distance(position + offset)
        .min(destination.distance(position - offset));

    if closest < radius {
        let half_distance = position.distance(destination) * HALF;
        (limits.max_angular_velocity * half_distance).min(limits.max_speed)
    } else {
        limits.max_speed
    }
}

/// Clamp `desired` to within `max_delta * dt` of `previous`.
#[must_use]
pub fn clamp_speed(desired: Fixed, previous: Fixed, max_delta: Fixed, dt: Fixed) -> Fixed {
    let step = (max_delta * dt).abs();
    desired.clamp(previous - step, previous + step)
}

/// Rotate `current_angle` toward the direction of `face_this` by at most
/// `turn_speed` radians, along the shorter arc.
#[must_use]
pub fn turn_to_face(
    position: Vec2Fixed,
    face_this: Vec2Fixed,
    current_angle: Fixed,
    turn_speed: Fixed,
    facing: FacingModel,
) -> Fixed {
    let x = face_this.x - position.x;
    let y = match facing {
        FacingModel::Corrected => face_this.y - position.y,
        FacingModel::LegacyMixedAxis => face_this.y - position.x,
    };

    let desired_angle = atan2(y, x);
    let turn_speed = turn_speed.abs();
    let difference = wrap_angle(desired_angle - current_angle).clamp(-turn_speed, turn_speed);

    wrap_angle(current_angle + difference)
}
