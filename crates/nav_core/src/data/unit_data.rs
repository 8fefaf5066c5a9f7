//! Unit kind capability descriptors for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::direction::Octant;
use crate::math::{fixed_decimal_serde, Fixed, PI};

/// What an agent does once it reaches its final destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArrivalBehavior {
    /// Stop where it is.
    #[default]
    Hold,
    /// Head back to the agent's home position and face `facing`.
    ReturnHome {
        /// Facing shown after the retarget.
        facing: Octant,
    },
}

/// Data-driven unit kind definition.
///
/// Fixed-point fields are written as decimals in RON and converted once at
/// load time.
///
/// # Example RON
///
/// ```ron
/// UnitKindData(
///     id: "car",
///     name: "Car",
///     speeds: [8.0, 5.0, 0.0],
///     blocking_terrain: ["Mountain", "Water"],
///     capacity: 4,
///     frames_per_direction: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitKindData {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Max speed (distance per tick) for each engine level.
    #[serde(with = "fixed_decimal_serde::vec")]
    pub speeds: Vec<Fixed>,

    /// Turn rate in radians per second.
    #[serde(
        with = "fixed_decimal_serde",
        default = "default_max_angular_velocity"
    )]
    pub max_angular_velocity: Fixed,

    /// Distance below which the agent counts as arrived.
    #[serde(with = "fixed_decimal_serde", default = "default_movement_tolerance")]
    pub movement_tolerance: Fixed,

    /// Terrain classes this kind cannot cross. Empty for aerial kinds.
    #[serde(default)]
    pub blocking_terrain: Vec<String>,

    /// Cargo units the kind can carry.
    pub capacity: u32,

    /// Frames per octant row in the sprite sheet.
    #[serde(default = "default_frames_per_direction")]
    pub frames_per_direction: u32,

    /// Seconds each animation frame is shown.
    #[serde(with = "fixed_decimal_serde", default = "default_frame_length")]
    pub frame_length: Fixed,

    /// Facing when spawned.
    #[serde(default)]
    pub initial_facing: Octant,

    /// Behaviour after reaching the final destination.
    #[serde(default)]
    pub arrival: ArrivalBehavior,
}

fn default_max_angular_velocity() -> Fixed {
    PI
}

fn default_movement_tolerance() -> Fixed {
    Fixed::from_num(8)
}

const fn default_frames_per_direction() -> u32 {
    1
}

fn default_frame_length() -> Fixed {
    Fixed::from_num(8) / Fixed::from_num(1000)
}

impl UnitKindData {
    /// Create a ground kind with default turning, tolerance and animation.
    #[must_use]
    pub fn new(id: &str, speeds: Vec<Fixed>, blocking_terrain: &[&str], capacity: u32) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            speeds,
            max_angular_velocity: default_max_angular_velocity(),
            movement_tolerance: default_movement_tolerance(),
            blocking_terrain: blocking_terrain.iter().map(ToString::to_string).collect(),
            capacity,
            frames_per_direction: default_frames_per_direction(),
            frame_length: default_frame_length(),
            initial_facing: Octant::default(),
            arrival: ArrivalBehavior::default(),
        }
    }

    /// Max speed at `engine_level`, if the kind has that level.
    #[must_use]
    pub fn max_speed(&self, engine_level: usize) -> Option<Fixed> {
        self.speeds.get(engine_level).copied()
    }

    /// Check if the kind ignores terrain.
    #[must_use]
    pub fn is_aerial(&self) -> bool {
        self.blocking_terrain.is_empty()
    }

    /// Check the definition for problems.
    ///
    /// Returns one human readable message per problem; empty if valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("id is empty".to_string());
        }
        if self.speeds.is_empty() {
            errors.push("at least one engine level speed is required".to_string());
        }
        for (level, speed) in self.speeds.iter().enumerate() {
            if *speed < Fixed::ZERO {
                errors.push(format!("speed for engine level {level} is negative ({speed})"));
            }
        }
        if self.max_angular_velocity <= Fixed::ZERO {
            errors.push(format!(
                "max_angular_velocity must be positive ({})",
                self.max_angular_velocity
            ));
        }
        if self.movement_tolerance <= Fixed::ZERO {
            errors.push(format!(
                "movement_tolerance must be positive ({})",
                self.movement_tolerance
            ));
        }
        if self.frames_per_direction == 0 {
            errors.push("frames_per_direction must be at least 1".to_string());
        }
        if self.frame_length <= Fixed::ZERO {
            errors.push(format!("frame_length must be positive ({})", self.frame_length));
        }
        for (i, class) in self.blocking_terrain.iter().enumerate() {
            if class.trim().is_empty() {
                errors.push(format!("blocking terrain class {i} is empty"));
            } else if self.blocking_terrain[..i].contains(class) {
                errors.push(format!("blocking terrain class '{class}' is listed twice"));
            }
        }

        errors
    }
}
