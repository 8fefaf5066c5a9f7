//! Sprite frame selection.
//!
//! Sprite sheets hold one row of `frames_per_direction` frames per octant.
//! The animator cycles through the row of the agent's current octant at a
//! fixed frame length.

use serde::{Deserialize, Serialize};

use crate::direction::Octant;
use crate::math::{fixed_serde, Fixed};

/// Frame timer for an agent's sprite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animator {
    frames_per_direction: u32,
    #[serde(with = "fixed_serde")]
    frame_length: Fixed,
    #[serde(with = "fixed_serde")]
    timer: Fixed,
    current_frame: u32,
}

impl Animator {
    /// Create an animator. A zero `frames_per_direction` is treated as one.
    #[must_use]
    pub fn new(frames_per_direction: u32, frame_length: Fixed) -> Self {
        Self {
            frames_per_direction: frames_per_direction.max(1),
            frame_length,
            timer: Fixed::ZERO,
            current_frame: 0,
        }
    }

    /// Advance the timer by `dt` seconds.
    ///
    /// When the timer reaches the frame length it resets and the frame moves
    /// to the next column of `octant`'s row. Returns `true` if the frame
    /// changed.
    pub fn advance(&mut self, dt: Fixed, octant: Octant) -> bool {
        self.timer += dt.max(Fixed::ZERO);
        if self.timer < self.frame_length {
            return false;
        }

        self.timer = Fixed::ZERO;
        let column = (self.current_frame + 1) % self.frames_per_direction;
        self.current_frame = column + u32::from(octant.index()) * self.frames_per_direction;
        true
    }

    /// Index of the current frame in the sprite sheet.
    #[must_use]
    pub const fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Frames in one octant row.
    #[must_use]
    pub const fn frames_per_direction(&self) -> u32 {
        self.frames_per_direction
    }

    /// Seconds each frame is shown.
    #[must_use]
    pub const fn frame_length(&self) -> Fixed {
        self.frame_length
    }
}
