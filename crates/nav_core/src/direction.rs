//! Compass octants for sprite-row selection.
//!
//! Octant numbering follows the unit sprite sheets, which are not laid out
//! in angular order; see [`quantize_direction`] for the mapping.

use serde::{Deserialize, Serialize};

use crate::math::{atan2, Fixed, Vec2Fixed, PI, TAU};

/// One of eight compass directions, numbered by sprite-sheet row.
///
/// World coordinates are screen coordinates: +x is east, +y is south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Octant {
    /// Row 0.
    #[default]
    South = 0,
    /// Row 1.
    SouthWest = 1,
    /// Row 2.
    West = 2,
    /// Row 3.
    NorthWest = 3,
    /// Row 4.
    North = 4,
    /// Row 5.
    NorthEast = 5,
    /// Row 6.
    East = 6,
    /// Row 7.
    SouthEast = 7,
}

/// Offset between the angular sector index and the sprite-sheet row.
const SPRITE_ROW_OFFSET: u8 = 2;

impl Octant {
    /// All octants in row order.
    pub const ALL: [Self; 8] = [
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
    ];

    /// Sprite row index (0..8).
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Octant for a row index, wrapping modulo 8.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        Self::ALL[(index % 8) as usize]
    }

    /// Travel heading (radians, `[-PI, PI)`) that quantizes to this octant.
    #[must_use]
    pub fn travel_angle(self) -> Fixed {
        let sector = (self.index() + 8 - SPRITE_ROW_OFFSET) % 8;
        // The quantizer measures the reversed vector, hence the half turn.
        Fixed::from_num(sector) * PI / Fixed::from_num(4) - PI
    }

    /// Unit vector pointing along [`travel_angle`](Self::travel_angle).
    #[must_use]
    pub fn unit_vector(self) -> Vec2Fixed {
        Vec2Fixed::from_angle(self.travel_angle())
    }
}

/// Map a movement vector to the octant used for its sprite row.
///
/// The angle is measured on the reversed vector, `atan2(-dy, -dx)`,
/// normalized into `[0, 2PI)`, rounded to one of eight sectors and then
/// shifted by two rows to match the sprite sheet. Only the angle matters,
/// so any positive scaling of the input gives the same octant. The zero
/// vector maps to [`Octant::West`].
#[must_use]
pub fn quantize_direction(movement: Vec2Fixed) -> Octant {
    let mut angle = atan2(-movement.y, -movement.x);
    if angle < Fixed::ZERO {
        angle += TAU;
    }
    let sector = nearest_sector(angle * Fixed::from_num(8) / TAU);
    let sector = sector.rem_euclid(8) as u8;
    Octant::from_index(sector + SPRITE_ROW_OFFSET)
}

/// Round a fractional sector index, sending exact halves to the even sector.
fn nearest_sector(scaled: Fixed) -> i64 {
    scaled.round_ties_to_even().to_num::<i64>()
}
