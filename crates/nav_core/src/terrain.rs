//! Terrain queries used for collision sampling.
//!
//! The navigation core only asks one question of the terrain: is this
//! world point blocked for this terrain class? [`TerrainQuery`] is that
//! seam. [`CollisionMap`] is the tile-based implementation: each terrain
//! class is a layer of tile references into a shared set of per-pixel
//! alpha masks, loaded once and never mutated afterwards.

use std::collections::BTreeMap;

use crate::error::{NavError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding::{CellType, NavGrid};

/// Read-only terrain capability consumed by the movement step.
pub trait TerrainQuery {
    /// Whether `point` is blocked for agents that cannot cross `terrain_class`.
    fn is_blocked(&self, point: Vec2Fixed, terrain_class: &str) -> bool;
}

impl<F> TerrainQuery for F
where
    F: Fn(Vec2Fixed, &str) -> bool,
{
    fn is_blocked(&self, point: Vec2Fixed, terrain_class: &str) -> bool {
        self(point, terrain_class)
    }
}

/// Terrain with nothing on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenTerrain;

impl TerrainQuery for OpenTerrain {
    fn is_blocked(&self, _point: Vec2Fixed, _terrain_class: &str) -> bool {
        false
    }
}

/// Per-pixel alpha of one collision tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionMask {
    size: u32,
    alpha: Vec<u8>,
}

impl CollisionMask {
    /// A mask whose every pixel is fully opaque.
    #[must_use]
    pub fn opaque(size: u32) -> Self {
        Self {
            size,
            alpha: vec![u8::MAX; (size as usize) * (size as usize)],
        }
    }

    /// A mask from row-major alpha values.
    ///
    /// # Errors
    ///
    /// Returns `NavError::InvalidState` if `alpha` is not `size * size` long.
    pub fn from_alpha(size: u32, alpha: Vec<u8>) -> Result<Self> {
        let expected = (size as usize) * (size as usize);
        if alpha.len() != expected {
            return Err(NavError::InvalidState(format!(
                "Collision mask needs {expected} alpha values, got {}",
                alpha.len()
            )));
        }
        Ok(Self { size, alpha })
    }

    /// Alpha at a pixel inside the tile, clamped to the tile edge.
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let last = self.size.saturating_sub(1);
        let (x, y) = (x.min(last), y.min(last));
        self.alpha
            .get((y as usize) * (self.size as usize) + (x as usize))
            .copied()
            .unwrap_or(0)
    }
}

/// Tile-based collision data, one layer per terrain class.
#[derive(Debug, Clone)]
pub struct CollisionMap {
    columns: u32,
    rows: u32,
    tile_size: u32,
    masks: Vec<CollisionMask>,
    layers: BTreeMap<String, Vec<Option<usize>>>,
}

impl CollisionMap {
    /// Create an empty map (no layers, no masks).
    ///
    /// # Panics
    ///
    /// Panics if any dimension is zero.
    #[must_use]
    pub fn new(columns: u32, rows: u32, tile_size: u32) -> Self {
        assert!(columns > 0 && rows > 0, "CollisionMap must have tiles");
        assert!(tile_size > 0, "CollisionMap tile_size must be positive");
        Self {
            columns,
            rows,
            tile_size,
            masks: Vec::new(),
            layers: BTreeMap::new(),
        }
    }

    /// Build a map from ASCII rows.
    ///
    /// Each character listed in `legend` places a fully opaque tile in the
    /// named terrain layer. `.` and space are open ground.
    ///
    /// # Errors
    ///
    /// Returns `NavError::DataParseError` for ragged rows, an empty map or
    /// characters missing from the legend.
    pub fn from_ascii<S: AsRef<str>>(
        rows: &[S],
        tile_size: u32,
        legend: &BTreeMap<char, String>,
    ) -> Result<Self> {
        let parse_error = |message: String| NavError::DataParseError {
            path: "ascii map".to_string(),
            message,
        };

        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        if width == 0 || tile_size == 0 {
            return Err(parse_error("map is empty".to_string()));
        }

        let mut map = Self::new(width as u32, rows.len() as u32, tile_size);
        let solid = map.add_mask(CollisionMask::opaque(tile_size));
        for class in legend.values() {
            map.add_layer(class);
        }

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(parse_error(format!(
                    "row {y} has {} tiles, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, symbol) in row.chars().enumerate() {
                match symbol {
                    '.' | ' ' => {}
                    other => {
                        let class = legend
                            .get(&other)
                            .ok_or_else(|| parse_error(format!("unknown tile '{other}' at ({x}, {y})")))?;
                        map.set_tile(class, x as u32, y as u32, Some(solid));
                    }
                }
            }
        }

        Ok(map)
    }

    /// Register an alpha mask and return its tile id.
    pub fn add_mask(&mut self, mask: CollisionMask) -> usize {
        self.masks.push(mask);
        self.masks.len() - 1
    }

    /// Ensure a layer exists for `terrain_class`.
    pub fn add_layer(&mut self, terrain_class: &str) {
        let tiles = (self.columns as usize) * (self.rows as usize);
        self.layers
            .entry(terrain_class.to_string())
            .or_insert_with(|| vec![None; tiles]);
    }

    /// Place (or clear) a tile in a layer, creating the layer if needed.
    ///
    /// Returns `false` if the coordinates are outside the map or the tile id
    /// is unknown.
    pub fn set_tile(&mut self, terrain_class: &str, column: u32, row: u32, tile: Option<usize>) -> bool {
        if column >= self.columns || row >= self.rows {
            return false;
        }
        if tile.is_some_and(|id| id >= self.masks.len()) {
            return false;
        }
        self.add_layer(terrain_class);
        let index = (row as usize) * (self.columns as usize) + (column as usize);
        if let Some(layer) = self.layers.get_mut(terrain_class) {
            layer[index] = tile;
        }
        true
    }

    /// Map width in world units.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.columns * self.tile_size
    }

    /// Map height in world units.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.rows * self.tile_size
    }

    /// Tile edge length in world units.
    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Terrain classes with a layer on this map.
    pub fn terrain_classes(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Sample the collision alpha of `terrain_class` at a world point.
    ///
    /// - `None`: no tile (or no layer) for that class there.
    /// - `Some(255)`: the point is outside the map.
    /// - `Some(alpha)`: the mask value of the tile under the point.
    #[must_use]
    pub fn sample_alpha(&self, terrain_class: &str, point: Vec2Fixed) -> Option<u8> {
        if point.x < Fixed::ZERO || point.y < Fixed::ZERO {
            return Some(u8::MAX);
        }
        let px = point.x.to_num::<i64>();
        let py = point.y.to_num::<i64>();
        if px >= i64::from(self.width()) || py >= i64::from(self.height()) {
            return Some(u8::MAX);
        }

        let (px, py) = (px as u32, py as u32);
        let (column, row) = (px / self.tile_size, py / self.tile_size);
        let layer = self.layers.get(terrain_class)?;
        let tile = layer[(row as usize) * (self.columns as usize) + (column as usize)]?;
        let mask = self.masks.get(tile)?;
        Some(mask.alpha_at(px % self.tile_size, py % self.tile_size))
    }

    /// Build a route-planning grid for agents blocked by `blocking_classes`.
    ///
    /// A cell is blocked when the center pixel of its tile is opaque in any
    /// of the classes.
    #[must_use]
    pub fn nav_grid<S: AsRef<str>>(&self, blocking_classes: &[S]) -> NavGrid {
        let half = self.tile_size / 2;
        NavGrid::from_fn(
            self.columns,
            self.rows,
            Fixed::from_num(self.tile_size),
            |x, y| {
                let center = Vec2Fixed::from_ints(
                    (x * self.tile_size + half) as i32,
                    (y * self.tile_size + half) as i32,
                );
                if blocking_classes
                    .iter()
                    .any(|class| self.is_blocked(center, class.as_ref()))
                {
                    CellType::Blocked
                } else {
                    CellType::Walkable
                }
            },
        )
    }
}

impl TerrainQuery for CollisionMap {
    fn is_blocked(&self, point: Vec2Fixed, terrain_class: &str) -> bool {
        self.sample_alpha(terrain_class, point)
            .is_some_and(|alpha| alpha > 0)
    }
}
