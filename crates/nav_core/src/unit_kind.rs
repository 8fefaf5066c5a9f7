//! Registry of unit kinds.
//!
//! Kinds are keyed by their string id and kept in a sorted map so that
//! iteration order is stable across clients. The builtin kinds reproduce
//! the original vehicle roster:
//!
//! | id       | speeds per engine level | capacity | blocked by       |
//! |----------|-------------------------|----------|------------------|
//! | `car`    | 8, 5, 0                 | 4        | Mountain, Water  |
//! | `truck`  | 6, 4, 2                 | 6        | Mountain, Water  |
//! | `uav`    | 20, 14                  | 4        | nothing          |
//! | `osprey` | 11                      | 35       | nothing          |

use std::collections::BTreeMap;

use crate::data::{ArrivalBehavior, UnitKindData};
use crate::direction::Octant;
use crate::error::{NavError, Result};
use crate::math::Fixed;

/// Terrain classes that stop ground vehicles.
pub const GROUND_BLOCKING: [&str; 2] = ["Mountain", "Water"];

/// Validated unit kinds by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitKindRegistry {
    kinds: BTreeMap<String, UnitKindData>,
}

impl UnitKindRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The four vehicle kinds of the original game.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in builtin_kinds() {
            registry.kinds.insert(kind.id.clone(), kind);
        }
        registry
    }

    /// Parse a RON list of `UnitKindData` and register every entry.
    ///
    /// `label` names the source in error messages (usually a file path).
    ///
    /// # Errors
    ///
    /// Returns `NavError::DataParseError` if the RON is malformed and
    /// `NavError::InvalidUnitData` for the first kind that fails validation.
    pub fn from_ron_str(label: &str, source: &str) -> Result<Self> {
        let kinds: Vec<UnitKindData> =
            ron::from_str(source).map_err(|e| NavError::DataParseError {
                path: label.to_string(),
                message: e.to_string(),
            })?;

        let mut registry = Self::new();
        for kind in kinds {
            registry.insert(kind)?;
        }
        Ok(registry)
    }

    /// Parse a single `UnitKindData` from RON without registering it.
    ///
    /// # Errors
    ///
    /// Returns `NavError::DataParseError` if the RON is malformed.
    pub fn parse_kind(label: &str, source: &str) -> Result<UnitKindData> {
        ron::from_str(source).map_err(|e| NavError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Validate and register a kind, replacing any kind with the same id.
    ///
    /// # Errors
    ///
    /// Returns `NavError::InvalidUnitData` listing every validation problem.
    pub fn insert(&mut self, kind: UnitKindData) -> Result<()> {
        let errors = kind.validate();
        if !errors.is_empty() {
            return Err(NavError::InvalidUnitData {
                kind: kind.id,
                errors,
            });
        }

        if self.kinds.contains_key(&kind.id) {
            tracing::warn!(kind = %kind.id, "Replacing registered unit kind");
        }
        tracing::debug!(kind = %kind.id, levels = kind.speeds.len(), "Registered unit kind");
        self.kinds.insert(kind.id.clone(), kind);
        Ok(())
    }

    /// Look up a kind.
    ///
    /// # Errors
    ///
    /// Returns `NavError::UnknownUnitKind` if `id` is not registered.
    pub fn get(&self, id: &str) -> Result<&UnitKindData> {
        self.kinds
            .get(id)
            .ok_or_else(|| NavError::UnknownUnitKind(id.to_string()))
    }

    /// Check if a kind is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// All registered kinds in id order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitKindData> {
        self.kinds.values()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn speeds(values: &[i32]) -> Vec<Fixed> {
    values.iter().map(|&v| Fixed::from_num(v)).collect()
}

fn builtin_kinds() -> [UnitKindData; 4] {
    let car = UnitKindData {
        name: "Car".to_string(),
        ..UnitKindData::new("car", speeds(&[8, 5, 0]), &GROUND_BLOCKING, 4)
    };

    let truck = UnitKindData {
        name: "Truck".to_string(),
        frames_per_direction: 6,
        ..UnitKindData::new("truck", speeds(&[6, 4, 2]), &GROUND_BLOCKING, 6)
    };

    let uav = UnitKindData {
        name: "UAV".to_string(),
        initial_facing: Octant::SouthWest,
        arrival: ArrivalBehavior::ReturnHome {
            facing: Octant::SouthWest,
        },
        ..UnitKindData::new("uav", speeds(&[20, 14]), &[], 4)
    };

    let osprey = UnitKindData {
        name: "Osprey".to_string(),
        frames_per_direction: 4,
        ..UnitKindData::new("osprey", speeds(&[11]), &[], 35)
    };

    [car, truck, uav, osprey]
}
