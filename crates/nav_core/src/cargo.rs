//! Cargo transfer between vehicles and resource buildings.
//!
//! A vehicle carries whole cargo units; a building stores raw amounts.
//! One cargo unit is worth [`AMOUNT_PER_CARGO`] of the building's stock.

use serde::{Deserialize, Serialize};

/// Stock moved by one cargo unit.
pub const AMOUNT_PER_CARGO: u32 = 50;

/// Transportable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    /// Food supplies.
    Food,
    /// Medical supplies.
    Medicine,
}

impl Resource {
    /// Both resources.
    pub const ALL: [Self; 2] = [Self::Food, Self::Medicine];
}

/// Vehicle-side cargo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CargoHold {
    /// Food cargo units.
    pub food: u32,
    /// Medicine cargo units.
    pub medicine: u32,
    /// Max total cargo units.
    pub capacity: u32,
}

/// Building-side stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceStore {
    /// Food stock.
    pub food: u32,
    /// Medicine stock.
    pub medicine: u32,
    /// Destroyed buildings accept no deliveries.
    pub alive: bool,
}

impl ResourceStore {
    /// A live building with the given stock.
    #[must_use]
    pub const fn new(food: u32, medicine: u32) -> Self {
        Self {
            food,
            medicine,
            alive: true,
        }
    }

    /// Stock of one resource.
    #[must_use]
    pub const fn amount(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Food => self.food,
            Resource::Medicine => self.medicine,
        }
    }

    fn amount_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Food => &mut self.food,
            Resource::Medicine => &mut self.medicine,
        }
    }
}

impl CargoHold {
    /// An empty hold.
    #[must_use]
    pub const fn new(capacity: u32) -> Self {
        Self {
            food: 0,
            medicine: 0,
            capacity,
        }
    }

    /// Cargo units of one resource.
    #[must_use]
    pub const fn amount(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Food => self.food,
            Resource::Medicine => self.medicine,
        }
    }

    fn amount_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Food => &mut self.food,
            Resource::Medicine => &mut self.medicine,
        }
    }

    /// Total cargo units carried.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.food + self.medicine
    }

    /// Check if the hold has room for another unit.
    #[must_use]
    pub const fn has_room(&self) -> bool {
        self.total() < self.capacity
    }

    /// Take one cargo unit of `resource` from `store`.
    ///
    /// Does nothing unless the hold has room and the store has at least
    /// [`AMOUNT_PER_CARGO`]. Returns `true` if a unit was loaded.
    pub fn load(&mut self, resource: Resource, store: &mut ResourceStore) -> bool {
        if !self.has_room() || store.amount(resource) < AMOUNT_PER_CARGO {
            return false;
        }

        *self.amount_mut(resource) += 1;
        *store.amount_mut(resource) -= AMOUNT_PER_CARGO;
        tracing::trace!(?resource, carried = self.total(), "Loaded cargo");
        true
    }

    /// Deliver one cargo unit of `resource` to `store`.
    ///
    /// Does nothing unless the hold carries some, the store is alive and the
    /// vehicle is within range. Returns `true` if a unit was delivered.
    pub fn unload(&mut self, resource: Resource, store: &mut ResourceStore, within_range: bool) -> bool {
        if self.amount(resource) == 0 || !store.alive || !within_range {
            return false;
        }

        *self.amount_mut(resource) -= 1;
        let stock = store.amount_mut(resource);
        *stock = stock.saturating_add(AMOUNT_PER_CARGO);
        tracing::trace!(?resource, carried = self.total(), "Unloaded cargo");
        true
    }
}
