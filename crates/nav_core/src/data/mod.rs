//! Data structures for unit kind configuration.
//!
//! Pure data types deserialized from RON. This module does no IO; reading
//! files is left to the tools crate.

mod unit_data;

pub use unit_data::{ArrivalBehavior, UnitKindData};
