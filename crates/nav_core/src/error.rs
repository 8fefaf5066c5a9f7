//! Error types for the navigation core.

use thiserror::Error;

/// Result type alias using [`NavError`].
pub type Result<T> = std::result::Result<T, NavError>;

/// Top-level error type for navigation errors.
///
/// Collisions and "no path" outcomes are not errors: a collision is a
/// regular result of a movement step, and the generic pathfinder returns
/// `None` when the destination is unreachable.
#[derive(Debug, Error)]
pub enum NavError {
    /// Peeked or dequeued an empty waypoint queue.
    #[error("Waypoint queue is empty")]
    EmptyWaypointQueue,

    /// Unit kind identifier is not registered.
    #[error("Unknown unit kind: {0}")]
    UnknownUnitKind(String),

    /// Agent identifier is not present in the world.
    #[error("Agent not found: {0}")]
    UnknownAgent(u64),

    /// Engine level is not defined for the unit kind.
    #[error("Unit kind '{kind}' has no engine level {level}")]
    InvalidEngineLevel {
        /// Unit kind identifier.
        kind: String,
        /// Requested engine level.
        level: usize,
    },

    /// Data parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Path or label of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Unit kind data failed validation.
    #[error("Invalid unit kind '{kind}': {errors:?}")]
    InvalidUnitData {
        /// Unit kind identifier.
        kind: String,
        /// Validation problems found.
        errors: Vec<String>,
    },

    /// Invalid navigation state.
    #[error("Invalid navigation state: {0}")]
    InvalidState(String),
}
