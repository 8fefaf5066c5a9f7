//! Ordered destination points an agent visits in sequence.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::math::Vec2Fixed;

/// How a new move order combines with the queued waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderMode {
    /// Drop queued waypoints and head for the new point.
    #[default]
    Replace,
    /// Visit the new point after the queued ones.
    Append,
}

/// FIFO queue of waypoints.
///
/// The front element is the agent's current steering target. No
/// deduplication or collision pre-checking is done on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointQueue {
    points: VecDeque<Vec2Fixed>,
}

impl WaypointQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waypoint at the back.
    pub fn enqueue(&mut self, point: Vec2Fixed) {
        self.points.push_back(point);
    }

    /// Apply a move order.
    pub fn order(&mut self, point: Vec2Fixed, mode: OrderMode) {
        if mode == OrderMode::Replace {
            self.clear();
        }
        self.enqueue(point);
    }

    /// The current target.
    ///
    /// # Errors
    ///
    /// Returns `NavError::EmptyWaypointQueue` if there are no waypoints.
    pub fn peek(&self) -> Result<Vec2Fixed> {
        self.points.front().copied().ok_or(NavError::EmptyWaypointQueue)
    }

    /// Remove and return the current target.
    ///
    /// # Errors
    ///
    /// Returns `NavError::EmptyWaypointQueue` if there are no waypoints.
    pub fn dequeue(&mut self) -> Result<Vec2Fixed> {
        self.points.pop_front().ok_or(NavError::EmptyWaypointQueue)
    }

    /// Remove every waypoint.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Number of queued waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Vec2Fixed> {
        self.points.iter()
    }
}

impl Extend<Vec2Fixed> for WaypointQueue {
    fn extend<I: IntoIterator<Item = Vec2Fixed>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}
