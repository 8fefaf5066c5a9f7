//! Movable agents and their per-tick update.
//!
//! An [`Agent`] owns its transform, speed, octant, waypoint queue, sprite
//! animator and cargo hold. Capabilities (speeds, turn rate, blocking
//! terrain, arrival behaviour) are copied from a [`UnitKindData`] at spawn.
//!
//! # Update order
//!
//! Each call to [`Agent::update`] runs:
//! 1. **Waypoints** - refresh the destination from the queue front, dropping
//!    the front once it is reached
//! 2. **Steering** - compute speed and travel direction
//! 3. **Collision probe** - commit the displacement or roll back the last one
//! 4. **Arrival** - stop, then apply the kind's arrival behaviour
//! 5. **Octant** - quantize the travel direction, slowing down on a change
//! 6. **Animation** - advance the sprite frame

use serde::{Deserialize, Serialize};

use crate::animation::Animator;
use crate::cargo::{CargoHold, Resource, ResourceStore};
use crate::data::{ArrivalBehavior, UnitKindData};
use crate::direction::{quantize_direction, Octant};
use crate::error::{NavError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::movement::{penalized_speed, probe_blocked, MoveOutcome};
use crate::pathfinding::{plan_waypoints, NavGrid};
use crate::steering::{steer, MotionLimits, SteeringConfig, SteeringInput};
use crate::terrain::TerrainQuery;
use crate::waypoints::{OrderMode, WaypointQueue};

/// A movable unit under navigation control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    kind: String,
    position: Vec2Fixed,
    destination: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    #[serde(with = "fixed_serde")]
    max_speed: Fixed,
    #[serde(with = "fixed_serde")]
    max_angular_velocity: Fixed,
    #[serde(with = "fixed_serde")]
    heading: Fixed,
    direction: Octant,
    previous_direction: Octant,
    last_movement: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    movement_tolerance: Fixed,
    blocking_terrain: Vec<String>,
    #[serde(with = "fixed_serde::vec")]
    speeds: Vec<Fixed>,
    engine_level: usize,
    waypoints: WaypointQueue,
    is_animating: bool,
    home: Option<Vec2Fixed>,
    arrival: ArrivalBehavior,
    animator: Animator,
    cargo: CargoHold,
}

impl Agent {
    /// Create an idle agent of `kind` at `position`, on engine level 0.
    ///
    /// The agent starts at rest, facing the kind's initial octant, with its
    /// destination set to its position.
    #[must_use]
    pub fn new(kind: &UnitKindData, position: Vec2Fixed) -> Self {
        let max_speed = kind.max_speed(0).unwrap_or(Fixed::ZERO);

        Self {
            kind: kind.id.clone(),
            position,
            destination: position,
            speed: Fixed::ZERO,
            max_speed,
            max_angular_velocity: kind.max_angular_velocity,
            heading: kind.initial_facing.travel_angle(),
            direction: kind.initial_facing,
            previous_direction: Octant::North,
            last_movement: Vec2Fixed::ZERO,
            movement_tolerance: kind.movement_tolerance,
            blocking_terrain: kind.blocking_terrain.clone(),
            speeds: kind.speeds.clone(),
            engine_level: 0,
            waypoints: WaypointQueue::new(),
            is_animating: false,
            home: None,
            arrival: kind.arrival,
            animator: Animator::new(kind.frames_per_direction, kind.frame_length),
            cargo: CargoHold::new(kind.capacity),
        }
    }

    /// Set the position used by [`ArrivalBehavior::ReturnHome`].
    #[must_use]
    pub fn with_home(mut self, home: Vec2Fixed) -> Self {
        self.home = Some(home);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Unit kind id.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Current steering target.
    #[must_use]
    pub const fn destination(&self) -> Vec2Fixed {
        self.destination
    }

    /// Current speed (distance per tick).
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Top speed at the current engine level.
    #[must_use]
    pub const fn max_speed(&self) -> Fixed {
        self.max_speed
    }

    /// Most the speed may change in one second.
    #[must_use]
    pub fn max_speed_delta(&self) -> Fixed {
        self.motion_limits().max_speed_delta()
    }

    /// Physical limits fed to the steering model.
    #[must_use]
    pub const fn motion_limits(&self) -> MotionLimits {
        MotionLimits {
            max_speed: self.max_speed,
            max_angular_velocity: self.max_angular_velocity,
        }
    }

    /// Facing angle in radians.
    #[must_use]
    pub const fn heading(&self) -> Fixed {
        self.heading
    }

    /// Current compass octant.
    #[must_use]
    pub const fn direction(&self) -> Octant {
        self.direction
    }

    /// Octant at the end of the previous update.
    #[must_use]
    pub const fn previous_direction(&self) -> Octant {
        self.previous_direction
    }

    /// Displacement applied by the last successful move.
    #[must_use]
    pub const fn last_movement(&self) -> Vec2Fixed {
        self.last_movement
    }

    /// Arrival radius.
    #[must_use]
    pub const fn movement_tolerance(&self) -> Fixed {
        self.movement_tolerance
    }

    /// Terrain classes this agent cannot cross.
    #[must_use]
    pub fn blocking_terrain(&self) -> &[String] {
        &self.blocking_terrain
    }

    /// Selected engine level.
    #[must_use]
    pub const fn engine_level(&self) -> usize {
        self.engine_level
    }

    /// Queued waypoints.
    #[must_use]
    pub const fn waypoints(&self) -> &WaypointQueue {
        &self.waypoints
    }

    /// Whether the last update moved the agent.
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.is_animating
    }

    /// Home position, if any.
    #[must_use]
    pub const fn home(&self) -> Option<Vec2Fixed> {
        self.home
    }

    /// Behaviour on reaching the final destination.
    #[must_use]
    pub const fn arrival(&self) -> ArrivalBehavior {
        self.arrival
    }

    /// Sprite frame index.
    #[must_use]
    pub const fn current_frame(&self) -> u32 {
        self.animator.current_frame()
    }

    /// Sprite animator.
    #[must_use]
    pub const fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Cargo carried.
    #[must_use]
    pub const fn cargo(&self) -> &CargoHold {
        &self.cargo
    }

    /// Whether the agent is within the movement tolerance of its destination.
    #[must_use]
    pub fn is_at_destination(&self) -> bool {
        self.position.distance_squared(self.destination)
            < self.movement_tolerance * self.movement_tolerance
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Set the speed directly, e.g. when placing an agent that is already moving.
    pub fn set_speed(&mut self, speed: Fixed) {
        self.speed = speed.max(Fixed::ZERO);
    }

    /// Set the steering target directly.
    ///
    /// The next update overrides it if waypoints are queued.
    pub fn set_destination(&mut self, destination: Vec2Fixed) {
        self.destination = destination;
    }

    /// Set or clear the home position.
    pub fn set_home(&mut self, home: Option<Vec2Fixed>) {
        self.home = home;
    }

    /// Issue a move order.
    ///
    /// [`OrderMode::Replace`] drops queued waypoints, [`OrderMode::Append`]
    /// visits `point` after them.
    pub fn order_move(&mut self, point: Vec2Fixed, mode: OrderMode) {
        self.waypoints.order(point, mode);
    }

    /// Queue a whole route.
    pub fn follow_route(&mut self, route: &[Vec2Fixed], mode: OrderMode) {
        if mode == OrderMode::Replace {
            self.waypoints.clear();
        }
        self.waypoints.extend(route.iter().copied());
    }

    /// Plan a grid route to `goal` and queue it. Returns the number of
    /// waypoints queued.
    ///
    /// The start cell is dropped and the last waypoint is `goal` itself.
    ///
    /// # Errors
    ///
    /// Returns `NavError::InvalidState` if no route exists.
    pub fn route_to(&mut self, grid: &NavGrid, goal: Vec2Fixed, mode: OrderMode) -> Result<usize> {
        let waypoints = plan_waypoints(grid, self.position, goal)?;
        self.follow_route(&waypoints, mode);
        Ok(waypoints.len())
    }

    /// Select an engine level. The new top speed also becomes the current speed.
    ///
    /// # Errors
    ///
    /// Returns `NavError::InvalidEngineLevel` if the kind has no such level.
    pub fn set_engine_level(&mut self, level: usize) -> Result<()> {
        let max_speed = self
            .speeds
            .get(level)
            .copied()
            .ok_or_else(|| NavError::InvalidEngineLevel {
                kind: self.kind.clone(),
                level,
            })?;

        self.engine_level = level;
        self.max_speed = max_speed;
        self.speed = max_speed;
        tracing::debug!(kind = %self.kind, level, %max_speed, "Engine level changed");
        Ok(())
    }

    /// Load one cargo unit of `resource` from `store`.
    pub fn load(&mut self, resource: Resource, store: &mut ResourceStore) -> bool {
        self.cargo.load(resource, store)
    }

    /// Deliver one cargo unit of `resource` to `store`.
    pub fn unload(&mut self, resource: Resource, store: &mut ResourceStore, within_range: bool) -> bool {
        self.cargo.unload(resource, store, within_range)
    }

    /// Undo the last movement and retarget one more step back.
    ///
    /// Subtracts `last_movement` from the position, then sets the destination
    /// to `position - last_movement`. Calling it twice in a row steps back
    /// twice.
    pub fn collision(&mut self) {
        self.position -= self.last_movement;
        self.destination = self.position - self.last_movement;
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Advance the agent by `dt` seconds.
    pub fn update<T>(&mut self, dt: Fixed, config: SteeringConfig, terrain: &T) -> MoveOutcome
    where
        T: TerrainQuery + ?Sized,
    {
        let mut outcome = MoveOutcome {
            waypoint_reached: self.advance_waypoints(),
            ..MoveOutcome::default()
        };

        let mut direction = self.destination - self.position;

        if self.destination != self.position && !self.is_at_destination() {
            let steered = steer(
                &SteeringInput {
                    position: self.position,
                    destination: self.destination,
                    heading: self.heading,
                    speed: self.speed,
                    limits: self.motion_limits(),
                    dt,
                },
                config,
            );
            self.speed = steered.speed;
            self.heading = steered.heading;
            direction = steered.direction;

            if probe_blocked(terrain, self.position, direction, self.blocking_terrain.as_slice()) {
                self.collision();
                self.is_animating = false;
                outcome.collided = true;
                tracing::trace!(kind = %self.kind, position = ?self.position, "Collision rollback");
            } else {
                let displacement = direction * self.speed;
                self.position += displacement;
                self.last_movement = displacement;
                self.is_animating = true;
                outcome.moved = true;
            }
        }

        if self.destination != self.position && self.is_at_destination() {
            self.destination = self.position;
            self.speed = Fixed::ZERO;
            outcome.arrived = true;
            self.apply_arrival_behavior();
        }

        if !self.is_at_destination() {
            self.direction = quantize_direction(direction);
        }
        if self.direction != self.previous_direction {
            self.speed = penalized_speed(self.speed, self.max_speed);
        }
        self.previous_direction = self.direction;

        self.animator.advance(dt, self.direction);

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        outcome
    }

    /// Refresh the destination from the waypoint queue. Returns `true` if
    /// the front waypoint was reached and dropped.
    fn advance_waypoints(&mut self) -> bool {
        let Ok(front) = self.waypoints.peek() else {
            return false;
        };
        self.destination = front;

        if !self.is_at_destination() {
            return false;
        }

        if self.waypoints.dequeue().is_ok() {
            tracing::trace!(kind = %self.kind, remaining = self.waypoints.len(), "Waypoint reached");
        }
        if let Ok(next) = self.waypoints.peek() {
            self.destination = next;
        }
        true
    }

    fn apply_arrival_behavior(&mut self) {
        match self.arrival {
            ArrivalBehavior::Hold => {}
            ArrivalBehavior::ReturnHome { facing } => {
                let Some(home) = self.home else {
                    return;
                };
                // Already home: park facing the requested octant.
                if self.position.distance_squared(home)
                    >= self.movement_tolerance * self.movement_tolerance
                {
                    self.destination = home;
                    tracing::debug!(kind = %self.kind, ?home, "Returning home");
                }
                self.direction = facing;
            }
        }
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        use crate::math::PI;

        if self.speed < Fixed::ZERO {
            tracing::warn!(kind = %self.kind, speed = %self.speed, "Negative speed");
        }
        if self.heading < -PI || self.heading > PI {
            tracing::warn!(kind = %self.kind, heading = %self.heading, "Heading outside [-PI, PI]");
        }
        let frames = self.animator.frames_per_direction() * 8;
        if self.animator.current_frame() >= frames {
            tracing::warn!(
                kind = %self.kind,
                frame = self.animator.current_frame(),
                frames,
                "Sprite frame outside sheet"
            );
        }
    }
}
