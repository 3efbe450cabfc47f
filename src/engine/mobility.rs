//! Node mobility models.
//!
//! Two models cover the scenario: fixed APs use constant position, mobile
//! stations use constant velocity. Positions are evaluated lazily from the
//! current virtual time, so there is no periodic position-update event.

use crate::analytics::types::Position;

/// Velocity vector in meters per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn reversed(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Mobility model of a single node.
#[derive(Debug, Clone)]
pub enum Mobility {
    ConstantPosition(Position),
    ConstantVelocity {
        /// Position at virtual time `since`.
        reference: Position,
        velocity: Velocity,
        since: f64,
    },
}

impl Mobility {
    /// Current position at the given virtual time.
    pub fn position_at(&self, now: f64) -> Position {
        match self {
            Mobility::ConstantPosition(position) => *position,
            Mobility::ConstantVelocity {
                reference,
                velocity,
                since,
            } => {
                let dt = now - since;
                Position::new(
                    reference.x + velocity.x * dt,
                    reference.y + velocity.y * dt,
                    reference.z + velocity.z * dt,
                )
            }
        }
    }

    /// Replace the velocity, rebasing the reference position to `now` so the
    /// trajectory stays continuous. No-op for constant-position nodes.
    pub fn set_velocity(&mut self, now: f64, new_velocity: Velocity) {
        if let Mobility::ConstantVelocity {
            reference,
            velocity,
            since,
        } = self
        {
            *reference = Position::new(
                reference.x + velocity.x * (now - *since),
                reference.y + velocity.y * (now - *since),
                reference.z + velocity.z * (now - *since),
            );
            *since = now;
            *velocity = new_velocity;
        }
    }

    pub fn velocity(&self) -> Velocity {
        match self {
            Mobility::ConstantPosition(_) => Velocity::new(0.0, 0.0, 0.0),
            Mobility::ConstantVelocity { velocity, .. } => *velocity,
        }
    }
}
