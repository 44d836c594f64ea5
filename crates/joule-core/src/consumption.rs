//! Consumption calculator.
//!
//! Pure functions mapping current draw and movement onto an energy delta in
//! Joules. Nothing here touches ledger state.

use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Energy drawn by a steady current: `I * V * t`.
pub fn passive_drain(current_a: f64, voltage_v: f64, elapsed: Duration) -> f64 {
    current_a * voltage_v * elapsed.as_secs_f64()
}

/// How a ledger settles a cost that may exceed what remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainPolicy {
    /// Take whatever is left; remaining energy bottoms out at zero.
    ClampToZero,
    /// Leave remaining energy untouched when the cost is larger than it.
    RejectIfInsufficient,
}

impl DrainPolicy {
    /// New remaining energy after charging `cost_j`, or `None` if the cost is rejected.
    pub fn settle(self, remaining_j: f64, cost_j: f64) -> Option<f64> {
        match self {
            DrainPolicy::ClampToZero => Some((remaining_j - cost_j.min(remaining_j)).max(0.0)),
            DrainPolicy::RejectIfInsufficient => {
                if remaining_j >= cost_j {
                    Some(remaining_j - cost_j)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Travel,
    Hover,
}

/// Breakdown of a single mobility charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobilityCost {
    pub kind: MovementKind,
    pub horizontal_j: f64,
    pub vertical_j: f64,
}

impl MobilityCost {
    pub fn total(&self) -> f64 {
        self.horizontal_j + self.vertical_j
    }
}

/// Power constants of the UAV movement model.
///
/// These are model parameters, not physics: tune them per airframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilityModel {
    /// Power drawn while travelling, charged per second of flight (`d / speed`).
    pub horizontal_power: f64,
    /// Power drawn while hovering, charged per elapsed second.
    pub hover_power: f64,
    /// Power drawn per second spent climbing.
    pub climb_power: f64,
    /// Power drawn per second spent descending.
    pub descend_power: f64,
    /// Horizontal displacement (m) at or below which movement counts as hovering.
    pub hover_radius_m: f64,
}

impl Default for MobilityModel {
    fn default() -> Self {
        Self {
            horizontal_power: 200.0,
            hover_power: 10.0,
            climb_power: 5.0,
            descend_power: 3.0,
            hover_radius_m: 0.5,
        }
    }
}

impl MobilityModel {
    /// Energy spent going from `prev` to `next`.
    ///
    /// `elapsed_s` is only used for hovering; travel and altitude changes are
    /// charged by time-in-motion derived from `speed`.
    pub fn cost(&self, prev: &Position, next: &Position, elapsed_s: f64, speed: f64) -> MobilityCost {
        let distance = prev.horizontal_distance(next);
        let (kind, horizontal_j) = if distance > self.hover_radius_m {
            (MovementKind::Travel, self.horizontal_power * (distance / speed))
        } else {
            (MovementKind::Hover, self.hover_power * elapsed_s)
        };

        let climb = prev.altitude_delta(next);
        let vertical_j = if climb > 0.0 {
            self.climb_power * (climb / speed)
        } else if climb < 0.0 {
            self.descend_power * (climb.abs() / speed)
        } else {
            0.0
        };

        MobilityCost {
            kind,
            horizontal_j,
            vertical_j,
        }
    }
}
