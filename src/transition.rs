//! Depletion/recharge hysteresis.
//!
//! Two states with edge-triggered events: `Depleted` fires once on the way
//! down through the low threshold, `Recharged` once on the way up through the
//! high threshold. Inside the band only `Changed` can fire.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatteryState {
    #[default]
    Normal,
    Depleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyEvent {
    Depleted,
    Recharged,
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hysteresis {
    pub low_fraction: f64,
    pub high_fraction: f64,
}

impl Hysteresis {
    pub fn new(low_fraction: f64, high_fraction: f64) -> Self {
        Self {
            low_fraction,
            high_fraction,
        }
    }

    /// Next state and the event to emit, given the value before and after a mutation.
    pub fn evaluate(
        &self,
        state: BatteryState,
        before_j: f64,
        after_j: f64,
        initial_j: f64,
    ) -> (BatteryState, Option<EnergyEvent>) {
        match state {
            BatteryState::Normal if after_j <= self.low_fraction * initial_j => {
                (BatteryState::Depleted, Some(EnergyEvent::Depleted))
            }
            BatteryState::Depleted if after_j > self.high_fraction * initial_j => {
                (BatteryState::Normal, Some(EnergyEvent::Recharged))
            }
            _ if after_j != before_j => (state, Some(EnergyEvent::Changed)),
            _ => (state, None),
        }
    }
}
