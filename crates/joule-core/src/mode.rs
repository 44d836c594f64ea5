use serde::{Deserialize, Serialize};

/// Coarse view of a battery for consumers that only care about broad bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PowerMode {
    Normal,
    LowBattery,
    Critical,
}

impl PowerMode {
    /// Classify an energy fraction. `critical_fraction` is normally the low battery threshold.
    pub fn from_fraction(fraction: f64, critical_fraction: f64) -> Self {
        if fraction.is_nan() || fraction <= critical_fraction {
            PowerMode::Critical
        } else if fraction < 0.5 {
            PowerMode::LowBattery
        } else {
            PowerMode::Normal
        }
    }
}
