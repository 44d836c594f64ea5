//! Energy source configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. Durations are written as fractional seconds.

use crate::error::EnergyError;
use joule_core::MobilityModel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Step-wise recharge ramp parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RechargeConfig {
    /// Fraction of initial energy restored per step.
    pub step_fraction: f64,
    /// Delay before each step, including the first.
    #[serde(with = "secs")]
    pub step_delay: Duration,
}

impl Default for RechargeConfig {
    fn default() -> Self {
        Self {
            step_fraction: 0.2,
            step_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub initial_energy_j: f64,
    pub supply_voltage_v: f64,
    /// Depletion fires at or below this fraction of initial energy.
    pub low_battery_threshold: f64,
    /// Recharge fires above this fraction of initial energy.
    pub high_battery_threshold: f64,
    #[serde(with = "secs")]
    pub update_interval: Duration,
    pub recharge: RechargeConfig,
    pub mobility: MobilityModel,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            initial_energy_j: 10.0,
            supply_voltage_v: 3.0,
            low_battery_threshold: 0.10,
            high_battery_threshold: 0.15,
            update_interval: Duration::from_secs(1),
            recharge: RechargeConfig::default(),
            mobility: MobilityModel::default(),
        }
    }
}

impl SourceConfig {
    pub fn with_initial_energy(mut self, joules: f64) -> Self {
        self.initial_energy_j = joules;
        self
    }

    pub fn with_supply_voltage(mut self, volts: f64) -> Self {
        self.supply_voltage_v = volts;
        self
    }

    pub fn with_thresholds(mut self, low: f64, high: f64) -> Self {
        self.low_battery_threshold = low;
        self.high_battery_threshold = high;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, EnergyError> {
        let config: SourceConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EnergyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| EnergyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the ledger cannot run with.
    ///
    /// An inverted threshold band is accepted (it only makes transitions
    /// chatter) but logged.
    pub fn validate(&self) -> Result<(), EnergyError> {
        if self.initial_energy_j < 0.0 {
            return Err(EnergyError::NegativeInitialEnergy(self.initial_energy_j));
        }
        if !self.initial_energy_j.is_finite() {
            return Err(EnergyError::InvalidConfig(format!(
                "initial energy must be finite, got {}",
                self.initial_energy_j
            )));
        }
        if !self.supply_voltage_v.is_finite() || self.supply_voltage_v < 0.0 {
            return Err(EnergyError::InvalidConfig(format!(
                "supply voltage must be finite and non-negative, got {}",
                self.supply_voltage_v
            )));
        }
        for (name, value) in [
            ("low_battery_threshold", self.low_battery_threshold),
            ("high_battery_threshold", self.high_battery_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EnergyError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.update_interval.is_zero() {
            return Err(EnergyError::InvalidConfig(
                "update interval must be positive".to_string(),
            ));
        }
        let step = self.recharge.step_fraction;
        if !(step > 0.0 && step <= 1.0) {
            return Err(EnergyError::InvalidConfig(format!(
                "recharge step fraction must lie in (0, 1], got {step}"
            )));
        }
        if self.recharge.step_delay.is_zero() {
            return Err(EnergyError::InvalidConfig(
                "recharge step delay must be positive".to_string(),
            ));
        }
        if self.low_battery_threshold >= self.high_battery_threshold {
            warn!(
                low = self.low_battery_threshold,
                high = self.high_battery_threshold,
                "low battery threshold is not below high threshold; transitions will chatter"
            );
        }
        Ok(())
    }
}

mod secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
