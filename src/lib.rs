//! Energy accounting for battery-powered devices in a time-stepped simulation.
//!
//! An [`EnergySource`] tracks remaining energy, drains it by the current its
//! attached devices draw, charges discrete and mobility costs, and fires
//! edge-triggered depletion/recharge events through a hysteresis band.
//! Timers go through an injected [`Scheduler`]; [`Simulation`] drives many
//! sources on one deterministic [`EventQueue`].

pub mod config;
pub mod device;
pub mod error;
pub mod recharge;
pub mod scenario;
pub mod scheduler;
pub mod sim;
pub mod source;
pub mod trace;
pub mod transition;

pub use config::{RechargeConfig, SourceConfig};
pub use device::{ConstantCurrentDevice, DeviceEnergyModel, DeviceHandle, DeviceSet};
pub use error::EnergyError;
pub use joule_core::{
    passive_drain, DrainPolicy, MobilityCost, MobilityModel, MovementKind, Position,
    PositionTracker, PowerMode, SimTime,
};
pub use recharge::{RampStep, RechargeRamp};
pub use scenario::{EventRecord, RecordKind, Scenario, ScenarioReport, Step, TimedStep};
pub use scheduler::{EventQueue, Scheduler, SourceAction, TimerId};
pub use sim::{Simulation, SourceId, SourceScheduler};
pub use source::{EnergySource, Lifecycle};
pub use trace::{RemainingEnergyTrace, Subscribers, SubscriptionId};
pub use transition::{BatteryState, EnergyEvent, Hysteresis};
