//! Embeddable core for joule: simulated time, position tracking, consumption models, power modes.

pub mod consumption;
pub mod mode;
pub mod position;
pub mod time;

pub use consumption::{passive_drain, DrainPolicy, MobilityCost, MobilityModel, MovementKind};
pub use mode::PowerMode;
pub use position::{Position, PositionTracker};
pub use time::SimTime;
