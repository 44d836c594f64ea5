//! Step-wise recharge ramp.

use crate::scheduler::TimerId;

/// Outcome of one ramp step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampStep {
    /// Energy after the step; another step should follow.
    Partial(f64),
    /// The ramp snapped to full capacity and is done.
    Full(f64),
}

/// Ramp bookkeeping: whether a ramp is running and the token of its next step.
#[derive(Debug, Clone, Default)]
pub struct RechargeRamp {
    recharging: bool,
    pending: Option<TimerId>,
}

impl RechargeRamp {
    pub fn is_recharging(&self) -> bool {
        self.recharging
    }

    pub fn pending(&self) -> Option<TimerId> {
        self.pending
    }

    pub(crate) fn begin(&mut self) {
        self.recharging = true;
    }

    pub(crate) fn set_pending(&mut self, timer: Option<TimerId>) {
        self.pending = timer;
    }

    pub(crate) fn finish(&mut self) {
        self.recharging = false;
        self.pending = None;
    }

    /// Next energy level given the current one. The last step lands exactly on `initial_j`.
    pub fn step(remaining_j: f64, initial_j: f64, step_fraction: f64) -> RampStep {
        let next = remaining_j + initial_j * step_fraction;
        if next < initial_j {
            RampStep::Partial(next)
        } else {
            RampStep::Full(initial_j)
        }
    }
}
