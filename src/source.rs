//! The energy ledger.
//!
//! Every path that changes remaining energy (periodic refresh, discrete
//! cost, mobility update, recharge step) runs the same sequence: integrate
//! passive drain since the last observation, apply its own delta, clamp to
//! `[0, initial]`, then run the hysteresis check.

use crate::config::SourceConfig;
use crate::device::{DeviceHandle, DeviceSet};
use crate::error::EnergyError;
use crate::recharge::{RampStep, RechargeRamp};
use crate::scheduler::{Scheduler, SourceAction, TimerId};
use crate::trace::{RemainingEnergyTrace, Subscribers, SubscriptionId};
use crate::transition::{BatteryState, EnergyEvent, Hysteresis};
use joule_core::{passive_drain, DrainPolicy, MobilityCost, Position, PositionTracker, PowerMode, SimTime};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Configured,
    Active,
    Disposed,
}

#[derive(Debug)]
pub struct EnergySource {
    label: String,
    config: SourceConfig,
    remaining: RemainingEnergyTrace,
    state: BatteryState,
    last_update: SimTime,
    lifecycle: Lifecycle,
    update_timer: Option<TimerId>,
    recharge: RechargeRamp,
    tracker: PositionTracker,
    devices: DeviceSet,
    events: Subscribers<(SimTime, EnergyEvent, f64)>,
}

impl EnergySource {
    pub fn new(config: SourceConfig) -> Result<Self, EnergyError> {
        config.validate()?;
        Ok(Self {
            label: "energy-source".to_string(),
            remaining: RemainingEnergyTrace::new(config.initial_energy_j),
            config,
            state: BatteryState::Normal,
            last_update: SimTime::ZERO,
            lifecycle: Lifecycle::Configured,
            update_timer: None,
            recharge: RechargeRamp::default(),
            tracker: PositionTracker::new(),
            devices: DeviceSet::new(),
            events: Subscribers::new(),
        })
    }

    /// Label used in log output.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn initial_energy(&self) -> f64 {
        self.config.initial_energy_j
    }

    pub fn supply_voltage(&self) -> f64 {
        self.config.supply_voltage_v
    }

    pub fn update_interval(&self) -> Duration {
        self.config.update_interval
    }

    pub fn low_threshold(&self) -> f64 {
        self.config.low_battery_threshold
    }

    pub fn high_threshold(&self) -> f64 {
        self.config.high_battery_threshold
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn state(&self) -> BatteryState {
        self.state
    }

    pub fn is_depleted(&self) -> bool {
        self.state == BatteryState::Depleted
    }

    pub fn last_update_time(&self) -> SimTime {
        self.last_update
    }

    /// Remaining energy as of the last update, without integrating drain.
    pub fn stored_energy(&self) -> f64 {
        self.remaining.get()
    }

    pub fn last_position(&self) -> Option<Position> {
        self.tracker.last()
    }

    /// Change capacity before activation. Remaining energy is reset to the new capacity.
    pub fn set_initial_energy(&mut self, joules: f64) -> Result<(), EnergyError> {
        if joules < 0.0 {
            return Err(EnergyError::NegativeInitialEnergy(joules));
        }
        if !joules.is_finite() {
            return Err(EnergyError::InvalidAmount(joules));
        }
        if self.lifecycle != Lifecycle::Configured {
            return Err(EnergyError::InvalidConfig(
                "initial energy is fixed once the source is active".to_string(),
            ));
        }
        self.config.initial_energy_j = joules;
        self.remaining.set(joules);
        self.state = BatteryState::Normal;
        Ok(())
    }

    pub fn set_supply_voltage(&mut self, volts: f64) -> Result<(), EnergyError> {
        if !volts.is_finite() || volts < 0.0 {
            return Err(EnergyError::InvalidAmount(volts));
        }
        self.config.supply_voltage_v = volts;
        Ok(())
    }

    /// Takes effect the next time the periodic refresh is armed.
    pub fn set_update_interval(&mut self, interval: Duration) -> Result<(), EnergyError> {
        if interval.is_zero() {
            return Err(EnergyError::InvalidConfig(
                "update interval must be positive".to_string(),
            ));
        }
        self.config.update_interval = interval;
        Ok(())
    }

    pub fn attach_device(&mut self, device: &DeviceHandle) {
        self.devices.attach(device);
    }

    pub fn find_devices(&self, name: &str) -> Vec<DeviceHandle> {
        self.devices.find(name)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn total_current_a(&mut self) -> f64 {
        self.devices.total_current_a()
    }

    pub fn subscribe_remaining_energy(
        &mut self,
        callback: impl FnMut((f64, f64)) + Send + 'static,
    ) -> SubscriptionId {
        self.remaining.subscribe(callback)
    }

    pub fn unsubscribe_remaining_energy(&mut self, id: SubscriptionId) -> bool {
        self.remaining.unsubscribe(id)
    }

    /// Subscribe to transition and change events as `(time, event, remaining_j)`.
    pub fn subscribe_events(
        &mut self,
        callback: impl FnMut((SimTime, EnergyEvent, f64)) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe_events(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Start the periodic refresh. Drain is integrated from `now` onwards.
    pub fn activate<S: Scheduler + ?Sized>(&mut self, sched: &mut S) {
        if self.lifecycle != Lifecycle::Configured {
            warn!(source = %self.label, lifecycle = ?self.lifecycle, "activate ignored");
            return;
        }
        self.lifecycle = Lifecycle::Active;
        self.last_update = sched.now();
        info!(source = %self.label, initial_j = self.config.initial_energy_j, "energy source active");
        self.update(sched);
    }

    /// Cancel outstanding timers and drop device links.
    ///
    /// Actions still queued for this source afterwards are ignored by [`Self::handle`].
    pub fn dispose<S: Scheduler + ?Sized>(&mut self, sched: &mut S) {
        if let Some(timer) = self.update_timer.take() {
            sched.cancel(timer);
        }
        if let Some(timer) = self.recharge.pending() {
            sched.cancel(timer);
        }
        self.recharge.finish();
        self.devices.clear();
        self.lifecycle = Lifecycle::Disposed;
        debug!(source = %self.label, "energy source disposed");
    }

    /// Deliver a scheduled action back to the source.
    pub fn handle<S: Scheduler + ?Sized>(&mut self, action: SourceAction, sched: &mut S) {
        match (self.lifecycle, action) {
            (Lifecycle::Disposed, _) => {
                debug!(source = %self.label, ?action, "action for disposed source ignored");
            }
            (_, SourceAction::PeriodicUpdate) => self.update(sched),
            (_, SourceAction::RechargeStep) => self.recharge_step(sched),
        }
    }

    /// Periodic refresh path: integrate drain, check transitions, re-arm.
    pub fn update<S: Scheduler + ?Sized>(&mut self, sched: &mut S) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        let before = self.remaining.get();
        self.integrate_drain(sched.now());
        self.settle_transition(before);
        self.arm_update(sched);
    }

    pub fn remaining_energy<S: Scheduler + ?Sized>(&mut self, sched: &mut S) -> f64 {
        self.update(sched);
        self.remaining.get()
    }

    /// `None` for a zero-capacity source.
    pub fn energy_fraction<S: Scheduler + ?Sized>(&mut self, sched: &mut S) -> Option<f64> {
        let remaining = self.remaining_energy(sched);
        if self.config.initial_energy_j == 0.0 {
            return None;
        }
        Some(remaining / self.config.initial_energy_j)
    }

    pub fn power_mode<S: Scheduler + ?Sized>(&mut self, sched: &mut S) -> PowerMode {
        let fraction = self.energy_fraction(sched).unwrap_or(0.0);
        PowerMode::from_fraction(fraction, self.config.low_battery_threshold)
    }

    /// Charge a discrete cost, e.g. a processing task.
    ///
    /// A cost larger than what remains is rejected with
    /// [`EnergyError::Exhausted`] and leaves the ledger unchanged.
    pub fn apply_cost<S: Scheduler + ?Sized>(
        &mut self,
        amount_j: f64,
        sched: &mut S,
    ) -> Result<(), EnergyError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(EnergyError::Disposed);
        }
        if !amount_j.is_finite() || amount_j < 0.0 {
            return Err(EnergyError::InvalidAmount(amount_j));
        }
        let before = self.remaining.get();
        self.integrate_drain(sched.now());
        let outcome = self.charge(amount_j, DrainPolicy::RejectIfInsufficient);
        self.settle_transition(before);
        outcome
    }

    /// Charge movement from the last known position to `(x, y, z)`.
    ///
    /// The first call only records a baseline and returns `Ok(None)`.
    pub fn apply_mobility_update<S: Scheduler + ?Sized>(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        elapsed_s: f64,
        speed: f64,
        sched: &mut S,
    ) -> Result<Option<MobilityCost>, EnergyError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(EnergyError::Disposed);
        }
        if !(speed.is_finite() && speed > 0.0) {
            return Err(EnergyError::InvalidSpeed(speed));
        }
        for v in [x, y, z] {
            if !v.is_finite() {
                return Err(EnergyError::InvalidAmount(v));
            }
        }
        if !elapsed_s.is_finite() || elapsed_s < 0.0 {
            return Err(EnergyError::InvalidAmount(elapsed_s));
        }

        let before = self.remaining.get();
        self.integrate_drain(sched.now());

        let next = Position::new(x, y, z);
        let outcome = match self.tracker.observe(next) {
            None => {
                debug!(source = %self.label, x, y, z, "mobility baseline recorded");
                Ok(None)
            }
            Some(prev) => {
                let cost = self.config.mobility.cost(&prev, &next, elapsed_s, speed);
                debug!(
                    source = %self.label,
                    kind = ?cost.kind,
                    cost_j = cost.total(),
                    "mobility cost"
                );
                self.charge(cost.total(), DrainPolicy::RejectIfInsufficient)
                    .map(|()| Some(cost))
            }
        };

        self.settle_transition(before);
        self.arm_update(sched);
        outcome
    }

    /// Begin a recharge ramp. The first step lands after the configured step delay.
    pub fn start_recharge<S: Scheduler + ?Sized>(&mut self, sched: &mut S) {
        if self.lifecycle == Lifecycle::Disposed {
            warn!(source = %self.label, "recharge requested on disposed source");
            return;
        }
        if self.recharge.is_recharging() {
            debug!(source = %self.label, "recharge already in progress");
            return;
        }
        self.recharge.begin();
        let timer = sched.schedule(self.config.recharge.step_delay, SourceAction::RechargeStep);
        self.recharge.set_pending(Some(timer));
        info!(source = %self.label, "recharge started");
    }

    pub fn recharge_step<S: Scheduler + ?Sized>(&mut self, sched: &mut S) {
        if let Some(timer) = self.recharge.pending() {
            sched.cancel(timer);
        }
        self.recharge.set_pending(None);
        if !self.recharge.is_recharging() {
            return;
        }

        let before = self.remaining.get();
        self.integrate_drain(sched.now());

        let step = RechargeRamp::step(
            self.remaining.get(),
            self.config.initial_energy_j,
            self.config.recharge.step_fraction,
        );
        match step {
            RampStep::Partial(level) => {
                self.set_remaining(level);
                let timer =
                    sched.schedule(self.config.recharge.step_delay, SourceAction::RechargeStep);
                self.recharge.set_pending(Some(timer));
                debug!(source = %self.label, remaining_j = level, "recharge step");
            }
            RampStep::Full(level) => {
                self.set_remaining(level);
                self.recharge.finish();
                info!(source = %self.label, remaining_j = level, "recharge complete");
            }
        }

        self.settle_transition(before);
    }

    pub fn is_recharging(&self) -> bool {
        self.recharge.is_recharging()
    }

    /// True when no recharge ramp is running, including before the first one.
    pub fn is_recharge_complete(&self) -> bool {
        !self.recharge.is_recharging()
    }

    fn integrate_drain(&mut self, now: SimTime) {
        let Some(elapsed) = now.checked_since(self.last_update) else {
            panic!(
                "simulated clock went backwards: now {now}, last update {}",
                self.last_update
            );
        };
        let current_a = self.devices.total_current_a();
        let drain_j = passive_drain(current_a, self.config.supply_voltage_v, elapsed);
        if let Some(level) = DrainPolicy::ClampToZero.settle(self.remaining.get(), drain_j) {
            self.set_remaining(level);
        }
        self.last_update = now;
        debug!(
            source = %self.label,
            current_a,
            drain_j,
            remaining_j = self.remaining.get(),
            "passive drain"
        );
    }

    fn charge(&mut self, cost_j: f64, policy: DrainPolicy) -> Result<(), EnergyError> {
        let remaining_j = self.remaining.get();
        match policy.settle(remaining_j, cost_j) {
            Some(level) => {
                self.set_remaining(level);
                Ok(())
            }
            None => {
                warn!(
                    source = %self.label,
                    requested_j = cost_j,
                    remaining_j,
                    "energy exhausted; cost not applied"
                );
                Err(EnergyError::Exhausted {
                    requested_j: cost_j,
                    remaining_j,
                })
            }
        }
    }

    fn set_remaining(&mut self, joules: f64) {
        self.remaining
            .set(joules.clamp(0.0, self.config.initial_energy_j));
    }

    fn settle_transition(&mut self, before_j: f64) {
        let after_j = self.remaining.get();
        let band = Hysteresis::new(
            self.config.low_battery_threshold,
            self.config.high_battery_threshold,
        );
        let (state, event) =
            band.evaluate(self.state, before_j, after_j, self.config.initial_energy_j);
        self.state = state;
        let Some(event) = event else {
            return;
        };
        match event {
            EnergyEvent::Depleted => {
                info!(source = %self.label, remaining_j = after_j, at = %self.last_update, "energy depleted")
            }
            EnergyEvent::Recharged => {
                info!(source = %self.label, remaining_j = after_j, at = %self.last_update, "energy recharged")
            }
            EnergyEvent::Changed => {}
        }
        self.devices.notify(event);
        self.events.emit((self.last_update, event, after_j));
    }

    fn arm_update<S: Scheduler + ?Sized>(&mut self, sched: &mut S) {
        if self.lifecycle != Lifecycle::Active {
            return;
        }
        let armed = self.update_timer.is_some_and(|t| sched.is_pending(t));
        if !armed {
            self.update_timer =
                Some(sched.schedule(self.config.update_interval, SourceAction::PeriodicUpdate));
        }
    }
}
