//! Deterministic driver for many energy sources on one timeline.

use crate::scheduler::{EventQueue, Scheduler, SourceAction, TimerId};
use crate::source::EnergySource;
use joule_core::SimTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub usize);

/// A shared queue seen through the eyes of one source.
pub struct SourceScheduler<'a> {
    queue: &'a mut EventQueue<(SourceId, SourceAction)>,
    source: SourceId,
}

impl<'a> SourceScheduler<'a> {
    pub fn new(queue: &'a mut EventQueue<(SourceId, SourceAction)>, source: SourceId) -> Self {
        Self { queue, source }
    }
}

impl Scheduler for SourceScheduler<'_> {
    fn now(&self) -> SimTime {
        self.queue.now()
    }

    fn schedule(&mut self, delay: Duration, action: SourceAction) -> TimerId {
        self.queue.push(delay, (self.source, action))
    }

    fn cancel(&mut self, timer: TimerId) {
        self.queue.cancel(timer);
    }

    fn is_pending(&self, timer: TimerId) -> bool {
        self.queue.is_pending(timer)
    }
}

#[derive(Debug, Default)]
pub struct Simulation {
    queue: EventQueue<(SourceId, SourceAction)>,
    sources: Vec<Option<EnergySource>>,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn add_source(&mut self, source: EnergySource) -> SourceId {
        self.sources.push(Some(source));
        SourceId(self.sources.len() - 1)
    }

    pub fn source(&self, id: SourceId) -> Option<&EnergySource> {
        self.sources.get(id.0).and_then(Option::as_ref)
    }

    /// Run `f` against one source with a scheduler bound to it.
    pub fn with_source<R>(
        &mut self,
        id: SourceId,
        f: impl FnOnce(&mut EnergySource, &mut SourceScheduler<'_>) -> R,
    ) -> Option<R> {
        let source = self.sources.get_mut(id.0)?.as_mut()?;
        let mut sched = SourceScheduler::new(&mut self.queue, id);
        Some(f(source, &mut sched))
    }

    pub fn activate(&mut self, id: SourceId) -> bool {
        self.with_source(id, |src, sched| src.activate(sched)).is_some()
    }

    pub fn activate_all(&mut self) {
        for i in 0..self.sources.len() {
            self.activate(SourceId(i));
        }
    }

    /// Dispose a source and take it out of the simulation. Its queued actions are dropped.
    pub fn remove(&mut self, id: SourceId) -> Option<EnergySource> {
        self.with_source(id, |src, sched| src.dispose(sched))?;
        self.sources.get_mut(id.0)?.take()
    }

    /// Deliver every action due at or before `until`, then park the clock at `until`.
    pub fn run_until(&mut self, until: SimTime) -> usize {
        let mut delivered = 0;
        while let Some((at, _, (id, action))) = self.queue.pop_due(until) {
            let Some(source) = self.sources.get_mut(id.0).and_then(Option::as_mut) else {
                debug!(?id, ?action, %at, "action for removed source dropped");
                continue;
            };
            let mut sched = SourceScheduler::new(&mut self.queue, id);
            source.handle(action, &mut sched);
            delivered += 1;
        }
        self.queue.advance_to(until);
        delivered
    }

    pub fn run_for(&mut self, span: Duration) -> usize {
        let until = self.now() + span;
        self.run_until(until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::device::{ConstantCurrentDevice, DeviceHandle};

    #[test]
    fn test_sources_tick_independently() {
        let mut sim = Simulation::new();
        let fast = sim.add_source(
            EnergySource::new(SourceConfig::default().with_update_interval(Duration::from_millis(500)))
                .unwrap(),
        );
        let slow = sim.add_source(
            EnergySource::new(SourceConfig::default().with_update_interval(Duration::from_secs(2)))
                .unwrap(),
        );
        sim.activate_all();
        assert_eq!(sim.pending_events(), 2);

        // fast: 0.5..=4.0 -> 8 ticks, slow: 2, 4 -> 2 ticks
        let delivered = sim.run_until(SimTime::from_secs(4));
        assert_eq!(delivered, 10);
        assert_eq!(sim.now(), SimTime::from_secs(4));
        assert_eq!(sim.source(fast).unwrap().last_update_time(), SimTime::from_secs(4));
        assert_eq!(sim.source(slow).unwrap().last_update_time(), SimTime::from_secs(4));
    }

    #[test]
    fn test_with_source_drains_to_now() {
        let mut sim = Simulation::new();
        let mut src = EnergySource::new(SourceConfig::default().with_supply_voltage(2.0)).unwrap();
        let led: DeviceHandle = ConstantCurrentDevice::new("led", 0.25).into_handle();
        src.attach_device(&led);
        let id = sim.add_source(src);
        sim.activate(id);

        sim.run_until(SimTime::from_secs_f64(2.5));
        let remaining = sim.with_source(id, |s, sched| s.remaining_energy(sched)).unwrap();
        assert!((remaining - 8.75).abs() < 1e-9);
    }

    #[test]
    fn test_removed_source_events_are_dropped() {
        let mut sim = Simulation::new();
        let a = sim.add_source(EnergySource::new(SourceConfig::default()).unwrap());
        let b = sim.add_source(EnergySource::new(SourceConfig::default()).unwrap());
        sim.activate_all();

        let removed = sim.remove(a).unwrap();
        assert_eq!(removed.lifecycle(), crate::source::Lifecycle::Disposed);
        assert!(sim.source(a).is_none());
        assert!(sim.remove(a).is_none());

        assert_eq!(sim.run_until(SimTime::from_secs(3)), 3);
        assert!(sim.source(b).is_some());
    }
}
