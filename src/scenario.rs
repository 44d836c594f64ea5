//! Scripted runs: a source, its devices, and timed external calls.

use crate::config::SourceConfig;
use crate::device::{ConstantCurrentDevice, DeviceHandle};
use crate::error::EnergyError;
use crate::sim::Simulation;
use crate::source::EnergySource;
use crate::transition::EnergyEvent;
use joule_core::{PowerMode, SimTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub current_a: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Move {
        x: f64,
        y: f64,
        z: f64,
        elapsed_s: f64,
        speed: f64,
    },
    Cost {
        joules: f64,
    },
    Recharge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedStep {
    pub at_s: f64,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
    #[serde(default)]
    pub steps: Vec<TimedStep>,
    pub horizon_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Depleted,
    Recharged,
    Exhausted,
}

/// One notable moment of a run. Plain `Changed` events are not recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub time_s: f64,
    pub kind: RecordKind,
    pub remaining_j: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub events: Vec<EventRecord>,
    pub final_remaining_j: f64,
    pub final_mode: PowerMode,
    pub recharge_complete: bool,
}

impl Scenario {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EnergyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| EnergyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// A seeded random-waypoint flight: `legs` moves inside a 100 m box,
    /// a payload-processing cost every third leg, and a dock-and-recharge at the end.
    pub fn random_flight(seed: u64, legs: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let speed = 4.0;
        let mut steps = vec![TimedStep {
            at_s: 0.0,
            step: Step::Move {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                elapsed_s: 0.0,
                speed,
            },
        }];
        let mut t = 0.0;
        for leg in 0..legs {
            let elapsed_s = rng.random_range(1.0..10.0_f64).round();
            t += elapsed_s;
            let (x, y, z) = (
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..30.0),
            );
            steps.push(TimedStep {
                at_s: t,
                step: Step::Move {
                    x,
                    y,
                    z,
                    elapsed_s,
                    speed,
                },
            });
            if leg % 3 == 2 {
                steps.push(TimedStep {
                    at_s: t,
                    step: Step::Cost {
                        joules: rng.random_range(1.0..50.0),
                    },
                });
            }
        }
        steps.push(TimedStep {
            at_s: t + 1.0,
            step: Step::Recharge,
        });

        Scenario {
            source: SourceConfig::default().with_initial_energy(20_000.0),
            devices: vec![
                DeviceSpec {
                    name: "radio".to_string(),
                    current_a: 0.2,
                },
                DeviceSpec {
                    name: "camera".to_string(),
                    current_a: 0.5,
                },
            ],
            steps,
            horizon_s: t + 10.0,
        }
    }

    pub fn run(&self) -> Result<ScenarioReport, EnergyError> {
        let mut source = EnergySource::new(self.source.clone())?.with_label("scenario");

        // Devices must outlive the run; the source only holds weak links.
        let devices: Vec<DeviceHandle> = self
            .devices
            .iter()
            .map(|d| {
                let handle: DeviceHandle =
                    ConstantCurrentDevice::new(d.name.clone(), d.current_a).into_handle();
                handle
            })
            .collect();
        for device in &devices {
            source.attach_device(device);
        }

        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        source.subscribe_events(move |(at, event, remaining_j)| {
            let kind = match event {
                EnergyEvent::Depleted => RecordKind::Depleted,
                EnergyEvent::Recharged => RecordKind::Recharged,
                EnergyEvent::Changed => return,
            };
            if let Ok(mut records) = sink.lock() {
                records.push(EventRecord {
                    time_s: at.as_secs_f64(),
                    kind,
                    remaining_j,
                });
            }
        });

        let mut sim = Simulation::new();
        let id = sim.add_source(source);
        sim.activate(id);

        let mut steps = self.steps.clone();
        steps.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
        let horizon = SimTime::from_secs_f64(self.horizon_s);

        for timed in steps {
            let at = SimTime::from_secs_f64(timed.at_s);
            if at > horizon {
                break;
            }
            sim.run_until(at);
            let outcome = sim
                .with_source(id, |src, sched| match timed.step {
                    Step::Move {
                        x,
                        y,
                        z,
                        elapsed_s,
                        speed,
                    } => src
                        .apply_mobility_update(x, y, z, elapsed_s, speed, sched)
                        .map(|_| ()),
                    Step::Cost { joules } => src.apply_cost(joules, sched),
                    Step::Recharge => {
                        src.start_recharge(sched);
                        Ok(())
                    }
                })
                .unwrap_or(Ok(()));

            match outcome {
                Ok(()) => {}
                Err(EnergyError::Exhausted { remaining_j, .. }) => {
                    if let Ok(mut records) = records.lock() {
                        records.push(EventRecord {
                            time_s: at.as_secs_f64(),
                            kind: RecordKind::Exhausted,
                            remaining_j,
                        });
                    }
                }
                Err(e) => {
                    warn!(error = %e, at_s = timed.at_s, "scenario step rejected");
                    return Err(e);
                }
            }
        }
        sim.run_until(horizon);

        let (final_remaining_j, final_mode, recharge_complete) = sim
            .with_source(id, |src, sched| {
                (
                    src.remaining_energy(sched),
                    src.power_mode(sched),
                    src.is_recharge_complete(),
                )
            })
            .unwrap_or((0.0, PowerMode::Critical, true));
        drop(devices);

        let events = records.lock().map(|r| r.clone()).unwrap_or_default();
        info!(
            events = events.len(),
            remaining_j = final_remaining_j,
            "scenario finished"
        );
        Ok(ScenarioReport {
            events,
            final_remaining_j,
            final_mode,
            recharge_complete,
        })
    }
}
