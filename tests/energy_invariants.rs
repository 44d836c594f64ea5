use joule::{
    ConstantCurrentDevice, DeviceHandle, EnergyEvent, EnergySource, SimTime, Simulation,
    SourceConfig,
};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Advance(u64),
    Cost(f64),
    Move(f64, f64, f64, f64),
    Recharge,
    Read,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..5_000).prop_map(Op::Advance),
        (0.0..120.0f64).prop_map(Op::Cost),
        (-20.0..20.0f64, -20.0..20.0f64, 0.0..10.0f64, 0.0..5.0f64)
            .prop_map(|(x, y, z, e)| Op::Move(x, y, z, e)),
        Just(Op::Recharge),
        Just(Op::Read),
    ]
}

proptest! {
    #[test]
    fn remaining_stays_in_bounds_and_transitions_alternate(
        ops in proptest::collection::vec(op(), 1..80),
        current_a in 0.0..2.0f64,
        low in 0.05..0.4f64,
        gap in 0.0..0.3f64,
    ) {
        let initial = 500.0;
        let high = (low + gap).min(1.0);
        let config = SourceConfig::default()
            .with_initial_energy(initial)
            .with_thresholds(low, high);
        let mut src = EnergySource::new(config).unwrap();
        let motor: DeviceHandle = ConstantCurrentDevice::new("motor", current_a).into_handle();
        src.attach_device(&motor);

        let transitions = Arc::new(Mutex::new(Vec::new()));
        let sink = transitions.clone();
        src.subscribe_events(move |(_, ev, remaining)| {
            if ev != EnergyEvent::Changed {
                sink.lock().unwrap().push((ev, remaining));
            }
        });

        let mut sim = Simulation::new();
        let id = sim.add_source(src);
        sim.activate(id);

        for op in ops {
            match op {
                Op::Advance(ms) => {
                    sim.run_for(Duration::from_millis(ms));
                }
                Op::Cost(j) => {
                    let _ = sim.with_source(id, |s, q| s.apply_cost(j, q));
                }
                Op::Move(x, y, z, e) => {
                    let _ = sim.with_source(id, |s, q| s.apply_mobility_update(x, y, z, e, 8.0, q));
                }
                Op::Recharge => {
                    sim.with_source(id, |s, q| s.start_recharge(q));
                }
                Op::Read => {
                    let (a, b) = sim
                        .with_source(id, |s, q| (s.remaining_energy(q), s.remaining_energy(q)))
                        .unwrap();
                    prop_assert_eq!(a, b);
                }
            }
            let stored = sim.source(id).unwrap().stored_energy();
            prop_assert!((0.0..=initial).contains(&stored), "remaining {} out of bounds", stored);
        }

        let transitions = transitions.lock().unwrap();
        for (i, (ev, remaining)) in transitions.iter().enumerate() {
            let expected = if i % 2 == 0 { EnergyEvent::Depleted } else { EnergyEvent::Recharged };
            prop_assert_eq!(*ev, expected);
            match ev {
                EnergyEvent::Depleted => prop_assert!(*remaining <= low * initial),
                EnergyEvent::Recharged => prop_assert!(*remaining > high * initial),
                EnergyEvent::Changed => unreachable!(),
            }
        }
    }

    #[test]
    fn clock_only_moves_forward(steps in proptest::collection::vec(0u64..10_000, 1..40)) {
        let mut sim = Simulation::new();
        let id = sim.add_source(EnergySource::new(SourceConfig::default()).unwrap());
        sim.activate(id);
        let mut last = SimTime::ZERO;
        for ms in steps {
            sim.run_for(Duration::from_millis(ms));
            let t = sim.source(id).unwrap().last_update_time();
            prop_assert!(t >= last);
            last = t;
        }
    }
}
