use joule::{
    ConstantCurrentDevice, DeviceHandle, EnergyEvent, EnergySource, SimTime, Simulation,
    SourceConfig,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn tracked_source(config: SourceConfig) -> (EnergySource, Arc<Mutex<Vec<EnergyEvent>>>) {
    let mut src = EnergySource::new(config).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    src.subscribe_events(move |(_, ev, _)| {
        if ev != EnergyEvent::Changed {
            sink.lock().unwrap().push(ev);
        }
    });
    (src, seen)
}

#[test]
fn test_oscillation_inside_band_fires_nothing() {
    // low = 1.0 J, high = 1.5 J, recharge steps of 0.5 J
    let mut config = SourceConfig::default();
    config.recharge.step_fraction = 0.05;
    let (src, seen) = tracked_source(config);
    let mut sim = Simulation::new();
    let id = sim.add_source(src);
    sim.activate(id);

    sim.with_source(id, |s, q| s.apply_cost(9.0, q)).unwrap().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![EnergyEvent::Depleted]);

    // Bounce between 1.0 J and exactly 1.5 J: above low, never above high.
    sim.with_source(id, |s, q| s.start_recharge(q));
    for _ in 0..5 {
        sim.run_for(Duration::from_secs(1));
        assert_eq!(sim.source(id).unwrap().stored_energy(), 1.5);
        sim.with_source(id, |s, q| s.apply_cost(0.5, q)).unwrap().unwrap();
    }
    assert_eq!(*seen.lock().unwrap(), vec![EnergyEvent::Depleted]);

    // Two more steps reach 2.0 J and cross high once.
    sim.run_for(Duration::from_secs(2));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![EnergyEvent::Depleted, EnergyEvent::Recharged]
    );

    // Dropping back to 1.5 J stays in the band; 1.0 J crosses low again.
    sim.with_source(id, |s, q| s.apply_cost(0.5, q)).unwrap().unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
    sim.with_source(id, |s, q| s.apply_cost(0.5, q)).unwrap().unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EnergyEvent::Depleted,
            EnergyEvent::Recharged,
            EnergyEvent::Depleted
        ]
    );
}

#[test]
fn test_depletion_then_recharge_then_depletion() {
    let (mut src, seen) = tracked_source(SourceConfig::default().with_supply_voltage(2.0));
    let pump = ConstantCurrentDevice::new("pump", 0.5).into_handle();
    let handle: DeviceHandle = pump.clone();
    src.attach_device(&handle);

    let mut sim = Simulation::new();
    let id = sim.add_source(src);
    sim.activate(id);

    // 1 J/s: 10 J -> 1 J at t = 9.
    sim.run_until(SimTime::from_secs(9));
    assert!(sim.source(id).unwrap().is_depleted());
    assert!(pump.lock().unwrap().switched_off);

    sim.with_source(id, |s, q| s.start_recharge(q));
    sim.run_until(SimTime::from_secs(20));
    assert!(sim.source(id).unwrap().is_recharge_complete());
    assert!(!pump.lock().unwrap().switched_off);

    // Pump is back on and drains the full battery again.
    sim.run_until(SimTime::from_secs(60));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EnergyEvent::Depleted,
            EnergyEvent::Recharged,
            EnergyEvent::Depleted
        ]
    );
    let p = pump.lock().unwrap();
    assert_eq!((p.depleted_count, p.recharged_count), (2, 1));
}

#[test]
fn test_no_events_without_change() {
    let (src, seen) = tracked_source(SourceConfig::default());
    let changes = Arc::new(Mutex::new(0u32));
    let mut sim = Simulation::new();
    let id = sim.add_source(src);
    let c = changes.clone();
    sim.with_source(id, |s, _| {
        s.subscribe_events(move |_| *c.lock().unwrap() += 1);
    });
    sim.activate(id);
    sim.run_until(SimTime::from_secs(100));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(*changes.lock().unwrap(), 0);
}
