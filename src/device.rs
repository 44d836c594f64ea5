//! Devices attached to an energy source.
//!
//! The source does not own its devices. It keeps `Weak` handles, asks them
//! for their current draw, and tells them about depletion and recharge.

use crate::transition::EnergyEvent;
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// A current-drawing consumer (radio, sensor, motor).
pub trait DeviceEnergyModel: Send + std::fmt::Debug {
    fn name(&self) -> &str;
    /// Instantaneous current draw in Amperes.
    fn current_a(&self) -> f64;
    fn on_energy_depleted(&mut self);
    fn on_energy_recharged(&mut self);
    fn on_energy_changed(&mut self) {}
}

pub type DeviceHandle = Arc<Mutex<dyn DeviceEnergyModel>>;

#[derive(Debug, Default)]
pub struct DeviceSet {
    devices: Vec<Weak<Mutex<dyn DeviceEnergyModel>>>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, device: &DeviceHandle) {
        self.devices.push(Arc::downgrade(device));
    }

    /// Forget devices that have been dropped by their owner.
    pub fn prune(&mut self) {
        self.devices.retain(|d| d.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.devices.iter().filter(|d| d.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Sum of current draw across live devices. An empty set draws nothing.
    ///
    /// Drain never adds energy: negative readings are clamped to zero, and a
    /// poisoned or non-finite reading counts as zero.
    pub fn total_current_a(&mut self) -> f64 {
        self.prune();
        let mut total = 0.0;
        for device in self.devices.iter().filter_map(Weak::upgrade) {
            let current = match device.lock() {
                Ok(device) => device.current_a(),
                Err(poisoned) => {
                    warn!(device = poisoned.get_ref().name(), "device lock poisoned");
                    continue;
                }
            };
            if current.is_finite() {
                total += current.max(0.0);
            }
        }
        total
    }

    pub fn find(&self, name: &str) -> Vec<DeviceHandle> {
        self.devices
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|d| d.lock().map(|d| d.name() == name).unwrap_or(false))
            .collect()
    }

    pub fn notify(&mut self, event: EnergyEvent) {
        self.prune();
        for device in self.devices.iter().filter_map(Weak::upgrade) {
            let mut device = match device.lock() {
                Ok(device) => device,
                Err(poisoned) => {
                    warn!(device = poisoned.get_ref().name(), ?event, "device lock poisoned");
                    continue;
                }
            };
            match event {
                EnergyEvent::Depleted => device.on_energy_depleted(),
                EnergyEvent::Recharged => device.on_energy_recharged(),
                EnergyEvent::Changed => device.on_energy_changed(),
            }
        }
    }
}

/// A device with a fixed current draw that counts the notifications it receives.
#[derive(Debug, Clone, Default)]
pub struct ConstantCurrentDevice {
    pub name: String,
    pub current_a: f64,
    /// Set on depletion, cleared on recharge. Devices typically stop drawing while off.
    pub switched_off: bool,
    pub depleted_count: u32,
    pub recharged_count: u32,
    pub changed_count: u32,
}

impl ConstantCurrentDevice {
    pub fn new(name: impl Into<String>, current_a: f64) -> Self {
        Self {
            name: name.into(),
            current_a,
            ..Self::default()
        }
    }

    pub fn into_handle(self) -> Arc<Mutex<ConstantCurrentDevice>> {
        Arc::new(Mutex::new(self))
    }
}

impl DeviceEnergyModel for ConstantCurrentDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_a(&self) -> f64 {
        if self.switched_off {
            0.0
        } else {
            self.current_a
        }
    }

    fn on_energy_depleted(&mut self) {
        self.switched_off = true;
        self.depleted_count += 1;
    }

    fn on_energy_recharged(&mut self) {
        self.switched_off = false;
        self.recharged_count += 1;
    }

    fn on_energy_changed(&mut self) {
        self.changed_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_draws_nothing() {
        let mut set = DeviceSet::new();
        assert_eq!(set.total_current_a(), 0.0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_total_current_sums_live_devices() {
        let radio: DeviceHandle = ConstantCurrentDevice::new("radio", 0.25).into_handle();
        let sensor: DeviceHandle = ConstantCurrentDevice::new("sensor", 0.5).into_handle();
        let mut set = DeviceSet::new();
        set.attach(&radio);
        set.attach(&sensor);
        assert_eq!(set.total_current_a(), 0.75);

        drop(sensor);
        assert_eq!(set.total_current_a(), 0.25);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_notify_reaches_devices() {
        let radio = ConstantCurrentDevice::new("radio", 0.25).into_handle();
        let handle: DeviceHandle = radio.clone();
        let mut set = DeviceSet::new();
        set.attach(&handle);

        set.notify(EnergyEvent::Depleted);
        assert!(radio.lock().unwrap().switched_off);
        assert_eq!(set.total_current_a(), 0.0);

        set.notify(EnergyEvent::Recharged);
        set.notify(EnergyEvent::Changed);
        let r = radio.lock().unwrap();
        assert_eq!((r.depleted_count, r.recharged_count, r.changed_count), (1, 1, 1));
        assert!(!r.switched_off);
    }

    #[test]
    fn test_find_by_name() {
        let a: DeviceHandle = ConstantCurrentDevice::new("motor", 1.0).into_handle();
        let b: DeviceHandle = ConstantCurrentDevice::new("motor", 2.0).into_handle();
        let c: DeviceHandle = ConstantCurrentDevice::new("radio", 0.1).into_handle();
        let mut set = DeviceSet::new();
        for d in [&a, &b, &c] {
            set.attach(d);
        }
        assert_eq!(set.find("motor").len(), 2);
        assert_eq!(set.find("radio").len(), 1);
        assert!(set.find("gps").is_empty());
    }

    #[test]
    fn test_negative_reading_does_not_add_energy() {
        let harvester: DeviceHandle = ConstantCurrentDevice::new("panel", -1.0).into_handle();
        let radio: DeviceHandle = ConstantCurrentDevice::new("radio", 0.25).into_handle();
        let mut set = DeviceSet::new();
        set.attach(&harvester);
        assert_eq!(set.total_current_a(), 0.0);
        set.attach(&radio);
        assert_eq!(set.total_current_a(), 0.25);
    }

    #[test]
    fn test_poisoned_device_is_skipped() {
        let broken = ConstantCurrentDevice::new("broken", 2.0).into_handle();
        let radio = ConstantCurrentDevice::new("radio", 0.25).into_handle();
        let poison = broken.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poison.lock().unwrap();
            panic!("device driver crashed");
        })
        .join();
        assert!(broken.is_poisoned());

        let broken_handle: DeviceHandle = broken.clone();
        let radio_handle: DeviceHandle = radio.clone();
        let mut set = DeviceSet::new();
        set.attach(&broken_handle);
        set.attach(&radio_handle);
        assert_eq!(set.total_current_a(), 0.25);

        set.notify(EnergyEvent::Depleted);
        assert_eq!(radio.lock().unwrap().depleted_count, 1);
        assert_eq!(broken.lock().unwrap_or_else(|e| e.into_inner()).depleted_count, 0);
    }
}
