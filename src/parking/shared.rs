use crate::parking::clock::{Clock, SystemClock};
use crate::parking::registry::{CheckOutReceipt, Earnings, ParkingError, VehicleRegistry};
use crate::parking::vehicle::Vehicle;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// A registry handle which can be cloned into several threads. Every operation takes the lock for its
/// whole duration, so no reader ever sees a vehicle removed without its fee being booked.
#[derive(Debug)]
pub struct SharedRegistry<C: Clock = SystemClock> {
    inner: Arc<Mutex<VehicleRegistry<C>>>,
}

impl<C: Clock> Clone for SharedRegistry<C> {
    fn clone(&self) -> Self {
        SharedRegistry {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Clock> From<VehicleRegistry<C>> for SharedRegistry<C> {
    fn from(registry: VehicleRegistry<C>) -> Self {
        SharedRegistry {
            inner: Arc::new(Mutex::new(registry)),
        }
    }
}

impl<C: Clock> SharedRegistry<C> {
    pub fn check_in(&self, vehicle: Vehicle) -> Result<(), ParkingError> {
        self.inner.lock().check_in(vehicle)
    }

    pub fn check_out(&self, plate: &str) -> Result<CheckOutReceipt, ParkingError> {
        self.inner.lock().check_out(plate)
    }

    pub fn earnings(&self) -> Earnings {
        self.inner.lock().earnings()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Snapshot of the current occupants, taken under the lock.
    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.inner.lock().vehicles().cloned().collect()
    }

    /// Holds the lock until the guard is dropped. Use this to run several operations as one unit.
    pub fn lock(&self) -> MutexGuard<'_, VehicleRegistry<C>> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod test {
    use crate::parking::clock::{Clock, ManualClock};
    use crate::parking::registry::{ParkingError, VehicleRegistry};
    use crate::parking::shared::SharedRegistry;
    use crate::parking::vehicle::{Vehicle, VehicleClass};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_check_ins_respect_capacity() {
        let clock = Arc::new(ManualClock::default());
        let shared = SharedRegistry::from(VehicleRegistry::with_clock(clock.clone()));

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let shared = shared.clone();
                let now = clock.now();
                thread::spawn(move || {
                    shared.check_in(Vehicle::new(format!("P{i}"), VehicleClass::Car, now, None))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Err(ParkingError::CapacityExceeded { .. })))
            .count();
        assert_eq!(admitted, 20);
        assert_eq!(full, 20);
        assert_eq!(shared.len(), 20);
    }

    #[test]
    fn concurrent_check_outs_charge_once() {
        let clock = Arc::new(ManualClock::default());
        let shared = SharedRegistry::from(VehicleRegistry::with_clock(clock.clone()));
        shared
            .check_in(Vehicle::new("A1", VehicleClass::Car, clock.now(), None))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.check_out("A1"))
            })
            .collect();
        let ok = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();

        assert_eq!(ok, 1);
        let earnings = shared.earnings();
        assert_eq!(earnings.vehicles_checked_out, 1);
        assert_eq!(earnings.total_charged, 20);
        assert!(shared.is_empty());
        assert!(shared.vehicles().is_empty());
    }
}
