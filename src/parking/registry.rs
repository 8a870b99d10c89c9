use crate::parking::clock::{Clock, SystemClock};
use crate::parking::events::{
    CheckInEvent, CheckInRejectedEvent, CheckOutEvent, CheckOutFailedEvent, EventsManager,
};
use crate::parking::fee::{FeeBreakdown, FeeCalculator};
use crate::parking::vehicle::{Vehicle, VehicleClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParkingError {
    #[error("the maximum capacity of {capacity} vehicles has been reached")]
    CapacityExceeded { capacity: usize },
    #[error("a vehicle with plate {0} is already parked")]
    DuplicatePlate(String),
    #[error("no vehicle with plate {0} is parked")]
    VehicleNotFound(String),
}

/// Accumulated result of all successful check outs.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Earnings {
    pub vehicles_checked_out: u64,
    pub total_charged: i64,
}

/// What a successful check out hands back to the caller.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutReceipt {
    pub plate: String,
    pub class: VehicleClass,
    pub parked_minutes: i64,
    pub has_discount: bool,
    pub breakdown: FeeBreakdown,
}

impl CheckOutReceipt {
    pub fn fee(&self) -> i64 {
        self.breakdown.fee
    }
}

/// Owns the vehicles currently parked, enforces unique plates and the capacity limit, and accumulates
/// the earnings of all check outs.
///
/// Vehicles are stored in a map keyed by plate. A second vehicle with a known plate is rejected no matter
/// how its other fields differ, it never replaces the parked one.
#[derive(Debug)]
pub struct VehicleRegistry<C: Clock = SystemClock> {
    vehicles: BTreeMap<String, Vehicle>,
    capacity: usize,
    earnings: Earnings,
    fees: FeeCalculator,
    clock: C,
    events: EventsManager,
}

impl Default for VehicleRegistry<SystemClock> {
    fn default() -> Self {
        VehicleRegistry::new(DEFAULT_CAPACITY, FeeCalculator::default(), SystemClock)
    }
}

impl<C: Clock> VehicleRegistry<C> {
    pub fn new(capacity: usize, fees: FeeCalculator, clock: C) -> Self {
        VehicleRegistry {
            vehicles: BTreeMap::new(),
            capacity,
            earnings: Earnings::default(),
            fees,
            clock,
            events: EventsManager::new(),
        }
    }

    pub fn with_clock(clock: C) -> Self {
        VehicleRegistry::new(DEFAULT_CAPACITY, FeeCalculator::default(), clock)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.vehicles.len() >= self.capacity
    }

    pub fn contains(&self, plate: &str) -> bool {
        self.vehicles.contains_key(plate)
    }

    pub fn get(&self, plate: &str) -> Option<&Vehicle> {
        self.vehicles.get(plate)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn fees(&self) -> &FeeCalculator {
        &self.fees
    }

    pub fn events_mut(&mut self) -> &mut EventsManager {
        &mut self.events
    }

    /// Admits a vehicle. Capacity is checked before the plate, so a full facility reports
    /// `CapacityExceeded` even for a plate that is already parked.
    pub fn check_in(&mut self, vehicle: Vehicle) -> Result<(), ParkingError> {
        let result = self.admit(vehicle);
        if let Err(e) = &result {
            warn!(error = %e, "Check in rejected");
        }
        result
    }

    fn admit(&mut self, vehicle: Vehicle) -> Result<(), ParkingError> {
        let now = self.clock.now();
        if self.is_full() {
            return Err(self.reject(now, vehicle.plate(), ParkingError::CapacityExceeded {
                capacity: self.capacity,
            }));
        }
        if self.vehicles.contains_key(vehicle.plate()) {
            let plate = vehicle.plate().to_string();
            return Err(self.reject(now, &plate, ParkingError::DuplicatePlate(plate.clone())));
        }

        debug!(plate = vehicle.plate(), class = %vehicle.class(), "Vehicle checked in");
        let event = CheckInEvent {
            time: now,
            plate: vehicle.plate().to_string(),
            class: vehicle.class(),
            occupancy: self.vehicles.len() + 1,
        };
        self.vehicles.insert(vehicle.plate().to_string(), vehicle);
        self.events.publish_event(&event);
        Ok(())
    }

    fn reject(&self, now: SystemTime, plate: &str, reason: ParkingError) -> ParkingError {
        self.events.publish_event(&CheckInRejectedEvent {
            time: now,
            plate: plate.to_string(),
            reason: reason.clone(),
        });
        reason
    }

    /// Removes the vehicle with `plate` and charges it. The fee is computed from the vehicle before it is
    /// removed, and removal and the earnings update happen together under the same `&mut self`.
    pub fn check_out(&mut self, plate: &str) -> Result<CheckOutReceipt, ParkingError> {
        let now = self.clock.now();
        let Some(vehicle) = self.vehicles.get(plate) else {
            warn!(plate, "Check out failed, vehicle not found");
            self.events.publish_event(&CheckOutFailedEvent {
                time: now,
                plate: plate.to_string(),
            });
            return Err(ParkingError::VehicleNotFound(plate.to_string()));
        };

        let has_discount = vehicle.has_discount();
        let parked_minutes = vehicle.parked_minutes_at(now);
        let class = vehicle.class();
        let breakdown = self.fees.breakdown(class, parked_minutes, has_discount);

        self.vehicles.remove(plate);
        self.earnings.vehicles_checked_out += 1;
        self.earnings.total_charged = self.earnings.total_charged.saturating_add(breakdown.fee);

        debug!(
            plate,
            class = %class,
            parked_minutes,
            has_discount,
            subtotal = breakdown.subtotal,
            discount = breakdown.discount,
            fee = breakdown.fee,
            "Vehicle checked out"
        );

        self.events.publish_event(&CheckOutEvent {
            time: now,
            plate: plate.to_string(),
            class,
            parked_minutes,
            has_discount,
            fee: breakdown.fee,
        });

        Ok(CheckOutReceipt {
            plate: plate.to_string(),
            class,
            parked_minutes,
            has_discount,
            breakdown,
        })
    }

    /// Current occupants ordered by plate. The iterator borrows the registry, so the order is stable for
    /// as long as it lives; call again to restart.
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        self.vehicles.values()
    }

    pub fn earnings(&self) -> Earnings {
        self.earnings
    }

    /// Parked minutes of `plate` right now, if it is parked.
    pub fn parked_minutes(&self, plate: &str) -> Option<i64> {
        self.vehicles.get(plate).map(|v| v.parked_minutes(&self.clock))
    }
}
