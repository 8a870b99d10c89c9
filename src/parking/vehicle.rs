use crate::parking::clock::Clock;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// The kinds of vehicles admitted to the facility. Each kind has a fixed base price which is charged
/// for the first two hours.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum VehicleClass {
    Car,
    Motorcycle,
    MiniBus,
    Bus,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Motorcycle,
        VehicleClass::MiniBus,
        VehicleClass::Bus,
    ];

    pub const fn base_price(&self) -> i64 {
        match self {
            VehicleClass::Car => 20,
            VehicleClass::Motorcycle => 15,
            VehicleClass::MiniBus => 25,
            VehicleClass::Bus => 30,
        }
    }
}

impl Display for VehicleClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VehicleClass::Car => "car",
            VehicleClass::Motorcycle => "motorcycle",
            VehicleClass::MiniBus => "mini bus",
            VehicleClass::Bus => "bus",
        };
        write!(f, "{name}")
    }
}

/// A parked (or arriving) vehicle. The plate is its only identity, the registry keys vehicles by plate.
#[derive(Builder, Debug, Clone)]
#[builder(pattern = "owned")]
pub struct Vehicle {
    #[builder(setter(into))]
    plate: String,
    class: VehicleClass,
    check_in_time: SystemTime,
    #[builder(default, setter(into, strip_option))]
    discount_card: Option<String>,
}

impl Vehicle {
    pub fn new(
        plate: impl Into<String>,
        class: VehicleClass,
        check_in_time: SystemTime,
        discount_card: Option<String>,
    ) -> Self {
        Vehicle {
            plate: plate.into(),
            class,
            check_in_time,
            discount_card,
        }
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn class(&self) -> VehicleClass {
        self.class
    }

    pub fn check_in_time(&self) -> SystemTime {
        self.check_in_time
    }

    pub fn discount_card(&self) -> Option<&str> {
        self.discount_card.as_deref()
    }

    /// An empty card string counts as no card at all.
    pub fn has_discount(&self) -> bool {
        self.discount_card.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Whole minutes between check in and `now`, truncated towards zero. Negative if `now` lies before
    /// the check in time.
    pub fn parked_minutes_at(&self, now: SystemTime) -> i64 {
        match now.duration_since(self.check_in_time) {
            Ok(elapsed) => (elapsed.as_secs() / 60) as i64,
            Err(e) => -((e.duration().as_secs() / 60) as i64),
        }
    }

    /// Never cached. Every call reads the clock again.
    pub fn parked_minutes(&self, clock: &impl Clock) -> i64 {
        self.parked_minutes_at(clock.now())
    }
}

impl Display for Vehicle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "plate: {} type: {}", self.plate, self.class)?;
        if let Some(card) = &self.discount_card {
            write!(f, " discount card: {card}")?;
        }
        Ok(())
    }
}
