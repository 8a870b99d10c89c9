use crate::parking::registry::ParkingError;
use crate::parking::vehicle::VehicleClass;
use ahash::HashMap;
use derive_builder::Builder;
use std::any::{Any, TypeId};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

pub trait EventTrait: Debug + Any {
    // a fn and not an associated const, so the trait stays dyn compatible
    fn type_(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn time(&self) -> SystemTime;
    fn plate(&self) -> &str;
}

type OnEventFn = dyn Fn(&dyn EventTrait) + Send + Sync + 'static;

/// The EventsManager holds call-backs for event processing. Rust has no reflection, so handlers are
/// registered per concrete event type and dispatched by `TypeId`.
///
/// The registry publishes into its own EventsManager instead of printing anything. Whoever owns the
/// registry decides how to render arrivals and departures by subscribing here.
#[derive(Default)]
pub struct EventsManager {
    per_type: HashMap<TypeId, Vec<Arc<OnEventFn>>>,
    catch_all: Vec<Box<OnEventFn>>,
}

impl Debug for EventsManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventsManager {{ per_type: {:?}, catch_all: {:?} }}",
            self.per_type.len(),
            self.catch_all.len(),
        )
    }
}

impl EventsManager {
    pub fn new() -> Self {
        EventsManager::default()
    }

    pub fn publish_event(&self, event: &dyn EventTrait) {
        let tid = event.as_any().type_id();
        if let Some(list) = self.per_type.get(&tid) {
            for h in list {
                h(event);
            }
        }
        for h in &self.catch_all {
            h(event);
        }
    }

    /// Registers a callback for one concrete event type.
    pub fn on<E, F>(&mut self, f: F)
    where
        E: EventTrait,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<E>();
        let entry = self.per_type.entry(type_id).or_default();
        entry.push(Arc::new(move |ev: &dyn EventTrait| {
            if let Some(e) = ev.as_any().downcast_ref::<E>() {
                f(e);
            }
        }));
    }

    /// Registers a callback receiving every event.
    pub fn on_any<F>(&mut self, f: F)
    where
        F: Fn(&dyn EventTrait) + Send + Sync + 'static,
    {
        self.catch_all.push(Box::new(f));
    }
}

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct CheckInEvent {
    pub time: SystemTime,
    pub plate: String,
    pub class: VehicleClass,
    pub occupancy: usize,
}

impl CheckInEvent {
    pub const TYPE: &'static str = "checkin";
}

#[derive(Debug, Clone)]
pub struct CheckInRejectedEvent {
    pub time: SystemTime,
    pub plate: String,
    pub reason: ParkingError,
}

impl CheckInRejectedEvent {
    pub const TYPE: &'static str = "checkin_rejected";
}

#[derive(Debug, Clone)]
pub struct CheckOutEvent {
    pub time: SystemTime,
    pub plate: String,
    pub class: VehicleClass,
    pub parked_minutes: i64,
    pub has_discount: bool,
    pub fee: i64,
}

impl CheckOutEvent {
    pub const TYPE: &'static str = "checkout";
}

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct CheckOutFailedEvent {
    pub time: SystemTime,
    pub plate: String,
}

impl CheckOutFailedEvent {
    pub const TYPE: &'static str = "checkout_failed";
}

macro_rules! impl_event {
    ($($event:ty),*) => {
        $(
            impl EventTrait for $event {
                fn type_(&self) -> &'static str {
                    Self::TYPE
                }
                fn as_any(&self) -> &dyn Any {
                    self
                }
                fn time(&self) -> SystemTime {
                    self.time
                }
                fn plate(&self) -> &str {
                    &self.plate
                }
            }
        )*
    };
}

impl_event!(
    CheckInEvent,
    CheckInRejectedEvent,
    CheckOutEvent,
    CheckOutFailedEvent
);

#[cfg(test)]
mod test {
    use crate::parking::events::{
        CheckInEventBuilder, CheckOutEvent, CheckOutFailedEventBuilder, EventTrait, EventsManager,
    };
    use crate::parking::vehicle::VehicleClass;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::SystemTime;

    #[test]
    fn typed_and_catch_all_handlers() {
        let typed = Arc::new(Mutex::new(Vec::new()));
        let all = Arc::new(Mutex::new(Vec::new()));

        let mut manager = EventsManager::new();
        let typed_c = typed.clone();
        manager.on::<CheckOutEvent, _>(move |e| typed_c.lock().push(e.fee));
        let all_c = all.clone();
        manager.on_any(move |e| all_c.lock().push(e.type_()));

        let check_in = CheckInEventBuilder::default()
            .time(SystemTime::UNIX_EPOCH)
            .plate("A1")
            .class(VehicleClass::Car)
            .occupancy(1usize)
            .build()
            .unwrap();
        let failed = CheckOutFailedEventBuilder::default()
            .time(SystemTime::UNIX_EPOCH)
            .plate("A2")
            .build()
            .unwrap();
        let check_out = CheckOutEvent {
            time: SystemTime::UNIX_EPOCH,
            plate: "A1".to_string(),
            class: VehicleClass::Car,
            parked_minutes: 5,
            has_discount: false,
            fee: 20,
        };

        manager.publish_event(&check_in);
        manager.publish_event(&failed);
        manager.publish_event(&check_out);

        assert_eq!(*typed.lock(), vec![20]);
        assert_eq!(*all.lock(), vec!["checkin", "checkout_failed", "checkout"]);
        assert_eq!(check_out.plate(), "A1");
    }
}
