pub mod clock;
pub mod config;
pub mod controller;
pub mod events;
pub mod fee;
pub mod logging;
pub mod registry;
pub mod scenario;
pub mod shared;
pub mod vehicle;
