//! Host-side glue for MeatStick probes: broadcast events, callback
//! registration and the per-probe temperature sensor.

pub mod config;
mod error;
pub mod event;
pub mod mac_address;
pub mod registry;
pub mod sensor;

pub use config::{DOMAIN, ProbeConfig};
pub use error::{BleError, Result};
pub use event::BroadcastEvent;
pub use mac_address::MacAddress;
pub use registry::{BroadcastCallback, BroadcastMatcher, CallbackHandle, CallbackRegistry};
pub use sensor::{StateSink, StateUpdate, TemperatureSensor};
