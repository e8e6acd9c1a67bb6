use crate::config::ProbeConfig;
use crate::event::BroadcastEvent;
use crate::mac_address::MacAddress;
use crate::registry::{BroadcastMatcher, CallbackHandle, CallbackRegistry};
use meatstick_payload::TemperatureDecoder;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A changed reading, pushed to the host state store.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub unique_id: String,
    pub name: String,
    pub address: MacAddress,
    pub celsius: f64,
    pub rssi: Option<i16>,
}

/// Host state store that receives temperature changes.
///
/// Called while the sensor's value lock is held; implementations must not
/// call back into the same sensor.
#[cfg_attr(test, mockall::automock)]
pub trait StateSink: Send + Sync {
    fn write_state(&self, update: &StateUpdate);
}

/// Temperature entity for one configured probe.
///
/// Holds the last accepted reading and writes to the sink only when a newly
/// decoded value differs from it.
pub struct TemperatureSensor {
    config: ProbeConfig,
    unique_id: String,
    name: String,
    decoder: Arc<dyn TemperatureDecoder>,
    sink: Arc<dyn StateSink>,
    native_value: Mutex<Option<f64>>,
}

impl TemperatureSensor {
    pub fn new(
        config: ProbeConfig,
        decoder: Arc<dyn TemperatureDecoder>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            unique_id: config.unique_id(),
            name: config.display_name(),
            config,
            decoder,
            sink,
            native_value: Mutex::new(None),
        }
    }

    pub fn address(&self) -> MacAddress {
        self.config.address
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last accepted reading in °C; `None` until the first decode succeeds.
    pub fn native_value(&self) -> Option<f64> {
        *self
            .native_value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one broadcast. Returns the new value when state changed.
    pub fn handle_event(&self, event: &BroadcastEvent) -> Option<f64> {
        if event.address != self.config.address {
            return None;
        }

        let celsius = match self.decoder.decode_advertisement(&event.advertisement) {
            Ok(decoded) => decoded.celsius,
            Err(e) => {
                debug!(
                    address = %event.address,
                    error = %e,
                    "No temperature in broadcast"
                );
                return None;
            }
        };

        // Held across the sink write so the host sees updates in the order
        // they were stored.
        let mut last = self
            .native_value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last == Some(celsius) {
            return None;
        }
        *last = Some(celsius);

        debug!(
            address = %event.address,
            celsius,
            rssi = ?event.rssi,
            "MeatStick temperature updated"
        );

        self.sink.write_state(&StateUpdate {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            address: event.address,
            celsius,
            rssi: event.rssi,
        });

        Some(celsius)
    }

    /// Subscribe to broadcasts from this probe's address.
    pub fn attach(self: &Arc<Self>, registry: &CallbackRegistry) -> CallbackHandle {
        let sensor = Arc::clone(self);
        registry.register(BroadcastMatcher::address(self.config.address), move |event| {
            sensor.handle_event(event);
        })
    }
}
