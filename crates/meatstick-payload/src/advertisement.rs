//! Candidate payload slots of a BLE advertisement and their priority order.
//!
//! A broadcast may carry the probe payload as manufacturer-specific data
//! (keyed by a 16-bit company identifier) or as service data (keyed by a
//! service UUID). Candidates are yielded in this order:
//!
//! 1. the configured preferred slots, in configured order, when present
//! 2. service data in ascending UUID order (default `SlotOrder::ServiceFirst`)
//! 3. manufacturer data in ascending company identifier order
//!
//! `SlotOrder::ManufacturerFirst` swaps steps 2 and 3. Preferred slots are
//! never yielded twice.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifies one byte field inside an advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotKey {
    Manufacturer(u16),
    Service(Uuid),
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Manufacturer(id) => write!(f, "manufacturer:0x{id:04X}"),
            SlotKey::Service(uuid) => write!(f, "service:{uuid}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOrder {
    #[default]
    ServiceFirst,
    ManufacturerFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotPriority {
    pub preferred: Vec<SlotKey>,
    pub order: SlotOrder,
}

impl SlotPriority {
    /// Build a priority; repeated preferred keys keep their first position.
    pub fn new(preferred: Vec<SlotKey>, order: SlotOrder) -> Self {
        let mut unique = Vec::with_capacity(preferred.len());
        for key in preferred {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self {
            preferred: unique,
            order,
        }
    }
}

/// Decodable byte fields of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
    pub service_data: BTreeMap<Uuid, Vec<u8>>,
}

impl Advertisement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manufacturer_data(mut self, company_id: u16, payload: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data.insert(company_id, payload.into());
        self
    }

    pub fn with_service_data(mut self, uuid: Uuid, payload: impl Into<Vec<u8>>) -> Self {
        self.service_data.insert(uuid, payload.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.manufacturer_data.is_empty() && self.service_data.is_empty()
    }

    pub fn get(&self, key: &SlotKey) -> Option<&[u8]> {
        match key {
            SlotKey::Manufacturer(id) => self.manufacturer_data.get(id).map(Vec::as_slice),
            SlotKey::Service(uuid) => self.service_data.get(uuid).map(Vec::as_slice),
        }
    }

    /// Iterate candidate slots in priority order (see module docs).
    pub fn candidates<'a>(
        &'a self,
        priority: &'a SlotPriority,
    ) -> impl Iterator<Item = (SlotKey, &'a [u8])> + 'a {
        let service_first = priority.order == SlotOrder::ServiceFirst;

        let preferred = priority
            .preferred
            .iter()
            .enumerate()
            .filter(move |(index, key)| !priority.preferred[..*index].contains(*key))
            .filter_map(move |(_, key)| self.get(key).map(|payload| (*key, payload)));

        let services = self
            .service_data
            .iter()
            .map(|(uuid, payload)| (SlotKey::Service(*uuid), payload.as_slice()));
        let manufacturers = self
            .manufacturer_data
            .iter()
            .map(|(id, payload)| (SlotKey::Manufacturer(*id), payload.as_slice()));

        let remaining = services
            .clone()
            .filter(move |_| service_first)
            .chain(manufacturers)
            .chain(services.filter(move |_| !service_first))
            .filter(move |(key, _)| !priority.preferred.contains(key));

        preferred.chain(remaining)
    }
}
