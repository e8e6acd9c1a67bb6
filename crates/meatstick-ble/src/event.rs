//! Broadcast events as delivered by the host's Bluetooth transport.
//!
//! On the wire (JSON lines) payload bytes are hex strings:
//!
//! ```json
//! {"address": "40:51:6C:09:A2:00", "rssi": -67,
//!  "manufacturer_data": {"2641": "0000029e"},
//!  "service_data": {"0000fff0-0000-1000-8000-00805f9b34fb": "0000029e"}}
//! ```

use crate::error::{BleError, Result};
use crate::mac_address::MacAddress;
use meatstick_payload::Advertisement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One advertisement received from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BroadcastRecord", into = "BroadcastRecord")]
pub struct BroadcastEvent {
    pub address: MacAddress,
    /// Signal strength in dBm, informational only
    pub rssi: Option<i16>,
    pub advertisement: Advertisement,
}

impl BroadcastEvent {
    pub fn new(address: MacAddress, rssi: Option<i16>, advertisement: Advertisement) -> Self {
        Self {
            address,
            rssi,
            advertisement,
        }
    }

    /// Parse one JSON line.
    pub fn from_json(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BroadcastRecord {
    address: MacAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rssi: Option<i16>,
    #[serde(default)]
    manufacturer_data: BTreeMap<u16, HexBytes>,
    #[serde(default)]
    service_data: BTreeMap<Uuid, HexBytes>,
}

impl From<BroadcastRecord> for BroadcastEvent {
    fn from(record: BroadcastRecord) -> Self {
        let advertisement = Advertisement {
            manufacturer_data: record
                .manufacturer_data
                .into_iter()
                .map(|(id, bytes)| (id, bytes.0))
                .collect(),
            service_data: record
                .service_data
                .into_iter()
                .map(|(uuid, bytes)| (uuid, bytes.0))
                .collect(),
        };
        Self::new(record.address, record.rssi, advertisement)
    }
}

impl From<BroadcastEvent> for BroadcastRecord {
    fn from(event: BroadcastEvent) -> Self {
        Self {
            address: event.address,
            rssi: event.rssi,
            manufacturer_data: event
                .advertisement
                .manufacturer_data
                .into_iter()
                .map(|(id, bytes)| (id, HexBytes(bytes)))
                .collect(),
            service_data: event
                .advertisement
                .service_data
                .into_iter()
                .map(|(uuid, bytes)| (uuid, HexBytes(bytes)))
                .collect(),
        }
    }
}

/// Byte payload carried as a hex string; whitespace between digits is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
struct HexBytes(Vec<u8>);

impl TryFrom<String> for HexBytes {
    type Error = BleError;

    fn try_from(value: String) -> Result<Self> {
        let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(Self(hex::decode(digits)?))
    }
}

impl From<HexBytes> for String {
    fn from(bytes: HexBytes) -> Self {
        hex::encode(bytes.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_SERVICE: Uuid = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);

    #[test]
    fn test_parse_full_event() {
        let line = r#"{
            "address": "40:51:6c:09:a2:00",
            "rssi": -67,
            "manufacturer_data": {"2641": "01 02 03"},
            "service_data": {"0000fff0-0000-1000-8000-00805f9b34fb": "0000029E"}
        }"#;

        let event = BroadcastEvent::from_json(line).unwrap();
        assert_eq!(event.address.to_string(), "40:51:6C:09:A2:00");
        assert_eq!(event.rssi, Some(-67));
        assert_eq!(
            event.advertisement.manufacturer_data.get(&2641),
            Some(&vec![0x01, 0x02, 0x03])
        );
        assert_eq!(
            event.advertisement.service_data.get(&PROBE_SERVICE),
            Some(&vec![0x00, 0x00, 0x02, 0x9E])
        );
    }

    #[test]
    fn test_data_fields_are_optional() {
        let event = BroadcastEvent::from_json(r#"{"address": "AA:BB:CC:DD:EE:FF"}"#).unwrap();
        assert_eq!(event.rssi, None);
        assert!(event.advertisement.is_empty());
    }

    #[test]
    fn test_bad_hex_is_rejected() {
        let line = r#"{"address": "AA:BB:CC:DD:EE:FF", "manufacturer_data": {"1": "abc"}}"#;
        assert!(matches!(
            BroadcastEvent::from_json(line),
            Err(BleError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let line = r#"{"address": "not-a-mac"}"#;
        assert!(BroadcastEvent::from_json(line).is_err());
    }

    #[test]
    fn test_to_json_uses_hex() {
        let event = BroadcastEvent::new(
            "AA:BB:CC:DD:EE:FF".parse().unwrap(),
            None,
            Advertisement::new().with_manufacturer_data(7, vec![0xDE, 0xAD]),
        );
        let json = event.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"address":"AA:BB:CC:DD:EE:FF","manufacturer_data":{"7":"dead"},"service_data":{}}"#
        );
    }
}
