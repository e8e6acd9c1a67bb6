use crate::mac_address::MacAddress;
use serde::{Deserialize, Serialize};

/// Integration name, used as the unique id prefix
pub const DOMAIN: &str = "meatstick_ble";

/// Setup-time identity of one probe.
///
/// ```toml
/// [[probes]]
/// address = "40:51:6C:09:A2:00"
/// name = "MeatStick Yellow"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub address: MacAddress,

    /// Display name; defaults to `MeatStick <ADDRESS>`
    #[serde(default)]
    pub name: Option<String>,
}

impl ProbeConfig {
    pub fn new(address: MacAddress) -> Self {
        Self {
            address,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("MeatStick {}", self.address))
    }

    pub fn unique_id(&self) -> String {
        format!("{DOMAIN}_{}_temperature", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> MacAddress {
        "40:51:6c:09:a2:00".parse().unwrap()
    }

    #[test]
    fn test_default_name_uses_address() {
        let config = ProbeConfig::new(address());
        assert_eq!(config.display_name(), "MeatStick 40:51:6C:09:A2:00");
    }

    #[test]
    fn test_explicit_name() {
        let config = ProbeConfig::new(address()).with_name("MeatStick Yellow");
        assert_eq!(config.display_name(), "MeatStick Yellow");
    }

    #[test]
    fn test_unique_id() {
        let config = ProbeConfig::new(address());
        assert_eq!(
            config.unique_id(),
            "meatstick_ble_40:51:6C:09:A2:00_temperature"
        );
    }

    #[test]
    fn test_deserialize_without_name() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"address": "40:51:6c:09:a2:00"}"#).unwrap();
        assert_eq!(config.address, address());
        assert_eq!(config.name, None);
    }
}
