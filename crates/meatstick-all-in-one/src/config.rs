use config::{Config, ConfigError, Environment, File, Source};
use meatstick_ble::ProbeConfig;
use meatstick_payload::range::{DEFAULT_MAX_CELSIUS, DEFAULT_MIN_CELSIUS};
use meatstick_payload::{
    Layout, LayoutTable, PlausibleRange, ProbeDecoder, SlotKey, SlotOrder, SlotPriority,
};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// Environment variable naming the optional configuration file
pub const CONFIG_PATH_VAR: &str = "MEATSTICK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "meatstick.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Broadcast event source: a JSON-lines file, or "-" for stdin
    #[serde(default = "default_input")]
    pub input: String,

    /// Probes to track
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,

    #[serde(default)]
    pub decoder: DecoderSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DecoderSettings {
    /// Lowest plausible reading in °C
    #[serde(default = "default_min_celsius")]
    pub min_celsius: f64,

    /// Highest plausible reading in °C
    #[serde(default = "default_max_celsius")]
    pub max_celsius: f64,

    /// Whether service or manufacturer data is tried first
    #[serde(default)]
    pub slot_order: SlotOrder,

    /// Company identifiers tried before any other slot
    #[serde(default, deserialize_with = "list_or_csv")]
    pub preferred_manufacturer_ids: Vec<u16>,

    /// Service UUIDs tried before any other slot
    #[serde(default, deserialize_with = "list_or_csv")]
    pub preferred_service_uuids: Vec<Uuid>,

    /// Payload layouts; empty means the provisional fixed-offset layout
    #[serde(default)]
    pub layouts: Vec<Layout>,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            min_celsius: default_min_celsius(),
            max_celsius: default_max_celsius(),
            slot_order: SlotOrder::default(),
            preferred_manufacturer_ids: Vec::new(),
            preferred_service_uuids: Vec::new(),
            layouts: Vec::new(),
        }
    }
}

impl DecoderSettings {
    /// Build the decoder described by these settings.
    ///
    /// Preferred slots follow `slot_order`: with `service_first` the preferred
    /// service UUIDs come before the preferred company identifiers.
    pub fn build_decoder(&self) -> Result<ProbeDecoder, ConfigError> {
        if !self.min_celsius.is_finite()
            || !self.max_celsius.is_finite()
            || self.min_celsius > self.max_celsius
        {
            return Err(ConfigError::Message(format!(
                "invalid decoder range: min_celsius {} max_celsius {}",
                self.min_celsius, self.max_celsius
            )));
        }

        for (index, layout) in self.layouts.iter().enumerate() {
            let divisor = layout.rule.divisor;
            if !divisor.is_finite() || divisor <= 0.0 {
                return Err(ConfigError::Message(format!(
                    "invalid decoder layout {index}: divisor must be positive, got {divisor}"
                )));
            }
        }

        let services = self
            .preferred_service_uuids
            .iter()
            .map(|uuid| SlotKey::Service(*uuid));
        let manufacturers = self
            .preferred_manufacturer_ids
            .iter()
            .map(|id| SlotKey::Manufacturer(*id));
        let preferred: Vec<SlotKey> = match self.slot_order {
            SlotOrder::ServiceFirst => services.chain(manufacturers).collect(),
            SlotOrder::ManufacturerFirst => manufacturers.chain(services).collect(),
        };

        let layouts = if self.layouts.is_empty() {
            LayoutTable::placeholder()
        } else {
            LayoutTable::new(self.layouts.clone())
        };

        Ok(ProbeDecoder::new(
            layouts,
            PlausibleRange::new(self.min_celsius, self.max_celsius),
            SlotPriority::new(preferred, self.slot_order),
        ))
    }
}

/// Accept a list or a comma separated string, so list keys can also be set
/// from a single environment variable.
fn list_or_csv<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    struct ListVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for ListVisitor<T>
    where
        T: Deserialize<'de> + FromStr,
        T::Err: fmt::Display,
    {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list or a comma separated string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Vec<T>, E> {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| item.parse().map_err(E::custom))
                .collect()
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element()? {
                items.push(item);
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(ListVisitor(PhantomData))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_input() -> String {
    "-".to_string()
}

fn default_min_celsius() -> f64 {
    DEFAULT_MIN_CELSIUS
}

fn default_max_celsius() -> f64 {
    DEFAULT_MAX_CELSIUS
}

impl ServiceConfig {
    /// Load from the config file, then `MEATSTICK_*` environment variables.
    /// Nested keys use `__`, e.g. `MEATSTICK_DECODER__MAX_CELSIUS`; list keys
    /// take comma separated values.
    ///
    /// A file named by `MEATSTICK_CONFIG` must exist; the default
    /// `meatstick.toml` is optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };
        Self::load(file)
    }

    fn load<S>(file: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("MEATSTICK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Whether events should be read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input == "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use meatstick_payload::Advertisement;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const SVC: Uuid = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);

    fn clear_env() {
        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("MEATSTICK_LOG_LEVEL");
            std::env::remove_var("MEATSTICK_INPUT");
            std::env::remove_var("MEATSTICK_DECODER__MAX_CELSIUS");
            std::env::remove_var("MEATSTICK_DECODER__PREFERRED_MANUFACTURER_IDS");
            std::env::remove_var("MEATSTICK_DECODER__PREFERRED_SERVICE_UUIDS");
            std::env::remove_var(CONFIG_PATH_VAR);
        }
    }

    fn from_toml(toml: &str) -> ServiceConfig {
        ServiceConfig::load(File::from_str(toml, FileFormat::Toml)).unwrap()
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = from_toml("");
        assert_eq!(config.log_level, "info");
        assert!(config.reads_stdin());
        assert!(config.probes.is_empty());
        assert_eq!(config.decoder, DecoderSettings::default());
    }

    #[test]
    fn test_custom_config_from_env() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("MEATSTICK_LOG_LEVEL", "debug");
            std::env::set_var("MEATSTICK_INPUT", "broadcasts.jsonl");
            std::env::set_var("MEATSTICK_DECODER__MAX_CELSIUS", "150");
        }

        let config = from_toml("");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.input, "broadcasts.jsonl");
        assert!(!config.reads_stdin());
        assert_eq!(config.decoder.max_celsius, 150.0);
        assert_eq!(config.decoder.min_celsius, DEFAULT_MIN_CELSIUS);

        clear_env();
    }

    #[test]
    fn test_probes_and_decoder_from_file() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = from_toml(
            r#"
            [[probes]]
            address = "40:51:6c:09:a2:00"
            name = "MeatStick Yellow"

            [[probes]]
            address = "40:51:6C:09:A2:01"

            [decoder]
            min_celsius = -20.0
            slot_order = "manufacturer_first"
            preferred_service_uuids = ["0000fff0-0000-1000-8000-00805f9b34fb"]
            preferred_manufacturer_ids = [2641]
            "#,
        );

        assert_eq!(config.probes.len(), 2);
        assert_eq!(config.probes[0].display_name(), "MeatStick Yellow");
        assert_eq!(
            config.probes[1].display_name(),
            "MeatStick 40:51:6C:09:A2:01"
        );

        let decoder = config.decoder.build_decoder().unwrap();
        assert_eq!(decoder.range(), &PlausibleRange::new(-20.0, DEFAULT_MAX_CELSIUS));
        assert_eq!(
            decoder.priority().preferred,
            vec![SlotKey::Manufacturer(2641), SlotKey::Service(SVC)]
        );
    }

    #[test]
    fn test_custom_layout_from_file() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = from_toml(
            r#"
            [[decoder.layouts]]
            rule = { offset = 4, divisor = 100.0 }
            "#,
        );

        let decoder = config.decoder.build_decoder().unwrap();
        let adv = Advertisement::new().with_service_data(SVC, vec![0, 0, 0, 0, 0x0B, 0xB8]);
        assert_eq!(decoder.decode(&adv), Some(30.0));
    }

    #[test]
    fn test_missing_explicit_config_file_is_error() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var(CONFIG_PATH_VAR, "/nonexistent/meatstick-typo.toml");
        }

        assert!(ServiceConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_preferred_slots_from_env() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("MEATSTICK_DECODER__PREFERRED_MANUFACTURER_IDS", "2641, 89");
            std::env::set_var(
                "MEATSTICK_DECODER__PREFERRED_SERVICE_UUIDS",
                "0000fff0-0000-1000-8000-00805f9b34fb",
            );
        }

        let config = from_toml("");
        assert_eq!(config.decoder.preferred_manufacturer_ids, vec![2641, 89]);
        assert_eq!(config.decoder.preferred_service_uuids, vec![SVC]);

        let decoder = config.decoder.build_decoder().unwrap();
        assert_eq!(
            decoder.priority().preferred,
            vec![
                SlotKey::Service(SVC),
                SlotKey::Manufacturer(2641),
                SlotKey::Manufacturer(89),
            ]
        );

        clear_env();
    }

    #[test]
    fn test_single_preferred_id_from_env() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("MEATSTICK_DECODER__PREFERRED_MANUFACTURER_IDS", "2641");
        }

        let config = from_toml("");
        assert_eq!(config.decoder.preferred_manufacturer_ids, vec![2641]);

        clear_env();
    }

    #[test]
    fn test_non_positive_divisor_is_rejected() {
        for divisor in ["0.0", "-10.0", "nan"] {
            let toml = format!(
                "[[decoder.layouts]]\nrule = {{ offset = 2, divisor = {divisor} }}\n"
            );
            let settings: DecoderSettings = {
                let _lock = TEST_LOCK.lock().unwrap();
                clear_env();
                from_toml(&toml).decoder
            };
            assert!(settings.build_decoder().is_err(), "divisor {divisor}");
        }
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let settings = DecoderSettings {
            min_celsius: 100.0,
            max_celsius: 0.0,
            ..DecoderSettings::default()
        };
        assert!(settings.build_decoder().is_err());
    }
}
