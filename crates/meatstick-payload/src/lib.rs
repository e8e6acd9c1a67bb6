//! Temperature decoding for MeatStick BLE advertisements.
//!
//! Probes broadcast their reading inside manufacturer-specific or service
//! data. Decoding is a pure function of the advertisement bytes: malformed,
//! truncated or foreign payloads produce no value, never a panic.
//!
//! ```
//! use meatstick_payload::{decode, Advertisement, ProbeDecoder};
//! use uuid::Uuid;
//!
//! // Provisional fixed-offset rule, bytes 2-3 in tenths of a degree
//! assert_eq!(decode(&[0xAA, 0xBB, 0x00, 0x64]), Some(10.0));
//!
//! let service = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);
//! let adv = Advertisement::new().with_service_data(service, vec![0, 0, 0x02, 0x9E]);
//! assert_eq!(ProbeDecoder::default().decode(&adv), Some(67.0));
//! ```

pub mod advertisement;
pub mod decoder;
mod error;
pub mod layout;
pub mod range;
pub mod rule;

pub use advertisement::{Advertisement, SlotKey, SlotOrder, SlotPriority};
pub use decoder::{Decoded, ProbeDecoder, decode};
pub use error::{PayloadError, Result};
pub use layout::{Discriminator, Layout, LayoutTable};
pub use range::PlausibleRange;
pub use rule::{ByteOrder, DecodeRule, Signedness};

/// Trait for turning an advertisement into a validated temperature
pub trait TemperatureDecoder: Send + Sync {
    /// Decode the advertisement, reporting the source slot or the reason no
    /// value was found
    fn decode_advertisement(&self, advertisement: &Advertisement) -> Result<Decoded>;
}
