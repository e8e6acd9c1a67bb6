use crate::advertisement::{Advertisement, SlotKey, SlotPriority};
use crate::layout::LayoutTable;
use crate::range::PlausibleRange;
use crate::rule::DecodeRule;
use crate::{PayloadError, Result, TemperatureDecoder};

/// Decode a single payload with the provisional fixed-offset rule.
///
/// Bytes 2-3 are read as an unsigned big-endian integer in tenths of a degree.
/// Payloads shorter than 4 bytes (including empty ones) yield `None`. No range
/// check is applied; use [`ProbeDecoder`] for validated readings.
#[must_use]
pub fn decode(payload: &[u8]) -> Option<f64> {
    DecodeRule::PLACEHOLDER.apply(payload).ok()
}

/// A successful decode together with the slot it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded {
    pub slot: SlotKey,
    pub celsius: f64,
}

/// Validated, multi-layout, multi-slot temperature decoder.
///
/// Holds only immutable configuration; share it freely between threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeDecoder {
    layouts: LayoutTable,
    range: PlausibleRange,
    priority: SlotPriority,
}

impl ProbeDecoder {
    pub fn new(layouts: LayoutTable, range: PlausibleRange, priority: SlotPriority) -> Self {
        Self {
            layouts,
            range,
            priority,
        }
    }

    pub fn with_layouts(mut self, layouts: LayoutTable) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn with_range(mut self, range: PlausibleRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_priority(mut self, priority: SlotPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn range(&self) -> &PlausibleRange {
        &self.range
    }

    pub fn priority(&self) -> &SlotPriority {
        &self.priority
    }

    /// Decode one payload, reporting why it produced no value.
    pub fn try_decode_payload(&self, payload: &[u8]) -> Result<f64> {
        self.layouts.decode(payload, &self.range)
    }

    pub fn decode_payload(&self, payload: &[u8]) -> Option<f64> {
        self.try_decode_payload(payload).ok()
    }

    /// Try every candidate slot in priority order; first plausible value wins.
    ///
    /// The error of the last candidate tried is returned when none decodes,
    /// or `NoCandidate` when the advertisement has no byte fields at all.
    pub fn try_decode(&self, advertisement: &Advertisement) -> Result<Decoded> {
        let mut last_err = PayloadError::NoCandidate;

        for (slot, payload) in advertisement.candidates(&self.priority) {
            match self.try_decode_payload(payload) {
                Ok(celsius) => return Ok(Decoded { slot, celsius }),
                Err(e) => last_err = e,
            }
        }

        Err(last_err)
    }

    pub fn decode(&self, advertisement: &Advertisement) -> Option<f64> {
        self.try_decode(advertisement).ok().map(|d| d.celsius)
    }
}

impl TemperatureDecoder for ProbeDecoder {
    fn decode_advertisement(&self, advertisement: &Advertisement) -> Result<Decoded> {
        self.try_decode(advertisement)
    }
}
