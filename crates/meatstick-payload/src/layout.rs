//! Dispatch from a payload to the decoding rule for its device variant.

use crate::range::PlausibleRange;
use crate::rule::DecodeRule;
use crate::{PayloadError, Result};
use serde::{Deserialize, Serialize};

/// Selects which payloads a layout applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discriminator {
    /// Every payload
    #[default]
    Any,
    /// Payloads of exactly this many bytes
    Length(usize),
    /// Payloads whose first byte is this type marker
    LeadingByte(u8),
}

impl Discriminator {
    pub fn matches(&self, payload: &[u8]) -> bool {
        match *self {
            Discriminator::Any => true,
            Discriminator::Length(len) => payload.len() == len,
            Discriminator::LeadingByte(marker) => payload.first() == Some(&marker),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub discriminator: Discriminator,
    #[serde(default)]
    pub rule: DecodeRule,
}

impl Layout {
    pub const fn new(discriminator: Discriminator, rule: DecodeRule) -> Self {
        Self {
            discriminator,
            rule,
        }
    }
}

/// Ordered set of layouts tried against a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTable {
    layouts: Vec<Layout>,
}

impl LayoutTable {
    pub fn new(layouts: Vec<Layout>) -> Self {
        Self { layouts }
    }

    /// Table holding only the provisional fixed-offset layout.
    pub fn placeholder() -> Self {
        Self::new(vec![Layout::new(
            Discriminator::Any,
            DecodeRule::PLACEHOLDER,
        )])
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    /// Decode with the first matching layout that yields a plausible value.
    ///
    /// When several layouts match, the error from the last one tried is
    /// returned if none succeeds.
    pub fn decode(&self, payload: &[u8], range: &PlausibleRange) -> Result<f64> {
        let mut last_err = None;

        for layout in self
            .layouts
            .iter()
            .filter(|layout| layout.discriminator.matches(payload))
        {
            match layout.rule.apply(payload).and_then(|c| range.check(c)) {
                Ok(celsius) => return Ok(celsius),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or(PayloadError::NoMatchingLayout { len: payload.len() }))
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl From<Vec<Layout>> for LayoutTable {
    fn from(layouts: Vec<Layout>) -> Self {
        Self::new(layouts)
    }
}
