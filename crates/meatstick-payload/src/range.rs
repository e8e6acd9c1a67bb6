use crate::{PayloadError, Result};
use serde::{Deserialize, Serialize};

/// Lowest temperature a probe is expected to report (°C)
pub const DEFAULT_MIN_CELSIUS: f64 = -40.0;

/// Highest temperature a probe is expected to report (°C)
pub const DEFAULT_MAX_CELSIUS: f64 = 300.0;

/// Inclusive band of physically plausible readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
}

impl PlausibleRange {
    pub const DEFAULT: Self = Self {
        min: DEFAULT_MIN_CELSIUS,
        max: DEFAULT_MAX_CELSIUS,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, celsius: f64) -> bool {
        celsius.is_finite() && celsius >= self.min && celsius <= self.max
    }

    /// Pass `celsius` through if plausible, otherwise report it as out of range.
    pub fn check(&self, celsius: f64) -> Result<f64> {
        if self.contains(celsius) {
            Ok(celsius)
        } else {
            Err(PayloadError::OutOfRange {
                celsius,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for PlausibleRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}
