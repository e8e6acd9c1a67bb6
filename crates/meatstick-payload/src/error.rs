use thiserror::Error;

/// Reason a payload produced no temperature.
///
/// Every variant is an expected outcome for broadcast traffic, not a fault.
/// The variants carry only `Copy` data so building one never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PayloadError {
    #[error("insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("decoded value {celsius} °C outside plausible range [{min}, {max}]")]
    OutOfRange { celsius: f64, min: f64, max: f64 },

    #[error("no layout matches a {len} byte payload")]
    NoMatchingLayout { len: usize },

    #[error("advertisement carries no decodable payload slot")]
    NoCandidate,
}

pub type Result<T> = std::result::Result<T, PayloadError>;
