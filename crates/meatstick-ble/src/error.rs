use thiserror::Error;

#[derive(Debug, Error)]
pub enum BleError {
    #[error("invalid MAC address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("malformed broadcast event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BleError>;
