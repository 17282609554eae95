use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrError {
    #[error("Failed to encode CBOR: {0}")]
    CborEncodeError(String),

    #[error("Failed to decode CBOR: {0}")]
    CborDecodeError(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid key data length: expected {expected}, got {actual}")]
    InvalidKeyDataLength { expected: usize, actual: usize },

    #[error("Invalid tag: expected {expected}, got {actual}")]
    InvalidTag { expected: u64, actual: u64 },

    #[error("Unexpected tag {0}")]
    UnexpectedTag(u64),

    #[error("Invalid payload length: {0}")]
    InvalidPayloadLength(usize),

    #[error("Failed to parse UR: {0}")]
    UrParseError(String),

    #[error("Invalid key data: {0}")]
    InvalidKeyData(String),

    #[error("Unknown address type: {0}")]
    UnknownAddressType(u32),

    #[error("Invalid bc32 data: {0}")]
    Bc32(String),
}

pub type Result<T, E = UrError> = std::result::Result<T, E>;

/// Helper trait to convert minicbor errors to `UrError`
pub trait ToUrError<T> {
    fn map_err_cbor_encode(self) -> Result<T>;
    fn map_err_cbor_decode(self) -> Result<T>;
}

impl<T, E: std::fmt::Display> ToUrError<T> for std::result::Result<T, E> {
    fn map_err_cbor_encode(self) -> Result<T> {
        self.map_err(|e| UrError::CborEncodeError(e.to_string()))
    }

    fn map_err_cbor_decode(self) -> Result<T> {
        self.map_err(|e| UrError::CborDecodeError(e.to_string()))
    }
}
