//! PSBT detection in text and byte payloads

use base64::{Engine as _, prelude::BASE64_STANDARD};
use derive_more::{AsRef, Deref, From, Into};

pub type BitcoinPsbt = bitcoin::Psbt;

/// PSBT magic bytes: "psbt" + 0xff
pub const PSBT_MAGIC: &[u8] = &[0x70, 0x73, 0x62, 0x74, 0xff];

/// Base64 encoding of the magic prefix
const PSBT_BASE64_PREFIX: &str = "cHNidP";

/// Hex encoding of the magic prefix
const PSBT_HEX_PREFIX: &str = "70736274ff";

#[derive(Debug, Clone, PartialEq, Eq, From, Deref, AsRef, Into)]
pub struct Psbt(pub BitcoinPsbt);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PsbtError {
    #[error("missing PSBT magic bytes")]
    MissingMagic,

    #[error("failed to decode hex: {0}")]
    HexDecode(String),

    #[error("failed to decode base64: {0}")]
    Base64Decode(String),

    #[error("failed to parse PSBT: {0}")]
    Parse(String),
}

type Error = PsbtError;
type Result<T, E = Error> = std::result::Result<T, E>;

impl Psbt {
    pub fn try_from_bytes(data: &[u8]) -> Result<Self> {
        if !data.starts_with(PSBT_MAGIC) {
            return Err(Error::MissingMagic);
        }

        let psbt = BitcoinPsbt::deserialize(data).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self(psbt))
    }

    /// Base64 (case-sensitive) or hex (any case) text
    pub fn try_from_str(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.starts_with(PSBT_BASE64_PREFIX) {
            let bytes =
                BASE64_STANDARD.decode(input).map_err(|e| Error::Base64Decode(e.to_string()))?;
            return Self::try_from_bytes(&bytes);
        }

        let prefix = input.get(..PSBT_HEX_PREFIX.len());
        if prefix.is_some_and(|prefix| prefix.eq_ignore_ascii_case(PSBT_HEX_PREFIX)) {
            let bytes = hex::decode(input).map_err(|e| Error::HexDecode(e.to_string()))?;
            return Self::try_from_bytes(&bytes);
        }

        Err(Error::MissingMagic)
    }

    pub fn into_inner(self) -> BitcoinPsbt {
        self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.0.serialize())
    }
}
