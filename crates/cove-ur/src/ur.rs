//! Case-insensitive UR parsing
//!
//! QR alphanumeric mode forces URs to upper case, foundation_ur only accepts lower case.
//! BCR-2020-005: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-005-ur.md

use cove_util::ResultExt as _;
use foundation_ur::{
    UR as FoundationUr,
    bytewords::{self, Style},
};

use crate::error::{Result, UrError};

/// A validated, lower-cased UR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ur {
    normalized: String,
    ur_type: String,
}

impl Ur {
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = text.trim().to_ascii_lowercase();
        let parsed = FoundationUr::parse(&normalized).map_err_str(UrError::UrParseError)?;

        let ur_type = parsed.as_type().to_string();
        if ur_type.is_empty() {
            return Err(UrError::MissingField("ur type"));
        }

        Ok(Self { normalized, ur_type })
    }

    /// e.g. `crypto-account`, `crypto-psbt`
    pub fn ur_type(&self) -> &str {
        &self.ur_type
    }

    /// Borrowed view for the fountain decoder
    pub fn as_foundation(&self) -> Result<FoundationUr<'_>> {
        FoundationUr::parse(&self.normalized).map_err_str(UrError::UrParseError)
    }

    pub fn is_single_part(&self) -> bool {
        matches!(
            self.as_foundation(),
            Ok(FoundationUr::SinglePart { .. } | FoundationUr::SinglePartDeserialized { .. })
        )
    }

    /// Message bytes for a single-part UR, the fragment bytes for a multi-part one
    pub fn message_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self.as_foundation()? {
            FoundationUr::SinglePart { message, .. } => {
                bytewords::decode(message, Style::Minimal).map_err_str(UrError::UrParseError)?
            }
            FoundationUr::SinglePartDeserialized { message, .. } => message.to_vec(),
            FoundationUr::MultiPart { fragment, .. } => {
                bytewords::decode(fragment, Style::Minimal).map_err_str(UrError::UrParseError)?
            }
            FoundationUr::MultiPartDeserialized { fragment, .. } => fragment.data.to_vec(),
        };

        Ok(bytes)
    }
}
