//! Fountain-coded UR reassembly
//!
//! Both UR dialects sit behind [`FountainDecoder`], the strategy is picked once when the
//! session commits to the protocol.

mod indexed;
mod legacy;

use cove_ur::UrError;
use tracing::debug;

use crate::classify::Dialect;

pub use indexed::IndexedDecoder;
pub use legacy::LegacyDecoder;

/// Highest progress reported before the decoder actually hands over a message
const MAX_IN_PROGRESS: f64 = 0.99;

/// A reassembled UR message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrPayload {
    pub ur_type: String,
    pub cbor: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FountainError {
    #[error("invalid UR: {0}")]
    InvalidUr(#[from] UrError),

    #[error("fountain decoder rejected part: {0}")]
    Decoder(String),

    #[error("invalid sequence {0}")]
    InvalidSequence(String),

    #[error("payload does not match its digest")]
    DigestMismatch,

    #[error("decoder completed without a message")]
    MissingMessage,
}

pub trait FountainDecoder: Send {
    /// Feed one frame, the message comes back once it can be reconstructed
    fn receive(&mut self, text: &str) -> Result<Option<UrPayload>, FountainError>;

    /// Decoder's own estimate, may jump when redundant parts arrive
    fn estimated_percent_complete(&self) -> f64;
}

pub struct FountainAccumulator {
    dialect: Dialect,
    decoder: Box<dyn FountainDecoder>,
    percent: f64,
}

impl std::fmt::Debug for FountainAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FountainAccumulator")
            .field("dialect", &self.dialect)
            .field("percent", &self.percent)
            .finish_non_exhaustive()
    }
}

impl FountainAccumulator {
    pub fn new(dialect: Dialect) -> Self {
        let decoder: Box<dyn FountainDecoder> = match dialect {
            Dialect::Indexed => Box::new(IndexedDecoder::default()),
            Dialect::Legacy => Box::new(LegacyDecoder::default()),
        };

        Self { dialect, decoder, percent: 0.0 }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Never decreases, only reaches 1.0 once the message is out
    pub fn percent_complete(&self) -> f64 {
        self.percent
    }

    pub fn ingest(&mut self, text: &str) -> Result<Option<UrPayload>, FountainError> {
        if let Some(payload) = self.decoder.receive(text)? {
            debug!("{} UR complete, type {}", self.dialect, payload.ur_type);
            self.percent = 1.0;
            return Ok(Some(payload));
        }

        let estimate = self.decoder.estimated_percent_complete().clamp(0.0, MAX_IN_PROGRESS);
        self.percent = self.percent.max(estimate);

        Ok(None)
    }
}
