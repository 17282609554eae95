//! BBQr segmented blocks

use std::collections::HashSet;

use bbqr::{
    continuous_join::{ContinuousJoinResult, ContinuousJoiner},
    file_type::FileType,
    header::Header,
};
use cove_util::ResultExt as _;
use tracing::{debug, warn};

use crate::{
    psbt::{Psbt, PsbtError},
    scan_result::{ScanError, ScanResult},
    transaction::{Transaction, TransactionError},
};

#[derive(Debug, thiserror::Error)]
pub enum SegmentedError {
    #[error("invalid BBQr header: {0}")]
    InvalidHeader(String),

    #[error("unable to join BBQr parts: {0}")]
    Join(String),

    #[error("unsupported BBQr content type {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Psbt(#[from] PsbtError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("BBQr text is not valid UTF-8")]
    InvalidUtf8,
}

impl From<SegmentedError> for ScanError {
    fn from(error: SegmentedError) -> Self {
        match error {
            SegmentedError::UnsupportedType(file_type) => Self::UnsupportedSegmentedType(file_type),
            other => Self::SegmentedDecode(other.to_string()),
        }
    }
}

pub struct SegmentedAccumulator {
    joiner: ContinuousJoiner,
    num_parts: usize,
    parts_left: usize,
    seen: HashSet<String>,
}

impl std::fmt::Debug for SegmentedAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedAccumulator")
            .field("num_parts", &self.num_parts)
            .field("parts_left", &self.parts_left)
            .finish_non_exhaustive()
    }
}

impl Default for SegmentedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentedAccumulator {
    pub fn new() -> Self {
        Self { joiner: ContinuousJoiner::new(), num_parts: 0, parts_left: 0, seen: HashSet::new() }
    }

    pub fn percent_complete(&self) -> f64 {
        if self.num_parts == 0 {
            return 0.0;
        }

        (self.num_parts - self.parts_left) as f64 / self.num_parts as f64
    }

    pub fn ingest(&mut self, text: &str) -> Result<Option<ScanResult>, SegmentedError> {
        let text = text.trim();
        let header = Header::try_from_str(text).map_err_str(SegmentedError::InvalidHeader)?;

        if self.num_parts == 0 {
            debug!("starting BBQr {:?}, expecting {} parts", header.file_type, header.num_parts);
            self.num_parts = header.num_parts;
            self.parts_left = header.num_parts;
        } else if header.num_parts != self.num_parts {
            warn!(
                "ignoring BBQr part of {}, already collecting {} parts",
                header.num_parts, self.num_parts
            );
            return Ok(None);
        }

        if !self.seen.insert(text.to_string()) {
            return Ok(None);
        }

        match self.joiner.add_part(text.to_string()).map_err_str(SegmentedError::Join)? {
            ContinuousJoinResult::Complete(joined) => {
                self.parts_left = 0;
                interpret(joined.data, header.file_type).map(Some)
            }

            ContinuousJoinResult::InProgress { parts_left } => {
                self.parts_left = parts_left.min(self.num_parts);
                Ok(None)
            }

            ContinuousJoinResult::NotStarted => Ok(None),
        }
    }
}

fn interpret(data: Vec<u8>, file_type: FileType) -> Result<ScanResult, SegmentedError> {
    let result = match file_type {
        FileType::Psbt => ScanResult::Psbt(Box::new(Psbt::try_from_bytes(&data)?)),
        FileType::Transaction => ScanResult::Transaction(Transaction::try_from_bytes(&data)?),
        FileType::UnicodeText | FileType::Json => {
            ScanResult::Text(String::from_utf8(data).map_err(|_| SegmentedError::InvalidUtf8)?)
        }
        FileType::Cbor => return Err(SegmentedError::UnsupportedType(format!("{file_type:?}"))),
    };

    Ok(result)
}
