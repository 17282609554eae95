//! Raw consensus-encoded transactions

use bitcoin::consensus;
use derive_more::{AsRef, Deref, From, Into};

pub type BitcoinTransaction = bitcoin::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, From, Deref, AsRef, Into)]
pub struct Transaction(pub BitcoinTransaction);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("failed to decode hex: {0}")]
    HexDecode(String),

    #[error("failed to deserialize transaction: {0}")]
    Deserialize(String),

    #[error("transaction has no inputs or no outputs")]
    Empty,
}

type Error = TransactionError;
type Result<T, E = Error> = std::result::Result<T, E>;

impl Transaction {
    /// Consensus bytes, every byte must be consumed
    pub fn try_from_bytes(data: &[u8]) -> Result<Self> {
        let tx: BitcoinTransaction =
            consensus::deserialize(data).map_err(|e| Error::Deserialize(e.to_string()))?;

        // short random blobs can deserialize into a degenerate transaction
        if tx.input.is_empty() || tx.output.is_empty() {
            return Err(Error::Empty);
        }

        Ok(Self(tx))
    }

    pub fn try_from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input.trim()).map_err(|e| Error::HexDecode(e.to_string()))?;
        Self::try_from_bytes(&bytes)
    }

    pub fn into_inner(self) -> BitcoinTransaction {
        self.0
    }
}
