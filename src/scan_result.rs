use bitcoin::bip32::Fingerprint;
use cove_ur::UrError;
use strum::EnumDiscriminants;

use crate::{
    address::{AddressWithNetwork, PaymentUri},
    descriptor::{DescriptorError, OutputDescriptor},
    extended_key::ExtendedKey,
    psbt::Psbt,
    seed::Seed,
    transaction::Transaction,
};

/// The single terminal outcome of a scan
#[derive(Debug, Clone, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(ScanResultKind), derive(strum::Display))]
pub enum ScanResult {
    Transaction(Transaction),
    Psbt(Box<Psbt>),
    PaymentUri(PaymentUri),
    Address(AddressWithNetwork),
    ExtendedKey { key: ExtendedKey, name: Option<String> },
    OutputDescriptor(OutputDescriptor),
    Wallets { master_fingerprint: Fingerprint, descriptors: Vec<OutputDescriptor> },
    Seed(Seed),
    /// Scanned fine, but not a format we know
    Text(String),
    Error(ScanError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("malformed fountain data: {0}")]
    FountainDecode(String),

    #[error("malformed BBQr data: {0}")]
    SegmentedDecode(String),

    #[error("unsupported registry type {0}")]
    UnsupportedRegistryType(String),

    #[error("corrupt registry item: {0}")]
    CorruptRegistryItem(#[from] UrError),

    #[error("unsupported script expressions: {0}")]
    UnsupportedScriptExpressions(String),

    #[error("invalid output descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("account {0} has no usable output descriptors")]
    EmptyAccount(String),

    #[error("bytes are not a PSBT, a transaction or UTF-8 text")]
    UninterpretableBytes,

    #[error("unsupported BBQr content type {0}")]
    UnsupportedSegmentedType(String),
}

impl From<DescriptorError> for ScanError {
    fn from(error: DescriptorError) -> Self {
        match error {
            DescriptorError::UnsupportedScriptExpressions(names) => {
                Self::UnsupportedScriptExpressions(names)
            }
            DescriptorError::InvalidDescriptor(reason) => Self::InvalidDescriptor(reason),
            DescriptorError::Registry(error) => Self::CorruptRegistryItem(error),
        }
    }
}

impl ScanResult {
    pub fn kind(&self) -> ScanResultKind {
        ScanResultKind::from(self)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<ScanError> for ScanResult {
    fn from(error: ScanError) -> Self {
        Self::Error(error)
    }
}

impl From<Result<ScanResult, ScanError>> for ScanResult {
    fn from(result: Result<ScanResult, ScanError>) -> Self {
        result.unwrap_or_else(Self::Error)
    }
}
