//! Identify a complete single-frame payload
//!
//! Attempts run in a fixed order and the first match wins. Stricter formats come before the
//! looser hex and base64 blobs, and text attempts come before byte attempts.

use cove_util::{base43, result_ext::ResultExt as _};
use tracing::debug;

use crate::{
    address::{AddressWithNetwork, PaymentUri},
    config::ScanConfig,
    extended_key::ExtendedKey,
    frame::Frame,
    mnemonic::ParseMnemonic as _,
    psbt::Psbt,
    scan_result::ScanResult,
    seed::Seed,
    seed_qr::SeedQr,
    transaction::Transaction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum SniffStep {
    ExtendedKey,
    PaymentUri,
    Address,
    PsbtText,
    TransactionHex,
    PsbtBytes,
    TransactionBytes,
    PsbtBase43,
    TransactionBase43,
    SeedQr,
    CompactSeedQr,
    Mnemonic,
    Text,
}

/// What each attempt gets to look at
struct Payload<'a> {
    /// As decoded, the lossy rendering of the bytes when there was no text
    raw: &'a str,
    /// `raw` without surrounding whitespace
    text: &'a str,
    /// Only when they differ from the text
    bytes: Option<&'a [u8]>,
}

type Attempt = fn(&Payload<'_>, &ScanConfig) -> Option<ScanResult>;

const STEPS: &[(SniffStep, Attempt)] = &[
    (SniffStep::ExtendedKey, extended_key),
    (SniffStep::PaymentUri, payment_uri),
    (SniffStep::Address, address),
    (SniffStep::PsbtText, psbt_text),
    (SniffStep::TransactionHex, transaction_hex),
    (SniffStep::PsbtBytes, psbt_bytes),
    (SniffStep::TransactionBytes, transaction_bytes),
    (SniffStep::PsbtBase43, psbt_base43),
    (SniffStep::TransactionBase43, transaction_base43),
    (SniffStep::SeedQr, seed_qr),
    (SniffStep::CompactSeedQr, compact_seed_qr),
    (SniffStep::Mnemonic, mnemonic),
    (SniffStep::Text, text),
];

/// The order attempts are made in
pub fn steps() -> impl Iterator<Item = SniffStep> {
    STEPS.iter().map(|(step, _)| *step)
}

pub fn sniff(frame: &Frame, config: &ScanConfig) -> ScanResult {
    let raw = frame.text_or_lossy();
    let payload = Payload { raw: &raw, text: raw.trim(), bytes: frame.distinct_bytes() };

    STEPS
        .iter()
        .find_map(|(step, attempt)| {
            let result = attempt(&payload, config)?;
            debug!("sniffed {step}");
            Some(result)
        })
        .unwrap_or_else(|| ScanResult::Text(payload.raw.to_string()))
}

fn extended_key(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let key = ExtendedKey::try_from_str(payload.text).ok_traced("extended key")?;
    Some(ScanResult::ExtendedKey { key, name: None })
}

fn payment_uri(payload: &Payload<'_>, config: &ScanConfig) -> Option<ScanResult> {
    PaymentUri::try_from_uri(payload.text, config.network)
        .ok_traced("payment uri")
        .map(ScanResult::PaymentUri)
}

/// A bare address is treated as a URI with no parameters
fn address(payload: &Payload<'_>, config: &ScanConfig) -> Option<ScanResult> {
    let address = AddressWithNetwork::try_new(payload.text, config.network).ok_traced("address")?;
    Some(ScanResult::PaymentUri(address.into()))
}

fn psbt_text(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let psbt = Psbt::try_from_str(payload.text).ok_traced("psbt text")?;
    Some(ScanResult::Psbt(Box::new(psbt)))
}

fn transaction_hex(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    Transaction::try_from_hex(payload.text)
        .ok_traced("transaction hex")
        .map(ScanResult::Transaction)
}

fn psbt_bytes(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let psbt = Psbt::try_from_bytes(payload.bytes?).ok_traced("psbt bytes")?;
    Some(ScanResult::Psbt(Box::new(psbt)))
}

fn transaction_bytes(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    Transaction::try_from_bytes(payload.bytes?)
        .ok_traced("transaction bytes")
        .map(ScanResult::Transaction)
}

fn psbt_base43(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let bytes = base43::decode(payload.text).ok_traced("base43")?;
    let psbt = Psbt::try_from_bytes(&bytes).ok_traced("base43 psbt")?;
    Some(ScanResult::Psbt(Box::new(psbt)))
}

fn transaction_base43(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let bytes = base43::decode(payload.text).ok_traced("base43")?;
    Transaction::try_from_bytes(&bytes).ok_traced("base43 transaction").map(ScanResult::Transaction)
}

fn seed_qr(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let seed_qr = SeedQr::try_from_str(payload.text).ok_traced("seed qr")?;
    Some(ScanResult::Seed(Seed::new(seed_qr.into_mnemonic())))
}

fn compact_seed_qr(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let seed_qr = SeedQr::try_from_data(payload.bytes?).ok_traced("compact seed qr")?;
    Some(ScanResult::Seed(Seed::new(seed_qr.into_mnemonic())))
}

fn mnemonic(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    let mnemonic = payload.text.parse_mnemonic().ok_traced("mnemonic")?;
    Some(ScanResult::Seed(Seed::new(mnemonic)))
}

fn text(payload: &Payload<'_>, _: &ScanConfig) -> Option<ScanResult> {
    Some(ScanResult::Text(payload.raw.to_string()))
}
