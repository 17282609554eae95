//! Turns a stream of decoded QR frames into one typed wallet payload
//!
//! Frames go into a [`ScanSession`], either directly through [`ScanSession::ingest`] or over a
//! channel with [`ScanSession::run`]. Animated sequences (UR fountain codes, BBQr and `p<i>of<n>`
//! segments) are reassembled, single frames are sniffed for their format.

pub mod address;
pub mod classify;
pub mod config;
pub mod descriptor;
pub mod extended_key;
pub mod fountain;
pub mod frame;
pub mod legacy_segments;
pub mod logging;
pub mod mnemonic;
pub mod psbt;
pub mod registry;
pub mod scan_result;
pub mod seed;
pub mod seed_qr;
pub mod segmented;
pub mod session;
pub mod sniffer;
pub mod transaction;

pub use config::ScanConfig;
pub use frame::Frame;
pub use scan_result::{ScanError, ScanResult, ScanResultKind};
pub use session::{ScanEvent, ScanHandle, ScanSession, ScanSnapshot, ScanStatus, ScanUpdate};
