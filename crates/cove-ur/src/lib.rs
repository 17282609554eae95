//! Blockchain Commons registry types carried inside URs

pub mod account;
pub mod address;
pub mod bc32;
pub mod cbor;
pub mod coin_info;
pub mod error;
pub mod hdkey;
pub mod keypath;
pub mod output;
pub mod psbt;
pub mod registry;
pub mod seed;
pub mod ur;

pub use account::CryptoAccount;
pub use address::{AddressKind, CryptoAddress};
pub use cbor::RegistryItem;
pub use coin_info::CryptoCoinInfo;
pub use error::{Result, UrError};
pub use hdkey::CryptoHdkey;
pub use keypath::{CryptoKeypath, PathComponent};
pub use output::{CryptoOutput, OutputKeys, ScriptExpression};
pub use psbt::CryptoPsbt;
pub use seed::{CryptoBip39, CryptoSeed};
pub use ur::Ur;
