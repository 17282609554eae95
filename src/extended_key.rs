//! Extended keys as text
//!
//! Key expressions (`[fingerprint/path]xpub...`, with an optional derivation suffix) are parsed
//! by miniscript, anything else a hardware wallet exports (SLIP-132 keys, descriptor pairs,
//! wallet JSON, Electrum files) is handed to pubport.

use std::{str::FromStr as _, sync::Arc};

use bdk_wallet::miniscript::descriptor::{
    DescriptorPublicKey, DescriptorSecretKey, DescriptorXKey, Wildcard,
};
use bitcoin::{
    NetworkKind,
    bip32::{DerivationPath, KeySource, Xpriv, Xpub},
};
use cove_util::result_ext::ResultExt as _;
use derive_more::{Deref, From};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtendedKeyError {
    #[error("not a key expression or hardware wallet export: {0}")]
    Unrecognized(String),

    #[error("key expression is not a single extended key")]
    NotExtended,
}

type Error = ExtendedKeyError;
type Result<T, E = Error> = std::result::Result<T, E>;

/// Watch-only export in one of the formats pubport understands
#[derive(Debug, Clone, PartialEq, Eq, Deref, From)]
pub struct HardwareExport(Arc<pubport::Format>);

impl HardwareExport {
    pub fn new(format: pubport::Format) -> Self {
        Self(Arc::new(format))
    }

    pub fn format(&self) -> &pubport::Format {
        self.0.as_ref()
    }
}

impl From<pubport::Format> for HardwareExport {
    fn from(format: pubport::Format) -> Self {
        Self::new(format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedKey {
    Public(DescriptorXKey<Xpub>),
    Private(DescriptorXKey<Xpriv>),
    Export(HardwareExport),
}

impl ExtendedKey {
    pub fn try_from_str(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Some(key) = DescriptorPublicKey::from_str(input).ok_traced("public key expression") {
            return match key {
                DescriptorPublicKey::XPub(xkey) => Ok(Self::Public(xkey)),
                DescriptorPublicKey::Single(_) | DescriptorPublicKey::MultiXPub(_) => {
                    Err(Error::NotExtended)
                }
            };
        }

        if let Some(key) = DescriptorSecretKey::from_str(input).ok_traced("secret key expression") {
            return match key {
                DescriptorSecretKey::XPrv(xkey) => Ok(Self::Private(xkey)),
                DescriptorSecretKey::Single(_) | DescriptorSecretKey::MultiXPrv(_) => {
                    Err(Error::NotExtended)
                }
            };
        }

        pubport::Format::try_new_from_str(input)
            .map(|format| Self::Export(format.into()))
            .map_err_str(Error::Unrecognized)
    }

    pub fn from_xpub(xpub: Xpub, origin: Option<KeySource>) -> Self {
        Self::Public(DescriptorXKey {
            origin,
            xkey: xpub,
            derivation_path: DerivationPath::master(),
            wildcard: Wildcard::None,
        })
    }

    /// Private keys are carried as masters, without an origin
    pub fn from_xpriv(xpriv: Xpriv) -> Self {
        Self::Private(DescriptorXKey {
            origin: None,
            xkey: xpriv,
            derivation_path: DerivationPath::master(),
            wildcard: Wildcard::None,
        })
    }

    pub fn xpub(&self) -> Option<&Xpub> {
        match self {
            Self::Public(key) => Some(&key.xkey),
            Self::Private(_) | Self::Export(_) => None,
        }
    }

    pub fn origin(&self) -> Option<&KeySource> {
        match self {
            Self::Public(key) => key.origin.as_ref(),
            Self::Private(key) => key.origin.as_ref(),
            Self::Export(_) => None,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private(_))
    }

    pub fn network(&self) -> Option<NetworkKind> {
        match self {
            Self::Public(key) => Some(key.xkey.network),
            Self::Private(key) => Some(key.xkey.network),
            Self::Export(_) => None,
        }
    }

    /// Text form of a parsed key, exports keep their own formats
    pub fn key_expression(&self) -> Option<String> {
        match self {
            Self::Public(key) => Some(DescriptorPublicKey::XPub(key.clone()).to_string()),
            Self::Private(key) => Some(DescriptorSecretKey::XPrv(key.clone()).to_string()),
            Self::Export(_) => None,
        }
    }
}
