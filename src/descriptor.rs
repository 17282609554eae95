//! Output descriptors rebuilt from crypto-output registry items

use std::{fmt, str::FromStr as _};

use bdk_wallet::miniscript::{
    Descriptor, DescriptorPublicKey,
    descriptor::{DerivPaths, DescriptorMultiXKey, DescriptorXKey, Wildcard},
};
use bitcoin::{
    Network,
    bip32::{ChildNumber, DerivationPath, Fingerprint, KeySource, Xpub},
};
use cove_ur::{
    CryptoHdkey, CryptoKeypath, CryptoOutput, OutputKeys, PathComponent, ScriptExpression,
    UrError,
};
use itertools::Itertools as _;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ScriptType {
    #[strum(to_string = "pkh")]
    P2pkh,
    #[strum(to_string = "sh(wpkh)")]
    P2shP2wpkh,
    #[strum(to_string = "wpkh")]
    P2wpkh,
    #[strum(to_string = "tr")]
    P2tr,
    #[strum(to_string = "sh")]
    P2sh,
    #[strum(to_string = "wsh")]
    P2wsh,
    #[strum(to_string = "sh(wsh)")]
    P2shP2wsh,
}

impl ScriptType {
    /// Expressions must already be stripped of any multisig or cosigner marker
    pub fn from_expressions(expressions: &[ScriptExpression]) -> Option<Self> {
        use ScriptExpression as E;

        let script_type = match expressions {
            [E::PublicKeyHash] => Self::P2pkh,
            [E::ScriptHash, E::WitnessPublicKeyHash] => Self::P2shP2wpkh,
            [E::WitnessPublicKeyHash] => Self::P2wpkh,
            [E::Taproot] => Self::P2tr,
            [E::ScriptHash] => Self::P2sh,
            [E::WitnessScriptHash] => Self::P2wsh,
            [E::ScriptHash, E::WitnessScriptHash] => Self::P2shP2wsh,
            _ => return None,
        };

        Some(script_type)
    }

    pub fn expressions(self) -> Vec<ScriptExpression> {
        use ScriptExpression as E;

        match self {
            Self::P2pkh => vec![E::PublicKeyHash],
            Self::P2shP2wpkh => vec![E::ScriptHash, E::WitnessPublicKeyHash],
            Self::P2wpkh => vec![E::WitnessPublicKeyHash],
            Self::P2tr => vec![E::Taproot],
            Self::P2sh => vec![E::ScriptHash],
            Self::P2wsh => vec![E::WitnessScriptHash],
            Self::P2shP2wsh => vec![E::ScriptHash, E::WitnessScriptHash],
        }
    }

    /// Script hash types wrap a script, the rest wrap a single key
    pub fn is_script_hash(self) -> bool {
        matches!(self, Self::P2sh | Self::P2wsh | Self::P2shP2wsh)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("unsupported script expressions: {0}")]
    UnsupportedScriptExpressions(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error(transparent)]
    Registry(#[from] UrError),
}

type Error = DescriptorError;
type Result<T, E = Error> = std::result::Result<T, E>;

/// `master` stands in for a keypath without a source fingerprint
pub fn key_source(
    keypath: &CryptoKeypath,
    master: Option<Fingerprint>,
) -> Result<KeySource, UrError> {
    let fingerprint = keypath
        .source_fingerprint
        .map(Fingerprint::from)
        .or(master)
        .unwrap_or_default();

    Ok((fingerprint, keypath.to_derivation_path()?))
}

/// `<0;1>/*`, the receive and change branches
fn receive_and_change() -> Result<DerivPaths, UrError> {
    let branch = |index| DerivationPath::from(vec![ChildNumber::Normal { index }]);

    DerivPaths::new(vec![branch(0), branch(1)])
        .ok_or_else(|| UrError::InvalidField("empty multipath derivation".to_string()))
}

fn is_receive_and_change(key: &DescriptorMultiXKey<Xpub>) -> bool {
    key.wildcard == Wildcard::Unhardened
        && receive_and_change().is_ok_and(|paths| paths == key.derivation_paths)
}

/// Splits a trailing `*` off a children keypath
fn split_wildcard(components: &[PathComponent]) -> Result<(DerivationPath, Wildcard), UrError> {
    let (path, wildcard) = match components.split_last() {
        Some((PathComponent::Wildcard { hardened }, path)) => {
            let wildcard = if *hardened { Wildcard::Hardened } else { Wildcard::Unhardened };
            (path, wildcard)
        }
        _ => (components, Wildcard::None),
    };

    let path = path
        .iter()
        .map(|component| {
            component.child_number().ok_or_else(|| {
                UrError::InvalidField(format!("children component {component} is not concrete"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((DerivationPath::from(path), wildcard))
}

fn wildcard_component(wildcard: Wildcard) -> Option<PathComponent> {
    match wildcard {
        Wildcard::None => None,
        Wildcard::Unhardened => Some(PathComponent::Wildcard { hardened: false }),
        Wildcard::Hardened => Some(PathComponent::Wildcard { hardened: true }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorKey {
    pub key: DescriptorPublicKey,
    pub name: Option<String>,
}

impl DescriptorKey {
    /// Keys without a children path derive `<0;1>/*`
    pub fn from_hdkey(
        hdkey: &CryptoHdkey,
        fallback: Network,
        master: Option<Fingerprint>,
    ) -> Result<Self, UrError> {
        let xkey = hdkey.to_xpub(hdkey.network_or(fallback))?;
        let origin =
            hdkey.origin.as_ref().map(|keypath| key_source(keypath, master)).transpose()?;

        let key = match &hdkey.children {
            None => DescriptorPublicKey::MultiXPub(DescriptorMultiXKey {
                origin,
                xkey,
                derivation_paths: receive_and_change()?,
                wildcard: Wildcard::Unhardened,
            }),
            Some(children) => {
                let (derivation_path, wildcard) = split_wildcard(&children.components)?;
                let key = DescriptorXKey { origin, xkey, derivation_path, wildcard };
                DescriptorPublicKey::XPub(key)
            }
        };

        Ok(Self { key, name: hdkey.name.clone() })
    }

    pub fn origin(&self) -> Option<&KeySource> {
        match &self.key {
            DescriptorPublicKey::Single(key) => key.origin.as_ref(),
            DescriptorPublicKey::XPub(key) => key.origin.as_ref(),
            DescriptorPublicKey::MultiXPub(key) => key.origin.as_ref(),
        }
    }

    pub fn to_hdkey(&self) -> Result<CryptoHdkey> {
        let (xpub, origin, children) = match &self.key {
            DescriptorPublicKey::XPub(key) => {
                let mut children = CryptoKeypath::from_derivation_path(&key.derivation_path, None);
                children.components.extend(wildcard_component(key.wildcard));

                (&key.xkey, &key.origin, Some(children))
            }
            DescriptorPublicKey::MultiXPub(key) if is_receive_and_change(key) => {
                (&key.xkey, &key.origin, None)
            }
            other => {
                return Err(Error::InvalidDescriptor(format!(
                    "{other} cannot be carried by a crypto-hdkey"
                )));
            }
        };

        let mut hdkey = CryptoHdkey::from_xpub(xpub);
        hdkey.origin = origin.as_ref().map(|(fingerprint, path)| {
            CryptoKeypath::from_derivation_path(path, Some(fingerprint.to_bytes()))
        });
        hdkey.children = children;
        hdkey.name = self.name.clone();

        Ok(hdkey)
    }
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKeys {
    Single(DescriptorKey),
    /// One participant's key in a multisig setup
    Cosigner(DescriptorKey),
    Threshold { threshold: u32, sorted: bool, keys: Vec<DescriptorKey> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub script_type: ScriptType,
    pub keys: DescriptorKeys,
    pub network: Network,
    /// `None` for a cosigner key, which describes no script by itself
    pub descriptor: Option<Descriptor<DescriptorPublicKey>>,
}

impl OutputDescriptor {
    pub fn new(script_type: ScriptType, keys: DescriptorKeys, network: Network) -> Result<Self> {
        let descriptor = build_descriptor(script_type, &keys)?;
        Ok(Self { script_type, keys, network, descriptor })
    }

    pub fn from_crypto_output(
        output: &CryptoOutput,
        fallback: Network,
        master: Option<Fingerprint>,
    ) -> Result<Self> {
        let unsupported = || {
            let names = output.expressions.iter().map(|e| format!("{e:?}")).join(", ");
            Error::UnsupportedScriptExpressions(names)
        };

        let script_type =
            ScriptType::from_expressions(output.script_expressions()).ok_or_else(unsupported)?;

        let is_cosigner = output.expressions.last() == Some(&ScriptExpression::Cosigner);

        let (keys, network) = match &output.keys {
            OutputKeys::Single(hdkey) => {
                let key = DescriptorKey::from_hdkey(hdkey, fallback, master)?;
                let network = hdkey.network_or(fallback);

                match (is_cosigner, script_type.is_script_hash()) {
                    (true, true) => (DescriptorKeys::Cosigner(key), network),
                    (false, false) => (DescriptorKeys::Single(key), network),
                    _ => return Err(unsupported()),
                }
            }

            OutputKeys::Threshold { threshold, keys } => {
                if !script_type.is_script_hash() {
                    return Err(unsupported());
                }

                let network = keys.first().map_or(fallback, |key| key.network_or(fallback));
                let keys = keys
                    .iter()
                    .map(|key| DescriptorKey::from_hdkey(key, fallback, master))
                    .collect::<Result<Vec<_>, _>>()?;

                let sorted = output.is_sorted();
                (DescriptorKeys::Threshold { threshold: *threshold, sorted, keys }, network)
            }
        };

        Self::new(script_type, keys, network)
    }

    /// Every key in the descriptor, in order
    pub fn keys(&self) -> Vec<&DescriptorKey> {
        match &self.keys {
            DescriptorKeys::Single(key) | DescriptorKeys::Cosigner(key) => vec![key],
            DescriptorKeys::Threshold { keys, .. } => keys.iter().collect(),
        }
    }

    /// Display name of the first key that has one
    pub fn name(&self) -> Option<&str> {
        self.keys().into_iter().find_map(|key| key.name.as_deref())
    }
}

fn build_descriptor(
    script_type: ScriptType,
    keys: &DescriptorKeys,
) -> Result<Option<Descriptor<DescriptorPublicKey>>> {
    let invalid =
        |error: bdk_wallet::miniscript::Error| Error::InvalidDescriptor(error.to_string());

    let descriptor = match keys {
        DescriptorKeys::Cosigner(_) => return Ok(None),

        DescriptorKeys::Single(key) => {
            let key = key.key.clone();
            let descriptor = match script_type {
                ScriptType::P2pkh => Descriptor::new_pkh(key),
                ScriptType::P2shP2wpkh => Descriptor::new_sh_wpkh(key),
                ScriptType::P2wpkh => Descriptor::new_wpkh(key),
                ScriptType::P2tr => Descriptor::new_tr(key, None),
                ScriptType::P2sh | ScriptType::P2wsh | ScriptType::P2shP2wsh => {
                    return Err(Error::UnsupportedScriptExpressions(script_type.to_string()));
                }
            };

            descriptor.map_err(invalid)?
        }

        DescriptorKeys::Threshold { threshold, sorted, keys } => {
            let function = if *sorted { "sortedmulti" } else { "multi" };
            let keys = keys.iter().map(|key| &key.key).join(",");
            let script = format!("{function}({threshold},{keys})");

            let expression = match script_type {
                ScriptType::P2sh => format!("sh({script})"),
                ScriptType::P2wsh => format!("wsh({script})"),
                ScriptType::P2shP2wsh => format!("sh(wsh({script}))"),
                _ => return Err(Error::UnsupportedScriptExpressions(script_type.to_string())),
            };

            Descriptor::from_str(&expression).map_err(invalid)?
        }
    };

    Ok(Some(descriptor))
}

impl fmt::Display for OutputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.descriptor, &self.keys) {
            (Some(descriptor), _) => fmt::Display::fmt(descriptor, f),
            (None, DescriptorKeys::Cosigner(key)) => write!(f, "cosigner({key})"),
            (None, keys) => write!(f, "{keys:?}"),
        }
    }
}

impl TryFrom<&OutputDescriptor> for CryptoOutput {
    type Error = DescriptorError;

    fn try_from(descriptor: &OutputDescriptor) -> Result<Self> {
        let mut expressions = descriptor.script_type.expressions();

        let keys = match &descriptor.keys {
            DescriptorKeys::Single(key) => OutputKeys::Single(key.to_hdkey()?),
            DescriptorKeys::Cosigner(key) => {
                expressions.push(ScriptExpression::Cosigner);
                OutputKeys::Single(key.to_hdkey()?)
            }
            DescriptorKeys::Threshold { threshold, sorted, keys } => {
                expressions.push(if *sorted {
                    ScriptExpression::SortedMultisig
                } else {
                    ScriptExpression::Multisig
                });

                OutputKeys::Threshold {
                    threshold: *threshold,
                    keys: keys.iter().map(DescriptorKey::to_hdkey).collect::<Result<_>>()?,
                }
            }
        };

        Ok(CryptoOutput::new(expressions, keys))
    }
}
