use std::fmt;

use bitcoin::bip32::{ChildNumber, DerivationPath};
use minicbor::{Decoder, data::Type};

use crate::{
    cbor::{CborEncoder, RegistryItem, array_len, fingerprint, map_len, put_fingerprint},
    error::*,
    registry::{CRYPTO_KEYPATH, keypath_keys::*},
};

/// BIP32 hardened derivation flag (bit 31 set)
const HARDENED_FLAG: u32 = 0x8000_0000;

/// One step of a keypath
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathComponent {
    Index { index: u32, hardened: bool },
    /// `*`, any child
    Wildcard { hardened: bool },
}

impl PathComponent {
    pub fn child_number(&self) -> Option<ChildNumber> {
        match *self {
            Self::Index { index, hardened: true } => ChildNumber::from_hardened_idx(index).ok(),
            Self::Index { index, hardened: false } => ChildNumber::from_normal_idx(index).ok(),
            Self::Wildcard { .. } => None,
        }
    }
}

impl From<ChildNumber> for PathComponent {
    fn from(child: ChildNumber) -> Self {
        match child {
            ChildNumber::Normal { index } => Self::Index { index, hardened: false },
            ChildNumber::Hardened { index } => Self::Index { index, hardened: true },
        }
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (body, hardened) = match self {
            Self::Index { index, hardened } => (index.to_string(), *hardened),
            Self::Wildcard { hardened } => ("*".to_string(), *hardened),
        };

        if hardened { write!(f, "{body}h") } else { f.write_str(&body) }
    }
}

/// crypto-keypath: BIP32 derivation path
/// BCR-2020-007: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-007-hdkey.md
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CryptoKeypath {
    pub components: Vec<PathComponent>,
    /// Fingerprint of the key the path starts from
    pub source_fingerprint: Option<[u8; 4]>,
    pub depth: Option<u32>,
}

impl CryptoKeypath {
    pub fn new(
        components: Vec<PathComponent>,
        source_fingerprint: Option<[u8; 4]>,
        depth: Option<u32>,
    ) -> Self {
        Self { components, source_fingerprint, depth }
    }

    pub fn from_derivation_path(
        path: &DerivationPath,
        source_fingerprint: Option<[u8; 4]>,
    ) -> Self {
        let components = path.into_iter().copied().map(PathComponent::from).collect();
        Self { components, source_fingerprint, depth: None }
    }

    /// Concrete path, fails when the keypath contains a wildcard
    pub fn to_derivation_path(&self) -> Result<DerivationPath> {
        self.components
            .iter()
            .map(|component| {
                component.child_number().ok_or_else(|| {
                    UrError::InvalidField(format!("keypath component {component} is not concrete"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(DerivationPath::from)
    }

    /// Depth of the key this path leads to
    pub fn key_depth(&self) -> u8 {
        let depth = self.depth.unwrap_or(self.components.len() as u32);
        u8::try_from(depth).unwrap_or(u8::MAX)
    }

    pub fn last_child_number(&self) -> Option<ChildNumber> {
        self.components.last().and_then(PathComponent::child_number)
    }

    /// Second component of a BIP44-style path, with the hardened flag removed
    pub fn coin_type(&self) -> Option<u32> {
        match self.components.get(1)? {
            PathComponent::Index { index, .. } => Some(*index),
            PathComponent::Wildcard { .. } => None,
        }
    }

    fn decode_components(decoder: &mut Decoder<'_>) -> Result<Vec<PathComponent>> {
        // BCR-2020-007 pairs every element with a hardened flag: [84, true, 0, true, ...]
        // some encoders send bare integers with the hardened bit set instead
        let len = array_len(decoder)?;
        let mut components = Vec::new();
        let mut consumed = 0;

        while consumed < len {
            let mut component = match decoder.datatype().map_err_cbor_decode()? {
                Type::U8 | Type::U16 | Type::U32 => {
                    let raw = decoder.u32().map_err_cbor_decode()?;
                    PathComponent::Index {
                        index: raw & !HARDENED_FLAG,
                        hardened: raw & HARDENED_FLAG != 0,
                    }
                }
                Type::Array => {
                    if array_len(decoder)? != 0 {
                        return Err(UrError::InvalidField(
                            "keypath ranges are not supported".to_string(),
                        ));
                    }
                    PathComponent::Wildcard { hardened: false }
                }
                other => {
                    return Err(UrError::InvalidField(format!(
                        "unexpected {other:?} in keypath components"
                    )));
                }
            };
            consumed += 1;

            if consumed < len && decoder.datatype().map_err_cbor_decode()? == Type::Bool {
                let flag = decoder.bool().map_err_cbor_decode()?;
                consumed += 1;

                match &mut component {
                    PathComponent::Index { hardened, .. }
                    | PathComponent::Wildcard { hardened } => *hardened |= flag,
                }
            }

            components.push(component);
        }

        Ok(components)
    }
}

impl fmt::Display for CryptoKeypath {
    /// Path without a leading `m`, e.g. `84h/0h/0h`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{component}")?;
        }

        Ok(())
    }
}

impl RegistryItem for CryptoKeypath {
    const TAG: u64 = CRYPTO_KEYPATH;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut components = None;
        let mut source_fingerprint = None;
        let mut depth = None;

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                COMPONENTS => components = Some(Self::decode_components(decoder)?),
                SOURCE_FINGERPRINT => source_fingerprint = Some(fingerprint(decoder)?),
                DEPTH => depth = Some(decoder.u32().map_err_cbor_decode()?),
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let components = components.ok_or(UrError::MissingField("components"))?;
        Ok(Self { components, source_fingerprint, depth })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        let fields = 1 + self.source_fingerprint.is_some() as u64 + self.depth.is_some() as u64;
        encoder.map(fields).map_err_cbor_encode()?;

        encoder.u32(COMPONENTS).map_err_cbor_encode()?;
        encoder.array(self.components.len() as u64 * 2).map_err_cbor_encode()?;
        for component in &self.components {
            let hardened = match *component {
                PathComponent::Index { index, hardened } => {
                    encoder.u32(index).map_err_cbor_encode()?;
                    hardened
                }
                PathComponent::Wildcard { hardened } => {
                    encoder.array(0).map_err_cbor_encode()?;
                    hardened
                }
            };
            encoder.bool(hardened).map_err_cbor_encode()?;
        }

        if let Some(source_fingerprint) = self.source_fingerprint {
            put_fingerprint(encoder, SOURCE_FINGERPRINT, source_fingerprint)?;
        }

        if let Some(depth) = self.depth {
            encoder.u32(DEPTH).map_err_cbor_encode()?;
            encoder.u32(depth).map_err_cbor_encode()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use pretty_assertions::assert_eq;

    use super::*;

    fn hardened(index: u32) -> PathComponent {
        PathComponent::Index { index, hardened: true }
    }

    #[test]
    fn test_decode_pair_format() {
        // {1: [84, true, 0, true, 0, true], 2: 0x37b5eed4}
        let cbor = hex::decode("a201861854f500f500f5021a37b5eed4").unwrap();
        let keypath = CryptoKeypath::from_cbor(&cbor).unwrap();

        assert_eq!(keypath.components, vec![hardened(84), hardened(0), hardened(0)]);
        assert_eq!(keypath.source_fingerprint, Some([0x37, 0xb5, 0xee, 0xd4]));
        assert_eq!(keypath.to_string(), "84h/0h/0h");
        assert_eq!(keypath.key_depth(), 3);
    }

    #[test]
    fn test_decode_plain_integer_format() {
        let mut cbor = Vec::new();
        let mut encoder = minicbor::Encoder::new(&mut cbor);
        encoder.map(1).unwrap();
        encoder.u32(COMPONENTS).unwrap();
        encoder.array(3).unwrap();
        encoder.u32(HARDENED_FLAG + 44).unwrap();
        encoder.u32(HARDENED_FLAG).unwrap();
        encoder.u32(7).unwrap();

        let keypath = CryptoKeypath::from_cbor(&cbor).unwrap();
        assert_eq!(keypath.to_string(), "44h/0h/7");
        assert_eq!(keypath.coin_type(), Some(0));
    }

    #[test]
    fn test_wildcard_children() {
        let keypath = CryptoKeypath::new(
            vec![PathComponent::Index { index: 1, hardened: false }, PathComponent::Wildcard {
                hardened: false,
            }],
            None,
            None,
        );

        let decoded = CryptoKeypath::from_cbor(&keypath.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, keypath);
        assert_eq!(decoded.to_string(), "1/*");
        assert!(decoded.to_derivation_path().is_err());
    }

    #[test]
    fn test_derivation_path_conversion() {
        let path = DerivationPath::from_str("m/48'/1'/0'/2'").unwrap();
        let keypath = CryptoKeypath::from_derivation_path(&path, Some([1, 2, 3, 4]));

        assert_eq!(keypath.to_string(), "48h/1h/0h/2h");
        assert_eq!(keypath.to_derivation_path().unwrap(), path);
        assert_eq!(keypath.last_child_number(), ChildNumber::from_hardened_idx(2).ok());
    }
}
