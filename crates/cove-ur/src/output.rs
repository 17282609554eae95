//! crypto-output: output descriptor as nested script expression tags
//! BCR-2020-010: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-010-output-desc.md
//!
//! `#6.308(#6.400(#6.404(#6.303({...}))))` is `sh(wpkh(KEY))`. Multisig expressions wrap a
//! `{1: threshold, 2: [keys]}` map instead of a key.

use minicbor::{Decoder, data::Tag};

use crate::{
    cbor::{CborEncoder, RegistryItem, array_len, map_len, peek_tag},
    error::*,
    hdkey::CryptoHdkey,
    registry::{CRYPTO_ECKEY, CRYPTO_HDKEY, CRYPTO_OUTPUT, expression, multikey_keys::*},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptExpression {
    ScriptHash,
    WitnessScriptHash,
    PublicKey,
    PublicKeyHash,
    WitnessPublicKeyHash,
    Combo,
    Multisig,
    SortedMultisig,
    RawScript,
    Taproot,
    Cosigner,
}

impl ScriptExpression {
    pub fn from_tag(tag: u64) -> Option<Self> {
        let expression = match tag {
            expression::SCRIPT_HASH => Self::ScriptHash,
            expression::WITNESS_SCRIPT_HASH => Self::WitnessScriptHash,
            expression::PUBLIC_KEY => Self::PublicKey,
            expression::PUBLIC_KEY_HASH => Self::PublicKeyHash,
            expression::WITNESS_PUBLIC_KEY_HASH => Self::WitnessPublicKeyHash,
            expression::COMBO => Self::Combo,
            expression::MULTISIG => Self::Multisig,
            expression::SORTED_MULTISIG => Self::SortedMultisig,
            expression::RAW_SCRIPT => Self::RawScript,
            expression::TAPROOT => Self::Taproot,
            expression::COSIGNER => Self::Cosigner,
            _ => return None,
        };

        Some(expression)
    }

    pub fn tag(self) -> u64 {
        match self {
            Self::ScriptHash => expression::SCRIPT_HASH,
            Self::WitnessScriptHash => expression::WITNESS_SCRIPT_HASH,
            Self::PublicKey => expression::PUBLIC_KEY,
            Self::PublicKeyHash => expression::PUBLIC_KEY_HASH,
            Self::WitnessPublicKeyHash => expression::WITNESS_PUBLIC_KEY_HASH,
            Self::Combo => expression::COMBO,
            Self::Multisig => expression::MULTISIG,
            Self::SortedMultisig => expression::SORTED_MULTISIG,
            Self::RawScript => expression::RAW_SCRIPT,
            Self::Taproot => expression::TAPROOT,
            Self::Cosigner => expression::COSIGNER,
        }
    }

    pub fn is_multisig(self) -> bool {
        matches!(self, Self::Multisig | Self::SortedMultisig)
    }
}

/// What sits inside the innermost script expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKeys {
    Single(CryptoHdkey),
    Threshold { threshold: u32, keys: Vec<CryptoHdkey> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoOutput {
    /// Outermost first, e.g. `[ScriptHash, WitnessPublicKeyHash]` for `sh(wpkh(..))`
    pub expressions: Vec<ScriptExpression>,
    pub keys: OutputKeys,
}

impl CryptoOutput {
    pub fn new(expressions: Vec<ScriptExpression>, keys: OutputKeys) -> Self {
        Self { expressions, keys }
    }

    /// Expressions without a trailing multisig or cosigner marker
    pub fn script_expressions(&self) -> &[ScriptExpression] {
        match self.expressions.split_last() {
            Some((last, rest))
                if last.is_multisig() || *last == ScriptExpression::Cosigner =>
            {
                rest
            }
            _ => &self.expressions,
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.expressions.last() == Some(&ScriptExpression::SortedMultisig)
    }

    fn decode_key(decoder: &mut Decoder<'_>) -> Result<CryptoHdkey> {
        match peek_tag(decoder)? {
            Some(CRYPTO_ECKEY) => Err(UrError::InvalidKeyData(
                "crypto-eckey keys are not supported in output descriptors".to_string(),
            )),
            _ => CryptoHdkey::decode_tagged(decoder),
        }
    }

    fn decode_threshold(decoder: &mut Decoder<'_>) -> Result<OutputKeys> {
        let mut threshold = 1;
        let mut keys = Vec::new();

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                THRESHOLD => threshold = decoder.u32().map_err_cbor_decode()?,
                KEYS => {
                    for _ in 0..array_len(decoder)? {
                        keys.push(Self::decode_key(decoder)?);
                    }
                }
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        if keys.is_empty() || threshold == 0 || threshold as usize > keys.len() {
            return Err(UrError::InvalidField(format!(
                "threshold {threshold} is not valid for {} keys",
                keys.len()
            )));
        }

        Ok(OutputKeys::Threshold { threshold, keys })
    }
}

impl RegistryItem for CryptoOutput {
    const TAG: u64 = CRYPTO_OUTPUT;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut expressions = Vec::new();

        loop {
            let tag = peek_tag(decoder)?;
            if matches!(tag, None | Some(CRYPTO_HDKEY) | Some(CRYPTO_ECKEY)) {
                break;
            }

            let tag = decoder.tag().map_err_cbor_decode()?.as_u64();
            let expression = ScriptExpression::from_tag(tag).ok_or(UrError::UnexpectedTag(tag))?;
            expressions.push(expression);
        }

        if expressions.is_empty() {
            return Err(UrError::MissingField("script expression"));
        }

        let keys = match expressions.last() {
            Some(last) if last.is_multisig() => Self::decode_threshold(decoder)?,
            _ => OutputKeys::Single(Self::decode_key(decoder)?),
        };

        Ok(Self { expressions, keys })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        for expression in &self.expressions {
            encoder.tag(Tag::new(expression.tag())).map_err_cbor_encode()?;
        }

        match &self.keys {
            OutputKeys::Single(key) => key.encode_tagged(encoder),
            OutputKeys::Threshold { threshold, keys } => {
                encoder.map(2).map_err_cbor_encode()?;
                encoder.u32(THRESHOLD).map_err_cbor_encode()?;
                encoder.u32(*threshold).map_err_cbor_encode()?;
                encoder.u32(KEYS).map_err_cbor_encode()?;
                encoder.array(keys.len() as u64).map_err_cbor_encode()?;
                for key in keys {
                    key.encode_tagged(encoder)?;
                }
                Ok(())
            }
        }
    }
}
