//! crypto-seed and crypto-bip39
//! BCR-2020-006: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-006-urtypes.md

use bip39::{Language, Mnemonic};
use minicbor::{Decoder, data::Type};

use crate::{
    cbor::{CborEncoder, RegistryItem, array_len, bytes, map_len, text},
    error::*,
    registry::{
        CRYPTO_BIP39, CRYPTO_SEED, EPOCH_DATE, EPOCH_DAYS, SECONDS_PER_DAY,
        VALID_BIP39_ENTROPY_LENGTHS, bip39_keys, seed_keys,
    },
};

/// crypto-seed: BIP39 entropy with optional metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoSeed {
    /// 16, 20, 24, 28 or 32 bytes
    pub payload: Vec<u8>,
    /// Seconds since the unix epoch
    pub creation_date: Option<u64>,
    pub name: Option<String>,
    pub note: Option<String>,
}

impl CryptoSeed {
    pub fn new(payload: Vec<u8>) -> Result<Self> {
        if !VALID_BIP39_ENTROPY_LENGTHS.contains(&payload.len()) {
            return Err(UrError::InvalidPayloadLength(payload.len()));
        }

        Ok(Self { payload, creation_date: None, name: None, note: None })
    }

    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        Self { payload: mnemonic.to_entropy(), creation_date: None, name: None, note: None }
    }

    pub fn to_mnemonic(&self) -> Result<Mnemonic> {
        Mnemonic::from_entropy(&self.payload)
            .map_err(|e| UrError::InvalidField(format!("invalid BIP39 entropy: {e}")))
    }

    /// Dates show up as a bare integer, as epoch seconds (tag 1) and as epoch days (tag 100)
    fn decode_date(decoder: &mut Decoder<'_>) -> Result<u64> {
        let tag = match decoder.datatype().map_err_cbor_decode()? {
            Type::Tag => Some(decoder.tag().map_err_cbor_decode()?.as_u64()),
            _ => None,
        };

        let value = decoder.u64().map_err_cbor_decode()?;
        match tag {
            None | Some(EPOCH_DATE) => Ok(value),
            Some(EPOCH_DAYS) => value
                .checked_mul(SECONDS_PER_DAY)
                .ok_or_else(|| UrError::InvalidField(format!("{value} days is out of range"))),
            Some(other) => Err(UrError::UnexpectedTag(other)),
        }
    }
}

impl RegistryItem for CryptoSeed {
    const TAG: u64 = CRYPTO_SEED;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut payload = None;
        let mut creation_date = None;
        let mut name = None;
        let mut note = None;

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                seed_keys::PAYLOAD => payload = Some(bytes(decoder)?),
                seed_keys::CREATION_DATE => creation_date = Some(Self::decode_date(decoder)?),
                seed_keys::NAME => name = Some(text(decoder)?),
                seed_keys::NOTE => note = Some(text(decoder)?),
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let payload = payload.ok_or(UrError::MissingField("payload"))?;
        let seed = Self::new(payload)?;

        Ok(Self { creation_date, name, note, ..seed })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        let fields = 1
            + self.creation_date.is_some() as u64
            + self.name.is_some() as u64
            + self.note.is_some() as u64;

        encoder.map(fields).map_err_cbor_encode()?;
        encoder.u32(seed_keys::PAYLOAD).map_err_cbor_encode()?;
        encoder.bytes(&self.payload).map_err_cbor_encode()?;

        if let Some(date) = self.creation_date {
            encoder.u32(seed_keys::CREATION_DATE).map_err_cbor_encode()?;
            encoder.tag(minicbor::data::Tag::new(EPOCH_DATE)).map_err_cbor_encode()?;
            encoder.u64(date).map_err_cbor_encode()?;
        }

        if let Some(name) = &self.name {
            encoder.u32(seed_keys::NAME).map_err_cbor_encode()?;
            encoder.str(name).map_err_cbor_encode()?;
        }

        if let Some(note) = &self.note {
            encoder.u32(seed_keys::NOTE).map_err_cbor_encode()?;
            encoder.str(note).map_err_cbor_encode()?;
        }

        Ok(())
    }
}

/// crypto-bip39: mnemonic words spelled out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoBip39 {
    pub words: Vec<String>,
    /// ISO 639-1 code, absent means english
    pub language: Option<String>,
}

impl CryptoBip39 {
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        let words = mnemonic.words().map(str::to_string).collect();
        Self { words, language: None }
    }

    pub fn to_mnemonic(&self) -> Result<Mnemonic> {
        match self.language.as_deref() {
            None | Some("en") => {}
            Some(other) => {
                return Err(UrError::InvalidField(format!("unsupported mnemonic language {other}")));
            }
        }

        Mnemonic::parse_in(Language::English, self.words.join(" "))
            .map_err(|e| UrError::InvalidField(format!("invalid mnemonic: {e}")))
    }
}

impl RegistryItem for CryptoBip39 {
    const TAG: u64 = CRYPTO_BIP39;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut words = None;
        let mut language = None;

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                bip39_keys::WORDS => {
                    let len = array_len(decoder)?;
                    let mut list = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        list.push(text(decoder)?);
                    }
                    words = Some(list);
                }
                bip39_keys::LANGUAGE => language = Some(text(decoder)?),
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let words = words.ok_or(UrError::MissingField("words"))?;
        Ok(Self { words, language })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        encoder.map(1 + self.language.is_some() as u64).map_err_cbor_encode()?;

        encoder.u32(bip39_keys::WORDS).map_err_cbor_encode()?;
        encoder.array(self.words.len() as u64).map_err_cbor_encode()?;
        for word in &self.words {
            encoder.str(word).map_err_cbor_encode()?;
        }

        if let Some(language) = &self.language {
            encoder.u32(bip39_keys::LANGUAGE).map_err_cbor_encode()?;
            encoder.str(language).map_err_cbor_encode()?;
        }

        Ok(())
    }
}
