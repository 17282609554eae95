//! crypto-hdkey: Hierarchical Deterministic Key (BIP32)
//! BCR-2020-007: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-007-hdkey.md

use bitcoin::{
    Network, NetworkKind,
    bip32::{ChainCode, ChildNumber, Fingerprint, Xpriv, Xpub},
    secp256k1::{PublicKey, SecretKey},
};
use minicbor::Decoder;

use crate::{
    cbor::{CborEncoder, RegistryItem, bytes, fingerprint, map_len, put_fingerprint, text},
    coin_info::CryptoCoinInfo,
    error::*,
    keypath::CryptoKeypath,
    registry::{CRYPTO_HDKEY, hdkey_keys::*, lengths},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoHdkey {
    pub is_master: bool,
    pub is_private: bool,
    /// 33 bytes for a public key, 32 for a private key
    pub key_data: Vec<u8>,
    pub chain_code: Option<Vec<u8>>,
    pub use_info: Option<CryptoCoinInfo>,
    pub origin: Option<CryptoKeypath>,
    pub children: Option<CryptoKeypath>,
    pub parent_fingerprint: Option<[u8; 4]>,
    pub name: Option<String>,
    pub source: Option<String>,
}

impl CryptoHdkey {
    fn bare(is_private: bool, key_data: Vec<u8>, chain_code: ChainCode) -> Self {
        Self {
            is_master: false,
            is_private,
            key_data,
            chain_code: Some(chain_code.to_bytes().to_vec()),
            use_info: None,
            origin: None,
            children: None,
            parent_fingerprint: None,
            name: None,
            source: None,
        }
    }

    pub fn from_xpub(xpub: &Xpub) -> Self {
        let mut hdkey = Self::bare(false, xpub.public_key.serialize().to_vec(), xpub.chain_code);
        hdkey.is_master = xpub.depth == 0;
        hdkey.use_info = Some(CryptoCoinInfo::for_network(network_of(xpub.network)));

        let parent = xpub.parent_fingerprint.to_bytes();
        hdkey.parent_fingerprint = (parent != [0; 4]).then_some(parent);

        hdkey
    }

    pub fn from_xpriv(xpriv: &Xpriv) -> Self {
        let mut hdkey =
            Self::bare(true, xpriv.private_key.secret_bytes().to_vec(), xpriv.chain_code);
        hdkey.is_master = xpriv.depth == 0;
        hdkey.use_info = Some(CryptoCoinInfo::for_network(network_of(xpriv.network)));

        hdkey
    }

    /// Network from the coin info, then the origin's coin type, then `fallback`
    pub fn network_or(&self, fallback: Network) -> Network {
        if let Some(network) = self.use_info.as_ref().and_then(CryptoCoinInfo::bitcoin_network) {
            return network;
        }

        match self.origin.as_ref().and_then(CryptoKeypath::coin_type) {
            Some(0) => Network::Bitcoin,
            Some(1) => Network::Testnet,
            _ => fallback,
        }
    }

    fn chain_code(&self) -> Result<ChainCode> {
        let chain_code = self.chain_code.as_deref().ok_or(UrError::MissingField("chain_code"))?;

        let chain_code: [u8; lengths::CHAIN_CODE] = chain_code.try_into().map_err(|_| {
            UrError::InvalidKeyDataLength {
                expected: lengths::CHAIN_CODE,
                actual: chain_code.len(),
            }
        })?;

        Ok(ChainCode::from(chain_code))
    }

    /// Rebuild the extended public key, taking depth and child number from the origin path
    pub fn to_xpub(&self, network: Network) -> Result<Xpub> {
        if self.is_private {
            return Err(UrError::InvalidKeyData("expected a public key".to_string()));
        }

        let public_key = PublicKey::from_slice(&self.key_data)
            .map_err(|e| UrError::InvalidKeyData(e.to_string()))?;

        let root_child = ChildNumber::Normal { index: 0 };
        let (depth, child_number) = match &self.origin {
            Some(origin) => (origin.key_depth(), origin.last_child_number().unwrap_or(root_child)),
            None => (0, root_child),
        };

        Ok(Xpub {
            network: NetworkKind::from(network),
            depth,
            parent_fingerprint: self.parent_fingerprint.map(Fingerprint::from).unwrap_or_default(),
            child_number,
            chain_code: self.chain_code()?,
            public_key,
        })
    }

    /// Rebuild the extended private key as a root key, path metadata is not carried over
    pub fn to_xpriv(&self, network: Network) -> Result<Xpriv> {
        if !self.is_private {
            return Err(UrError::InvalidKeyData("expected a private key".to_string()));
        }

        let private_key = SecretKey::from_slice(&self.key_data)
            .map_err(|e| UrError::InvalidKeyData(e.to_string()))?;

        Ok(Xpriv {
            network: NetworkKind::from(network),
            depth: 0,
            parent_fingerprint: Fingerprint::default(),
            child_number: ChildNumber::Normal { index: 0 },
            private_key,
            chain_code: self.chain_code()?,
        })
    }
}

fn network_of(kind: NetworkKind) -> Network {
    match kind {
        NetworkKind::Main => Network::Bitcoin,
        NetworkKind::Test => Network::Testnet,
    }
}

impl RegistryItem for CryptoHdkey {
    const TAG: u64 = CRYPTO_HDKEY;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut is_master = false;
        let mut is_private = false;
        let mut key_data = None;
        let mut chain_code = None;
        let mut use_info = None;
        let mut origin = None;
        let mut children = None;
        let mut parent_fingerprint = None;
        let mut name = None;
        let mut source = None;

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                IS_MASTER => is_master = decoder.bool().map_err_cbor_decode()?,
                IS_PRIVATE => is_private = decoder.bool().map_err_cbor_decode()?,
                KEY_DATA => key_data = Some(bytes(decoder)?),
                CHAIN_CODE => chain_code = Some(bytes(decoder)?),
                USE_INFO => use_info = Some(CryptoCoinInfo::decode_maybe_tagged(decoder)?),
                ORIGIN => origin = Some(CryptoKeypath::decode_maybe_tagged(decoder)?),
                CHILDREN => children = Some(CryptoKeypath::decode_maybe_tagged(decoder)?),
                PARENT_FINGERPRINT => parent_fingerprint = Some(fingerprint(decoder)?),
                NAME => name = Some(text(decoder)?),
                SOURCE => source = Some(text(decoder)?),
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let key_data = key_data.ok_or(UrError::MissingField("key_data"))?;

        let expected = if is_private { lengths::PRIVATE_KEY } else { lengths::COMPRESSED_PUBKEY };
        if key_data.len() != expected {
            return Err(UrError::InvalidKeyDataLength { expected, actual: key_data.len() });
        }

        Ok(Self {
            is_master,
            is_private,
            key_data,
            chain_code,
            use_info,
            origin,
            children,
            parent_fingerprint,
            name,
            source,
        })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        let fields = 1
            + self.is_master as u64
            + self.is_private as u64
            + self.chain_code.is_some() as u64
            + self.use_info.is_some() as u64
            + self.origin.is_some() as u64
            + self.children.is_some() as u64
            + self.parent_fingerprint.is_some() as u64
            + self.name.is_some() as u64
            + self.source.is_some() as u64;

        encoder.map(fields).map_err_cbor_encode()?;

        // both flags default to false and are only written when set
        if self.is_master {
            encoder.u32(IS_MASTER).map_err_cbor_encode()?;
            encoder.bool(true).map_err_cbor_encode()?;
        }

        if self.is_private {
            encoder.u32(IS_PRIVATE).map_err_cbor_encode()?;
            encoder.bool(true).map_err_cbor_encode()?;
        }

        encoder.u32(KEY_DATA).map_err_cbor_encode()?;
        encoder.bytes(&self.key_data).map_err_cbor_encode()?;

        if let Some(chain_code) = &self.chain_code {
            encoder.u32(CHAIN_CODE).map_err_cbor_encode()?;
            encoder.bytes(chain_code).map_err_cbor_encode()?;
        }

        if let Some(use_info) = &self.use_info {
            encoder.u32(USE_INFO).map_err_cbor_encode()?;
            use_info.encode_tagged(encoder)?;
        }

        if let Some(origin) = &self.origin {
            encoder.u32(ORIGIN).map_err_cbor_encode()?;
            origin.encode_tagged(encoder)?;
        }

        if let Some(children) = &self.children {
            encoder.u32(CHILDREN).map_err_cbor_encode()?;
            children.encode_tagged(encoder)?;
        }

        if let Some(parent_fingerprint) = self.parent_fingerprint {
            put_fingerprint(encoder, PARENT_FINGERPRINT, parent_fingerprint)?;
        }

        if let Some(name) = &self.name {
            encoder.u32(NAME).map_err_cbor_encode()?;
            encoder.str(name).map_err_cbor_encode()?;
        }

        if let Some(source) = &self.source {
            encoder.u32(SOURCE).map_err_cbor_encode()?;
            encoder.str(source).map_err_cbor_encode()?;
        }

        Ok(())
    }
}
