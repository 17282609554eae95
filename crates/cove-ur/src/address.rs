//! crypto-address
//! BCR-2020-009: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-009-address.md

use bitcoin::{
    Address, Network, PubkeyHash, ScriptBuf, ScriptHash, WPubkeyHash, hashes::Hash as _,
};
use minicbor::Decoder;

use crate::{
    cbor::{CborEncoder, RegistryItem, bytes, map_len},
    coin_info::CryptoCoinInfo,
    error::*,
    registry::{CRYPTO_ADDRESS, address_keys::*},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    P2pkh,
    P2sh,
    P2wpkh,
}

impl AddressKind {
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::P2pkh),
            1 => Ok(Self::P2sh),
            2 => Ok(Self::P2wpkh),
            other => Err(UrError::UnknownAddressType(other)),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::P2pkh => 0,
            Self::P2sh => 1,
            Self::P2wpkh => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoAddress {
    pub info: Option<CryptoCoinInfo>,
    /// Absent means P2PKH
    pub kind: Option<AddressKind>,
    /// 20-byte hash
    pub data: Vec<u8>,
}

impl CryptoAddress {
    pub fn new(info: Option<CryptoCoinInfo>, kind: Option<AddressKind>, data: Vec<u8>) -> Self {
        Self { info, kind, data }
    }

    /// Build the address, using `fallback` when the coin info doesn't name a network
    pub fn to_address(&self, fallback: Network) -> Result<Address> {
        let network =
            self.info.as_ref().and_then(CryptoCoinInfo::bitcoin_network).unwrap_or(fallback);

        let hash: [u8; 20] = self.data.as_slice().try_into().map_err(|_| {
            UrError::InvalidKeyDataLength { expected: 20, actual: self.data.len() }
        })?;

        let script = match self.kind.unwrap_or(AddressKind::P2pkh) {
            AddressKind::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)),
            AddressKind::P2sh => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)),
            AddressKind::P2wpkh => ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(hash)),
        };

        Address::from_script(&script, network).map_err(|e| UrError::InvalidField(e.to_string()))
    }
}

impl RegistryItem for CryptoAddress {
    const TAG: u64 = CRYPTO_ADDRESS;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut info = None;
        let mut kind = None;
        let mut data = None;

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                INFO => info = Some(CryptoCoinInfo::decode_maybe_tagged(decoder)?),
                TYPE => kind = Some(AddressKind::from_u32(decoder.u32().map_err_cbor_decode()?)?),
                DATA => data = Some(bytes(decoder)?),
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let data = data.ok_or(UrError::MissingField("data"))?;
        Ok(Self { info, kind, data })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        let fields = 1 + self.info.is_some() as u64 + self.kind.is_some() as u64;
        encoder.map(fields).map_err_cbor_encode()?;

        if let Some(info) = &self.info {
            encoder.u32(INFO).map_err_cbor_encode()?;
            info.encode_tagged(encoder)?;
        }

        if let Some(kind) = self.kind {
            encoder.u32(TYPE).map_err_cbor_encode()?;
            encoder.u32(kind.as_u32()).map_err_cbor_encode()?;
        }

        encoder.u32(DATA).map_err_cbor_encode()?;
        encoder.bytes(&self.data).map_err_cbor_encode()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // witness program of bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq
    const WPKH: &str = "e8df018c7e326cc253faac7e46cdc51e68542c42";

    #[test]
    fn test_p2wpkh_mainnet() {
        let address = CryptoAddress::new(
            Some(CryptoCoinInfo::for_network(Network::Bitcoin)),
            Some(AddressKind::P2wpkh),
            hex::decode(WPKH).unwrap(),
        );

        let decoded = CryptoAddress::from_cbor(&address.to_cbor().unwrap()).unwrap();
        assert_eq!(decoded, address);
        assert_eq!(
            decoded.to_address(Network::Testnet).unwrap().to_string(),
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"
        );
    }

    #[test]
    fn test_absent_type_is_p2pkh() {
        let address = CryptoAddress::new(None, None, vec![0; 20]);
        let built = address.to_address(Network::Bitcoin).unwrap();

        assert_eq!(built.to_string(), "1111111111111111111114oLvT2");
    }

    #[test]
    fn test_unknown_type() {
        // {2: 7, 3: h''}
        let cbor = hex::decode("a2020703 40".replace(' ', "")).unwrap();
        assert_eq!(CryptoAddress::from_cbor(&cbor), Err(UrError::UnknownAddressType(7)));
    }

    #[test]
    fn test_wrong_hash_length() {
        let address = CryptoAddress::new(None, Some(AddressKind::P2sh), vec![0; 19]);
        assert_eq!(
            address.to_address(Network::Bitcoin),
            Err(UrError::InvalidKeyDataLength { expected: 20, actual: 19 })
        );
    }
}
