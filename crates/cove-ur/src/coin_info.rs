use bitcoin::Network;
use minicbor::Decoder;

use crate::{
    cbor::{CborEncoder, RegistryItem, map_len},
    error::*,
    registry::{CRYPTO_COIN_INFO, coin_info_keys::*},
};

/// SLIP-44 coin type for bitcoin
pub const BITCOIN_COIN_TYPE: u32 = 0;

/// crypto-coin-info: which chain a key or address belongs to
/// BCR-2020-007: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-007-hdkey.md
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CryptoCoinInfo {
    /// SLIP-44 coin type, absent means bitcoin
    pub coin_type: Option<u32>,
    /// 0 for mainnet, 1 for testnet, absent means mainnet
    pub network: Option<u32>,
}

impl CryptoCoinInfo {
    pub fn new(coin_type: Option<u32>, network: Option<u32>) -> Self {
        Self { coin_type, network }
    }

    pub fn for_network(network: Network) -> Self {
        let network = match network {
            Network::Bitcoin => 0,
            _ => 1,
        };

        Self { coin_type: Some(BITCOIN_COIN_TYPE), network: Some(network) }
    }

    /// The declared network, if there is one
    pub fn bitcoin_network(&self) -> Option<Network> {
        match self.network? {
            0 => Some(Network::Bitcoin),
            _ => Some(Network::Testnet),
        }
    }
}

impl RegistryItem for CryptoCoinInfo {
    const TAG: u64 = CRYPTO_COIN_INFO;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut info = Self::default();

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                COIN_TYPE => info.coin_type = Some(decoder.u32().map_err_cbor_decode()?),
                NETWORK => info.network = Some(decoder.u32().map_err_cbor_decode()?),
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        Ok(info)
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        let fields = self.coin_type.is_some() as u64 + self.network.is_some() as u64;
        encoder.map(fields).map_err_cbor_encode()?;

        if let Some(coin_type) = self.coin_type {
            encoder.u32(COIN_TYPE).map_err_cbor_encode()?;
            encoder.u32(coin_type).map_err_cbor_encode()?;
        }

        if let Some(network) = self.network {
            encoder.u32(NETWORK).map_err_cbor_encode()?;
            encoder.u32(network).map_err_cbor_encode()?;
        }

        Ok(())
    }
}
