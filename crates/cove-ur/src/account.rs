//! crypto-account: master fingerprint plus the account-level outputs derived from it
//! BCR-2020-015: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-015-account.md

use minicbor::Decoder;

use crate::{
    cbor::{CborEncoder, RegistryItem, array_len, fingerprint, map_len, put_fingerprint},
    error::*,
    output::CryptoOutput,
    registry::{CRYPTO_ACCOUNT, account_keys::*},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoAccount {
    pub master_fingerprint: [u8; 4],
    pub outputs: Vec<CryptoOutput>,
}

impl CryptoAccount {
    pub fn new(master_fingerprint: [u8; 4], outputs: Vec<CryptoOutput>) -> Self {
        Self { master_fingerprint, outputs }
    }
}

impl RegistryItem for CryptoAccount {
    const TAG: u64 = CRYPTO_ACCOUNT;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        let mut master_fingerprint = None;
        let mut outputs = Vec::new();

        for _ in 0..map_len(decoder)? {
            match decoder.u32().map_err_cbor_decode()? {
                MASTER_FINGERPRINT => master_fingerprint = Some(fingerprint(decoder)?),
                OUTPUT_DESCRIPTORS => {
                    for _ in 0..array_len(decoder)? {
                        outputs.push(CryptoOutput::decode_tagged(decoder)?);
                    }
                }
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let master_fingerprint =
            master_fingerprint.ok_or(UrError::MissingField("master_fingerprint"))?;

        Ok(Self { master_fingerprint, outputs })
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        encoder.map(2).map_err_cbor_encode()?;
        put_fingerprint(encoder, MASTER_FINGERPRINT, self.master_fingerprint)?;

        encoder.u32(OUTPUT_DESCRIPTORS).map_err_cbor_encode()?;
        encoder.array(self.outputs.len() as u64).map_err_cbor_encode()?;
        for output in &self.outputs {
            output.encode_tagged(encoder)?;
        }

        Ok(())
    }
}
