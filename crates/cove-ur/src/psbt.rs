use bitcoin::psbt::Psbt;
use foundation_ur::UR;
use minicbor::Decoder;

use crate::{
    cbor::{CborEncoder, RegistryItem, bytes},
    error::*,
    registry::CRYPTO_PSBT,
    ur::Ur,
};

/// crypto-psbt: PSBT as a CBOR byte string with tag 310
/// BCR-2020-006: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-006-urtypes.md
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoPsbt {
    psbt: Psbt,
}

impl CryptoPsbt {
    pub fn new(psbt: Psbt) -> Self {
        Self { psbt }
    }

    pub fn from_bytes(psbt_bytes: &[u8]) -> Result<Self> {
        let psbt = Psbt::deserialize(psbt_bytes)
            .map_err(|e| UrError::InvalidField(format!("invalid PSBT: {e}")))?;

        Ok(Self { psbt })
    }

    pub fn psbt(&self) -> &Psbt {
        &self.psbt
    }

    pub fn into_psbt(self) -> Psbt {
        self.psbt
    }

    pub fn to_ur_string(&self) -> Result<String> {
        let cbor = self.to_cbor()?;
        Ok(UR::new("crypto-psbt", &cbor).to_string())
    }

    /// Decode a single-part `ur:crypto-psbt` or `ur:psbt`, in any case
    pub fn from_ur_string(ur: &str) -> Result<Self> {
        let ur = Ur::parse(ur)?;

        match ur.ur_type() {
            "crypto-psbt" | "psbt" => {}
            other => {
                return Err(UrError::InvalidField(format!("expected crypto-psbt, got {other}")));
            }
        }

        if !ur.is_single_part() {
            return Err(UrError::InvalidField("expected a single-part UR".to_string()));
        }

        Self::from_cbor(&ur.message_bytes()?)
    }
}

impl RegistryItem for CryptoPsbt {
    const TAG: u64 = CRYPTO_PSBT;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self> {
        Self::from_bytes(&bytes(decoder)?)
    }

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        encoder.bytes(&self.psbt.serialize()).map_err_cbor_encode()?;
        Ok(())
    }
}
