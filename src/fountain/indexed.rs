//! Current UR dialect, bytewords fragments with a `seq-len` header

use cove_ur::Ur;
use cove_util::ResultExt as _;
use foundation_ur::Decoder as UrDecoder;
use tracing::debug;

use super::{FountainDecoder, FountainError, UrPayload};

const DEFAULT_UR_TYPE: &str = "bytes";

#[derive(Default)]
pub struct IndexedDecoder {
    decoder: UrDecoder,
    started: bool,
}

impl FountainDecoder for IndexedDecoder {
    fn receive(&mut self, text: &str) -> Result<Option<UrPayload>, FountainError> {
        let ur = Ur::parse(text)?;

        if ur.is_single_part() {
            if self.started {
                debug!("ignoring single-part {} UR in the middle of a sequence", ur.ur_type());
                return Ok(None);
            }

            let cbor = ur.message_bytes()?;
            return Ok(Some(UrPayload { ur_type: ur.ur_type().to_string(), cbor }));
        }

        self.started = true;
        self.decoder.receive(ur.as_foundation()?).map_err_str(FountainError::Decoder)?;

        if !self.decoder.is_complete() {
            return Ok(None);
        }

        let cbor = self
            .decoder
            .message()
            .map_err_str(FountainError::Decoder)?
            .ok_or(FountainError::MissingMessage)?
            .to_vec();

        let ur_type = self.decoder.ur_type().unwrap_or(DEFAULT_UR_TYPE).to_string();
        Ok(Some(UrPayload { ur_type, cbor }))
    }

    fn estimated_percent_complete(&self) -> f64 {
        if !self.started {
            return 0.0;
        }

        self.decoder.estimated_percent_complete()
    }
}

#[cfg(test)]
mod tests {
    use cove_ur::{CryptoSeed, RegistryItem as _};
    use foundation_ur::{Encoder, UR};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{classify::Dialect, fountain::FountainAccumulator, mnemonic::tests::words_24};

    fn seed_cbor() -> Vec<u8> {
        let mnemonic = bip39::Mnemonic::parse(words_24()).unwrap();
        CryptoSeed::from_mnemonic(&mnemonic).to_cbor().unwrap()
    }

    fn encode_parts(
        ur_type: &str,
        message: &[u8],
        max_fragment_len: usize,
        count: usize,
    ) -> Vec<String> {
        let mut encoder = Encoder::new();
        encoder.start(ur_type, message, max_fragment_len);

        (0..count).map(|_| encoder.next_part().to_string()).collect()
    }

    #[test]
    fn test_single_part_completes_immediately() {
        let cbor = seed_cbor();
        let text = UR::new("crypto-seed", &cbor).to_string().to_uppercase();

        let mut decoder = IndexedDecoder::default();
        let payload = decoder.receive(&text).unwrap().unwrap();

        assert_eq!(payload, UrPayload { ur_type: "crypto-seed".into(), cbor });
    }

    #[test]
    fn test_multi_part_in_order() {
        let cbor = seed_cbor();
        let parts = encode_parts("crypto-seed", &cbor, 10, 64);

        let mut accumulator = FountainAccumulator::new(Dialect::Indexed);
        let mut last_percent = 0.0;
        let mut completed = None;

        for part in &parts {
            if let Some(payload) = accumulator.ingest(part).unwrap() {
                completed = Some(payload);
                break;
            }

            assert!(accumulator.percent_complete() >= last_percent);
            assert!(accumulator.percent_complete() < 1.0);
            last_percent = accumulator.percent_complete();
        }

        let payload = completed.expect("sequence should complete");
        assert_eq!(payload.ur_type, "crypto-seed");
        assert_eq!(payload.cbor, cbor);
        assert_eq!(accumulator.percent_complete(), 1.0);
    }

    #[test]
    fn test_single_part_ignored_mid_sequence() {
        let cbor = seed_cbor();
        let parts = encode_parts("crypto-seed", &cbor, 10, 2);

        let mut decoder = IndexedDecoder::default();
        assert_eq!(decoder.receive(&parts[0]).unwrap(), None);

        let single = UR::new("bytes", &[0x41, 0x00]).to_string();
        assert_eq!(decoder.receive(&single).unwrap(), None);
    }

    #[test]
    fn test_not_a_ur() {
        let mut decoder = IndexedDecoder::default();
        assert!(matches!(decoder.receive("ur:"), Err(FountainError::InvalidUr(_))));
    }
}
