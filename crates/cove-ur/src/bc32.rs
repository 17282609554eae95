//! bc32: the bech32 variant used by version 1 URs
//!
//! Plain bech32 checksum over an empty human readable part, written without a separator.
//! BCR-2020-004: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-004-bc32.md

use bech32::{
    Bech32, Fe32,
    primitives::{
        checksum::{Checksum, Engine},
        iter::{ByteIterExt as _, Fe32IterExt as _},
    },
};

use crate::error::*;

fn engine() -> Engine<Bech32> {
    let mut engine = Engine::<Bech32>::new();
    // expansion of an empty hrp is the lone zero separator
    engine.input_fe(Fe32::Q);
    engine
}

pub fn encode(data: &[u8]) -> String {
    let fes: Vec<Fe32> = data.iter().copied().bytes_to_fes().collect();

    let mut engine = engine();
    for fe in &fes {
        engine.input_fe(*fe);
    }
    engine.input_target_residue();
    let residue = *engine.residue();

    let checksum = (0..Bech32::CHECKSUM_LENGTH).rev().map(|i| (residue >> (5 * i)) & 0x1f);

    fes.iter()
        .map(|fe| fe.to_char())
        .chain(checksum.filter_map(|value| Fe32::try_from(value as u8).ok()).map(Fe32::to_char))
        .collect()
}

pub fn decode(text: &str) -> Result<Vec<u8>> {
    let fes = text
        .chars()
        .map(|c| Fe32::from_char(c.to_ascii_lowercase()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| UrError::Bc32(e.to_string()))?;

    if fes.len() < Bech32::CHECKSUM_LENGTH {
        return Err(UrError::Bc32(format!("{} characters is too short", fes.len())));
    }

    let mut engine = engine();
    for fe in &fes {
        engine.input_fe(*fe);
    }

    if *engine.residue() != Bech32::TARGET_RESIDUE {
        return Err(UrError::Bc32("checksum mismatch".to_string()));
    }

    let data = &fes[..fes.len() - Bech32::CHECKSUM_LENGTH];
    Ok(data.iter().copied().fes_to_bytes().collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = hex::decode("d90134d90194d9012fa0").unwrap();
        let encoded = encode(&data);

        assert!(encoded.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(decode(&encoded).unwrap(), data);
        assert_eq!(decode(&encoded.to_uppercase()).unwrap(), data);
    }

    #[test]
    fn test_known_encoding() {
        let data = hex::decode("d9012ca20150c7098580125e2ab0981253468b2dbc5202d8641947da").unwrap();
        let encoded = encode(&data);

        assert_eq!(encoded, "myqjegsp2rrsnpvqzf0z4vyczff5dzedh3fq9kryr9ra57wzraf");
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut encoded = encode(b"hello");
        let last = encoded.pop().unwrap();
        encoded.push(if last == 'q' { 'p' } else { 'q' });

        assert!(matches!(decode(&encoded), Err(UrError::Bc32(_))));
    }

    #[test]
    fn test_invalid_character() {
        assert!(matches!(decode("qpzb1"), Err(UrError::Bc32(_))));
    }
}
