//! Base43, the QR-friendly alphabet Electrum uses for transactions and PSBTs
//!
//! Every character is in the QR alphanumeric set, so a base43 payload fits a denser QR mode
//! than base64 would.

use num_bigint::BigUint;

const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ$*+-./:";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base43Error {
    #[error("empty input")]
    Empty,

    #[error("invalid base43 character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

/// Decode a base43 string, each leading `0` becomes a leading zero byte
pub fn decode(input: &str) -> Result<Vec<u8>, Base43Error> {
    if input.is_empty() {
        return Err(Base43Error::Empty);
    }

    let mut value = BigUint::default();
    for (position, character) in input.chars().enumerate() {
        let digit = digit_of(character)
            .ok_or(Base43Error::InvalidCharacter { character, position })?;

        value = value * 43u32 + digit;
    }

    let leading_zeros = input.bytes().take_while(|&b| b == ALPHABET[0]).count();
    let mut bytes = vec![0u8; leading_zeros];

    if value != BigUint::default() {
        bytes.extend(value.to_bytes_be());
    }

    Ok(bytes)
}

/// Encode bytes as base43, each leading zero byte becomes a leading `0`
pub fn encode(bytes: &[u8]) -> String {
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    let mut value = BigUint::from_bytes_be(bytes);

    let zero = BigUint::default();
    let mut digits = Vec::new();
    while value > zero {
        let remainder = (&value % 43u32).to_u32_digits().first().copied().unwrap_or(0);
        digits.push(ALPHABET[remainder as usize]);
        value /= 43u32;
    }

    digits.extend(std::iter::repeat_n(ALPHABET[0], leading_zeros));
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

fn digit_of(character: char) -> Option<u32> {
    let byte = u8::try_from(character).ok()?;
    ALPHABET.iter().position(|&c| c == byte).map(|index| index as u32)
}
