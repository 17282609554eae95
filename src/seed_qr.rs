//! SeedQR: a mnemonic as 4-digit word indexes (standard) or as raw entropy bytes (compact)

use bip39::{Language, Mnemonic};

use crate::mnemonic::VALID_WORD_COUNTS;

const DIGITS_PER_WORD: usize = 4;
const MAX_WORD_INDEX: u16 = 2047;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedQr {
    Standard(Mnemonic),
    Compact(Mnemonic),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeedQrError {
    #[error("not a standard seed QR, contains non numeric chars")]
    ContainsNonNumericChars,

    #[error("{0} digits is not a whole number of words")]
    IncompleteWord(usize),

    #[error("index out of bounds: {0}, max is: 2047")]
    IndexOutOfBounds(u16),

    #[error("incorrect word length, got: {0}, expected: 12, 15, 18, 21 or 24")]
    IncorrectWordLength(usize),

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
}

type Error = SeedQrError;

impl SeedQr {
    pub fn try_from_str(qr: &str) -> Result<Self, Error> {
        let qr = qr.trim();
        if qr.is_empty() || !qr.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::ContainsNonNumericChars);
        }

        if qr.len() % DIGITS_PER_WORD != 0 {
            return Err(Error::IncompleteWord(qr.len()));
        }

        let word_count = qr.len() / DIGITS_PER_WORD;
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(Error::IncorrectWordLength(word_count));
        }

        let word_list = Language::English.word_list();
        let words = qr
            .as_bytes()
            .chunks(DIGITS_PER_WORD)
            .map(|chunk| {
                let index =
                    chunk.iter().fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
                if index > MAX_WORD_INDEX {
                    return Err(Error::IndexOutOfBounds(index));
                }

                Ok(word_list[usize::from(index)])
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mnemonic = Mnemonic::parse_in(Language::English, words.join(" "))
            .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

        Ok(Self::Standard(mnemonic))
    }

    /// Compact SeedQR bytes are the BIP39 entropy, the checksum is recomputed
    pub fn try_from_data(data: &[u8]) -> Result<Self, Error> {
        // 11 bits per word, 1 checksum bit per 32 entropy bits
        let word_count = data.len() * 8 * 33 / 32 / 11;
        if data.len() % 4 != 0 || !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(Error::IncorrectWordLength(word_count));
        }

        let mnemonic =
            Mnemonic::from_entropy(data).map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

        Ok(Self::Compact(mnemonic))
    }

    pub fn into_mnemonic(self) -> Mnemonic {
        match self {
            Self::Standard(mnemonic) | Self::Compact(mnemonic) => mnemonic,
        }
    }}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct TestVector {
        words: &'static str,
        standard: &'static str,
        compact: &'static str,
    }

    const VECTORS: &[TestVector] = &[
        TestVector {
            words: "attack pizza motion avocado network gather crop fresh patrol unusual wild holiday candy pony ranch winter theme error hybrid van cereal salon goddess expire",
            standard: "011513251154012711900771041507421289190620080870026613431420201617920614089619290300152408010643",
            compact: "0e74b64107f94cc0ccfae6a13dcbec3662154fec67e0e00999c07892597d190a",
        },
        TestVector {
            words: "sound federal bonus bleak light raise false engage round stock update render quote truck quality fringe palace foot recipe labor glow tortoise potato still",
            standard: "166206750203018810361417065805941507171219081456140818651401074412730727143709940798183613501710",
            compact: "cfca8c658bc81962549252bc7ac3ba5b0b01d26bcae89f2b5ecebe263dcb2a36",
        },
        TestVector {
            words: "forum undo fragile fade shy sign arrest garment culture tube off merit",
            standard: "073318950739065415961602009907670428187212261116",
            compact: "5bbd9d71a8ec7990831aff359d426545",
        },
        TestVector {
            words: "good battle boil exact add seed angle hurry success glad carbon whisper",
            standard: "080301540200062600251559007008931730078802752004",
            compact: "6462686427203385c2337dd84c5089fd",
        },
    ];

    fn compact_bytes(compact: &str) -> Vec<u8> {
        hex::decode(compact).unwrap()
    }

    #[test]
    fn test_vectors() {
        for vector in VECTORS {
            let words = vector.words.split_whitespace().collect::<Vec<_>>();

            let standard = SeedQr::try_from_str(vector.standard).unwrap();
            assert!(matches!(standard, SeedQr::Standard(_)));
            assert_eq!(standard.into_mnemonic().words().collect::<Vec<_>>(), words);

            let compact = SeedQr::try_from_data(&compact_bytes(vector.compact)).unwrap();
            assert!(matches!(compact, SeedQr::Compact(_)));
            assert_eq!(compact.into_mnemonic().words().collect::<Vec<_>>(), words);
        }
    }

    #[test]
    fn test_15_word_length() {
        let words = "play element inch believe wrestle because feed sign pool soldier roof loop monitor burst grace";
        let bytes = hex::decode("a648f5c90a5fe427952e42a819d2eec1f8f03d99").unwrap();

        let seed_qr = SeedQr::try_from_data(&bytes).unwrap();
        assert_eq!(seed_qr.into_mnemonic().to_string(), words);
    }

    #[test]
    fn test_21_word_length() {
        let words = "cinnamon quote sweet lend clown link save world dog air text misery unveil betray attitude goat inspire identify wrap inspire tank";
        let bytes =
            hex::decode("2916036ebff2c1042ff7ed4080af7ec6dee62ac3ab20754e13f83aad").unwrap();

        let mnemonic = SeedQr::try_from_data(&bytes).unwrap().into_mnemonic();
        assert_eq!(mnemonic.word_count(), 21);
        assert_eq!(mnemonic.to_string(), words);
    }

    #[test]
    fn test_standard_errors() {
        assert_eq!(SeedQr::try_from_str("0733 1895"), Err(SeedQrError::ContainsNonNumericChars));
        assert_eq!(SeedQr::try_from_str("07331"), Err(SeedQrError::IncompleteWord(5)));
        assert_eq!(SeedQr::try_from_str("0733"), Err(SeedQrError::IncorrectWordLength(1)));

        let out_of_bounds = "9999".repeat(12);
        assert_eq!(SeedQr::try_from_str(&out_of_bounds), Err(SeedQrError::IndexOutOfBounds(9999)));

        // last word swapped, checksum no longer matches
        let bad_checksum = "073318950739065415961602009907670428187212261117";
        assert!(matches!(SeedQr::try_from_str(bad_checksum), Err(SeedQrError::InvalidMnemonic(_))));
    }

    #[test]
    fn test_compact_wrong_length() {
        assert_eq!(SeedQr::try_from_data(&[0; 15]), Err(SeedQrError::IncorrectWordLength(11)));
        assert_eq!(SeedQr::try_from_data(&[0; 33]), Err(SeedQrError::IncorrectWordLength(24)));
    }
}
