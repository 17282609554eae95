use bip39::{Language, Mnemonic};

/// Word counts BIP39 allows
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MnemonicError {
    #[error("{0} words is not a valid mnemonic length")]
    InvalidWordCount(usize),

    #[error("unknown or ambiguous word {0:?}")]
    UnknownWord(String),

    #[error("invalid mnemonic: {0}")]
    Invalid(String),
}

pub trait ParseMnemonic {
    fn parse_mnemonic(&self) -> Result<Mnemonic, MnemonicError>;
}

/// Exact word, or the one word this prefix abbreviates
fn expand_word(word: &str) -> Option<&'static str> {
    let word_list = Language::English.word_list();
    if let Some(exact) = word_list.iter().find(|w| **w == word) {
        return Some(*exact);
    }

    let mut matches = word_list.iter().copied().filter(|w| w.starts_with(word));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

impl ParseMnemonic for &str {
    fn parse_mnemonic(&self) -> Result<Mnemonic, MnemonicError> {
        let words = self.split_whitespace().map(str::to_ascii_lowercase).collect::<Vec<_>>();

        if !VALID_WORD_COUNTS.contains(&words.len()) {
            return Err(MnemonicError::InvalidWordCount(words.len()));
        }

        let phrase = words
            .iter()
            .map(|word| expand_word(word).ok_or_else(|| MnemonicError::UnknownWord(word.clone())))
            .collect::<Result<Vec<_>, _>>()?
            .join(" ");

        Mnemonic::parse_in(Language::English, &phrase)
            .map_err(|e| MnemonicError::Invalid(e.to_string()))
    }
}

impl ParseMnemonic for String {
    fn parse_mnemonic(&self) -> Result<Mnemonic, MnemonicError> {
        self.as_str().parse_mnemonic()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    pub fn words_24() -> String {
        let mut words = vec!["abandon"; 23];
        words.push("art");
        words.join(" ")
    }

    #[test]
    fn test_full_words() {
        let mnemonic = words_24().parse_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 24);
    }

    #[test]
    fn test_abbreviated_and_uppercase() {
        let mut words = vec!["ABAN"; 11];
        words.push("abou");

        let mnemonic = words.join("  ").parse_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 12);
        assert_eq!(mnemonic.words().last(), Some("about"));
    }

    #[test]
    fn test_invalid_count() {
        let mut words = vec!["abandon"; 12];
        words.push("about");

        assert_eq!(words.join(" ").parse_mnemonic(), Err(MnemonicError::InvalidWordCount(13)));
    }

    #[test]
    fn test_ambiguous_prefix() {
        let mut words = vec!["abandon"; 11];
        words.push("ab");

        assert_eq!(words.join(" ").parse_mnemonic(), Err(MnemonicError::UnknownWord("ab".into())));
    }

    #[test]
    fn test_bad_checksum() {
        let words = vec!["abandon"; 12].join(" ");
        assert!(matches!(words.parse_mnemonic(), Err(MnemonicError::Invalid(_))));
    }
}
