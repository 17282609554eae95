use bip39::Mnemonic;
use cove_ur::{CryptoBip39, CryptoSeed, UrError};
use jiff::Timestamp;

/// A recovered wallet seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub mnemonic: Mnemonic,
    /// When the wallet was created, the time of the scan if the source didn't say
    pub birth: Timestamp,
    pub name: Option<String>,
    pub note: Option<String>,
}

impl Seed {
    pub fn new(mnemonic: Mnemonic) -> Self {
        Self { mnemonic, birth: Timestamp::now(), name: None, note: None }
    }

    pub fn word_count(&self) -> usize {
        self.mnemonic.word_count()
    }

    pub fn try_from_crypto_seed(seed: &CryptoSeed) -> Result<Self, UrError> {
        let mut result = Self::new(seed.to_mnemonic()?);

        if let Some(seconds) = seed.creation_date {
            result.birth = i64::try_from(seconds)
                .ok()
                .and_then(|seconds| Timestamp::from_second(seconds).ok())
                .ok_or_else(|| {
                    UrError::InvalidField(format!("creation date {seconds} out of range"))
                })?;
        }

        result.name = seed.name.clone();
        result.note = seed.note.clone();

        Ok(result)
    }

    pub fn try_from_crypto_bip39(bip39: &CryptoBip39) -> Result<Self, UrError> {
        Ok(Self::new(bip39.to_mnemonic()?))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mnemonic() -> Mnemonic {
        Mnemonic::from_entropy(&[0; 16]).unwrap()
    }

    #[test]
    fn test_birth_from_creation_date() {
        let mut crypto = CryptoSeed::from_mnemonic(&mnemonic());
        crypto.creation_date = Some(1_600_000_000);
        crypto.name = Some("Backup".into());

        let seed = Seed::try_from_crypto_seed(&crypto).unwrap();
        assert_eq!(seed.birth, Timestamp::from_second(1_600_000_000).unwrap());
        assert_eq!(seed.name.as_deref(), Some("Backup"));
        assert_eq!(seed.word_count(), 12);
    }

    #[test]
    fn test_birth_defaults_to_now() {
        let before = Timestamp::now();
        let seed = Seed::try_from_crypto_seed(&CryptoSeed::from_mnemonic(&mnemonic())).unwrap();

        assert!(seed.birth >= before);
        assert!(seed.birth <= Timestamp::now());
    }

    #[test]
    fn test_creation_date_out_of_range() {
        let mut crypto = CryptoSeed::from_mnemonic(&mnemonic());
        crypto.creation_date = Some(u64::MAX);

        assert!(matches!(Seed::try_from_crypto_seed(&crypto), Err(UrError::InvalidField(_))));
    }

    #[test]
    fn test_from_word_list() {
        let seed = Seed::try_from_crypto_bip39(&CryptoBip39::from_mnemonic(&mnemonic())).unwrap();
        assert_eq!(seed.mnemonic, mnemonic());
    }
}
