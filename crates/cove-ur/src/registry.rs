//! CBOR tag assignments from BCR-2020-006 and BCR-2020-010
//! See: https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-006-urtypes.md

/// CBOR tag for an epoch-based date/time (RFC 8949)
pub const EPOCH_DATE: u64 = 1;

/// CBOR tag for a date as whole days since the epoch (RFC 8943)
pub const EPOCH_DAYS: u64 = 100;

pub const SECONDS_PER_DAY: u64 = 86_400;

pub const CRYPTO_SEED: u64 = 300;
pub const CRYPTO_BIP39: u64 = 301;
pub const CRYPTO_HDKEY: u64 = 303;
pub const CRYPTO_KEYPATH: u64 = 304;
pub const CRYPTO_COIN_INFO: u64 = 305;
pub const CRYPTO_ECKEY: u64 = 306;
pub const CRYPTO_ADDRESS: u64 = 307;
pub const CRYPTO_OUTPUT: u64 = 308;
pub const CRYPTO_PSBT: u64 = 310;
pub const CRYPTO_ACCOUNT: u64 = 311;

/// Script expression tags (BCR-2020-010)
pub mod expression {
    pub const SCRIPT_HASH: u64 = 400;
    pub const WITNESS_SCRIPT_HASH: u64 = 401;
    pub const PUBLIC_KEY: u64 = 402;
    pub const PUBLIC_KEY_HASH: u64 = 403;
    pub const WITNESS_PUBLIC_KEY_HASH: u64 = 404;
    pub const COMBO: u64 = 405;
    pub const MULTISIG: u64 = 406;
    pub const SORTED_MULTISIG: u64 = 407;
    pub const RAW_SCRIPT: u64 = 408;
    pub const TAPROOT: u64 = 409;
    pub const COSIGNER: u64 = 410;
}

pub mod hdkey_keys {
    pub const IS_MASTER: u32 = 1;
    pub const IS_PRIVATE: u32 = 2;
    pub const KEY_DATA: u32 = 3;
    pub const CHAIN_CODE: u32 = 4;
    pub const USE_INFO: u32 = 5;
    pub const ORIGIN: u32 = 6;
    pub const CHILDREN: u32 = 7;
    pub const PARENT_FINGERPRINT: u32 = 8;
    pub const NAME: u32 = 9;
    pub const SOURCE: u32 = 10;
}

pub mod seed_keys {
    pub const PAYLOAD: u32 = 1;
    pub const CREATION_DATE: u32 = 2;
    pub const NAME: u32 = 3;
    pub const NOTE: u32 = 4;
}

pub mod bip39_keys {
    pub const WORDS: u32 = 1;
    pub const LANGUAGE: u32 = 2;
}

pub mod keypath_keys {
    pub const COMPONENTS: u32 = 1;
    pub const SOURCE_FINGERPRINT: u32 = 2;
    pub const DEPTH: u32 = 3;
}

pub mod coin_info_keys {
    pub const COIN_TYPE: u32 = 1;
    pub const NETWORK: u32 = 2;
}

pub mod address_keys {
    pub const INFO: u32 = 1;
    pub const TYPE: u32 = 2;
    pub const DATA: u32 = 3;
}

pub mod multikey_keys {
    pub const THRESHOLD: u32 = 1;
    pub const KEYS: u32 = 2;
}

pub mod account_keys {
    pub const MASTER_FINGERPRINT: u32 = 1;
    pub const OUTPUT_DESCRIPTORS: u32 = 2;
}

pub mod lengths {
    pub const COMPRESSED_PUBKEY: usize = 33;
    pub const PRIVATE_KEY: usize = 32;
    pub const CHAIN_CODE: usize = 32;
}

/// Valid BIP39 entropy lengths in bytes
pub const VALID_BIP39_ENTROPY_LENGTHS: [usize; 5] = [16, 20, 24, 28, 32];
