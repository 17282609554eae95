//! Turn a reassembled UR message into a scan result based on its declared type

use std::str::FromStr as _;

use bitcoin::{Network, bip32::Fingerprint};
use cove_ur::{
    CryptoAccount, CryptoAddress, CryptoBip39, CryptoCoinInfo, CryptoHdkey, CryptoOutput,
    CryptoPsbt, CryptoSeed, RegistryItem, error::ToUrError as _,
};
use tracing::{debug, warn};

use crate::{
    address::AddressWithNetwork,
    descriptor::{self, DescriptorError, OutputDescriptor},
    extended_key::ExtendedKey,
    psbt::Psbt,
    scan_result::{ScanError, ScanResult},
    seed::Seed,
    transaction::Transaction,
};

/// Registry types a UR can declare, older `crypto-` names and the newer unprefixed ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum RegistryType {
    #[strum(serialize = "bytes")]
    Bytes,
    #[strum(to_string = "crypto-psbt", serialize = "psbt")]
    Psbt,
    #[strum(to_string = "crypto-address", serialize = "address")]
    Address,
    #[strum(to_string = "crypto-hdkey", serialize = "hdkey")]
    Hdkey,
    #[strum(to_string = "crypto-output", serialize = "output-descriptor")]
    Output,
    #[strum(to_string = "crypto-account", serialize = "account-descriptor")]
    Account,
    #[strum(to_string = "crypto-seed", serialize = "seed")]
    Seed,
    #[strum(to_string = "crypto-bip39", serialize = "bip39")]
    Bip39,
}

type Result<T, E = ScanError> = std::result::Result<T, E>;

/// Never fails, problems come back as [`ScanResult::Error`]
pub fn extract(ur_type: &str, cbor: &[u8], network: Network) -> ScanResult {
    let Ok(registry_type) = RegistryType::from_str(ur_type) else {
        warn!("unsupported UR type {ur_type}");
        return ScanError::UnsupportedRegistryType(ur_type.to_string()).into();
    };

    debug!("extracting {registry_type} from {} bytes", cbor.len());

    let result = match registry_type {
        RegistryType::Bytes => extract_bytes(cbor),
        RegistryType::Psbt => extract_psbt(cbor),
        RegistryType::Address => extract_address(cbor, network),
        RegistryType::Hdkey => extract_hdkey(cbor, network),
        RegistryType::Output => extract_output(cbor, network),
        RegistryType::Account => extract_account(cbor, network),
        RegistryType::Seed => extract_seed(cbor),
        RegistryType::Bip39 => extract_bip39(cbor),
    };

    if let Err(error) = &result {
        warn!("unable to extract {registry_type}: {error}");
    }

    result.into()
}

fn decode<T: RegistryItem>(cbor: &[u8]) -> Result<T> {
    Ok(T::from_cbor(cbor)?)
}

/// A CBOR byte string holding a PSBT, a transaction or UTF-8 text
fn extract_bytes(cbor: &[u8]) -> Result<ScanResult> {
    let bytes = minicbor::Decoder::new(cbor).bytes().map_err_cbor_decode()?;

    if let Ok(psbt) = Psbt::try_from_bytes(bytes) {
        return Ok(ScanResult::Psbt(Box::new(psbt)));
    }

    if let Ok(transaction) = Transaction::try_from_bytes(bytes) {
        return Ok(ScanResult::Transaction(transaction));
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(ScanResult::Text(text.to_string())),
        Err(_) => Err(ScanError::UninterpretableBytes),
    }
}

fn extract_psbt(cbor: &[u8]) -> Result<ScanResult> {
    let psbt = decode::<CryptoPsbt>(cbor)?.into_psbt();
    Ok(ScanResult::Psbt(Box::new(psbt.into())))
}

fn extract_address(cbor: &[u8], fallback: Network) -> Result<ScanResult> {
    let crypto_address = decode::<CryptoAddress>(cbor)?;
    let network =
        crypto_address.info.as_ref().and_then(CryptoCoinInfo::bitcoin_network).unwrap_or(fallback);

    let address = crypto_address.to_address(fallback)?;
    Ok(ScanResult::Address(AddressWithNetwork { address, network }))
}

fn extract_hdkey(cbor: &[u8], fallback: Network) -> Result<ScanResult> {
    let hdkey = decode::<CryptoHdkey>(cbor)?;
    let name = hdkey.name.clone();

    let network = hdkey.network_or(fallback);
    let key = if hdkey.is_private {
        ExtendedKey::from_xpriv(hdkey.to_xpriv(network)?)
    } else {
        let origin = hdkey.origin.as_ref().map(|keypath| descriptor::key_source(keypath, None));
        ExtendedKey::from_xpub(hdkey.to_xpub(network)?, origin.transpose()?)
    };

    Ok(ScanResult::ExtendedKey { key, name })
}

fn extract_output(cbor: &[u8], fallback: Network) -> Result<ScanResult> {
    let output = decode::<CryptoOutput>(cbor)?;
    let descriptor = OutputDescriptor::from_crypto_output(&output, fallback, None)?;

    Ok(ScanResult::OutputDescriptor(descriptor))
}

fn extract_account(cbor: &[u8], fallback: Network) -> Result<ScanResult> {
    let account = decode::<CryptoAccount>(cbor)?;
    let master_fingerprint = Fingerprint::from(account.master_fingerprint);

    let mut descriptors = Vec::with_capacity(account.outputs.len());
    for output in &account.outputs {
        match OutputDescriptor::from_crypto_output(output, fallback, Some(master_fingerprint)) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(DescriptorError::UnsupportedScriptExpressions(expressions)) => {
                warn!("skipping account output with unsupported expressions {expressions}");
            }
            Err(error) => return Err(error.into()),
        }
    }

    if descriptors.is_empty() {
        return Err(ScanError::EmptyAccount(master_fingerprint.to_string()));
    }

    Ok(ScanResult::Wallets { master_fingerprint, descriptors })
}

fn extract_seed(cbor: &[u8]) -> Result<ScanResult> {
    let seed = decode::<CryptoSeed>(cbor)?;
    Ok(ScanResult::Seed(Seed::try_from_crypto_seed(&seed)?))
}

fn extract_bip39(cbor: &[u8]) -> Result<ScanResult> {
    let bip39 = decode::<CryptoBip39>(cbor)?;
    Ok(ScanResult::Seed(Seed::try_from_crypto_bip39(&bip39)?))
}
