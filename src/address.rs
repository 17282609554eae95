//! Addresses and BIP21 payment URIs

use std::fmt;

use bitcoin::{Address, Amount, Denomination, Network, address::NetworkUnchecked};
use itertools::Itertools as _;
use url::Url;

const BITCOIN_SCHEME: &str = "bitcoin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentUriError {
    #[error("empty address")]
    EmptyAddress,

    #[error("not a bitcoin: uri")]
    MissingScheme,

    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("not a valid address for any network")]
    InvalidAddress,

    #[error("valid address, but for an unsupported network")]
    UnsupportedNetwork,

    #[error("invalid amount {0}")]
    InvalidAmount(String),

    #[error("unsupported required parameter {0}")]
    UnsupportedRequiredParam(String),
}

type Error = PaymentUriError;
type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressWithNetwork {
    pub address: Address,
    pub network: Network,
}

impl AddressWithNetwork {
    /// Parse a bare address, checking `preferred` before the other networks
    pub fn try_new(input: &str, preferred: Network) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::EmptyAddress);
        }

        let address: Address<NetworkUnchecked> =
            input.parse().map_err(|_| Error::InvalidAddress)?;

        let networks =
            [preferred, Network::Bitcoin, Network::Testnet, Network::Signet, Network::Regtest];
        for network in networks.into_iter().unique() {
            if let Ok(address) = address.clone().require_network(network) {
                return Ok(Self { address, network });
            }
        }

        Err(Error::UnsupportedNetwork)
    }
}

/// A BIP21 `bitcoin:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUri {
    pub address: Address,
    pub network: Network,
    pub amount: Option<Amount>,
    pub label: Option<String>,
    pub message: Option<String>,
    /// Parameters other than amount, label and message, in the order given
    pub params: Vec<(String, String)>,
}

impl From<AddressWithNetwork> for PaymentUri {
    fn from(AddressWithNetwork { address, network }: AddressWithNetwork) -> Self {
        Self { address, network, amount: None, label: None, message: None, params: Vec::new() }
    }
}

impl PaymentUri {
    /// Parse text that carries an explicit `bitcoin:` scheme
    pub fn try_from_uri(input: &str, preferred: Network) -> Result<Self> {
        let input = input.trim();

        let has_scheme = input
            .split_once(':')
            .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case(BITCOIN_SCHEME));

        if !has_scheme {
            return Err(Error::MissingScheme);
        }

        let url = Url::parse(input).map_err(|e| Error::InvalidUri(e.to_string()))?;

        // `bitcoin:addr` puts the address in the path, `bitcoin://addr` in the host
        let address = match (url.path(), url.host_str()) {
            (address, None) | ("", Some(address)) if !address.is_empty() => address,
            _ => return Err(Error::EmptyAddress),
        };

        let mut uri: Self = AddressWithNetwork::try_new(address, preferred)?.into();

        for (key, value) in url.query_pairs() {
            match &*key {
                "amount" => {
                    let amount = Amount::from_str_in(value.trim(), Denomination::Bitcoin)
                        .map_err(|_| Error::InvalidAmount(value.to_string()))?;
                    uri.amount = Some(amount);
                }
                "label" => uri.label = Some(value.into_owned()),
                "message" => uri.message = Some(value.into_owned()),
                key if key.starts_with("req-") => {
                    return Err(Error::UnsupportedRequiredParam(key.to_string()));
                }
                _ => uri.params.push((key.to_string(), value.into_owned())),
            }
        }

        Ok(uri)
    }

    pub fn has_params(&self) -> bool {
        self.amount.is_some()
            || self.label.is_some()
            || self.message.is_some()
            || !self.params.is_empty()
    }
}

impl fmt::Display for PaymentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{BITCOIN_SCHEME}:{}", self.address)?;

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(amount) = self.amount {
            query.append_pair("amount", &amount.to_string_in(Denomination::Bitcoin));
        }
        if let Some(label) = &self.label {
            query.append_pair("label", label);
        }
        if let Some(message) = &self.message {
            query.append_pair("message", message);
        }
        for (key, value) in &self.params {
            query.append_pair(key, value);
        }

        let query = query.finish();
        if !query.is_empty() {
            write!(f, "?{query}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::NetworkKind;
    use pretty_assertions::assert_eq;

    use super::*;

    const MAINNET: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

    #[test]
    fn test_bare_address() {
        let address = AddressWithNetwork::try_new(MAINNET, Network::Bitcoin).unwrap();
        assert_eq!(address.network, Network::Bitcoin);
        assert_eq!(address.address.to_string(), MAINNET);
    }

    #[test]
    fn test_preferred_network_first() {
        let testnet = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

        let on_signet = AddressWithNetwork::try_new(testnet, Network::Signet).unwrap();
        assert_eq!(on_signet.network, Network::Signet);

        let fallback = AddressWithNetwork::try_new(testnet, Network::Bitcoin).unwrap();
        assert_eq!(fallback.network, Network::Testnet);
        assert_eq!(NetworkKind::from(fallback.network), NetworkKind::Test);
    }

    #[test]
    fn test_uri_with_params() {
        let input = format!("bitcoin:{MAINNET}?amount=0.001&label=Donation&foo=bar");
        let uri = PaymentUri::try_from_uri(&input, Network::Bitcoin).unwrap();

        assert_eq!(uri.address.to_string(), MAINNET);
        assert_eq!(uri.amount, Some(Amount::from_sat(100_000)));
        assert_eq!(uri.label.as_deref(), Some("Donation"));
        assert_eq!(uri.params, vec![("foo".to_string(), "bar".to_string())]);
        assert!(uri.has_params());
    }

    #[test]
    fn test_uri_uppercase_scheme_and_host_form() {
        let upper = format!("BITCOIN:{}", MAINNET.to_uppercase());
        let uri = PaymentUri::try_from_uri(&upper, Network::Bitcoin).unwrap();
        assert_eq!(uri.address.to_string(), MAINNET);

        let host_form = format!("bitcoin://{MAINNET}?message=hi");
        let uri = PaymentUri::try_from_uri(&host_form, Network::Bitcoin).unwrap();
        assert_eq!(uri.message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_uri_requires_scheme() {
        assert_eq!(PaymentUri::try_from_uri(MAINNET, Network::Bitcoin), Err(Error::MissingScheme));
        let empty = PaymentUri::try_from_uri("bitcoin:", Network::Bitcoin);
        assert_eq!(empty, Err(Error::EmptyAddress));
    }

    #[test]
    fn test_unknown_required_param() {
        let input = format!("bitcoin:{MAINNET}?req-somethingyoudontunderstand=50");
        assert!(matches!(
            PaymentUri::try_from_uri(&input, Network::Bitcoin),
            Err(Error::UnsupportedRequiredParam(_))
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        let input = format!("bitcoin:{MAINNET}?amount=0.5&label=Luke+Jr");
        let uri = PaymentUri::try_from_uri(&input, Network::Bitcoin).unwrap();
        let reparsed = PaymentUri::try_from_uri(&uri.to_string(), Network::Bitcoin).unwrap();

        assert_eq!(reparsed, uri);
        assert_eq!(uri.label.as_deref(), Some("Luke Jr"));
    }
}
