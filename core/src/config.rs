//! Process configuration, read once at startup.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::is_valid_address;

pub const DEFAULT_SEARCH_LIMIT: u32 = 1000;
pub const DEFAULT_BOX_FETCH_CONCURRENCY: usize = 8;
/// Bank application deployed on testnet.
pub const TESTNET_BANK_APP_ID: u64 = 747_661_600;
const LOCALNET_TOKEN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown network {0:?} (expected mainnet, testnet or localnet)")]
    UnknownNetwork(String),
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("API_BIND is not a socket address: {0:?}")]
    Bind(String),
    #[error("BANK_ACCOUNT is not a valid Algorand address: {0:?}")]
    Account(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Localnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
        }
    }

    fn default_algod(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://mainnet-api.algonode.cloud",
            Network::Testnet => "https://testnet-api.algonode.cloud",
            Network::Localnet => "http://localhost:4001",
        }
    }

    fn default_indexer(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://mainnet-idx.algonode.cloud",
            Network::Testnet => "https://testnet-idx.algonode.cloud",
            Network::Localnet => "http://localhost:8980",
        }
    }

    /// Bank application used when `BANK_APP_ID` is unset.
    pub fn default_app_id(&self) -> Option<u64> {
        match self {
            Network::Testnet => Some(TESTNET_BANK_APP_ID),
            _ => None,
        }
    }

    fn default_token(&self) -> Option<String> {
        match self {
            Network::Localnet => Some(LOCALNET_TOKEN.to_string()),
            _ => None,
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "localnet" => Ok(Network::Localnet),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub server: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub algod: Endpoint,
    pub indexer: Endpoint,
    pub app_id: Option<u64>,
    pub account: Option<String>,
    pub search_limit: u32,
    /// Upper bound on box value requests in flight during a roster refresh.
    pub box_fetch_concurrency: usize,
    pub bind: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let network = match var("ALGOD_NETWORK") {
            Some(v) => v.parse()?,
            None => Network::default(),
        };

        let algod = Endpoint {
            server: var("ALGOD_SERVER").unwrap_or_else(|| network.default_algod().to_string()),
            token: var("ALGOD_TOKEN").or_else(|| network.default_token()),
        };
        let indexer = Endpoint {
            server: var("INDEXER_SERVER").unwrap_or_else(|| network.default_indexer().to_string()),
            token: var("INDEXER_TOKEN").or_else(|| network.default_token()),
        };

        let app_id = var("BANK_APP_ID")
            .map(|v| parse_number::<u64>("BANK_APP_ID", v))
            .transpose()?
            .or_else(|| network.default_app_id());

        let account = var("BANK_ACCOUNT");
        if let Some(account) = &account {
            if !is_valid_address(account) {
                return Err(ConfigError::Account(account.clone()));
            }
        }

        let search_limit = var("SEARCH_LIMIT")
            .map(|v| parse_number::<u32>("SEARCH_LIMIT", v))
            .transpose()?
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        let box_fetch_concurrency = var("BOX_FETCH_CONCURRENCY")
            .map(|v| parse_number::<usize>("BOX_FETCH_CONCURRENCY", v))
            .transpose()?
            .unwrap_or(DEFAULT_BOX_FETCH_CONCURRENCY);
        if box_fetch_concurrency == 0 {
            return Err(ConfigError::Zero("BOX_FETCH_CONCURRENCY"));
        }

        let bind = match var("API_BIND") {
            Some(v) => v.parse().map_err(|_| ConfigError::Bind(v))?,
            None => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        Ok(Self {
            network,
            algod,
            indexer,
            app_id,
            account,
            search_limit,
            box_fetch_concurrency,
            bind,
        })
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::NotANumber { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_to_testnet_algonode() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.algod.server, "https://testnet-api.algonode.cloud");
        assert_eq!(cfg.indexer.server, "https://testnet-idx.algonode.cloud");
        assert_eq!(cfg.algod.token, None);
        assert_eq!(cfg.app_id, Some(TESTNET_BANK_APP_ID));
        assert_eq!(cfg.search_limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(cfg.box_fetch_concurrency, DEFAULT_BOX_FETCH_CONCURRENCY);
        assert_eq!(cfg.bind, SocketAddr::from(([127, 0, 0, 1], 3000)));
    }

    #[test]
    fn localnet_uses_sandbox_token() {
        let cfg = config(&[("ALGOD_NETWORK", "LocalNet")]).unwrap();
        assert_eq!(cfg.algod.server, "http://localhost:4001");
        assert_eq!(cfg.indexer.token.as_deref(), Some(LOCALNET_TOKEN));
        assert_eq!(cfg.app_id, None);
    }

    #[test]
    fn bank_app_defaults_only_on_testnet() {
        assert_eq!(config(&[("ALGOD_NETWORK", "mainnet")]).unwrap().app_id, None);
        assert_eq!(config(&[("ALGOD_NETWORK", "localnet")]).unwrap().app_id, None);
        assert_eq!(
            config(&[("ALGOD_NETWORK", "testnet")]).unwrap().app_id,
            Some(747_661_600)
        );
        assert_eq!(config(&[("BANK_APP_ID", "42")]).unwrap().app_id, Some(42));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = config(&[
            ("ALGOD_SERVER", "http://algod:8080"),
            ("INDEXER_TOKEN", "secret"),
            ("BANK_APP_ID", "747661600"),
            ("BANK_ACCOUNT", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"),
            ("SEARCH_LIMIT", "50"),
            ("BOX_FETCH_CONCURRENCY", "2"),
            ("API_BIND", "0.0.0.0:8000"),
            ("INDEXER_SERVER", "   "),
        ])
        .unwrap();
        assert_eq!(cfg.algod.server, "http://algod:8080");
        assert_eq!(cfg.indexer.server, "https://testnet-idx.algonode.cloud");
        assert_eq!(cfg.indexer.token.as_deref(), Some("secret"));
        assert_eq!(cfg.app_id, Some(747_661_600));
        assert!(cfg.account.is_some());
        assert_eq!(cfg.search_limit, 50);
        assert_eq!(cfg.box_fetch_concurrency, 2);
        assert_eq!(cfg.bind.port(), 8000);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config(&[("ALGOD_NETWORK", "betanet")]),
            Err(ConfigError::UnknownNetwork(_))
        ));
        assert!(matches!(
            config(&[("BANK_APP_ID", "bank")]),
            Err(ConfigError::NotANumber { name: "BANK_APP_ID", .. })
        ));
        assert!(matches!(
            config(&[("BANK_ACCOUNT", "alice")]),
            Err(ConfigError::Account(_))
        ));
        assert!(matches!(config(&[("API_BIND", "nowhere")]), Err(ConfigError::Bind(_))));
        assert!(matches!(
            config(&[("BOX_FETCH_CONCURRENCY", "0")]),
            Err(ConfigError::Zero("BOX_FETCH_CONCURRENCY"))
        ));
    }
}
