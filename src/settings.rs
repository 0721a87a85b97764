use crate::compiler::Version;
use anyhow::anyhow;
use config::{Config, File};
use serde::{de::IgnoredAny, Deserialize};
use std::{collections::BTreeMap, net::SocketAddr, str::FromStr};
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub deployer: DeployerSettings,
    pub compiler: CompilerSettings,
    pub imports: ImportSettings,
    pub ipfs: IpfsSettings,
    pub sweeper: SweeperSettings,
    pub analytics: AnalyticsSettings,
    /// Chain descriptors keyed by decimal chain id.
    pub chains: BTreeMap<String, ChainSettings>,

    pub config: IgnoredAny,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from_str("0.0.0.0:8050").expect("should be valid socket addr"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployerSettings {
    /// Hex-encoded private key of the deployer account. Deployments are
    /// rejected with a wallet error when unset.
    pub private_key: Option<String>,
    pub request_timeout: u64,
}

impl Default for DeployerSettings {
    fn default() -> Self {
        Self {
            private_key: None,
            request_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSettings {
    /// Long version string, e.g. `v0.8.24+commit.e11b9ed9`. The commit part
    /// is what explorers match against during verification.
    #[serde(with = "serde_with::rust::display_fromstr")]
    pub version: Version,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            version: Version::from_str("v0.8.24+commit.e11b9ed9").expect("valid compiler version"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSettings {
    pub npm_cdn_url: Url,
    pub request_timeout: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            npm_cdn_url: Url::try_from("https://unpkg.com/").expect("valid url"),
            request_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IpfsSettings {
    pub enabled: bool,
    pub api_url: Url,
    pub gateway_url: Url,
    pub request_timeout: u64,
}

impl Default for IpfsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: Url::try_from("http://127.0.0.1:5001/").expect("valid url"),
            gateway_url: Url::try_from("https://ipfs.io/").expect("valid url"),
            request_timeout: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweeperSettings {
    pub enabled: bool,
    /// Cron expression with seconds; validated when the job is scheduled.
    pub schedule: String,
    /// Pending verifications left after a sweep above this count trigger an
    /// operator-visible overflow warning.
    pub backlog_warn_threshold: usize,
    /// Bearer token required by the HTTP sweep trigger. When unset the
    /// endpoint is open (development mode).
    pub api_token: Option<String>,
    pub request_timeout: u64,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: "0 */5 * * * *".to_string(), // every five minutes
            backlog_warn_threshold: 5,
            api_token: None,
            request_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsSettings {
    pub enabled: bool,
    pub endpoint: Option<Url>,
    pub queue_size: usize,
    pub request_timeout: u64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            queue_size: 128,
            request_timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSettings {
    pub name: String,
    pub rpc_url: Url,
    pub explorer_api_url: Url,
    #[serde(default)]
    pub explorer_api_key: String,
    pub block_explorer_url: Url,
}

impl Settings {
    pub fn new() -> anyhow::Result<Self> {
        let config_path = std::env::var("CONTRACT_DEPLOYER_CONFIG");

        let mut builder = Config::builder();
        if let Ok(config_path) = config_path {
            builder = builder.add_source(File::with_name(&config_path));
        };
        builder = builder.add_source(config::Environment::with_prefix("CONTRACT_DEPLOYER"));

        builder
            .build()?
            .try_deserialize()
            .map_err(|err| anyhow!(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.addr.port(), 8050);
        assert_eq!(settings.sweeper.backlog_warn_threshold, 5);
        assert!(settings.sweeper.enabled);
        assert!(settings.deployer.private_key.is_none());
        assert_eq!(settings.compiler.version.short(), "0.8.24");
    }

    #[test]
    fn parse_chain_settings() {
        let json = r#"{
            "name": "sepolia",
            "rpc_url": "https://rpc.sepolia.org/",
            "explorer_api_url": "https://api-sepolia.etherscan.io/api",
            "block_explorer_url": "https://sepolia.etherscan.io/"
        }"#;
        let chain: ChainSettings = serde_json::from_str(json).expect("valid chain settings");
        assert_eq!(chain.name, "sepolia");
        assert_eq!(chain.explorer_api_key, "");
    }
}
