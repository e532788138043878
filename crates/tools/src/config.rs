//! Project configuration loading
//!
//! Configuration is resolved in priority order:
//!
//! 1. Environment variables (optionally seeded from `.env`)
//! 2. `nodelaunch.toml` in the project root
//! 3. Built-in defaults (network declarations, compiler directive, paths)
//!
//! Values are only coerced to their types; malformed URLs or keys pass
//! through to the toolchain that consumes them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodelaunch_tools::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let network = config.network(None)?;
//! println!("Network: {} (chain {})", network.name, network.chain_id);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::compiler::{CompilerSettings, SpdxSettings};
use crate::network::{
    AccountSource, HdAccounts, NetworkProfile, NetworkRegistry, LOCAL_NETWORK,
};
use crate::paths::{AbiExporter, PathOverrides, ProjectPaths};
use crate::watcher::WatcherConfig;

/// Well-known insecure development mnemonic used when `MNEMONIC` is unset.
pub const DEFAULT_MNEMONIC: &str =
    "test test test test test test test test test test test junk";

/// Project file looked up in the project root
pub const PROJECT_FILE: &str = "nodelaunch.toml";

pub const ENV_MNEMONIC: &str = "MNEMONIC";
pub const ENV_ETHERSCAN_API_KEY: &str = "ETHERSCAN_API_KEY";
pub const ENV_TENDERLY_PROJECT: &str = "TENDERLY_PROJECT";
pub const ENV_TENDERLY_USERNAME: &str = "TENDERLY_USERNAME";
pub const ENV_NETWORK: &str = "NODELAUNCH_NETWORK";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid network: {0}. Must be: mainnet, alfajores, or baklava")]
    InvalidNetwork(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Chain id {chain_id} of network {added} is already used by {existing}")]
    DuplicateChainId {
        chain_id: u64,
        existing: String,
        added: String,
    },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// The process environment variables the configuration reads, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub mnemonic: Option<String>,
    pub etherscan_api_key: Option<String>,
    pub tenderly_project: Option<String>,
    pub tenderly_username: Option<String>,
    pub network: Option<String>,
}

impl Environment {
    /// Load `.env` if present, then read the process environment.
    pub fn capture() -> Self {
        // Load .env file if it exists (non-fatal)
        if let Err(err) = dotenvy::dotenv() {
            debug!("no .env loaded: {err}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            mnemonic: get(ENV_MNEMONIC),
            etherscan_api_key: get(ENV_ETHERSCAN_API_KEY),
            tenderly_project: get(ENV_TENDERLY_PROJECT),
            tenderly_username: get(ENV_TENDERLY_USERNAME),
            network: get(ENV_NETWORK),
        }
    }
}

/// `[default]` section of the project file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultSection {
    pub network: Option<String>,
}

/// `[profile.<name>]` section: overrides for a declared network, or a new one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverride {
    pub url: Option<String>,
    pub chain_id: Option<u64>,
    pub gas_price: Option<u64>,
    pub gas: Option<u64>,
    pub live: Option<bool>,
    /// Explicit keys replace the mnemonic for this network
    pub accounts: Option<Vec<String>>,
}

impl ProfileOverride {
    fn apply(&self, mut profile: NetworkProfile) -> NetworkProfile {
        if let Some(url) = &self.url {
            profile.url = Some(url.clone());
        }
        if let Some(chain_id) = self.chain_id {
            profile.chain_id = chain_id;
        }
        if self.gas_price.is_some() {
            profile.gas_price = self.gas_price;
        }
        if self.gas.is_some() {
            profile.gas = self.gas;
        }
        if let Some(live) = self.live {
            profile.live = live;
        }
        if let Some(keys) = &self.accounts {
            profile.accounts = AccountSource::Keys(keys.clone());
        }
        profile
    }

    fn build(&self, name: &str, accounts: &AccountSource) -> Result<NetworkProfile, ConfigError> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| ConfigError::MissingField(format!("profile.{name}.url")))?;
        let chain_id = self
            .chain_id
            .ok_or_else(|| ConfigError::MissingField(format!("profile.{name}.chain_id")))?;
        let base = NetworkProfile {
            name: name.to_string(),
            url: Some(url),
            chain_id,
            accounts: accounts.clone(),
            gas_price: None,
            gas: None,
            live: true,
        };
        Ok(self.apply(base))
    }
}

/// Contents of `nodelaunch.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub default: Option<DefaultSection>,
    #[serde(default)]
    pub profile: BTreeMap<String, ProfileOverride>,
    #[serde(default)]
    pub solidity: Option<CompilerSettings>,
    #[serde(default)]
    pub spdx: Option<SpdxSettings>,
    #[serde(default)]
    pub paths: PathOverrides,
    #[serde(default)]
    pub abi_exporter: Option<AbiExporter>,
    #[serde(default)]
    pub watcher: Option<WatcherConfig>,
    #[serde(default)]
    pub named_accounts: BTreeMap<String, u32>,
}

impl ProjectFile {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::TomlError)
    }

    /// Read the project file from `root`; `None` when it does not exist.
    pub fn read(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(PROJECT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        debug!(path = %path.display(), "loaded project file");
        Self::parse(&content).map(Some)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EtherscanConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TenderlyConfig {
    pub project: Option<String>,
    pub username: Option<String>,
}

/// Resolved, immutable project configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Declared networks and the default selection
    pub networks: NetworkRegistry,
    /// Signing accounts shared by every network without explicit keys
    pub accounts: AccountSource,
    /// Whether the mnemonic came from `MNEMONIC` rather than the fallback
    pub mnemonic_from_env: bool,
    /// Account names mapped to derivation indices
    pub named_accounts: BTreeMap<String, u32>,
    pub solidity: CompilerSettings,
    pub spdx: SpdxSettings,
    pub paths: ProjectPaths,
    pub abi_exporter: AbiExporter,
    pub etherscan: EtherscanConfig,
    pub tenderly: TenderlyConfig,
    pub watcher: WatcherConfig,
}

impl Config {
    /// Load configuration from the environment and `nodelaunch.toml` in the
    /// current directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration for the project rooted at `root`.
    pub fn load_from(root: &Path) -> Result<Self, ConfigError> {
        let env = Environment::capture();
        let file = ProjectFile::read(root)?;
        Self::resolve(&env, file.as_ref(), root)
    }

    /// Merge captured environment, project file and built-in declarations.
    ///
    /// # Resolution Order
    ///
    /// 1. Accounts: `MNEMONIC`, else [`DEFAULT_MNEMONIC`]
    /// 2. Built-in networks, then `[profile.*]` overrides in name order
    /// 3. Default network: `NODELAUNCH_NETWORK`, then `[default] network`,
    ///    then `hardhat`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - A new profile lacks `url` or `chain_id`
    /// - Two profiles share a chain id, or `hardhat` is given another one
    /// - The default network is not declared
    pub fn resolve(
        env: &Environment,
        file: Option<&ProjectFile>,
        root: &Path,
    ) -> Result<Self, ConfigError> {
        let empty = ProjectFile::default();
        let file = file.unwrap_or(&empty);

        let mnemonic = env
            .mnemonic
            .clone()
            .unwrap_or_else(|| DEFAULT_MNEMONIC.to_string());
        let accounts = AccountSource::Mnemonic(HdAccounts::new(mnemonic));

        let mut networks = NetworkRegistry::builtin(&accounts);
        for (name, overrides) in &file.profile {
            let profile = match networks.get(name) {
                Ok(existing) => overrides.apply(existing.clone()),
                Err(_) => overrides.build(name, &accounts)?,
            };
            networks.insert(profile)?;
        }

        let default_network = env
            .network
            .clone()
            .or_else(|| file.default.as_ref().and_then(|d| d.network.clone()))
            .unwrap_or_else(|| LOCAL_NETWORK.to_string());
        networks.set_default(&default_network)?;

        let mut named_accounts = BTreeMap::from([("deployer".to_string(), 0)]);
        named_accounts.extend(file.named_accounts.clone());

        let config = Config {
            networks,
            accounts,
            mnemonic_from_env: env.mnemonic.is_some(),
            named_accounts,
            solidity: file.solidity.clone().unwrap_or_default(),
            spdx: file.spdx.clone().unwrap_or_default(),
            paths: ProjectPaths::resolve(root, &file.paths),
            abi_exporter: file.abi_exporter.clone().unwrap_or_default().anchored(root),
            etherscan: EtherscanConfig {
                api_key: env.etherscan_api_key.clone(),
            },
            tenderly: TenderlyConfig {
                project: env.tenderly_project.clone(),
                username: env.tenderly_username.clone(),
            },
            watcher: file.watcher.clone().unwrap_or_default(),
        };
        debug!(
            networks = config.networks.len(),
            default = config.networks.default_name(),
            "configuration resolved"
        );
        Ok(config)
    }

    /// Select a network by name, or the default one.
    pub fn network(&self, name: Option<&str>) -> Result<&NetworkProfile, ConfigError> {
        match name {
            Some(name) => self.networks.get(name),
            None => Ok(self.networks.default_profile()),
        }
    }

    /// Derivation index of a named account such as `deployer`.
    pub fn named_account(&self, name: &str) -> Option<u32> {
        self.named_accounts.get(name).copied()
    }

    /// Print the resolved configuration
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════════╗");
        println!("║         NODELAUNCH PROJECT CONFIGURATION RESOLVED              ║");
        println!("╚════════════════════════════════════════════════════════════════╝");
        println!("  Default Network:     {}", self.networks.default_name());
        for profile in self.networks.iter() {
            println!(
                "  {:<20} chain {:<6} {}{}",
                format!("{}:", profile.name),
                profile.chain_id,
                profile.url.as_deref().unwrap_or("(in-process)"),
                if profile.live { " [live]" } else { "" }
            );
        }
        println!("  Accounts:            {}", self.accounts_origin());
        println!(
            "  Solidity:            {} (optimizer {}, {} runs)",
            self.solidity.version,
            if self.solidity.optimizer.enabled { "on" } else { "off" },
            self.solidity.optimizer.runs
        );
        println!("  Sources:             {}", self.paths.sources.display());
        println!("  Artifacts:           {}", self.paths.artifacts.display());

        if self.etherscan.api_key.is_some() {
            println!("  Etherscan API Key:   (set)");
        } else {
            println!("  Etherscan API Key:   (not configured)");
        }

        match (&self.tenderly.project, &self.tenderly.username) {
            (Some(project), Some(username)) => {
                println!("  Tenderly:            {}/{}", username, project)
            }
            _ => println!("  Tenderly:            (not configured)"),
        }

        println!("╚════════════════════════════════════════════════════════════════╝");
    }

    fn accounts_origin(&self) -> String {
        let origin = if self.mnemonic_from_env {
            "MNEMONIC"
        } else {
            "default test mnemonic"
        };
        format!("{} from {}", self.accounts.describe(), origin)
    }

    /// Get configuration as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Network entry as reported by `to_json`, without key material
#[derive(Serialize)]
struct NetworkView<'a> {
    name: &'a str,
    url: Option<&'a str>,
    chain_id: u64,
    gas_price: Option<u64>,
    gas: Option<u64>,
    live: bool,
    accounts: String,
}

impl<'a> From<&'a NetworkProfile> for NetworkView<'a> {
    fn from(profile: &'a NetworkProfile) -> Self {
        Self {
            name: &profile.name,
            url: profile.url.as_deref(),
            chain_id: profile.chain_id,
            gas_price: profile.gas_price,
            gas: profile.gas,
            live: profile.live,
            accounts: profile.accounts.describe(),
        }
    }
}

// Manual Serialize impl for Config so secrets are never written out
impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let networks: Vec<NetworkView<'_>> = self.networks.iter().map(NetworkView::from).collect();
        let mut map = serializer.serialize_map(Some(11))?;
        map.serialize_entry("default_network", self.networks.default_name())?;
        map.serialize_entry("networks", &networks)?;
        map.serialize_entry("accounts", &self.accounts_origin())?;
        map.serialize_entry("named_accounts", &self.named_accounts)?;
        map.serialize_entry("solidity", &self.solidity)?;
        map.serialize_entry("spdx", &self.spdx)?;
        map.serialize_entry("paths", &self.paths)?;
        map.serialize_entry("abi_exporter", &self.abi_exporter)?;
        map.serialize_entry("etherscan_api_key_set", &self.etherscan.api_key.is_some())?;
        map.serialize_entry("tenderly", &self.tenderly)?;
        map.serialize_entry("watcher", &self.watcher)?;
        map.end()
    }
}
