//! Named network profiles and the registry that holds them.
//!
//! The built-in registry declares Celo mainnet, the Alfajores test network,
//! and the in-process `hardhat` simulation network (chain id 31337).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Name of the in-process simulation network.
pub const LOCAL_NETWORK: &str = "hardhat";

/// Chain id of the in-process simulation network. Never overridden.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Gas price used by the live Celo profiles: 0.5 gwei.
pub const CELO_GAS_PRICE: u64 = 500_000_000;

/// Well-known Celo networks reachable through Forno
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeloNetwork {
    Mainnet,
    Alfajores,
    Baklava,
}

impl CeloNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            CeloNetwork::Mainnet => "mainnet",
            CeloNetwork::Alfajores => "alfajores",
            CeloNetwork::Baklava => "baklava",
        }
    }

    /// EIP-155 chain identifier
    pub fn chain_id(&self) -> u64 {
        match self {
            CeloNetwork::Mainnet => 42220,
            CeloNetwork::Alfajores => 44787,
            CeloNetwork::Baklava => 62320,
        }
    }

    /// Public Forno RPC endpoint
    pub fn forno_url(&self) -> &'static str {
        match self {
            CeloNetwork::Mainnet => "https://forno.celo.org",
            CeloNetwork::Alfajores => "https://alfajores-forno.celo-testnet.org",
            CeloNetwork::Baklava => "https://baklava-forno.celo-testnet.org",
        }
    }
}

impl FromStr for CeloNetwork {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(CeloNetwork::Mainnet),
            "alfajores" => Ok(CeloNetwork::Alfajores),
            "baklava" => Ok(CeloNetwork::Baklava),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for CeloNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default BIP-44 derivation path for EVM accounts
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'/0";

/// Mnemonic-derived account set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdAccounts {
    pub mnemonic: String,
    pub path: String,
    pub initial_index: u32,
    pub count: u32,
}

impl HdAccounts {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            path: DEFAULT_HD_PATH.to_string(),
            initial_index: 0,
            count: 20,
        }
    }
}

/// Where a network's signing accounts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSource {
    Mnemonic(HdAccounts),
    Keys(Vec<String>),
}

impl AccountSource {
    pub fn mnemonic(&self) -> Option<&str> {
        match self {
            AccountSource::Mnemonic(hd) => Some(&hd.mnemonic),
            AccountSource::Keys(_) => None,
        }
    }

    /// Short description that never reveals key material
    pub fn describe(&self) -> String {
        match self {
            AccountSource::Mnemonic(hd) => {
                format!("mnemonic ({} accounts at {})", hd.count, hd.path)
            }
            AccountSource::Keys(keys) => format!("{} explicit keys", keys.len()),
        }
    }
}

/// Everything needed to reach and pay for one execution environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    /// RPC endpoint; `None` for the in-process simulation
    pub url: Option<String>,
    pub chain_id: u64,
    pub accounts: AccountSource,
    /// `None` means the framework estimates it
    pub gas_price: Option<u64>,
    /// `None` means the framework estimates it
    pub gas: Option<u64>,
    pub live: bool,
}

impl NetworkProfile {
    fn celo(network: CeloNetwork, gas: u64, accounts: &AccountSource) -> Self {
        Self {
            name: network.as_str().to_string(),
            url: Some(network.forno_url().to_string()),
            chain_id: network.chain_id(),
            accounts: accounts.clone(),
            gas_price: Some(CELO_GAS_PRICE),
            gas: Some(gas),
            live: true,
        }
    }

    fn local(accounts: &AccountSource) -> Self {
        Self {
            name: LOCAL_NETWORK.to_string(),
            url: None,
            chain_id: LOCAL_CHAIN_ID,
            accounts: accounts.clone(),
            gas_price: None,
            gas: None,
            live: false,
        }
    }

    /// True for the in-process simulation and a locally running node
    pub fn is_local(&self) -> bool {
        self.name == LOCAL_NETWORK || self.name == "localhost"
    }
}

/// Named network profiles plus the default selection
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    profiles: BTreeMap<String, NetworkProfile>,
    default: String,
}

impl NetworkRegistry {
    /// The declared networks: `mainnet`, `alfajores` and `hardhat` (default).
    pub fn builtin(accounts: &AccountSource) -> Self {
        let mut profiles = BTreeMap::new();
        for profile in [
            NetworkProfile::celo(CeloNetwork::Mainnet, 10_000_000, accounts),
            NetworkProfile::celo(CeloNetwork::Alfajores, 8_000_000, accounts),
            NetworkProfile::local(accounts),
        ] {
            profiles.insert(profile.name.clone(), profile);
        }
        Self {
            profiles,
            default: LOCAL_NETWORK.to_string(),
        }
    }

    /// Add or replace a profile, keeping chain ids unique.
    pub fn insert(&mut self, profile: NetworkProfile) -> Result<(), ConfigError> {
        if profile.name == LOCAL_NETWORK && profile.chain_id != LOCAL_CHAIN_ID {
            return Err(ConfigError::ValidationError(format!(
                "{LOCAL_NETWORK} chain id is fixed at {LOCAL_CHAIN_ID}, got {}",
                profile.chain_id
            )));
        }
        if let Some(other) = self
            .profiles
            .values()
            .find(|p| p.chain_id == profile.chain_id && p.name != profile.name)
        {
            return Err(ConfigError::DuplicateChainId {
                chain_id: profile.chain_id,
                existing: other.name.clone(),
                added: profile.name,
            });
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.profiles.contains_key(name) {
            return Err(ConfigError::UnknownNetwork(name.to_string()));
        }
        self.default = name.to_string();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&NetworkProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn default_profile(&self) -> &NetworkProfile {
        // set_default only ever stores registered names
        &self.profiles[&self.default]
    }

    /// Profiles ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> AccountSource {
        AccountSource::Mnemonic(HdAccounts::new(
            "test test test test test test test test test test test junk",
        ))
    }

    #[test]
    fn test_celo_network_from_str() {
        assert_eq!("mainnet".parse::<CeloNetwork>().unwrap(), CeloNetwork::Mainnet);
        assert_eq!("ALFAJORES".parse::<CeloNetwork>().unwrap(), CeloNetwork::Alfajores);
        assert!("ropsten".parse::<CeloNetwork>().is_err());
    }

    #[test]
    fn test_celo_chain_ids() {
        assert_eq!(CeloNetwork::Mainnet.chain_id(), 42220);
        assert_eq!(CeloNetwork::Alfajores.chain_id(), 44787);
        assert_eq!(CeloNetwork::Baklava.chain_id(), 62320);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = NetworkRegistry::builtin(&accounts());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.default_name(), "hardhat");

        let mainnet = registry.get("mainnet").unwrap();
        assert_eq!(mainnet.url.as_deref(), Some("https://forno.celo.org"));
        assert_eq!(mainnet.gas_price, Some(500_000_000));
        assert_eq!(mainnet.gas, Some(10_000_000));
        assert!(mainnet.live);

        let alfajores = registry.get("alfajores").unwrap();
        assert_eq!(alfajores.chain_id, 44787);
        assert_eq!(alfajores.gas, Some(8_000_000));

        let local = registry.default_profile();
        assert_eq!(local.chain_id, 31337);
        assert!(local.url.is_none());
        assert!(!local.live);
        assert!(local.is_local());
    }

    #[test]
    fn test_iter_is_sorted_by_name() {
        let registry = NetworkRegistry::builtin(&accounts());
        let names: Vec<_> = registry.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alfajores", "hardhat", "mainnet"]);
    }

    #[test]
    fn test_duplicate_chain_id_rejected() {
        let mut registry = NetworkRegistry::builtin(&accounts());
        let mut clone = registry.get("alfajores").unwrap().clone();
        clone.name = "alfajores-2".to_string();
        let err = registry.insert(clone).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateChainId { chain_id: 44787, .. }));
    }

    #[test]
    fn test_replacing_profile_keeps_its_chain_id() {
        let mut registry = NetworkRegistry::builtin(&accounts());
        let mut mainnet = registry.get("mainnet").unwrap().clone();
        mainnet.gas = Some(12_000_000);
        registry.insert(mainnet).unwrap();
        assert_eq!(registry.get("mainnet").unwrap().gas, Some(12_000_000));
    }

    #[test]
    fn test_local_chain_id_is_fixed() {
        let mut registry = NetworkRegistry::builtin(&accounts());
        let mut local = registry.get("hardhat").unwrap().clone();
        local.chain_id = 1337;
        assert!(registry.insert(local).is_err());
        assert_eq!(registry.get("hardhat").unwrap().chain_id, 31337);
    }

    #[test]
    fn test_set_default_requires_known_network() {
        let mut registry = NetworkRegistry::builtin(&accounts());
        assert!(registry.set_default("goerli").is_err());
        registry.set_default("alfajores").unwrap();
        assert_eq!(registry.default_profile().name, "alfajores");
    }

    #[test]
    fn test_describe_hides_mnemonic() {
        let description = accounts().describe();
        assert!(!description.contains("junk"));
        assert_eq!(
            AccountSource::Keys(vec!["0xabc".into(), "0xdef".into()]).describe(),
            "2 explicit keys"
        );
    }
}
