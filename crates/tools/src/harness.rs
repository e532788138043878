//! Deploy-and-assert scenario run by the `test` task.
//!
//! The scenario deploys `Contract` with a fixed constructor amount and
//! checks the getter returns it. Deployment failures and mismatches both end
//! the scenario with a single [`HarnessError`]; nothing is retried.

use nodelaunch_contract::{Contract, ContractClient};
use soroban_sdk::testutils::EnvTestConfig;
use soroban_sdk::{Address, Env};
use thiserror::Error;
use tracing::{info, instrument};

use crate::network::NetworkProfile;

/// Constructor argument of the default scenario
pub const SCENARIO_AMOUNT: u64 = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HarnessError {
    #[error("Deployment failed: {0}")]
    Deploy(String),

    #[error("Contract call failed: {0}")]
    Call(String),

    #[error("getAmount returned {actual}, expected {expected}")]
    Mismatch { expected: u64, actual: u64 },

    #[error(
        "Network {0} is not an in-process network; \
         remote deployment is handled by the contract toolchain"
    )]
    UnsupportedNetwork(String),
}

/// A deployed instance of the example contract
pub trait DeployedContract {
    fn address(&self) -> String;
    fn get_amount(&self) -> Result<u64, HarnessError>;
}

/// Deploys instances of the example contract on one network
pub trait ContractFactory {
    fn network(&self) -> &str;
    fn deploy(&self, initial_amount: u64) -> Result<Box<dyn DeployedContract>, HarnessError>;
}

/// In-process simulation backing the `hardhat` network
pub struct LocalSimulation {
    network: String,
    env: Env,
}

impl LocalSimulation {
    pub fn new() -> Self {
        Self {
            network: crate::network::LOCAL_NETWORK.to_string(),
            env: Env::new_with_config(EnvTestConfig {
                capture_snapshot_at_drop: false,
            }),
        }
    }

    /// Only profiles without an RPC endpoint run in-process. A profile with a
    /// URL names a real node, even a local one, and is never simulated.
    pub fn for_profile(profile: &NetworkProfile) -> Result<Self, HarnessError> {
        if profile.live || profile.url.is_some() {
            return Err(HarnessError::UnsupportedNetwork(profile.name.clone()));
        }
        let mut simulation = Self::new();
        simulation.network = profile.name.clone();
        Ok(simulation)
    }
}

impl Default for LocalSimulation {
    fn default() -> Self {
        Self::new()
    }
}

struct LocalInstance {
    env: Env,
    id: Address,
}

impl DeployedContract for LocalInstance {
    fn address(&self) -> String {
        format!("{:?}", self.id)
    }

    fn get_amount(&self) -> Result<u64, HarnessError> {
        let client = ContractClient::new(&self.env, &self.id);
        match client.try_get_amount() {
            Ok(Ok(amount)) => Ok(amount),
            Ok(Err(err)) => Err(HarnessError::Call(format!("{err:?}"))),
            Err(err) => Err(HarnessError::Call(format!("{err:?}"))),
        }
    }
}

impl ContractFactory for LocalSimulation {
    fn network(&self) -> &str {
        &self.network
    }

    fn deploy(&self, initial_amount: u64) -> Result<Box<dyn DeployedContract>, HarnessError> {
        let id = self.env.register(Contract, (initial_amount,));
        Ok(Box::new(LocalInstance {
            env: self.env.clone(),
            id,
        }))
    }
}

/// Outcome of a passing scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub network: String,
    pub address: String,
    pub amount: u64,
}

/// Deploy with `amount`, then require the getter to return it.
#[instrument(skip(factory), fields(network = factory.network()))]
pub fn run_scenario(
    factory: &dyn ContractFactory,
    amount: u64,
) -> Result<ScenarioReport, HarnessError> {
    let contract = factory.deploy(amount)?;
    let address = contract.address();
    info!(%address, "contract deployed");

    let actual = contract.get_amount()?;
    if actual != amount {
        return Err(HarnessError::Mismatch {
            expected: amount,
            actual,
        });
    }
    info!(amount = actual, "getAmount matches constructor argument");

    Ok(ScenarioReport {
        network: factory.network().to_string(),
        address,
        amount: actual,
    })
}

/// The project's scenario: constructor argument 10.
pub fn run_default_scenario(
    factory: &dyn ContractFactory,
) -> Result<ScenarioReport, HarnessError> {
    run_scenario(factory, SCENARIO_AMOUNT)
}
