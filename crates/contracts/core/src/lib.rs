#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, contracttype, panic_with_error, Env};

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Amount,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
}

/// Example contract deployed by the test harness: stores one amount at
/// deployment and exposes it through a single getter.
#[contract]
pub struct Contract;

#[contractimpl]
impl Contract {
    /// Store the amount passed at deployment.
    pub fn __constructor(env: Env, amount: u64) {
        env.storage().instance().set(&DataKey::Amount, &amount);
    }

    /// Read the stored amount.
    pub fn get_amount(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::Amount)
            .unwrap_or_else(|| panic_with_error!(&env, ContractError::NotInitialized))
    }
}

#[cfg(test)]
extern crate std;
