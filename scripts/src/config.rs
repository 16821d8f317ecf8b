//! Configuration of a smart account connection and its remote endpoints

use alloy::primitives::Address;
use smart_account_abi::user_operation::ENTRYPOINT_V06_ADDRESS;

use crate::{
    constants::{default_bundler_url, default_rpc_url},
    errors::ScriptError,
};

/// The immutable parameters of a smart account connection
#[derive(Clone)]
pub struct SmartAccountConfig {
    /// The chain the account lives on
    pub chain_id: u64,
    /// The factory that deploys the account
    pub factory_address: Address,
    /// The API secret key authenticating RPC, bundler, and paymaster requests
    pub secret_key: String,
    /// Whether user operations are sponsored by the paymaster
    pub gasless: bool,
    /// The chain's RPC endpoint
    pub rpc_url: String,
    /// The bundler (and paymaster) endpoint
    pub bundler_url: String,
    /// The ERC-4337 entry point
    pub entry_point: Address,
}

impl SmartAccountConfig {
    /// A configuration using the default endpoints for `chain_id`
    pub fn new(chain_id: u64, factory_address: Address, secret_key: String, gasless: bool) -> Self {
        Self {
            chain_id,
            factory_address,
            secret_key,
            gasless,
            rpc_url: default_rpc_url(chain_id),
            bundler_url: default_bundler_url(chain_id),
            entry_point: ENTRYPOINT_V06_ADDRESS,
        }
    }

    /// Override the RPC endpoint
    pub fn with_rpc_url(mut self, rpc_url: Option<String>) -> Self {
        if let Some(rpc_url) = rpc_url {
            self.rpc_url = rpc_url;
        }
        self
    }

    /// Override the bundler endpoint
    pub fn with_bundler_url(mut self, bundler_url: Option<String>) -> Self {
        if let Some(bundler_url) = bundler_url {
            self.bundler_url = bundler_url;
        }
        self
    }
}

/// Unwrap a credential read from the CLI or environment, failing if it is
/// absent or blank
pub fn require_secret(value: Option<String>, env_var: &str) -> Result<String, ScriptError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ScriptError::MissingCredential(format!("{env_var} is not set"))),
    }
}
