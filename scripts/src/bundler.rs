//! A JSON-RPC client for the ERC-4337 bundler and its paymaster

use std::time::Duration;

use alloy::{
    primitives::{Address, B256},
    rpc::client::RpcClient,
};
use serde_json::json;
use smart_account_abi::user_operation::{
    GasEstimate, SponsorResult, UserOperation, UserOperationReceipt,
};
use tracing::debug;

use crate::{
    constants::{PAYMASTER_POLICY, RECEIPT_POLL_ATTEMPTS, RECEIPT_POLL_INTERVAL},
    errors::ScriptError,
    utils::authenticated_rpc_client,
};

/// The bundler method that sponsors an operation through the paymaster
const SPONSOR_METHOD: &str = "pm_sponsorUserOperation";
/// The bundler method that estimates an operation's gas limits
const ESTIMATE_GAS_METHOD: &str = "eth_estimateUserOperationGas";
/// The bundler method that submits an operation
const SEND_METHOD: &str = "eth_sendUserOperation";
/// The bundler method that fetches an operation's receipt
const RECEIPT_METHOD: &str = "eth_getUserOperationReceipt";

/// A client for a bundler serving a single entry point
#[derive(Clone)]
pub struct BundlerClient {
    /// The JSON-RPC client
    client: RpcClient,
    /// The entry point operations are submitted to
    entry_point: Address,
    /// The delay between receipt polls
    poll_interval: Duration,
    /// The number of receipt polls before giving up
    poll_attempts: usize,
}

impl BundlerClient {
    /// Create a client for the bundler at `url`
    pub fn new(url: &str, secret_key: &str, entry_point: Address) -> Result<Self, ScriptError> {
        let client = authenticated_rpc_client(url, Some(secret_key))?;
        Ok(Self::with_client(client, entry_point))
    }

    /// Create a client over an existing JSON-RPC client
    pub fn with_client(client: RpcClient, entry_point: Address) -> Self {
        Self {
            client,
            entry_point,
            poll_interval: RECEIPT_POLL_INTERVAL,
            poll_attempts: RECEIPT_POLL_ATTEMPTS,
        }
    }

    /// Set how often, and how many times, to poll for a receipt
    pub fn with_polling(mut self, interval: Duration, attempts: usize) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    /// Ask the paymaster to sponsor the operation
    pub async fn sponsor(&self, op: &UserOperation) -> Result<SponsorResult, ScriptError> {
        let policy = json!({ "type": PAYMASTER_POLICY });
        self.client
            .request(SPONSOR_METHOD, (op.clone(), self.entry_point, policy))
            .await
            .map_err(|e| ScriptError::Relay(format!("{SPONSOR_METHOD}: {e}")))
    }

    /// Estimate the operation's gas limits
    pub async fn estimate_gas(&self, op: &UserOperation) -> Result<GasEstimate, ScriptError> {
        self.client
            .request(ESTIMATE_GAS_METHOD, (op.clone(), self.entry_point))
            .await
            .map_err(|e| ScriptError::Relay(format!("{ESTIMATE_GAS_METHOD}: {e}")))
    }

    /// Submit a signed operation, returning its hash
    pub async fn send(&self, op: &UserOperation) -> Result<B256, ScriptError> {
        let op_hash: B256 = self
            .client
            .request(SEND_METHOD, (op.clone(), self.entry_point))
            .await
            .map_err(|e| ScriptError::Relay(format!("{SEND_METHOD}: {e}")))?;

        debug!(%op_hash, sender = %op.sender, "submitted user operation");
        Ok(op_hash)
    }

    /// Fetch the receipt of an operation, if it has been included
    pub async fn receipt(&self, op_hash: B256) -> Result<Option<UserOperationReceipt>, ScriptError> {
        self.client
            .request(RECEIPT_METHOD, (op_hash,))
            .await
            .map_err(|e| ScriptError::Relay(format!("{RECEIPT_METHOD}: {e}")))
    }

    /// Poll for the receipt of an operation until it is included
    pub async fn wait_for_receipt(&self, op_hash: B256) -> Result<UserOperationReceipt, ScriptError> {
        for attempt in 0..self.poll_attempts {
            if let Some(receipt) = self.receipt(op_hash).await? {
                return Ok(receipt);
            }

            debug!(%op_hash, attempt, "user operation not yet included");
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ScriptError::Relay(format!(
            "no receipt for user operation {op_hash} after {} attempts",
            self.poll_attempts
        )))
    }
}
