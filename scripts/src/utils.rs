//! Utilities for the wallet scripts.

use std::{fs, path::Path, str::FromStr};

use alloy::{
    network::Ethereum,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::http::{
        reqwest::{self as transport_reqwest, Url},
        Http,
    },
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{constants::SECRET_KEY_HEADER, errors::ScriptError, wallet::LocalWallet};

/// The provider type used to talk to the chain
pub type RpcProvider = DynProvider<Ethereum>;

/// Build an HTTP client that attaches the API secret key, if given, to every request
pub fn authenticated_http_client(secret_key: Option<&str>) -> Result<reqwest::Client, ScriptError> {
    let mut headers = HeaderMap::new();
    if let Some(secret_key) = secret_key {
        let mut value = HeaderValue::from_str(secret_key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(SECRET_KEY_HEADER, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

/// Build the client of alloy's HTTP transport, attaching the API secret key,
/// if given, to every request.
///
/// The transport is pinned to its own `reqwest` version, so this client is
/// built through alloy's re-export rather than the workspace `reqwest`.
fn authenticated_transport_client(
    secret_key: Option<&str>,
) -> Result<transport_reqwest::Client, ScriptError> {
    let mut headers = transport_reqwest::header::HeaderMap::new();
    if let Some(secret_key) = secret_key {
        let mut value = transport_reqwest::header::HeaderValue::from_str(secret_key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(SECRET_KEY_HEADER, value);
    }

    transport_reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

/// Build a JSON-RPC client over an authenticated HTTP transport
pub fn authenticated_rpc_client(
    url: &str,
    secret_key: Option<&str>,
) -> Result<RpcClient, ScriptError> {
    let url = Url::parse(url).map_err(|e| ScriptError::Config(format!("{url}: {e}")))?;
    let http_client = authenticated_transport_client(secret_key)?;
    let transport = Http::with_client(http_client, url);
    let is_local = transport.guess_local();

    Ok(RpcClient::new(transport, is_local))
}

/// Sets up the provider with which to talk to the chain, signing transactions
/// with `wallet` if one is given.
///
/// Fails if the node's chain ID differs from `chain_id`.
pub async fn setup_client(
    rpc_url: &str,
    secret_key: Option<&str>,
    wallet: Option<&LocalWallet>,
    chain_id: u64,
) -> Result<RpcProvider, ScriptError> {
    let rpc_client = authenticated_rpc_client(rpc_url, secret_key)?;
    let provider = match wallet {
        Some(wallet) => DynProvider::new(
            ProviderBuilder::new()
                .wallet(wallet.signer().clone())
                .connect_client(rpc_client),
        ),
        None => DynProvider::new(ProviderBuilder::new().connect_client(rpc_client)),
    };

    verify_chain_id(&provider, chain_id).await?;
    debug!(chain_id, "connected to RPC endpoint");
    Ok(provider)
}

/// Fail with `Config` if the node behind `provider` serves a chain other than
/// `chain_id`
pub async fn verify_chain_id(provider: &RpcProvider, chain_id: u64) -> Result<(), ScriptError> {
    let node_chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    if node_chain_id != chain_id {
        return Err(ScriptError::Config(format!(
            "RPC endpoint serves chain {node_chain_id}, expected chain {chain_id}"
        )));
    }

    Ok(())
}

/// A provider answering from the responses queued on `asserter`
#[cfg(test)]
pub(crate) fn mocked_provider(asserter: alloy::transports::mock::Asserter) -> RpcProvider {
    DynProvider::new(alloy::providers::RootProvider::<Ethereum>::new(RpcClient::mocked(asserter)))
}

/// Read an address from the deployments file
pub fn read_deployment(deployments_path: &Path, key: &str) -> Result<Address, ScriptError> {
    let content = fs::read_to_string(deployments_path).map_err(|e| {
        ScriptError::ReadFile(format!("{}: {}", deployments_path.display(), e))
    })?;
    let json: Value =
        serde_json::from_str(&content).map_err(|e| ScriptError::Serde(e.to_string()))?;

    let addr_str = json.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
        ScriptError::ReadFile(format!(
            "key {} not found in {}",
            key,
            deployments_path.display()
        ))
    })?;

    Address::from_str(addr_str)
        .map_err(|e| ScriptError::ReadFile(format!("invalid address {addr_str}: {e}")))
}

/// Record a deployed address in the deployments file, creating the file if
/// it doesn't exist and preserving the other entries
pub fn write_deployment(
    deployments_path: &Path,
    key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    let mut deployments = if deployments_path.exists() {
        let content = fs::read_to_string(deployments_path)
            .map_err(|e| ScriptError::ReadFile(e.to_string()))?;
        serde_json::from_str::<Map<String, Value>>(&content)
            .map_err(|e| ScriptError::Serde(e.to_string()))?
    } else {
        Map::new()
    };

    deployments.insert(key.to_string(), Value::String(format!("{address:#x}")));

    let content = serde_json::to_string_pretty(&deployments)
        .map_err(|e| ScriptError::Serde(e.to_string()))?;
    fs::write(deployments_path, content).map_err(|e| ScriptError::WriteFile(e.to_string()))
}

#[cfg(test)]
mod tests {
    use alloy::transports::mock::Asserter;

    use super::*;

    #[test]
    fn test_deployments_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        let first = Address::repeat_byte(1);
        let second = Address::repeat_byte(2);

        write_deployment(&path, "first", first).unwrap();
        write_deployment(&path, "second", second).unwrap();

        assert_eq!(read_deployment(&path, "first").unwrap(), first);
        assert_eq!(read_deployment(&path, "second").unwrap(), second);
    }

    #[test]
    fn test_overwrite_deployment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");

        write_deployment(&path, "nft", Address::repeat_byte(1)).unwrap();
        write_deployment(&path, "nft", Address::repeat_byte(3)).unwrap();

        assert_eq!(read_deployment(&path, "nft").unwrap(), Address::repeat_byte(3));
    }

    #[test]
    fn test_missing_deployment_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        write_deployment(&path, "nft", Address::repeat_byte(1)).unwrap();

        assert!(matches!(
            read_deployment(&path, "token"),
            Err(ScriptError::ReadFile(_))
        ));
    }

    #[test]
    fn test_missing_deployments_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(
            read_deployment(&path, "nft"),
            Err(ScriptError::ReadFile(_))
        ));
    }

    #[test]
    fn test_rpc_client_rejects_bad_url() {
        assert!(matches!(
            authenticated_rpc_client("not a url", None),
            Err(ScriptError::Config(_))
        ));
    }

    #[test]
    fn test_rpc_client_carries_secret_key() {
        let client = authenticated_rpc_client("http://localhost:8545", Some("secret")).unwrap();
        assert!(client.is_local());

        assert!(matches!(
            authenticated_rpc_client("http://localhost:8545", Some("bad\nkey")),
            Err(ScriptError::ClientInitialization(_))
        ));
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_rejected() {
        let asserter = Asserter::new();
        let provider = mocked_provider(asserter.clone());

        asserter.push_success(&"0x1");
        assert!(matches!(
            verify_chain_id(&provider, 5).await,
            Err(ScriptError::Config(_))
        ));

        asserter.push_success(&"0x5");
        verify_chain_id(&provider, 5).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_node_is_client_error() {
        let asserter = Asserter::new();
        let provider = mocked_provider(asserter.clone());
        asserter.push_failure_msg("connection refused");

        assert!(matches!(
            verify_chain_id(&provider, 5).await,
            Err(ScriptError::ClientInitialization(_))
        ));
    }
}
