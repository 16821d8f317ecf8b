//! Constants used in the wallet scripts

use std::time::Duration;

/// The chain the scripts run on by default (Goerli)
pub const DEFAULT_CHAIN_ID: u64 = 5;

/// The default account factory contract
pub const DEFAULT_FACTORY_ADDRESS: &str = "0x5425683F8D635Ad0c80A4a166f8597C7DFA9b30F";

/// The default token drop contract claimed from
pub const DEFAULT_TOKEN_CONTRACT: &str = "0xc54414e0E2DBE7E9565B75EFdC495c7eD12D3823";

/// The environment variable holding the API secret key
pub const SECRET_KEY_ENV_VAR: &str = "THIRDWEB_SECRET_KEY";

/// The environment variable holding the deployer's private key
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// The header carrying the API secret key on every service request
pub const SECRET_KEY_HEADER: &str = "x-secret-key";

/// The default path of the admin wallet's encrypted keystore
pub const DEFAULT_WALLET_PATH: &str = "wallet.json";

/// The default password of the admin wallet's encrypted keystore
pub const DEFAULT_WALLET_PASSWORD: &str = "password";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The NFT drop contract key in the deployments file
pub const NFT_DROP_CONTRACT_KEY: &str = "nft_drop_contract";

/// The default storage upload endpoint
pub const DEFAULT_STORAGE_UPLOAD_URL: &str = "https://storage.thirdweb.com/ipfs/upload";

/// The URI scheme of content-addressed uploads
pub const IPFS_SCHEME: &str = "ipfs://";

/// The paymaster sponsorship policy requested for gasless operations
pub const PAYMASTER_POLICY: &str = "payg";

/// The interval between polls for a user operation receipt
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The number of polls for a user operation receipt before giving up
pub const RECEIPT_POLL_ATTEMPTS: usize = 60;

/// How long session keys and signed permission requests stay valid, in seconds
pub const SESSION_KEY_VALIDITY_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// The number of decimals of the chain's native currency
pub const NATIVE_DECIMALS: u8 = 18;

/// Build the default RPC URL for a chain
pub fn default_rpc_url(chain_id: u64) -> String {
    format!("https://{chain_id}.rpc.thirdweb.com")
}

/// Build the default bundler (and paymaster) URL for a chain
pub fn default_bundler_url(chain_id: u64) -> String {
    format!("https://{chain_id}.bundler.thirdweb.com")
}
