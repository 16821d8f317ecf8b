//! Definitions of CLI arguments and commands for the wallet scripts

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{
        account_info, claim, create_batch, create_session_key, deploy_nft_drop, list_signers,
        revoke_session_key, session_key_demo,
    },
    constants::{
        DEFAULT_CHAIN_ID, DEFAULT_DEPLOYMENTS_PATH, DEFAULT_FACTORY_ADDRESS,
        DEFAULT_TOKEN_CONTRACT, DEFAULT_WALLET_PASSWORD, DEFAULT_WALLET_PATH,
        PRIVATE_KEY_ENV_VAR, SECRET_KEY_ENV_VAR,
    },
    errors::ScriptError,
};

/// Smart account and NFT drop scripts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Network and service options shared by every command
    #[command(flatten)]
    pub network: NetworkArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Network and service options
#[derive(Args, Clone)]
pub struct NetworkArgs {
    /// API secret key authenticating RPC, bundler, paymaster, and storage requests
    #[arg(long, env = SECRET_KEY_ENV_VAR, hide_env_values = true, global = true)]
    pub secret_key: Option<String>,

    /// The chain to run on
    #[arg(long, env = "CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID, global = true)]
    pub chain_id: u64,

    /// Network RPC URL, derived from the chain ID if absent
    #[arg(short, long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Bundler and paymaster URL, derived from the chain ID if absent
    #[arg(long, env = "BUNDLER_URL", global = true)]
    pub bundler_url: Option<String>,

    /// Path to the file in which deployed addresses are recorded
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH, global = true)]
    pub deployments_path: PathBuf,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Show the admin's smart account and its balances
    AccountInfo(AccountInfoArgs),
    /// Claim tokens from a drop into the admin's smart account
    Claim(ClaimArgs),
    /// Authorize a session key on the admin's smart account
    CreateSessionKey(CreateSessionKeyArgs),
    /// List the active signers of the admin's smart account
    ListSigners(AccountArgs),
    /// Revoke a session key from the admin's smart account
    RevokeSessionKey(RevokeSessionKeyArgs),
    /// Claim as admin, then create, use, and revoke a session key
    SessionKeyDemo(ClaimArgs),
    /// Deploy an NFT drop collection
    DeployNftDrop(DeployNftDropArgs),
    /// Upload and lazy mint a batch of NFTs on a drop
    CreateBatch(CreateBatchArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self, network: NetworkArgs) -> Result<(), ScriptError> {
        match self {
            Command::AccountInfo(args) => account_info(args, &network).await,
            Command::Claim(args) => claim(args, &network).await,
            Command::CreateSessionKey(args) => create_session_key(args, &network).await,
            Command::ListSigners(args) => list_signers(args, &network).await,
            Command::RevokeSessionKey(args) => revoke_session_key(args, &network).await,
            Command::SessionKeyDemo(args) => session_key_demo(args, &network).await,
            Command::DeployNftDrop(args) => deploy_nft_drop(args, &network).await,
            Command::CreateBatch(args) => create_batch(args, &network).await,
        }
    }
}

/// Options selecting the admin wallet and its smart account
#[derive(Args, Clone)]
pub struct AccountArgs {
    /// The factory deploying the smart account
    #[arg(long, default_value = DEFAULT_FACTORY_ADDRESS)]
    pub factory: Address,

    /// Path to the admin wallet's encrypted keystore, created if absent
    #[arg(short, long, default_value = DEFAULT_WALLET_PATH)]
    pub wallet: PathBuf,

    /// Password of the admin wallet's keystore
    #[arg(
        long,
        env = "WALLET_PASSWORD",
        default_value = DEFAULT_WALLET_PASSWORD,
        hide_env_values = true
    )]
    pub wallet_password: String,

    /// Pay gas from the smart account instead of through the paymaster
    #[arg(long)]
    pub no_gasless: bool,
}

/// Show the admin's smart account
#[derive(Args)]
pub struct AccountInfoArgs {
    /// The admin's smart account
    #[command(flatten)]
    pub account: AccountArgs,

    /// A token whose balance to show
    #[arg(short, long, default_value = DEFAULT_TOKEN_CONTRACT)]
    pub token: Address,
}

/// Claim tokens from a drop
#[derive(Args)]
pub struct ClaimArgs {
    /// The admin's smart account
    #[command(flatten)]
    pub account: AccountArgs,

    /// The token drop to claim from
    #[arg(short, long, default_value = DEFAULT_TOKEN_CONTRACT)]
    pub token: Address,

    /// The number of whole tokens to claim
    #[arg(short, long, default_value_t = 1)]
    pub quantity: u64,
}

/// Authorize a session key
#[derive(Args)]
pub struct CreateSessionKeyArgs {
    /// The admin's smart account
    #[command(flatten)]
    pub account: AccountArgs,

    /// The address of the session key
    #[arg(short, long)]
    pub session_key: Address,

    /// A contract the session key may call, repeatable
    #[arg(long = "target", default_value = DEFAULT_TOKEN_CONTRACT)]
    pub approved_targets: Vec<Address>,
}

/// Revoke a session key
#[derive(Args)]
pub struct RevokeSessionKeyArgs {
    /// The admin's smart account
    #[command(flatten)]
    pub account: AccountArgs,

    /// The address of the session key
    #[arg(short, long)]
    pub session_key: Address,
}

/// Deploy an NFT drop collection
#[derive(Args)]
pub struct DeployNftDropArgs {
    /// Private key of the deployer, who becomes the collection admin
    #[arg(long = "pkey", env = PRIVATE_KEY_ENV_VAR, hide_env_values = true)]
    pub private_key: Option<String>,

    /// The clone factory deploying the collection
    #[arg(long)]
    pub clone_factory: Address,

    /// The NFT drop implementation to clone
    #[arg(long)]
    pub implementation: Address,

    /// The collection name
    #[arg(short, long)]
    pub name: String,

    /// The collection symbol
    #[arg(long, default_value = "")]
    pub symbol: String,

    /// The collection description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Royalty on secondary sales, in basis points
    #[arg(long, default_value_t = 0)]
    pub royalty_bps: u128,

    /// Recipient of primary sales, the deployer if absent
    #[arg(long)]
    pub sale_recipient: Option<Address>,
}

/// Upload and lazy mint a batch of NFTs
#[derive(Args)]
pub struct CreateBatchArgs {
    /// Private key of a collection minter
    #[arg(long = "pkey", env = PRIVATE_KEY_ENV_VAR, hide_env_values = true)]
    pub private_key: Option<String>,

    /// The NFT drop, read from the deployments file if absent
    #[arg(short, long)]
    pub contract: Option<Address>,

    /// Path to the batch manifest: a JSON array of `{name, description, image}`
    #[arg(short, long)]
    pub manifest: PathBuf,
}
