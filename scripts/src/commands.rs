//! Implementations of the wallet scripts

use alloy::primitives::{utils::format_units, Address};
use tracing::{error, info};

use crate::{
    cli::{
        AccountArgs, AccountInfoArgs, ClaimArgs, CreateBatchArgs, CreateSessionKeyArgs,
        DeployNftDropArgs, NetworkArgs, RevokeSessionKeyArgs,
    },
    config::{require_secret, SmartAccountConfig},
    constants::{
        default_rpc_url, NATIVE_DECIMALS, NFT_DROP_CONTRACT_KEY, PRIVATE_KEY_ENV_VAR,
        SECRET_KEY_ENV_VAR,
    },
    errors::ScriptError,
    nft::{self, read_manifest, CollectionParams},
    smart_account::SmartAccount,
    storage::ThirdwebStorage,
    token::{claim_erc20, token_balance},
    utils::{read_deployment, setup_client, write_deployment, RpcProvider},
    wallet::LocalWallet,
};

/// Show the admin's smart account with its native and token balances
pub async fn account_info(args: AccountInfoArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    let account = connect_admin(&args.account, network).await?;
    log_account(&account).await?;

    let balance = token_balance(account.provider(), args.token, account.address()).await?;
    info!("Token balance: {balance}");
    Ok(())
}

/// Claim tokens into the admin's smart account
pub async fn claim(args: ClaimArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    let mut account = connect_admin(&args.account, network).await?;
    log_account(&account).await?;

    claim_and_report(&mut account, args.token, args.quantity).await
}

/// Authorize a session key on the admin's smart account
pub async fn create_session_key(
    args: CreateSessionKeyArgs,
    network: &NetworkArgs,
) -> Result<(), ScriptError> {
    let mut account = connect_admin(&args.account, network).await?;

    info!("Creating session key: {:#x}", args.session_key);
    let receipt = account
        .create_session_key(args.session_key, args.approved_targets)
        .await?;
    info!("Session key created, tx hash: {:#x}", receipt.receipt.transaction_hash);

    report_signers(&account).await
}

/// List the active signers of the admin's smart account
pub async fn list_signers(args: AccountArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    let account = connect_admin(&args, network).await?;
    let signers = account.all_active_signers().await?;

    info!("Active signers: {}", signers.len());
    for signer in signers {
        if signer.is_admin {
            info!("\t{:#x} (admin)", signer.signer);
        } else {
            info!(
                "\t{:#x} (session, expires at {}, targets: {:?})",
                signer.signer,
                signer.expires_at.unwrap_or_default(),
                signer.approved_targets
            );
        }
    }

    Ok(())
}

/// Revoke a session key from the admin's smart account
pub async fn revoke_session_key(
    args: RevokeSessionKeyArgs,
    network: &NetworkArgs,
) -> Result<(), ScriptError> {
    let mut account = connect_admin(&args.account, network).await?;

    info!("Revoking session key: {:#x}", args.session_key);
    let receipt = account.revoke_session_key(args.session_key).await?;
    info!("Session key revoked, tx hash: {:#x}", receipt.receipt.transaction_hash);

    report_signers(&account).await
}

/// Claim with the admin key, then create a session key scoped to the token,
/// claim with it, and revoke it
pub async fn session_key_demo(args: ClaimArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    info!(
        "Running on chain {} with factory {:#x}",
        network.chain_id, args.account.factory
    );

    let mut admin_account = connect_admin(&args.account, network).await?;
    log_account(&admin_account).await?;

    info!("Claiming using admin key");
    claim_and_report(&mut admin_account, args.token, args.quantity).await?;

    session_key_round_trip(
        &mut admin_account,
        LocalWallet::generate(),
        args.token,
        args.quantity,
    )
    .await
}
/// Deploy an NFT drop and record it in the deployments file
pub async fn deploy_nft_drop(
    args: DeployNftDropArgs,
    network: &NetworkArgs,
) -> Result<(), ScriptError> {
    let secret_key = require_secret(network.secret_key.clone(), SECRET_KEY_ENV_VAR)?;
    let (wallet, provider) = connect_deployer(args.private_key, &secret_key, network).await?;
    let storage = ThirdwebStorage::new(&secret_key)?;

    let params = CollectionParams {
        name: args.name,
        symbol: args.symbol,
        description: args.description,
        primary_sale_recipient: args.sale_recipient.unwrap_or(wallet.address()),
        royalty_bps: args.royalty_bps,
    };

    info!("Deploying NFT drop \"{}\" from {:#x}", params.name, wallet.address());
    let address = nft::deploy_nft_drop(
        &provider,
        &storage,
        args.clone_factory,
        args.implementation,
        wallet.address(),
        &params,
    )
    .await?;

    write_deployment(&network.deployments_path, NFT_DROP_CONTRACT_KEY, address)?;
    info!("NFT drop deployed at {address:#x}");
    Ok(())
}

/// Upload a batch of NFTs from a manifest and lazy mint it
pub async fn create_batch(args: CreateBatchArgs, network: &NetworkArgs) -> Result<(), ScriptError> {
    let secret_key = require_secret(network.secret_key.clone(), SECRET_KEY_ENV_VAR)?;
    let contract = match args.contract {
        Some(contract) => contract,
        None => read_deployment(&network.deployments_path, NFT_DROP_CONTRACT_KEY)?,
    };
    let inputs = read_manifest(&args.manifest)?;

    let (_, provider) = connect_deployer(args.private_key, &secret_key, network).await?;
    let storage = ThirdwebStorage::new(&secret_key)?;

    info!("Creating batch of {} NFTs on {contract:#x}", inputs.len());
    let batch = nft::create_batch(&provider, &storage, contract, inputs).await?;
    info!(
        "Created tokens {} to {} with base URI {}",
        batch.start_token_id, batch.end_token_id, batch.base_uri
    );
    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Build the smart account configuration, failing if the secret key is absent
fn account_config(
    account: &AccountArgs,
    network: &NetworkArgs,
) -> Result<SmartAccountConfig, ScriptError> {
    let secret_key = require_secret(network.secret_key.clone(), SECRET_KEY_ENV_VAR)?;
    Ok(
        SmartAccountConfig::new(network.chain_id, account.factory, secret_key, !account.no_gasless)
            .with_rpc_url(network.rpc_url.clone())
            .with_bundler_url(network.bundler_url.clone()),
    )
}

/// Load or create the admin wallet and connect its smart account
async fn connect_admin(
    account: &AccountArgs,
    network: &NetworkArgs,
) -> Result<SmartAccount, ScriptError> {
    let config = account_config(account, network)?;
    let wallet = LocalWallet::load_or_create(&account.wallet, &account.wallet_password)?;
    info!("Admin wallet address: {:#x}", wallet.address());

    SmartAccount::connect(config, wallet, None /* account_address */).await
}

/// Load the deployer's wallet from its private key and connect a signing provider
async fn connect_deployer(
    private_key: Option<String>,
    secret_key: &str,
    network: &NetworkArgs,
) -> Result<(LocalWallet, RpcProvider), ScriptError> {
    let private_key = require_secret(private_key, PRIVATE_KEY_ENV_VAR)?;
    let wallet = LocalWallet::from_private_key(&private_key)?;

    let rpc_url = network
        .rpc_url
        .clone()
        .unwrap_or_else(|| default_rpc_url(network.chain_id));
    let provider = setup_client(&rpc_url, Some(secret_key), Some(&wallet), network.chain_id).await?;

    Ok((wallet, provider))
}

/// Log the smart account's address and native balance
async fn log_account(account: &SmartAccount) -> Result<(), ScriptError> {
    let balance = account.native_balance().await?;
    let balance = format_units(balance, NATIVE_DECIMALS)
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    info!("Smart account address: {:#x}", account.address());
    info!("Balance: {balance}");
    Ok(())
}

/// Claim tokens into the account and log the resulting balance
async fn claim_and_report(
    account: &mut SmartAccount,
    token: Address,
    quantity: u64,
) -> Result<(), ScriptError> {
    let receipt = claim_erc20(account, token, quantity).await?;
    info!(
        "Claimed {quantity} tokens, tx hash: {:#x}",
        receipt.receipt.transaction_hash
    );

    let balance = token_balance(account.provider(), token, account.address()).await?;
    info!("Token balance: {balance}");
    Ok(())
}

/// Authorize `session_wallet` on the admin's account for `token`, claim with
/// it, and revoke it.
///
/// A failed session claim is logged, the key is revoked regardless.
async fn session_key_round_trip(
    admin_account: &mut SmartAccount,
    session_wallet: LocalWallet,
    token: Address,
    quantity: u64,
) -> Result<(), ScriptError> {
    let session_key = session_wallet.address();
    info!("Creating session key: {session_key:#x}");
    admin_account.create_session_key(session_key, vec![token]).await?;
    report_signers(admin_account).await?;

    info!("Claiming using session key");
    let session_claim = async {
        let mut session_account = SmartAccount::with_clients(
            admin_account.config().clone(),
            session_wallet,
            admin_account.provider().clone(),
            admin_account.bundler().clone(),
            Some(admin_account.address()),
        )
        .await?;
        claim_and_report(&mut session_account, token, quantity).await
    };
    if let Err(e) = session_claim.await {
        error!("Session key claim failed: {e}");
    }

    info!("Revoking session key: {session_key:#x}");
    admin_account.revoke_session_key(session_key).await?;
    report_signers(admin_account).await
}

/// Log the number of active signers on the account
async fn report_signers(account: &SmartAccount) -> Result<(), ScriptError> {
    let signers = account.all_active_signers().await?;
    info!("Active signers: {}", signers.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Bytes, B256},
        sol_types::SolValue,
        transports::mock::Asserter,
    };
    use smart_account_abi::account::SignerPermissions;

    use super::*;
    use crate::{
        bundler::tests::{mocked_bundler, receipt},
        smart_account::tests::{gas_estimate, push_pricing, test_config},
        utils::mocked_provider,
    };

    /// Queue a user operation that is estimated, sent, and included
    fn push_included_operation(bundler: &Asserter, op_hash: B256) {
        bundler.push_success(&gas_estimate());
        bundler.push_success(&op_hash);
        bundler.push_success(&receipt(op_hash, true, None));
    }

    /// Queue the signer listing of an account administered by `admin` alone
    fn push_signers(provider: &Asserter, admin: Address) {
        provider.push_success(&Bytes::from((vec![admin],).abi_encode_params()));
        provider.push_success(&Bytes::from(
            (Vec::<SignerPermissions>::new(),).abi_encode_params(),
        ));
    }

    #[tokio::test]
    async fn test_session_key_revoked_after_failed_claim() {
        let provider = Asserter::new();
        let bundler = Asserter::new();
        let account_address = Address::repeat_byte(0xac);
        let deployed_code = Bytes::from(vec![0x60, 0x00]);

        let admin_wallet = LocalWallet::generate();
        let admin = admin_wallet.address();
        provider.push_success(&Bytes::from(account_address.abi_encode()));
        provider.push_success(&deployed_code);
        let mut admin_account = SmartAccount::with_clients(
            test_config(false /* gasless */),
            admin_wallet,
            mocked_provider(provider.clone()),
            mocked_bundler(bundler.clone(), 1),
            None, /* account_address */
        )
        .await
        .unwrap();

        // Session key creation
        push_pricing(&provider);
        push_included_operation(&bundler, B256::repeat_byte(1));
        push_signers(&provider, admin);

        // Session account connection, then a claim failing on its first read
        provider.push_success(&deployed_code);
        provider.push_failure_msg("execution reverted");

        // Revocation
        push_pricing(&provider);
        push_included_operation(&bundler, B256::repeat_byte(2));
        push_signers(&provider, admin);

        session_key_round_trip(
            &mut admin_account,
            LocalWallet::generate(),
            Address::repeat_byte(0x70),
            1, /* quantity */
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_failed_session_key_creation_aborts() {
        let provider = Asserter::new();
        let bundler = Asserter::new();
        let account_address = Address::repeat_byte(0xac);

        provider.push_success(&Bytes::from(account_address.abi_encode()));
        provider.push_success(&Bytes::from(vec![0x60, 0x00]));
        let mut admin_account = SmartAccount::with_clients(
            test_config(false /* gasless */),
            LocalWallet::generate(),
            mocked_provider(provider.clone()),
            mocked_bundler(bundler.clone(), 1),
            None, /* account_address */
        )
        .await
        .unwrap();

        push_pricing(&provider);
        bundler.push_failure_msg("AA23 reverted");

        let res = session_key_round_trip(
            &mut admin_account,
            LocalWallet::generate(),
            Address::repeat_byte(0x70),
            1, /* quantity */
        )
        .await;
        assert!(matches!(res, Err(ScriptError::Relay(_))));
    }
}
