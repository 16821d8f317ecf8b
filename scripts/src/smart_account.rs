//! A smart account controlled by a local wallet, transacting through
//! ERC-4337 user operations

use alloy::{
    primitives::{aliases::U192, Address, Bytes, U256},
    providers::Provider,
    signers::SignerSync,
    sol_types::SolCall,
};
use chrono::Utc;
use itertools::Itertools;
use smart_account_abi::{
    account::{IAccount, IAccountFactory, SignerPermissionRequest, SignerPermissions},
    user_operation::{init_code, IEntryPoint, UserOperation, UserOperationReceipt},
};
use tracing::{debug, info};

use crate::{
    bundler::BundlerClient,
    config::SmartAccountConfig,
    constants::SESSION_KEY_VALIDITY_SECS,
    errors::ScriptError,
    utils::{setup_client, RpcProvider},
    wallet::LocalWallet,
};

/// A call made by the smart account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// The contract called
    pub target: Address,
    /// The native value sent with the call
    pub value: U256,
    /// The calldata
    pub data: Bytes,
}

impl Call {
    /// A call to `target` with the given value and calldata
    pub fn new(target: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            target,
            value,
            data: data.into(),
        }
    }
}

/// A signer allowed to act on behalf of the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSigner {
    /// The signer's address
    pub signer: Address,
    /// Whether the signer is an account admin
    pub is_admin: bool,
    /// The contracts a session signer may call; empty for admins
    pub approved_targets: Vec<Address>,
    /// When a session signer's permissions end; `None` for admins
    pub expires_at: Option<u128>,
}

impl ActiveSigner {
    /// An admin of the account
    pub fn admin(signer: Address) -> Self {
        Self {
            signer,
            is_admin: true,
            approved_targets: Vec::new(),
            expires_at: None,
        }
    }
}

impl From<SignerPermissions> for ActiveSigner {
    fn from(permissions: SignerPermissions) -> Self {
        Self {
            signer: permissions.signer,
            is_admin: false,
            approved_targets: permissions.approvedTargets,
            expires_at: Some(permissions.endTimestamp),
        }
    }
}

/// A connection to a smart account through one of its signers
pub struct SmartAccount {
    /// The connection parameters
    config: SmartAccountConfig,
    /// The wallet signing user operations
    personal_wallet: LocalWallet,
    /// The RPC provider
    provider: RpcProvider,
    /// The bundler relaying user operations
    bundler: BundlerClient,
    /// The account's address
    address: Address,
    /// The code deploying the account with its first operation; empty once deployed
    init_code: Bytes,
}

impl SmartAccount {
    /// Connect to a smart account with `personal_wallet` as its signer.
    ///
    /// Without an explicit `account_address`, the wallet is the account's admin
    /// and the account lives at the factory's counterfactual address, deployed
    /// along with its first user operation. With one, the account must already
    /// be deployed.
    pub async fn connect(
        config: SmartAccountConfig,
        personal_wallet: LocalWallet,
        account_address: Option<Address>,
    ) -> Result<Self, ScriptError> {
        let provider = setup_client(
            &config.rpc_url,
            Some(&config.secret_key),
            None, /* wallet */
            config.chain_id,
        )
        .await?;
        let bundler = BundlerClient::new(&config.bundler_url, &config.secret_key, config.entry_point)?;

        Self::with_clients(config, personal_wallet, provider, bundler, account_address).await
    }

    /// Connect to a smart account over an existing provider and bundler, as
    /// [`SmartAccount::connect`] does
    pub async fn with_clients(
        config: SmartAccountConfig,
        personal_wallet: LocalWallet,
        provider: RpcProvider,
        bundler: BundlerClient,
        account_address: Option<Address>,
    ) -> Result<Self, ScriptError> {
        let admin = personal_wallet.address();
        let address = match account_address {
            Some(address) => address,
            None => IAccountFactory::new(config.factory_address, provider.clone())
                .getAddress(admin, Bytes::new())
                .call()
                .await
                .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?,
        };

        let deployed = !provider
            .get_code_at(address)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .is_empty();

        let init_code = match (deployed, account_address) {
            (true, _) => Bytes::new(),
            (false, None) => account_init_code(config.factory_address, admin),
            (false, Some(_)) => {
                return Err(ScriptError::Config(format!(
                    "account {address:#x} is not deployed, connect with its admin wallet first"
                )))
            }
        };

        info!(
            account = %address,
            signer = %admin,
            deployed,
            gasless = config.gasless,
            "connected smart account"
        );
        Ok(Self {
            config,
            personal_wallet,
            provider,
            bundler,
            address,
            init_code,
        })
    }

    /// The account's address
    pub fn address(&self) -> Address {
        self.address
    }

    /// The address of the wallet signing for the account
    pub fn signer_address(&self) -> Address {
        self.personal_wallet.address()
    }

    /// Whether the account contract exists on chain
    pub fn is_deployed(&self) -> bool {
        self.init_code.is_empty()
    }

    /// The connection parameters
    pub fn config(&self) -> &SmartAccountConfig {
        &self.config
    }

    /// The RPC provider
    pub fn provider(&self) -> &RpcProvider {
        &self.provider
    }

    /// The bundler relaying the account's operations
    pub fn bundler(&self) -> &BundlerClient {
        &self.bundler
    }

    /// The account's native currency balance
    pub async fn native_balance(&self) -> Result<U256, ScriptError> {
        self.provider
            .get_balance(self.address)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    /// Execute a single call from the account
    pub async fn execute(&mut self, call: Call) -> Result<UserOperationReceipt, ScriptError> {
        self.execute_batch(vec![call]).await
    }

    /// Execute calls from the account atomically, in order
    pub async fn execute_batch(
        &mut self,
        calls: Vec<Call>,
    ) -> Result<UserOperationReceipt, ScriptError> {
        let call_data = encode_calls(calls)?;
        self.send_user_operation(call_data).await
    }

    /// Authorize `session_key` to call the approved targets through the account
    pub async fn create_session_key(
        &mut self,
        session_key: Address,
        approved_targets: Vec<Address>,
    ) -> Result<UserOperationReceipt, ScriptError> {
        let req = SignerPermissionRequest::grant(session_key, approved_targets, session_expiry());
        self.set_permissions(req).await
    }

    /// Remove every permission of `session_key`
    pub async fn revoke_session_key(
        &mut self,
        session_key: Address,
    ) -> Result<UserOperationReceipt, ScriptError> {
        let req = SignerPermissionRequest::revoke(session_key, session_expiry());
        self.set_permissions(req).await
    }

    /// The account's admins followed by its active session signers
    pub async fn all_active_signers(&self) -> Result<Vec<ActiveSigner>, ScriptError> {
        if !self.is_deployed() {
            return Ok(vec![ActiveSigner::admin(self.signer_address())]);
        }

        let account = IAccount::new(self.address, self.provider.clone());
        let admins = account
            .getAllAdmins()
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let sessions = account
            .getAllActiveSigners()
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(admins
            .into_iter()
            .map(ActiveSigner::admin)
            .chain(sessions.into_iter().map(ActiveSigner::from))
            .collect())
    }

    /// Sign a permission request as admin and apply it through the account
    async fn set_permissions(
        &mut self,
        req: SignerPermissionRequest,
    ) -> Result<UserOperationReceipt, ScriptError> {
        let signature = req
            .sign(self.config.chain_id, self.address, self.personal_wallet.signer())
            .map_err(|e| ScriptError::Wallet(e.to_string()))?;

        let data = IAccount::setPermissionsForSignerCall {
            _req: req,
            _signature: Bytes::copy_from_slice(&signature.as_bytes()),
        }
        .abi_encode();

        self.execute(Call::new(self.address, U256::ZERO, data)).await
    }

    /// Price, sign, and relay a user operation carrying `call_data`, waiting
    /// for it to be included
    async fn send_user_operation(
        &mut self,
        call_data: Bytes,
    ) -> Result<UserOperationReceipt, ScriptError> {
        let nonce = IEntryPoint::new(self.config.entry_point, self.provider.clone())
            .getNonce(self.address, U192::ZERO)
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        let mut op = UserOperation::new(self.address, nonce, self.init_code.clone(), call_data)
            .with_fees(fees.max_fee_per_gas, fees.max_priority_fee_per_gas);

        if self.config.gasless {
            let sponsored = self.bundler.sponsor(&op).await?;
            op.paymaster_and_data = sponsored.paymaster_and_data.clone();

            match sponsored.gas_estimate() {
                Some(gas) => op.apply_gas(&gas),
                None => {
                    // The paymaster signs over the gas limits, so re-sponsor once they are set
                    let gas = self.bundler.estimate_gas(&op).await?;
                    op.apply_gas(&gas);
                    op.paymaster_and_data = self.bundler.sponsor(&op).await?.paymaster_and_data;
                }
            }
        } else {
            let gas = self.bundler.estimate_gas(&op).await?;
            op.apply_gas(&gas);
        }

        sign_user_operation(
            &mut op,
            self.config.entry_point,
            self.config.chain_id,
            &self.personal_wallet,
        )?;

        self.relay(&op).await
    }

    /// Submit a signed operation and wait for its receipt, failing if its
    /// execution reverted
    async fn relay(&mut self, op: &UserOperation) -> Result<UserOperationReceipt, ScriptError> {
        let op_hash = self.bundler.send(op).await?;
        let receipt = self.bundler.wait_for_receipt(op_hash).await?;

        // An included operation deploys the account even if its calls revert
        debug!(%op_hash, tx_hash = %receipt.receipt.transaction_hash, "user operation included");
        self.init_code = Bytes::new();

        if !receipt.success {
            return Err(ScriptError::Relay(format!(
                "user operation {op_hash} reverted: {}",
                receipt.reason.as_deref().unwrap_or("unknown reason")
            )));
        }

        Ok(receipt)
    }
}

/// The init code deploying an account administered by `admin`
fn account_init_code(factory: Address, admin: Address) -> Bytes {
    let create_account = IAccountFactory::createAccountCall {
        _admin: admin,
        _data: Bytes::new(),
    };
    init_code(factory, &create_account.abi_encode())
}

/// Encode calls as the account's `execute` or `executeBatch` calldata
fn encode_calls(mut calls: Vec<Call>) -> Result<Bytes, ScriptError> {
    if calls.len() > 1 {
        let (targets, values, data): (Vec<_>, Vec<_>, Vec<_>) = calls
            .into_iter()
            .map(|call| (call.target, call.value, call.data))
            .multiunzip();

        return Ok(IAccount::executeBatchCall {
            _target: targets,
            _value: values,
            _calldata: data,
        }
        .abi_encode()
        .into());
    }

    let call = calls
        .pop()
        .ok_or_else(|| ScriptError::CalldataConstruction("no calls to execute".to_string()))?;
    Ok(IAccount::executeCall {
        _target: call.target,
        _value: call.value,
        _calldata: call.data,
    }
    .abi_encode()
    .into())
}

/// Sign the operation's hash as an EIP-191 message, as the account verifies it
fn sign_user_operation(
    op: &mut UserOperation,
    entry_point: Address,
    chain_id: u64,
    wallet: &LocalWallet,
) -> Result<(), ScriptError> {
    let op_hash = op.hash(entry_point, chain_id);
    let signature = wallet
        .signer()
        .sign_message_sync(op_hash.as_slice())
        .map_err(|e| ScriptError::Wallet(e.to_string()))?;

    op.signature = Bytes::copy_from_slice(&signature.as_bytes());
    Ok(())
}

/// The unix time at which new session keys and permission requests expire
fn session_expiry() -> u128 {
    (Utc::now().timestamp() + SESSION_KEY_VALIDITY_SECS).max(0) as u128
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy::{
        primitives::{Signature, B256},
        sol_types::SolValue,
        transports::mock::Asserter,
    };
    use serde_json::{json, Value};
    use smart_account_abi::user_operation::{GasEstimate, SponsorResult, ENTRYPOINT_V06_ADDRESS};

    use super::*;
    use crate::{
        bundler::tests::{mocked_bundler, receipt},
        utils::mocked_provider,
    };

    /// The factory of the test accounts
    const FACTORY: Address = Address::new([0xfa; 20]);

    /// A configuration for chain 5 with the given gas payment mode
    pub(crate) fn test_config(gasless: bool) -> SmartAccountConfig {
        SmartAccountConfig::new(5, FACTORY, "secret".to_string(), gasless)
    }

    /// Queue the provider responses read while pricing an operation: the
    /// entry point nonce and the fee history
    pub(crate) fn push_pricing(provider: &Asserter) {
        provider.push_success(&Bytes::from(U256::ZERO.abi_encode()));
        provider.push_success(&json!({
            "oldestBlock": "0x1",
            "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
            "gasUsedRatio": [0.5],
            "reward": [["0x3b9aca00"]]
        }));
    }

    /// Gas limits returned by the bundler
    pub(crate) fn gas_estimate() -> GasEstimate {
        GasEstimate {
            pre_verification_gas: U256::from(50_000),
            verification_gas_limit: U256::from(400_000),
            call_gas_limit: U256::from(100_000),
        }
    }

    /// An account that is not yet deployed, with nothing queued on its clients
    fn undeployed_account(provider: &Asserter, bundler: &Asserter) -> SmartAccount {
        let personal_wallet = LocalWallet::generate();
        let init_code = account_init_code(FACTORY, personal_wallet.address());
        SmartAccount {
            config: test_config(false /* gasless */),
            personal_wallet,
            provider: mocked_provider(provider.clone()),
            bundler: mocked_bundler(bundler.clone(), 3),
            address: Address::repeat_byte(0xac),
            init_code,
        }
    }

    #[test]
    fn test_single_call_uses_execute() {
        let target = Address::repeat_byte(0x22);
        let data = encode_calls(vec![Call::new(target, U256::from(5), vec![0xde, 0xad])]).unwrap();

        let decoded = IAccount::executeCall::abi_decode(&data).unwrap();
        assert_eq!(decoded._target, target);
        assert_eq!(decoded._value, U256::from(5));
        assert_eq!(decoded._calldata, Bytes::from(vec![0xde, 0xad]));
    }

    #[test]
    fn test_multiple_calls_use_execute_batch() {
        let calls = vec![
            Call::new(Address::repeat_byte(1), U256::ZERO, vec![1]),
            Call::new(Address::repeat_byte(2), U256::from(7), vec![2]),
        ];
        let data = encode_calls(calls).unwrap();

        assert_eq!(&data[..4], IAccount::executeBatchCall::SELECTOR.as_slice());
        let decoded = IAccount::executeBatchCall::abi_decode(&data).unwrap();
        assert_eq!(decoded._target, vec![Address::repeat_byte(1), Address::repeat_byte(2)]);
        assert_eq!(decoded._value, vec![U256::ZERO, U256::from(7)]);
    }

    #[test]
    fn test_no_calls_rejected() {
        assert!(matches!(
            encode_calls(vec![]),
            Err(ScriptError::CalldataConstruction(_))
        ));
    }

    #[test]
    fn test_init_code_creates_account_for_admin() {
        let factory = Address::repeat_byte(0xfa);
        let admin = Address::repeat_byte(0xad);
        let code = account_init_code(factory, admin);

        assert_eq!(&code[..20], factory.as_slice());
        let create = IAccountFactory::createAccountCall::abi_decode(&code[20..]).unwrap();
        assert_eq!(create._admin, admin);
        assert!(create._data.is_empty());
    }

    #[test]
    fn test_user_operation_signed_by_wallet() {
        let wallet = LocalWallet::generate();
        let mut op = UserOperation::new(Address::repeat_byte(3), U256::ZERO, Bytes::new(), Bytes::new());

        sign_user_operation(&mut op, ENTRYPOINT_V06_ADDRESS, 5, &wallet).unwrap();

        let signature = Signature::try_from(op.signature.as_ref()).unwrap();
        let recovered = signature
            .recover_address_from_msg(op.hash(ENTRYPOINT_V06_ADDRESS, 5).as_slice())
            .unwrap();
        assert_eq!(recovered, wallet.address());
    }

    #[test]
    fn test_session_signer_from_permissions() {
        let signer = ActiveSigner::from(SignerPermissions {
            signer: Address::repeat_byte(9),
            approvedTargets: vec![Address::repeat_byte(8)],
            nativeTokenLimitPerTransaction: U256::ZERO,
            startTimestamp: 0,
            endTimestamp: 42,
        });

        assert!(!signer.is_admin);
        assert_eq!(signer.expires_at, Some(42));
        assert_eq!(signer.approved_targets, vec![Address::repeat_byte(8)]);
    }

    #[test]
    fn test_session_expiry_in_future() {
        assert!(session_expiry() > Utc::now().timestamp() as u128);
    }

    #[tokio::test]
    async fn test_explicit_address_must_be_deployed() {
        let provider = Asserter::new();
        provider.push_success(&Bytes::new());

        let res = SmartAccount::with_clients(
            test_config(true),
            LocalWallet::generate(),
            mocked_provider(provider),
            mocked_bundler(Asserter::new(), 1),
            Some(Address::repeat_byte(0xac)),
        )
        .await;
        assert!(matches!(res, Err(ScriptError::Config(_))));
    }

    #[tokio::test]
    async fn test_counterfactual_account_lists_only_admin() {
        let provider = Asserter::new();
        let account_address = Address::repeat_byte(0xac);
        provider.push_success(&Bytes::from(account_address.abi_encode()));
        provider.push_success(&Bytes::new());

        let wallet = LocalWallet::generate();
        let admin = wallet.address();
        let account = SmartAccount::with_clients(
            test_config(true),
            wallet,
            mocked_provider(provider),
            mocked_bundler(Asserter::new(), 1),
            None, /* account_address */
        )
        .await
        .unwrap();

        assert_eq!(account.address(), account_address);
        assert!(!account.is_deployed());
        assert_eq!(
            account.all_active_signers().await.unwrap(),
            vec![ActiveSigner::admin(admin)]
        );
    }

    #[tokio::test]
    async fn test_reverted_operation_still_deploys_account() {
        let provider = Asserter::new();
        let bundler = Asserter::new();
        let mut account = undeployed_account(&provider, &bundler);

        let op_hash = B256::repeat_byte(1);
        push_pricing(&provider);
        bundler.push_success(&gas_estimate());
        bundler.push_success(&op_hash);
        bundler.push_success(&Value::Null);
        bundler.push_success(&receipt(op_hash, false, Some("boom")));

        let res = account
            .execute(Call::new(Address::repeat_byte(2), U256::ZERO, vec![1]))
            .await;
        match res {
            Err(ScriptError::Relay(msg)) => assert!(msg.contains("boom")),
            res => panic!("expected revert, got {res:?}"),
        }
        assert!(account.is_deployed());
    }

    #[tokio::test]
    async fn test_failed_send_keeps_init_code() {
        let provider = Asserter::new();
        let bundler = Asserter::new();
        let mut account = undeployed_account(&provider, &bundler);

        push_pricing(&provider);
        bundler.push_success(&gas_estimate());
        bundler.push_failure_msg("AA13 initCode failed or OOG");

        let res = account
            .execute(Call::new(Address::repeat_byte(2), U256::ZERO, vec![1]))
            .await;
        assert!(matches!(res, Err(ScriptError::Relay(_))));
        assert!(!account.is_deployed());
    }

    #[tokio::test]
    async fn test_sponsored_operation_skips_estimation() {
        let provider = Asserter::new();
        let bundler = Asserter::new();
        let mut account = undeployed_account(&provider, &bundler);
        account.config.gasless = true;

        let op_hash = B256::repeat_byte(1);
        let gas = gas_estimate();
        push_pricing(&provider);
        bundler.push_success(&SponsorResult {
            paymaster_and_data: Bytes::from(vec![0xab; 4]),
            call_gas_limit: Some(gas.call_gas_limit),
            verification_gas_limit: Some(gas.verification_gas_limit),
            pre_verification_gas: Some(gas.pre_verification_gas),
        });
        bundler.push_success(&op_hash);
        bundler.push_success(&receipt(op_hash, true, None));

        let included = account
            .execute(Call::new(Address::repeat_byte(2), U256::ZERO, vec![1]))
            .await
            .unwrap();
        assert_eq!(included.user_op_hash, op_hash);
        assert!(account.is_deployed());
    }
}
