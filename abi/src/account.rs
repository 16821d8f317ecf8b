//! Bindings for the smart account, its factory, and signer permission requests

use alloy::{
    primitives::{Address, B256},
    signers::{local::PrivateKeySigner, Error as SignerError, Signature, SignerSync},
    sol,
    sol_types::{eip712_domain, SolStruct},
};

/// The name of the domain separator for the account's typed data
pub const ACCOUNT_EIP712_DOMAIN_NAME: &str = "Account";
/// The version of the domain separator for the account's typed data
pub const ACCOUNT_EIP712_DOMAIN_VERSION: &str = "1";

// Types & methods from the account's `IAccountPermissions` interface
sol! {
    /// A request, signed by an account admin, to set the permissions of a signer
    #[derive(Debug, PartialEq, Eq)]
    struct SignerPermissionRequest {
        /// The signer whose permissions are being set
        address signer;
        /// 1 to add an admin, 2 to remove one, 0 for a regular signer
        uint8 isAdmin;
        /// The contracts the signer may call through the account
        address[] approvedTargets;
        /// The maximum native token value per transaction
        uint256 nativeTokenLimitPerTransaction;
        /// The time from which the signer's permissions apply
        uint128 permissionStartTimestamp;
        /// The time at which the signer's permissions end
        uint128 permissionEndTimestamp;
        /// The time from which this request may be submitted
        uint128 reqValidityStartTimestamp;
        /// The time after which this request may no longer be submitted
        uint128 reqValidityEndTimestamp;
        /// A unique identifier preventing replay of the request
        bytes32 uid;
    }

    /// The permissions of a non-admin signer, as stored on the account
    #[derive(Debug, PartialEq, Eq)]
    struct SignerPermissions {
        address signer;
        address[] approvedTargets;
        uint256 nativeTokenLimitPerTransaction;
        uint128 startTimestamp;
        uint128 endTimestamp;
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IAccount {
        function execute(address _target, uint256 _value, bytes calldata _calldata) external;
        function executeBatch(address[] calldata _target, uint256[] calldata _value, bytes[] calldata _calldata) external;
        function setPermissionsForSigner(SignerPermissionRequest calldata _req, bytes calldata _signature) external;
        function getAllActiveSigners() external view returns (SignerPermissions[] memory signers);
        function getAllAdmins() external view returns (address[] memory admins);
        function isAdmin(address _signer) external view returns (bool);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IAccountFactory {
        function createAccount(address _admin, bytes calldata _data) external returns (address);
        function getAddress(address _adminSigner, bytes calldata _data) external view returns (address);
    }
}

/// A fresh identifier for a permission request
fn random_uid() -> B256 {
    B256::from(rand::random::<[u8; 32]>())
}

impl SignerPermissionRequest {
    /// A request granting `signer` a session over the given call targets,
    /// active until `expires_at` (unix seconds)
    pub fn grant(signer: Address, approved_targets: Vec<Address>, expires_at: u128) -> Self {
        Self {
            signer,
            isAdmin: 0,
            approvedTargets: approved_targets,
            nativeTokenLimitPerTransaction: Default::default(),
            permissionStartTimestamp: 0,
            permissionEndTimestamp: expires_at,
            reqValidityStartTimestamp: 0,
            reqValidityEndTimestamp: expires_at,
            uid: random_uid(),
        }
    }

    /// A request clearing every permission held by `signer`
    ///
    /// The request itself stays submittable until `valid_until`
    pub fn revoke(signer: Address, valid_until: u128) -> Self {
        Self {
            signer,
            isAdmin: 0,
            approvedTargets: Vec::new(),
            nativeTokenLimitPerTransaction: Default::default(),
            permissionStartTimestamp: 0,
            permissionEndTimestamp: 0,
            reqValidityStartTimestamp: 0,
            reqValidityEndTimestamp: valid_until,
            uid: random_uid(),
        }
    }

    /// The EIP-712 digest of the request as verified by the account at `account`
    pub fn signing_hash(&self, chain_id: u64, account: Address) -> B256 {
        let domain = eip712_domain!(
            name: ACCOUNT_EIP712_DOMAIN_NAME,
            version: ACCOUNT_EIP712_DOMAIN_VERSION,
            chain_id: chain_id,
            verifying_contract: account,
        );

        self.eip712_signing_hash(&domain)
    }

    /// Sign the request with an admin key of the account at `account`
    pub fn sign(
        &self,
        chain_id: u64,
        account: Address,
        admin: &PrivateKeySigner,
    ) -> Result<Signature, SignerError> {
        let digest = self.signing_hash(chain_id, account);
        admin.sign_hash_sync(&digest)
    }
}
