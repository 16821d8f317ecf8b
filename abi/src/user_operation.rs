//! The ERC-4337 user operation (EntryPoint v0.6) and the bundler's JSON-RPC
//! wire types

use alloy::{
    primitives::{address, hex, keccak256, Address, Bytes, B256, U256},
    sol,
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

/// The canonical EntryPoint v0.6 deployment, identical on every chain
pub const ENTRYPOINT_V06_ADDRESS: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// A well-formed signature used while the operation is being priced.
///
/// Bundlers simulate validation with it, so it must have the shape of a real
/// ECDSA signature.
const DUMMY_SIGNATURE: [u8; 65] = hex!(
    "fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c"
);

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}

/// A user operation as submitted to a bundler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// The smart account sending the operation
    pub sender: Address,
    /// The account's nonce in the entry point
    pub nonce: U256,
    /// Factory address and calldata, set only when the account is not yet deployed
    pub init_code: Bytes,
    /// The calldata the entry point forwards to the account
    pub call_data: Bytes,
    /// Gas for the main execution call
    pub call_gas_limit: U256,
    /// Gas for account (and paymaster) validation
    pub verification_gas_limit: U256,
    /// Gas paid to the bundler for overhead not metered on-chain
    pub pre_verification_gas: U256,
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Paymaster address and data, empty when the account pays for itself
    pub paymaster_and_data: Bytes,
    /// The account signer's signature over the operation hash
    pub signature: Bytes,
}

impl UserOperation {
    /// An unpriced operation carrying a placeholder signature
    pub fn new(sender: Address, nonce: U256, init_code: Bytes, call_data: Bytes) -> Self {
        Self {
            sender,
            nonce,
            init_code,
            call_data,
            signature: dummy_signature(),
            ..Default::default()
        }
    }

    /// Set the EIP-1559 fee fields
    pub fn with_fees(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        self.max_fee_per_gas = U256::from(max_fee_per_gas);
        self.max_priority_fee_per_gas = U256::from(max_priority_fee_per_gas);
        self
    }

    /// Set the gas limits from a bundler or paymaster estimate
    pub fn apply_gas(&mut self, gas: &GasEstimate) {
        self.call_gas_limit = gas.call_gas_limit;
        self.verification_gas_limit = gas.verification_gas_limit;
        self.pre_verification_gas = gas.pre_verification_gas;
    }

    /// ABI-encode the operation with its dynamic fields hashed, excluding the
    /// signature
    pub fn pack(&self) -> Vec<u8> {
        (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode()
    }

    /// The hash the account signer signs, as computed by
    /// `EntryPoint.getUserOpHash`
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed_hash = keccak256(self.pack());
        keccak256((packed_hash, entry_point, U256::from(chain_id)).abi_encode())
    }
}

/// The placeholder signature attached to an operation before it is signed
pub fn dummy_signature() -> Bytes {
    Bytes::copy_from_slice(&DUMMY_SIGNATURE)
}

/// Build the init code deploying an account: the factory address followed by
/// the factory calldata
pub fn init_code(factory: Address, factory_calldata: &[u8]) -> Bytes {
    [factory.as_slice(), factory_calldata].concat().into()
}

// ----------------------
// | Bundler Wire Types |
// ----------------------

/// Gas limits returned by `eth_estimateUserOperationGas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    /// Bundler overhead gas
    pub pre_verification_gas: U256,
    /// Validation gas
    pub verification_gas_limit: U256,
    /// Execution gas
    pub call_gas_limit: U256,
}

/// The paymaster's answer to `pm_sponsorUserOperation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResult {
    /// The paymaster address and its signed sponsorship data
    pub paymaster_and_data: Bytes,
    /// Execution gas, if the paymaster priced the operation
    #[serde(default)]
    pub call_gas_limit: Option<U256>,
    /// Validation gas, if the paymaster priced the operation
    #[serde(default)]
    pub verification_gas_limit: Option<U256>,
    /// Overhead gas, if the paymaster priced the operation
    #[serde(default)]
    pub pre_verification_gas: Option<U256>,
}

impl SponsorResult {
    /// The gas limits chosen by the paymaster, if it returned all of them
    pub fn gas_estimate(&self) -> Option<GasEstimate> {
        Some(GasEstimate {
            pre_verification_gas: self.pre_verification_gas?,
            verification_gas_limit: self.verification_gas_limit?,
            call_gas_limit: self.call_gas_limit?,
        })
    }
}

/// The transaction that included a user operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedTransaction {
    /// The bundle transaction's hash
    pub transaction_hash: B256,
}

/// The result of `eth_getUserOperationReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    /// The hash of the user operation
    pub user_op_hash: B256,
    /// Whether the account's execution call succeeded
    pub success: bool,
    /// The revert reason, if any
    #[serde(default)]
    pub reason: Option<String>,
    /// The transaction receipt of the bundle
    pub receipt: IncludedTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_op() -> UserOperation {
        UserOperation::new(
            Address::repeat_byte(0x11),
            U256::from(3),
            Bytes::new(),
            Bytes::from_static(&[0xb6, 0x1d, 0x27, 0xf6]),
        )
        .with_fees(2_000_000_000, 1_000_000_000)
    }

    #[test]
    fn test_wire_format_is_camel_case_hex() {
        let json = serde_json::to_value(dummy_op()).unwrap();

        assert_eq!(json["nonce"], "0x3");
        assert_eq!(json["callData"], "0xb61d27f6");
        assert_eq!(json["initCode"], "0x");
        assert_eq!(json["maxFeePerGas"], "0x77359400");
        assert!(json.get("paymasterAndData").is_some());
        assert!(json.get("call_data").is_none());
    }

    #[test]
    fn test_hash_ignores_signature() {
        let op = dummy_op();
        let mut signed = op.clone();
        signed.signature = Bytes::from_static(&[1; 65]);

        assert_eq!(
            op.hash(ENTRYPOINT_V06_ADDRESS, 5),
            signed.hash(ENTRYPOINT_V06_ADDRESS, 5)
        );
    }

    #[test]
    fn test_hash_bound_to_chain_and_entry_point() {
        let op = dummy_op();
        let hash = op.hash(ENTRYPOINT_V06_ADDRESS, 5);

        assert_ne!(hash, op.hash(ENTRYPOINT_V06_ADDRESS, 1));
        assert_ne!(hash, op.hash(Address::ZERO, 5));
    }

    #[test]
    fn test_pack_is_ten_words() {
        assert_eq!(dummy_op().pack().len(), 10 * 32);
    }

    #[test]
    fn test_init_code_prefixes_factory() {
        let factory = Address::repeat_byte(0xaa);
        let code = init_code(factory, &[1, 2, 3]);

        assert_eq!(&code[..20], factory.as_slice());
        assert_eq!(&code[20..], &[1, 2, 3]);
    }

    #[test]
    fn test_sponsor_result_without_gas() {
        let res: SponsorResult =
            serde_json::from_str(r#"{"paymasterAndData":"0x1234"}"#).unwrap();
        assert!(res.gas_estimate().is_none());

        let res: SponsorResult = serde_json::from_str(
            r#"{"paymasterAndData":"0x1234","callGasLimit":"0x10","verificationGasLimit":"0x20","preVerificationGas":"0x30"}"#,
        )
        .unwrap();
        let gas = res.gas_estimate().unwrap();
        assert_eq!(gas.call_gas_limit, U256::from(0x10));
        assert_eq!(gas.pre_verification_gas, U256::from(0x30));
    }

    #[test]
    fn test_receipt_parses() {
        let receipt: UserOperationReceipt = serde_json::from_str(&format!(
            r#"{{"userOpHash":"{h}","success":true,"receipt":{{"transactionHash":"{h}","blockNumber":"0x1"}}}}"#,
            h = B256::repeat_byte(7)
        ))
        .unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.receipt.transaction_hash, B256::repeat_byte(7));
    }
}
