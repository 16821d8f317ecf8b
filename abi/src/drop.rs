//! Bindings for the ERC20 token drop and its claim conditions

use alloy::{
    primitives::{address, utils::Unit, Address, U256},
    sol,
};

/// The sentinel address denoting the chain's native currency in claim conditions
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

sol! {
    /// A claim phase configured on a drop contract
    #[derive(Debug, PartialEq, Eq)]
    struct ClaimCondition {
        uint256 startTimestamp;
        uint256 maxClaimableSupply;
        uint256 supplyClaimed;
        uint256 quantityLimitPerWallet;
        bytes32 merkleRoot;
        uint256 pricePerToken;
        address currency;
        string metadata;
    }

    /// Proof of inclusion in a claim condition's allowlist
    #[derive(Debug, PartialEq, Eq)]
    struct AllowlistProof {
        bytes32[] proof;
        uint256 quantityLimitPerWallet;
        uint256 pricePerToken;
        address currency;
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ITokenDrop {
        function claim(
            address _receiver,
            uint256 _quantity,
            address _currency,
            uint256 _pricePerToken,
            AllowlistProof calldata _allowlistProof,
            bytes memory _data
        ) external payable;
        function getActiveClaimConditionId() external view returns (uint256);
        function getClaimConditionById(uint256 _conditionId) external view returns (ClaimCondition memory condition);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string memory);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

impl AllowlistProof {
    /// The proof submitted by a claimer that is not on any allowlist.
    ///
    /// A max price tells the drop to charge the claim condition's own price.
    pub fn public() -> Self {
        Self {
            proof: Vec::new(),
            quantityLimitPerWallet: U256::ZERO,
            pricePerToken: U256::MAX,
            currency: Address::ZERO,
        }
    }
}

impl ClaimCondition {
    /// Whether the condition is priced in the chain's native currency
    pub fn is_native(&self) -> bool {
        self.currency == NATIVE_TOKEN || self.currency == Address::ZERO
    }

    /// The total price of claiming `amount` base units, charged by the drop as
    /// `amount * pricePerToken / 1 ether`
    pub fn total_price(&self, amount: U256) -> U256 {
        amount.saturating_mul(self.pricePerToken) / Unit::ETHER.wei()
    }
}

/// Convert a whole-token quantity into the token's base units
pub fn to_base_units(quantity: u64, decimals: u8) -> U256 {
    U256::from(quantity) * U256::from(10).pow(U256::from(decimals))
}
