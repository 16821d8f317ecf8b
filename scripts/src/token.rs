//! Claiming ERC20 tokens from a drop through the smart account

use std::fmt::{self, Display};

use alloy::{
    primitives::{utils::format_units, Address, Bytes, U256},
    sol_types::SolCall,
};
use smart_account_abi::{
    drop::{to_base_units, AllowlistProof, ClaimCondition, ITokenDrop},
    user_operation::UserOperationReceipt,
};
use tracing::info;

use crate::{
    errors::ScriptError,
    smart_account::{Call, SmartAccount},
    utils::RpcProvider,
};

/// A token balance with the token's display parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    /// The balance in base units
    pub value: U256,
    /// The token's decimals
    pub decimals: u8,
    /// The token's symbol
    pub symbol: String,
}

impl Display for TokenBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format_units(self.value, self.decimals) {
            Ok(amount) => write!(f, "{amount} {}", self.symbol),
            // Decimals out of range, show base units
            Err(_) => write!(f, "{} {}", self.value, self.symbol),
        }
    }
}

/// Claim `quantity` whole tokens from the drop at `token` into the account,
/// paying the active claim condition's price
pub async fn claim_erc20(
    account: &mut SmartAccount,
    token: Address,
    quantity: u64,
) -> Result<UserOperationReceipt, ScriptError> {
    let drop = ITokenDrop::new(token, account.provider().clone());
    let decimals = drop
        .decimals()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let condition_id = drop
        .getActiveClaimConditionId()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let condition = drop
        .getClaimConditionById(condition_id)
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    let amount = to_base_units(quantity, decimals);
    info!(
        %token,
        quantity,
        condition_id = %condition_id,
        price = %condition.pricePerToken,
        "claiming tokens"
    );

    let calls = claim_calls(account.address(), token, amount, &condition);
    account.execute_batch(calls).await
}

/// Read the token balance of `owner`
pub async fn token_balance(
    provider: &RpcProvider,
    token: Address,
    owner: Address,
) -> Result<TokenBalance, ScriptError> {
    let drop = ITokenDrop::new(token, provider.clone());
    let value = drop
        .balanceOf(owner)
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let decimals = drop
        .decimals()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    let symbol = drop
        .symbol()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    Ok(TokenBalance {
        value,
        decimals,
        symbol,
    })
}

/// The calls claiming `amount` base units of `token` for `receiver` under the
/// given condition.
///
/// A claim priced in an ERC20 currency is preceded by an approval of the total
/// price, a native one carries the total as value.
pub fn claim_calls(
    receiver: Address,
    token: Address,
    amount: U256,
    condition: &ClaimCondition,
) -> Vec<Call> {
    let total_price = condition.total_price(amount);
    let claim = ITokenDrop::claimCall {
        _receiver: receiver,
        _quantity: amount,
        _currency: condition.currency,
        _pricePerToken: condition.pricePerToken,
        _allowlistProof: AllowlistProof::public(),
        _data: Bytes::new(),
    }
    .abi_encode();

    if condition.is_native() {
        return vec![Call::new(token, total_price, claim)];
    }

    let mut calls = Vec::with_capacity(2);
    if !total_price.is_zero() {
        let approve = ITokenDrop::approveCall {
            spender: token,
            amount: total_price,
        }
        .abi_encode();
        calls.push(Call::new(condition.currency, U256::ZERO, approve));
    }
    calls.push(Call::new(token, U256::ZERO, claim));
    calls
}

#[cfg(test)]
mod tests {
    use smart_account_abi::drop::NATIVE_TOKEN;

    use super::*;

    /// An unrestricted claim condition with the given price
    fn condition(price: U256, currency: Address) -> ClaimCondition {
        ClaimCondition {
            startTimestamp: U256::ZERO,
            maxClaimableSupply: U256::MAX,
            supplyClaimed: U256::ZERO,
            quantityLimitPerWallet: U256::MAX,
            merkleRoot: Default::default(),
            pricePerToken: price,
            currency,
            metadata: String::new(),
        }
    }

    #[test]
    fn test_free_native_claim() {
        let receiver = Address::repeat_byte(1);
        let token = Address::repeat_byte(2);
        let amount = to_base_units(1, 18);

        let calls = claim_calls(receiver, token, amount, &condition(U256::ZERO, NATIVE_TOKEN));

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, token);
        assert_eq!(calls[0].value, U256::ZERO);

        let claim = ITokenDrop::claimCall::abi_decode(&calls[0].data).unwrap();
        assert_eq!(claim._receiver, receiver);
        assert_eq!(claim._quantity, amount);
        assert_eq!(claim._allowlistProof, AllowlistProof::public());
    }

    #[test]
    fn test_paid_native_claim_sends_value() {
        let price = U256::from(10u64.pow(16));
        let calls = claim_calls(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            to_base_units(2, 18),
            &condition(price, NATIVE_TOKEN),
        );

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].value, price * U256::from(2));
    }

    #[test]
    fn test_erc20_priced_claim_approves_first() {
        let currency = Address::repeat_byte(0xcc);
        let token = Address::repeat_byte(2);
        let price = U256::from(10u64.pow(18));

        let calls = claim_calls(
            Address::repeat_byte(1),
            token,
            to_base_units(1, 18),
            &condition(price, currency),
        );

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].target, currency);
        let approve = ITokenDrop::approveCall::abi_decode(&calls[0].data).unwrap();
        assert_eq!(approve.spender, token);
        assert_eq!(approve.amount, price);

        assert_eq!(calls[1].target, token);
        assert_eq!(calls[1].value, U256::ZERO);
    }

    #[test]
    fn test_free_erc20_claim_skips_approval() {
        let calls = claim_calls(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            to_base_units(1, 6),
            &condition(U256::ZERO, Address::repeat_byte(0xcc)),
        );

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, Address::repeat_byte(2));
    }

    #[test]
    fn test_balance_display() {
        let balance = TokenBalance {
            value: U256::from(1_500_000u64),
            decimals: 6,
            symbol: "TKN".to_string(),
        };

        assert_eq!(balance.to_string(), "1.500000 TKN");
    }

    #[test]
    fn test_balance_display_with_unrepresentable_decimals() {
        let balance = TokenBalance {
            value: U256::from(42u64),
            decimals: 200,
            symbol: "TKN".to_string(),
        };

        assert_eq!(balance.to_string(), "42 TKN");
    }
}
