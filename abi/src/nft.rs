//! Bindings for the ERC721 NFT drop and the clone factory that deploys it

use alloy::{
    primitives::Address,
    sol,
    sol_types::SolCall,
};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IDropERC721 {
        function initialize(
            address _defaultAdmin,
            string memory _name,
            string memory _symbol,
            string memory _contractURI,
            address[] memory _trustedForwarders,
            address _saleRecipient,
            address _royaltyRecipient,
            uint128 _royaltyBps,
            uint128 _platformFeeBps,
            address _platformFeeRecipient
        ) external;
        function lazyMint(uint256 _amount, string calldata _baseURIForTokens, bytes calldata _data) external returns (uint256 batchId);
        function nextTokenIdToMint() external view returns (uint256);
        function name() external view returns (string memory);

        #[derive(Debug, PartialEq, Eq)]
        event TokensLazyMinted(uint256 indexed startTokenId, uint256 endTokenId, string baseURI, bytes encryptedBaseURI);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ICloneFactory {
        function deployProxyByImplementation(address _implementation, bytes memory _data, bytes32 _salt) external returns (address deployedProxy);

        #[derive(Debug, PartialEq, Eq)]
        event ProxyDeployed(address indexed implementation, address proxy, address indexed deployer);
    }
}

/// The parameters with which a new NFT drop is initialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftDropParams {
    /// The collection admin
    pub admin: Address,
    /// The collection name
    pub name: String,
    /// The collection symbol
    pub symbol: String,
    /// URI of the collection-level metadata
    pub contract_uri: String,
    /// Recipient of primary sale proceeds
    pub primary_sale_recipient: Address,
    /// Recipient of secondary sale royalties
    pub royalty_recipient: Address,
    /// Royalty in basis points
    pub royalty_bps: u128,
    /// Platform fee in basis points
    pub platform_fee_bps: u128,
    /// Recipient of platform fees
    pub platform_fee_recipient: Address,
}

impl NftDropParams {
    /// ABI-encode the drop's `initialize` call, run by the factory on the new proxy
    pub fn initialize_calldata(&self) -> Vec<u8> {
        IDropERC721::initializeCall {
            _defaultAdmin: self.admin,
            _name: self.name.clone(),
            _symbol: self.symbol.clone(),
            _contractURI: self.contract_uri.clone(),
            _trustedForwarders: Vec::new(),
            _saleRecipient: self.primary_sale_recipient,
            _royaltyRecipient: self.royalty_recipient,
            _royaltyBps: self.royalty_bps,
            _platformFeeBps: self.platform_fee_bps,
            _platformFeeRecipient: self.platform_fee_recipient,
        }
        .abi_encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_calldata_round_trip() {
        let admin = Address::repeat_byte(1);
        let params = NftDropParams {
            admin,
            name: "Collection".to_string(),
            symbol: "COL".to_string(),
            contract_uri: "ipfs://cid/0".to_string(),
            primary_sale_recipient: admin,
            royalty_recipient: admin,
            royalty_bps: 500,
            platform_fee_bps: 0,
            platform_fee_recipient: Address::ZERO,
        };

        let calldata = params.initialize_calldata();
        assert_eq!(&calldata[..4], IDropERC721::initializeCall::SELECTOR.as_slice());

        let decoded = IDropERC721::initializeCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded._name, "Collection");
        assert_eq!(decoded._royaltyBps, 500);
        assert!(decoded._trustedForwarders.is_empty());
    }
}
