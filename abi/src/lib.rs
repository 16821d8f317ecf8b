//! Solidity bindings and typed helpers for the smart account, token drop, and
//! NFT drop contracts used by the wallet scripts

pub mod account;
pub mod drop;
pub mod nft;
pub mod user_operation;
