//! Scripts for operating a smart account with gasless transactions and
//! session keys, and for deploying and minting NFT drop collections.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod bundler;
pub mod cli;
mod commands;
pub mod config;
pub mod constants;
pub mod errors;
pub mod nft;
pub mod smart_account;
pub mod storage;
pub mod token;
pub mod utils;
pub mod wallet;
