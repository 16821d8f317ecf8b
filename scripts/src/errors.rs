//! Definitions of errors that can occur during the execution of the wallet scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the wallet scripts
#[derive(Debug)]
pub enum ScriptError {
    /// A required credential was not provided
    MissingCredential(String),
    /// Invalid or inconsistent configuration
    Config(String),
    /// Error loading, creating, or decrypting a local wallet
    Wallet(String),
    /// Error initializing an RPC, bundler, or storage client
    ClientInitialization(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// Error relaying a user operation through the bundler or paymaster
    Relay(String),
    /// Error uploading to the metadata storage service
    Storage(String),
    /// Error reading a file
    ReadFile(String),
    /// Error writing a file
    WriteFile(String),
    /// Error de/serializing JSON
    Serde(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::MissingCredential(s) => write!(f, "missing credential: {}", s),
            ScriptError::Config(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::Wallet(s) => write!(f, "wallet error: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Relay(s) => write!(f, "error relaying user operation: {}", s),
            ScriptError::Storage(s) => write!(f, "error uploading to storage: {}", s),
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
            ScriptError::Serde(s) => write!(f, "error de/serializing: {}", s),
        }
    }
}

impl Error for ScriptError {}
