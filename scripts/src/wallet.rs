//! Local key-pair wallets, optionally encrypted at rest as a JSON keystore

use std::{fs, path::Path, str::FromStr};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use rand::thread_rng;
use tracing::{debug, info};

use crate::errors::ScriptError;

/// A secp256k1 key-pair held in memory
#[derive(Debug, Clone)]
pub struct LocalWallet {
    /// The signer wrapping the private key
    signer: PrivateKeySigner,
}

impl LocalWallet {
    /// Generate a fresh random wallet that is never written to disk
    pub fn generate() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_private_key(private_key: &str) -> Result<Self, ScriptError> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| ScriptError::Wallet(format!("invalid private key: {e}")))?;
        Ok(Self { signer })
    }

    /// Load the wallet encrypted at `path`, or generate one and encrypt it
    /// there if the file doesn't exist
    pub fn load_or_create(path: &Path, password: &str) -> Result<Self, ScriptError> {
        if path.exists() {
            return Self::load(path, password);
        }

        let wallet = Self::generate();
        wallet.save(path, password)?;
        info!("Created new wallet at {}", path.display());
        Ok(wallet)
    }

    /// Decrypt the keystore at `path`
    pub fn load(path: &Path, password: &str) -> Result<Self, ScriptError> {
        let private_key = eth_keystore::decrypt_key(path, password)
            .map_err(|e| ScriptError::Wallet(format!("{}: {}", path.display(), e)))?;
        let signer = PrivateKeySigner::from_slice(&private_key)
            .map_err(|e| ScriptError::Wallet(e.to_string()))?;

        debug!(address = %signer.address(), "loaded wallet from {}", path.display());
        Ok(Self { signer })
    }

    /// Encrypt the wallet with `password` and write it to `path`
    pub fn save(&self, path: &Path, password: &str) -> Result<(), ScriptError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ScriptError::Wallet(format!("invalid path {}", path.display())))?;

        fs::create_dir_all(dir).map_err(|e| ScriptError::WriteFile(e.to_string()))?;
        eth_keystore::encrypt_key(
            dir,
            &mut thread_rng(),
            self.signer.to_bytes(),
            password,
            Some(file_name),
        )
        .map_err(|e| ScriptError::Wallet(e.to_string()))?;

        Ok(())
    }

    /// The wallet's address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The signer backing the wallet
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}
