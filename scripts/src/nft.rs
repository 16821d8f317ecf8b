//! Deployment of NFT drop collections and lazy minting of metadata batches

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::TransactionReceipt,
};
use serde::{Deserialize, Serialize};
use smart_account_abi::nft::{ICloneFactory, IDropERC721, NftDropParams};
use tracing::info;

use crate::{
    errors::ScriptError,
    storage::{base_uri, MetadataStorage, UploadFile},
    utils::RpcProvider,
};

/// The file name of a collection's contract-level metadata
const CONTRACT_METADATA_FILE: &str = "0";

/// A token to add to a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftInput {
    /// The token name
    pub name: String,
    /// The token description
    pub description: String,
    /// The token image
    pub image: Vec<u8>,
}

/// The metadata of a single token, as resolved from its token URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    /// The token name
    pub name: String,
    /// The token description
    pub description: String,
    /// The URI of the token image
    pub image: String,
}

/// The collection-level metadata, as resolved from the contract URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    /// The collection name
    pub name: String,
    /// The collection description
    pub description: String,
    /// The collection symbol
    pub symbol: String,
}

/// The parameters of a new collection
#[derive(Debug, Clone)]
pub struct CollectionParams {
    /// The collection name
    pub name: String,
    /// The collection symbol
    pub symbol: String,
    /// The collection description
    pub description: String,
    /// Recipient of primary sales
    pub primary_sale_recipient: Address,
    /// Royalty in basis points, paid to the admin
    pub royalty_bps: u128,
}

/// A range of lazily minted tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedBatch {
    /// The URI the token IDs are appended to
    pub base_uri: String,
    /// The first token ID of the batch
    pub start_token_id: U256,
    /// The last token ID of the batch, inclusive
    pub end_token_id: U256,
}

/// An entry of a batch manifest
#[derive(Deserialize)]
struct ManifestEntry {
    /// The token name
    name: String,
    /// The token description
    #[serde(default)]
    description: String,
    /// The image path, relative to the manifest
    image: PathBuf,
}

/// Read a batch manifest: a JSON array of `{name, description, image}`
/// objects whose image paths are relative to the manifest
pub fn read_manifest(path: &Path) -> Result<Vec<NftInput>, ScriptError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))?;
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(&content).map_err(|e| ScriptError::Serde(e.to_string()))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    entries
        .into_iter()
        .map(|entry| {
            let image_path = base_dir.join(&entry.image);
            let image = fs::read(&image_path).map_err(|e| {
                ScriptError::ReadFile(format!("{}: {}", image_path.display(), e))
            })?;

            Ok(NftInput {
                name: entry.name,
                description: entry.description,
                image,
            })
        })
        .collect()
}

/// Upload the images and metadata of a batch starting at `start_token_id`,
/// returning the base URI under which each token's metadata is named by its ID
pub async fn upload_batch_metadata(
    storage: &dyn MetadataStorage,
    inputs: Vec<NftInput>,
    start_token_id: U256,
) -> Result<String, ScriptError> {
    if inputs.is_empty() {
        return Err(ScriptError::Config("cannot create an empty batch".to_string()));
    }

    let token_ids: Vec<String> = (0..inputs.len())
        .map(|i| (start_token_id + U256::from(i)).to_string())
        .collect();

    let (images, details): (Vec<_>, Vec<_>) = inputs
        .into_iter()
        .zip(&token_ids)
        .map(|(input, id)| {
            let image = UploadFile::new(id.clone(), input.image);
            (image, (input.name, input.description))
        })
        .unzip();
    let image_uris = storage.upload_batch(images).await?;

    let metadata_files = details
        .into_iter()
        .zip(image_uris)
        .zip(&token_ids)
        .map(|(((name, description), image), id)| {
            let metadata = NftMetadata {
                name,
                description,
                image,
            };
            serde_json::to_vec(&metadata)
                .map(|data| UploadFile::new(id.clone(), data))
                .map_err(|e| ScriptError::Serde(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let metadata_uris = storage.upload_batch(metadata_files).await?;
    let first_uri = metadata_uris
        .first()
        .ok_or_else(|| ScriptError::Storage("upload returned no URIs".to_string()))?;

    Ok(base_uri(first_uri))
}

/// Deploy an NFT drop as a clone of `implementation` administered by `admin`,
/// returning the collection's address
pub async fn deploy_nft_drop(
    provider: &RpcProvider,
    storage: &dyn MetadataStorage,
    clone_factory: Address,
    implementation: Address,
    admin: Address,
    params: &CollectionParams,
) -> Result<Address, ScriptError> {
    let contract_metadata = ContractMetadata {
        name: params.name.clone(),
        description: params.description.clone(),
        symbol: params.symbol.clone(),
    };
    let metadata_json =
        serde_json::to_vec(&contract_metadata).map_err(|e| ScriptError::Serde(e.to_string()))?;
    let contract_uri = storage
        .upload(UploadFile::new(CONTRACT_METADATA_FILE, metadata_json))
        .await?;

    let init_data = NftDropParams {
        admin,
        name: params.name.clone(),
        symbol: params.symbol.clone(),
        contract_uri,
        primary_sale_recipient: params.primary_sale_recipient,
        royalty_recipient: admin,
        royalty_bps: params.royalty_bps,
        platform_fee_bps: 0,
        platform_fee_recipient: Address::ZERO,
    }
    .initialize_calldata();

    let salt = B256::from(rand::random::<[u8; 32]>());
    let factory = ICloneFactory::new(clone_factory, provider.clone());
    let receipt = factory
        .deployProxyByImplementation(implementation, init_data.into(), salt)
        .send()
        .await
        .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
    ensure_success(&receipt, ScriptError::ContractDeployment)?;

    let proxy = receipt
        .logs()
        .iter()
        .find_map(|log| log.log_decode::<ICloneFactory::ProxyDeployed>().ok())
        .map(|log| log.inner.data.proxy)
        .ok_or_else(|| {
            ScriptError::ContractDeployment("no ProxyDeployed event in receipt".to_string())
        })?;

    info!(%proxy, tx_hash = %receipt.transaction_hash, "deployed NFT drop");
    Ok(proxy)
}

/// Upload a batch of tokens and lazy mint it on the drop at `contract`
pub async fn create_batch(
    provider: &RpcProvider,
    storage: &dyn MetadataStorage,
    contract: Address,
    inputs: Vec<NftInput>,
) -> Result<MintedBatch, ScriptError> {
    if inputs.is_empty() {
        return Err(ScriptError::Config("cannot create an empty batch".to_string()));
    }

    let drop = IDropERC721::new(contract, provider.clone());
    let start_token_id = drop
        .nextTokenIdToMint()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    let amount = U256::from(inputs.len());
    let base_uri = upload_batch_metadata(storage, inputs, start_token_id).await?;
    info!(%contract, %amount, %base_uri, "lazy minting batch");

    let receipt = drop
        .lazyMint(amount, base_uri.clone(), Default::default())
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    ensure_success(&receipt, ScriptError::ContractInteraction)?;

    let minted = receipt
        .logs()
        .iter()
        .find_map(|log| log.log_decode::<IDropERC721::TokensLazyMinted>().ok())
        .map(|log| log.inner.data)
        .ok_or_else(|| {
            ScriptError::ContractInteraction("no TokensLazyMinted event in receipt".to_string())
        })?;

    Ok(MintedBatch {
        base_uri: minted.baseURI,
        start_token_id: minted.startTokenId,
        end_token_id: minted.endTokenId,
    })
}

/// Fail with `err` if the transaction reverted
fn ensure_success(
    receipt: &TransactionReceipt,
    err: fn(String) -> ScriptError,
) -> Result<(), ScriptError> {
    if receipt.status() {
        Ok(())
    } else {
        Err(err(format!("transaction {} reverted", receipt.transaction_hash)))
    }
}
