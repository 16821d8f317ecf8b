//! Decentralized storage of contract and token metadata

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    constants::{DEFAULT_STORAGE_UPLOAD_URL, IPFS_SCHEME},
    errors::ScriptError,
    utils::authenticated_http_client,
};

/// The multipart field each uploaded file is attached under
const FILE_FIELD: &str = "file";
/// The directory files are uploaded into
const UPLOAD_DIRECTORY: &str = "files";

/// A named file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// The file name within the uploaded directory
    pub name: String,
    /// The file contents
    pub data: Vec<u8>,
}

impl UploadFile {
    /// A file named `name` holding `data`
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// A content-addressed store of files
#[async_trait]
pub trait MetadataStorage: Send + Sync {
    /// Upload the files as a single directory, returning the URI of each file
    /// in input order
    async fn upload_batch(&self, files: Vec<UploadFile>) -> Result<Vec<String>, ScriptError>;

    /// Upload a single file, returning its URI
    async fn upload(&self, file: UploadFile) -> Result<String, ScriptError> {
        self.upload_batch(vec![file])
            .await?
            .pop()
            .ok_or_else(|| ScriptError::Storage("upload returned no URI".to_string()))
    }
}

/// The response of the storage upload endpoint
#[derive(Deserialize)]
struct UploadResponse {
    /// The CID of the uploaded directory
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// IPFS storage behind the thirdweb upload gateway
pub struct ThirdwebStorage {
    /// The HTTP client, carrying the API secret key
    client: reqwest::Client,
    /// The upload endpoint
    upload_url: String,
}

impl ThirdwebStorage {
    /// Create a storage client authenticated with `secret_key`
    pub fn new(secret_key: &str) -> Result<Self, ScriptError> {
        Self::with_upload_url(secret_key, DEFAULT_STORAGE_UPLOAD_URL)
    }

    /// Create a storage client uploading to a custom endpoint
    pub fn with_upload_url(secret_key: &str, upload_url: &str) -> Result<Self, ScriptError> {
        let client = authenticated_http_client(Some(secret_key))?;
        Ok(Self {
            client,
            upload_url: upload_url.to_string(),
        })
    }
}

#[async_trait]
impl MetadataStorage for ThirdwebStorage {
    async fn upload_batch(&self, files: Vec<UploadFile>) -> Result<Vec<String>, ScriptError> {
        if files.is_empty() {
            return Err(ScriptError::Storage("no files to upload".to_string()));
        }

        let names: Vec<String> = files.iter().map(|file| file.name.clone()).collect();
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.data)
                .file_name(format!("{UPLOAD_DIRECTORY}/{}", file.name));
            form = form.part(FILE_FIELD, part);
        }

        let resp = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScriptError::Storage(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ScriptError::Storage(format!("upload failed with {status}: {body}")));
        }

        let upload: UploadResponse = resp
            .json()
            .await
            .map_err(|e| ScriptError::Storage(format!("invalid upload response: {e}")))?;

        debug!(cid = %upload.ipfs_hash, files = names.len(), "uploaded directory");
        Ok(names
            .iter()
            .map(|name| directory_uri(&upload.ipfs_hash, name))
            .collect())
    }
}

/// The URI of file `name` in the directory with CID `cid`
pub fn directory_uri(cid: &str, name: &str) -> String {
    format!("{IPFS_SCHEME}{cid}/{name}")
}

/// The directory URI of a file URI, with a trailing slash
pub fn base_uri(uri: &str) -> String {
    match uri.rfind('/') {
        Some(idx) if idx + 1 > IPFS_SCHEME.len() => uri[..=idx].to_string(),
        _ => format!("{}/", uri.trim_end_matches('/')),
    }
}
