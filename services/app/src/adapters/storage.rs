//! services/app/src/adapters/storage.rs
//!
//! This module contains the adapter for the hosted blob store that keeps the
//! rain gauge photos. It implements the `BlobStorage` port from the core
//! crate over the store's REST surface: objects are uploaded with a `POST`
//! to the bucket, and the public download URL is built from the object's
//! metadata (its download token).

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use rainfall_core::domain::StorageRef;
use rainfall_core::ports::{BlobStorage, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `BlobStorage` port.
#[derive(Clone)]
pub struct BucketStorage {
    client: reqwest::Client,
    /// Bucket endpoint of the form `https://<host>/v0/b/<bucket>/o`,
    /// without a trailing slash.
    bucket_url: String,
}

impl BucketStorage {
    /// Creates a new `BucketStorage`.
    pub fn new(client: reqwest::Client, bucket_url: String) -> Self {
        Self { client, bucket_url }
    }

    /// Object metadata endpoint; object names are a single URL segment with
    /// the path separators percent-encoded.
    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.bucket_url, encode_object_path(path))
    }
}

/// Percent-encodes an object path into a single URL segment. Only the
/// characters our paths (`<userId>/<filename>`) can contain need escaping.
fn encode_object_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// The slice of object metadata we read back.
#[derive(Deserialize)]
struct ObjectMetadata {
    #[serde(rename = "downloadTokens")]
    download_tokens: Option<String>,
}

//=========================================================================================
// `BlobStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl BlobStorage for BucketStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> PortResult<StorageRef> {
        let response = self
            .client
            .post(format!("{}?name={}", self.bucket_url, encode_object_path(path)))
            .header("content-type", content_type)
            .body(data)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "storage returned {status} uploading {path}"
            )));
        }

        Ok(StorageRef {
            path: path.to_string(),
        })
    }

    async fn download_url(&self, storage_ref: &StorageRef) -> PortResult<String> {
        let response = self
            .client
            .get(self.object_url(&storage_ref.path))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(storage_ref.path.clone()));
        }
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "storage returned {status} for {}",
                storage_ref.path
            )));
        }

        let metadata: ObjectMetadata = response.json().await.map_err(transport_error)?;
        let token = metadata
            .download_tokens
            .and_then(|tokens| tokens.split(',').next().map(str::to_string))
            .ok_or_else(|| {
                PortError::Unexpected(format!("no download token for {}", storage_ref.path))
            })?;

        Ok(format!(
            "{}?alt=media&token={token}",
            self.object_url(&storage_ref.path)
        ))
    }
}
