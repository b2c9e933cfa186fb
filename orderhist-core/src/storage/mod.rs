//! Object storage for artifacts and reports.
//!
//! Storage is a flat namespace of `(bucket, key)` pairs holding opaque bytes.
//! Writers own unique keys, so backends need no cross-key coordination.

pub mod fs;
pub mod keys;
pub mod memory;

pub use fs::FsStore;
pub use keys::{report_key, symbol_artifact_key, KEY_PREFIX};
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Byte-level object store.
pub trait ObjectStore: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Write `body` at `key`, replacing any previous object.
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError>;

    /// Read the object at `key`.
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// What was written and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReceipt {
    pub bucket: String,
    pub key: String,
    pub bytes: usize,
    /// BLAKE3 hex digest of the written bytes.
    pub digest: String,
}

/// Serialize `value` as indented JSON and write it.
pub fn put_json<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    value: &T,
) -> Result<ArtifactReceipt, StorageError> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.put(bucket, key, &body)?;

    let digest = blake3::hash(&body).to_hex().to_string();
    debug!(store = store.name(), bucket, key, bytes = body.len(), %digest, "object written");

    Ok(ArtifactReceipt {
        bucket: bucket.to_string(),
        key: key.to_string(),
        bytes: body.len(),
        digest,
    })
}
