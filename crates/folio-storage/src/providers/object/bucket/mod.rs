//! Flat key/value bucket abstraction under the object-store client.

pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use folio_core::result::AppResult;
use folio_core::traits::storage::ByteStream;

pub use memory::MemoryBucket;
#[cfg(feature = "s3")]
pub use s3::S3Bucket;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if reported.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// Objects directly matched by the listing.
    pub objects: Vec<ObjectEntry>,
    /// Common prefixes (ending in the delimiter) when a delimiter was given.
    pub prefixes: Vec<String>,
}

/// Operations the object-store client needs from a bucket.
#[async_trait]
pub trait ObjectBucket: Send + Sync + std::fmt::Debug + 'static {
    /// Bucket name.
    fn name(&self) -> &str;

    /// Store an object, replacing any previous one.
    async fn put(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Object metadata, `None` if the key is absent.
    async fn head(&self, key: &str) -> AppResult<Option<ObjectEntry>>;

    /// Stream an object's content.
    async fn get(&self, key: &str) -> AppResult<ByteStream>;

    /// List keys starting with `prefix`, grouped at `delimiter` if given.
    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> AppResult<ObjectListing>;

    /// Server-side copy.
    async fn copy(&self, from: &str, to: &str) -> AppResult<()>;

    /// Remove an object. Absent keys are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check that the bucket is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Link a human can open, if the bucket exposes one.
    fn object_url(&self, _key: &str) -> Option<String> {
        None
    }
}
