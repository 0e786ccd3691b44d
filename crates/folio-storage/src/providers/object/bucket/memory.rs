//! In-memory bucket used for tests and local development.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::traits::storage::ByteStream;

use super::{ObjectBucket, ObjectEntry, ObjectListing};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// Bucket kept in a sorted map.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    name: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBucket {
    /// Create an empty bucket.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// All keys currently stored, in order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

fn entry(key: &str, object: &StoredObject) -> ObjectEntry {
    ObjectEntry {
        key: key.to_string(),
        size: object.data.len() as u64,
        last_modified: Some(object.last_modified),
    }
}

#[async_trait]
impl ObjectBucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<ObjectEntry>> {
        Ok(self.objects.read().await.get(key).map(|o| entry(key, o)))
    }

    async fn get(&self, key: &str) -> AppResult<ByteStream> {
        let data = self
            .objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(data)
        })))
    }

    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> AppResult<ObjectListing> {
        let objects = self.objects.read().await;
        let mut listing = ObjectListing::default();
        let mut prefixes = BTreeSet::new();

        for (key, object) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match delimiter.and_then(|d| rest.find(d).map(|idx| (idx, d.len()))) {
                Some((idx, len)) => {
                    prefixes.insert(format!("{prefix}{}", &rest[..idx + len]));
                }
                None => listing.objects.push(entry(key, object)),
            }
        }
        listing.prefixes = prefixes.into_iter().collect();
        Ok(listing)
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        let mut objects = self.objects.write().await;
        let source = objects
            .get(from)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Object not found: {from}")))?;
        objects.insert(
            to.to_string(),
            StoredObject {
                data: source.data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
