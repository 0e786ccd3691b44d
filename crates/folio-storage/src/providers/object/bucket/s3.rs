//! S3-compatible bucket backed by the AWS SDK.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::info;

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::traits::storage::ByteStream;

use super::{ObjectBucket, ObjectEntry, ObjectListing};

/// A bucket on S3 or an S3-compatible service (MinIO, Ceph, ...).
#[derive(Debug, Clone)]
pub struct S3Bucket {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Bucket {
    /// Connect to a bucket.
    ///
    /// Explicit keys take precedence; without them the default AWS
    /// credential chain applies. A custom endpoint switches to path-style
    /// addressing.
    pub async fn connect(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> AppResult<Self> {
        info!(bucket, region, endpoint, "Initializing S3 bucket");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let mut builder = Builder::from(&sdk_config);
        match (access_key, secret_key) {
            (Some(access), Some(secret)) => {
                builder = builder.credentials_provider(Credentials::new(
                    access, secret, None, None, "folio",
                ));
            }
            (None, None) => {}
            _ => {
                return Err(AppError::configuration(
                    "Object-store drives need both an access key and a secret key, or neither",
                ));
            }
        }
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            region: region.to_string(),
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
        })
    }
}

fn sdk_error<E>(err: E, context: String) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AppError::with_source(
        ErrorKind::BackendUnavailable,
        format!("{context}: {}", DisplayErrorContext(&err)),
        err,
    )
}

fn to_chrono(t: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

/// Encode a key for use in a URL or copy source, keeping `/` separators.
fn encode_key(key: &str) -> String {
    let mut url = match url::Url::parse("s3://bucket/") {
        Ok(url) => url,
        Err(_) => return key.to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(key.split('/'));
    }
    url.path().trim_start_matches('/').to_string()
}

#[async_trait]
impl ObjectBucket for S3Bucket {
    fn name(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(data.into())
            .send()
            .await
            .map_err(|e| sdk_error(e, format!("Failed to put {key}")))?;
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<ObjectEntry>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => Ok(Some(ObjectEntry {
                key: key.to_string(),
                size: out.content_length().unwrap_or(0).max(0) as u64,
                last_modified: out.last_modified().and_then(to_chrono),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(sdk_error(e, format!("Failed to inspect {key}"))),
        }
    }

    async fn get(&self, key: &str) -> AppResult<ByteStream> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    sdk_error(e, format!("Failed to read {key}"))
                }
            })?;
        let stream = ReaderStream::new(out.body.into_async_read());
        Ok(Box::pin(stream.map(|r| r.map(|b| b.into()))))
    }

    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> AppResult<ObjectListing> {
        let mut listing = ObjectListing::default();
        let mut token: Option<String> = None;
        loop {
            let out = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_delimiter(delimiter.map(str::to_string))
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| sdk_error(e, format!("Failed to list {prefix}")))?;

            for object in out.contents() {
                if let Some(key) = object.key() {
                    listing.objects.push(ObjectEntry {
                        key: key.to_string(),
                        size: object.size().unwrap_or(0).max(0) as u64,
                        last_modified: object.last_modified().and_then(to_chrono),
                    });
                }
            }
            listing.prefixes.extend(
                out.common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(str::to_string)),
            );

            match out.next_continuation_token() {
                Some(next) if out.is_truncated().unwrap_or(false) => token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(listing)
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, encode_key(from)))
            .key(to)
            .send()
            .await
            .map_err(|e| sdk_error(e, format!("Failed to copy {from} -> {to}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(e, format!("Failed to delete {key}")))?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    fn object_url(&self, key: &str) -> Option<String> {
        Some(match &self.endpoint {
            Some(endpoint) => format!("{endpoint}/{}/{}", self.bucket, encode_key(key)),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket,
                self.region,
                encode_key(key)
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(encode_key("root/CPA 1/a.txt"), "root/CPA%201/a.txt");
        assert_eq!(encode_key("root/A/"), "root/A/");
    }
}
