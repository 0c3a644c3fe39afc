//! [`S3Store`]: blob backend on an S3 bucket.
//!
//! Object key: `<container>/<name>`. S3 has no rename, so [`BlobStore::rename`]
//! is a server-side copy followed by a delete of the source.

use async_trait::async_trait;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream};
use bytes::Bytes;
use protect::{BlobStore, ObjectKey, StorageError};

/// HTTP status S3 returns when `If-None-Match: *` finds an existing object.
const PRECONDITION_FAILED: u16 = 412;
const NOT_FOUND: u16 = 404;

/// S3 blob backend.
#[derive(Clone, Debug)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

fn backend_error(op: &str, key: &ObjectKey, err: impl std::error::Error) -> StorageError {
    StorageError::Backend(format!("s3 {op} {key}: {}", DisplayErrorContext(err)))
}

/// `CopySource` value for an object in `bucket`.
fn copy_source(bucket: &str, key: &ObjectKey) -> String {
    format!("{bucket}/{key}")
}

#[async_trait]
impl BlobStore for S3Store {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn create(&self, key: &ObjectKey, data: Bytes) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.to_string())
            .if_none_match("*")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                if status == Some(PRECONDITION_FAILED) {
                    StorageError::AlreadyExists(key.to_string())
                } else {
                    backend_error("put", key, e)
                }
            })?;
        Ok(())
    }

    async fn read(&self, key: &ObjectKey) -> Result<Bytes, StorageError> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend_error("get", key, e)
                }
            })?;

        let body = out
            .body
            .collect()
            .await
            .map_err(|e| backend_error("read body", key, e))?;
        Ok(body.into_bytes())
    }

    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> Result<(), StorageError> {
        if !self.exists(from).await? {
            return Err(StorageError::NotFound(from.to_string()));
        }
        if self.exists(to).await? {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source(&self.bucket, from))
            .key(to.to_string())
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                if status == Some(NOT_FOUND) {
                    StorageError::NotFound(from.to_string())
                } else {
                    backend_error("copy", from, e)
                }
            })?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(from.to_string())
            .send()
            .await
            .map_err(|e| backend_error("delete", from, e))?;
        Ok(())
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.to_string())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(backend_error("head", key, e)),
        }
    }
}
