//! Object-store extraction.
//!
//! Objects are addressed by `s3://bucket/key` URIs. Reads go through the async
//! `object_store` client, driven to completion on a private current-thread runtime so
//! callers stay synchronous.

use std::fmt;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::runtime::{Builder, Runtime};

use crate::config::Credentials;
use crate::error::{EtlError, EtlResult};
use crate::types::{DataSet, SourceKind};

use super::csv::read_csv_from_bytes;

/// Bucket and key of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    /// Parse `s3://bucket/key/with/slashes`.
    pub fn parse(uri: &str) -> EtlResult<Self> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| EtlError::config(format!("'{uri}' is not an s3:// uri")))?;
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(EtlError::config(format!("'{uri}' must name a bucket and a key"))),
        }
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Fetches whole objects.
pub trait ObjectStorage {
    fn get_object(&self, locator: &ObjectLocator) -> EtlResult<Vec<u8>>;
}

/// Amazon S3 storage; a client is built per bucket.
///
/// Credentials keys (all optional): `region`, `access_key_id`, `secret_access_key`,
/// `anonymous` (`"true"` skips request signing for public buckets). Anything not given
/// falls back to the standard `AWS_*` environment variables.
pub struct S3Storage {
    runtime: Runtime,
    credentials: Credentials,
}

impl S3Storage {
    pub fn from_credentials(credentials: &Credentials) -> EtlResult<Self> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            credentials: credentials.clone(),
        })
    }

    fn client_for(&self, bucket: &str) -> EtlResult<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = self.credentials.get("region") {
            builder = builder.with_region(region);
        }
        if let (Some(key), Some(secret)) = (
            self.credentials.get("access_key_id"),
            self.credentials.get("secret_access_key"),
        ) {
            builder = builder.with_access_key_id(key).with_secret_access_key(secret);
        }
        if self.credentials.flag("anonymous") {
            builder = builder.with_skip_signature(true);
        }
        let store = builder
            .build()
            .map_err(|e| EtlError::config(format!("s3 client for bucket '{bucket}': {e}")))?;
        Ok(Arc::new(store))
    }
}

impl ObjectStorage for S3Storage {
    fn get_object(&self, locator: &ObjectLocator) -> EtlResult<Vec<u8>> {
        let store = self.client_for(&locator.bucket)?;
        self.runtime
            .block_on(fetch(store.as_ref(), &locator.key))
            .map_err(|e| storage_error(locator, e))
    }
}

/// Storage over an existing [`ObjectStore`] (in-memory, local filesystem, ...).
///
/// The bucket part of a locator is ignored; keys resolve against the wrapped store.
pub struct StoreBackedStorage {
    store: Arc<dyn ObjectStore>,
    runtime: Runtime,
}

impl StoreBackedStorage {
    pub fn new(store: Arc<dyn ObjectStore>) -> EtlResult<Self> {
        Ok(Self {
            store,
            runtime: current_thread_runtime()?,
        })
    }
}

impl ObjectStorage for StoreBackedStorage {
    fn get_object(&self, locator: &ObjectLocator) -> EtlResult<Vec<u8>> {
        self.runtime
            .block_on(fetch(self.store.as_ref(), &locator.key))
            .map_err(|e| storage_error(locator, e))
    }
}

/// Fetch a delimited-text object and parse it into a dataset.
pub fn read_delimited_object(
    storage: &dyn ObjectStorage,
    locator: &ObjectLocator,
) -> EtlResult<DataSet> {
    let bytes = storage.get_object(locator)?;
    tracing::debug!(object = %locator, bytes = bytes.len(), "fetched object");
    let ds = read_csv_from_bytes(&bytes).map_err(|e| match e {
        EtlError::Csv(err) => EtlError::format(locator.to_string(), err),
        other => other,
    })?;
    Ok(ds.with_source(SourceKind::ObjectStore))
}

async fn fetch(store: &dyn ObjectStore, key: &str) -> object_store::Result<Vec<u8>> {
    let result = store.get(&ObjectPath::from(key)).await?;
    Ok(result.bytes().await?.to_vec())
}

fn storage_error(locator: &ObjectLocator, err: object_store::Error) -> EtlError {
    match err {
        object_store::Error::NotFound { .. } => {
            EtlError::unavailable(locator.to_string(), "object not found")
        }
        other => EtlError::unavailable(locator.to_string(), other),
    }
}

fn current_thread_runtime() -> EtlResult<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}
