use crate::types::{BrowseError, BrowseResult};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::Path;

/// Destination for finished browse products
pub trait Uploader {
    /// Upload a local file under `key`
    fn upload(&self, local_path: &Path, key: &str) -> BrowseResult<()>;

    /// Upload under the file's own name
    fn upload_file(&self, local_path: &Path) -> BrowseResult<()> {
        let name = local_path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| BrowseError::Upload {
                path: local_path.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;
        self.upload(local_path, name)
    }
}

/// Join an optional prefix and a key with exactly one `/`
pub fn object_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key.trim_start_matches('/'))
    }
}

/// S3 uploads through `object_store`; credentials and region come from the
/// standard AWS environment variables.
pub struct S3Uploader {
    store: AmazonS3,
    bucket: String,
    prefix: String,
    runtime: tokio::runtime::Runtime,
}

impl S3Uploader {
    pub fn new(bucket: &str, prefix: &str) -> BrowseResult<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| {
                BrowseError::Config(format!("Failed to create S3 client for {}: {}", bucket, e))
            })?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            store,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            runtime,
        })
    }
}

impl Uploader for S3Uploader {
    fn upload(&self, local_path: &Path, key: &str) -> BrowseResult<()> {
        let key = object_key(&self.prefix, key);
        log::info!("Uploading {} to s3://{}/{}", local_path.display(), self.bucket, key);

        let data = bytes::Bytes::from(std::fs::read(local_path)?);
        let location = ObjectPath::from(key.as_str());
        self.runtime
            .block_on(self.store.put(&location, data.into()))
            .map_err(|e| BrowseError::Upload {
                path: local_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
