//! Object storage access (S3, R2, GCS, Azure, local filesystem)
//!
//! [`LakeStore`] is the get/put/list/copy/delete view of one storage root.
//! Keys are `/`-separated and relative to the root; they round-trip exactly
//! through [`LakeStore::list`].

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;

/// A storage root parsed from a URL
#[derive(Debug, Clone)]
pub struct LakeStore {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// Original URL scheme for logging
    scheme: String,
}

impl LakeStore {
    /// Parse a root URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `/local/path/`, `./path/` or `file:///path` - Local filesystem
    ///
    /// Credentials are read from the environment by the store builders.
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else {
            Self::parse_local(url)
        }
    }

    /// Wrap an existing store
    pub fn from_store(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: normalize_prefix(&prefix.into()),
            scheme: "store".to_string(),
        }
    }

    /// Split `bucket/some/prefix` into bucket and prefix
    fn split_bucket(without_scheme: &str) -> (&str, String) {
        match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                normalize_prefix(&without_scheme[idx + 1..]),
            ),
            None => (without_scheme, String::new()),
        }
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

        let (bucket, prefix) = Self::split_bucket(without_scheme);

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: scheme.to_string(),
        })
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("gs://")
            .ok_or_else(|| Error::config(format!("Invalid GCS URL: {url}")))?;

        let (bucket, prefix) = Self::split_bucket(without_scheme);

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "gs".to_string(),
        })
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("az://")
            .ok_or_else(|| Error::config(format!("Invalid Azure URL: {url}")))?;

        let (container, prefix) = Self::split_bucket(without_scheme);

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "az".to_string(),
        })
    }

    /// Parse local filesystem path
    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// Check if this is a cloud store (not local)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "store")
    }

    /// Get the scheme (s3, r2, gs, az, file, store)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Prefix of this root inside its bucket
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A root one level deeper on the same store
    pub fn child(&self, sub: &str) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.join(sub),
            scheme: self.scheme.clone(),
        }
    }

    /// Human-readable location of a key, for logs and reports
    pub fn display_key(&self, key: &str) -> String {
        format!("{}://{}", self.scheme, self.join(key))
    }

    /// Join a relative key onto the prefix
    fn join(&self, key: &str) -> String {
        let key = key.trim_matches('/');
        match (self.prefix.is_empty(), key.is_empty()) {
            (true, _) => key.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{key}", self.prefix),
        }
    }

    /// Object path for a relative key
    fn path(&self, key: &str) -> Result<ObjectPath> {
        let full = self.join(key);
        ObjectPath::parse(&full).map_err(|e| Error::storage(full, e.to_string()))
    }

    /// Read a whole object
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.path(key)?;
        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => Error::FileNotFound {
                path: self.display_key(key),
            },
            other => Error::storage(self.display_key(key), other.to_string()),
        })?;
        result
            .bytes()
            .await
            .map_err(|e| Error::storage(self.display_key(key), e.to_string()))
    }

    /// Write a whole object, replacing any previous version
    ///
    /// A single put is atomic: readers see the old object or the new one.
    pub async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        let path = self.path(key)?;
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::storage(self.display_key(key), format!("write failed: {e}")))?;
        Ok(self.display_key(key))
    }

    /// List every key below `sub` (or the whole root), sorted
    pub async fn list(&self, sub: Option<&str>) -> Result<Vec<String>> {
        let base = match sub {
            Some(sub) => self.join(sub),
            None => self.prefix.clone(),
        };
        let list_prefix = if base.is_empty() {
            None
        } else {
            Some(ObjectPath::parse(&base).map_err(|e| Error::storage(&base, e.to_string()))?)
        };

        let metas: Vec<_> = self
            .store
            .list(list_prefix.as_ref())
            .try_collect()
            .await
            .map_err(|e| Error::storage(&base, format!("list failed: {e}")))?;

        let mut keys: Vec<String> = metas
            .into_iter()
            .filter_map(|meta| self.relative_key(meta.location.as_ref()))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Strip this root's prefix from a full location
    fn relative_key(&self, location: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return Some(location.to_string());
        }
        location
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(String::from)
    }

    /// Check whether a key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path(key)?;
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(Error::storage(self.display_key(key), e.to_string())),
        }
    }

    /// Copy one key to another, replacing the destination
    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let (src, dst) = (self.path(from)?, self.path(to)?);
        self.store.copy(&src, &dst).await.map_err(|e| {
            Error::storage(
                self.display_key(to),
                format!("copy from {} failed: {e}", self.display_key(from)),
            )
        })
    }

    /// Delete a key; deleting a missing key is not an error
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(Error::storage(
                self.display_key(key),
                format!("delete failed: {e}"),
            )),
        }
    }
}

/// Trim slashes so prefixes join cleanly
fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_store() -> LakeStore {
        LakeStore::from_store(Arc::new(InMemory::new()), "lake/")
    }

    #[test]
    fn test_parse_local_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().to_str().unwrap();
        let store = LakeStore::parse(path).unwrap();
        assert_eq!(store.scheme(), "file");
        assert!(!store.is_cloud());
    }

    #[test]
    fn test_parse_file_url() {
        let temp_dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", temp_dir.path().display());
        let store = LakeStore::parse(&url).unwrap();
        assert_eq!(store.scheme(), "file");
    }

    #[test]
    fn test_child_prefix() {
        let store = memory_store();
        assert_eq!(store.prefix(), "lake");
        let songs = store.child("/songs/");
        assert_eq!(songs.prefix(), "lake/songs");
        assert_eq!(songs.display_key("a.parquet"), "store://lake/songs/a.parquet");
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = memory_store();
        store.put("a/b.json", Bytes::from_static(b"{}")).await.unwrap();
        assert_eq!(store.get("a/b.json").await.unwrap(), Bytes::from_static(b"{}"));
        assert!(store.exists("a/b.json").await.unwrap());
        assert!(!store.exists("a/c.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = memory_store();
        let err = store.get("nope.json").await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_sorted_and_relative() {
        let store = memory_store();
        for key in ["b/2.json", "a/1.json", "b/1.json"] {
            store.put(key, Bytes::from_static(b"x")).await.unwrap();
        }
        assert_eq!(
            store.list(None).await.unwrap(),
            vec!["a/1.json", "b/1.json", "b/2.json"]
        );
        assert_eq!(store.list(Some("b")).await.unwrap(), vec!["b/1.json", "b/2.json"]);
        assert_eq!(
            store.child("b").list(None).await.unwrap(),
            vec!["1.json", "2.json"]
        );
    }

    #[tokio::test]
    async fn test_copy_and_delete() {
        let store = memory_store();
        store.put("src", Bytes::from_static(b"data")).await.unwrap();
        store.copy("src", "dst").await.unwrap();
        store.delete("src").await.unwrap();
        store.delete("src").await.unwrap();

        assert!(!store.exists("src").await.unwrap());
        assert_eq!(store.get("dst").await.unwrap(), Bytes::from_static(b"data"));
    }
}
