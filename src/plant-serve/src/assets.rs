//! Startup artifacts kept in a remote bucket and cached on local disk.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use log::{error, info};
use reqwest::Url;

use crate::error::{Error, Result};
use crate::Timer;

/// Remote storage holding the model graph, the label table and the species
/// document.
pub trait ObjectStore: Send + Sync {
    fn download<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Google Cloud Storage over plain HTTPS.
pub struct GcsObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl GcsObjectStore {
    /// `endpoint` is usually `https://storage.googleapis.com`. Without a
    /// `token` only publicly readable objects can be fetched.
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::BadInput(format!("storage endpoint '{}': {}", endpoint, e)))?;

        Ok(GcsObjectStore {
            client: reqwest::Client::new(),
            endpoint,
            token,
        })
    }

    fn object_url(&self, bucket: &str, object: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::BadInput(format!("storage endpoint '{}' cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .push(bucket)
            .extend(object.split('/'));

        Ok(url)
    }
}

impl ObjectStore for GcsObjectStore {
    fn download<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let url = self.object_url(bucket, object)?;
            let missing = |e: reqwest::Error| Error::AssetMissing(format!("{}: {}", url, e));

            let mut request = self.client.get(url.clone());
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let resp = request
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(missing)?;
            let bytes = resp.bytes().await.map_err(missing)?;

            Ok(bytes.to_vec())
        })
    }
}

/// What `ensure` found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    AlreadyPresent,
    Downloaded(usize),
}

pub struct AssetFetcher<S> {
    store: S,
    bucket: String,
}

impl<S: ObjectStore> AssetFetcher<S> {
    pub fn new(store: S, bucket: &str) -> Self {
        AssetFetcher {
            store,
            bucket: bucket.to_owned(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Download `object` into `local_path` unless that file already exists.
    ///
    /// The payload goes to a sibling temporary file first so a failed
    /// download never leaves a truncated artifact behind.
    pub async fn ensure(&self, object: &str, local_path: &Path) -> Result<Fetched> {
        if tokio::fs::try_exists(local_path).await.unwrap_or(false) {
            return Ok(Fetched::AlreadyPresent);
        }

        let mut t = Timer::start(&format!("Fetching {}/{}", self.bucket, object));
        let bytes = self.store.download(&self.bucket, object).await?;

        let io_err = |e: std::io::Error| Error::AssetMissing(format!("{}: {}", local_path.display(), e));
        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let partial = partial_path(local_path);
        tokio::fs::write(&partial, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&partial, local_path).await.map_err(io_err)?;

        t.stop();
        info!("Downloaded {} ({} bytes) to {}", object, bytes.len(), local_path.display());

        Ok(Fetched::Downloaded(bytes.len()))
    }

    /// `ensure`, with failures logged instead of returned. Returns whether
    /// the artifact is now on disk.
    pub async fn ensure_logged(&self, object: &str, local_path: &Path) -> bool {
        match self.ensure(object, local_path).await {
            Ok(_) => true,
            Err(e) => {
                error!("Could not fetch {} from {}: {}", object, self.bucket, e);
                false
            }
        }
    }

    /// Fetch every `(object, local_path)` pair, continuing past failures.
    pub async fn ensure_all(&self, assets: &[(&str, &Path)]) -> Vec<bool> {
        let mut present = Vec::with_capacity(assets.len());
        for (object, path) in assets {
            present.push(self.ensure_logged(object, path).await);
        }
        present
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        objects: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl ObjectStore for MemoryStore {
        fn download<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let found = self
                .objects
                .get(object)
                .cloned()
                .ok_or_else(|| Error::AssetMissing(format!("{}/{}", bucket, object)));
            Box::pin(async move { found })
        }
    }

    fn store_with(name: &str, data: &[u8]) -> MemoryStore {
        let mut store = MemoryStore::default();
        store.objects.insert(name.to_owned(), data.to_vec());
        store
    }

    #[tokio::test]
    async fn downloads_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/clases.txt");
        let fetcher = AssetFetcher::new(store_with("clases.txt", b"a_b\n"), "bucket");

        let fetched = fetcher.ensure("clases.txt", &path).await.unwrap();

        assert_eq!(fetched, Fetched::Downloaded(4));
        assert_eq!(std::fs::read(&path).unwrap(), b"a_b\n");
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn existing_file_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plantas.json");
        std::fs::write(&path, b"{}").unwrap();
        let fetcher = AssetFetcher::new(store_with("plantas.json", b"changed"), "bucket");

        let fetched = fetcher.ensure("plantas.json", &path).await.unwrap();

        assert_eq!(fetched, Fetched::AlreadyPresent);
        assert_eq!(fetcher.store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn failed_download_is_logged_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.pb");
        let labels = dir.path().join("clases.txt");
        let fetcher = AssetFetcher::new(store_with("clases.txt", b"x"), "bucket");

        let present = fetcher
            .ensure_all(&[("model.pb", model.as_path()), ("clases.txt", labels.as_path())])
            .await;

        assert_eq!(present, vec![false, true]);
        assert!(!model.exists());
        assert!(labels.exists());
    }

    #[test]
    fn object_keys_are_path_encoded() {
        let store = GcsObjectStore::new("https://storage.googleapis.com", None).unwrap();
        let url = store.object_url("my-bucket", "models/modelo resnet.pb").unwrap();

        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/my-bucket/models/modelo%20resnet.pb"
        );
    }
}
