use std::{collections::HashMap, future::Future, path::PathBuf, sync::Arc};

use crate::error::LoadCause;
use crate::registry::DatasetLocator;

/// Read-only access to boundary datasets by locator.
pub trait BoundarySource: Send + Sync {
    fn fetch(&self, locator: &DatasetLocator) -> impl Future<Output = Result<Vec<u8>, LoadCause>> + Send;
}

impl<S: BoundarySource> BoundarySource for Arc<S> {
    fn fetch(&self, locator: &DatasetLocator) -> impl Future<Output = Result<Vec<u8>, LoadCause>> + Send {
        (**self).fetch(locator)
    }
}

/// Simple in-memory source.
/// Keys are dataset names, e.g. "regions/75.geojson"; URLs and paths are looked up by their text.
#[derive(Debug, Default, Clone)]
pub struct MemSource {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemSource {
    pub fn new(files: HashMap<String, Arc<[u8]>>) -> Self { Self { files } }

    pub fn insert(&mut self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(key.into(), Arc::from(bytes.into()));
    }

    fn key(locator: &DatasetLocator) -> String {
        match locator {
            DatasetLocator::Key(key) => key.clone(),
            DatasetLocator::Url(url) => url.clone(),
            DatasetLocator::Path(path) => path.display().to_string(),
        }
    }
}

impl BoundarySource for MemSource {
    async fn fetch(&self, locator: &DatasetLocator) -> Result<Vec<u8>, LoadCause> {
        let key = Self::key(locator);
        self.files.get(&key)
            .map(|bytes| bytes.to_vec())
            .ok_or(LoadCause::Missing(key))
    }
}

/// Simple disk-based source. Keys resolve relative to `root`.
#[derive(Debug, Clone)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    fn full(&self, locator: &DatasetLocator) -> Result<PathBuf, LoadCause> {
        match locator {
            DatasetLocator::Path(path) => Ok(path.clone()),
            DatasetLocator::Key(rel) => Ok(self.root.join(rel)),
            DatasetLocator::Url(url) => Err(LoadCause::Missing(format!("disk source cannot fetch {url}"))),
        }
    }
}

impl BoundarySource for DiskSource {
    async fn fetch(&self, locator: &DatasetLocator) -> Result<Vec<u8>, LoadCause> {
        let path = self.full(locator)?;
        tokio::fs::read(&path).await.map_err(|source| LoadCause::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Fetches `Url` locators over HTTP(S); other locators fall back to the local disk.
#[cfg(feature = "download")]
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: reqwest::Client,
}

#[cfg(feature = "download")]
impl HttpSource {
    pub fn new(client: reqwest::Client) -> Self { Self { client } }
}

#[cfg(feature = "download")]
impl BoundarySource for HttpSource {
    async fn fetch(&self, locator: &DatasetLocator) -> Result<Vec<u8>, LoadCause> {
        let url = match locator {
            DatasetLocator::Url(url) => url,
            other => return DiskSource::new(".").fetch(other).await,
        };

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadCause::Status { url: url.clone(), status: status.as_u16() });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mem_source_serves_keys() {
        let mut source = MemSource::default();
        source.insert("regions.geojson", b"{}".to_vec());

        let bytes = source.fetch(&DatasetLocator::Key("regions.geojson".into())).await.unwrap();
        assert_eq!(bytes, b"{}");

        let missing = source.fetch(&DatasetLocator::Key("regions/01.geojson".into())).await;
        assert!(matches!(missing, Err(LoadCause::Missing(key)) if key == "regions/01.geojson"));
    }

    #[tokio::test]
    async fn disk_source_reads_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("regions")).unwrap();
        std::fs::write(dir.path().join("regions/01.geojson"), b"data").unwrap();

        let source = DiskSource::new(dir.path());
        let bytes = source.fetch(&DatasetLocator::Key("regions/01.geojson".into())).await.unwrap();
        assert_eq!(bytes, b"data");

        let err = source.fetch(&DatasetLocator::Key("regions/02.geojson".into())).await.unwrap_err();
        assert!(matches!(err, LoadCause::Io { .. }));
        let err = source.fetch(&DatasetLocator::Url("https://example.org".into())).await.unwrap_err();
        assert!(matches!(err, LoadCause::Missing(_)));
    }
}
