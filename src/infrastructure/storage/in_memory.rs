use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::domain::{ports::BlobStore, DomainError};
use crate::infrastructure::supabase::public_object_url;

/// Bucket held in memory; objects are addressable by their public URL.
pub struct InMemoryBlobStore {
    base_url: String,
    bucket: String,
    objects: RwLock<BTreeMap<String, (Vec<u8>, String)>>,
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes and content type stored at `path`.
    pub fn get(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects.read().ok()?.get(path).cloned()
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        let prefix = public_object_url(&self.base_url, &self.bucket, "");
        url.strip_prefix(&prefix).map(str::to_string)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> Result<String, DomainError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if objects.contains_key(path) {
            return Err(DomainError::conflict(format!("{path} already exists")));
        }
        objects.insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(self.public_url(path))
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>, DomainError> {
        let objects = self
            .objects
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let prefix = format!("{}/", folder.trim_end_matches('/'));
        Ok(objects
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        self.path_for_url(url)
            .and_then(|path| self.get(&path))
            .map(|(bytes, _)| bytes)
            .ok_or_else(|| DomainError::transport(format!("could not fetch {url}: 404")))
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.base_url, &self.bucket, path)
    }
}
