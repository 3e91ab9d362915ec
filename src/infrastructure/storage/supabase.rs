use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ports::BlobStore, DomainError};
use crate::infrastructure::http::transport_error;
use crate::infrastructure::supabase::SupabaseClient;

const LIST_PAGE_SIZE: usize = 1000;
const FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

pub struct SupabaseStorage {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
    /// Null for sub-folders.
    id: Option<String>,
}

fn object_names(objects: Vec<ListedObject>) -> impl Iterator<Item = String> {
    objects
        .into_iter()
        .filter(|o| o.id.is_some() && o.name != FOLDER_PLACEHOLDER)
        .map(|o| o.name)
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> Result<String, DomainError> {
        let url = self
            .client
            .storage_url(&format!("object/{}/{}", self.bucket, path))?;
        let request = self
            .client
            .http()
            .post(url)
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes);

        self.client.send_storage(request).await?;
        tracing::debug!(bucket = %self.bucket, path, "object uploaded");
        Ok(self.public_url(path))
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>, DomainError> {
        let url = self
            .client
            .storage_url(&format!("object/list/{}", self.bucket))?;

        let mut names = Vec::new();
        let mut offset = 0;
        loop {
            let body = ListRequest {
                prefix: folder,
                limit: LIST_PAGE_SIZE,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            };
            let page: Vec<ListedObject> = self
                .client
                .send_storage(self.client.http().post(url.clone()).json(&body))
                .await?
                .json()
                .await
                .map_err(|e| DomainError::external(format!("invalid list response: {e}")))?;

            let page_len = page.len();
            names.extend(object_names(page));
            if page_len < LIST_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        Ok(names)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        let response = self
            .client
            .http()
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::transport(format!(
                "could not fetch {url}: {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    fn public_url(&self, path: &str) -> String {
        self.client.public_url(&self.bucket, path)
    }
}
