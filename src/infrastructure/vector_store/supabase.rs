use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, EmbeddingRecord, ModelTag, RankedRecord,
    StoredRecord,
};
use crate::infrastructure::supabase::SupabaseClient;

/// Embedding table plus its `search_*` RPC, both named after the model tag.
pub struct SupabaseVectorStore {
    client: SupabaseClient,
    table: String,
    search_function: String,
}

impl SupabaseVectorStore {
    pub fn new(client: SupabaseClient, tag: &ModelTag) -> Self {
        Self {
            client,
            table: tag.table_name(),
            search_function: tag.search_function(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[derive(Serialize)]
struct SearchParams<'a> {
    query_embedding: &'a [f32],
    match_threshold: f64,
    match_count: usize,
    user_id_filter: Option<String>,
}

#[derive(Deserialize)]
struct SearchRow {
    vector_record: SearchRecord,
    distance: f64,
}

#[derive(Deserialize)]
struct SearchRecord {
    id: i64,
    filename: String,
    image_url: String,
}

impl From<SearchRow> for RankedRecord {
    fn from(row: SearchRow) -> Self {
        Self {
            id: row.vector_record.id,
            filename: row.vector_record.filename,
            image_url: row.vector_record.image_url,
            distance: row.distance,
        }
    }
}

fn into_ranked(rows: Vec<SearchRow>, top_k: usize) -> Vec<RankedRecord> {
    let mut ranked: Vec<RankedRecord> = rows.into_iter().map(RankedRecord::from).collect();
    // the RPC already orders by distance; a stable sort keeps its tie order
    ranked.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(top_k);
    ranked
}

#[async_trait]
impl VectorStore for SupabaseVectorStore {
    async fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError> {
        let url = self.client.rest_url(&self.table)?;
        let request = self
            .client
            .http()
            .post(url)
            .header("Prefer", "return=minimal")
            .json(record);

        self.client.send_rest(request).await?;
        tracing::debug!(table = %self.table, filename = %record.filename, "embedding inserted");
        Ok(())
    }

    async fn rank(
        &self,
        query: &Embedding,
        top_k: usize,
        min_similarity: f64,
    ) -> Result<Vec<RankedRecord>, DomainError> {
        let url = self
            .client
            .rest_url(&format!("rpc/{}", self.search_function))?;
        let params = SearchParams {
            query_embedding: query.as_slice(),
            match_threshold: min_similarity,
            match_count: top_k,
            user_id_filter: None,
        };

        let rows: Vec<SearchRow> = self
            .client
            .send_rest(self.client.http().post(url).json(&params))
            .await?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("invalid search response: {e}")))?;

        Ok(into_ranked(rows, top_k))
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<StoredRecord>, DomainError> {
        let mut url = self.client.rest_url(&self.table)?;
        url.query_pairs_mut()
            .append_pair("select", "id,filename,image_url,embedding")
            .append_pair("filename", &format!("eq.{filename}"))
            .append_pair("limit", "1");

        let rows: Vec<StoredRecord> = self
            .client
            .send_rest(self.client.http().get(url))
            .await?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("invalid row: {e}")))?;

        Ok(rows.into_iter().next())
    }
}
