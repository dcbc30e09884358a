#![forbid(unsafe_code)]
//! Thin vector-search facility: OpenAI embeddings in, cosine matches out.

use serde_json::{Value as JsonValue, json};

use ax_storage::EmbeddingItem;
pub use ax_storage::EmbeddingMatch as SearchHit;

use crate::error::CenterError;
use crate::http::{call_with_retry, http_agent};
use crate::NerveCenter;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const EMBEDDING_MODEL: &str = "text-embedding-3-small";
const SIMILARITY_THRESHOLD: f32 = 0.3;
const MAX_INDEXED_CHARS: usize = 8000;
const OVERFETCH: usize = 20;

pub(crate) struct Rag {
    agent: ureq::Agent,
    api_key: String,
}

impl Rag {
    pub(crate) fn new(api_key: String) -> Self {
        Self {
            agent: http_agent(),
            api_key,
        }
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, CenterError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "model": EMBEDDING_MODEL, "input": inputs });
        let response = call_with_retry("embeddings api", || {
            self.agent
                .post(EMBEDDINGS_URL)
                .set("Authorization", &format!("Bearer {}", self.api_key))
                .set("Content-Type", "application/json")
                .send_json(body.clone())
        })?;

        let data = response
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                CenterError::Store(ax_storage::StoreError::InvalidInput(
                    "embeddings response missing data",
                ))
            })?;
        let mut vectors = Vec::with_capacity(data.len());
        for entry in data {
            let values = entry
                .get("embedding")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    CenterError::Store(ax_storage::StoreError::InvalidInput(
                        "embeddings response missing vector",
                    ))
                })?;
            vectors.push(
                values
                    .iter()
                    .filter_map(|v| v.as_f64())
                    .map(|v| v as f32)
                    .collect::<Vec<f32>>(),
            );
        }
        if vectors.len() != inputs.len() {
            return Err(CenterError::Store(ax_storage::StoreError::InvalidInput(
                "embeddings response count mismatch",
            )));
        }
        Ok(vectors)
    }
}

impl NerveCenter {
    fn rag(&self) -> Result<&Rag, CenterError> {
        self.rag.as_ref().ok_or_else(|| {
            CenterError::NotConfigured("OPENAI_API_KEY is not set; vector search is off".to_string())
        })
    }

    /// Embeds and stores arbitrary content items. Returns the stored ids.
    pub fn index_items(
        &mut self,
        project_id: &str,
        items: Vec<(String, JsonValue)>,
    ) -> Result<Vec<String>, CenterError> {
        if items.is_empty() {
            return Err(CenterError::bad_request("items must not be empty"));
        }
        let contents: Vec<String> = items
            .iter()
            .map(|(content, _)| content.chars().take(MAX_INDEXED_CHARS).collect())
            .collect();
        let vectors = self.rag()?.embed(&contents)?;

        let rows = contents
            .into_iter()
            .zip(vectors)
            .zip(items.into_iter().map(|(_, metadata)| metadata))
            .map(|((content, embedding), metadata)| EmbeddingItem {
                content,
                embedding,
                metadata,
            })
            .collect();
        Ok(self.store.insert_embeddings(project_id, rows)?)
    }

    /// Indexes one source file for `search_codebase`.
    pub fn index_file(
        &mut self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<String, CenterError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(CenterError::bad_request("path must not be empty"));
        }
        let ids = self.index_items(
            project_id,
            vec![(
                format!("{path}\n{content}"),
                json!({ "path": path, "kind": "file" }),
            )],
        )?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    pub fn search(
        &mut self,
        project_id: &str,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchHit>, CenterError> {
        self.search_filtered(project_id, query, count, |_| true)
    }

    pub fn search_codebase(
        &mut self,
        project_id: &str,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchHit>, CenterError> {
        self.search_filtered(project_id, query, count, |hit| {
            hit.metadata.get("kind").and_then(|v| v.as_str()) == Some("file")
        })
    }

    pub fn search_docs(
        &mut self,
        project_id: &str,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchHit>, CenterError> {
        self.search_filtered(project_id, query, count, |hit| {
            hit.metadata.get("kind").and_then(|v| v.as_str()) != Some("file")
        })
    }

    fn search_filtered(
        &mut self,
        project_id: &str,
        query: &str,
        count: usize,
        keep: impl Fn(&SearchHit) -> bool,
    ) -> Result<Vec<SearchHit>, CenterError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CenterError::bad_request("query must not be empty"));
        }
        let count = count.clamp(1, 50);
        let vectors = self.rag()?.embed(&[query.to_string()])?;
        let query_vec = vectors.into_iter().next().unwrap_or_default();

        let mut hits = self.store.match_embeddings(
            project_id,
            &query_vec,
            SIMILARITY_THRESHOLD,
            count.max(OVERFETCH),
        )?;
        hits.retain(|hit| keep(hit));
        hits.truncate(count);
        Ok(hits)
    }
}
