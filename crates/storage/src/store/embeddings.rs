#![forbid(unsafe_code)]

use rusqlite::params;

use super::error::StoreError;
use super::sqlite::SqliteStore;
use super::types::{EmbeddingItem, EmbeddingMatch};

/// Standard cosine similarity; zero vectors match nothing.
pub(in crate::store) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl SqliteStore {
    pub(in crate::store) fn insert_embeddings_impl(
        &mut self,
        project_id: &str,
        items: Vec<EmbeddingItem>,
    ) -> Result<Vec<String>, StoreError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let now_ms = super::now_ms();
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if item.content.trim().is_empty() {
                return Err(StoreError::InvalidInput(
                    "embedding.content must not be empty",
                ));
            }
            let id = uuid::Uuid::new_v4().to_string();
            let embedding_json = serde_json::to_string(&item.embedding)?;
            let metadata_json = serde_json::to_string(&item.metadata)?;
            tx.execute(
                "INSERT INTO embeddings(id, project_id, content, embedding, metadata, created_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, project_id, item.content, embedding_json, metadata_json, now_ms],
            )?;
            ids.push(id);
        }
        tx.commit()?;
        Ok(ids)
    }

    pub(in crate::store) fn match_embeddings_impl(
        &mut self,
        project_id: &str,
        query: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, embedding, metadata FROM embeddings WHERE project_id=?1",
        )?;
        let mut rows = stmt.query(params![project_id])?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let content: String = row.get(1)?;
            let embedding_json: String = row.get(2)?;
            let metadata_json: String = row.get(3)?;
            let embedding: Vec<f32> = serde_json::from_str(&embedding_json)?;
            let similarity = cosine_similarity(query, &embedding);
            if similarity >= threshold {
                matches.push(EmbeddingMatch {
                    id,
                    content,
                    metadata: serde_json::from_str(&metadata_json)?,
                    similarity,
                });
            }
        }

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(count);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::cosine_similarity;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5f32, -0.25, 0.75];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn mismatched_or_zero_vectors_match_nothing() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
