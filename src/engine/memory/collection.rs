// Recall Engine — In-Memory Vector Collection
//
// Brute-force cosine search over a fixed-dimension set of vectors. Stands in
// for an on-device vector store (one instance per tier) and backs the tests.
// Distances are cosine distances (`1 - cos`), smallest first.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::VectorCollection;
use crate::atoms::types::{Metadata, RawCandidate};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;

struct StoredVector {
    id: String,
    embedding: Vec<f32>,
    document: Option<String>,
    metadata: Metadata,
}

/// A named, fixed-dimension vector collection held in process memory.
pub struct InMemoryCollection {
    name: String,
    dims: usize,
    entries: RwLock<Vec<StoredVector>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>, dims: usize) -> Self {
        InMemoryCollection {
            name: name.into(),
            dims,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace the vector stored under `id`.
    pub fn insert(
        &self,
        id: impl Into<String>,
        embedding: Vec<f32>,
        document: Option<String>,
        metadata: Metadata,
    ) -> EngineResult<()> {
        if embedding.len() != self.dims {
            return Err(EngineError::Other(format!(
                "collection '{}' expects {}-dim vectors, got {}",
                self.name,
                self.dims,
                embedding.len()
            )));
        }
        let id = id.into();
        let mut entries = self.entries.write();
        let stored = StoredVector { id: id.clone(), embedding, document, metadata };
        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = stored,
            None => entries.push(stored),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl VectorCollection for InMemoryCollection {
    async fn query(&self, vector: &[f32], k: usize) -> EngineResult<Vec<RawCandidate>> {
        if vector.len() != self.dims {
            return Err(EngineError::Other(format!(
                "dimension mismatch on '{}': query has {} dims, collection has {}",
                self.name,
                vector.len(),
                self.dims
            )));
        }

        let entries = self.entries.read();
        let mut scored: Vec<(f64, &StoredVector)> = entries
            .iter()
            .map(|e| (1.0 - cosine_similarity(vector, &e.embedding), e))
            .collect();
        // Stable: equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!("[memory] '{}' query: {} of {} candidates", self.name, scored.len(), entries.len());

        Ok(scored
            .into_iter()
            .map(|(distance, e)| RawCandidate {
                id: e.id.clone(),
                document: e.document.clone(),
                metadata: e.metadata.clone(),
                distance,
            })
            .collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dims)
    }
}

/// Cosine similarity in f64. Zero vectors and length mismatches score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        dot / denom
    }
}
