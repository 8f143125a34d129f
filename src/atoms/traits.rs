// ── Recall Atoms: Capability Traits ────────────────────────────────────────
// The three external collaborators the engine consumes. Implementations live
// in engine/memory/ (HTTP embedder, in-memory collection, HTTP memory
// service) or in the host application.
//
// All traits are object-safe; the engine holds them as `Arc<dyn Trait>`.

use async_trait::async_trait;

use crate::atoms::error::EngineResult;
use crate::atoms::types::{RawCandidate, RemoteSearchResult};

/// Turns text into a fixed-dimension vector.
///
/// Must be deterministic for identical input within a process lifetime.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Output dimension, when known up front.
    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// One vector collection (one per tier).
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// Return at most `k` candidates nearest to `vector`.
    /// An empty collection yields an empty list, not an error.
    async fn query(&self, vector: &[f32], k: usize) -> EngineResult<Vec<RawCandidate>>;

    /// Vector dimension of the collection, when known.
    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// Remote service that embeds and searches on the caller's behalf.
#[async_trait]
pub trait RemoteMemorySearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        enable_graph_search: bool,
    ) -> EngineResult<RemoteSearchResult>;
}
