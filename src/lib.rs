// ── Tiered Recall ──────────────────────────────────────────────────────────
// Two-tier semantic memory retrieval for realtime agents.
//
//   atoms/   constants, error enum, capability traits, wire types (no I/O)
//   engine/  config loading, concrete adapters, the retrieval engine
//
// Typical host wiring:
//
//   let engine = Arc::new(RetrievalEngine::from_config(RetrievalConfig::load_default()?));
//   engine.spawn_warmup(async move { /* build embedder + collections */ });
//   let response = engine.search("what did I plan for Q3?", 10, SearchOptions::default()).await?;

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{Embedder, RemoteMemorySearch, VectorCollection};
pub use atoms::types::{
    HistorySnapshot, LatencyBreakdown, MemoryRecord, PathTaken, ReadinessStatus, SearchHistoryEntry,
    SearchOptions, SearchResponse, Tier,
};
pub use engine::config::RetrievalConfig;
pub use engine::retrieval::{warm_up_embedder, RetrievalEngine, WarmupHandles};
