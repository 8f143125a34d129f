// Recall Engine — tiered semantic memory retrieval
// Local embedder + per-tier vector collections on the fast path, an HTTP
// memory service as fallback, with latency accounting and search history.

pub mod config;
pub mod memory;
pub mod retrieval;
