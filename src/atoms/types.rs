// ── Recall Atoms: Pure Data Types ──────────────────────────────────────────
// Plain struct/enum definitions shared by every layer.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.
//
// Wire names are camelCase so telemetry/UI consumers can take the JSON as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atoms::constants::{TIER0_COLLECTION, TIER1_COLLECTION};

/// Opaque key/value mapping passed through verbatim to consumers.
pub type Metadata = serde_json::Map<String, Value>;

// ── Tiers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Curated goals / OKRs.
    Tier0,
    /// General memories.
    Tier1,
}

impl Tier {
    /// Fan-out order. Also the tie-break order for equal scores.
    pub const ALL: [Tier; 2] = [Tier::Tier0, Tier::Tier1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier0 => "tier0",
            Tier::Tier1 => "tier1",
        }
    }

    pub fn collection_name(&self) -> &'static str {
        match self {
            Tier::Tier0 => TIER0_COLLECTION,
            Tier::Tier1 => TIER1_COLLECTION,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Vector collection output ───────────────────────────────────────────────

/// One candidate as returned by a vector collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub id: String,
    /// The collection's document field; may be missing.
    pub document: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Cosine distance to the query vector (`1 - similarity`).
    pub distance: f64,
}

// ── Retrieved records ──────────────────────────────────────────────────────

/// One retrieved memory, normalized from either path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Unique within its tier only; `(tier, id)` is the identity.
    pub id: String,
    /// `None` when the source had no usable content.
    pub content: Option<String>,
    /// Similarity to the query in [0,1]. The ranking key.
    pub query_similarity: f64,
    /// Server/curation composite score; 0.0 when the source carries none.
    pub relevance_score: f64,
    pub tags: Vec<String>,
    pub topics: Vec<String>,
    pub tier: Tier,
    pub metadata: Metadata,
}

// ── Latency ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTaken {
    LocalFast,
    RemoteFallback,
}

/// Per-search timing. `total_ms >= embedding_ms + vector_search_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyBreakdown {
    pub total_ms: f64,
    pub embedding_ms: f64,
    pub vector_search_ms: f64,
    pub overhead_ms: f64,
    pub path_taken: PathTaken,
    /// Measured remote round-trip; only set on the fallback path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_call_ms: Option<f64>,
    /// True when `embedding_ms` / `vector_search_ms` are a heuristic split
    /// rather than measured values.
    pub estimated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ── Search request / response ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    /// Forwarded to the remote service; the local path has no graph.
    pub enable_graph_search: bool,
    pub search_tier0: bool,
    pub search_tier1: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            enable_graph_search: false,
            search_tier0: true,
            search_tier1: true,
        }
    }
}

impl SearchOptions {
    pub fn includes(&self, tier: Tier) -> bool {
        match tier {
            Tier::Tier0 => self.search_tier0,
            Tier::Tier1 => self.search_tier1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub records: Vec<MemoryRecord>,
    pub latency: LatencyBreakdown,
    /// Id of the history entry recorded for this search.
    pub search_id: String,
}

// ── Search history ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPreview {
    /// At most 100 characters; `None` when the record had no content.
    pub content: Option<String>,
    /// At most 3 topics.
    pub topics: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub result_count: usize,
    pub enable_graph_search: bool,
    pub latency: LatencyBreakdown,
    pub top_score: f64,
    pub top_preview: Vec<MemoryPreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    /// Oldest first.
    pub entries: Vec<SearchHistoryEntry>,
    pub count: usize,
}

// ── Readiness ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessStatus {
    pub fast_path_ready: bool,
    pub embedder_ready: bool,
    pub collection_ready: bool,
    pub init_complete: bool,
}

// ── Remote memory service ──────────────────────────────────────────────────

/// A memory as returned by the remote search service. Every field is
/// optional; normalization decides what each absence means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteMemory {
    pub id: Option<String>,
    pub content: Option<String>,
    pub similarity_score: Option<f64>,
    pub score: Option<f64>,
    pub relevance_score: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub topics: Option<Vec<String>>,
    pub metadata: Option<Metadata>,
    pub custom_metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSearchResult {
    pub memories: Vec<RemoteMemory>,
    /// Duration reported by the service, if any. Opaque to the engine.
    pub total_duration_ms: Option<f64>,
}
