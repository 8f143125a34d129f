// ── Recall Atoms: Constants ────────────────────────────────────────────────
// All named constants for the crate live here.
// Collecting them in one place keeps magic numbers out of the engine and
// makes the defaults auditable.

// ── Vector collections ─────────────────────────────────────────────────────
// Names of the two independently populated collections. Tier 0 holds curated
// goals/OKRs synced from the memory service, tier 1 holds general memories.
pub const TIER0_COLLECTION: &str = "tier0_goals_okrs";
pub const TIER1_COLLECTION: &str = "tier1_memories";

// ── Search history ─────────────────────────────────────────────────────────
// The history feeds the constellation view; only the most recent searches
// are retained and the oldest is evicted first.
pub const SEARCH_HISTORY_CAPACITY: usize = 30;
pub const HISTORY_PREVIEW_RECORDS: usize = 3;
pub const PREVIEW_CONTENT_CHARS: usize = 100;
pub const PREVIEW_TOPICS: usize = 3;

// ── Remote fallback latency estimate ───────────────────────────────────────
// The remote service reports a single round-trip duration. The split below
// is a display estimate only: roughly 3/4 of the time goes to embedding.
pub const REMOTE_EMBEDDING_SHARE: f64 = 0.75;
pub const REMOTE_SEARCH_SHARE: f64 = 0.25;
pub const REMOTE_ESTIMATE_NOTE: &str =
    "Embedding and search times are estimated (75%/25% split of the remote round-trip). \
     Overhead covers orchestration and any abandoned local attempt.";

// ── Request defaults ───────────────────────────────────────────────────────
pub const DEFAULT_MAX_MEMORIES: usize = 30;
pub const DEFAULT_MAX_GRAPH_NODES: usize = 10;

// ── Deadlines ──────────────────────────────────────────────────────────────
pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_TIER_QUERY_TIMEOUT_MS: u64 = 5_000;
// First remote call may wait on a cold model load server-side.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_READINESS_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_READINESS_POLL_MS: u64 = 500;

// ── Embedding service ──────────────────────────────────────────────────────
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_EMBEDDING_DIMS: usize = 768;
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://memory.papr.ai";

// ── Environment overrides ──────────────────────────────────────────────────
pub const ENV_REMOTE_API_KEY: &str = "PAPR_MEMORY_API_KEY";
pub const ENV_REMOTE_BASE_URL: &str = "PAPR_BASE_URL";
pub const ENV_LOCAL_FAST_PATH: &str = "PAPR_ONDEVICE_PROCESSING";

// ── Config file ────────────────────────────────────────────────────────────
pub const CONFIG_DIR_NAME: &str = "tiered-recall";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ── Tool schema ────────────────────────────────────────────────────────────
pub const SEARCH_TOOL_NAME: &str = "search_papr_memories";
/// Every tool name a model may use for the search tool.
pub const SEARCH_TOOL_ALIASES: [&str; 2] = [SEARCH_TOOL_NAME, "search_memories"];
