// ── Retrieval: Engine ──────────────────────────────────────────────────────
//
// RetrievalEngine owns the fast path's handles (through the ReadinessGate),
// the optional remote fallback, and the search history. One call:
//
//   Idle → ReadinessCheck → LocalAttempt ─ok─→ Complete
//                 │              │ any failure
//                 └─not ready────┴──────────→ RemoteFallback → Complete
//
// The local attempt embeds once and shares that vector across both tier
// queries. Only `InvalidQuery` (before any external call) and
// `RetrievalUnavailable` (both paths exhausted) reach the caller; everything
// else degrades the result and is logged.
//
// Sub-modules:
//   - normalize:   raw candidate / remote memory → MemoryRecord
//   - tier_merger: concurrent tier fan-out, merge, truncate
//   - readiness:   write-once handle slots + bounded startup wait
//   - history:     ring buffer of recent search summaries
//   - latency:     LatencyBreakdown construction (measured or estimated)
//   - tool_schema: function-tool schema + argument validation

pub mod history;
pub mod latency;
pub mod normalize;
pub mod readiness;
pub mod tier_merger;
pub mod tool_schema;

pub use history::SearchHistory;
pub use readiness::ReadinessGate;
pub use tier_merger::{rank_and_truncate, MergeOutcome, TierMerger, TierTiming};
pub use tool_schema::{
    is_search_tool, parse_search_request, parse_with_default_limit, search_tool_schema, SearchRequest,
};

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Embedder, RemoteMemorySearch, VectorCollection};
use crate::atoms::types::{
    HistorySnapshot, LatencyBreakdown, MemoryRecord, ReadinessStatus, SearchOptions,
    SearchResponse, Tier,
};
use crate::engine::config::{EmbeddingConfig, RetrievalConfig};
use crate::engine::memory::{EmbeddingClient, RemoteMemoryClient};
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tier_merger::ms_since;
use tokio::task::JoinHandle;

/// What a warm-up initializer hands back to the engine.
#[derive(Default)]
pub struct WarmupHandles {
    pub embedder: Option<Arc<dyn Embedder>>,
    pub collections: Vec<(Tier, Arc<dyn VectorCollection>)>,
}

/// Result of a successful local attempt.
struct LocalOutcome {
    records: Vec<MemoryRecord>,
    embedding_ms: f64,
    vector_search_ms: f64,
}

pub struct RetrievalEngine {
    config: RetrievalConfig,
    gate: ReadinessGate,
    remote: Option<Arc<dyn RemoteMemorySearch>>,
    history: SearchHistory,
}

impl RetrievalEngine {
    /// Engine with no handles installed and no remote fallback.
    pub fn new(config: RetrievalConfig) -> Self {
        let history = SearchHistory::new(config.history_capacity);
        RetrievalEngine {
            config,
            gate: ReadinessGate::new(),
            remote: None,
            history,
        }
    }

    /// Engine wired to the HTTP memory service from `config.remote`, when an
    /// API key is configured. Local handles still arrive via warm-up.
    pub fn from_config(config: RetrievalConfig) -> Self {
        let remote: Option<Arc<dyn RemoteMemorySearch>> = if config.remote.api_key.is_some() {
            Some(Arc::new(RemoteMemoryClient::new(&config.remote)))
        } else {
            warn!("[retrieval] No remote API key configured — remote fallback disabled");
            None
        };
        let mut engine = Self::new(config);
        engine.remote = remote;
        engine
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteMemorySearch>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn readiness_gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn install_embedder(&self, embedder: Arc<dyn Embedder>) -> bool {
        self.gate.install_embedder(embedder)
    }

    pub fn install_collection(&self, tier: Tier, collection: Arc<dyn VectorCollection>) -> bool {
        self.gate.install_collection(tier, collection)
    }

    // ── Exposed surface ────────────────────────────────────────────────────

    pub fn readiness(&self) -> ReadinessStatus {
        self.gate.status()
    }

    /// Recent searches, oldest first.
    pub fn search_history(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    pub fn reset_history(&self) {
        self.history.clear();
        info!("[retrieval] Search history cleared");
    }

    /// Bounded startup wait using the configured timeout and poll interval.
    pub async fn await_ready(&self) -> bool {
        self.gate
            .await_ready(self.config.readiness_timeout(), self.config.readiness_poll())
            .await
    }

    /// Run `init` in the background, install whatever handles it yields, and
    /// signal init-complete either way.
    pub fn spawn_warmup<F>(self: &Arc<Self>, init: F) -> JoinHandle<()>
    where
        F: Future<Output = EngineResult<WarmupHandles>> + Send + 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let start = Instant::now();
            match init.await {
                Ok(handles) => engine.install_warmup_handles(handles),
                Err(e) => warn!("[retrieval] Warm-up failed — remote path only: {}", e),
            }
            engine.gate.mark_init_complete();
            info!(
                "[retrieval] Warm-up finished in {}ms (fast path ready: {})",
                start.elapsed().as_millis(),
                engine.gate.is_fast_path_ready()
            );
        })
    }

    fn install_warmup_handles(&self, handles: WarmupHandles) {
        let embedder_dims = handles.embedder.as_ref().and_then(|e| e.dimensions());
        if let Some(embedder) = handles.embedder {
            self.gate.install_embedder(embedder);
        }
        for (tier, collection) in handles.collections {
            if let (Some(want), Some(have)) = (embedder_dims, collection.dimensions()) {
                if want != have {
                    warn!(
                        "[retrieval] {} collection holds {}-dim vectors but the embedder produces {} — its queries will fail",
                        tier, have, want
                    );
                }
            }
            self.gate.install_collection(tier, collection);
        }
    }

    // ── Search ─────────────────────────────────────────────────────────────

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        options: SearchOptions,
    ) -> EngineResult<SearchResponse> {
        validate(query, limit, &options)?;
        let started = Instant::now();
        let preview = query_preview(query);

        let local_failure = if !self.config.local_fast_path {
            "local fast path disabled by configuration".to_string()
        } else if !self.gate.is_fast_path_ready() {
            debug!("[retrieval] Fast path not ready — going straight to remote for '{}'", preview);
            "fast path not ready".to_string()
        } else {
            match self.search_local(query, limit, &options).await {
                Ok(local) => {
                    let latency =
                        latency::local_breakdown(ms_since(started), local.embedding_ms, local.vector_search_ms);
                    return Ok(self.complete(query, local.records, latency, &options));
                }
                Err(e) => {
                    warn!("[retrieval] Local path failed for '{}' — falling back to remote: {}", preview, e);
                    e.to_string()
                }
            }
        };

        match self.search_remote(query, limit, &options).await {
            Ok((records, remote_ms)) => {
                let latency = latency::remote_breakdown(ms_since(started), remote_ms);
                Ok(self.complete(query, records, latency, &options))
            }
            Err(remote_err) => {
                error!(
                    "[retrieval] ✗ Retrieval unavailable for '{}' — local: {} | remote: {}",
                    preview, local_failure, remote_err
                );
                Err(EngineError::unavailable(local_failure, remote_err.to_string()))
            }
        }
    }

    /// Entry point for a search function-tool call. Calls that omit
    /// `max_memories` get the configured default limit.
    pub async fn search_tool_call(&self, args: serde_json::Value) -> EngineResult<SearchResponse> {
        let request = parse_with_default_limit(args, self.config.default_limit)?;
        self.search(&request.query, request.limit, request.options).await
    }

    async fn search_local(
        &self,
        query: &str,
        limit: usize,
        options: &SearchOptions,
    ) -> EngineResult<LocalOutcome> {
        let embedder = self
            .gate
            .embedder()
            .ok_or_else(|| EngineError::Embedding("no embedder installed".into()))?;

        let embed_start = Instant::now();
        let embedding = match tokio::time::timeout(self.config.embed_timeout(), embedder.embed(query)).await {
            Ok(Ok(vec)) => vec,
            Ok(Err(e)) => return Err(EngineError::Embedding(e.to_string())),
            Err(_) => return Err(EngineError::timeout("embed", self.config.embed_timeout_ms)),
        };
        let embedding_ms = ms_since(embed_start);
        if embedding.is_empty() {
            return Err(EngineError::Embedding("embedder returned an empty vector".into()));
        }
        if options.enable_graph_search {
            debug!("[retrieval] Graph search is only available remotely — local path ignores it");
        }

        let merger = Tier::ALL
            .iter()
            .filter_map(|tier| self.gate.collection(*tier).map(|c| (*tier, c)))
            .fold(TierMerger::new(self.config.tier_query_timeout()), |m, (tier, c)| {
                m.with_collection(tier, c)
            });

        let limit_per_tier = self.config.limit_per_tier.unwrap_or(limit);
        let outcome = merger
            .merge_across_tiers(&embedding, limit, limit_per_tier, options.search_tier0, options.search_tier1)
            .await?;

        Ok(LocalOutcome {
            records: outcome.records,
            embedding_ms,
            vector_search_ms: outcome.fanout_ms,
        })
    }

    /// Returns the normalized records and the measured round-trip in ms.
    async fn search_remote(
        &self,
        query: &str,
        limit: usize,
        options: &SearchOptions,
    ) -> EngineResult<(Vec<MemoryRecord>, f64)> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| EngineError::Config("no remote memory service configured".into()))?;

        let call_start = Instant::now();
        let result = match tokio::time::timeout(
            self.config.remote_timeout(),
            remote.search(query, limit, options.enable_graph_search),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(EngineError::timeout(
                    "remote search",
                    self.config.remote_timeout().as_millis() as u64,
                ))
            }
        };
        let remote_ms = ms_since(call_start);
        if let Some(reported) = result.total_duration_ms {
            debug!("[retrieval] Remote reported {:.1}ms, measured {:.1}ms", reported, remote_ms);
        }

        let records: Vec<MemoryRecord> = result
            .memories
            .into_iter()
            .enumerate()
            .map(|(i, m)| normalize::from_remote(i, m))
            .filter(|r| options.includes(r.tier))
            .collect();

        Ok((rank_and_truncate(records, limit), remote_ms))
    }

    fn complete(
        &self,
        query: &str,
        records: Vec<MemoryRecord>,
        latency: LatencyBreakdown,
        options: &SearchOptions,
    ) -> SearchResponse {
        let entry = self
            .history
            .build_entry(query, &records, &latency, options.enable_graph_search);
        let search_id = entry.id.clone();
        self.history.record(entry);

        let with_content = records.iter().filter(|r| r.content.is_some()).count();
        info!(
            "[retrieval] {:?}: {} results ({} with content) in {:.1}ms for '{}' (embed {:.1}ms{}, search {:.1}ms, overhead {:.1}ms)",
            latency.path_taken,
            records.len(),
            with_content,
            latency.total_ms,
            query_preview(query),
            latency.embedding_ms,
            if latency.estimated { " est" } else { "" },
            latency.vector_search_ms,
            latency.overhead_ms
        );

        SearchResponse { records, latency, search_id }
    }
}

/// Stock warm-up step for the HTTP embedder: probe it once and report its
/// real dimension.
pub async fn warm_up_embedder(config: EmbeddingConfig) -> EngineResult<Arc<dyn Embedder>> {
    let client = EmbeddingClient::new(&config);
    let dims = client.test_connection().await?;
    if dims != config.dims {
        warn!(
            "[retrieval] Embedding model '{}' produced {} dims, config expects {}",
            client.model(),
            dims,
            config.dims
        );
    }
    info!("[retrieval] ✓ Embedder '{}' ready — {} dimensions", client.model(), dims);
    Ok(Arc::new(client))
}

fn validate(query: &str, limit: usize, options: &SearchOptions) -> EngineResult<()> {
    if query.trim().is_empty() {
        return Err(EngineError::InvalidQuery("query must not be empty".into()));
    }
    if limit == 0 {
        return Err(EngineError::InvalidQuery("limit must be at least 1".into()));
    }
    if !options.search_tier0 && !options.search_tier1 {
        return Err(EngineError::InvalidQuery("at least one tier must be searched".into()));
    }
    Ok(())
}

fn query_preview(query: &str) -> String {
    query.chars().take(80).collect()
}
