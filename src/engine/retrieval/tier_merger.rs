// ── Retrieval: Tier Merger ─────────────────────────────────────────────────
//
// Fans one query embedding out to the tier collections, normalizes each
// tier's candidates, then merges by query similarity and truncates.
//
//   • Tier queries run concurrently, each under its own deadline.
//   • A failed or timed-out tier is logged and skipped; the merge only
//     fails when every queried tier failed or no selected tier has a
//     collection.
//   • Ordering is a stable descending sort on `query_similarity`; equal
//     scores keep fan-out order (tier0 before tier1, then per-tier rank).

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::VectorCollection;
use crate::atoms::types::{MemoryRecord, RawCandidate, Tier};
use crate::engine::retrieval::normalize;
use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing and outcome of one tier query.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTiming {
    pub tier: Tier,
    pub duration_ms: f64,
    pub candidates: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged, sorted, truncated records.
    pub records: Vec<MemoryRecord>,
    /// One entry per tier actually queried, in fan-out order.
    pub tier_timings: Vec<TierTiming>,
    /// Sum of the individual tier query durations.
    pub summed_query_ms: f64,
    /// Wall-clock of the whole concurrent fan-out.
    pub fanout_ms: f64,
}

impl MergeOutcome {
    pub fn failed_tiers(&self) -> impl Iterator<Item = &TierTiming> {
        self.tier_timings.iter().filter(|t| t.error.is_some())
    }
}

pub struct TierMerger {
    collections: Vec<(Tier, Arc<dyn VectorCollection>)>,
    query_timeout: Duration,
}

impl TierMerger {
    pub fn new(query_timeout: Duration) -> Self {
        TierMerger { collections: Vec::new(), query_timeout }
    }

    /// Attach the collection for `tier`. A later call for the same tier wins.
    pub fn with_collection(mut self, tier: Tier, collection: Arc<dyn VectorCollection>) -> Self {
        self.collections.retain(|(t, _)| *t != tier);
        self.collections.push((tier, collection));
        self.collections.sort_by_key(|(t, _)| Tier::ALL.iter().position(|x| x == t));
        self
    }

    pub fn available_tiers(&self) -> Vec<Tier> {
        self.collections.iter().map(|(t, _)| *t).collect()
    }

    /// Query every selected tier with `limit_per_tier`, merge, keep `limit`.
    pub async fn merge_across_tiers(
        &self,
        query_embedding: &[f32],
        limit: usize,
        limit_per_tier: usize,
        include_tier0: bool,
        include_tier1: bool,
    ) -> EngineResult<MergeOutcome> {
        let selected: Vec<&(Tier, Arc<dyn VectorCollection>)> = self
            .collections
            .iter()
            .filter(|(tier, _)| match tier {
                Tier::Tier0 => include_tier0,
                Tier::Tier1 => include_tier1,
            })
            .collect();

        if selected.is_empty() {
            return Err(EngineError::Other(
                "no vector collection available for the selected tiers".into(),
            ));
        }

        let fanout_start = Instant::now();
        let queries = selected.iter().map(|(tier, collection)| {
            self.query_tier(*tier, collection.as_ref(), query_embedding, limit_per_tier)
        });
        let results = join_all(queries).await;
        let fanout_ms = ms_since(fanout_start);

        let mut records = Vec::new();
        let mut tier_timings = Vec::with_capacity(results.len());
        for (tier, duration_ms, result) in results {
            match result {
                Ok(candidates) => {
                    tier_timings.push(TierTiming {
                        tier,
                        duration_ms,
                        candidates: candidates.len(),
                        error: None,
                    });
                    records.extend(
                        candidates.into_iter().map(|c| normalize::from_candidate(tier, c)),
                    );
                }
                Err(e) => {
                    warn!("[retrieval] {} query failed after {:.1}ms — skipping tier: {}", tier, duration_ms, e);
                    tier_timings.push(TierTiming {
                        tier,
                        duration_ms,
                        candidates: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if tier_timings.iter().all(|t| t.error.is_some()) {
            let causes: Vec<String> = tier_timings
                .iter()
                .filter_map(|t| t.error.as_ref().map(|e| format!("{}: {}", t.tier, e)))
                .collect();
            return Err(EngineError::Other(format!(
                "all {} tier queries failed ({})",
                tier_timings.len(),
                causes.join("; ")
            )));
        }

        let records = rank_and_truncate(records, limit);
        let summed_query_ms = tier_timings.iter().map(|t| t.duration_ms).sum();

        debug!(
            "[retrieval] Merged {} records from {} tier(s) (fan-out {:.1}ms, summed {:.1}ms)",
            records.len(),
            tier_timings.len(),
            fanout_ms,
            summed_query_ms
        );

        Ok(MergeOutcome { records, tier_timings, summed_query_ms, fanout_ms })
    }

    async fn query_tier(
        &self,
        tier: Tier,
        collection: &dyn VectorCollection,
        embedding: &[f32],
        k: usize,
    ) -> (Tier, f64, EngineResult<Vec<RawCandidate>>) {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.query_timeout, collection.query(embedding, k)).await {
            Ok(Ok(mut candidates)) => {
                // A collection may ignore `k`; never let one tier flood the merge.
                candidates.truncate(k);
                Ok(candidates)
            }
            Ok(Err(e)) => Err(EngineError::tier_query(tier, e.to_string())),
            Err(_) => Err(EngineError::timeout(
                format!("{} query", tier),
                self.query_timeout.as_millis() as u64,
            )),
        };
        (tier, ms_since(start), result)
    }
}

/// Stable descending sort on `query_similarity`, then truncate.
pub fn rank_and_truncate(mut records: Vec<MemoryRecord>, limit: usize) -> Vec<MemoryRecord> {
    records.sort_by(|a, b| {
        b.query_similarity
            .partial_cmp(&a.query_similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    records.truncate(limit);
    records
}

pub(crate) fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
