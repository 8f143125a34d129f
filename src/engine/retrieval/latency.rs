// ── Retrieval: Latency Breakdown ───────────────────────────────────────────
//
// Builds the per-search `LatencyBreakdown`. Values are rounded to 0.1ms and
// the invariant `total >= embedding + vector_search` is enforced after
// rounding, exactly (no epsilon) against the float sum of the rounded legs;
// `overhead` is whatever remains.

use crate::atoms::constants::{REMOTE_EMBEDDING_SHARE, REMOTE_ESTIMATE_NOTE, REMOTE_SEARCH_SHARE};
use crate::atoms::types::{LatencyBreakdown, PathTaken};

fn round1(ms: f64) -> f64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 10.0).round() / 10.0
    } else {
        0.0
    }
}

fn assemble(total_ms: f64, embedding_ms: f64, vector_search_ms: f64, path_taken: PathTaken) -> LatencyBreakdown {
    let embedding_ms = round1(embedding_ms);
    let vector_search_ms = round1(vector_search_ms);
    // Unrounded: round1(0.1 + 0.2) sits one ulp below 0.1 + 0.2.
    let legs = embedding_ms + vector_search_ms;
    let total_ms = round1(total_ms).max(legs);
    LatencyBreakdown {
        total_ms,
        embedding_ms,
        vector_search_ms,
        overhead_ms: round1(total_ms - legs),
        path_taken,
        remote_call_ms: None,
        estimated: false,
        note: None,
    }
}

/// Measured local fast path.
pub fn local_breakdown(total_ms: f64, embedding_ms: f64, vector_search_ms: f64) -> LatencyBreakdown {
    assemble(total_ms, embedding_ms, vector_search_ms, PathTaken::LocalFast)
}

/// Remote fallback: only the round-trip is measured; the embedding/search
/// split is a labeled estimate.
pub fn remote_breakdown(total_ms: f64, remote_call_ms: f64) -> LatencyBreakdown {
    let mut breakdown = assemble(
        total_ms,
        remote_call_ms * REMOTE_EMBEDDING_SHARE,
        remote_call_ms * REMOTE_SEARCH_SHARE,
        PathTaken::RemoteFallback,
    );
    breakdown.remote_call_ms = Some(round1(remote_call_ms));
    breakdown.estimated = true;
    breakdown.note = Some(REMOTE_ESTIMATE_NOTE.to_string());
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holds_invariant(b: &LatencyBreakdown) -> bool {
        b.total_ms >= b.embedding_ms + b.vector_search_ms && b.overhead_ms >= 0.0
    }

    #[test]
    fn test_local_breakdown_overhead() {
        let b = local_breakdown(20.04, 8.0, 7.0);
        assert_eq!(b.path_taken, PathTaken::LocalFast);
        assert_eq!(b.total_ms, 20.0);
        assert_eq!(b.overhead_ms, 5.0);
        assert!(!b.estimated);
        assert!(b.note.is_none());
        assert!(b.remote_call_ms.is_none());
        assert!(holds_invariant(&b));
    }

    #[test]
    fn test_rounding_never_breaks_invariant() {
        let b = local_breakdown(10.0, 6.06, 3.96);
        assert!(holds_invariant(&b));
        assert_eq!(b.overhead_ms, 0.0);
    }

    #[test]
    fn test_invariant_is_exact_when_legs_sum_inexactly() {
        // 0.1 + 0.2 == 0.30000000000000004 > 0.3
        let b = local_breakdown(0.3, 0.1, 0.2);
        assert!(b.total_ms >= b.embedding_ms + b.vector_search_ms);
        assert_eq!(b.overhead_ms, 0.0);

        for total in [0.3, 0.31, 0.7, 1.0] {
            for (e, v) in [(0.1, 0.2), (0.2, 0.1), (0.4, 0.3), (0.7, 0.2)] {
                let b = local_breakdown(total, e, v);
                assert!(holds_invariant(&b), "{:?}", b);
            }
        }
    }

    #[test]
    fn test_remote_split_is_labeled_estimate() {
        let b = remote_breakdown(110.0, 100.0);
        assert_eq!(b.path_taken, PathTaken::RemoteFallback);
        assert_eq!(b.embedding_ms, 75.0);
        assert_eq!(b.vector_search_ms, 25.0);
        assert_eq!(b.overhead_ms, 10.0);
        assert_eq!(b.remote_call_ms, Some(100.0));
        assert!(b.estimated);
        assert!(b.note.as_deref().unwrap_or_default().contains("estimated"));
        assert!(holds_invariant(&b));
    }

    #[test]
    fn test_negative_and_nan_inputs_are_zero() {
        let b = local_breakdown(f64::NAN, -3.0, 0.0);
        assert_eq!(b.total_ms, 0.0);
        assert_eq!(b.embedding_ms, 0.0);
        assert!(holds_invariant(&b));
    }

    #[test]
    fn test_serializes_camel_case() {
        let v = serde_json::to_value(remote_breakdown(10.0, 8.0)).unwrap();
        assert_eq!(v["pathTaken"], "remote_fallback");
        assert!(v.get("embeddingMs").is_some());
        assert!(v.get("remoteCallMs").is_some());
    }
}
