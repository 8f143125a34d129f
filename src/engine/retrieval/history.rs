// ── Retrieval: Search History ──────────────────────────────────────────────
//
// A bounded, in-memory ring buffer of recent search summaries for the
// observability / constellation view.
//
// Key properties:
//   - Pure in-memory: survives only within the process
//   - O(1) push; the oldest entry is evicted first once capacity is reached
//   - Appends are serialized by a short critical section; snapshots copy out
//   - Entries are never mutated after insertion and cannot be removed
//     individually (only `clear()` resets the buffer)

use crate::atoms::constants::{
    HISTORY_PREVIEW_RECORDS, PREVIEW_CONTENT_CHARS, PREVIEW_TOPICS, SEARCH_HISTORY_CAPACITY,
};
use crate::atoms::types::{
    HistorySnapshot, LatencyBreakdown, MemoryPreview, MemoryRecord, SearchHistoryEntry,
};
use chrono::Utc;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

pub struct SearchHistory {
    entries: Mutex<VecDeque<SearchHistoryEntry>>,
    capacity: usize,
    /// Last millisecond stamp handed out as an entry id.
    last_id_ms: AtomicI64,
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self::new(SEARCH_HISTORY_CAPACITY)
    }
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SearchHistory {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            last_id_ms: AtomicI64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry, evicting the oldest if full. Returns the evicted entry.
    pub fn record(&self, entry: SearchHistoryEntry) -> Option<SearchHistoryEntry> {
        let mut entries = self.entries.lock();
        let evicted = if entries.len() >= self.capacity {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(entry);
        if let Some(ref old) = evicted {
            debug!("[history] Evicted {}", old.id);
        }
        evicted
    }

    /// Point-in-time copy, oldest first.
    pub fn snapshot(&self) -> HistorySnapshot {
        let entries: Vec<SearchHistoryEntry> = self.entries.lock().iter().cloned().collect();
        HistorySnapshot { count: entries.len(), entries }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Explicit reset.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// `search_<millis>`, strictly increasing within this history even when
    /// two searches land in the same millisecond.
    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_id_ms.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_id_ms.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return format!("search_{}", next),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Build (but do not record) the summary for a completed search.
    pub fn build_entry(
        &self,
        query: &str,
        records: &[MemoryRecord],
        latency: &LatencyBreakdown,
        enable_graph_search: bool,
    ) -> SearchHistoryEntry {
        SearchHistoryEntry {
            id: self.next_id(),
            timestamp: Utc::now(),
            query: query.to_string(),
            result_count: records.len(),
            enable_graph_search,
            latency: latency.clone(),
            top_score: records.first().map(|r| r.query_similarity).unwrap_or(0.0),
            top_preview: records.iter().take(HISTORY_PREVIEW_RECORDS).map(preview).collect(),
        }
    }
}

/// Reduce a record to its tooltip preview.
pub fn preview(record: &MemoryRecord) -> MemoryPreview {
    MemoryPreview {
        content: record.content.as_deref().map(|c| truncate_chars(c, PREVIEW_CONTENT_CHARS)),
        topics: record.topics.iter().take(PREVIEW_TOPICS).cloned().collect(),
        score: record.query_similarity,
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{Metadata, PathTaken, Tier};

    fn latency() -> LatencyBreakdown {
        LatencyBreakdown {
            total_ms: 12.0,
            embedding_ms: 5.0,
            vector_search_ms: 4.0,
            overhead_ms: 3.0,
            path_taken: PathTaken::LocalFast,
            remote_call_ms: None,
            estimated: false,
            note: None,
        }
    }

    fn record(content: Option<&str>, topics: &[&str], score: f64) -> MemoryRecord {
        MemoryRecord {
            id: "r".into(),
            content: content.map(str::to_string),
            query_similarity: score,
            relevance_score: 0.0,
            tags: vec![],
            topics: topics.iter().map(|t| t.to_string()).collect(),
            tier: Tier::Tier0,
            metadata: Metadata::new(),
        }
    }

    fn entry(history: &SearchHistory, query: &str) -> SearchHistoryEntry {
        history.build_entry(query, &[], &latency(), false)
    }

    #[test]
    fn test_record_and_snapshot_order() {
        let history = SearchHistory::new(5);
        assert!(history.is_empty());
        history.record(entry(&history, "first"));
        history.record(entry(&history, "second"));

        let snap = history.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.entries[0].query, "first");
        assert_eq!(snap.entries[1].query, "second");
    }

    #[test]
    fn test_eviction_on_overflow() {
        let history = SearchHistory::new(2);
        history.record(entry(&history, "a"));
        history.record(entry(&history, "b"));
        let evicted = history.record(entry(&history, "c"));

        assert_eq!(evicted.map(|e| e.query).as_deref(), Some("a"));
        let queries: Vec<String> = history.snapshot().entries.into_iter().map(|e| e.query).collect();
        assert_eq!(queries, vec!["b", "c"]);
    }

    #[test]
    fn test_default_capacity_keeps_most_recent_thirty() {
        let history = SearchHistory::default();
        for i in 0..45 {
            history.record(entry(&history, &format!("q{}", i)));
        }
        let snap = history.snapshot();
        assert_eq!(snap.count, 30);
        assert_eq!(snap.entries.first().map(|e| e.query.as_str()), Some("q15"));
        assert_eq!(snap.entries.last().map(|e| e.query.as_str()), Some("q44"));
    }

    #[test]
    fn test_ids_strictly_increase() {
        let history = SearchHistory::new(3);
        let ids: Vec<i64> = (0..50)
            .map(|_| history.next_id().trim_start_matches("search_").parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_build_entry_previews() {
        let history = SearchHistory::new(3);
        let long = "x".repeat(250);
        let records = vec![
            record(Some(&long), &["a", "b", "c", "d"], 0.9),
            record(None, &[], 0.8),
            record(Some("short"), &["z"], 0.7),
            record(Some("not previewed"), &[], 0.6),
        ];
        let e = history.build_entry("q", &records, &latency(), true);

        assert_eq!(e.result_count, 4);
        assert_eq!(e.top_score, 0.9);
        assert!(e.enable_graph_search);
        assert_eq!(e.top_preview.len(), 3);
        assert_eq!(e.top_preview[0].content.as_ref().map(|c| c.chars().count()), Some(100));
        assert_eq!(e.top_preview[0].topics, vec!["a", "b", "c"]);
        assert_eq!(e.top_preview[1].content, None);
        assert_eq!(e.top_preview[2].content.as_deref(), Some("short"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_clear() {
        let history = SearchHistory::new(3);
        history.record(entry(&history, "a"));
        history.clear();
        assert_eq!(history.len(), 0);
        assert_eq!(history.snapshot().count, 0);
    }
}
