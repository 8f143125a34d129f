// ── Retrieval: Readiness Gate ──────────────────────────────────────────────
//
// Owns the fast path's handles (embedder + tier collections). Each slot is
// write-once; readiness only ever moves false → true within a process.
//
// The per-request hot path calls `is_fast_path_ready()` and never blocks.
// `await_ready()` is the bounded startup wait, polling at a fixed interval.

use crate::atoms::traits::{Embedder, VectorCollection};
use crate::atoms::types::{ReadinessStatus, Tier};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct ReadinessGate {
    embedder: OnceLock<Arc<dyn Embedder>>,
    tier0: OnceLock<Arc<dyn VectorCollection>>,
    tier1: OnceLock<Arc<dyn VectorCollection>>,
    embedder_ready: AtomicBool,
    collection_ready: AtomicBool,
    /// Set by the warm-up task when it finishes, successful or not.
    init_complete: AtomicBool,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the embedder. Returns false if one was already installed.
    pub fn install_embedder(&self, embedder: Arc<dyn Embedder>) -> bool {
        if self.embedder.set(embedder).is_err() {
            warn!("[readiness] Embedder already installed — ignoring replacement");
            return false;
        }
        self.embedder_ready.store(true, Ordering::Release);
        info!("[readiness] Embedder installed");
        true
    }

    /// Install the collection for `tier`. Returns false if that tier already has one.
    pub fn install_collection(&self, tier: Tier, collection: Arc<dyn VectorCollection>) -> bool {
        let slot = self.slot(tier);
        if slot.set(collection).is_err() {
            warn!("[readiness] {} collection already installed — ignoring replacement", tier);
            return false;
        }
        self.collection_ready.store(true, Ordering::Release);
        info!("[readiness] {} collection installed ({})", tier, tier.collection_name());
        true
    }

    pub fn mark_init_complete(&self) {
        self.init_complete.store(true, Ordering::Release);
    }

    pub fn embedder(&self) -> Option<Arc<dyn Embedder>> {
        self.embedder.get().cloned()
    }

    pub fn collection(&self, tier: Tier) -> Option<Arc<dyn VectorCollection>> {
        self.slot(tier).get().cloned()
    }

    fn slot(&self, tier: Tier) -> &OnceLock<Arc<dyn VectorCollection>> {
        match tier {
            Tier::Tier0 => &self.tier0,
            Tier::Tier1 => &self.tier1,
        }
    }

    /// Embedder set and at least one collection set. Never blocks.
    pub fn is_fast_path_ready(&self) -> bool {
        self.embedder_ready.load(Ordering::Acquire) && self.collection_ready.load(Ordering::Acquire)
    }

    pub fn is_init_complete(&self) -> bool {
        self.init_complete.load(Ordering::Acquire)
    }

    pub fn status(&self) -> ReadinessStatus {
        ReadinessStatus {
            fast_path_ready: self.is_fast_path_ready(),
            embedder_ready: self.embedder_ready.load(Ordering::Acquire),
            collection_ready: self.collection_ready.load(Ordering::Acquire),
            init_complete: self.is_init_complete(),
        }
    }

    /// Poll until the fast path is ready or `timeout` elapses.
    ///
    /// Returns early with `false` if initialization reports completion
    /// without having produced a usable fast path.
    pub async fn await_ready(&self, timeout: Duration, poll_interval: Duration) -> bool {
        let start = Instant::now();
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        loop {
            if self.is_fast_path_ready() {
                info!("[readiness] Fast path ready after {}ms", start.elapsed().as_millis());
                return true;
            }
            if self.is_init_complete() {
                // Handles may land just before the signal.
                let ready = self.is_fast_path_ready();
                if !ready {
                    warn!("[readiness] Initialization finished without a usable fast path");
                }
                return ready;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                warn!("[readiness] Fast path not ready after {}ms — remote path only", timeout.as_millis());
                return false;
            }
            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::EngineResult;
    use crate::atoms::types::RawCandidate;
    use async_trait::async_trait;

    struct NullEmbedder;

    #[async_trait]
    impl Embedder for NullEmbedder {
        async fn embed(&self, _text: &str) -> EngineResult<Vec<f32>> {
            Ok(vec![0.0])
        }
    }

    struct NullCollection;

    #[async_trait]
    impl VectorCollection for NullCollection {
        async fn query(&self, _vector: &[f32], _k: usize) -> EngineResult<Vec<RawCandidate>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_requires_embedder_and_one_collection() {
        let gate = ReadinessGate::new();
        assert!(!gate.is_fast_path_ready());

        gate.install_collection(Tier::Tier1, Arc::new(NullCollection));
        assert!(!gate.is_fast_path_ready());

        gate.install_embedder(Arc::new(NullEmbedder));
        assert!(gate.is_fast_path_ready());
        assert!(gate.collection(Tier::Tier0).is_none());
        assert!(gate.collection(Tier::Tier1).is_some());
    }

    #[test]
    fn test_slots_are_write_once() {
        let gate = ReadinessGate::new();
        assert!(gate.install_embedder(Arc::new(NullEmbedder)));
        assert!(!gate.install_embedder(Arc::new(NullEmbedder)));
        assert!(gate.install_collection(Tier::Tier0, Arc::new(NullCollection)));
        assert!(!gate.install_collection(Tier::Tier0, Arc::new(NullCollection)));
        assert!(gate.install_collection(Tier::Tier1, Arc::new(NullCollection)));
        assert!(gate.status().fast_path_ready);
    }

    #[tokio::test]
    async fn test_await_ready_times_out() {
        let gate = ReadinessGate::new();
        let start = Instant::now();
        let ready = gate.await_ready(Duration::from_millis(60), Duration::from_millis(10)).await;
        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_await_ready_sees_late_install() {
        let gate = Arc::new(ReadinessGate::new());
        let installer = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            installer.install_embedder(Arc::new(NullEmbedder));
            installer.install_collection(Tier::Tier0, Arc::new(NullCollection));
        });
        assert!(gate.await_ready(Duration::from_secs(2), Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_await_ready_stops_on_init_complete() {
        let gate = ReadinessGate::new();
        gate.install_embedder(Arc::new(NullEmbedder));
        gate.mark_init_complete();
        let start = Instant::now();
        assert!(!gate.await_ready(Duration::from_secs(5), Duration::from_millis(10)).await);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(gate.status().init_complete);
    }
}
