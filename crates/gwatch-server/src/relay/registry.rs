//! Registry of attached viewer connections.
//!
//! Tracks which viewer is bound to which session for observability and
//! teardown bookkeeping; relays themselves communicate only over channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One attached viewer.
#[derive(Debug, Clone)]
pub struct ViewerEntry {
    /// Session the viewer is bound to.
    pub session_id: String,
    /// When the viewer attached.
    pub connected_at: Instant,
}

/// Registry of attached viewers, keyed by connection id.
pub struct ViewerRegistry {
    viewers: Arc<RwLock<HashMap<u64, ViewerEntry>>>,
    next_conn_id: AtomicU64,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self {
            viewers: Arc::new(RwLock::new(HashMap::new())),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Register a viewer attachment; returns its connection id.
    pub async fn register(&self, session_id: String) -> u64 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut viewers = self.viewers.write().await;
        viewers.insert(
            conn_id,
            ViewerEntry {
                session_id: session_id.clone(),
                connected_at: Instant::now(),
            },
        );
        info!(session_id = %session_id, conn_id, viewers = viewers.len(), "viewer attached");
        conn_id
    }

    /// Remove a viewer attachment. Unknown ids are ignored.
    pub async fn unregister(&self, conn_id: u64) {
        let mut viewers = self.viewers.write().await;
        if let Some(entry) = viewers.remove(&conn_id) {
            debug!(
                session_id = %entry.session_id,
                conn_id,
                attached_secs = entry.connected_at.elapsed().as_secs(),
                "viewer detached"
            );
        }
    }

    /// Number of attached viewers across all sessions.
    pub async fn count(&self) -> usize {
        self.viewers.read().await.len()
    }

    /// Number of viewers attached to one session.
    pub async fn count_for(&self, session_id: &str) -> usize {
        self.viewers
            .read()
            .await
            .values()
            .filter(|v| v.session_id == session_id)
            .count()
    }
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_unregister() {
        let registry = ViewerRegistry::new();
        let a = registry.register("s1".into()).await;
        let b = registry.register("s1".into()).await;
        let c = registry.register("s2".into()).await;
        assert_ne!(a, b);

        assert_eq!(registry.count().await, 3);
        assert_eq!(registry.count_for("s1").await, 2);
        assert_eq!(registry.count_for("s2").await, 1);

        registry.unregister(b).await;
        assert_eq!(registry.count_for("s1").await, 1);

        // unknown ids are ignored
        registry.unregister(b).await;
        registry.unregister(9999).await;
        assert_eq!(registry.count().await, 2);
        registry.unregister(a).await;
        registry.unregister(c).await;
        assert_eq!(registry.count().await, 0);
    }
}
