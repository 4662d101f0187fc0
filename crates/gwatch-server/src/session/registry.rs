//! Session records and the registry that owns them.
//!
//! The registry holds the canonical `Arc<Session>` per id; relays and API
//! handlers look sessions up by id and never own them.

use crate::session::executor::{GadgetStream, SharedStatus};
use gwatch_core::{GwatchError, GwatchResult, SessionStatus, SessionSummary, StartRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// One running gadget instance.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Gadget type being run.
    pub gadget_type: String,
    /// Namespace of the traced workload.
    pub namespace: String,
    /// Name of the traced workload.
    pub target: String,
    /// Status cell shared with the execution engine.
    status: SharedStatus,
    /// Inert receivers used only to mint per-relay subscriptions.
    output_rx: broadcast::Receiver<Value>,
    error_rx: broadcast::Receiver<String>,
}

impl Session {
    fn new(id: String, req: &StartRequest, stream: GadgetStream) -> Self {
        Self {
            id,
            gadget_type: req.gadget_type.clone(),
            namespace: req.namespace.clone(),
            target: req.target.clone(),
            status: stream.status,
            output_rx: stream.output,
            error_rx: stream.errors,
        }
    }

    /// Current status.
    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    /// Force a status transition (service-side, e.g. after a failed stop).
    pub async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
    }

    /// Clone of the shared status cell, for relays reporting the final state.
    pub fn status_handle(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Fresh receivers for one relay.
    ///
    /// Each subscription starts at the live tail and observes channel
    /// closure independently of every other relay.
    pub fn subscribe(&self) -> (broadcast::Receiver<Value>, broadcast::Receiver<String>) {
        (self.output_rx.resubscribe(), self.error_rx.resubscribe())
    }

    /// Point-in-time summary for the REST surface.
    pub async fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            gadget_type: self.gadget_type.clone(),
            namespace: self.namespace.clone(),
            target: self.target.clone(),
            status: self.status().await,
        }
    }
}

/// Owns all live sessions.
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
        }
    }

    /// Register a new session.
    ///
    /// The id comes from the caller because the execution engine is started
    /// with it before the session exists here.
    pub async fn create(
        &self,
        id: String,
        req: &StartRequest,
        stream: GadgetStream,
    ) -> GwatchResult<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(GwatchError::Other(format!(
                "max sessions ({}) reached",
                self.max_sessions
            )));
        }
        let session = Arc::new(Session::new(id.clone(), req, stream));
        info!(session_id = %id, gadget = %req.gadget_type, "session registered");
        sessions.insert(id, session.clone());
        Ok(session)
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Point-in-time snapshot of all sessions.
    pub async fn list(&self) -> Vec<SessionSummary> {
        // Snapshot under the read lock, read statuses after releasing it.
        let snapshot: Vec<Arc<Session>> =
            self.sessions.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(snapshot.len());
        for session in snapshot {
            summaries.push(session.summary().await);
        }
        summaries
    }

    /// Deregister a session. Removing an absent id is a no-op.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "session removed");
        } else {
            debug!(session_id = %id, "remove of unknown session ignored");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generate a random session ID (hex-encoded, 16 bytes = 32 hex chars).
pub fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}
