//! Façade combining the session registry with the execution engine.

use crate::session::executor::GadgetExecutor;
use crate::session::registry::{generate_session_id, Session, SessionRegistry};
use gwatch_core::{catalog, GwatchError, GwatchResult, SessionStatus, SessionSummary, StartRequest};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SessionService<E> {
    registry: SessionRegistry,
    executor: E,
}

impl<E: GadgetExecutor> SessionService<E> {
    pub fn new(registry: SessionRegistry, executor: E) -> Self {
        Self { registry, executor }
    }

    /// Start a new gadget session.
    ///
    /// The engine keeps producing on its own task after this call returns,
    /// and an immediate `get_session` on the returned id succeeds.
    pub async fn start_session(&self, req: StartRequest) -> GwatchResult<SessionSummary> {
        validate(&req)?;

        let id = generate_session_id();
        let stream = self.executor.start(&req, &id).await?;
        let session = self.registry.create(id, &req, stream).await?;

        info!(
            session_id = %session.id,
            gadget = %session.gadget_type,
            target = %session.target,
            "session started"
        );
        Ok(session.summary().await)
    }

    /// Stop a session and deregister it.
    ///
    /// The session is removed even when engine-side cancellation fails, so a
    /// broken engine cannot leak registry entries; the failure still
    /// propagates to the caller.
    pub async fn stop_session(&self, id: &str) -> GwatchResult<()> {
        let session = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| GwatchError::SessionNotFound(id.to_string()))?;

        let stopped = self.executor.stop(id).await;
        if stopped.is_err() {
            warn!(session_id = %id, "engine stop failed, forcing session out");
            session.set_status(SessionStatus::Failed).await;
        }
        self.registry.remove(id).await;
        stopped
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.registry.list().await
    }

    pub async fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.registry.get(id).await
    }
}

/// Validate a start request: known gadget type, addressable target.
fn validate(req: &StartRequest) -> GwatchResult<()> {
    if !catalog::is_known(&req.gadget_type) {
        return Err(GwatchError::InvalidRequest(format!(
            "unknown gadget type: {}",
            req.gadget_type
        )));
    }
    if req.namespace.is_empty() {
        return Err(GwatchError::InvalidRequest(
            "namespace must not be empty".into(),
        ));
    }
    if req.target.is_empty() {
        return Err(GwatchError::InvalidRequest(
            "target must not be empty".into(),
        ));
    }
    Ok(())
}
