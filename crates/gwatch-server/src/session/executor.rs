//! Execution-engine seam and the built-in synthetic runner.
//!
//! The real gadget engine runs cluster-side and is consumed through the
//! `GadgetExecutor` trait only: start producing into a fresh pair of event
//! channels, stop on request. `SyntheticRunner` stands in for it, emitting
//! representative trace events on an interval; it backs local development
//! and the test suite.

use gwatch_core::{GwatchError, GwatchResult, SessionStatus, StartRequest};
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, RwLock};
use tracing::{debug, info};

/// Session status cell shared between the engine task and the service.
pub type SharedStatus = Arc<RwLock<SessionStatus>>;

/// Broadcast capacity for gadget output events.
const OUTPUT_BUFFER: usize = 1024;
/// Broadcast capacity for gadget error records.
const ERROR_BUFFER: usize = 256;
/// Interval between synthetic events.
const TICK: Duration = Duration::from_millis(250);

/// Channels and status handle for one running gadget, as handed back by the
/// execution engine.
pub struct GadgetStream {
    pub status: SharedStatus,
    pub output: broadcast::Receiver<Value>,
    pub errors: broadcast::Receiver<String>,
}

/// Interface to the gadget execution engine.
///
/// `start` hands back freshly producing channels for the session and keeps
/// producing on an independent task. Both channels close (senders dropped)
/// when the gadget terminates, normally or via `stop` — that closure is the
/// only completion signal consumers get, and it must follow a `stop` within
/// bounded time.
pub trait GadgetExecutor: Send + Sync + 'static {
    fn start(
        &self,
        req: &StartRequest,
        session_id: &str,
    ) -> impl Future<Output = GwatchResult<GadgetStream>> + Send;

    fn stop(&self, session_id: &str) -> impl Future<Output = GwatchResult<()>> + Send;
}

/// Built-in stand-in engine producing synthetic trace events.
pub struct SyntheticRunner {
    /// Stop signals for the producer tasks, keyed by session id.
    running: Arc<RwLock<HashMap<String, oneshot::Sender<()>>>>,
}

impl SyntheticRunner {
    pub fn new() -> Self {
        Self {
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for SyntheticRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl GadgetExecutor for SyntheticRunner {
    async fn start(&self, req: &StartRequest, session_id: &str) -> GwatchResult<GadgetStream> {
        let (output_tx, output_rx) = broadcast::channel(OUTPUT_BUFFER);
        let (error_tx, error_rx) = broadcast::channel(ERROR_BUFFER);
        let status: SharedStatus = Arc::new(RwLock::new(SessionStatus::Starting));
        let (stop_tx, stop_rx) = oneshot::channel();

        self.running
            .write()
            .await
            .insert(session_id.to_string(), stop_tx);

        tokio::spawn(produce(
            req.clone(),
            session_id.to_string(),
            output_tx,
            error_tx,
            status.clone(),
            stop_rx,
        ));

        Ok(GadgetStream {
            status,
            output: output_rx,
            errors: error_rx,
        })
    }

    async fn stop(&self, session_id: &str) -> GwatchResult<()> {
        match self.running.write().await.remove(session_id) {
            Some(stop) => {
                let _ = stop.send(());
                Ok(())
            }
            None => Err(GwatchError::ExecutionStop(format!(
                "no running gadget for session {session_id}"
            ))),
        }
    }
}

/// Producer task: one per running gadget.
///
/// Emits events until the stop signal fires, then records the final status
/// and drops both senders, closing the channels for every subscribed relay.
async fn produce(
    req: StartRequest,
    session_id: String,
    output_tx: broadcast::Sender<Value>,
    error_tx: broadcast::Sender<String>,
    status: SharedStatus,
    mut stop_rx: oneshot::Receiver<()>,
) {
    *status.write().await = SessionStatus::Running;
    info!(session_id = %session_id, gadget = %req.gadget_type, "gadget producing");

    let mut ticker = tokio::time::interval(TICK);
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                // A send error means nobody is subscribed right now; events
                // are live-only, so that is not a failure.
                let _ = output_tx.send(synth_event(&req, seq));
                if seq % 64 == 63 {
                    let _ = error_tx.send(format!("sampler behind on {}, events skipped", req.target));
                }
                seq += 1;
            }
        }
    }

    *status.write().await = SessionStatus::Stopped;
    debug!(session_id = %session_id, events = seq, "gadget producer exiting");
    // senders drop here; channel closure is the end-of-session signal
}

/// One synthetic event shaped after the requested gadget type.
fn synth_event(req: &StartRequest, seq: u64) -> Value {
    let mut rng = rand::thread_rng();
    let comm = ["curl", "nginx", "postgres", "kubelet"][rng.gen_range(0..4)];
    match req.gadget_type.as_str() {
        "trace_tcp" => json!({
            "event": if seq % 3 == 0 { "connect" } else { "accept" },
            "namespace": req.namespace,
            "pod": req.target,
            "pid": rng.gen_range(100..65536),
            "comm": comm,
            "saddr": format!("10.0.{}.{}", rng.gen_range(0..255), rng.gen_range(1..255)),
            "daddr": "10.96.0.1",
            "dport": 443,
        }),
        "trace_exec" => json!({
            "namespace": req.namespace,
            "pod": req.target,
            "pid": rng.gen_range(100..65536),
            "ppid": rng.gen_range(1..100),
            "comm": comm,
            "args": ["--config", "/etc/app.conf"],
        }),
        "trace_open" => json!({
            "namespace": req.namespace,
            "pod": req.target,
            "pid": rng.gen_range(100..65536),
            "comm": comm,
            "path": format!("/proc/{}/status", rng.gen_range(1..4096)),
            "flags": "O_RDONLY",
        }),
        "trace_dns" => json!({
            "namespace": req.namespace,
            "pod": req.target,
            "comm": comm,
            "name": "example.com.",
            "qtype": "A",
            "rcode": "NoError",
        }),
        _ => json!({
            "namespace": req.namespace,
            "pod": req.target,
            "seq": seq,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;
    use tokio::time::timeout;

    fn request() -> StartRequest {
        StartRequest {
            gadget_type: "trace_tcp".into(),
            namespace: "default".into(),
            target: "pod-a".into(),
        }
    }

    #[tokio::test]
    async fn produces_events_until_stopped() {
        let runner = SyntheticRunner::new();
        let mut stream = runner.start(&request(), "s1").await.unwrap();

        let event = timeout(Duration::from_secs(2), stream.output.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event["namespace"], "default");
        assert_eq!(event["pod"], "pod-a");

        runner.stop("s1").await.unwrap();

        // The channel closes once the producer takes the stop signal.
        loop {
            match timeout(Duration::from_secs(2), stream.output.recv())
                .await
                .unwrap()
            {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        assert_eq!(*stream.status.read().await, SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_unknown_session_errors() {
        let runner = SyntheticRunner::new();
        assert!(matches!(
            runner.stop("missing").await,
            Err(GwatchError::ExecutionStop(_))
        ));
    }

    #[tokio::test]
    async fn second_stop_errors() {
        let runner = SyntheticRunner::new();
        runner.start(&request(), "s2").await.unwrap();
        runner.stop("s2").await.unwrap();
        assert!(matches!(
            runner.stop("s2").await,
            Err(GwatchError::ExecutionStop(_))
        ));
    }
}
