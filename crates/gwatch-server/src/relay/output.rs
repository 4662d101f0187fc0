//! Output relay: fans one session's event channels into one viewer's
//! outbound queue.
//!
//! One relay task per attached viewer. Events are forwarded with a
//! non-blocking push and silently discarded when the viewer's queue is
//! full; the gadget producer is never stalled by a slow viewer.
//! Output-channel closure is the session-end signal: the relay emits one
//! terminal frame, drops its queue sender and exits.

use crate::session::SharedStatus;
use gwatch_core::StreamFrame;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::debug;

/// Relays one session's output to one viewer.
pub struct OutputRelay {
    session_id: String,
    output: broadcast::Receiver<Value>,
    errors: broadcast::Receiver<String>,
    status: SharedStatus,
    outbound: mpsc::Sender<String>,
}

impl OutputRelay {
    pub fn new(
        session_id: String,
        output: broadcast::Receiver<Value>,
        errors: broadcast::Receiver<String>,
        status: SharedStatus,
        outbound: mpsc::Sender<String>,
    ) -> Self {
        Self {
            session_id,
            output,
            errors,
            status,
            outbound,
        }
    }

    /// Drain both channels until the session ends or the viewer goes away.
    pub async fn run(mut self) {
        // The error channel closing alone is not terminal; its select arm is
        // disabled instead, so a closed receiver cannot spin the loop.
        let mut errors_open = true;
        let mut dropped: u64 = 0;

        loop {
            tokio::select! {
                event = self.output.recv() => match event {
                    Ok(payload) => {
                        if !self.push(StreamFrame::Output { payload }, &mut dropped) {
                            debug!(session_id = %self.session_id, "viewer queue closed, relay exiting");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        dropped += skipped;
                        debug!(session_id = %self.session_id, skipped, "relay lagged behind producer");
                    }
                    Err(RecvError::Closed) => break,
                },
                record = self.errors.recv(), if errors_open => match record {
                    Ok(message) => {
                        if !self.push(StreamFrame::Error { message }, &mut dropped) {
                            debug!(session_id = %self.session_id, "viewer queue closed, relay exiting");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        dropped += skipped;
                    }
                    Err(RecvError::Closed) => errors_open = false,
                },
            }
        }

        // Output channel closed: the session is over. The terminal frame is
        // exempt from the drop policy — a blocking send is the best attempt
        // we can make before the queue closes.
        let status = *self.status.read().await;
        if let Ok(text) = serde_json::to_string(&StreamFrame::SessionEnded { status }) {
            let _ = self.outbound.send(text).await;
        }
        debug!(session_id = %self.session_id, dropped, "session ended, relay exiting");
        // outbound sender drops here, closing the viewer queue
    }

    /// Push one frame without blocking. Returns false when the viewer side
    /// of the queue is gone.
    fn push(&self, frame: StreamFrame, dropped: &mut u64) -> bool {
        let Ok(text) = serde_json::to_string(&frame) else {
            return true;
        };
        match self.outbound.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Viewer cannot keep up; drop the frame rather than stall.
                *dropped += 1;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
