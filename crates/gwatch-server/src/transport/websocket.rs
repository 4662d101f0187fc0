//! WebSocket viewer connections.
//!
//! Each attached viewer gets three tasks: a relay draining the session's
//! channels into a bounded queue, a writer pushing queued frames to the
//! socket, and a reader watching the socket for closure. Either socket task
//! exiting tears the whole attachment down.

use crate::relay::{OutputRelay, ViewerRegistry};
use crate::session::Session;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of one viewer's outbound frame queue.
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Drive one viewer connection until the session ends or the socket dies.
pub async fn serve_viewer(socket: WebSocket, session: Arc<Session>, viewers: Arc<ViewerRegistry>) {
    let conn_id = viewers.register(session.id.clone()).await;

    let (sink, stream) = socket.split();
    let (queue_tx, queue_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let (output_rx, error_rx) = session.subscribe();

    let relay = tokio::spawn(
        OutputRelay::new(
            session.id.clone(),
            output_rx,
            error_rx,
            session.status_handle(),
            queue_tx,
        )
        .run(),
    );
    let mut writer = tokio::spawn(write_outbound(sink, queue_rx));
    let mut reader = tokio::spawn(watch_inbound(stream));

    // Whichever socket task exits first takes the other down with it. The
    // relay normally follows on its own via queue closure; the abort covers
    // a relay parked on quiet channels.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
    relay.abort();

    viewers.unregister(conn_id).await;
    let remaining = viewers.count_for(&session.id).await;
    debug!(session_id = %session.id, conn_id, remaining, "viewer connection closed");
}

/// Writer task: queued frames out to the socket, in order.
async fn write_outbound(mut sink: SplitSink<WebSocket, Message>, mut queue_rx: mpsc::Receiver<String>) {
    while let Some(text) = queue_rx.recv().await {
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!(error = %e, "websocket write failed");
            return;
        }
    }
    // Queue closed and drained: the session is over.
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "session ended".into(),
        })))
        .await;
}

/// Reader task: no inbound protocol is defined, purely liveness detection.
async fn watch_inbound(mut stream: SplitStream<WebSocket>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "websocket read failed");
                break;
            }
        }
    }
}
