//! Viewer-facing transport: WebSocket reader/writer tasks.

pub mod websocket;

pub use websocket::serve_viewer;
