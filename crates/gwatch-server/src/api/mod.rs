//! HTTP surface: REST routes for session control plus the WebSocket attach
//! point for live output.

pub mod error;
pub mod handlers;

use crate::relay::ViewerRegistry;
use crate::session::{SessionService, SyntheticRunner};
use axum::routing::{delete, get};
use axum::Router;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService<SyntheticRunner>>,
    pub viewers: Arc<ViewerRegistry>,
}

/// Build the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/gadgets", get(handlers::list_gadgets))
        .route(
            "/api/sessions",
            get(handlers::list_sessions).post(handlers::start_session),
        )
        .route("/api/sessions/:session_id", delete(handlers::stop_session))
        .route("/ws/:session_id", get(handlers::attach_viewer))
        .route("/health", get(handlers::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRegistry;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use gwatch_core::StartRequest;
    use tokio::time::{timeout, Duration};
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let state = AppState {
            service: Arc::new(SessionService::new(
                SessionRegistry::new(16),
                SyntheticRunner::new(),
            )),
            viewers: Arc::new(ViewerRegistry::new()),
        };
        (router(state.clone()), state)
    }

    fn start_request() -> StartRequest {
        StartRequest {
            gadget_type: "trace_tcp".into(),
            namespace: "default".into(),
            target: "pod-a".into(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn gadget_catalog_is_served() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::get("/api/gadgets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let list = body.as_array().unwrap();
        assert!(!list.is_empty());
        assert!(list.iter().any(|g| g["type"] == "trace_tcp"));
    }

    #[tokio::test]
    async fn start_session_returns_created_summary() {
        let (app, state) = test_app();
        let request = Request::post("/api/sessions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"gadgetType":"trace_tcp","namespace":"default","target":"pod-a"}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let id = body["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert!(body["status"] == "Starting" || body["status"] == "Running");

        let listed = state.service.list_sessions().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }

    #[tokio::test]
    async fn unparseable_body_is_rejected_without_state() {
        let (app, state) = test_app();
        let request = Request::post("/api/sessions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.service.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_gadget_type_is_bad_request() {
        let (app, state) = test_app();
        let request = Request::post("/api/sessions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"gadgetType":"melt_cpu","namespace":"default","target":"pod-a"}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.service.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_session_maps_to_server_error() {
        let (app, state) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/sessions/unknown-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.service.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn delete_stops_once_then_fails() {
        let (_, state) = test_app();
        let summary = state.service.start_session(start_request()).await.unwrap();

        let delete_request = |id: &str| {
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/sessions/{id}"))
                .body(Body::empty())
                .unwrap()
        };

        let response = router(state.clone())
            .oneshot(delete_request(&summary.id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.service.list_sessions().await.is_empty());

        let response = router(state.clone())
            .oneshot(delete_request(&summary.id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn ws_attach_unknown_session_is_not_found() {
        let (app, _) = test_app();
        let request = Request::get("/ws/unknown-id")
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn viewer_streams_frames_then_session_ended() {
        use futures_util::StreamExt;
        use tokio_tungstenite::tungstenite;

        let (_, state) = test_app();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let summary = state.service.start_session(start_request()).await.unwrap();

        let url = format!("ws://{addr}/ws/{}", summary.id);
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

        // At least one live frame before the session is stopped.
        let first = timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let frame: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert!(frame["type"] == "output" || frame["type"] == "error");

        state.service.stop_session(&summary.id).await.unwrap();

        let mut ended = 0;
        loop {
            match timeout(Duration::from_secs(5), socket.next()).await.unwrap() {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
                    if frame["type"] == "session_ended" {
                        ended += 1;
                        assert_eq!(frame["status"], "Stopped");
                    } else {
                        assert_eq!(ended, 0, "no frames after session_ended");
                    }
                }
                Some(Ok(tungstenite::Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
        assert_eq!(ended, 1);
    }
}
