//! WebSocket session gateway
//!
//! One task per connection. Each task services two suspension points at
//! once: inbound client frames and the session's result channel.

use super::auth::{AuthError, TokenAuthority};
use super::protocol::{ClientMessage, ServerMessage, parse_client_message};
use super::registry::SessionRegistry;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use magi_application::{SubmitReviewError, SubmitReviewUseCase, TransportFabric};
use magi_domain::SessionId;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Close code sent when credentials are missing or wrong
pub const AUTH_FAILED_CLOSE_CODE: u16 = 4001;
const AUTH_FAILED_REASON: &str = "authentication failed";
/// Standard "internal error" close code
const INTERNAL_ERROR_CLOSE_CODE: u16 = 1011;

/// Shared state handed to every connection.
#[derive(Clone)]
pub struct GatewayState {
    transport: Arc<dyn TransportFabric>,
    submit: Arc<SubmitReviewUseCase<dyn TransportFabric>>,
    authority: Arc<TokenAuthority>,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(
        transport: Arc<dyn TransportFabric>,
        authority: TokenAuthority,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            submit: Arc::new(SubmitReviewUseCase::new(transport.clone())),
            transport,
            authority: Arc::new(authority),
            registry: Arc::new(SessionRegistry::new()),
            shutdown,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    app_id: Option<String>,
    token: Option<String>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `state`'s shutdown token fires.
pub async fn serve(addr: &str, state: GatewayState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Session gateway listening on {}", listener.local_addr()?);
    serve_on(listener, state).await
}

pub async fn serve_on(listener: TcpListener, state: GatewayState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(credentials): Query<Credentials>,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    let app_id = credentials.app_id.unwrap_or_default();
    let token = credentials.token.unwrap_or_default();
    let verdict = state.authority.verify(&app_id, &token, Utc::now());

    ws.on_upgrade(move |socket| async move {
        match verdict {
            Ok(()) => run_session(socket, state, app_id).await,
            Err(e) => reject(socket, &app_id, e).await,
        }
    })
}

async fn reject(mut socket: WebSocket, app_id: &str, error: AuthError) {
    warn!("Rejected connection for app_id '{}': {}", app_id, error);
    let _ = socket
        .send(close_frame(AUTH_FAILED_CLOSE_CODE, AUTH_FAILED_REASON))
        .await;
}

fn close_frame(code: u16, reason: &'static str) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn run_session(socket: WebSocket, state: GatewayState, app_id: String) {
    let session = state.registry.register(&app_id, Utc::now());
    let session_id = session.session_id;
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before confirming so no result can be published unobserved
    let mut results = match state
        .transport
        .subscribe_to_channel(&session_id.result_channel())
        .await
    {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Could not subscribe session {}: {}", session_id, e);
            let _ = sender
                .send(close_frame(INTERNAL_ERROR_CLOSE_CODE, "service unavailable"))
                .await;
            state.registry.unregister(&session_id);
            return;
        }
    };

    info!("Session {} opened for app_id '{}'", session_id, app_id);
    let confirmed = ServerMessage::connection_confirmed(session_id.clone()).to_json();

    if sender.send(WsMessage::Text(confirmed.into())).await.is_ok() {
        loop {
            tokio::select! {
                frame = receiver.next() => {
                    let reply = match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            handle_frame(&state.submit, &session_id, text.as_str()).await
                        }
                        Some(Ok(WsMessage::Binary(_))) => ServerMessage::invalid_format(),
                        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
                        Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    };
                    if sender.send(WsMessage::Text(reply.to_json().into())).await.is_err() {
                        break;
                    }
                }
                relayed = results.recv() => {
                    let Some(raw) = relayed else {
                        debug!("Result channel for {} closed", session_id);
                        break;
                    };
                    if sender.send(WsMessage::Text(raw.into())).await.is_err() {
                        break;
                    }
                }
                _ = state.shutdown.cancelled() => {
                    let _ = sender.send(WsMessage::Close(None)).await;
                    break;
                }
            }
        }
    }

    // Dropping the subscription detaches the channel; late results are discarded
    drop(results);
    state.registry.unregister(&session_id);
    info!("Session {} closed", session_id);
}

/// Decode one inbound text frame and produce the inline reply.
///
/// Review requests are only enqueued here; the verdict arrives later on the
/// session's result channel.
pub async fn handle_frame<T: TransportFabric + ?Sized + 'static>(
    submit: &SubmitReviewUseCase<T>,
    session_id: &SessionId,
    text: &str,
) -> ServerMessage {
    match parse_client_message(text) {
        ClientMessage::Ping => ServerMessage::pong(),
        ClientMessage::ReviewRequest { payload } => {
            match submit.execute(session_id, payload).await {
                Ok(request_id) => ServerMessage::request_accepted(request_id),
                Err(SubmitReviewError::Invalid(e)) => {
                    debug!("Rejected review request from {}: {}", session_id, e);
                    ServerMessage::invalid_format()
                }
                Err(SubmitReviewError::Transport(e)) => {
                    warn!("Could not enqueue review request from {}: {}", session_id, e);
                    ServerMessage::unavailable()
                }
            }
        }
        ClientMessage::Unsupported(kind) => {
            debug!("Unsupported message type '{}' from {}", kind, session_id);
            ServerMessage::unsupported()
        }
        ClientMessage::Invalid => ServerMessage::invalid_format(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use magi_application::{ChannelSubscription, Delivery, TransportError};
    use magi_domain::{QueueMessage, topics};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct QueueRecorder {
        queued: Mutex<Vec<(String, String)>>,
        offline: bool,
    }

    #[async_trait]
    impl TransportFabric for QueueRecorder {
        async fn publish_to_queue(&self, topic: &str, message: String) -> Result<(), TransportError> {
            if self.offline {
                return Err(TransportError::Unavailable("offline".to_string()));
            }
            self.queued
                .lock()
                .unwrap()
                .push((topic.to_string(), message));
            Ok(())
        }

        async fn consume_from_queue(&self, _: &[&str]) -> Result<Delivery, TransportError> {
            Err(TransportError::Closed)
        }

        async fn publish_to_channel(&self, _: &str, _: String) -> Result<usize, TransportError> {
            Ok(0)
        }

        async fn subscribe_to_channel(&self, _: &str) -> Result<ChannelSubscription, TransportError> {
            Err(TransportError::Closed)
        }
    }

    fn session() -> SessionId {
        SessionId::new("session-app-1-abc")
    }

    #[tokio::test]
    async fn test_ping_is_answered_inline() {
        let transport = Arc::new(QueueRecorder::default());
        let submit = SubmitReviewUseCase::new(transport.clone());

        let reply = handle_frame(&submit, &session(), r#"{"type":"ping"}"#).await;

        assert_eq!(reply, ServerMessage::pong());
        assert!(transport.queued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_request_is_enqueued_and_acknowledged() {
        let transport = Arc::new(QueueRecorder::default());
        let submit = SubmitReviewUseCase::new(transport.clone());

        let reply = handle_frame(
            &submit,
            &session(),
            r#"{"type":"review_request","payload":"let x = 1;"}"#,
        )
        .await;

        let queued = transport.queued.lock().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].0, topics::REVIEW_REQUEST);
        let QueueMessage::ReviewRequest(request) = QueueMessage::decode(&queued[0].1).unwrap()
        else {
            panic!("expected a review request");
        };
        assert_eq!(request.session_id, session());
        assert_eq!(request.payload, "let x = 1;");
        assert_eq!(reply, ServerMessage::request_accepted(request.request_id));
    }

    #[tokio::test]
    async fn test_bad_frames_get_inline_errors() {
        let transport = Arc::new(QueueRecorder::default());
        let submit = SubmitReviewUseCase::new(transport.clone());

        assert_eq!(
            handle_frame(&submit, &session(), r#"{"type":"subscribe"}"#).await,
            ServerMessage::unsupported()
        );
        assert_eq!(
            handle_frame(&submit, &session(), "{oops").await,
            ServerMessage::invalid_format()
        );
        assert_eq!(
            handle_frame(&submit, &session(), r#"{"type":"review_request","payload":""}"#)
                .await,
            ServerMessage::invalid_format()
        );
        assert!(transport.queued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_reports_unavailable() {
        let transport = Arc::new(QueueRecorder {
            offline: true,
            ..Default::default()
        });
        let submit = SubmitReviewUseCase::new(transport);

        let reply = handle_frame(
            &submit,
            &session(),
            r#"{"type":"review_request","payload":"x"}"#,
        )
        .await;

        assert_eq!(reply, ServerMessage::unavailable());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = GatewayState::new(
            Arc::new(QueueRecorder::default()),
            TokenAuthority::new("secret", 60),
            CancellationToken::new(),
        );

        let response = router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "status": "healthy" }));
    }
}
