//! Axum server setup
//!
//! Server skeleton with:
//! - Permissive CORS (the API is public and read-mostly)
//! - Tracing and request-timeout middleware
//! - Baseline security headers (nosniff, frame and referrer policy)
//! - JSON 404 for unknown paths
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use buzzer_core::CommentaryService;
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::routes;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:5000)
    pub bind_addr: SocketAddr,

    /// Requests running longer than this are aborted
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn CommentaryService>,
}

impl AppState {
    pub fn new(service: Arc<dyn CommentaryService>) -> Self {
        Self { service }
    }
}

/// Fallback for unknown paths
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ));

    Router::new()
        .merge(routes::health::router())
        .merge(routes::games::router())
        .merge(routes::commentary::router())
        .merge(routes::stats::router())
        .merge(routes::status::router())
        .fallback(not_found)
        .layer(middleware)
        .with_state(state)
}

/// Run the HTTP server until a shutdown signal arrives.
pub async fn run_server(
    service: Arc<dyn CommentaryService>,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let app = build_router(AppState::new(service), config.request_timeout);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use buzzer_core::memory::MemoryOp;
    use buzzer_core::{GatewayConfig, MemoryDb, MemoryManager, Pool, PoolConfig, QueryGateway};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> (MemoryDb, Router) {
        let db = MemoryDb::new();
        let pool = Pool::new(MemoryManager::new(db.clone()), PoolConfig::default());
        let gateway = QueryGateway::new(pool, GatewayConfig::default());
        let app = build_router(AppState::new(Arc::new(gateway)), Duration::from_secs(30));
        (db, app)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn send_json(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_game(app: &Router) -> i64 {
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/games",
                r#"{"home_team": "Hawks", "away_team": "Owls", "game_date": "2024-05-01T19:00:00Z"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_db, app) = test_app();

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "buzzer-api");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_security_headers() {
        let (_db, app) = test_app();

        for uri in ["/health", "/api/nope"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            let headers = response.headers();
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
            assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (_db, app) = test_app();

        let response = app.oneshot(get("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_commentary_flow() {
        let (_db, app) = test_app();
        let game_id = create_game(&app).await;
        let feed = format!("/api/games/{}/commentary", game_id);

        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                &feed,
                r#"{"message": "Three pointer!", "event_type": "score"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let id = body["commentary_id"].as_i64().unwrap();

        let response = app.clone().oneshot(get(&feed)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["commentary"][0]["id"], id);
        assert_eq!(body["commentary"][0]["event_type"], "score");

        let response = app.clone().oneshot(get("/api/games")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["games"][0]["commentary_count"], 1);
        assert_eq!(body["games"][0]["status"], "upcoming");

        let response = app.oneshot(get("/api/stats")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["total_games"], 1);
        assert_eq!(body["total_commentary"], 1);
        assert_eq!(body["event_breakdown"][0]["event_type"], "score");
        assert_eq!(body["event_breakdown"][0]["count"], 1);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_empty_message_is_400_without_insert() {
        let (db, app) = test_app();
        let game_id = create_game(&app).await;
        let feed = format!("/api/games/{}/commentary", game_id);

        for body in [r#"{"message": ""}"#, r#"{"message": "   "}"#, r#"{}"#] {
            let response = app
                .clone()
                .oneshot(send_json("POST", &feed, body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(body_json(response).await["error"], "validation_error");
        }

        let response = app.clone().oneshot(send_json("POST", &feed, "not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(db.calls(MemoryOp::InsertCommentary), 0);
        let stats = body_json(app.oneshot(get("/api/stats")).await.unwrap()).await;
        assert_eq!(stats["total_commentary"], 0);
    }

    #[tokio::test]
    async fn test_unknown_game_is_404() {
        let (_db, app) = test_app();

        let response = app
            .clone()
            .oneshot(get("/api/games/999/commentary"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "not_found");

        let response = app
            .clone()
            .oneshot(send_json("POST", "/api/games/999/commentary", r#"{"message": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/api/games/abc/commentary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pagination_is_clamped() {
        let (_db, app) = test_app();
        let game_id = create_game(&app).await;
        let feed = format!("/api/games/{}/commentary", game_id);

        for i in 0..55 {
            let body = format!(r#"{{"message": "update {}"}}"#, i);
            let response = app
                .clone()
                .oneshot(send_json("POST", &feed, &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(get(&format!("{}?limit=500", feed)))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["commentary"].as_array().unwrap().len(), 50);

        let response = app
            .oneshot(get(&format!("{}?limit=10&offset=50", feed)))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["commentary"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_malformed_page_params_fall_back() {
        let (_db, app) = test_app();
        let game_id = create_game(&app).await;
        let feed = format!("/api/games/{}/commentary", game_id);

        for i in 0..3 {
            let body = format!(r#"{{"message": "update {}"}}"#, i);
            let response = app
                .clone()
                .oneshot(send_json("POST", &feed, &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        for query in ["limit=5000000000", "limit=-1", "limit=abc", "offset=-3&limit=x"] {
            let response = app
                .clone()
                .oneshot(get(&format!("{}?{}", feed, query)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "query {}", query);
            let body = body_json(response).await;
            assert_eq!(body["commentary"].as_array().unwrap().len(), 3, "query {}", query);
        }

        let response = app
            .oneshot(get(&format!("{}?offset=99999999999", feed)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["commentary"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_game() {
        let (_db, app) = test_app();
        let game_id = create_game(&app).await;
        let uri = format!("/api/games/{}", game_id);

        let response = app
            .clone()
            .oneshot(send_json(
                "PATCH",
                &uri,
                r#"{"status": "live", "home_score": 3, "away_score": 1}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "live");
        assert_eq!(body["home_score"], 3);

        let response = app
            .clone()
            .oneshot(send_json("PATCH", &uri, r#"{"home_score": -2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(send_json("PATCH", "/api/games/999", r#"{"status": "finished"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_game_validation() {
        let (_db, app) = test_app();

        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/games",
                r#"{"home_team": " ", "away_team": "Owls", "game_date": "2024-05-01T19:00:00Z"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(send_json("POST", "/api/games", r#"{"home_team": "Hawks"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_database_outage_is_503() {
        let (db, app) = test_app();
        let game_id = create_game(&app).await;
        db.set_available(false);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/games/{}/commentary", game_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        let response = app.oneshot(get("/api/status")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["pool"]["degraded"], true);
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
