//! HTTP server assembly and lifecycle.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{NoteguardError, Result};
use crate::notes::{notes_router, AppState, NoteRepository};
use crate::ratelimit::FixedWindowLimiter;

/// HTTP server for the notes API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Broad per-request timeout wrapped around all routes
    request_timeout: Duration,
    state: AppState,
    limiter: Arc<FixedWindowLimiter>,
}

impl HttpServer {
    /// Create a new server from its configuration and collaborators.
    pub fn new(
        config: &ServerConfig,
        repository: NoteRepository,
        limiter: Arc<FixedWindowLimiter>,
    ) -> Result<Self> {
        Ok(Self {
            addr: config.socket_addr()?,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            state: AppState { notes: repository },
            limiter,
        })
    }

    /// Assemble the full router: health probe, notes CRUD behind the rate
    /// limiter, request tracing, and the broad request timeout.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .nest(
                "/api/notes",
                notes_router(self.state.clone(), Arc::clone(&self.limiter)),
            )
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(self.request_timeout))
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server stops accepting connections when the provided signal
    /// resolves and drains in-flight requests before returning.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            NoteguardError::Io(e)
        })
    }
}

/// Liveness probe; deliberately outside the rate limiter.
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ServerConfig, StoreConfig};
    use crate::store::RestCounterStore;

    async fn test_server() -> HttpServer {
        // The MongoDB client connects lazily, so a repository over an
        // unreachable URI is fine for routes that never touch it.
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let repository = NoteRepository::new(client.database("test").collection("notes"));

        let store = RestCounterStore::new(&StoreConfig {
            url: "http://127.0.0.1:1".to_string(),
            token: "token".to_string(),
            timeout_secs: 1,
        })
        .unwrap();

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
        };

        HttpServer::new(
            &config,
            repository,
            Arc::new(FixedWindowLimiter::new(Arc::new(store))),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_route_responds() {
        let server = test_server().await;

        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let server = test_server().await;

        let response = server
            .router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
