//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with the collection endpoints
//! - Middleware stack (request id, logging, CORS, timeout, panic catching)
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::middleware::{error_envelope, handle_panic, log_requests, request_id};
use crate::routes::documents::{
    count_items, create_item, delete_count_item, delete_item, filter_items, get_item,
    list_items, update_count_item, update_item,
};
use crate::routes::{create_time_item, filter_time_items, home, not_found, server_time};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// `/{collection}/count` is a static segment and wins over
/// `/{collection}/{id}`, so `GET` never looks `count` up as an identifier.
/// Static routes only claim `GET`; their other methods are forwarded to the
/// collection handlers they shadow.
///
/// Middleware stack (outermost first):
/// 1. Tracing
/// 2. Request logging
/// 3. Request ID tracking
/// 4. CORS
/// 5. Compression
/// 6. JSON error envelope for non-handler errors
/// 7. Panic catching
/// 8. Timeout handling
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(home))
        .route(
            "/time",
            get(server_time).post(filter_time_items).put(create_time_item),
        )
        .route(
            "/{collection}",
            get(list_items).post(filter_items).put(create_item),
        )
        .route(
            "/{collection}/count",
            get(count_items)
                .put(update_count_item)
                .delete(delete_count_item),
        )
        .route(
            "/{collection}/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn(error_envelope))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the global tracing subscriber.
///
/// Debug mode logs human-readable lines; otherwise logs are JSON. `RUST_LOG`
/// overrides the configured level.
pub fn init_tracing(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.effective_log_level()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true);

    let installed = if config.debug {
        builder.compact().try_init()
    } else {
        builder.json().try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Start the gateway HTTP server
///
/// Opens the document store named by `config.store_uri`, binds the
/// configured address and serves until SIGTERM or Ctrl+C.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config);
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    let state = Arc::new(ServerState::new(config.clone())?);
    let app = build_router(Arc::clone(&state));

    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting docgate server on {} (store: {}, debug: {})",
        addr,
        config.store_uri,
        config.debug
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, CORS: {}",
        config.timeout_secs,
        config.max_body_size_mb,
        config.enable_cors
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = state.store.flush() {
        tracing::warn!(error = %err, "store flush on shutdown failed");
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use store::DocumentStore;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let store = Arc::new(DocumentStore::open("memory://").unwrap());
        build_router(Arc::new(ServerState::with_store(
            ServerConfig::default(),
            store,
        )))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
        assert_eq!(body_json(response).await, json!("Hello World!"));
    }

    #[tokio::test]
    async fn method_mismatch_is_wrapped_in_the_envelope() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/widgets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Method Not Allowed" })
        );
    }

    async fn boom() -> &'static str {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn panicking_handlers_become_server_errors() {
        let app: Router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(from_fn(error_envelope));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "kaboom" }));
    }
}
