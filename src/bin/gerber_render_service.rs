//! Gerber Render Service Binary
//!
//! Runs the converter as a REST API service with production-grade features:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Background artifact sweep
//! - Graceful shutdown handling, purging artifacts on exit
//!
//! ## Configuration
//!
//! See `gerber_render::config` for the service variables. Logging:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! ARTIFACT_DIR=/var/tmp/renders RENDER_COMMAND=/usr/bin/gerbv cargo run --bin gerber_render_service
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use gerber_render::config::{EngineKind, ServiceConfig};
use gerber_render::render::{CommandEngine, FixedRasterEngine, RenderEngine};
use gerber_render::service::{create_router, metrics_middleware, ServiceState};
use gerber_render::store::{spawn_sweeper, ArtifactStore, FsArtifactStore};

/// Pixel size of the stand-in raster when `RENDER_ENGINE=fixed`.
const FIXED_ENGINE_SIZE_PX: u32 = 400;

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gerber_render_service=info,gerber_render=info,tower_http=info".into());

    if log_format == "pretty" {
        // Pretty format for local development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        // JSON format for production (Cloud Logging compatible)
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    // Extract Cloud Trace context if present
    let trace_id = request
        .headers()
        .get("X-Cloud-Trace-Context")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split('/').next().unwrap_or(s).to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    // Create span with trace context
    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    // Log request completion
    info!(
        target: "gerber_render_service::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

fn build_engine(config: &ServiceConfig) -> Arc<dyn RenderEngine> {
    match config.engine {
        EngineKind::Command => {
            info!(program = %config.render_command, "Using external rasterizer");
            Arc::new(CommandEngine::new(&config.render_command))
        }
        EngineKind::Fixed => {
            warn!("RENDER_ENGINE=fixed: images are blank placeholders");
            Arc::new(FixedRasterEngine::new(FIXED_ENGINE_SIZE_PX, FIXED_ENGINE_SIZE_PX))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting Gerber Render Service"
    );

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    // Open artifact directory and start the sweeper
    let store = Arc::new(FsArtifactStore::open(&config.artifact_dir).await.map_err(|e| {
        tracing::error!(error = %e, dir = %config.artifact_dir.display(), "Failed to open artifact directory");
        e
    })?);
    info!(
        dir = %store.root().display(),
        retention_secs = config.retention.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Artifact store ready"
    );

    let sweeper = spawn_sweeper(Arc::clone(&store), config.retention_policy());

    // Create service state with the configured engine
    let engine = build_engine(&config);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = ServiceState::with_shared_store(Arc::clone(&store), engine, config);

    // Build router with middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    info!(
        address = %addr,
        version = version,
        "Gerber Render Service listening"
    );

    let listener = TcpListener::bind(addr).await?;

    // Graceful shutdown handling
    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        }
    };

    info!("Ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Stop sweeping and remove this instance's artifacts
    sweeper.abort();
    match store.purge_all().await {
        Ok(purged) => info!(purged = purged, "Artifacts purged"),
        Err(e) => warn!(error = %e, "Failed to purge artifacts on shutdown"),
    }

    info!("Gerber Render Service shutdown complete");

    Ok(())
}
