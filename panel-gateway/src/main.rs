//! Panel gateway — HTTP bridge between dashboard panels and the
//! time-series storage engine.
//!
//! Receives panel query requests as JSON, compiles them into the
//! engine's query documents, and decodes the engine's CRLF-framed text
//! responses back into per-series datapoints.
//!
//! # Environment variables
//! | Var            | Default                 |
//! |----------------|-------------------------|
//! | `GATEWAY_ADDR` | `0.0.0.0:8080`          |
//! | `ENGINE_URL`   | `http://localhost:8181` |

use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use panel_gateway::{handlers, transport::HttpTransport, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("panel_gateway=info".parse()?),
        )
        .json()
        .init();

    let engine_url =
        std::env::var("ENGINE_URL").unwrap_or_else(|_| "http://localhost:8181".to_string());
    info!(engine_url, "using storage engine");

    let state = Arc::new(AppState {
        transport: Arc::new(HttpTransport::new(engine_url)),
    });

    let app = Router::new()
        // Health check (engine stats pass-through)
        .route("/health", get(handlers::health))
        // Panel data
        .route("/query", post(handlers::panel_query))
        // Editor completion
        .route("/search", post(handlers::search))
        .route("/aggregators", get(handlers::aggregators))
        // Annotations pass-through
        .route("/annotations", get(handlers::annotations))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr =
        std::env::var("GATEWAY_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = bind_addr, "panel gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
