//! Panel gateway library.
//!
//! Compiles dashboard panel queries into the storage engine's JSON query
//! documents, decodes the engine's CRLF-framed text responses back into
//! per-series datapoints, and exposes the result to the visualization
//! layer over HTTP.

pub mod error;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod suggest;
pub mod template;
pub mod topn;
pub mod transport;

use std::sync::Arc;

use crate::transport::Transport;

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    /// Channel to the storage engine's HTTP API.
    pub transport: Arc<dyn Transport>,
}
