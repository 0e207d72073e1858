//! Axum HTTP handlers for the panel gateway.

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use engine_protocol::Aggregator;
use tracing::{error, info};

use crate::{
    error::QueryError,
    models::{PanelRequest, PanelResponse, PanelSeries, SearchRequest},
    orchestrator::{self, QueryContext},
    suggest,
    template::StaticResolver,
    transport::{ANNOTATIONS_PATH, STATS_PATH},
    AppState,
};

/// Failed queries surface the engine's or decoder's message verbatim;
/// those messages are meant for the dashboard author.
fn error_status(err: &QueryError) -> StatusCode {
    match err {
        QueryError::NoTargets | QueryError::InvalidTopN | QueryError::InvalidFindQuery => {
            StatusCode::BAD_REQUEST
        }
        QueryError::Transport(_) | QueryError::Decode(_) => StatusCode::BAD_GATEWAY,
        QueryError::Encode(_) | QueryError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ------------------------------------------------------------------ //
//  POST /query                                                        //
// ------------------------------------------------------------------ //

/// Execute a panel request and render the merged series list.
pub async fn panel_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PanelRequest>,
) -> impl IntoResponse {
    let ctx = QueryContext {
        transport: state.transport.clone(),
        resolver: Arc::new(StaticResolver::new(req.scoped_vars.clone())),
    };

    match orchestrator::run_panel_query(&ctx, &req).await {
        Ok(series) => {
            info!(targets = req.targets.len(), series = series.len(), "panel query served");
            let resp = PanelResponse {
                data: series.into_iter().map(PanelSeries::from).collect(),
            };
            (StatusCode::OK, Json(serde_json::to_value(resp).unwrap()))
        }
        Err(e) => {
            error!(error = %e, "panel query failed");
            (
                error_status(&e),
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

// ------------------------------------------------------------------ //
//  POST /search                                                       //
// ------------------------------------------------------------------ //

/// Free-form completion used by the panel editor.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    let resolver = StaticResolver::new(req.scoped_vars.clone());
    match suggest::find(state.transport.as_ref(), &resolver, &req.target).await {
        Ok(suggestions) => (
            StatusCode::OK,
            Json(serde_json::to_value(suggestions).unwrap()),
        ),
        Err(e) => {
            error!(error = %e, query = %req.target, "search failed");
            (
                error_status(&e),
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

// ------------------------------------------------------------------ //
//  GET /aggregators                                                   //
// ------------------------------------------------------------------ //

/// The aggregation functions the engine supports.
pub async fn aggregators() -> impl IntoResponse {
    let names: Vec<&str> = Aggregator::ALL.iter().map(|a| a.as_str()).collect();
    (StatusCode::OK, Json(serde_json::json!(names)))
}

// ------------------------------------------------------------------ //
//  GET /annotations                                                   //
// ------------------------------------------------------------------ //

/// Pass the annotation query through to the engine unchanged.
pub async fn annotations(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let path = match query {
        Some(query) => format!("{ANNOTATIONS_PATH}?{query}"),
        None => ANNOTATIONS_PATH.to_string(),
    };
    match state.transport.get(&path).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "annotation pass-through failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

// ------------------------------------------------------------------ //
//  GET /health                                                        //
// ------------------------------------------------------------------ //

/// Connection check against the engine's stats endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.transport.get(STATS_PATH).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))),
        Err(e) => {
            error!(error = %e, "engine stats check failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"status": "error", "error": e.to_string()})),
            )
        }
    }
}
