//! Per-panel query fan-out.
//!
//! One pipeline per non-hidden target, all running concurrently; results
//! are collected positionally so the merged output follows target
//! declaration order, not completion order.

use std::sync::Arc;

use engine_protocol::{decode_response, Framing, TimeSeries};
use tracing::debug;

use crate::error::QueryError;
use crate::models::{PanelRequest, TargetSpec, TimeRange};
use crate::query::{self, QueryDocument};
use crate::template::TemplateResolver;
use crate::topn::TopNPipeline;
use crate::transport::{Transport, QUERY_PATH};

/// Everything a target pipeline needs besides the target itself.
#[derive(Clone)]
pub struct QueryContext {
    pub transport: Arc<dyn Transport>,
    pub resolver: Arc<dyn TemplateResolver>,
}

/// POST one query document and decode the framed response.
pub(crate) async fn fetch_series(
    transport: &dyn Transport,
    document: &QueryDocument,
    framing: Framing,
) -> Result<Vec<TimeSeries>, QueryError> {
    let body = transport
        .post(QUERY_PATH, serde_json::to_value(document)?)
        .await
        .map_err(QueryError::Transport)?;
    Ok(decode_response(
        &body,
        framing,
        framing == Framing::GroupAggregate,
    )?)
}

/// Dispatch one target to the pipeline selected by its query shape.
async fn run_target(
    ctx: &QueryContext,
    target: &TargetSpec,
    range: &TimeRange,
    panel_interval: &str,
) -> Result<Vec<TimeSeries>, QueryError> {
    let framing = if target.disable_downsampling {
        Framing::Select
    } else {
        Framing::GroupAggregate
    };

    let series = if target.top_n.is_some() {
        let mut pipeline = TopNPipeline::new(ctx.transport.clone());
        pipeline
            .run(target, range, panel_interval, framing, ctx.resolver.as_ref())
            .await?
    } else {
        let document = match framing {
            Framing::Select => query::select_document(target, range, ctx.resolver.as_ref()),
            Framing::GroupAggregate => {
                query::group_aggregate_document(target, range, panel_interval, ctx.resolver.as_ref())
            }
        };
        fetch_series(ctx.transport.as_ref(), &document, framing).await?
    };

    debug!(metric = %target.metric, series = series.len(), "target decoded");
    Ok(series)
}

/// Execute every non-hidden target of a panel request concurrently and
/// merge the per-target results in target order. Hidden targets issue no
/// network call and contribute an empty slot. Any pipeline failure fails
/// the whole request.
pub async fn run_panel_query(
    ctx: &QueryContext,
    request: &PanelRequest,
) -> Result<Vec<TimeSeries>, QueryError> {
    let mut handles = Vec::with_capacity(request.targets.len());
    for target in &request.targets {
        if target.hide {
            handles.push(None);
            continue;
        }
        let ctx = ctx.clone();
        let target = target.clone();
        let range = request.range;
        let interval = request.interval.clone();
        handles.push(Some(tokio::spawn(async move {
            run_target(&ctx, &target, &range, &interval).await
        })));
    }

    let mut data = Vec::new();
    for handle in handles {
        let Some(handle) = handle else { continue };
        data.extend(handle.await??);
    }
    Ok(data)
}
