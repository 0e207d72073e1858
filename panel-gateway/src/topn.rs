//! Two-phase top-N series resolution.
//!
//! Phase 1 asks the engine which N series rank highest over the range;
//! phase 2 re-issues the real query against exactly those series. The
//! two round trips are strictly sequential for one target; independent
//! targets run their pipelines in parallel.

use std::sync::Arc;

use engine_protocol::{parse_canonical_name, series_names, split_lines, Framing, TimeSeries};
use tracing::debug;

use crate::error::QueryError;
use crate::models::{TagFilter, TargetSpec, TimeRange};
use crate::orchestrator::fetch_series;
use crate::query;
use crate::template::TemplateResolver;
use crate::transport::{Transport, QUERY_PATH};

/// Pipeline progress; terminal on success or on either phase's failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingNames,
    AwaitingData,
    Done,
    Failed,
}

/// Drives one target's two-phase resolution.
pub struct TopNPipeline {
    transport: Arc<dyn Transport>,
    phase: Phase,
}

impl TopNPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            phase: Phase::AwaitingNames,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run both phases. A phase-1 failure aborts phase 2 entirely; an
    /// empty phase-1 name set short-circuits to a valid empty result.
    pub async fn run(
        &mut self,
        target: &TargetSpec,
        range: &TimeRange,
        panel_interval: &str,
        framing: Framing,
        resolver: &dyn TemplateResolver,
    ) -> Result<Vec<TimeSeries>, QueryError> {
        let names = match self.await_names(target, range, resolver).await {
            Ok(names) => names,
            Err(e) => {
                self.phase = Phase::Failed;
                return Err(e);
            }
        };
        if names.is_empty() {
            debug!(metric = %target.metric, "top-N selection matched no series");
            self.phase = Phase::Done;
            return Ok(Vec::new());
        }

        self.phase = Phase::AwaitingData;
        match self
            .await_data(target, range, panel_interval, framing, &names, resolver)
            .await
        {
            Ok(series) => {
                self.phase = Phase::Done;
                Ok(series)
            }
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    /// Phase 1: harvest the ranked series names. The response is always
    /// 3-line framed because the ranking query is select-shaped.
    async fn await_names(
        &self,
        target: &TargetSpec,
        range: &TimeRange,
        resolver: &dyn TemplateResolver,
    ) -> Result<Vec<String>, QueryError> {
        let document = query::top_n_document(target, range, resolver)?;
        let body = self
            .transport
            .post(QUERY_PATH, serde_json::to_value(&document)?)
            .await
            .map_err(QueryError::Transport)?;
        let lines = split_lines(&body)?;
        let names = series_names(&lines);
        debug!(metric = %target.metric, count = names.len(), "top-N names resolved");
        Ok(names)
    }

    /// Phase 2: canonicalize the names into concrete tag sets and issue
    /// the real query, carrying every post-processing knob over from the
    /// original target.
    async fn await_data(
        &self,
        target: &TargetSpec,
        range: &TimeRange,
        panel_interval: &str,
        framing: Framing,
        names: &[String],
        resolver: &dyn TemplateResolver,
    ) -> Result<Vec<TimeSeries>, QueryError> {
        let mut sets = Vec::with_capacity(names.len());
        for name in names {
            sets.push(parse_canonical_name(name)?.tags);
        }
        let resolved = TargetSpec {
            tags: TagFilter::Sets(sets),
            top_n: None,
            ..target.clone()
        };
        let document = match framing {
            Framing::Select => query::select_document(&resolved, range, resolver),
            Framing::GroupAggregate => {
                query::group_aggregate_document(&resolved, range, panel_interval, resolver)
            }
        };
        fetch_series(self.transport.as_ref(), &document, framing).await
    }
}
