//! Engine query-document construction.
//!
//! Pure functions mapping a panel target plus a resolved time range and
//! interval into the engine's JSON query document. Four shapes exist:
//! raw select, group-aggregate, and the top-N phase-1 variant of each
//! (select-shaped with only the ranking stage applied).

use chrono::{DateTime, Utc};
use engine_protocol::Aggregator;
use serde::Serialize;

use crate::error::QueryError;
use crate::models::{TagFilter, TargetSpec, TimeRange};
use crate::template::TemplateResolver;

/// Timestamp layout the engine expects in `range`.
const RANGE_FORMAT: &str = "%Y%m%dT%H%M%S%.3f";

// ------------------------------------------------------------------ //
//  Wire types                                                         //
// ------------------------------------------------------------------ //

/// Post-processing stage; the engine evaluates `apply` left-to-right.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name")]
pub enum ApplyStage {
    #[serde(rename = "rate")]
    Rate,
    #[serde(rename = "ewma-error")]
    EwmaError { decay: f64 },
    #[serde(rename = "top")]
    Top {
        #[serde(rename = "N")]
        n: u32,
    },
}

/// Query shape: raw values or server-side downsampling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryShape {
    #[serde(rename = "select")]
    Select(String),
    #[serde(rename = "group-aggregate")]
    GroupAggregate {
        metric: String,
        step: String,
        func: Vec<Aggregator>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRange {
    pub from: String,
    pub to: String,
}

impl QueryRange {
    fn new(range: &TimeRange) -> Self {
        Self {
            from: format_instant(range.from),
            to: format_instant(range.to),
        }
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(RANGE_FORMAT).to_string()
}

/// Wire-level request document for the engine's query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDocument {
    #[serde(flatten)]
    pub shape: QueryShape,
    pub range: QueryRange,
    #[serde(rename = "where")]
    pub filter: TagFilter,
    #[serde(rename = "order-by")]
    pub order_by: &'static str,
    pub apply: Vec<ApplyStage>,
}

// ------------------------------------------------------------------ //
//  Builders                                                           //
// ------------------------------------------------------------------ //

/// Resolve template placeholders in a single tag map. Concrete tag sets
/// (top-N phase 2) are already resolved and pass through untouched.
fn resolve_filter(tags: &TagFilter, resolver: &dyn TemplateResolver) -> TagFilter {
    match tags {
        TagFilter::Single(map) => TagFilter::Single(
            map.iter()
                .map(|(key, value)| (key.clone(), resolver.resolve(value)))
                .collect(),
        ),
        TagFilter::Sets(sets) => TagFilter::Sets(sets.clone()),
    }
}

/// Rate before EWMA: the only supported stage order.
fn post_processing(target: &TargetSpec) -> Vec<ApplyStage> {
    let mut apply = Vec::new();
    if target.should_compute_rate {
        apply.push(ApplyStage::Rate);
    }
    if target.should_ewma {
        apply.push(ApplyStage::EwmaError {
            decay: target.decay,
        });
    }
    apply
}

/// Build a raw `select` document.
pub fn select_document(
    target: &TargetSpec,
    range: &TimeRange,
    resolver: &dyn TemplateResolver,
) -> QueryDocument {
    QueryDocument {
        shape: QueryShape::Select(target.metric.clone()),
        range: QueryRange::new(range),
        filter: resolve_filter(&target.tags, resolver),
        order_by: "series",
        apply: post_processing(target),
    }
}

/// Build a downsampling `group-aggregate` document. The target's own
/// interval wins over the panel interval.
pub fn group_aggregate_document(
    target: &TargetSpec,
    range: &TimeRange,
    panel_interval: &str,
    resolver: &dyn TemplateResolver,
) -> QueryDocument {
    let step = target
        .downsample_interval
        .clone()
        .unwrap_or_else(|| panel_interval.to_string());
    QueryDocument {
        shape: QueryShape::GroupAggregate {
            metric: target.metric.clone(),
            step,
            func: vec![target.downsample_aggregator],
        },
        range: QueryRange::new(range),
        filter: resolve_filter(&target.tags, resolver),
        order_by: "series",
        apply: post_processing(target),
    }
}

/// Build the phase-1 document of a top-N query: select-shaped whatever
/// the phase-2 shape, with `apply` holding only the ranking stage (rate
/// and EWMA wait for phase 2).
pub fn top_n_document(
    target: &TargetSpec,
    range: &TimeRange,
    resolver: &dyn TemplateResolver,
) -> Result<QueryDocument, QueryError> {
    let n = match target.top_n {
        Some(n) if n > 0 => n,
        _ => return Err(QueryError::InvalidTopN),
    };
    Ok(QueryDocument {
        shape: QueryShape::Select(target.metric.clone()),
        range: QueryRange::new(range),
        filter: resolve_filter(&target.tags, resolver),
        order_by: "series",
        apply: vec![ApplyStage::Top { n }],
    })
}

/// Compile one target into its wire document, dispatching on its shape.
/// Top-N targets compile to their phase-1 form.
pub fn document_for(
    target: &TargetSpec,
    range: &TimeRange,
    panel_interval: &str,
    resolver: &dyn TemplateResolver,
) -> Result<QueryDocument, QueryError> {
    if target.top_n.is_some() {
        top_n_document(target, range, resolver)
    } else if target.disable_downsampling {
        Ok(select_document(target, range, resolver))
    } else {
        Ok(group_aggregate_document(target, range, panel_interval, resolver))
    }
}

/// Compile every target of a panel. Fails fast when there is nothing to
/// compile; a caller holding only hidden targets must not call this.
pub fn build_all(
    targets: &[TargetSpec],
    range: &TimeRange,
    panel_interval: &str,
    resolver: &dyn TemplateResolver,
) -> Result<Vec<QueryDocument>, QueryError> {
    if targets.is_empty() {
        return Err(QueryError::NoTargets);
    }
    targets
        .iter()
        .map(|target| document_for(target, range, panel_interval, resolver))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;

    use crate::template::StaticResolver;

    fn range() -> TimeRange {
        TimeRange {
            from: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2021, 1, 1, 1, 0, 0).unwrap(),
        }
    }

    fn target(metric: &str) -> TargetSpec {
        serde_json::from_value(json!({ "metric": metric })).unwrap()
    }

    fn no_vars() -> StaticResolver {
        StaticResolver::default()
    }

    #[test]
    fn group_aggregate_round_trip() {
        let mut t = target("cpu.load");
        t.should_compute_rate = true;
        let doc = group_aggregate_document(&t, &range(), "10s", &no_vars());
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "group-aggregate": {
                    "metric": "cpu.load",
                    "step": "10s",
                    "func": ["mean"]
                },
                "range": {
                    "from": "20210101T000000.000",
                    "to": "20210101T010000.000"
                },
                "where": {},
                "order-by": "series",
                "apply": [{"name": "rate"}]
            })
        );
    }

    #[test]
    fn select_document_shape() {
        let doc = select_document(&target("cpu.load"), &range(), &no_vars());
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["select"], "cpu.load");
        assert_eq!(value["order-by"], "series");
        assert_eq!(value["apply"], json!([]));
    }

    #[test]
    fn rate_precedes_ewma() {
        let mut t = target("m");
        t.should_compute_rate = true;
        t.should_ewma = true;
        t.decay = 0.25;
        let doc = select_document(&t, &range(), &no_vars());
        assert_eq!(
            doc.apply,
            vec![ApplyStage::Rate, ApplyStage::EwmaError { decay: 0.25 }]
        );
    }

    #[test]
    fn ewma_alone_uses_configured_decay() {
        let mut t = target("m");
        t.should_ewma = true;
        let doc = select_document(&t, &range(), &no_vars());
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["apply"],
            json!([{"name": "ewma-error", "decay": 0.5}])
        );
    }

    #[test]
    fn target_interval_overrides_panel_interval() {
        let mut t = target("m");
        t.downsample_interval = Some("1m".to_string());
        let doc = group_aggregate_document(&t, &range(), "10s", &no_vars());
        assert!(matches!(doc.shape, QueryShape::GroupAggregate { ref step, .. } if step == "1m"));
    }

    #[test]
    fn tag_values_are_template_resolved() {
        let mut t = target("m");
        t.tags = TagFilter::Single(HashMap::from([("host".to_string(), "$host".to_string())]));
        let resolver =
            StaticResolver::new(HashMap::from([("host".to_string(), "web-1".to_string())]));
        let doc = select_document(&t, &range(), &resolver);
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["where"],
            json!({"host": "web-1"})
        );
    }

    #[test]
    fn resolved_tag_sets_pass_through() {
        let mut t = target("m");
        t.tags = TagFilter::Sets(vec![
            HashMap::from([("host".to_string(), "x".to_string())]),
            HashMap::from([("host".to_string(), "y".to_string())]),
        ]);
        let resolver =
            StaticResolver::new(HashMap::from([("host".to_string(), "web-1".to_string())]));
        let doc = select_document(&t, &range(), &resolver);
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["where"],
            json!([{"host": "x"}, {"host": "y"}])
        );
    }

    #[test]
    fn top_n_overrides_post_processing() {
        let mut t = target("cpu.load");
        t.top_n = Some(5);
        t.should_compute_rate = true;
        t.should_ewma = true;
        let doc = top_n_document(&t, &range(), &no_vars()).unwrap();
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["apply"],
            json!([{"name": "top", "N": 5}])
        );
        assert!(matches!(doc.shape, QueryShape::Select(ref m) if m == "cpu.load"));
    }

    #[test]
    fn top_n_requires_positive_integer() {
        let mut t = target("m");
        t.top_n = Some(0);
        assert!(matches!(
            top_n_document(&t, &range(), &no_vars()),
            Err(QueryError::InvalidTopN)
        ));
        t.top_n = None;
        assert!(matches!(
            top_n_document(&t, &range(), &no_vars()),
            Err(QueryError::InvalidTopN)
        ));
    }

    #[test]
    fn document_for_dispatches_on_target_shape() {
        let mut raw = target("m");
        raw.disable_downsampling = true;
        let doc = document_for(&raw, &range(), "10s", &no_vars()).unwrap();
        assert!(matches!(doc.shape, QueryShape::Select(_)));

        let doc = document_for(&target("m"), &range(), "10s", &no_vars()).unwrap();
        assert!(matches!(doc.shape, QueryShape::GroupAggregate { .. }));

        let mut top = target("m");
        top.top_n = Some(3);
        let doc = document_for(&top, &range(), "10s", &no_vars()).unwrap();
        assert_eq!(doc.apply, vec![ApplyStage::Top { n: 3 }]);
    }

    #[test]
    fn zero_targets_fail_fast() {
        assert!(matches!(
            build_all(&[], &range(), "10s", &no_vars()),
            Err(QueryError::NoTargets)
        ));
    }

    #[test]
    fn build_all_compiles_each_target() {
        let docs = build_all(&[target("a"), target("b")], &range(), "10s", &no_vars()).unwrap();
        assert_eq!(docs.len(), 2);
    }
}
