//! HTTP request/response models for the panel query API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use engine_protocol::{Aggregator, TimeSeries};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------ //
//  Inbound (panel → gateway)                                          //
// ------------------------------------------------------------------ //

/// Tag filter of a query: a single tag map before top-N resolution, or
/// the list of concrete tag sets produced by it. The engine accepts
/// `where` in either shape and ORs the tagmaps of an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagFilter {
    Single(HashMap<String, String>),
    Sets(Vec<HashMap<String, String>>),
}

impl Default for TagFilter {
    fn default() -> Self {
        TagFilter::Single(HashMap::new())
    }
}

/// One requested series query from a dashboard panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    pub metric: String,
    /// Tag values may embed `$variable` placeholders.
    #[serde(default)]
    pub tags: TagFilter,
    #[serde(default)]
    pub downsample_aggregator: Aggregator,
    /// Overrides the panel interval when set.
    #[serde(default)]
    pub downsample_interval: Option<String>,
    #[serde(default)]
    pub should_compute_rate: bool,
    #[serde(default, rename = "shouldEWMA")]
    pub should_ewma: bool,
    /// EWMA decay in (0, 1].
    #[serde(default = "default_decay")]
    pub decay: f64,
    /// Selects the raw `select` query shape instead of `group-aggregate`.
    #[serde(default)]
    pub disable_downsampling: bool,
    /// Restrict the query to the N highest-ranked series (two-phase).
    #[serde(default)]
    pub top_n: Option<u32>,
    /// Hidden targets are skipped and contribute an empty result.
    #[serde(default)]
    pub hide: bool,
}

fn default_decay() -> f64 {
    0.5
}

/// Absolute UTC query window; half-open on the engine side.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Panel query request: shared range and interval plus per-series targets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRequest {
    pub range: TimeRange,
    pub interval: String,
    /// Upper bound on points per series; accepted for wire compatibility
    /// but not forwarded to the engine.
    #[serde(default)]
    pub max_data_points: Option<u64>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    /// Concrete values for `$variable` placeholders in tag values.
    #[serde(default)]
    pub scoped_vars: HashMap<String, String>,
}

/// Request body for `POST /search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub target: String,
    /// Template variables offered as tag-value completions.
    #[serde(default)]
    pub scoped_vars: HashMap<String, String>,
}

// ------------------------------------------------------------------ //
//  Outbound (gateway → panel)                                         //
// ------------------------------------------------------------------ //

/// Panel query response.
#[derive(Debug, Serialize)]
pub struct PanelResponse {
    pub data: Vec<PanelSeries>,
}

/// One series rendered for the panel; `datapoints` holds
/// `[value, unix-millis]` pairs.
#[derive(Debug, PartialEq, Serialize)]
pub struct PanelSeries {
    pub target: String,
    pub datapoints: Vec<(f64, i64)>,
}

impl From<TimeSeries> for PanelSeries {
    fn from(series: TimeSeries) -> Self {
        Self {
            target: series.name,
            datapoints: series
                .points
                .into_iter()
                .map(|p| (p.value, p.timestamp.timestamp_millis()))
                .collect(),
        }
    }
}

/// A single completion offered by the suggestion endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub value: String,
}

impl Suggestion {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            value: name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use engine_protocol::DataPoint;

    #[test]
    fn target_deserializes_panel_field_names() {
        let target: TargetSpec = serde_json::from_value(serde_json::json!({
            "metric": "cpu.load",
            "tags": {"host": "$host"},
            "downsampleAggregator": "max",
            "downsampleInterval": "30s",
            "shouldComputeRate": true,
            "shouldEWMA": true,
            "decay": 0.25,
            "disableDownsampling": false,
            "topN": 3,
            "hide": false
        }))
        .unwrap();
        assert_eq!(target.metric, "cpu.load");
        assert_eq!(target.downsample_aggregator, Aggregator::Max);
        assert_eq!(target.downsample_interval.as_deref(), Some("30s"));
        assert!(target.should_compute_rate);
        assert!(target.should_ewma);
        assert_eq!(target.decay, 0.25);
        assert_eq!(target.top_n, Some(3));
    }

    #[test]
    fn target_defaults() {
        let target: TargetSpec =
            serde_json::from_value(serde_json::json!({"metric": "m"})).unwrap();
        assert_eq!(target.tags, TagFilter::default());
        assert_eq!(target.downsample_aggregator, Aggregator::Mean);
        assert_eq!(target.decay, 0.5);
        assert!(!target.should_compute_rate);
        assert!(!target.should_ewma);
        assert!(!target.disable_downsampling);
        assert_eq!(target.top_n, None);
        assert!(!target.hide);
    }

    #[test]
    fn tag_filter_accepts_both_shapes() {
        let single: TagFilter =
            serde_json::from_value(serde_json::json!({"host": "a"})).unwrap();
        assert!(matches!(single, TagFilter::Single(ref m) if m["host"] == "a"));

        let sets: TagFilter =
            serde_json::from_value(serde_json::json!([{"host": "a"}, {"host": "b"}])).unwrap();
        assert!(matches!(sets, TagFilter::Sets(ref v) if v.len() == 2));
    }

    #[test]
    fn panel_series_renders_unix_millis() {
        let instant = Local.timestamp_millis_opt(1_609_459_200_000).unwrap();
        let series = TimeSeries {
            name: "m host=a".to_string(),
            points: vec![DataPoint {
                value: 1.5,
                timestamp: instant,
            }],
        };
        let rendered = PanelSeries::from(series);
        assert_eq!(rendered.target, "m host=a");
        assert_eq!(rendered.datapoints, vec![(1.5, 1_609_459_200_000)]);
    }

    #[test]
    fn panel_request_parses_range_and_vars() {
        let req: PanelRequest = serde_json::from_value(serde_json::json!({
            "range": {"from": "2021-01-01T00:00:00Z", "to": "2021-01-01T01:00:00Z"},
            "interval": "10s",
            "maxDataPoints": 500,
            "targets": [{"metric": "m"}],
            "scopedVars": {"host": "web-1"}
        }))
        .unwrap();
        assert_eq!(req.interval, "10s");
        assert_eq!(req.max_data_points, Some(500));
        assert_eq!(req.targets.len(), 1);
        assert_eq!(req.scoped_vars["host"], "web-1");
    }
}
