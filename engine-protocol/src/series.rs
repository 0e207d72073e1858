//! Canonical series-name handling.
//!
//! A stored series is identified by its canonical name: a metric followed
//! by space-separated `key=value` tags, e.g. `cpu.load host=a dc=east`.
//! Downsampled queries return names with a synthetic `:<aggregator>`
//! suffix on the metric token that must be stripped before per-series
//! grouping.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

// ------------------------------------------------------------------ //
//  Aggregators                                                        //
// ------------------------------------------------------------------ //

/// Server-side aggregation function of a downsampling query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    Mean,
    Sum,
    Count,
    Min,
    Max,
}

impl Aggregator {
    pub const ALL: [Aggregator; 5] = [
        Aggregator::Mean,
        Aggregator::Sum,
        Aggregator::Count,
        Aggregator::Min,
        Aggregator::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregator::Mean  => "mean",
            Aggregator::Sum   => "sum",
            Aggregator::Count => "count",
            Aggregator::Min   => "min",
            Aggregator::Max   => "max",
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Aggregator::Mean
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ------------------------------------------------------------------ //
//  Canonical names                                                    //
// ------------------------------------------------------------------ //

/// A series name split into its metric and tag components.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalName {
    pub metric: String,
    pub tags: HashMap<String, String>,
}

/// Remove the synthetic `:<aggregator>` suffix a downsampling query adds
/// to the metric token, e.g. `cpu.load:mean host=a` → `cpu.load host=a`.
///
/// A no-op when the metric token does not end in a known aggregator, so
/// metrics that legitimately contain `:` survive.
pub fn strip_aggregate_suffix(name: &str) -> String {
    let (metric, rest) = match name.split_once(' ') {
        Some((metric, rest)) => (metric, Some(rest)),
        None => (name, None),
    };
    let metric = match metric.rsplit_once(':') {
        Some((base, suffix)) if Aggregator::ALL.iter().any(|a| a.as_str() == suffix) => base,
        _ => metric,
    };
    match rest {
        Some(rest) => format!("{metric} {rest}"),
        None => metric.to_string(),
    }
}

/// Parse a canonical series name into its metric and tag set.
///
/// Every stored series carries at least one tag, so a name with fewer
/// than two tokens (or a tag token without `=`) is malformed.
pub fn parse_canonical_name(name: &str) -> Result<CanonicalName, DecodeError> {
    let mut parts = name.split_whitespace();
    let metric = parts
        .next()
        .ok_or_else(|| DecodeError::MalformedSeriesName(name.to_string()))?;

    let mut tags = HashMap::new();
    for part in parts {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| DecodeError::MalformedSeriesName(name.to_string()))?;
        tags.insert(key.to_string(), value.to_string());
    }
    if tags.is_empty() {
        return Err(DecodeError::MalformedSeriesName(name.to_string()));
    }

    Ok(CanonicalName {
        metric: metric.to_string(),
        tags,
    })
}
