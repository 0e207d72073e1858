//! Name and value completion pass-throughs.
//!
//! The suggestion endpoint reuses the same line framing as query
//! responses, but each line is a bare name; no record grouping applies.

use engine_protocol::{split_lines, strip_sigil};
use serde_json::json;

use crate::error::QueryError;
use crate::models::Suggestion;
use crate::template::TemplateResolver;
use crate::transport::{Transport, SUGGEST_PATH};

fn decode_names(body: &str) -> Result<Vec<Suggestion>, QueryError> {
    let lines = split_lines(body)?;
    Ok(lines
        .iter()
        .map(|line| strip_sigil(line))
        .filter(|name| !name.is_empty())
        .map(Suggestion::new)
        .collect())
}

/// Metric names starting with `prefix`.
pub async fn metric_names(
    transport: &dyn Transport,
    prefix: &str,
) -> Result<Vec<Suggestion>, QueryError> {
    let body = transport
        .post(
            SUGGEST_PATH,
            json!({"select": "metric-names", "starts-with": prefix}),
        )
        .await
        .map_err(QueryError::Transport)?;
    decode_names(&body)
}

/// Tag keys of `metric` starting with `prefix`.
pub async fn tag_keys(
    transport: &dyn Transport,
    metric: &str,
    prefix: &str,
) -> Result<Vec<Suggestion>, QueryError> {
    let body = transport
        .post(
            SUGGEST_PATH,
            json!({"select": "tag-names", "metric": metric, "starts-with": prefix}),
        )
        .await
        .map_err(QueryError::Transport)?;
    decode_names(&body)
}

/// Values of `tag` on `metric` starting with `prefix`. When a resolver
/// is supplied its defined template variables are appended, so the
/// dashboard author can pick `$host` instead of a concrete value.
pub async fn tag_values(
    transport: &dyn Transport,
    metric: &str,
    tag: &str,
    prefix: &str,
    resolver: Option<&dyn TemplateResolver>,
) -> Result<Vec<Suggestion>, QueryError> {
    let body = transport
        .post(
            SUGGEST_PATH,
            json!({
                "select": "tag-values",
                "metric": metric,
                "tag": tag,
                "starts-with": prefix
            }),
        )
        .await
        .map_err(QueryError::Transport)?;
    let mut out = decode_names(&body)?;
    if let Some(resolver) = resolver {
        out.extend(resolver.variables().into_iter().map(Suggestion::new));
    }
    Ok(out)
}

/// Free-form completion: `""` lists metric names, `"<metric>"` lists its
/// tag keys, `"<metric> <tag>"` lists that tag's values.
pub async fn find(
    transport: &dyn Transport,
    resolver: &dyn TemplateResolver,
    raw: &str,
) -> Result<Vec<Suggestion>, QueryError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [] => metric_names(transport, "").await,
        [metric] => tag_keys(transport, metric, "").await,
        [metric, tag] => tag_values(transport, metric, tag, "", Some(resolver)).await,
        _ => Err(QueryError::InvalidFindQuery),
    }
}
