//! Error taxonomy for panel query execution.

use engine_protocol::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Error frame or malformed payload from the engine. The message is
    /// surfaced verbatim; it is meant for the dashboard author.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The transport collaborator failed; its error passes through
    /// opaquely.
    #[error("transport: {0}")]
    Transport(anyhow::Error),
    #[error("at least one query target is required")]
    NoTargets,
    #[error("top-N must be a positive integer")]
    InvalidTopN,
    #[error("invalid find query: expected \"\", \"<metric>\" or \"<metric> <tag>\"")]
    InvalidFindQuery,
    #[error("encoding query document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("query task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
