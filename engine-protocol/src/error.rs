//! Decode errors for the engine's response protocol.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The engine answered with an error frame (`-<message>\r\n`). The
    /// message is the engine's own text and is shown to the dashboard
    /// author verbatim.
    #[error("{0}")]
    ErrorFrame(String),
    /// Payload line count is not a whole number of records.
    #[error("response is not a whole number of {width}-line records ({lines} lines)")]
    FrameMismatch { width: usize, lines: usize },
    #[error("invalid timestamp field {0:?}")]
    BadTimestamp(String),
    #[error("invalid value field {0:?}")]
    BadValue(String),
    /// A canonical series name must carry a metric and at least one
    /// `key=value` tag.
    #[error("series name {0:?} is missing a tag component")]
    MalformedSeriesName(String),
}
