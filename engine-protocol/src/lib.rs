//! Wire codec for the time-series engine's text query protocol.
//!
//! The engine answers query and suggestion requests with a CRLF-framed
//! text body: every payload line starts with a one-character sigil,
//! records span a fixed number of lines (3 for raw `select` responses,
//! 4 for `group-aggregate`), and a body whose first character is `-` is
//! an error frame carrying a message for the dashboard author.
//!
//! This crate decodes that stream into per-series time-value sequences
//! and owns canonical series-name handling (tag extraction, synthetic
//! aggregator-suffix stripping).

pub mod assemble;
pub mod error;
pub mod frame;
pub mod series;

pub use assemble::{assemble, decode_response, series_names, DataPoint, Framing, TimeSeries};
pub use error::DecodeError;
pub use frame::{split_lines, strip_sigil};
pub use series::{parse_canonical_name, strip_aggregate_suffix, Aggregator, CanonicalName};
