//! Reconstructs per-series time-value sequences from decoded lines.
//!
//! Records span a fixed number of lines depending on the query shape.
//! The engine emits all datapoints of one series contiguously
//! (`order-by: "series"` in the query document), so a change of the
//! series marker is a series boundary; non-contiguous repeats of a name
//! would split into disjoint entries, which is a protocol precondition
//! rather than something this layer repairs.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::error::DecodeError;
use crate::frame::{split_lines, strip_sigil};
use crate::series::strip_aggregate_suffix;

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// Fixed record width of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Raw `select` responses: series, timestamp, value. Top-N phase-1
    /// responses use this framing regardless of the phase-2 shape.
    Select,
    /// `group-aggregate` responses carry a reserved field between the
    /// timestamp and the value.
    GroupAggregate,
}

impl Framing {
    pub fn width(self) -> usize {
        match self {
            Framing::Select => 3,
            Framing::GroupAggregate => 4,
        }
    }
}

/// A single decoded observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub value: f64,
    pub timestamp: DateTime<Local>,
}

/// One reconstructed series, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
}

// ------------------------------------------------------------------ //
//  Field parsing                                                      //
// ------------------------------------------------------------------ //

/// Parse an engine timestamp (`YYYYMMDDTHHmmss.SSS`, UTC) and convert it
/// to local time for display.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Local>, DecodeError> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S"))
        .map_err(|_| DecodeError::BadTimestamp(raw.to_string()))?;
    Ok(Utc.from_utc_datetime(&naive).with_timezone(&Local))
}

fn parse_value(raw: &str) -> Result<f64, DecodeError> {
    raw.parse()
        .map_err(|_| DecodeError::BadValue(raw.to_string()))
}

// ------------------------------------------------------------------ //
//  Assembly                                                           //
// ------------------------------------------------------------------ //

/// Fold state: finished series plus the one still accumulating.
#[derive(Default)]
struct Accumulator {
    done: Vec<TimeSeries>,
    open: Option<TimeSeries>,
}

impl Accumulator {
    /// Append one observation, closing the open series on a name change.
    fn push(&mut self, name: String, point: DataPoint) {
        match &mut self.open {
            Some(series) if series.name == name => series.points.push(point),
            Some(_) => {
                let closed = self.open.replace(TimeSeries {
                    name,
                    points: vec![point],
                });
                self.done.extend(closed);
            }
            None => {
                self.open = Some(TimeSeries {
                    name,
                    points: vec![point],
                });
            }
        }
    }

    /// Flush the still-open series; skipping this would silently drop
    /// the last series of the stream.
    fn finish(mut self) -> Vec<TimeSeries> {
        self.done.extend(self.open.take());
        self.done
    }
}

/// Reassemble series from payload lines.
///
/// `strip_suffix` removes the synthetic aggregator suffix from series
/// markers and only applies to [`Framing::GroupAggregate`] responses.
pub fn assemble(
    lines: &[&str],
    framing: Framing,
    strip_suffix: bool,
) -> Result<Vec<TimeSeries>, DecodeError> {
    let width = framing.width();
    let chunks = lines.chunks_exact(width);
    // A trailing separator leaves exactly one empty line behind; any
    // other remainder is a framing violation.
    let remainder = chunks.remainder();
    if !(remainder.is_empty() || remainder == [""]) {
        return Err(DecodeError::FrameMismatch {
            width,
            lines: lines.len(),
        });
    }

    let mut acc = Accumulator::default();
    for group in chunks {
        let raw_name = strip_sigil(group[0]);
        let name = if strip_suffix {
            strip_aggregate_suffix(raw_name)
        } else {
            raw_name.to_string()
        };
        let timestamp = parse_timestamp(strip_sigil(group[1]))?;
        let value = parse_value(strip_sigil(group[width - 1]))?;
        acc.push(name, DataPoint { value, timestamp });
    }
    Ok(acc.finish())
}

/// Decode a whole response body in one step: error-frame detection, line
/// splitting, and record grouping.
pub fn decode_response(
    body: &str,
    framing: Framing,
    strip_suffix: bool,
) -> Result<Vec<TimeSeries>, DecodeError> {
    let lines = split_lines(body)?;
    assemble(&lines, framing, strip_suffix)
}

/// Collect the series-marker line of every record, skipping blank names.
///
/// Name-only responses (top-N phase 1) always use the 3-line `select`
/// framing, whatever shape phase 2 will take.
pub fn series_names(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .step_by(Framing::Select.width())
        .map(|line| strip_sigil(line))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
