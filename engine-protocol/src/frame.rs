//! Line framing for the engine's text responses.
//!
//! Responses use `\r\n` as the universal line separator. A body whose
//! first character is `-` is an error frame; the remainder of that first
//! line is a human-readable message. All other interpretation (record
//! widths, field meaning) belongs to [`crate::assemble`].

use crate::error::DecodeError;

/// Strip the one-character marker every payload line carries.
///
/// Empty lines stay empty; the sigil is always a single ASCII character.
pub fn strip_sigil(line: &str) -> &str {
    line.get(1..).unwrap_or("")
}

/// Split a response body into raw payload lines.
///
/// Returns [`DecodeError::ErrorFrame`] when the body is an error frame,
/// producing no lines at all. The empty line left behind by a trailing
/// separator is kept so record grouping can account for it.
pub fn split_lines(body: &str) -> Result<Vec<&str>, DecodeError> {
    if let Some(rest) = body.strip_prefix('-') {
        let message = rest.split("\r\n").next().unwrap_or("");
        return Err(DecodeError::ErrorFrame(message.to_string()));
    }
    Ok(body.split("\r\n").collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_frame_carries_engine_message() {
        let err = split_lines("-no such metric\r\n").unwrap_err();
        match err {
            DecodeError::ErrorFrame(message) => assert_eq!(message, "no such metric"),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[test]
    fn error_frame_without_terminator() {
        let err = split_lines("-query parser error").unwrap_err();
        assert_eq!(err.to_string(), "query parser error");
    }

    #[test]
    fn splits_on_crlf_keeping_trailing_empty() {
        let lines = split_lines("+a\r\n+b\r\n").unwrap();
        assert_eq!(lines, vec!["+a", "+b", ""]);
    }

    #[test]
    fn body_without_trailing_separator() {
        let lines = split_lines("+a\r\n+b").unwrap();
        assert_eq!(lines, vec!["+a", "+b"]);
    }

    #[test]
    fn empty_body_is_one_empty_line() {
        assert_eq!(split_lines("").unwrap(), vec![""]);
    }

    #[test]
    fn sigil_strip() {
        assert_eq!(strip_sigil("+cpu.load host=a"), "cpu.load host=a");
        assert_eq!(strip_sigil(":3.14"), "3.14");
        assert_eq!(strip_sigil(""), "");
    }
}
