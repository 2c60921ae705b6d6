//! Format sniffing: pick a parsing strategy without full validation.

use serde_json::Value;
use tracing::debug;

/// The result of sniffing a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A `{...}` object that parsed as JSON.
    Json(Value),
    /// Text carrying at least one heading or list marker.
    Markdown(String),
    /// Anything else, rendered as a single paragraph.
    PlainText(String),
}

/// Classify raw text as JSON, Markdown or plain text.
///
/// Only a trimmed `{ ... }` shape is tried as JSON, and a failed parse falls
/// back to [`Payload::PlainText`] with the original text.
pub fn sniff(raw: &str) -> Payload {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                debug!(error = %e, "json-shaped payload failed to parse");
                Payload::PlainText(raw.to_string())
            }
        };
    }

    if raw.lines().any(has_block_marker) {
        Payload::Markdown(raw.to_string())
    } else {
        Payload::PlainText(raw.to_string())
    }
}

fn has_block_marker(line: &str) -> bool {
    line.starts_with("## ") || line.starts_with("### ") || line.starts_with("- ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_is_json() {
        let payload = sniff("  {\"description\": \"Early blight\"}\n");
        match payload {
            Payload::Json(v) => assert_eq!(v["description"], "Early blight"),
            other => panic!("expected Json, got {other:?}"),
        }
    }

    #[test]
    fn broken_json_falls_back_to_plain_text() {
        let raw = "{not: valid json}";
        assert_eq!(sniff(raw), Payload::PlainText(raw.to_string()));
    }

    #[test]
    fn json_array_is_not_json_shaped() {
        let raw = "[1, 2, 3]";
        assert_eq!(sniff(raw), Payload::PlainText(raw.to_string()));
    }

    #[test]
    fn markers_make_markdown() {
        let raw = "Intro line\n## Treatment\n- spray copper";
        assert_eq!(sniff(raw), Payload::Markdown(raw.to_string()));
    }

    #[test]
    fn prose_is_plain_text() {
        let raw = "Plant appears healthy. No treatment needed.";
        assert_eq!(sniff(raw), Payload::PlainText(raw.to_string()));
    }
}
