//! Ambiguity marker parsing.
//!
//! Grammar: the first occurrence of `DECISION_REQUIRED:` anywhere in the text
//! starts the marker. Its body runs up to the next occurrence of the marker or
//! the end of the text, and is split on `|`; options are trimmed and empty
//! options dropped.
//!
//! Known edge case: the match is not anchored to a line start, so output that
//! merely talks about `DECISION_REQUIRED:` trips the marker, and prose after
//! the last `|` ends up inside the final option.

/// Literal that introduces a decision request in generation output.
pub const DECISION_MARKER: &str = "DECISION_REQUIRED:";

/// A decision request found in generation output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionMarker {
    pub options: Vec<String>,
}

/// Find the ambiguity marker in `text`, if any.
pub fn parse_decision_marker(text: &str) -> Option<DecisionMarker> {
    let start = text.find(DECISION_MARKER)? + DECISION_MARKER.len();
    let rest = &text[start..];
    let body = match rest.find(DECISION_MARKER) {
        Some(next) => &rest[..next],
        None => rest,
    };

    let options = body
        .trim()
        .split('|')
        .map(str::trim)
        .filter(|opt| !opt.is_empty())
        .map(str::to_string)
        .collect();

    Some(DecisionMarker { options })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_marker() {
        assert_eq!(parse_decision_marker("A layered architecture."), None);
    }

    #[test]
    fn test_options_are_split_and_trimmed() {
        let marker = parse_decision_marker("DECISION_REQUIRED: microservices | monolith").unwrap();
        assert_eq!(marker.options, vec!["microservices", "monolith"]);
    }

    #[test]
    fn test_options_without_spaces() {
        let marker = parse_decision_marker("DECISION_REQUIRED: microservices|monolith").unwrap();
        assert_eq!(marker.options, vec!["microservices", "monolith"]);
    }

    #[test]
    fn test_marker_mid_text() {
        let text = "# Architecture\n\nTwo viable shapes.\nDECISION_REQUIRED: event-sourced | crud\n";
        let marker = parse_decision_marker(text).unwrap();
        assert_eq!(marker.options, vec!["event-sourced", "crud"]);
    }

    #[test]
    fn test_empty_options_are_dropped() {
        let marker = parse_decision_marker("DECISION_REQUIRED: a || b |").unwrap();
        assert_eq!(marker.options, vec!["a", "b"]);
    }

    #[test]
    fn test_marker_without_options() {
        let marker = parse_decision_marker("DECISION_REQUIRED:").unwrap();
        assert!(marker.options.is_empty());
    }

    #[test]
    fn test_only_first_marker_is_used() {
        let text = "DECISION_REQUIRED: a | b\nDECISION_REQUIRED: c | d";
        let marker = parse_decision_marker(text).unwrap();
        assert_eq!(marker.options, vec!["a", "b"]);
    }

    #[test]
    fn test_trailing_prose_lands_in_last_option() {
        // Documented edge case: the body is not line-bounded
        let text = "DECISION_REQUIRED: sql | nosql\nThanks for reading.";
        let marker = parse_decision_marker(text).unwrap();
        assert_eq!(marker.options, vec!["sql", "nosql\nThanks for reading."]);
    }

    #[test]
    fn test_discussion_of_marker_still_matches() {
        // Documented edge case: mentioning the marker trips it
        let text = "We avoided emitting DECISION_REQUIRED: here.";
        assert!(parse_decision_marker(text).is_some());
    }
}
