//! Signals that a stage can read out of generation output.
//!
//! Currently one signal exists: the ambiguity marker
//!
//! ```text
//! DECISION_REQUIRED: option one | option two | ...
//! ```
//!
//! which asks for a human choice before the stage's artifact is accepted.

mod parser;

pub use parser::{DECISION_MARKER, DecisionMarker, parse_decision_marker};
