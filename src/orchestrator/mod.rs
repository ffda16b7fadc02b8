//! Pipeline driver: runs the fixed stage sequence and owns the decision gate.

mod driver;
mod summary;

pub use driver::Pipeline;
pub use summary::{ResolvedDecision, RunSummary, StageRun};
