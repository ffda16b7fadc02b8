//! CLI command implementations.
//!
//! | Module    | Commands handled               |
//! |-----------|--------------------------------|
//! | `run`     | `Run`, `Stage`                 |
//! | `status`  | `Status`, `Trace`, `Decisions` |
//! | `decide`  | `Decide`                       |
//! | `config`  | `Config`                       |

pub mod config;
pub mod decide;
pub mod run;
pub mod status;

pub use config::cmd_config;
pub use decide::cmd_decide;
pub use run::{run_pipeline, run_single_stage};
pub use status::{cmd_decisions, cmd_status, cmd_trace};
