pub mod config;
pub mod context;
pub mod errors;
pub mod gates;
pub mod generate;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod signals;
pub mod stage;
pub mod store;
pub mod templates;
pub mod trace;
pub mod ui;
