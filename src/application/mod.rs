//! Render orchestration, watching and batch services.

pub mod batch;
pub mod diff;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod watch;
