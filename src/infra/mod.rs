//! Adapters for the outside world: the HTTP API, the filesystem and logging.

pub mod api_client;
pub mod error;
pub mod fs;
pub mod fs_watch;
pub mod telemetry;
