//! Re-rendering on filesystem changes.
//!
//! [`FileWatcher`] follows one data file through the phases of
//! [`WatchPhase`]; [`DirectoryWatcher`] renders every data file dropped into a
//! directory once. Both take a channel of changed paths and a shutdown future
//! so they can be driven by `notify` in the binary and by hand in tests.

mod directory;
mod file;
mod hook;

use std::{fmt, path::Path};

use serde::Serialize;
use serde_json::Value;

pub use directory::{DirectoryWatchOptions, DirectoryWatcher};
pub use file::{FileWatchOptions, FileWatcher};
pub use hook::{OUTPUT_ENV, spawn_hook};

use super::{error::AppError, orchestrator::RenderOrchestrator};
use crate::{domain::render::RenderRequest, infra::fs::write_atomic_async};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    /// A change was seen and the debounce deadline is armed.
    PendingRender,
    Rendering,
}

impl fmt::Display for WatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::PendingRender => "pending_render",
            Self::Rendering => "rendering",
        })
    }
}

/// Totals for one watch session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchReport {
    pub rendered: u64,
    pub failed: u64,
}

/// Read `data_path` as dynamic data, render it and write the result to
/// `output`. Returns the number of bytes written.
pub(crate) async fn render_data_file(
    orch: &RenderOrchestrator,
    request: &RenderRequest,
    data_path: &Path,
    output: &Path,
) -> Result<usize, AppError> {
    let raw = tokio::fs::read_to_string(data_path).await?;
    let data: Value = serde_json::from_str(&raw)
        .map_err(|err| AppError::data_parse(data_path.display().to_string(), &err))?;

    let request = request.clone().with_dynamic_data(Some(data));
    let bytes = orch.render_sync(&request).await?;
    let written = bytes.len();
    write_atomic_async(output, bytes).await?;
    Ok(written)
}
