use std::{path::Path, process::Stdio, time::Instant};

use tokio::{process::Command, task::JoinHandle};
use tracing::{info, warn};

pub const OUTPUT_ENV: &str = "DESIGNCTL_OUTPUT";

/// Run `command` through the platform shell once a render has been written.
/// The hook is detached: its outcome is logged and never reported back.
pub fn spawn_hook(command: &str, output: &Path) -> JoinHandle<()> {
    let command = command.to_string();
    let output = output.to_path_buf();

    tokio::spawn(async move {
        let started_at = Instant::now();
        let result = shell(&command)
            .env(OUTPUT_ENV, &output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => info!(
                target = "application::watch::hook",
                op = "hook",
                result = "ok",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                command = %command,
                "Post-render hook finished"
            ),
            Ok(out) => warn!(
                target = "application::watch::hook",
                op = "hook",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                command = %command,
                exit_code = out.status.code().map(i64::from).unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&out.stderr),
                "Post-render hook failed"
            ),
            Err(err) => warn!(
                target = "application::watch::hook",
                op = "hook",
                result = "error",
                command = %command,
                error_code = "spawn_hook",
                error = %err,
                "Failed to spawn post-render hook"
            ),
        }
    })
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
