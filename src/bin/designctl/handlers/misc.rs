#![deny(clippy::all, clippy::pedantic)]

use std::{io::stdout, process::Command};

use clap::CommandFactory;
use clap_complete::generate;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::args::{Cli, CompletionArgs, OpenArgs};
use crate::client::{App, CliError};
use crate::print::print_json;

pub fn open(app: &App, args: &OpenArgs) -> Result<(), CliError> {
    let url = design_url(&app.settings.app.web_url, &args.design_id)?;
    if app.json {
        return print_json(&json!({ "url": url.as_str() }));
    }
    if args.print {
        println!("{url}");
        return Ok(());
    }

    let status = opener(url.as_str())
        .status()
        .map_err(|e| CliError::InvalidInput(format!("failed to launch a browser: {e}")))?;
    info!(
        target = "designctl::open",
        url = %url,
        status = status.code(),
        "Opened design"
    );
    if !status.success() {
        // Leave the link where the user can copy it.
        println!("{url}");
    }
    Ok(())
}

pub fn completion(args: &CompletionArgs) {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "designctl", &mut stdout());
}

fn design_url(web: &Url, design_id: &str) -> Result<Url, CliError> {
    let mut url = web.clone();
    url.path_segments_mut()
        .map_err(|()| CliError::InvalidInput(format!("app.web_url `{web}` cannot be a base")))?
        .pop_if_empty()
        .extend(["designs", design_id]);
    Ok(url)
}

#[cfg(target_os = "macos")]
fn opener(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(windows)]
fn opener(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(not(any(target_os = "macos", windows)))]
fn opener(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
