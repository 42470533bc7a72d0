//! designctl: command-line client for the design-automation API.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;
#[cfg(test)]
mod tests;

use std::process::ExitCode;

use clap::Parser;
use designctl::{
    config::{self, SettingsOverrides},
    infra::telemetry,
};

use args::{Cli, Commands};
use client::{App, CliError, open_store};
use handlers::{
    account, api_keys, assets, auth, batch, canvas, designs, export, misc, profiles, project,
    render, templates, watch,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Completion(args) = &cli.command {
        misc::completion(args);
        return Ok(());
    }

    let settings = config::load(&SettingsOverrides {
        config_file: cli.config_file.clone(),
        log_level: cli.log_level.clone(),
        log_json: cli.log_json.then_some(true),
        verbose: cli.verbose,
    })?;
    telemetry::init(&settings.logging)?;

    let app = App::new(settings, open_store(&cli), cli.json);
    dispatch(&app, cli.command).await
}

/// Store-only commands work without credentials; the rest resolve an API
/// context first.
pub(crate) async fn dispatch(app: &App, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Auth(cmd) => auth::handle(app, cmd.action).await,
        Commands::Config(cmd) => handlers::config::handle(app, cmd.action),
        Commands::Profiles(cmd) => profiles::handle(app, cmd.action),
        Commands::Init(args) => project::init(app, &args),
        Commands::Validate(args) => project::validate(app, &args),
        Commands::Open(args) => misc::open(app, &args),
        Commands::Completion(args) => {
            misc::completion(&args);
            Ok(())
        }
        Commands::Whoami => account::whoami(&app.ctx()?).await,
        Commands::Usage(args) => account::usage(&app.ctx()?, args).await,
        Commands::Billing => account::billing(&app.ctx()?).await,
        Commands::Designs(cmd) => designs::handle(&app.ctx()?, cmd.action).await,
        Commands::Templates(cmd) => templates::handle(&app.ctx()?, cmd.action).await,
        Commands::Render(args) => render::render(&app.ctx()?, args).await,
        Commands::QuickRender(args) => render::quick_render(&app.ctx()?, args).await,
        Commands::Renders(cmd) => render::handle_renders(&app.ctx()?, cmd.action).await,
        Commands::BatchRender(args) => batch::handle(&app.ctx()?, args).await,
        Commands::Export(args) => export::export(&app.ctx()?, args).await,
        Commands::ExportAll(args) => export::export_all(&app.ctx()?, args).await,
        Commands::Clone(args) => export::clone(&app.ctx()?, args).await,
        Commands::Diff(args) => export::diff(&app.ctx()?, args).await,
        Commands::Canvas(cmd) => canvas::handle(&app.ctx()?, cmd.action).await,
        Commands::Assets(cmd) => assets::handle(&app.ctx()?, cmd.action).await,
        Commands::ApiKeys(cmd) => api_keys::handle(&app.ctx()?, cmd.action).await,
        Commands::Watch(args) => watch::watch(&app.ctx()?, args).await,
        Commands::WatchDir(args) => watch::watch_dir(&app.ctx()?, args).await,
    }
}
