#![deny(clippy::all, clippy::pedantic)]

use std::time::Duration;

use designctl::{
    application::{
        error::AppError,
        output::OutputTemplate,
        watch::{
            DirectoryWatchOptions, DirectoryWatcher, FileWatchOptions, FileWatcher, WatchReport,
        },
    },
    domain::render::RenderRequest,
    infra::fs_watch,
};

use crate::args::{WatchArgs, WatchDirArgs};
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn watch(ctx: &Ctx, args: WatchArgs) -> Result<(), CliError> {
    if !args.file.is_file() {
        return Err(CliError::InvalidInput(format!(
            "{} is not a file",
            args.file.display()
        )));
    }
    let request = args
        .options
        .to_request(&args.target, ctx.default_format, ctx.default_quality);
    request.target().map_err(AppError::from)?;
    let output = match args.output {
        Some(raw) => OutputTemplate::new(raw),
        None => OutputTemplate::new(default_file_name(&request)?),
    };
    let debounce = args
        .debounce_ms
        .map_or(ctx.settings.watch.debounce, Duration::from_millis);

    let (subscription, events) = fs_watch::watch_file(&args.file)?;
    if !ctx.json {
        eprintln!(
            "watching {} -> {} (Ctrl-C to stop)",
            args.file.display(),
            output.as_str()
        );
    }

    let watcher = FileWatcher::new(
        ctx.orch.clone(),
        FileWatchOptions {
            data_file: args.file,
            request,
            output,
            debounce,
            hook: args.hook,
        },
    );
    let report = watcher.run(events, interrupted()).await;
    drop(subscription);
    print_report(ctx, &report)
}

pub async fn watch_dir(ctx: &Ctx, args: WatchDirArgs) -> Result<(), CliError> {
    if !args.dir.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "{} is not a directory",
            args.dir.display()
        )));
    }
    let request = args
        .options
        .to_request(&args.target, ctx.default_format, ctx.default_quality);
    request.target().map_err(AppError::from)?;

    let (subscription, events) = fs_watch::watch_dir(&args.dir)?;
    if !ctx.json {
        eprintln!(
            "watching {} for *.{} -> {} (Ctrl-C to stop)",
            args.dir.display(),
            args.ext,
            args.output_dir.display()
        );
    }

    let watcher = DirectoryWatcher::new(
        ctx.orch.clone(),
        DirectoryWatchOptions {
            dir: args.dir,
            output_dir: args.output_dir,
            request,
            extension: args.ext.trim_start_matches('.').to_string(),
            settle: ctx.settings.watch.settle,
            delete_source: args.delete_source,
            hook: args.hook,
        },
    );
    let report = watcher.run(events, interrupted()).await;
    drop(subscription);
    print_report(ctx, &report)
}

/// Resolves on Ctrl-C; if the handler cannot be installed the watch runs
/// until its event stream closes.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn default_file_name(request: &RenderRequest) -> Result<String, CliError> {
    request
        .default_file_name()
        .map_err(|err| AppError::from(err).into())
}

fn print_report(ctx: &Ctx, report: &WatchReport) -> Result<(), CliError> {
    if ctx.json {
        return print_json(report);
    }
    eprintln!();
    println!("{} rendered, {} failed", report.rendered, report.failed);
    Ok(())
}
