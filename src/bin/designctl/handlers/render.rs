#![deny(clippy::all, clippy::pedantic)]

use std::{path::PathBuf, time::Duration};

use designctl::{
    application::error::AppError,
    domain::render::{DEFAULT_QUALITY, RenderRequest},
};
use designctl_api_types::{ListResponse, RenderJob, RenderJobStatus};
use reqwest::Method;
use serde_json::json;

use crate::args::{QuickRenderArgs, RenderArgs, RendersCmd};
use crate::client::{CliError, Ctx};
use crate::io::{read_data, write_output};
use crate::print::{opt, print_fields, print_json, print_table, spinner};

pub async fn render(ctx: &Ctx, args: RenderArgs) -> Result<(), CliError> {
    let data = read_data(args.data, args.data_file)?;
    let req = args
        .options
        .to_request(&args.target, ctx.default_format, ctx.default_quality)
        .with_dynamic_data(data);

    if !args.async_mode {
        let output = output_path(args.output, &req)?;
        return render_to(ctx, &req, output).await;
    }

    let accepted = ctx.orch.render_async(&req).await?;
    if !args.wait {
        if ctx.json {
            return print_json(&accepted);
        }
        println!(
            "job {} {}{}",
            accepted.job_id,
            accepted.status,
            accepted
                .estimated_time
                .map(|s| format!(" (about {s}s)"))
                .unwrap_or_default()
        );
        return Ok(());
    }

    let job = wait_job(ctx, &accepted.job_id, timeout(ctx, args.timeout)).await?;
    let output = output_path(args.output, &req)?;
    finish_job(ctx, job, Some(output)).await
}

pub async fn quick_render(ctx: &Ctx, args: QuickRenderArgs) -> Result<(), CliError> {
    let mut req = RenderRequest::for_design(args.design_id, ctx.default_format);
    req.quality = Some(ctx.default_quality.unwrap_or(DEFAULT_QUALITY));
    let output = output_path(args.output, &req)?;
    render_to(ctx, &req, output).await
}

pub async fn handle_renders(ctx: &Ctx, cmd: RendersCmd) -> Result<(), CliError> {
    match cmd {
        RendersCmd::Status { job_id } => {
            let job = ctx.orch.poll_status(&job_id).await?;
            if ctx.json {
                return print_json(&job);
            }
            print_job(&job);
            Ok(())
        }
        RendersCmd::Wait {
            job_id,
            timeout: secs,
            output,
        } => {
            let job = wait_job(ctx, &job_id, timeout(ctx, secs)).await?;
            finish_job(ctx, job, output).await
        }
        RendersCmd::List { page, limit } => list(ctx, page, limit).await,
    }
}

async fn render_to(ctx: &Ctx, req: &RenderRequest, output: PathBuf) -> Result<(), CliError> {
    let bytes = ctx.orch.render_sync(req).await?;
    write_output(&output, &bytes)?;
    if ctx.json {
        return print_json(&json!({ "output": output, "bytes": bytes.len() }));
    }
    println!("wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

fn output_path(explicit: Option<PathBuf>, req: &RenderRequest) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(PathBuf::from(
            req.default_file_name().map_err(AppError::from)?,
        )),
    }
}

fn timeout(ctx: &Ctx, secs: Option<u64>) -> Duration {
    secs.map_or(ctx.settings.render.timeout, Duration::from_secs)
}

async fn wait_job(ctx: &Ctx, job_id: &str, timeout: Duration) -> Result<RenderJob, CliError> {
    let bar = spinner(&format!("waiting for render {job_id}"), ctx.json);
    let result = ctx
        .orch
        .wait_for_completion_with(job_id, timeout, |job| {
            if let Some(bar) = &bar {
                bar.set_message(format!("render {job_id}: {}", job.status));
            }
        })
        .await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(result?)
}

/// Report a terminal job; a completed one is downloaded when `output` is set.
async fn finish_job(ctx: &Ctx, job: RenderJob, output: Option<PathBuf>) -> Result<(), CliError> {
    if job.status == RenderJobStatus::Failed {
        return Err(CliError::RenderFailed {
            job_id: job.job_id,
            reason: job.error.unwrap_or_else(|| "no reason given".into()),
        });
    }

    let Some(output) = output else {
        if ctx.json {
            return print_json(&job);
        }
        print_job(&job);
        return Ok(());
    };

    let bytes = ctx.orch.download_output(&job).await?;
    write_output(&output, &bytes)?;
    if ctx.json {
        return print_json(&json!({ "job": job, "output": output, "bytes": bytes.len() }));
    }
    println!(
        "render {} completed; wrote {} ({} bytes)",
        job.job_id,
        output.display(),
        bytes.len()
    );
    Ok(())
}

fn print_job(job: &RenderJob) {
    print_fields(&[
        ("job", job.job_id.clone()),
        ("status", job.status.to_string()),
        ("output", opt(job.output_url.as_deref())),
        ("error", opt(job.error.as_deref())),
        ("estimated", opt(job.estimated_time.map(|s| format!("{s}s")))),
    ]);
}

async fn list(ctx: &Ctx, page: u32, limit: u32) -> Result<(), CliError> {
    let q = [("page", page.to_string()), ("limit", limit.to_string())];
    let res: ListResponse<RenderJob> = ctx
        .client
        .request(Method::GET, "renders", Some(&q), None)
        .await?;
    if ctx.json {
        return print_json(&res);
    }
    let rows: Vec<Vec<String>> = res
        .data
        .iter()
        .map(|j| {
            vec![
                j.job_id.clone(),
                j.status.to_string(),
                opt(j.output_url.as_deref()),
            ]
        })
        .collect();
    print_table(&["JOB", "STATUS", "OUTPUT"], &rows);
    Ok(())
}
