#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use designctl::infra::api_client::endpoint;
use reqwest::Method;
use serde_json::{Value, json};

use crate::args::CanvasCmd;
use crate::client::{CliError, Ctx};
use crate::io::{parse_json, read_file, write_output};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: CanvasCmd) -> Result<(), CliError> {
    match cmd {
        CanvasCmd::Get { design_id, output } => get(ctx, &design_id, output).await,
        CanvasCmd::Set { design_id, file } => set(ctx, &design_id, &file).await,
    }
}

async fn get(ctx: &Ctx, design_id: &str, output: Option<PathBuf>) -> Result<(), CliError> {
    let path = endpoint(&["designs", design_id, "canvas"])?;
    let canvas: Value = ctx.client.request(Method::GET, &path, None, None).await?;

    let Some(output) = output else {
        return print_json(&canvas);
    };
    let body = serde_json::to_string_pretty(&canvas)
        .map_err(|e| CliError::InvalidInput(format!("failed to encode canvas: {e}")))?;
    write_output(&output, body.as_bytes())?;
    if ctx.json {
        return print_json(&json!({ "design": design_id, "output": output }));
    }
    println!("wrote {}", output.display());
    Ok(())
}

async fn set(ctx: &Ctx, design_id: &str, file: &Path) -> Result<(), CliError> {
    let canvas = parse_json(&read_file(file)?, &file.display().to_string())?;
    let path = endpoint(&["designs", design_id, "canvas"])?;
    let res: Value = ctx
        .client
        .request(Method::PUT, &path, None, Some(canvas))
        .await?;
    if ctx.json {
        return print_json(&res);
    }
    println!("canvas of {design_id} updated");
    Ok(())
}
