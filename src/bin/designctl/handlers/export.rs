#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use designctl::{
    application::diff::{Change, diff_designs},
    domain::render::safe_file_stem,
    infra::api_client::endpoint,
};
use designctl_api_types::{Design, ListResponse};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::info;

use crate::args::{CloneArgs, DiffArgs, ExportAllArgs, ExportArgs};
use crate::client::{CliError, Ctx};
use crate::io::write_output;
use crate::print::{print_json, print_table};

async fn fetch_design(ctx: &Ctx, id: &str) -> Result<Value, CliError> {
    let path = endpoint(&["designs", id])?;
    Ok(ctx.client.request(Method::GET, &path, None, None).await?)
}

fn pretty(value: &Value) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::InvalidInput(format!("failed to encode design: {e}")))
}

pub async fn export(ctx: &Ctx, args: ExportArgs) -> Result<(), CliError> {
    let design = fetch_design(ctx, &args.design_id).await?;
    let output = args
        .output
        .unwrap_or_else(|| {
            PathBuf::from(format!("{}.json", safe_file_stem(&args.design_id)))
        });

    if output.as_os_str() == "-" {
        println!("{}", pretty(&design)?);
        return Ok(());
    }
    write_output(&output, pretty(&design)?.as_bytes())?;
    if ctx.json {
        return print_json(&json!({ "design": args.design_id, "output": output }));
    }
    println!("exported {} to {}", args.design_id, output.display());
    Ok(())
}

pub async fn export_all(ctx: &Ctx, args: ExportAllArgs) -> Result<(), CliError> {
    if args.limit == 0 {
        return Err(CliError::InvalidInput("--limit must be at least 1".into()));
    }
    let mut exported = Vec::new();
    let mut page = 1u32;

    loop {
        let q = [("page", page.to_string()), ("limit", args.limit.to_string())];
        let res: ListResponse<Design> = ctx
            .client
            .request(Method::GET, "designs", Some(&q), None)
            .await?;
        let fetched = res.data.len();

        for summary in res.data {
            let design = fetch_design(ctx, &summary.id).await?;
            let output = export_path(&args.dir, &summary.id);
            write_output(&output, pretty(&design)?.as_bytes())?;
            if !ctx.json {
                eprintln!("exported {}", output.display());
            }
            exported.push(output);
        }

        let reached_total = res
            .total
            .is_some_and(|total| exported.len() as u64 >= total);
        if fetched < args.limit as usize || reached_total {
            break;
        }
        page += 1;
    }

    info!(
        target = "designctl::export_all",
        exported = exported.len(),
        dir = %args.dir.display(),
        "Export finished"
    );
    if ctx.json {
        return print_json(&json!({ "exported": exported }));
    }
    println!("exported {} designs to {}", exported.len(), args.dir.display());
    Ok(())
}

fn export_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.json", safe_file_stem(id)))
}

pub async fn clone(ctx: &Ctx, args: CloneArgs) -> Result<(), CliError> {
    let path = endpoint(&["designs", &args.design_id, "duplicate"])?;
    let body = args.name.map(|name| json!({ "name": name }));
    let design: Design = ctx.client.request(Method::POST, &path, None, body).await?;
    if ctx.json {
        return print_json(&design);
    }
    println!("cloned {} to {} ({})", args.design_id, design.id, design.name);
    Ok(())
}

pub async fn diff(ctx: &Ctx, args: DiffArgs) -> Result<(), CliError> {
    let (left, right) = tokio::try_join!(
        fetch_design(ctx, &args.left),
        fetch_design(ctx, &args.right)
    )?;
    let changes = diff_designs(&left, &right);

    if ctx.json {
        return print_json(&json!({
            "left": args.left,
            "right": args.right,
            "changes": changes,
        }));
    }
    if changes.is_empty() {
        println!("designs {} and {} are identical", args.left, args.right);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = changes.iter().map(change_row).collect();
    print_table(&["CHANGE", "PATH", "LEFT", "RIGHT"], &rows);
    Ok(())
}

fn change_row(change: &Change) -> Vec<String> {
    let short = |v: &Value| {
        let s = v.to_string();
        if s.chars().count() > 40 {
            format!("{}…", s.chars().take(39).collect::<String>())
        } else {
            s
        }
    };
    match change {
        Change::Added { path, value } => vec!["+".into(), path.clone(), "-".into(), short(value)],
        Change::Removed { path, value } => {
            vec!["-".into(), path.clone(), short(value), "-".into()]
        }
        Change::Changed { path, from, to } => {
            vec!["~".into(), path.clone(), short(from), short(to)]
        }
    }
}
