#![deny(clippy::all, clippy::pedantic)]

use std::path::Path;

use designctl::infra::api_client::endpoint;
use designctl_api_types::{Asset, ListResponse};
use reqwest::Method;

use crate::args::AssetsCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_bytes;
use crate::print::{opt, print_json, print_table};

pub async fn handle(ctx: &Ctx, cmd: AssetsCmd) -> Result<(), CliError> {
    match cmd {
        AssetsCmd::List { page, limit } => list(ctx, page, limit).await,
        AssetsCmd::Upload { file, name } => upload(ctx, &file, name).await,
        AssetsCmd::Delete { id } => delete(ctx, &id).await,
    }
}

async fn list(ctx: &Ctx, page: u32, limit: u32) -> Result<(), CliError> {
    let q = [("page", page.to_string()), ("limit", limit.to_string())];
    let res: ListResponse<Asset> = ctx
        .client
        .request(Method::GET, "assets", Some(&q), None)
        .await?;
    if ctx.json {
        return print_json(&res);
    }
    let rows: Vec<Vec<String>> = res
        .data
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.name.clone(),
                opt(a.content_type.as_deref()),
                opt(a.size),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "TYPE", "BYTES"], &rows);
    Ok(())
}

async fn upload(ctx: &Ctx, file: &Path, name: Option<String>) -> Result<(), CliError> {
    let data = read_bytes(file)?;
    let file_name = file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    let fields: Vec<(&str, String)> = name.map(|n| ("name", n)).into_iter().collect();

    let res = ctx.client.upload("assets", &file_name, data, &fields).await?;
    if ctx.json {
        return print_json(&res);
    }
    let asset: Result<Asset, _> = serde_json::from_value(res);
    match asset {
        Ok(asset) => println!("uploaded {} ({})", asset.name, asset.id),
        Err(_) => println!("uploaded {file_name}"),
    }
    Ok(())
}

async fn delete(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let path = endpoint(&["assets", id])?;
    ctx.client
        .request_unit(Method::DELETE, &path, None, None)
        .await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("deleted");
    Ok(())
}
