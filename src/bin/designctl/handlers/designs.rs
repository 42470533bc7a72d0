#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use designctl::infra::api_client::endpoint;
use designctl_api_types::{Design, DesignCreateRequest, DesignUpdateRequest, ListResponse};
use reqwest::Method;

use crate::args::DesignsCmd;
use crate::client::{CliError, Ctx};
use crate::io::{confirm, parse_json, read_file, to_value};
use crate::print::{opt, print_fields, print_json, print_table};

pub async fn handle(ctx: &Ctx, cmd: DesignsCmd) -> Result<(), CliError> {
    match cmd {
        DesignsCmd::List {
            page,
            limit,
            search,
        } => list(ctx, page, limit, search).await,
        DesignsCmd::Get { id } => get(ctx, &id).await,
        DesignsCmd::Create {
            name,
            width,
            height,
            template,
            canvas_file,
        } => create(ctx, name, width, height, template, canvas_file).await,
        DesignsCmd::Update {
            id,
            name,
            width,
            height,
            is_template,
        } => {
            let payload = DesignUpdateRequest {
                name,
                width,
                height,
                is_template,
            };
            update(ctx, &id, payload).await
        }
        DesignsCmd::Delete { id, yes } => delete(ctx, &id, yes).await,
    }
}

pub async fn fetch_page(
    ctx: &Ctx,
    page: u32,
    limit: u32,
    search: Option<String>,
) -> Result<ListResponse<Design>, CliError> {
    let mut q = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if let Some(s) = search {
        q.push(("search", s));
    }
    Ok(ctx
        .client
        .request(Method::GET, "designs", Some(&q), None)
        .await?)
}

async fn list(ctx: &Ctx, page: u32, limit: u32, search: Option<String>) -> Result<(), CliError> {
    let res = fetch_page(ctx, page, limit, search).await?;
    if ctx.json {
        return print_json(&res);
    }
    let rows: Vec<Vec<String>> = res.data.iter().map(design_row).collect();
    print_table(&["ID", "NAME", "SIZE", "TEMPLATE", "UPDATED"], &rows);
    if let Some(total) = res.total {
        println!("page {page} · {} of {total}", res.data.len());
    }
    Ok(())
}

fn design_row(d: &Design) -> Vec<String> {
    vec![
        d.id.clone(),
        d.name.clone(),
        size(d.width, d.height),
        if d.is_template.unwrap_or(false) {
            "yes".into()
        } else {
            "no".into()
        },
        opt(d.updated_at.map(|t| t.date())),
    ]
}

fn size(width: Option<u32>, height: Option<u32>) -> String {
    match (width, height) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "-".into(),
    }
}

async fn get(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let path = endpoint(&["designs", id])?;
    let design: Design = ctx.client.request(Method::GET, &path, None, None).await?;
    if ctx.json {
        return print_json(&design);
    }
    print_design(&design);
    Ok(())
}

pub fn print_design(design: &Design) {
    print_fields(&[
        ("id", design.id.clone()),
        ("name", design.name.clone()),
        ("size", size(design.width, design.height)),
        ("template", opt(design.is_template)),
        ("created", opt(design.created_at)),
        ("updated", opt(design.updated_at)),
    ]);
}

async fn create(
    ctx: &Ctx,
    name: String,
    width: Option<u32>,
    height: Option<u32>,
    template_id: Option<String>,
    canvas_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let canvas = match canvas_file {
        Some(path) => Some(parse_json(&read_file(&path)?, &path.display().to_string())?),
        None => None,
    };
    let payload = DesignCreateRequest {
        name,
        width,
        height,
        template_id,
        canvas,
    };
    let design: Design = ctx
        .client
        .request(Method::POST, "designs", None, Some(to_value(payload)?))
        .await?;
    if ctx.json {
        return print_json(&design);
    }
    println!("created {}", design.id);
    Ok(())
}

async fn update(ctx: &Ctx, id: &str, payload: DesignUpdateRequest) -> Result<(), CliError> {
    if payload.name.is_none()
        && payload.width.is_none()
        && payload.height.is_none()
        && payload.is_template.is_none()
    {
        return Err(CliError::InvalidInput("nothing to update".into()));
    }
    let path = endpoint(&["designs", id])?;
    let design: Design = ctx
        .client
        .request(Method::PATCH, &path, None, Some(to_value(payload)?))
        .await?;
    if ctx.json {
        return print_json(&design);
    }
    println!("updated {}", design.id);
    Ok(())
}

async fn delete(ctx: &Ctx, id: &str, yes: bool) -> Result<(), CliError> {
    if !confirm(&format!("Delete design {id}?"), yes)? {
        return Err(CliError::InvalidInput(
            "deletion not confirmed (pass --yes)".into(),
        ));
    }
    let path = endpoint(&["designs", id])?;
    ctx.client
        .request_unit(Method::DELETE, &path, None, None)
        .await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("deleted");
    Ok(())
}
