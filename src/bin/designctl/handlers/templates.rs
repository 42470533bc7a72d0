#![deny(clippy::all, clippy::pedantic)]

use designctl::infra::api_client::endpoint;
use designctl_api_types::{Design, ListResponse, Template};
use reqwest::Method;
use serde_json::json;

use crate::args::TemplatesCmd;
use crate::client::{CliError, Ctx};
use crate::print::{opt, print_fields, print_json, print_table};

pub async fn handle(ctx: &Ctx, cmd: TemplatesCmd) -> Result<(), CliError> {
    match cmd {
        TemplatesCmd::List {
            category,
            page,
            limit,
        } => list(ctx, category, page, limit).await,
        TemplatesCmd::Get { id } => get(ctx, &id).await,
        TemplatesCmd::Use { id, name } => use_template(ctx, &id, name).await,
    }
}

async fn list(
    ctx: &Ctx,
    category: Option<String>,
    page: u32,
    limit: u32,
) -> Result<(), CliError> {
    let mut q = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if let Some(c) = category {
        q.push(("category", c));
    }
    let res: ListResponse<Template> = ctx
        .client
        .request(Method::GET, "templates", Some(&q), None)
        .await?;
    if ctx.json {
        return print_json(&res);
    }
    let rows: Vec<Vec<String>> = res
        .data
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.name.clone(),
                opt(t.category.as_deref()),
                match (t.width, t.height) {
                    (Some(w), Some(h)) => format!("{w}x{h}"),
                    _ => "-".into(),
                },
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "CATEGORY", "SIZE"], &rows);
    Ok(())
}

async fn get(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let path = endpoint(&["templates", id])?;
    let template: Template = ctx.client.request(Method::GET, &path, None, None).await?;
    if ctx.json {
        return print_json(&template);
    }
    print_fields(&[
        ("id", template.id.clone()),
        ("name", template.name.clone()),
        ("category", opt(template.category.as_deref())),
        ("width", opt(template.width)),
        ("height", opt(template.height)),
    ]);
    Ok(())
}

async fn use_template(ctx: &Ctx, id: &str, name: Option<String>) -> Result<(), CliError> {
    let path = endpoint(&["templates", id, "use"])?;
    let body = name.map(|n| json!({ "name": n }));
    let design: Design = ctx.client.request(Method::POST, &path, None, body).await?;
    if ctx.json {
        return print_json(&design);
    }
    println!("created design {} from template {id}", design.id);
    Ok(())
}
