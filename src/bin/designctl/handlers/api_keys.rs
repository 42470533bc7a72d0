#![deny(clippy::all, clippy::pedantic)]

use designctl::infra::api_client::endpoint;
use designctl_api_types::{ApiKeyCreateRequest, ApiKeyInfo};
use reqwest::Method;

use crate::args::ApiKeysCmd;
use crate::client::{CliError, Ctx};
use crate::io::to_value;
use crate::print::{opt, print_fields, print_json, print_table};

pub async fn handle(ctx: &Ctx, cmd: ApiKeysCmd) -> Result<(), CliError> {
    match cmd {
        ApiKeysCmd::List => list(ctx).await,
        ApiKeysCmd::Create { name } => create(ctx, name).await,
        ApiKeysCmd::Delete { id } => delete(ctx, &id).await,
    }
}

async fn list(ctx: &Ctx) -> Result<(), CliError> {
    let keys: Vec<ApiKeyInfo> = ctx
        .client
        .request(Method::GET, "api-keys", None, None)
        .await?;
    if ctx.json {
        return print_json(&keys);
    }
    let rows: Vec<Vec<String>> = keys
        .iter()
        .map(|k| {
            vec![
                k.id.clone(),
                k.name.clone(),
                opt(k.prefix.as_deref()),
                opt(k.created_at.map(|t| t.date())),
                opt(k.last_used_at.map(|t| t.date())),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "PREFIX", "CREATED", "LAST USED"], &rows);
    Ok(())
}

async fn create(ctx: &Ctx, name: String) -> Result<(), CliError> {
    let payload = ApiKeyCreateRequest { name };
    let key: ApiKeyInfo = ctx
        .client
        .request(Method::POST, "api-keys", None, Some(to_value(payload)?))
        .await?;
    if ctx.json {
        return print_json(&key);
    }
    print_fields(&[
        ("id", key.id.clone()),
        ("name", key.name.clone()),
        ("key", opt(key.key.as_deref())),
    ]);
    eprintln!("Store the key now; it is not shown again.");
    Ok(())
}

async fn delete(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let path = endpoint(&["api-keys", id])?;
    ctx.client
        .request_unit(Method::DELETE, &path, None, None)
        .await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("deleted");
    Ok(())
}
