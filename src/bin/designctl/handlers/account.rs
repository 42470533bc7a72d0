#![deny(clippy::all, clippy::pedantic)]

use designctl_api_types::AccountInfo;
use reqwest::Method;
use serde_json::Value;

use crate::args::UsageArgs;
use crate::client::{CliError, Ctx};
use crate::print::{opt, print_fields, print_json};

pub async fn whoami(ctx: &Ctx) -> Result<(), CliError> {
    let me: AccountInfo = ctx.client.request(Method::GET, "auth/me", None, None).await?;
    if ctx.json {
        return print_json(&me);
    }
    print_fields(&[
        ("id", me.id.clone()),
        ("email", opt(me.email.as_deref())),
        ("name", opt(me.name.as_deref())),
        ("plan", opt(me.plan.as_deref())),
    ]);
    Ok(())
}

pub async fn usage(ctx: &Ctx, args: UsageArgs) -> Result<(), CliError> {
    let q: Vec<(&str, String)> = args.period.map(|p| ("period", p)).into_iter().collect();
    let query = if q.is_empty() { None } else { Some(q.as_slice()) };
    let res: Value = ctx.client.request(Method::GET, "usage", query, None).await?;
    print_object(ctx, &res)
}

pub async fn billing(ctx: &Ctx) -> Result<(), CliError> {
    let res: Value = ctx.client.request(Method::GET, "billing", None, None).await?;
    print_object(ctx, &res)
}

/// Top-level scalar fields as `key: value`; nested values stay JSON.
fn print_object(ctx: &Ctx, value: &Value) -> Result<(), CliError> {
    let Some(map) = value.as_object().filter(|_| !ctx.json) else {
        return print_json(value);
    };
    let fields: Vec<(&str, String)> = map
        .iter()
        .map(|(k, v)| {
            let shown = match v {
                Value::String(s) => s.clone(),
                Value::Null => "-".into(),
                other => other.to_string(),
            };
            (k.as_str(), shown)
        })
        .collect();
    print_fields(&fields);
    Ok(())
}
