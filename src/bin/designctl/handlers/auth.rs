#![deny(clippy::all, clippy::pedantic)]

use designctl::{
    application::error::AppError,
    domain::profiles::{Profile, mask_api_key},
    store::ConfigKey,
};
use designctl_api_types::AccountInfo;
use reqwest::Method;
use serde_json::json;

use crate::args::AuthCmd;
use crate::client::{App, CliError, Ctx};
use crate::io::prompt_secret;
use crate::print::{print_fields, print_json};

pub async fn handle(app: &App, cmd: AuthCmd) -> Result<(), CliError> {
    match cmd {
        AuthCmd::Login {
            api_key,
            profile,
            base_url,
        } => login(app, api_key, profile, base_url).await,
        AuthCmd::Logout => logout(app),
        AuthCmd::Status => status(app),
    }
}

async fn login(
    app: &App,
    api_key: Option<String>,
    profile: Option<String>,
    base_url: Option<String>,
) -> Result<(), CliError> {
    let key = match api_key {
        Some(key) => key.trim().to_string(),
        None => prompt_secret("API key", "--api-key")?,
    };
    if key.is_empty() {
        return Err(CliError::InvalidInput("--api-key must not be empty".into()));
    }
    let base_url = match base_url {
        Some(url) => url,
        None => app.store.effective_base_url()?,
    };

    // Only store a key the API accepts.
    let ctx = Ctx::new(&base_url, key.clone(), &app.settings, app.json)?;
    let me: AccountInfo = ctx.client.request(Method::GET, "auth/me", None, None).await?;

    match &profile {
        Some(name) => {
            let profile =
                Profile::new(name, &key, &base_url, None).map_err(AppError::from)?;
            app.store.profiles.add(profile, true)?;
            app.store.switch_profile(name)?;
        }
        None => {
            app.store.config.set(ConfigKey::ApiKey, &key)?;
            app.store.config.set(ConfigKey::BaseUrl, &base_url)?;
            // A stored key only takes effect without an active profile.
            app.store.profiles.clear_active()?;
        }
    }

    if app.json {
        return print_json(&json!({ "account": me, "profile": profile }));
    }
    let who = me.email.or(me.name).unwrap_or(me.id);
    match profile {
        Some(name) => println!("logged in as {who} (profile {name})"),
        None => println!("logged in as {who}"),
    }
    Ok(())
}

fn logout(app: &App) -> Result<(), CliError> {
    app.store.config.set_api_key(None)?;
    let deactivated = app.store.profiles.clear_active()?;
    if app.json {
        return print_json(&json!({ "loggedOut": true, "deactivatedProfile": deactivated }));
    }
    match deactivated {
        Some(name) => println!("logged out (profile {name} kept but no longer active)"),
        None => println!("logged out"),
    }
    if app.store.env().api_key.is_some() {
        eprintln!("note: {} is still set", designctl::store::API_KEY_ENV);
    }
    Ok(())
}

fn status(app: &App) -> Result<(), CliError> {
    let resolved = app.store.effective_api_key()?;
    let base_url = app.store.effective_base_url()?;

    if app.json {
        return print_json(&json!({
            "authenticated": resolved.is_some(),
            "source": resolved.as_ref().map(|r| r.source.to_string()),
            "apiKey": resolved.as_ref().map(|r| mask_api_key(&r.key)),
            "baseUrl": base_url,
        }));
    }
    match resolved {
        Some(r) => print_fields(&[
            ("status", "authenticated".into()),
            ("source", r.source.to_string()),
            ("api key", mask_api_key(&r.key)),
            ("base url", base_url),
        ]),
        None => print_fields(&[
            ("status", "not logged in".into()),
            ("base url", base_url),
        ]),
    }
    Ok(())
}
