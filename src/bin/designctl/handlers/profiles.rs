#![deny(clippy::all, clippy::pedantic)]

use designctl::{
    application::error::AppError,
    domain::profiles::{Profile, mask_api_key},
    store::DEFAULT_BASE_URL,
};
use serde_json::json;

use crate::args::ProfilesCmd;
use crate::client::{App, CliError};
use crate::io::prompt_secret;
use crate::print::{opt, print_fields, print_json, print_table};

pub fn handle(app: &App, cmd: ProfilesCmd) -> Result<(), CliError> {
    match cmd {
        ProfilesCmd::Add {
            name,
            api_key,
            base_url,
            description,
            force,
        } => add(app, &name, api_key, base_url, description, force),
        ProfilesCmd::Remove { name } => {
            let removed = app.store.remove_profile(&name)?;
            if app.json {
                return print_json(&json!({ "removed": removed.name }));
            }
            println!("profile {} removed", removed.name);
            Ok(())
        }
        ProfilesCmd::List => list(app),
        ProfilesCmd::Show { name } => {
            let profile = app.store.profiles.get(&name)?;
            let active = app.store.profiles.active_name()?;
            show(app, &profile, active.as_deref() == Some(profile.name.as_str()))
        }
        ProfilesCmd::Use { name } => {
            let profile = app.store.switch_profile(&name)?;
            if app.json {
                return print_json(&json!({ "active": profile.name }));
            }
            println!("switched to profile {}", profile.name);
            Ok(())
        }
        ProfilesCmd::Current => match app.store.profiles.active()? {
            Some(profile) => show(app, &profile, true),
            None if app.json => print_json(&json!({ "active": null })),
            None => {
                println!("no active profile");
                Ok(())
            }
        },
    }
}

fn add(
    app: &App,
    name: &str,
    api_key: Option<String>,
    base_url: Option<String>,
    description: Option<String>,
    force: bool,
) -> Result<(), CliError> {
    let api_key = match api_key {
        Some(key) => key,
        None => prompt_secret(&format!("API key for profile {name}"), "--api-key")?,
    };
    let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let profile =
        Profile::new(name, &api_key, &base_url, description).map_err(AppError::from)?;
    app.store.profiles.add(profile, force)?;

    if app.json {
        return print_json(&json!({ "added": name }));
    }
    println!("profile {name} added (activate with `designctl profiles use {name}`)");
    Ok(())
}

fn list(app: &App) -> Result<(), CliError> {
    let profiles = app.store.profiles.list()?;
    let active = app.store.profiles.active_name()?;

    if app.json {
        let items: Vec<_> = profiles
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "active": active.as_deref() == Some(p.name.as_str()),
                    "apiKey": mask_api_key(&p.api_key),
                    "baseUrl": p.base_url,
                    "description": p.description,
                    "createdAt": p.created_at.date().to_string(),
                })
            })
            .collect();
        return print_json(&items);
    }
    let rows: Vec<Vec<String>> = profiles
        .iter()
        .map(|p| {
            let marker = if active.as_deref() == Some(p.name.as_str()) {
                "*"
            } else {
                ""
            };
            vec![
                marker.to_string(),
                p.name.clone(),
                mask_api_key(&p.api_key),
                p.base_url.clone(),
                opt(p.description.as_deref()),
            ]
        })
        .collect();
    print_table(&["", "NAME", "KEY", "BASE URL", "DESCRIPTION"], &rows);
    Ok(())
}

fn show(app: &App, profile: &Profile, active: bool) -> Result<(), CliError> {
    if app.json {
        return print_json(&json!({
            "name": profile.name,
            "active": active,
            "apiKey": mask_api_key(&profile.api_key),
            "baseUrl": profile.base_url,
            "description": profile.description,
            "createdAt": profile.created_at.date().to_string(),
        }));
    }
    print_fields(&[
        ("name", profile.name.clone()),
        ("active", active.to_string()),
        ("api key", mask_api_key(&profile.api_key)),
        ("base url", profile.base_url.clone()),
        ("description", opt(profile.description.as_deref())),
        ("created", profile.created_at.date().to_string()),
    ]);
    Ok(())
}
