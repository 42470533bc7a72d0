#![deny(clippy::all, clippy::pedantic)]

use designctl::{domain::profiles::mask_api_key, store::ConfigKey};
use serde_json::{Map, Value, json};

use crate::args::ConfigCmd;
use crate::client::{App, CliError};
use crate::io::confirm;
use crate::print::{print_json, print_table};

pub fn handle(app: &App, cmd: ConfigCmd) -> Result<(), CliError> {
    let config = &app.store.config;
    match cmd {
        ConfigCmd::Get { key } => {
            let key: ConfigKey = key.parse()?;
            let value = config.get(key)?;
            if app.json {
                return print_json(&json!({ key.as_str(): value }));
            }
            match value {
                Some(v) => println!("{}", shown(key, &v)),
                None => println!("(not set)"),
            }
            Ok(())
        }
        ConfigCmd::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            config.set(key, &value)?;
            if app.json {
                return print_json(&json!({ "set": key.as_str() }));
            }
            println!("{key} updated");
            Ok(())
        }
        ConfigCmd::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            config.unset(key)?;
            if app.json {
                return print_json(&json!({ "unset": key.as_str() }));
            }
            println!("{key} cleared");
            Ok(())
        }
        ConfigCmd::List => list(app),
        ConfigCmd::Reset { yes } => {
            if !confirm("Remove every stored config value?", yes)? {
                return Err(CliError::InvalidInput("reset not confirmed (pass --yes)".into()));
            }
            config.reset()?;
            if app.json {
                return print_json(&json!({ "reset": true }));
            }
            println!("config reset");
            Ok(())
        }
        ConfigCmd::Path => {
            if app.json {
                return print_json(&json!({ "path": config.location() }));
            }
            println!("{}", config.location());
            Ok(())
        }
    }
}

fn list(app: &App) -> Result<(), CliError> {
    let entries = app.store.config.entries()?;
    if app.json {
        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(key, value)| {
                let value = value.map(|v| shown(key, &v));
                (key.as_str().to_string(), json!(value))
            })
            .collect();
        return print_json(&map);
    }
    let rows: Vec<Vec<String>> = entries
        .into_iter()
        .map(|(key, value)| {
            vec![
                key.to_string(),
                value.map_or_else(|| "-".into(), |v| shown(key, &v)),
            ]
        })
        .collect();
    print_table(&["KEY", "VALUE"], &rows);
    Ok(())
}

fn shown(key: ConfigKey, value: &str) -> String {
    if key.is_secret() {
        mask_api_key(value)
    } else {
        value.to_string()
    }
}
