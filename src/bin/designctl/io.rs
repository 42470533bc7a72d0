#![deny(clippy::all, clippy::pedantic)]

use std::{
    fs,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use designctl::{application::error::AppError, infra::fs::write_atomic};
use serde_json::Value;

use crate::client::CliError;

pub fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    })
}

pub fn parse_json(raw: &str, origin: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|err| AppError::data_parse(origin, &err).into())
}

/// Dynamic data from `--data` or `--data-file`; the file wins.
pub fn read_data(inline: Option<String>, file: Option<PathBuf>) -> Result<Option<Value>, CliError> {
    if let Some(path) = file {
        let raw = read_file(&path)?;
        return parse_json(&raw, &path.display().to_string()).map(Some);
    }
    inline.map(|raw| parse_json(&raw, "--data")).transpose()
}

pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    write_atomic(path, bytes).map_err(|source| CliError::OutputFile {
        path: path.display().to_string(),
        source,
    })
}

pub fn to_value<T: serde::Serialize>(value: T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|e| CliError::InvalidInput(e.to_string()))
}

pub fn interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Ask for a secret on the terminal; fails when nobody can answer.
pub fn prompt_secret(prompt: &str, flag: &str) -> Result<String, CliError> {
    if !interactive() {
        return Err(CliError::InvalidInput(format!(
            "{flag} is required when not running in a terminal"
        )));
    }
    let value = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| CliError::InvalidInput(format!("failed to read {flag}: {e}")))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(CliError::InvalidInput(format!("{flag} must not be empty")));
    }
    Ok(value)
}

/// Destructive commands ask first unless `--yes` was passed. Without a
/// terminal the answer is no.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool, CliError> {
    if yes {
        return Ok(true);
    }
    if !interactive() {
        return Ok(false);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::InvalidInput(format!("failed to read answer: {e}")))
}
