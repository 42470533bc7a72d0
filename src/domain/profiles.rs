//! Named credential profiles.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

/// A named bundle of credentials; many can be stored, one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub base_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Profile {
    pub fn new(
        name: &str,
        api_key: &str,
        base_url: &str,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        validate_profile_name(name)?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(DomainError::invalid("api key", "must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            api_key: api_key.to_string(),
            description: description.filter(|d| !d.trim().is_empty()),
            base_url: base_url.trim().to_string(),
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

/// Profile names double as TOML table keys and CLI arguments.
pub fn validate_profile_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::invalid("profile name", "must not be empty"));
    }
    if name.len() > 64 {
        return Err(DomainError::invalid(
            "profile name",
            "must be at most 64 characters",
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(DomainError::invalid(
            "profile name",
            format!("character `{bad}` is not allowed (use letters, digits, `-` or `_`)"),
        ));
    }
    Ok(())
}

/// Show enough of a key to recognise it without leaking it.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
