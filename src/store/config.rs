use std::{fmt, str::FromStr};

use designctl_api_types::RenderFormat;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{StoreError, backend::Document};
use crate::domain::error::DomainError;

/// Persisted settings. `api_key` is the legacy single-key field and also the
/// cache that profile switches write through to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<RenderFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_quality: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiKey,
    BaseUrl,
    DefaultFormat,
    DefaultQuality,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::ApiKey,
        ConfigKey::BaseUrl,
        ConfigKey::DefaultFormat,
        ConfigKey::DefaultQuality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api-key",
            Self::BaseUrl => "base-url",
            Self::DefaultFormat => "default-format",
            Self::DefaultQuality => "default-quality",
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(self, Self::ApiKey)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "api-key" | "apikey" => Ok(Self::ApiKey),
            "base-url" | "baseurl" => Ok(Self::BaseUrl),
            "default-format" | "defaultformat" | "format" => Ok(Self::DefaultFormat),
            "default-quality" | "defaultquality" | "quality" => Ok(Self::DefaultQuality),
            _ => Err(StoreError::NotFound {
                kind: "config key",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    doc: Document<StoredConfig>,
}

impl ConfigStore {
    pub(crate) fn new(doc: Document<StoredConfig>) -> Self {
        Self { doc }
    }

    pub fn location(&self) -> String {
        self.doc.describe()
    }

    pub fn load(&self) -> Result<StoredConfig, StoreError> {
        self.doc.load()
    }

    pub fn get(&self, key: ConfigKey) -> Result<Option<String>, StoreError> {
        let config = self.doc.load()?;
        Ok(match key {
            ConfigKey::ApiKey => config.api_key,
            ConfigKey::BaseUrl => config.base_url,
            ConfigKey::DefaultFormat => config.default_format.map(|f| f.to_string()),
            ConfigKey::DefaultQuality => config.default_quality.map(|q| q.to_string()),
        })
    }

    pub fn entries(&self) -> Result<Vec<(ConfigKey, Option<String>)>, StoreError> {
        ConfigKey::ALL
            .into_iter()
            .map(|key| Ok((key, self.get(key)?)))
            .collect()
    }

    /// Parse and store `value`; malformed values leave the store untouched.
    pub fn set(&self, key: ConfigKey, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        self.doc.update(|config| {
            match key {
                ConfigKey::ApiKey => {
                    if value.is_empty() {
                        return Err(DomainError::invalid("api-key", "must not be empty").into());
                    }
                    config.api_key = Some(value.to_string());
                }
                ConfigKey::BaseUrl => {
                    config.base_url = Some(parse_base_url(value)?);
                }
                ConfigKey::DefaultFormat => {
                    let format = RenderFormat::from_str(value)
                        .map_err(|err| DomainError::invalid("default-format", err.to_string()))?;
                    config.default_format = Some(format);
                }
                ConfigKey::DefaultQuality => {
                    let quality = value.parse::<u32>().map_err(|err| {
                        DomainError::invalid("default-quality", format!("`{value}`: {err}"))
                    })?;
                    config.default_quality = Some(quality);
                }
            }
            Ok(())
        })
    }

    pub fn unset(&self, key: ConfigKey) -> Result<(), StoreError> {
        self.doc.update(|config| {
            match key {
                ConfigKey::ApiKey => config.api_key = None,
                ConfigKey::BaseUrl => config.base_url = None,
                ConfigKey::DefaultFormat => config.default_format = None,
                ConfigKey::DefaultQuality => config.default_quality = None,
            }
            Ok(())
        })
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.doc.save(&StoredConfig::default())
    }

    pub fn set_api_key(&self, key: Option<String>) -> Result<(), StoreError> {
        self.doc.update(|config| {
            config.api_key = key;
            Ok(())
        })
    }

    /// Clear credentials that still match a removed profile; values set
    /// since then are kept.
    pub(crate) fn forget_credentials(&self, api_key: &str, base_url: &str) -> Result<(), StoreError> {
        self.doc.update(|config| {
            if config.api_key.as_deref() == Some(api_key) {
                config.api_key = None;
                if config.base_url.as_deref() == Some(base_url) {
                    config.base_url = None;
                }
            }
            Ok(())
        })
    }

    pub(crate) fn restore(&self, previous: &StoredConfig) -> Result<(), StoreError> {
        self.doc.save(previous)
    }

    /// Write-through target of profile activation.
    pub(crate) fn apply_credentials(&self, api_key: &str, base_url: &str) -> Result<(), StoreError> {
        self.doc.update(|config| {
            config.api_key = Some(api_key.to_string());
            if !base_url.is_empty() {
                config.base_url = Some(base_url.to_string());
            }
            Ok(())
        })
    }
}

pub(crate) fn parse_base_url(value: &str) -> Result<String, StoreError> {
    let url = Url::parse(value)
        .map_err(|err| DomainError::invalid("base-url", format!("`{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DomainError::invalid("base-url", "scheme must be http or https").into());
    }
    Ok(value.trim_end_matches('/').to_string())
}
