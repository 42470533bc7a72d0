//! Local credential store: persisted config plus named profiles.
//!
//! The store is built once per process and handed to whatever needs it; tests
//! build it over [`MemoryBackend`]s instead of files.

mod backend;
mod config;
mod profiles;


use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

pub use backend::{DocumentBackend, FileBackend, MemoryBackend};
pub use config::{ConfigKey, ConfigStore, StoredConfig};
pub use profiles::{ProfileStore, StoredProfiles};

use crate::domain::{error::DomainError, profiles::Profile};
use backend::Document;

pub const DEFAULT_BASE_URL: &str = "https://api.designctl.dev/v1";
pub const API_KEY_ENV: &str = "DESIGNCTL_API_KEY";
pub const BASE_URL_ENV: &str = "DESIGNCTL_BASE_URL";
const CONFIG_FILE: &str = "config.toml";
const PROFILES_FILE: &str = "profiles.toml";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {location}: {reason}")]
    Parse { location: String, reason: String },
    #[error("failed to serialize store: {0}")]
    Serialize(String),
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Values taken from the process environment, captured once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_env(API_KEY_ENV),
            base_url: non_empty_env(BASE_URL_ENV),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Profile(String),
    Config,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment ({API_KEY_ENV})"),
            Self::Profile(name) => write!(f, "profile `{name}`"),
            Self::Config => f.write_str("stored config"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: String,
    pub source: KeySource,
}

#[derive(Debug)]
pub struct Store {
    pub config: ConfigStore,
    pub profiles: ProfileStore,
    env: EnvOverrides,
}

impl Store {
    pub fn from_backends(
        config: Box<dyn DocumentBackend>,
        profiles: Box<dyn DocumentBackend>,
        env: EnvOverrides,
    ) -> Self {
        Self {
            config: ConfigStore::new(Document::new(config)),
            profiles: ProfileStore::new(Document::new(profiles)),
            env,
        }
    }

    /// `config.toml` and `profiles.toml` inside `dir`.
    pub fn open(dir: &Path, env: EnvOverrides) -> Self {
        Self::from_backends(
            Box::new(FileBackend::new(dir.join(CONFIG_FILE))),
            Box::new(FileBackend::new(dir.join(PROFILES_FILE))),
            env,
        )
    }

    pub fn in_memory(env: EnvOverrides) -> Self {
        Self::from_backends(
            Box::<MemoryBackend>::default(),
            Box::<MemoryBackend>::default(),
            env,
        )
    }

    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }

    /// Activate `name` and copy its credentials into the config. An unknown
    /// name fails before anything is written; if the active pointer cannot be
    /// written the previous config is put back.
    pub fn switch_profile(&self, name: &str) -> Result<Profile, StoreError> {
        let profile = self.profiles.get(name)?;
        let previous = self.config.load()?;
        self.config
            .apply_credentials(&profile.api_key, &profile.base_url)?;

        if let Err(err) = self.profiles.set_active(name) {
            if let Err(restore_err) = self.config.restore(&previous) {
                tracing::warn!(
                    target = "store::switch_profile",
                    profile = %name,
                    error = %restore_err,
                    "Failed to restore config after an interrupted switch"
                );
            }
            return Err(err);
        }

        tracing::info!(
            target = "store::switch_profile",
            profile = %profile.name,
            "Active profile switched"
        );
        Ok(profile)
    }

    /// Remove `name`. When it was the active profile, the credentials that
    /// activation copied into the config are dropped as well.
    pub fn remove_profile(&self, name: &str) -> Result<Profile, StoreError> {
        let was_active = self.profiles.active_name()?.as_deref() == Some(name);
        let removed = self.profiles.remove(name)?;
        if was_active {
            self.config
                .forget_credentials(&removed.api_key, &removed.base_url)?;
        }
        Ok(removed)
    }

    /// Environment override, then the active profile, then the legacy field.
    pub fn effective_api_key(&self) -> Result<Option<ResolvedKey>, StoreError> {
        if let Some(key) = &self.env.api_key {
            return Ok(Some(ResolvedKey {
                key: key.clone(),
                source: KeySource::Environment,
            }));
        }
        if let Some(profile) = self.profiles.active()? {
            return Ok(Some(ResolvedKey {
                key: profile.api_key,
                source: KeySource::Profile(profile.name),
            }));
        }
        Ok(self
            .config
            .load()?
            .api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| ResolvedKey {
                key,
                source: KeySource::Config,
            }))
    }

    pub fn effective_base_url(&self) -> Result<String, StoreError> {
        if let Some(url) = &self.env.base_url {
            return Ok(url.clone());
        }
        if let Some(profile) = self.profiles.active()? {
            if !profile.base_url.is_empty() {
                return Ok(profile.base_url);
            }
        }
        Ok(self
            .config
            .load()?
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))
    }
}

/// `$XDG_CONFIG_HOME/designctl` (or the platform equivalent).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("designctl")
}
