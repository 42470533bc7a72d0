//! Runtime settings: typed knobs with layered precedence (file → env → CLI).
//!
//! Credentials are not part of this layer; they live in [`crate::store`].

use std::{path::PathBuf, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

#[cfg(test)]
mod tests;

const LOCAL_CONFIG_BASENAME: &str = "designctl";
const ENV_PREFIX: &str = "DESIGNCTL";
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::WARN;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 300;
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_SETTLE_MS: u64 = 100;
const DEFAULT_WEB_URL: &str = "https://app.designctl.dev";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub http: HttpSettings,
    pub render: RenderSettings,
    pub watch: WatchSettings,
    pub app: AppSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub debounce: Duration,
    pub settle: Duration,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub web_url: Url,
}

/// Command-line values that take precedence over files and the environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(overrides: &SettingsOverrides) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = overrides.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);
    Settings::from_raw(raw)
}

/// Built-in defaults only, ignoring files and the environment.
pub fn defaults() -> Result<Settings, LoadError> {
    Settings::from_raw(RawSettings::default())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    http: RawHttpSettings,
    render: RawRenderSettings,
    watch: RawWatchSettings,
    app: RawAppSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if overrides.verbose && self.logging.level.is_none() {
            self.logging.level = Some("info".to_string());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            http,
            render,
            watch,
            app,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            http: build_http_settings(http)?,
            render: build_render_settings(render)?,
            watch: build_watch_settings(watch)?,
            app: build_app_settings(app)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => DEFAULT_LOG_LEVEL,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let secs = http.timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Ok(HttpSettings {
        timeout: Duration::from_secs(non_zero(secs, "http.timeout_seconds")?),
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let poll_ms = render.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    let timeout_secs = render
        .timeout_seconds
        .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS);

    Ok(RenderSettings {
        poll_interval: Duration::from_millis(non_zero(poll_ms, "render.poll_interval_ms")?),
        timeout: Duration::from_secs(non_zero(timeout_secs, "render.timeout_seconds")?),
    })
}

fn build_watch_settings(watch: RawWatchSettings) -> Result<WatchSettings, LoadError> {
    let debounce_ms = watch.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS);
    // A zero settle delay is allowed: it only guards against half-written files.
    let settle_ms = watch.settle_ms.unwrap_or(DEFAULT_SETTLE_MS);

    Ok(WatchSettings {
        debounce: Duration::from_millis(non_zero(debounce_ms, "watch.debounce_ms")?),
        settle: Duration::from_millis(settle_ms),
    })
}

fn build_app_settings(app: RawAppSettings) -> Result<AppSettings, LoadError> {
    let raw = app.web_url.unwrap_or_else(|| DEFAULT_WEB_URL.to_string());
    let web_url = Url::parse(raw.trim())
        .map_err(|err| LoadError::invalid("app.web_url", format!("`{raw}`: {err}")))?;
    Ok(AppSettings { web_url })
}

fn non_zero(value: u64, key: &'static str) -> Result<u64, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    poll_interval_ms: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWatchSettings {
    debounce_ms: Option<u64>,
    settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAppSettings {
    web_url: Option<String>,
}
