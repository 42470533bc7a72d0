#![deny(clippy::all, clippy::pedantic)]

use std::{path::PathBuf, sync::Arc};

use designctl::{
    application::{error::AppError, orchestrator::RenderOrchestrator},
    config::{LoadError, Settings},
    infra::{api_client::ApiClient, error::InfraError},
    store::{self, EnvOverrides, Store, StoreError},
};
use designctl_api_types::RenderFormat;
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(
        "api key is required (run `designctl auth login`, add a profile, or set {})",
        store::API_KEY_ENV
    )]
    MissingKey,
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    OutputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{failed} of {total} batch items failed")]
    BatchFailed { failed: usize, total: usize },
    #[error("render job {job_id} failed: {reason}")]
    RenderFailed { job_id: String, reason: String },
    #[error(transparent)]
    Settings(#[from] LoadError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<InfraError> for CliError {
    fn from(err: InfraError) -> Self {
        Self::App(err.into())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::App(err.into())
    }
}

/// Process-wide state: settings, the credential store and output mode.
pub struct App {
    pub settings: Settings,
    pub store: Store,
    pub json: bool,
}

impl App {
    pub fn new(settings: Settings, store: Store, json: bool) -> Self {
        Self {
            settings,
            store,
            json,
        }
    }

    /// Resolve credentials and build an API context.
    pub fn ctx(&self) -> Result<Ctx, CliError> {
        let key = self
            .store
            .effective_api_key()?
            .ok_or(CliError::MissingKey)?;
        let base_url = self.store.effective_base_url()?;
        let stored = self.store.config.load()?;

        let mut ctx = Ctx::new(&base_url, key.key, &self.settings, self.json)?;
        ctx.default_format = stored.default_format.unwrap_or(RenderFormat::Png);
        ctx.default_quality = stored.default_quality;
        Ok(ctx)
    }
}

/// Everything an API-backed command needs.
#[derive(Clone)]
pub struct Ctx {
    pub client: Arc<ApiClient>,
    pub orch: RenderOrchestrator,
    pub settings: Settings,
    pub json: bool,
    pub default_format: RenderFormat,
    pub default_quality: Option<u32>,
}

impl Ctx {
    pub fn new(
        base_url: &str,
        key: String,
        settings: &Settings,
        json: bool,
    ) -> Result<Self, CliError> {
        let client = Arc::new(ApiClient::new(base_url, key, settings.http.timeout)?);
        let orch = RenderOrchestrator::new(client.clone(), settings.render.poll_interval);
        Ok(Self {
            client,
            orch,
            settings: settings.clone(),
            json,
            default_format: RenderFormat::Png,
            default_quality: None,
        })
    }
}

/// `--config-dir`, then the platform config directory.
pub fn open_store(cli: &Cli) -> Store {
    Store::open(&config_dir(cli), EnvOverrides::from_env())
}

pub fn config_dir(cli: &Cli) -> PathBuf {
    cli.config_dir
        .clone()
        .unwrap_or_else(store::default_config_dir)
}
