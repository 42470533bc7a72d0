//! Sequential batch rendering from a config file.

use std::path::{Path, PathBuf};

use designctl_api_types::RenderFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{error::AppError, orchestrator::RenderOrchestrator, output::OutputTemplate};
use crate::{
    domain::{error::DomainError, render::RenderRequest},
    infra::fs::write_atomic_async,
};

/// One entry of a batch file. Field names follow the API's camelCase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RenderFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, alias = "dynamicData", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Output path; may use `{{count}}` and `{{timestamp}}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl BatchItem {
    pub fn to_request(
        &self,
        default_format: RenderFormat,
        default_quality: Option<u32>,
    ) -> Result<RenderRequest, DomainError> {
        let request = RenderRequest {
            design_id: self.design_id.clone(),
            template_id: self.template_id.clone(),
            format: self.format.unwrap_or(default_format),
            quality: self.quality.or(default_quality),
            width: self.width,
            height: self.height,
            dynamic_data: self.data.clone(),
        };
        request.target()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(default, alias = "items")]
    pub renders: Vec<BatchItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Accepted for compatibility; items always run one at a time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RenderFormat>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    List(Vec<BatchItem>),
    Config(BatchConfig),
}

impl BatchConfig {
    /// Accepts either a bare array of items or an object with `renders`.
    pub fn parse(raw: &str, origin: &str) -> Result<Self, AppError> {
        let file: BatchFile =
            serde_json::from_str(raw).map_err(|err| AppError::data_parse(origin, &err))?;
        Ok(match file {
            BatchFile::List(renders) => Self {
                renders,
                ..Self::default()
            },
            BatchFile::Config(config) => config,
        })
    }

    /// Offline check: every item must name exactly one target.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.renders.is_empty() {
            return Err(AppError::validation("batch contains no renders"));
        }
        for (index, item) in self.renders.iter().enumerate() {
            item.to_request(RenderFormat::Png, None)
                .map_err(|err| AppError::validation(format!("item {index}: {err}")))?;
        }
        Ok(())
    }

    /// A small example written by `init`.
    pub fn starter() -> Self {
        Self {
            renders: vec![
                BatchItem {
                    design_id: Some("your-design-id".into()),
                    format: Some(RenderFormat::Png),
                    output: Some("design-{{count}}.png".into()),
                    ..BatchItem::default()
                },
                BatchItem {
                    template_id: Some("your-template-id".into()),
                    format: Some(RenderFormat::Pdf),
                    data: Some(serde_json::json!({ "title": "Hello" })),
                    ..BatchItem::default()
                },
            ],
            output_dir: Some(PathBuf::from("renders")),
            parallel: None,
            format: None,
        }
    }
}

/// Values used where neither the item nor the file says otherwise.
#[derive(Debug, Clone)]
pub struct BatchDefaults {
    pub format: RenderFormat,
    pub quality: Option<u32>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemOutcome {
    pub index: usize,
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<u32>,
    pub items: Vec<BatchItemOutcome>,
}

pub struct BatchRunner {
    orch: RenderOrchestrator,
}

impl BatchRunner {
    pub fn new(orch: RenderOrchestrator) -> Self {
        Self { orch }
    }

    /// Render every item in order. A failing item is recorded and the run
    /// moves on; `on_item` sees each outcome as it lands.
    pub async fn run<F>(
        &self,
        config: &BatchConfig,
        defaults: &BatchDefaults,
        mut on_item: F,
    ) -> BatchSummary
    where
        F: FnMut(&BatchItemOutcome),
    {
        let started_at = Instant::now();
        let output_dir = config
            .output_dir
            .clone()
            .unwrap_or_else(|| defaults.output_dir.clone());
        let default_format = config.format.unwrap_or(defaults.format);
        let mut summary = BatchSummary {
            parallel: config.parallel,
            ..BatchSummary::default()
        };

        for (index, item) in config.renders.iter().enumerate() {
            let outcome = match self
                .render_item(item, default_format, defaults.quality, &output_dir, summary.succeeded)
                .await
            {
                Ok((target, output)) => {
                    summary.succeeded += 1;
                    BatchItemOutcome {
                        index,
                        target: Some(target),
                        output: Some(output),
                        error: None,
                    }
                }
                Err((target, err)) => {
                    summary.failed += 1;
                    warn!(
                        target = "application::batch",
                        op = "batch::item",
                        result = "error",
                        index,
                        error = %err,
                        "Batch item failed; continuing"
                    );
                    BatchItemOutcome {
                        index,
                        target,
                        output: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            on_item(&outcome);
            summary.items.push(outcome);
        }

        info!(
            target = "application::batch",
            op = "batch::run",
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Batch finished"
        );
        summary
    }

    async fn render_item(
        &self,
        item: &BatchItem,
        default_format: RenderFormat,
        default_quality: Option<u32>,
        output_dir: &Path,
        succeeded: usize,
    ) -> Result<(String, PathBuf), (Option<String>, AppError)> {
        let request = item
            .to_request(default_format, default_quality)
            .map_err(|err| (None, AppError::from(err)))?;
        let target = request
            .target()
            .map_err(|err| (None, AppError::from(err)))?
            .to_string();
        let fail = |err: AppError| (Some(target.clone()), err);

        let output = match &item.output {
            Some(raw) => {
                let path = OutputTemplate::new(raw.as_str()).resolve_now(succeeded as u64 + 1);
                if path.is_absolute() {
                    path
                } else {
                    output_dir.join(path)
                }
            }
            None => output_dir.join(request.default_file_name().map_err(|e| fail(e.into()))?),
        };

        let bytes = self.orch.render_sync(&request).await.map_err(fail)?;
        write_atomic_async(&output, bytes)
            .await
            .map_err(|e| fail(e.into()))?;
        Ok((target, output))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use bytes::Bytes;

    use super::*;
    use crate::{application::orchestrator::tests::FakeApi, infra::error::InfraError};

    fn defaults(dir: &Path) -> BatchDefaults {
        BatchDefaults {
            format: RenderFormat::Png,
            quality: Some(80),
            output_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn parses_array_and_object_forms() {
        let list = BatchConfig::parse(r#"[{"designId":"d1"},{"templateId":"t1"}]"#, "batch.json")
            .expect("array");
        assert_eq!(list.renders.len(), 2);
        assert_eq!(list.output_dir, None);

        let object = BatchConfig::parse(
            r#"{"renders":[{"designId":"d1","dynamicData":{"a":1}}],"outputDir":"out","parallel":4}"#,
            "batch.json",
        )
        .expect("object");
        assert_eq!(object.parallel, Some(4));
        assert_eq!(object.output_dir, Some(PathBuf::from("out")));
        assert_eq!(object.renders[0].data, Some(serde_json::json!({ "a": 1 })));

        let err = BatchConfig::parse("{", "batch.json").expect_err("invalid");
        assert!(matches!(err, AppError::DataParse { .. }));
    }

    #[test]
    fn validate_reports_item_index() {
        let config = BatchConfig::parse(r#"[{"designId":"d1"},{"format":"png"}]"#, "b")
            .expect("parse");
        let err = config.validate().expect_err("missing target");
        assert!(err.to_string().contains("item 1"), "{err}");
        assert!(BatchConfig::starter().validate().is_ok());
    }

    #[tokio::test]
    async fn failing_item_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = Arc::new(FakeApi::default());
        api.push_render(Ok(Bytes::from_static(b"one")));
        api.push_render(Err(InfraError::status(404, Some("design not found".into()))));
        api.push_render(Ok(Bytes::from_static(b"three")));
        let runner = BatchRunner::new(RenderOrchestrator::new(api.clone(), Duration::from_secs(2)));

        let config = BatchConfig::parse(
            r#"[
                {"designId":"d1"},
                {"designId":"missing"},
                {"templateId":"t3","format":"pdf","output":"custom-{{count}}.pdf"},
                {"format":"jpg"}
            ]"#,
            "batch.json",
        )
        .expect("parse");

        let mut seen = Vec::new();
        let summary = runner
            .run(&config, &defaults(dir.path()), |o| seen.push(o.index))
            .await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(fs_read(dir.path().join("d1.png")), b"one");
        assert_eq!(fs_read(dir.path().join("custom-2.pdf")), b"three");
        assert!(!dir.path().join("missing.png").exists());

        let failed = &summary.items[1];
        assert_eq!(failed.target.as_deref(), Some("design missing"));
        assert!(failed.error.as_deref().unwrap_or_default().contains("404"));
        assert_eq!(summary.items[3].target, None);

        // Items without a target never reach the API; defaults fill quality.
        let sent = api.rendered();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].quality, Some(80));
    }

    #[tokio::test]
    async fn default_output_names_stay_inside_the_output_dir() {
        let root = tempfile::tempdir().expect("tempdir");
        let out = root.path().join("out");
        let api = Arc::new(FakeApi::default());
        api.push_render(Ok(Bytes::from_static(b"escaped?")));
        let runner = BatchRunner::new(RenderOrchestrator::new(api, Duration::from_secs(2)));

        let config = BatchConfig::parse(r#"[{"designId":"../x"}]"#, "batch.json").expect("parse");
        let summary = runner.run(&config, &defaults(&out), |_| {}).await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(fs_read(out.join("___x.png")), b"escaped?");
        assert!(!root.path().join("x.png").exists());
    }

    fn fs_read(path: PathBuf) -> Vec<u8> {
        std::fs::read(path).expect("read output")
    }
}
