use std::{
    collections::HashSet,
    ffi::OsString,
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::{fs, sync::mpsc::UnboundedReceiver, time::sleep};
use tracing::{info, warn};

use super::{WatchReport, hook::spawn_hook, render_data_file};
use crate::{
    application::{error::AppError, orchestrator::RenderOrchestrator},
    domain::render::RenderRequest,
};

#[derive(Debug, Clone)]
pub struct DirectoryWatchOptions {
    pub dir: PathBuf,
    pub output_dir: PathBuf,
    pub request: RenderRequest,
    /// Only files with this extension are rendered (case-insensitive).
    pub extension: String,
    pub settle: Duration,
    pub delete_source: bool,
    pub hook: Option<String>,
}

/// Renders each data file in a directory exactly once: the files present at
/// startup first, in listing order, then every new file as it appears.
pub struct DirectoryWatcher {
    orch: RenderOrchestrator,
    opts: DirectoryWatchOptions,
    processed: HashSet<OsString>,
    report: WatchReport,
}

impl DirectoryWatcher {
    pub fn new(orch: RenderOrchestrator, opts: DirectoryWatchOptions) -> Self {
        Self {
            orch,
            opts,
            processed: HashSet::new(),
            report: WatchReport::default(),
        }
    }

    /// Subscribe to `events` before calling this so files created during the
    /// initial scan are not missed; duplicates are skipped.
    pub async fn run<S>(mut self, mut events: UnboundedReceiver<PathBuf>, shutdown: S) -> WatchReport
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let existing = match self.existing_files().await {
            Ok(files) => files,
            Err(err) => {
                warn!(
                    target = "application::watch::directory",
                    dir = %self.opts.dir.display(),
                    error = %err,
                    "Failed to list watched directory"
                );
                Vec::new()
            }
        };
        info!(
            target = "application::watch::directory",
            dir = %self.opts.dir.display(),
            existing = existing.len(),
            "Watching directory"
        );

        for path in existing {
            tokio::select! {
                biased;
                () = &mut shutdown => return self.report,
                () = self.process(&path, Duration::ZERO) => {}
            }
        }

        loop {
            let changed = tokio::select! {
                biased;
                () = &mut shutdown => break,
                changed = events.recv() => changed,
            };
            let Some(path) = changed else { break };

            let settle = self.opts.settle;
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = self.process(&path, settle) => {}
            }
        }

        info!(
            target = "application::watch::directory",
            rendered = self.report.rendered,
            failed = self.report.failed,
            "Directory watch stopped"
        );
        self.report
    }

    async fn existing_files(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.opts.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if self.qualifies(&path).await {
                files.push(path);
            }
        }
        Ok(files)
    }

    async fn qualifies(&self, path: &Path) -> bool {
        let ext_matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.opts.extension));
        ext_matches && fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
    }

    /// The rendered file for `source`: `<output_dir>/<stem>.<ext>`.
    pub fn output_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("render"));
        let mut name = stem;
        name.push(".");
        name.push(self.opts.request.format.extension());
        self.opts.output_dir.join(name)
    }

    async fn process(&mut self, path: &Path, settle: Duration) {
        if !self.qualifies(path).await {
            return;
        }
        let Some(name) = path.file_name().map(OsString::from) else {
            return;
        };
        // Marked before rendering: a failed file is not retried on later events.
        if !self.processed.insert(name) {
            return;
        }
        if !settle.is_zero() {
            sleep(settle).await;
        }

        let output = self.output_for(path);
        match render_data_file(&self.orch, &self.opts.request, path, &output).await {
            Ok(bytes) => {
                self.report.rendered += 1;
                info!(
                    target = "application::watch::directory",
                    op = "watch_dir::render",
                    result = "ok",
                    source = %path.display(),
                    output = %output.display(),
                    bytes,
                    "Rendered data file"
                );
                if self.opts.delete_source {
                    if let Err(err) = fs::remove_file(path).await {
                        warn!(
                            target = "application::watch::directory",
                            source = %path.display(),
                            error = %err,
                            "Failed to delete processed data file"
                        );
                    }
                }
                if let Some(hook) = &self.opts.hook {
                    spawn_hook(hook, &output);
                }
            }
            Err(err) => {
                self.report.failed += 1;
                warn!(
                    target = "application::watch::directory",
                    op = "watch_dir::render",
                    result = "error",
                    source = %path.display(),
                    error = %err,
                    "Failed to render data file; still watching"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, future::pending, sync::Arc};

    use designctl_api_types::RenderFormat;
    use serde_json::json;
    use tokio::{sync::mpsc, time::sleep};

    use super::*;
    use crate::application::orchestrator::tests::FakeApi;

    fn options(dir: &Path, out: &Path) -> DirectoryWatchOptions {
        DirectoryWatchOptions {
            dir: dir.to_path_buf(),
            output_dir: out.to_path_buf(),
            request: RenderRequest::for_template("t1", RenderFormat::Jpg),
            extension: "json".into(),
            settle: Duration::from_millis(100),
            delete_source: false,
            hook: None,
        }
    }

    fn listing_order(dir: &Path) -> Vec<serde_json::Value> {
        fs::read_dir(dir)
            .expect("list")
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            })
            .map(|p| serde_json::from_str(&fs::read_to_string(p).expect("read")).expect("json"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn existing_files_first_then_new_ones_once() {
        let input = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        fs::write(input.path().join("a.json"), r#"{"name":"a"}"#).expect("write");
        fs::write(input.path().join("b.JSON"), r#"{"name":"b"}"#).expect("write");
        fs::write(input.path().join("notes.txt"), "skip me").expect("write");
        let scanned = listing_order(input.path());

        let api = Arc::new(FakeApi::default());
        let orch = RenderOrchestrator::new(api.clone(), Duration::from_secs(2));
        let watcher = DirectoryWatcher::new(orch, options(input.path(), out.path()));

        let (tx, rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(watcher.run(rx, pending()));
        while !(out.path().join("a.jpg").exists() && out.path().join("b.jpg").exists()) {
            sleep(Duration::from_millis(10)).await;
        }

        // Events for already-scanned files are ignored.
        tx.send(input.path().join("a.json")).expect("send");
        fs::write(input.path().join("c.json"), r#"{"name":"c"}"#).expect("write");
        tx.send(input.path().join("c.json")).expect("send");
        tx.send(input.path().join("c.json")).expect("send");
        tx.send(input.path().join("notes.txt")).expect("send");
        drop(tx);

        let report = session.await.expect("join");
        assert_eq!(report, WatchReport { rendered: 3, failed: 0 });

        let sent: Vec<_> = api
            .rendered()
            .into_iter()
            .map(|body| body.dynamic_data.expect("data"))
            .collect();
        assert_eq!(sent.len(), 3);
        assert_eq!(&sent[..2], &scanned[..]);
        assert_eq!(sent[2], json!({ "name": "c" }));

        for stem in ["a", "b", "c"] {
            assert!(out.path().join(format!("{stem}.jpg")).exists(), "{stem}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delete_source_removes_only_rendered_files() {
        let input = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        fs::write(input.path().join("good.json"), "{}").expect("write");
        fs::write(input.path().join("bad.json"), "{oops").expect("write");

        let api = Arc::new(FakeApi::default());
        let orch = RenderOrchestrator::new(api, Duration::from_secs(2));
        let mut opts = options(input.path(), out.path());
        opts.delete_source = true;
        let watcher = DirectoryWatcher::new(orch, opts);

        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        let report = watcher.run(rx, pending()).await;

        assert_eq!(report, WatchReport { rendered: 1, failed: 1 });
        assert!(!input.path().join("good.json").exists());
        assert!(input.path().join("bad.json").exists());
        assert!(out.path().join("good.jpg").exists());
    }

    #[test]
    fn output_uses_stem_and_format_extension() {
        let api = Arc::new(FakeApi::default());
        let orch = RenderOrchestrator::new(api, Duration::from_secs(2));
        let mut opts = options(Path::new("/in"), Path::new("/out"));
        opts.request.format = RenderFormat::Jpeg;
        let watcher = DirectoryWatcher::new(orch, opts);
        assert_eq!(
            watcher.output_for(Path::new("/in/card.v2.json")),
            PathBuf::from("/out/card.v2.jpeg")
        );
    }
}
