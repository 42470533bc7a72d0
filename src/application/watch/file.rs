use std::{
    future::{Future, pending},
    path::PathBuf,
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use super::{WatchPhase, WatchReport, hook::spawn_hook, render_data_file};
use crate::{
    application::{error::AppError, orchestrator::RenderOrchestrator, output::OutputTemplate},
    domain::render::RenderRequest,
};

#[derive(Debug, Clone)]
pub struct FileWatchOptions {
    pub data_file: PathBuf,
    /// Target, format and sizing; dynamic data is replaced on every render.
    pub request: RenderRequest,
    pub output: OutputTemplate,
    pub debounce: Duration,
    pub hook: Option<String>,
}

type FireOutcome = Result<(PathBuf, usize), AppError>;

/// Debounced re-rendering of a single data file.
///
/// At most one render is in flight. Changes seen while rendering re-arm the
/// deadline, which only fires after the in-flight render has finished, so a
/// burst during a render collapses into a single follow-up render.
pub struct FileWatcher {
    orch: RenderOrchestrator,
    opts: FileWatchOptions,
    deadline: Option<Instant>,
    in_flight: Option<BoxFuture<'static, FireOutcome>>,
    report: WatchReport,
}

impl FileWatcher {
    pub fn new(orch: RenderOrchestrator, opts: FileWatchOptions) -> Self {
        Self {
            orch,
            opts,
            deadline: None,
            in_flight: None,
            report: WatchReport::default(),
        }
    }

    pub fn phase(&self) -> WatchPhase {
        if self.in_flight.is_some() {
            WatchPhase::Rendering
        } else if self.deadline.is_some() {
            WatchPhase::PendingRender
        } else {
            WatchPhase::Idle
        }
    }

    /// Run until `shutdown` resolves, or until `events` is closed and nothing
    /// is pending. An in-flight render is dropped on shutdown; its output is
    /// written atomically so nothing partial is left behind.
    pub async fn run<S>(mut self, mut events: UnboundedReceiver<PathBuf>, shutdown: S) -> WatchReport
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut events_open = true;

        info!(
            target = "application::watch::file",
            file = %self.opts.data_file.display(),
            debounce_ms = self.opts.debounce.as_millis() as u64,
            "Watching data file"
        );

        loop {
            if !events_open && self.phase() == WatchPhase::Idle {
                break;
            }
            let deadline = self.deadline.unwrap_or_else(Instant::now);
            let can_fire = self.deadline.is_some() && self.in_flight.is_none();

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(
                        target = "application::watch::file",
                        phase = %self.phase(),
                        "Watch interrupted"
                    );
                    break;
                }
                outcome = poll_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.finish(outcome);
                }
                changed = events.recv(), if events_open => match changed {
                    Some(path) => {
                        self.deadline = Some(Instant::now() + self.opts.debounce);
                        debug!(
                            target = "application::watch::file",
                            path = %path.display(),
                            phase = %self.phase(),
                            "Change detected; debounce armed"
                        );
                    }
                    None => events_open = false,
                },
                () = sleep_until(deadline), if can_fire => {
                    self.deadline = None;
                    self.in_flight = Some(self.fire());
                }
            }
        }

        self.report
    }

    fn fire(&self) -> BoxFuture<'static, FireOutcome> {
        let orch = self.orch.clone();
        let request = self.opts.request.clone();
        let data_file = self.opts.data_file.clone();
        let output = self.opts.output.resolve_now(self.report.rendered + 1);

        async move {
            let written = render_data_file(&orch, &request, &data_file, &output).await?;
            Ok((output, written))
        }
        .boxed()
    }

    fn finish(&mut self, outcome: FireOutcome) {
        match outcome {
            Ok((output, bytes)) => {
                self.report.rendered += 1;
                info!(
                    target = "application::watch::file",
                    op = "watch::render",
                    result = "ok",
                    count = self.report.rendered,
                    output = %output.display(),
                    bytes,
                    "Rendered after change"
                );
                if let Some(hook) = &self.opts.hook {
                    spawn_hook(hook, &output);
                }
            }
            Err(err) => {
                self.report.failed += 1;
                warn!(
                    target = "application::watch::file",
                    op = "watch::render",
                    result = "error",
                    error = %err,
                    "Render after change failed; still watching"
                );
            }
        }
    }
}

async fn poll_in_flight(slot: &mut Option<BoxFuture<'static, FireOutcome>>) -> FireOutcome {
    match slot {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use bytes::Bytes;
    use designctl_api_types::{
        AsyncRenderAccepted, RenderFormat, RenderJob, RenderRequestBody,
    };
    use serde_json::json;
    use tokio::{sync::mpsc, time::sleep};

    use super::*;
    use crate::{
        application::orchestrator::{RenderApi, tests::FakeApi},
        infra::error::InfraError,
    };

    fn options(dir: &std::path::Path, output: &str) -> FileWatchOptions {
        FileWatchOptions {
            data_file: dir.join("data.json"),
            request: RenderRequest::for_design("d1", RenderFormat::Png),
            output: OutputTemplate::new(dir.join(output).display().to_string()),
            debounce: Duration::from_millis(500),
            hook: None,
        }
    }

    fn orchestrator(api: Arc<dyn RenderApi>) -> RenderOrchestrator {
        RenderOrchestrator::new(api, Duration::from_millis(2_000))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_renders_once_with_last_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = options(dir.path(), "out.png");
        let data_file = opts.data_file.clone();
        let api = Arc::new(FakeApi::default());
        let watcher = FileWatcher::new(orchestrator(api.clone()), opts);

        let (tx, rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(watcher.run(rx, pending()));

        for n in 1..=3 {
            fs::write(&data_file, json!({ "n": n }).to_string()).expect("write");
            tx.send(data_file.clone()).expect("send");
            sleep(Duration::from_millis(100)).await;
        }
        drop(tx);

        let report = session.await.expect("join");
        assert_eq!(report, WatchReport { rendered: 1, failed: 0 });

        let sent = api.rendered();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].dynamic_data, Some(json!({ "n": 3 })));
        assert!(dir.path().join("out.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn count_placeholder_increments_per_render() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = options(dir.path(), "out_{{count}}.png");
        let data_file = opts.data_file.clone();
        let api = Arc::new(FakeApi::default());
        let watcher = FileWatcher::new(orchestrator(api), opts);

        let (tx, rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(watcher.run(rx, pending()));

        for n in 1..=3 {
            fs::write(&data_file, json!({ "n": n }).to_string()).expect("write");
            tx.send(data_file.clone()).expect("send");
            sleep(Duration::from_secs(1)).await;
        }
        drop(tx);

        let report = session.await.expect("join");
        assert_eq!(report.rendered, 3);
        for n in 1..=3 {
            assert!(dir.path().join(format!("out_{n}.png")).exists(), "out_{n}");
        }
        assert!(!dir.path().join("out_4.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_counted_and_the_session_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = options(dir.path(), "out_{{count}}.png");
        let data_file = opts.data_file.clone();
        let api = Arc::new(FakeApi::default());
        api.push_render(Err(InfraError::status(500, Some("boom".into()))));
        let watcher = FileWatcher::new(orchestrator(api.clone()), opts);

        let (tx, rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(watcher.run(rx, pending()));

        fs::write(&data_file, "{ not json").expect("write");
        tx.send(data_file.clone()).expect("send");
        sleep(Duration::from_secs(1)).await;

        fs::write(&data_file, r#"{"ok":true}"#).expect("write");
        tx.send(data_file.clone()).expect("send");
        sleep(Duration::from_secs(1)).await;

        tx.send(data_file.clone()).expect("send");
        drop(tx);

        let report = session.await.expect("join");
        assert_eq!(report, WatchReport { rendered: 1, failed: 2 });
        // Parse failures never reach the API.
        assert_eq!(api.rendered().len(), 2);
        assert!(dir.path().join("out_1.png").exists());
        assert!(!dir.path().join("out_2.png").exists());
    }

    /// Counts overlapping renders.
    #[derive(Default)]
    struct SlowApi {
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RenderApi for SlowApi {
        async fn render_binary(&self, _body: &RenderRequestBody) -> Result<Bytes, InfraError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_secs(2)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"slow"))
        }

        async fn render_async(
            &self,
            _body: &RenderRequestBody,
        ) -> Result<AsyncRenderAccepted, InfraError> {
            Err(InfraError::decode("unused"))
        }

        async fn render_status(&self, _job_id: &str) -> Result<RenderJob, InfraError> {
            Err(InfraError::decode("unused"))
        }

        async fn download(&self, _location: &str) -> Result<Bytes, InfraError> {
            Err(InfraError::decode("unused"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn changes_during_a_render_queue_one_follow_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = options(dir.path(), "out.png");
        let data_file = opts.data_file.clone();
        fs::write(&data_file, "{}").expect("write");
        let api = Arc::new(SlowApi::default());
        let watcher = FileWatcher::new(orchestrator(api.clone()), opts);

        let (tx, rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(watcher.run(rx, pending()));

        tx.send(data_file.clone()).expect("send");
        // First render starts at 500ms and runs until 2500ms.
        sleep(Duration::from_millis(700)).await;
        for _ in 0..3 {
            tx.send(data_file.clone()).expect("send");
            sleep(Duration::from_millis(200)).await;
        }
        drop(tx);

        let report = session.await.expect("join");
        assert_eq!(report.rendered, 2);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_a_pending_render() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = options(dir.path(), "out.png");
        let data_file = opts.data_file.clone();
        fs::write(&data_file, "{}").expect("write");
        let api = Arc::new(FakeApi::default());
        let watcher = FileWatcher::new(orchestrator(api.clone()), opts);

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(data_file).expect("send");
        let report = watcher
            .run(rx, sleep(Duration::from_millis(100)))
            .await;

        assert_eq!(report, WatchReport::default());
        assert!(api.rendered().is_empty());
        assert!(!dir.path().join("out.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_a_render_leaves_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = options(dir.path(), "out.png");
        let data_file = opts.data_file.clone();
        fs::write(&data_file, "{}").expect("write");
        let api = Arc::new(SlowApi::default());
        let watcher = FileWatcher::new(orchestrator(api.clone()), opts);

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(data_file).expect("send");
        // The render starts at 500ms and would finish at 2500ms.
        let report = watcher
            .run(rx, sleep(Duration::from_millis(1_500)))
            .await;
        drop(tx);

        assert_eq!(report, WatchReport::default());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("out.png").exists());
        let mut left: Vec<_> = fs::read_dir(dir.path())
            .expect("list")
            .flatten()
            .map(|entry| entry.file_name())
            .collect();
        left.sort();
        assert_eq!(left, vec![std::ffi::OsString::from("data.json")]);
    }
}
