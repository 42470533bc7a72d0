//! Filesystem change subscriptions backed by `notify`.
//!
//! Events are reduced to the paths that were created or written and pushed
//! onto an unbounded channel; dropping the [`Subscription`] stops the watcher
//! and closes the channel.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::ModifyKind,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use super::error::InfraError;

pub struct Subscription {
    _watcher: RecommendedWatcher,
}

/// Watch a single file. The parent directory is observed so that editors
/// which replace the file on save keep triggering events.
pub fn watch_file(path: &Path) -> Result<(Subscription, UnboundedReceiver<PathBuf>), InfraError> {
    let file_name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| InfraError::watch(format!("{} is not a file path", path.display())))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    subscribe(&parent, move |changed| {
        changed.file_name() == Some(file_name.as_os_str())
    })
}

/// Watch the direct children of `dir`.
pub fn watch_dir(dir: &Path) -> Result<(Subscription, UnboundedReceiver<PathBuf>), InfraError> {
    subscribe(dir, |_| true)
}

fn subscribe<F>(
    dir: &Path,
    keep: F,
) -> Result<(Subscription, UnboundedReceiver<PathBuf>), InfraError>
where
    F: Fn(&Path) -> bool + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        forward(res, &tx, &keep);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok((Subscription { _watcher: watcher }, rx))
}

fn forward<F>(res: notify::Result<Event>, tx: &UnboundedSender<PathBuf>, keep: &F)
where
    F: Fn(&Path) -> bool,
{
    let event = match res {
        Ok(event) => event,
        Err(err) => {
            warn!(
                target = "infra::fs_watch",
                error = %err,
                "Filesystem watcher reported an error"
            );
            return;
        }
    };
    if !is_content_change(&event.kind) {
        return;
    }
    for path in event.paths {
        if keep(&path) {
            // The receiver is gone once the session ends.
            let _ = tx.send(path);
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind};

    use super::*;

    #[test]
    fn only_content_changes_are_forwarded() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(!is_content_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::AccessTime
        ))));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn forward_filters_paths() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/data/input.json"))
            .add_path(PathBuf::from("/data/other.json"));
        forward(Ok(event), &tx, &|p: &Path| p.ends_with("input.json"));

        assert_eq!(rx.try_recv().ok(), Some(PathBuf::from("/data/input.json")));
        assert!(rx.try_recv().is_err());
    }
}
