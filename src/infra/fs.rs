//! Filesystem helpers shared by the store and the render writers.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use bytes::Bytes;
use tempfile::NamedTempFile;

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never observe a half-written file and an interrupted write leaves
/// nothing behind.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// [`write_atomic`] on the blocking pool, for callers on the runtime.
pub async fn write_atomic_async(path: &Path, contents: Bytes) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&path, &contents))
        .await
        .map_err(io::Error::other)?
}
