//! Folder watcher: turns file arrivals in one directory into a lazy stream of paths.
//!
//! A file "arrives" when it is created in the folder or renamed into it.
//! Modifications, deletions, directory creation and the source side of a
//! rename are ignored, so a file moved out by a handler is never re-emitted.

use crate::utils::error::Result;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub fn is_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File | CreateKind::Any | CreateKind::Other)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

pub struct FolderWatcher {
    path: PathBuf,
    events: mpsc::UnboundedReceiver<PathBuf>,
}

impl FolderWatcher {
    /// Creates `dir` when missing and starts watching it. The watch is
    /// registered before this returns, so files created afterwards are seen.
    ///
    /// Setup failures are logged and yield a watcher whose `next` returns
    /// `None` right away.
    pub async fn start(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        tracing::debug!("Starting file watcher for {}", dir.display());

        let (tx, events) = mpsc::unbounded_channel();
        match spawn_watch(&dir, tx).await {
            Ok(path) => Self { path, events },
            Err(e) => {
                tracing::error!(
                    "Error adding folder to watch. Folder: {}. Error details: {}",
                    dir.display(),
                    e
                );
                Self { path: dir, events }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next arrived file (absolute path). `None` only once the watcher has stopped.
    pub async fn next(&mut self) -> Option<PathBuf> {
        self.events.recv().await
    }
}

async fn spawn_watch(dir: &Path, out: mpsc::UnboundedSender<PathBuf>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let dir = tokio::fs::canonicalize(dir).await?;

    // notify 在自己的執行緒回呼，轉送到 tokio channel
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = raw_tx.send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    tokio::spawn(forward(watcher, raw_rx, out, dir.clone()));

    Ok(dir)
}

/// Forwards arrivals until the receiving `FolderWatcher` is dropped. `guard`
/// keeps the OS watch registered for exactly as long as this runs.
async fn forward<G>(
    guard: G,
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    out: mpsc::UnboundedSender<PathBuf>,
    watched: PathBuf,
) {
    let _guard = guard;

    loop {
        let res = tokio::select! {
            _ = out.closed() => break,
            res = raw_rx.recv() => match res {
                Some(res) => res,
                None => break,
            },
        };

        match res {
            Ok(event) => {
                if !is_arrival(&event.kind) {
                    continue;
                }
                for path in event.paths {
                    if path.is_dir() {
                        continue;
                    }
                    if out.send(path).is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Error on watching folder/path. Path: {}. Error: {}",
                    watched.display(),
                    e
                );
            }
        }
    }

    tracing::debug!("Stopping file watcher for {}", watched.display());
}
