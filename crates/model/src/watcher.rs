//! Filesystem watch over one directory and one file.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use crate::Result;

/// A change reported by [`DirWatcher::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something inside the watched directory changed.
    Dir(PathBuf),
    /// The watched file itself changed.
    File(PathBuf),
}

/// Watches exactly one directory (non-recursively) and one file, the
/// selected media file. Notify delivers events on its own thread; they
/// are buffered on a channel and drained on the caller's thread via
/// [`poll`](Self::poll), so consumers never deal with callbacks.
pub struct DirWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    dir: Option<PathBuf>,
    file: Option<PathBuf>,
}

impl DirWatcher {
    pub fn new() -> Result<Self> {
        let (tx, rx) = channel();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if tx.send(res).is_err() {
                    warn!("watch event dropped, receiver gone");
                }
            },
            Config::default(),
        )?;
        Ok(Self {
            watcher,
            rx,
            dir: None,
            file: None,
        })
    }

    pub fn watched_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn watched_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Replaces the watched directory.
    pub fn watch_dir(&mut self, dir: &Path) -> Result<()> {
        if self.dir.as_deref() == Some(dir) {
            return Ok(());
        }
        if let Some(old) = self.dir.take() {
            if let Err(err) = self.watcher.unwatch(&old) {
                warn!(dir = %old.display(), %err, "failed to unwatch directory");
            }
        }
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        self.dir = Some(dir.to_path_buf());
        Ok(())
    }

    /// Replaces the watched file.
    pub fn watch_file(&mut self, file: &Path) -> Result<()> {
        if self.file.as_deref() == Some(file) {
            return Ok(());
        }
        self.unwatch_file();
        self.watcher.watch(file, RecursiveMode::NonRecursive)?;
        self.file = Some(file.to_path_buf());
        Ok(())
    }

    pub fn unwatch_file(&mut self) {
        if let Some(old) = self.file.take() {
            if let Err(err) = self.watcher.unwatch(&old) {
                warn!(file = %old.display(), %err, "failed to unwatch file");
            }
        }
    }

    /// Drains pending notifications, collapsing them into at most one
    /// directory event plus per-path file events. A rename of the watched
    /// file surfaces as a `File` event carrying the NEW path, so the
    /// controller can follow the rename.
    pub fn poll(&mut self) -> Vec<WatchEvent> {
        let mut out = Vec::new();
        loop {
            let event = match self.rx.try_recv() {
                Ok(Ok(event)) => event,
                Ok(Err(err)) => {
                    warn!(%err, "watch error");
                    continue;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            let is_rename = matches!(event.kind, EventKind::Modify(ModifyKind::Name(_)));
            for path in &event.paths {
                let hit = if self.file.as_deref() == Some(path.as_path()) {
                    // The old name of a rename; the new name is routed below.
                    if is_rename && !path.exists() {
                        continue;
                    }
                    WatchEvent::File(path.clone())
                } else if is_rename && self.renamed_watched_file(&event, path) {
                    WatchEvent::File(path.clone())
                } else if let Some(dir) = self.dir.as_deref() {
                    if path.parent() == Some(dir) || path.as_path() == dir {
                        WatchEvent::Dir(dir.to_path_buf())
                    } else {
                        continue;
                    }
                } else {
                    continue;
                };
                if !out.contains(&hit) {
                    out.push(hit);
                }
            }
        }
        out
    }

    /// Whether `path` looks like the new name of the watched file: a
    /// sibling named by a rename event that either also carries the
    /// watched path, or arrives after the watched path stopped existing.
    fn renamed_watched_file(&self, event: &Event, path: &Path) -> bool {
        let Some(watched) = self.file.as_deref() else {
            return false;
        };
        if path.parent() != watched.parent() {
            return false;
        }
        event.paths.iter().any(|p| p == watched) || !watched.exists()
    }
}

impl std::fmt::Debug for DirWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirWatcher")
            .field("dir", &self.dir)
            .field("file", &self.file)
            .finish()
    }
}
