//! Mutates the model in response to listings, navigation and watch events.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use core_types::{MediaKind, UserComment};
use metadata::ExifCodec;
use tracing::{debug, warn};

use crate::model::MediaModel;
use crate::recycle::RecycleBin;
use crate::watcher::{DirWatcher, WatchEvent};

/// Extension filter for photo-only navigation.
pub const PHOTO_KINDS: &[MediaKind] = &[
    MediaKind::PhotoJpg,
    MediaKind::PhotoHeif,
    MediaKind::PhotoOther,
];

/// Extension filter for video-only navigation.
pub const VIDEO_KINDS: &[MediaKind] = &[MediaKind::Video];

/// Owns the [`MediaModel`] and keeps it consistent with the filesystem.
///
/// Every filesystem operation is best-effort: failures are logged and
/// the model keeps its previous state. Navigation and delete are no-ops
/// on an empty file list.
pub struct MediaController {
    model: MediaModel,
    watcher: Option<DirWatcher>,
    bin: Box<dyn RecycleBin>,
}

impl MediaController {
    pub fn new(model: MediaModel, bin: Box<dyn RecycleBin>) -> Self {
        Self {
            model,
            watcher: None,
            bin,
        }
    }

    /// Attaches a filesystem watcher; callers drive it via [`pump`](Self::pump).
    pub fn attach_watcher(&mut self, watcher: DirWatcher) {
        self.watcher = Some(watcher);
    }

    pub fn model(&self) -> &MediaModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut MediaModel {
        &mut self.model
    }

    /// Points the model at `dir`. For a new directory the listing is
    /// replaced wholesale and the selection cleared; for the current
    /// directory the listing is reconciled by symmetric difference, and
    /// a deleted selection moves to the next still-present file at or
    /// after its old index, wrapping once.
    pub fn update_dirpath(&mut self, dir: &Path) {
        let listing = match list_media(dir) {
            Ok(listing) => listing,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "failed to list directory");
                return;
            }
        };
        if self.model.dirpath() != Some(dir) {
            self.model.set_files_in(dir, listing);
            self.model.set_media_path(None);
            if let Some(w) = self.watcher.as_mut() {
                w.unwatch_file();
            }
        } else {
            self.reconcile(listing);
        }
        self.rewatch_dir(dir);
    }

    fn reconcile(&mut self, listing: Vec<PathBuf>) {
        let new: BTreeSet<PathBuf> = listing.into_iter().collect();
        let current: BTreeSet<PathBuf> = self.model.files().iter().cloned().collect();
        let added: Vec<PathBuf> = new.difference(&current).cloned().collect();
        let removed: Vec<PathBuf> = current.difference(&new).cloned().collect();

        if !added.is_empty() {
            self.model.add_files(&added);
        }
        if removed.is_empty() {
            return;
        }
        let selection_lost = self
            .model
            .media_path()
            .is_some_and(|sel| removed.iter().any(|r| r == sel));
        if selection_lost {
            let survivor = self.next_survivor(&new);
            if let Some(w) = self.watcher.as_mut() {
                w.unwatch_file();
            }
            match survivor {
                Some(path) => self.select(path),
                None => self.model.set_media_path(None),
            }
        }
        self.model.remove_files(&removed);
    }

    /// Next file at or after the selection's index that is still in
    /// `surviving`, wrapping around the old listing once.
    fn next_survivor(&self, surviving: &BTreeSet<PathBuf>) -> Option<PathBuf> {
        let files = self.model.files();
        let start = self.model.selection_index()?;
        (0..files.len())
            .map(|i| &files[(start + i) % files.len()])
            .find(|p| surviving.contains(*p))
            .cloned()
    }

    /// Sets the selection and moves the file watch to it.
    pub fn select(&mut self, path: PathBuf) {
        if let Some(w) = self.watcher.as_mut() {
            if let Err(err) = w.watch_file(&path) {
                warn!(file = %path.display(), %err, "failed to watch selection");
            }
        }
        self.model.set_media_path(Some(path));
    }

    /// Selects the next listed file, skipping extensions outside `kinds`
    /// when a filter is given. Wraps once and never raises; with no
    /// current selection the walk starts at the head of the list.
    pub fn select_next_media(&mut self, kinds: Option<&[MediaKind]>) {
        self.select_step(1, kinds);
    }

    /// Mirror of [`select_next_media`](Self::select_next_media).
    pub fn select_prev_media(&mut self, kinds: Option<&[MediaKind]>) {
        self.select_step(-1, kinds);
    }

    fn select_step(&mut self, step: isize, kinds: Option<&[MediaKind]>) {
        let files = self.model.files();
        let len = files.len() as isize;
        if len == 0 {
            return;
        }
        let (start, offsets) = match self.model.selection_index() {
            Some(i) => (i as isize, 1..=len),
            None => (0, 0..=len - 1),
        };
        for i in offsets {
            let idx = (start + step * i).rem_euclid(len) as usize;
            let matches = kinds.is_none_or(|k| k.contains(&MediaKind::of(&files[idx])));
            if matches {
                let path = files[idx].clone();
                self.select(path);
                return;
            }
        }
    }

    /// Moves the selected file to the recycle bin, then removes it from
    /// the model and advances the selection to the next survivor. If the
    /// bin refuses the file nothing changes.
    pub fn delete_current(&mut self) {
        let Some(victim) = self.model.media_path().map(Path::to_path_buf) else {
            return;
        };
        if let Err(err) = self.bin.discard(&victim) {
            warn!(file = %victim.display(), %err, "failed to recycle file");
            return;
        }
        let files = self.model.files();
        let next = self.model.selection_index().and_then(|idx| {
            (files.len() > 1).then(|| files[(idx + 1) % files.len()].clone())
        });
        if let Some(w) = self.watcher.as_mut() {
            w.unwatch_file();
        }
        self.model.remove_files(&[victim]);
        match next {
            Some(path) => self.select(path),
            None => self.model.set_media_path(None),
        }
    }

    /// Reloads the selection's comment into the model. Only photo-jpg
    /// files carry the EXIF blob; everything else yields an empty
    /// comment.
    pub fn refresh_comment(&mut self) {
        let Some(path) = self.model.media_path().map(Path::to_path_buf) else {
            return;
        };
        let comment = if MediaKind::of(&path) == MediaKind::PhotoJpg {
            match ExifCodec::read(&path) {
                Ok(meta) => meta.user_comment(),
                Err(err) => {
                    warn!(file = %path.display(), %err, "failed to read comment");
                    UserComment::new()
                }
            }
        } else {
            UserComment::new()
        };
        self.model.set_media_comment(comment);
    }

    /// Writes `comment` into the selected photo-jpg and mirrors it into
    /// the model. A non-jpg selection is logged and left untouched.
    pub fn save_comment(&mut self, comment: &UserComment) {
        let Some(path) = self.model.media_path().map(Path::to_path_buf) else {
            return;
        };
        if MediaKind::of(&path) != MediaKind::PhotoJpg {
            warn!(file = %path.display(), "comments are stored in JPEG files only");
            return;
        }
        let result = ExifCodec::read(&path).and_then(|mut meta| {
            meta.set_user_comment(comment);
            ExifCodec::write(&path, &meta)
        });
        match result {
            Ok(()) => self.model.set_media_comment(comment.clone()),
            Err(err) => warn!(file = %path.display(), %err, "failed to save comment"),
        }
    }

    /// File-change callback. A path that still exists but is not the
    /// watched file means the selection was renamed; swap to it.
    /// Otherwise the selected file's bytes changed in place.
    pub fn on_file_event(&mut self, path: &Path) {
        let watched = self
            .watcher
            .as_ref()
            .and_then(DirWatcher::watched_file)
            .map(Path::to_path_buf);
        if path.exists() && watched.as_deref() != Some(path) {
            debug!(file = %path.display(), "selection renamed, following");
            self.select(path.to_path_buf());
        } else {
            self.model.notify_file_content_changed(path);
        }
    }

    /// Directory-change callback: re-list and re-establish the watch.
    pub fn on_dir_event(&mut self, dir: &Path) {
        self.update_dirpath(dir);
    }

    /// Drains pending watch events and dispatches the callbacks.
    pub fn pump(&mut self) {
        let events = match self.watcher.as_mut() {
            Some(w) => w.poll(),
            None => return,
        };
        for event in events {
            match event {
                WatchEvent::Dir(dir) => self.on_dir_event(&dir),
                WatchEvent::File(file) => self.on_file_event(&file),
            }
        }
    }

    fn rewatch_dir(&mut self, dir: &Path) {
        if let Some(w) = self.watcher.as_mut() {
            if let Err(err) = w.watch_dir(dir) {
                warn!(dir = %dir.display(), %err, "failed to watch directory");
            }
        }
    }
}

fn list_media(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let path = entry.path();
            if MediaKind::of(&path).is_listed() {
                files.push(path);
            }
        }
    }
    Ok(files)
}
