//! Observable working set of media files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use catalog::{FaceDb, TagDb};
use core_types::{MediaKind, UserComment};
use tracing::debug;

use crate::events::{EventBus, ModelEvent};
use crate::Result;

/// Current directory listing, selection, comment and tag database.
///
/// All mutation goes through the setters below, each of which emits the
/// matching [`ModelEvent`] before returning.
#[derive(Debug, Default)]
pub struct MediaModel {
    dirpath: Option<PathBuf>,
    files: Vec<PathBuf>,
    media_path: Option<PathBuf>,
    media_comment: UserComment,
    tag_db: Option<TagDb>,
    face_db: Option<FaceDb>,
    bus: EventBus,
}

impl MediaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ModelEvent) + 'static) {
        self.bus.subscribe(listener);
    }

    pub fn dirpath(&self) -> Option<&Path> {
        self.dirpath.as_deref()
    }

    /// Sorted listing, restricted to media extensions.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn media_path(&self) -> Option<&Path> {
        self.media_path.as_deref()
    }

    /// Index of the selection in [`files`](Self::files), if it is listed.
    pub fn selection_index(&self) -> Option<usize> {
        let selected = self.media_path.as_deref()?;
        self.files.iter().position(|f| f == selected)
    }

    /// Comment of the selected media file, as last loaded or saved.
    pub fn media_comment(&self) -> &UserComment {
        &self.media_comment
    }

    pub fn tag_db(&self) -> Option<&TagDb> {
        self.tag_db.as_ref()
    }

    pub fn face_db(&self) -> Option<&FaceDb> {
        self.face_db.as_ref()
    }

    pub fn face_db_mut(&mut self) -> Option<&mut FaceDb> {
        self.face_db.as_mut()
    }

    /// Replaces the listing with `files`, which must all share a parent
    /// directory. Filters to media extensions and sorts; emits
    /// `DirChanged` when the parent differs from the current directory,
    /// then `DirContentChanged`.
    pub fn set_files(&mut self, files: Vec<PathBuf>) {
        let Some(parent) = files.first().and_then(|f| f.parent()).map(Path::to_path_buf) else {
            return;
        };
        assert!(
            files.iter().all(|f| f.parent() == Some(parent.as_path())),
            "set_files requires all paths to share a parent directory"
        );
        self.set_files_in(&parent, files);
    }

    /// Same as [`set_files`](Self::set_files) but with the directory
    /// supplied explicitly, so an empty listing is representable.
    pub fn set_files_in(&mut self, dir: &Path, files: Vec<PathBuf>) {
        let mut files: Vec<PathBuf> = files
            .into_iter()
            .filter(|f| MediaKind::of(f).is_listed())
            .collect();
        files.sort();
        if self.dirpath.as_deref() != Some(dir) {
            self.dirpath = Some(dir.to_path_buf());
            self.bus.emit(&ModelEvent::DirChanged(dir.to_path_buf()));
        }
        self.files = files;
        self.bus
            .emit(&ModelEvent::DirContentChanged(dir.to_path_buf()));
    }

    /// Unconditionally assigns the selection and emits `MediaChanged`.
    pub fn set_media_path(&mut self, path: Option<PathBuf>) {
        self.media_path = path.clone();
        self.bus.emit(&ModelEvent::MediaChanged(path));
    }

    /// Adds `paths` to the listing. Emits `DirContentChanged` only when
    /// the filtered set actually grew.
    pub fn add_files(&mut self, paths: &[PathBuf]) {
        let mut merged: BTreeSet<PathBuf> = self.files.iter().cloned().collect();
        for p in paths {
            if MediaKind::of(p).is_listed() {
                merged.insert(p.clone());
            }
        }
        self.replace_if_changed(merged);
    }

    /// Removes `paths` from the listing. Emits `DirContentChanged` only
    /// when the set actually shrank.
    pub fn remove_files(&mut self, paths: &[PathBuf]) {
        let mut kept: BTreeSet<PathBuf> = self.files.iter().cloned().collect();
        for p in paths {
            kept.remove(p);
        }
        self.replace_if_changed(kept);
    }

    fn replace_if_changed(&mut self, set: BTreeSet<PathBuf>) {
        let files: Vec<PathBuf> = set.into_iter().collect();
        if files == self.files {
            return;
        }
        self.files = files;
        if let Some(dir) = self.dirpath.clone() {
            self.bus.emit(&ModelEvent::DirContentChanged(dir));
        }
    }

    /// Replaces the comment of the selected media file and emits
    /// `MediaCommentUpdated`. Persisting the comment is the caller's job.
    pub fn set_media_comment(&mut self, comment: UserComment) {
        self.media_comment = comment.clone();
        self.bus.emit(&ModelEvent::MediaCommentUpdated(comment));
    }

    /// Signals that the selected file's bytes changed on disk.
    pub fn notify_file_content_changed(&mut self, path: &Path) {
        self.bus
            .emit(&ModelEvent::FileContentChanged(path.to_path_buf()));
    }

    /// Loads (or creates) the face database stored under `dir`.
    pub fn set_face_db_path(&mut self, dir: &Path) -> Result<()> {
        let db = FaceDb::load(dir)?;
        debug!(dir = %dir.display(), faces = db.len(), "face database loaded");
        self.face_db = Some(db);
        Ok(())
    }

    /// Loads (or creates) the tag database stored under `dir`.
    pub fn set_tag_db_path(&mut self, dir: &Path) -> Result<()> {
        let db = TagDb::load(dir)?;
        debug!(dir = %dir.display(), tags = db.len(), "tag database loaded");
        self.tag_db = Some(db);
        Ok(())
    }

    /// Adds `name` to the tag database; emits `TagAdded` when it was new.
    /// Returns whether the tag was new. No-op without a database.
    pub fn add_tag_to_db(&mut self, name: &str) -> Result<bool> {
        let Some(db) = self.tag_db.as_mut() else {
            return Ok(false);
        };
        let added = db.add(name)?;
        if added {
            self.bus.emit(&ModelEvent::TagAdded(name.to_string()));
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tempfile::tempdir;

    use super::*;

    fn recording_model() -> (MediaModel, Rc<RefCell<Vec<ModelEvent>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut model = MediaModel::new();
        let sink = Rc::clone(&log);
        model.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));
        (model, log)
    }

    fn paths(dir: &str, names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| Path::new(dir).join(n)).collect()
    }

    #[test]
    fn set_files_filters_sorts_and_emits() {
        let (mut model, log) = recording_model();
        model.set_files(paths("/pics", &["b.jpg", "notes.txt", "a.jpg", "c.mp4"]));

        assert_eq!(model.files(), paths("/pics", &["a.jpg", "b.jpg", "c.mp4"]));
        assert_eq!(
            *log.borrow(),
            vec![
                ModelEvent::DirChanged(PathBuf::from("/pics")),
                ModelEvent::DirContentChanged(PathBuf::from("/pics")),
            ]
        );
    }

    #[test]
    fn set_files_same_dir_skips_dir_changed() {
        let (mut model, log) = recording_model();
        model.set_files(paths("/pics", &["a.jpg"]));
        log.borrow_mut().clear();

        model.set_files(paths("/pics", &["a.jpg", "b.jpg"]));
        assert_eq!(
            *log.borrow(),
            vec![ModelEvent::DirContentChanged(PathBuf::from("/pics"))]
        );
    }

    #[test]
    #[should_panic(expected = "share a parent")]
    fn set_files_rejects_mixed_parents() {
        let mut model = MediaModel::new();
        model.set_files(vec![PathBuf::from("/a/x.jpg"), PathBuf::from("/b/y.jpg")]);
    }

    #[test]
    fn add_and_remove_emit_only_on_change() {
        let (mut model, log) = recording_model();
        model.set_files(paths("/pics", &["a.jpg", "b.jpg"]));
        log.borrow_mut().clear();

        // Non-media addition and removing an unknown path are no-ops.
        model.add_files(&paths("/pics", &["notes.txt"]));
        model.remove_files(&paths("/pics", &["zz.jpg"]));
        assert!(log.borrow().is_empty());

        model.add_files(&paths("/pics", &["c.mp4"]));
        model.remove_files(&paths("/pics", &["a.jpg"]));
        assert_eq!(model.files(), paths("/pics", &["b.jpg", "c.mp4"]));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn set_media_path_is_unconditional() {
        let (mut model, log) = recording_model();
        model.set_media_path(Some(PathBuf::from("/pics/a.jpg")));
        model.set_media_path(Some(PathBuf::from("/pics/a.jpg")));
        model.set_media_path(None);
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(model.media_path(), None);
    }

    #[test]
    fn media_comment_is_stored_and_announced() {
        let (mut model, log) = recording_model();
        assert!(model.media_comment().is_empty());

        let mut uc = UserComment::new();
        uc.set_comment("sunset at the pier");
        model.set_media_comment(uc.clone());

        assert_eq!(model.media_comment(), &uc);
        assert_eq!(*log.borrow(), vec![ModelEvent::MediaCommentUpdated(uc)]);
    }

    #[test]
    fn face_db_is_reachable_through_the_model() {
        let dir = tempdir().unwrap();
        let mut model = MediaModel::new();
        assert!(model.face_db().is_none());

        model.set_face_db_path(dir.path()).unwrap();
        let db = model.face_db().unwrap();
        assert!(db.is_empty());
        assert_eq!(db.root(), dir.path());
        assert!(model.face_db_mut().is_some());
    }

    #[test]
    fn tag_added_fires_once_per_new_name() {
        let dir = tempdir().unwrap();
        let (mut model, log) = recording_model();
        model.set_tag_db_path(dir.path()).unwrap();

        assert!(model.add_tag_to_db("Beach").unwrap());
        // Case-insensitive duplicate.
        assert!(!model.add_tag_to_db("beach").unwrap());
        assert_eq!(
            *log.borrow(),
            vec![ModelEvent::TagAdded("Beach".to_string())]
        );
    }
}
