//! Persistent catalog of face detections.
//!
//! Layout on disk:
//! - `<dir>/dataset.json` — map from synthetic key to [`FaceRecord`].
//! - `<dir>/images/<name>/<filename>` — the enrolled image, carrying its
//!   bounding box as text in its own UserComment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use core_types::{EmbeddingModel, FaceBox, MediaKind, RgbFrame, UserComment};
use metadata::ExifCodec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{atomic_write, CatalogError, Result, DATASET_FILENAME};

/// Two boxes on the same image and model are the same detection above this.
const DEDUP_IOU: f64 = 0.9;

const IMAGES_DIRNAME: &str = "images";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub filename: String,
    pub embedding: Vec<f32>,
    #[serde(with = "core_types::geometry::as_text")]
    pub location: FaceBox,
    pub name: String,
    /// Stored as the raw id so that datasets written by other tools with
    /// models this build does not know survive a load/save cycle.
    pub model: String,
}

impl FaceRecord {
    fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.name, self.filename, self.location, self.model
        )
    }
}

/// Inputs for one enrollment.
pub struct NewFace<'a> {
    pub name: &'a str,
    pub patch: &'a RgbFrame,
    pub source: &'a Path,
    pub model: EmbeddingModel,
    pub embedding: &'a [f32],
    pub location: FaceBox,
}

#[derive(Debug)]
pub struct FaceDb {
    root: PathBuf,
    items: BTreeMap<String, FaceRecord>,
}

impl FaceDb {
    /// Opens `<dir>/dataset.json`, creating the directory layout when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir.join(IMAGES_DIRNAME))?;
        let path = dir.join(DATASET_FILENAME);
        let items = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            root: dir.to_path_buf(),
            items,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &FaceRecord> {
        self.items.values()
    }

    /// Enrolls a detection.
    ///
    /// Returns `Ok(false)` when an item with IoU > 0.9 already exists for
    /// the same (filename, model) and `overwrite` is false. With
    /// `overwrite`, the conflicting item is superseded and — when the name
    /// changed — the rename is propagated to that face's entries under
    /// other models.
    pub fn add(&mut self, face: NewFace<'_>, overwrite: bool) -> Result<bool> {
        if face.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if face.embedding.is_empty() {
            return Err(CatalogError::EmptyEmbedding);
        }
        let filename = face
            .source
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CatalogError::MissingFilename(face.source.to_path_buf()))?
            .to_string();

        let conflict_key = self
            .items
            .iter()
            .find(|(_, r)| {
                r.filename == filename
                    && r.model == face.model.id()
                    && r.location.iou(&face.location) > DEDUP_IOU
            })
            .map(|(k, _)| k.clone());

        let mut superseded_patch: Option<PathBuf> = None;
        if let Some(key) = conflict_key {
            if !overwrite {
                debug!(filename, model = %face.model, "duplicate detection rejected");
                return Ok(false);
            }
            let old = self.items.remove(&key).expect("conflict key present");
            superseded_patch = Some(self.patch_path(&old.name, &old.filename));
            if old.name != face.name {
                self.rename_siblings(&old, face.name);
            }
        }

        let record = FaceRecord {
            filename: filename.clone(),
            embedding: face.embedding.to_vec(),
            location: face.location,
            name: face.name.to_string(),
            model: face.model.id().to_string(),
        };
        self.items.insert(record.key(), record);
        self.save()?;

        if let Some(old_path) = superseded_patch {
            if old_path.exists() {
                if let Err(err) = fs::remove_file(&old_path) {
                    warn!(path = %old_path.display(), error = %err, "failed to delete superseded patch");
                }
            }
        }
        self.prune_empty_name_dirs()?;
        self.write_patch(face.name, &filename, face.source, face.patch, face.location)?;
        Ok(true)
    }

    /// Re-keys every other-model entry of `(old.name, old.filename)` to the
    /// new name, so a rename applies across all embedding models at once.
    fn rename_siblings(&mut self, old: &FaceRecord, new_name: &str) {
        let sibling_keys: Vec<String> = self
            .items
            .iter()
            .filter(|(_, r)| {
                r.name == old.name && r.filename == old.filename && r.model != old.model
            })
            .map(|(k, _)| k.clone())
            .collect();
        for key in sibling_keys {
            if let Some(mut record) = self.items.remove(&key) {
                record.name = new_name.to_string();
                self.items.insert(record.key(), record);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        atomic_write(
            &self.root.join(DATASET_FILENAME),
            &serde_json::to_string_pretty(&self.items)?,
        )
    }

    /// Distinct assigned names, sorted.
    pub fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.items.values().map(|r| r.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Distinct source filenames, optionally scoped to one name.
    pub fn known_filenames(&self, name: Option<&str>) -> Vec<String> {
        let mut filenames: Vec<String> = self
            .items
            .values()
            .filter(|r| name.is_none_or(|n| r.name == n))
            .map(|r| r.filename.clone())
            .collect();
        filenames.sort();
        filenames.dedup();
        filenames
    }

    /// All embeddings for one model with their names in parallel order.
    pub fn embeddings(&self, model: EmbeddingModel) -> (Vec<Vec<f32>>, Vec<String>) {
        let mut vectors = Vec::new();
        let mut names = Vec::new();
        for record in self.items.values() {
            if record.model == model.id() {
                vectors.push(record.embedding.clone());
                names.push(record.name.clone());
            }
        }
        (vectors, names)
    }

    pub fn patch_path(&self, name: &str, filename: &str) -> PathBuf {
        self.root.join(IMAGES_DIRNAME).join(name).join(filename)
    }

    fn prune_empty_name_dirs(&self) -> Result<()> {
        let images = self.root.join(IMAGES_DIRNAME);
        for entry in fs::read_dir(&images)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && fs::read_dir(entry.path())?.next().is_none() {
                fs::remove_dir(entry.path())?;
            }
        }
        Ok(())
    }

    /// Copies the enrolled image into `images/<name>/` (falling back to
    /// encoding the patch bitmap when the source is gone) and stamps the
    /// bounding box into its UserComment.
    fn write_patch(
        &self,
        name: &str,
        filename: &str,
        source: &Path,
        patch: &RgbFrame,
        location: FaceBox,
    ) -> Result<()> {
        let dest = self.patch_path(name, filename);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if source.exists() {
            fs::copy(source, &dest)?;
        } else {
            let img = image::RgbImage::from_raw(patch.width, patch.height, patch.data.clone())
                .expect("patch buffer matches its dimensions");
            img.save(&dest)?;
        }

        if MediaKind::of(&dest) == MediaKind::PhotoJpg {
            let mut meta = ExifCodec::read(&dest)?;
            let mut comment = UserComment::new();
            comment.set_comment(location.to_string());
            meta.set_user_comment(&comment);
            if let Err(err) = ExifCodec::write(&dest, &meta) {
                warn!(path = %dest.display(), error = %err, "failed to stamp patch comment");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_source_jpeg(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([100, 120, 140]));
        img.save(&path).unwrap();
        path
    }

    fn embedding(seed: f32) -> Vec<f32> {
        (0..8).map(|i| seed + i as f32).collect()
    }

    fn new_face<'a>(
        name: &'a str,
        source: &'a Path,
        patch: &'a RgbFrame,
        emb: &'a [f32],
        location: FaceBox,
    ) -> NewFace<'a> {
        NewFace {
            name,
            patch,
            source,
            model: EmbeddingModel::VggFace,
            embedding: emb,
            location,
        }
    }

    #[test]
    fn rejects_contract_violations() {
        let dir = tempdir().unwrap();
        let mut db = FaceDb::load(dir.path()).unwrap();
        let src = write_source_jpeg(dir.path(), "img.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);

        let no_name = new_face("", &src, &patch, &[1.0], FaceBox::new(0, 8, 8, 0));
        assert!(matches!(db.add(no_name, false), Err(CatalogError::EmptyName)));

        let no_emb = new_face("alice", &src, &patch, &[], FaceBox::new(0, 8, 8, 0));
        assert!(matches!(
            db.add(no_emb, false),
            Err(CatalogError::EmptyEmbedding)
        ));
    }

    #[test]
    fn enrollment_writes_dataset_and_patch() {
        let dir = tempdir().unwrap();
        let mut db = FaceDb::load(dir.path()).unwrap();
        let src = write_source_jpeg(dir.path(), "img.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);
        let emb = embedding(0.0);

        let added = db
            .add(
                new_face("alice", &src, &patch, &emb, FaceBox::new(10, 100, 100, 10)),
                false,
            )
            .unwrap();
        assert!(added);
        assert_eq!(db.len(), 1);

        let patch_path = db.patch_path("alice", "img.jpg");
        assert!(patch_path.exists());
        let meta = ExifCodec::read(&patch_path).unwrap();
        assert_eq!(
            meta.user_comment().comment(),
            Some("(10, 100, 100, 10)")
        );
    }

    #[test]
    fn duplicate_rejected_without_overwrite() {
        let dir = tempdir().unwrap();
        let mut db = FaceDb::load(dir.path()).unwrap();
        let src = write_source_jpeg(dir.path(), "img.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);
        let emb = embedding(0.0);

        db.add(
            new_face("alice", &src, &patch, &emb, FaceBox::new(10, 100, 100, 10)),
            false,
        )
        .unwrap();
        let added = db
            .add(
                new_face("bob", &src, &patch, &emb, FaceBox::new(12, 98, 98, 12)),
                false,
            )
            .unwrap();
        assert!(!added);
        assert_eq!(db.known_names(), vec!["alice".to_string()]);
    }

    #[test]
    fn s5_overwrite_supersedes_and_prunes() {
        let dir = tempdir().unwrap();
        let mut db = FaceDb::load(dir.path()).unwrap();
        let src = write_source_jpeg(dir.path(), "img.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);
        let (ea, eb) = (embedding(0.0), embedding(10.0));

        db.add(
            new_face("alice", &src, &patch, &ea, FaceBox::new(10, 100, 100, 10)),
            false,
        )
        .unwrap();
        let added = db
            .add(
                new_face("bob", &src, &patch, &eb, FaceBox::new(12, 98, 98, 12)),
                true,
            )
            .unwrap();
        assert!(added);

        let (vectors, names) = db.embeddings(EmbeddingModel::VggFace);
        assert_eq!(names, vec!["bob".to_string()]);
        assert_eq!(vectors, vec![eb]);
        assert!(!dir.path().join("images").join("alice").exists());
        assert!(db.patch_path("bob", "img.jpg").exists());
    }

    #[test]
    fn overwrite_renames_other_model_siblings() {
        let dir = tempdir().unwrap();
        let mut db = FaceDb::load(dir.path()).unwrap();
        let src = write_source_jpeg(dir.path(), "img.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);
        let emb = embedding(0.0);
        let location = FaceBox::new(10, 100, 100, 10);

        // Same face enrolled under two models as "alice".
        db.add(
            NewFace {
                name: "alice",
                patch: &patch,
                source: &src,
                model: EmbeddingModel::VggFace,
                embedding: &emb,
                location,
            },
            false,
        )
        .unwrap();
        db.add(
            NewFace {
                name: "alice",
                patch: &patch,
                source: &src,
                model: EmbeddingModel::Facenet,
                embedding: &emb,
                location,
            },
            false,
        )
        .unwrap();

        // Re-enroll the VGG-Face entry as "bob"; Facenet follows.
        db.add(
            NewFace {
                name: "bob",
                patch: &patch,
                source: &src,
                model: EmbeddingModel::VggFace,
                embedding: &emb,
                location: FaceBox::new(11, 99, 99, 11),
            },
            true,
        )
        .unwrap();

        assert_eq!(db.known_names(), vec!["bob".to_string()]);
        let (_, facenet_names) = db.embeddings(EmbeddingModel::Facenet);
        assert_eq!(facenet_names, vec!["bob".to_string()]);
    }

    #[test]
    fn different_files_do_not_conflict() {
        let dir = tempdir().unwrap();
        let mut db = FaceDb::load(dir.path()).unwrap();
        let src_a = write_source_jpeg(dir.path(), "a.jpg");
        let src_b = write_source_jpeg(dir.path(), "b.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);
        let emb = embedding(0.0);
        let location = FaceBox::new(10, 100, 100, 10);

        db.add(new_face("alice", &src_a, &patch, &emb, location), false)
            .unwrap();
        let added = db
            .add(new_face("bob", &src_b, &patch, &emb, location), false)
            .unwrap();
        assert!(added);
        assert_eq!(db.len(), 2);
        assert_eq!(
            db.known_filenames(Some("bob")),
            vec!["b.jpg".to_string()]
        );
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempdir().unwrap();
        let src = write_source_jpeg(dir.path(), "img.jpg");
        let patch = RgbFrame::filled(8, 8, [1, 2, 3]);
        let emb = embedding(0.0);
        {
            let mut db = FaceDb::load(dir.path()).unwrap();
            db.add(
                new_face("alice", &src, &patch, &emb, FaceBox::new(10, 100, 100, 10)),
                false,
            )
            .unwrap();
        }
        let db = FaceDb::load(dir.path()).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.known_names(), vec!["alice".to_string()]);
    }
}
