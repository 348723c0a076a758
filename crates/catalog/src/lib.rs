//! On-disk tag and face catalogs.
//!
//! Both stores persist as `dataset.json` documents inside their own
//! directory; writes are atomic replaces.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod facedb;
pub mod tagdb;

pub use facedb::{FaceDb, FaceRecord, NewFace};
pub use tagdb::TagDb;

pub const DATASET_FILENAME: &str = "dataset.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] metadata::MetadataError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Face name must not be empty")]
    EmptyName,

    #[error("Face embedding must not be empty")]
    EmptyEmbedding,

    #[error("Source path has no filename: {0}")]
    MissingFilename(PathBuf),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Atomically replaces `path` with `payload` via a sibling tempfile.
pub(crate) fn atomic_write(path: &Path, payload: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    file.write_all(payload.as_bytes())?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
