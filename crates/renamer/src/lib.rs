//! Rule-based media renamer.
//!
//! A [`Registry`] holds timestamp parsers and destination-name builders,
//! each keyed by a tag string. Planning walks the parsers in registration
//! order and stops at the first one that yields a timestamp; applying
//! performs the rename on disk, optionally backing up the original and
//! recycling exact duplicates.

use std::path::PathBuf;

use thiserror::Error;

pub mod apply;
pub mod plan;
pub mod registry;

pub use apply::{apply, ApplyOptions};
pub use plan::{RenamePlan, RenameStatus};
pub use registry::{NameBuilder, Registry, TimestampParser};

#[derive(Debug, Error)]
pub enum RenamerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] metadata::MetadataError),

    #[error("No name builder registered for tag {0:?}")]
    UnknownBuilder(String),

    #[error("Path has no filename: {0}")]
    MissingFilename(PathBuf),
}

pub type Result<T> = std::result::Result<T, RenamerError>;
