//! Observable media state and the controller that keeps it in sync with
//! the filesystem.
//!
//! [`MediaModel`] holds the listed files, the selected media file and the
//! tag database, and notifies subscribers synchronously through an
//! [`EventBus`]. [`MediaController`] mutates the model in response to
//! directory listings, navigation requests and watcher callbacks.

use std::path::PathBuf;

use thiserror::Error;

pub mod controller;
pub mod events;
pub mod model;
pub mod recycle;
pub mod watcher;

pub use controller::{MediaController, PHOTO_KINDS, VIDEO_KINDS};
pub use events::{EventBus, ModelEvent};
pub use model::MediaModel;
pub use recycle::{BackupBin, RecycleBin};
pub use watcher::{DirWatcher, WatchEvent};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

pub type Result<T> = std::result::Result<T, ModelError>;
