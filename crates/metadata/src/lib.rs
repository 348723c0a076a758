//! EXIF read/write and the JSON sidecar-comment blob.
//!
//! Reading goes through kamadak-exif; writing rebuilds the APP1 payload with
//! `exif::experimental::Writer` and splices it back into the JPEG segment
//! stream.

use std::path::PathBuf;

use thiserror::Error;

pub mod codec;
pub mod datetime;
pub mod gps;
pub mod orientation;
pub mod segments;

pub use codec::{ExifCodec, ExifMeta};
pub use orientation::apply_orientation;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Not a JPEG file: {0}")]
    NotJpeg(PathBuf),

    #[error("Malformed JPEG segment stream")]
    MalformedJpeg,
}

pub type Result<T> = std::result::Result<T, MetadataError>;
