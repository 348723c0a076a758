use std::ffi::OsStr;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod comment;
pub mod embedding;
pub mod geometry;

pub use comment::{Entity, UserComment};
pub use embedding::EmbeddingModel;
pub use geometry::FaceBox;

/// Semantic kind inferred from a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    PhotoJpg,
    PhotoHeif,
    PhotoOther,
    Video,
    NonMedia,
}

impl MediaKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn of(path: &Path) -> Self {
        let ext = match path.extension().and_then(OsStr::to_str) {
            Some(e) => e.to_ascii_lowercase(),
            None => return MediaKind::NonMedia,
        };
        match ext.as_str() {
            "jpg" | "jpeg" => MediaKind::PhotoJpg,
            "heic" => MediaKind::PhotoHeif,
            "png" | "bmp" => MediaKind::PhotoOther,
            "avi" | "mts" | "mp4" | "mov" | "wmv" => MediaKind::Video,
            _ => MediaKind::NonMedia,
        }
    }

    /// Photos of any flavor.
    pub fn is_photo(self) -> bool {
        matches!(
            self,
            MediaKind::PhotoJpg | MediaKind::PhotoHeif | MediaKind::PhotoOther
        )
    }

    /// The subset the model lists: every photo class plus video.
    pub fn is_listed(self) -> bool {
        self.is_photo() || self == MediaKind::Video
    }

    /// First-class media for navigation and comments: photo-jpg ∪ video.
    pub fn is_media(self) -> bool {
        matches!(self, MediaKind::PhotoJpg | MediaKind::Video)
    }
}

/// An RGB8 row-major frame shared by the clip and face-recognition paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// A uniformly colored frame, handy for fixtures.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = ((y * self.width + x) * 3) as usize;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}
