//! Face detection and recognition against the face catalog.
//!
//! Detection and embedding are external collaborators behind the
//! [`FaceDetector`] and [`FaceEmbedder`] traits; [`FaceRecognizer`] wires
//! them to an image file and a [`catalog::FaceDb`]. The `onnx` feature
//! provides an ONNX Runtime embedder.

use core_types::{EmbeddingModel, FaceBox, RgbFrame};

pub mod preprocess;
mod recognize;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use recognize::{Detection, FaceRecognizer, DETECT_LONGEST_SIDE};

#[derive(Debug, thiserror::Error)]
pub enum FaceRecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] metadata::MetadataError),

    #[error("model file not found: {0}")]
    ModelNotFound(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("embedding has {got} dimensions, model {model} expects {want}")]
    DimensionMismatch {
        model: EmbeddingModel,
        want: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, FaceRecError>;

/// Finds face bounding boxes in a frame.
pub trait FaceDetector {
    fn detect(&mut self, frame: &RgbFrame) -> Result<Vec<FaceBox>>;
}

/// Turns a square face patch into an embedding vector.
pub trait FaceEmbedder {
    fn model(&self) -> EmbeddingModel;

    /// Side length of the square input the embedder expects.
    fn target_size(&self) -> u32;

    /// `patch` is already resized and padded to `target_size`.
    fn embed(&mut self, patch: &RgbFrame) -> Result<Vec<f32>>;
}
