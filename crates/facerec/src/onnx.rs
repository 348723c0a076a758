//! ONNX Runtime embedder backend.

use std::path::Path;

use core_types::{EmbeddingModel, RgbFrame};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use tracing::info;

use crate::{FaceEmbedder, FaceRecError, Result};

pub struct OnnxEmbedder {
    session: Session,
    model: EmbeddingModel,
    input_size: u32,
}

impl OnnxEmbedder {
    /// Loads the ONNX model for `model` from `model_path`.
    pub fn load(model_path: &Path, model: EmbeddingModel, input_size: u32) -> Result<Self> {
        if !model_path.exists() {
            return Err(FaceRecError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| FaceRecError::Inference(e.to_string()))?;

        info!(
            path = %model_path.display(),
            model = %model,
            inputs = ?session.inputs().iter().map(|i| i.name().to_string()).collect::<Vec<_>>(),
            "loaded embedding model"
        );
        Ok(Self {
            session,
            model,
            input_size,
        })
    }

    /// NCHW tensor with channels in `[0, 1]`.
    fn to_tensor(&self, patch: &RgbFrame) -> Array4<f32> {
        let size = self.input_size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for y in 0..size.min(patch.height as usize) {
            for x in 0..size.min(patch.width as usize) {
                let rgb = patch.pixel(x as u32, y as u32);
                for c in 0..3 {
                    tensor[[0, c, y, x]] = f32::from(rgb[c]) / 255.0;
                }
            }
        }
        tensor
    }
}

impl FaceEmbedder for OnnxEmbedder {
    fn model(&self) -> EmbeddingModel {
        self.model
    }

    fn target_size(&self) -> u32 {
        self.input_size
    }

    fn embed(&mut self, patch: &RgbFrame) -> Result<Vec<f32>> {
        let input = self.to_tensor(patch);
        let outputs = self
            .session
            .run(
                ort::inputs![TensorRef::from_array_view(input.view())
                    .map_err(|e| FaceRecError::Inference(e.to_string()))?],
            )
            .map_err(|e| FaceRecError::Inference(e.to_string()))?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceRecError::Inference(e.to_string()))?;
        let raw: Vec<f32> = raw.to_vec();

        if raw.len() != self.model.dim() {
            return Err(FaceRecError::DimensionMismatch {
                model: self.model,
                want: self.model.dim(),
                got: raw.len(),
            });
        }

        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        Ok(if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw
        })
    }
}
