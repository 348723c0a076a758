use std::path::Path;

use catalog::FaceDb;
use core_types::{FaceBox, RgbFrame};
use image::DynamicImage;
use metadata::ExifCodec;
use tracing::debug;

use crate::preprocess::resize_pad;
use crate::{FaceDetector, FaceEmbedder, Result};

/// Detection runs on a copy scaled so its longest side is this.
pub const DETECT_LONGEST_SIDE: u32 = 800;

/// Name given to a face whose nearest known embedding is past the model
/// threshold, or when nothing is enrolled yet.
pub const UNKNOWN_NAME: &str = "unknown";

/// One recognized face, located in original-image coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    pub location: FaceBox,
    pub patch: RgbFrame,
    pub embedding: Vec<f32>,
    pub name: String,
}

pub struct FaceRecognizer {
    detector: Box<dyn FaceDetector>,
    embedder: Box<dyn FaceEmbedder>,
}

impl FaceRecognizer {
    pub fn new(detector: Box<dyn FaceDetector>, embedder: Box<dyn FaceEmbedder>) -> Self {
        Self { detector, embedder }
    }

    /// Detects and names every face in the image at `path`.
    ///
    /// Detection runs on a scaled copy (ratio r); boxes come back rescaled
    /// by 1/r and patches are re-cropped from the full-resolution image.
    /// Each embedding is matched to its Euclidean nearest neighbour among
    /// the catalog's embeddings for this model, `UNKNOWN_NAME` when the
    /// distance exceeds the model threshold or the catalog is empty.
    pub fn recognize(&mut self, path: &Path, db: &FaceDb) -> Result<Vec<Detection>> {
        let (img, _) = ExifCodec::load_oriented(path)?;
        let original = frame_from_image(&img);

        let longest = original.width.max(original.height).max(1);
        let r = f64::from(DETECT_LONGEST_SIDE) / f64::from(longest);
        let scaled = img.resize_exact(
            ((f64::from(original.width) * r).round() as u32).max(1),
            ((f64::from(original.height) * r).round() as u32).max(1),
            image::imageops::FilterType::Triangle,
        );
        let boxes = self.detector.detect(&frame_from_image(&scaled))?;
        debug!(path = %path.display(), faces = boxes.len(), ratio = r, "detected");

        let model = self.embedder.model();
        let (known_vectors, known_names) = db.embeddings(model);

        let mut detections = Vec::with_capacity(boxes.len());
        for scaled_box in boxes {
            let location = clamp_box(scaled_box.scale(1.0 / r), &original);
            if location.width() == 0 || location.height() == 0 {
                continue;
            }
            let patch = crop_frame(&original, &location);
            let prepared = resize_pad(&patch, self.embedder.target_size());
            let embedding = self.embedder.embed(&prepared)?;

            let name = nearest_name(&embedding, &known_vectors, &known_names)
                .filter(|(_, dist)| *dist <= f64::from(model.threshold()))
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());

            detections.push(Detection {
                location,
                patch,
                embedding,
                name,
            });
        }
        Ok(detections)
    }
}

fn nearest_name<'a>(
    embedding: &[f32],
    vectors: &[Vec<f32>],
    names: &'a [String],
) -> Option<(&'a str, f64)> {
    vectors
        .iter()
        .zip(names)
        .map(|(v, name)| (name.as_str(), euclidean(embedding, v)))
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(x - y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn frame_from_image(img: &DynamicImage) -> RgbFrame {
    let rgb = img.to_rgb8();
    RgbFrame::new(rgb.width(), rgb.height(), rgb.into_raw())
}

fn clamp_box(b: FaceBox, frame: &RgbFrame) -> FaceBox {
    FaceBox::new(
        b.top.clamp(0, i64::from(frame.height) - 1),
        b.right.clamp(0, i64::from(frame.width) - 1),
        b.bottom.clamp(0, i64::from(frame.height) - 1),
        b.left.clamp(0, i64::from(frame.width) - 1),
    )
}

fn crop_frame(frame: &RgbFrame, b: &FaceBox) -> RgbFrame {
    let (w, h) = (b.width() as u32 + 1, b.height() as u32 + 1);
    let mut out = RgbFrame::filled(w, h, [0, 0, 0]);
    for y in 0..h {
        for x in 0..w {
            out.set_pixel(
                x,
                y,
                frame.pixel(b.left as u32 + x, b.top as u32 + y),
            );
        }
    }
    out
}
