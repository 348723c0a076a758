//! Stateful still-image editing.
//!
//! The pipeline holds three buffers: the image being displayed, the image as
//! of the last committed action, and the untouched original. Structural
//! operations (rotate, flip, crop, color conversion) advance both working
//! buffers; the brightness/contrast preview recomputes the displayed image
//! from the committed one on every call, so slider movement never compounds
//! rounding error.

use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use metadata::{ExifCodec, ExifMeta};
use tracing::debug;

pub const JPEG_QUALITY: u8 = 95;

const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] metadata::MetadataError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Crop rectangle in the coordinate space of the display widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct ImageEditPipeline {
    current: DynamicImage,
    previous: DynamicImage,
    original: DynamicImage,
    meta: ExifMeta,
    source: PathBuf,
}

impl ImageEditPipeline {
    /// Loads `path` with its EXIF orientation applied and consumed.
    pub fn open(path: &Path) -> Result<Self> {
        let (img, meta) = ExifCodec::load_oriented(path)?;
        debug!(path = %path.display(), width = img.width(), height = img.height(), "opened");
        Ok(Self {
            previous: img.clone(),
            original: img.clone(),
            current: img,
            meta,
            source: path.to_path_buf(),
        })
    }

    /// Builds a pipeline over an in-memory image, with no backing file.
    pub fn from_image(img: DynamicImage) -> Self {
        Self {
            previous: img.clone(),
            original: img.clone(),
            current: img,
            meta: ExifMeta::default(),
            source: PathBuf::new(),
        }
    }

    pub fn current(&self) -> &DynamicImage {
        &self.current
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn advance(&mut self, img: DynamicImage) {
        self.previous = img.clone();
        self.current = img;
    }

    pub fn rotate90_cw(&mut self) {
        self.advance(self.current.rotate90());
    }

    pub fn rotate90_ccw(&mut self) {
        self.advance(self.current.rotate270());
    }

    pub fn flip_horizontal(&mut self) {
        self.advance(self.current.fliph());
    }

    pub fn flip_vertical(&mut self) {
        self.advance(self.current.flipv());
    }

    /// Crops to `rect`, given in widget coordinates; the rectangle is
    /// rescaled by (image size / widget size) before being applied.
    pub fn crop(&mut self, rect: CropRect, widget_width: u32, widget_height: u32) {
        if widget_width == 0 || widget_height == 0 || rect.width == 0 || rect.height == 0 {
            return;
        }
        let sx = f64::from(self.current.width()) / f64::from(widget_width);
        let sy = f64::from(self.current.height()) / f64::from(widget_height);
        let x = ((f64::from(rect.x) * sx) as u32).min(self.current.width().saturating_sub(1));
        let y = ((f64::from(rect.y) * sy) as u32).min(self.current.height().saturating_sub(1));
        let w = ((f64::from(rect.width) * sx) as u32)
            .max(1)
            .min(self.current.width() - x);
        let h = ((f64::from(rect.height) * sy) as u32)
            .max(1)
            .min(self.current.height() - y);
        self.advance(self.current.crop_imm(x, y, w, h));
    }

    pub fn to_gray(&mut self) {
        self.advance(DynamicImage::ImageLuma8(self.current.to_luma8()));
    }

    pub fn to_rgb(&mut self) {
        self.advance(DynamicImage::ImageRgb8(self.current.to_rgb8()));
    }

    pub fn to_sepia(&mut self) {
        let mut img = self.current.to_rgb8();
        for px in img.pixels_mut() {
            let [r, g, b] = px.0.map(f32::from);
            px.0 = SEPIA.map(|row| {
                (row[0] * r + row[1] * g + row[2] * b).clamp(0.0, 255.0) as u8
            });
        }
        self.advance(DynamicImage::ImageRgb8(img));
    }

    /// Reassigns each pixel's hue from its own hue. Identity today; this is
    /// the seam where hue rotation would plug in.
    pub fn set_hue(&mut self) {
        self.advance(self.current.clone());
    }

    /// Brightness/contrast preview. Reads the last committed image, so
    /// repeated slider moves never stack.
    pub fn set_lum_contrast(&mut self, lum: i32, contrast: i32) {
        self.current = apply_lum_contrast(&self.previous, lum, contrast);
    }

    /// Accepts the displayed image as the new baseline.
    pub fn commit(&mut self) {
        self.previous = self.current.clone();
    }

    /// Restores the original image.
    pub fn revert(&mut self) {
        self.current = self.original.clone();
        self.previous = self.original.clone();
    }

    /// Encodes the displayed image as JPEG and carries the source metadata
    /// over, minus the thumbnail IFD. The in-memory buffers are untouched.
    pub fn save(&self, dest: &Path) -> Result<()> {
        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
        self.current.to_rgb8().write_with_encoder(encoder)?;

        let mut meta = self.meta.clone();
        meta.remove_thumbnail_section();
        let out = if meta.is_empty() {
            jpeg
        } else {
            ExifCodec::splice(&jpeg, &meta)?
        };
        std::fs::write(dest, out)?;
        debug!(dest = %dest.display(), "saved");
        Ok(())
    }
}

/// `f = 259(c+255) / (255(259-c))`, then `clamp(f·(p-128) + 128 + lum)`
/// per channel.
pub fn apply_lum_contrast(img: &DynamicImage, lum: i32, contrast: i32) -> DynamicImage {
    let c = f64::from(contrast.clamp(-255, 255));
    let f = 259.0 * (c + 255.0) / (255.0 * (259.0 - c));
    let lum = f64::from(lum.clamp(-255, 255));
    let mut out = img.to_rgb8();
    for px in out.pixels_mut() {
        px.0 = px
            .0
            .map(|p| (f * (f64::from(p) - 128.0) + 128.0 + lum).clamp(0.0, 255.0) as u8);
    }
    DynamicImage::ImageRgb8(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn identity_sequence_is_pointwise_identical() {
        let img = gradient(20, 14);
        let mut pipe = ImageEditPipeline::from_image(img.clone());
        pipe.rotate90_cw();
        pipe.rotate90_cw();
        pipe.rotate90_cw();
        pipe.rotate90_cw();
        pipe.flip_horizontal();
        pipe.flip_horizontal();
        pipe.flip_vertical();
        pipe.flip_vertical();
        pipe.to_rgb();
        pipe.set_hue();
        assert_eq!(pipe.current().to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn zero_lum_contrast_is_identity() {
        let img = gradient(16, 16);
        let mut pipe = ImageEditPipeline::from_image(img.clone());
        pipe.set_lum_contrast(0, 0);
        assert_eq!(pipe.current().to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn slider_moves_do_not_stack() {
        let img = gradient(16, 16);
        let mut pipe = ImageEditPipeline::from_image(img.clone());
        pipe.set_lum_contrast(40, 0);
        pipe.set_lum_contrast(40, 0);
        let double_moved = pipe.current().to_rgb8();
        assert_eq!(double_moved, apply_lum_contrast(&img, 40, 0).to_rgb8());
    }

    #[test]
    fn commit_rebases_the_preview() {
        let img = gradient(16, 16);
        let mut pipe = ImageEditPipeline::from_image(img.clone());
        pipe.set_lum_contrast(40, 0);
        pipe.commit();
        pipe.set_lum_contrast(0, 0);
        let rebased = apply_lum_contrast(&img, 40, 0).to_rgb8();
        assert_eq!(pipe.current().to_rgb8(), rebased);
    }

    #[test]
    fn crop_rescales_from_widget_coordinates() {
        let img = gradient(200, 100);
        let mut pipe = ImageEditPipeline::from_image(img);
        // Half-size widget: a 50x25 rect maps onto 100x50 pixels.
        pipe.crop(
            CropRect {
                x: 10,
                y: 5,
                width: 50,
                height: 25,
            },
            100,
            50,
        );
        assert_eq!(pipe.current().width(), 100);
        assert_eq!(pipe.current().height(), 50);
    }

    #[test]
    fn revert_restores_the_original() {
        let img = gradient(16, 16);
        let mut pipe = ImageEditPipeline::from_image(img.clone());
        pipe.rotate90_cw();
        pipe.to_gray();
        pipe.set_lum_contrast(120, -80);
        pipe.revert();
        assert_eq!(pipe.current().to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn sepia_matches_the_matrix() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([100, 150, 200])));
        let mut pipe = ImageEditPipeline::from_image(img);
        pipe.to_sepia();
        let px = pipe.current().to_rgb8().get_pixel(0, 0).0;
        let expect = |row: [f32; 3]| {
            (row[0] * 100.0 + row[1] * 150.0 + row[2] * 200.0).clamp(0.0, 255.0) as u8
        };
        assert_eq!(px, [expect(SEPIA[0]), expect(SEPIA[1]), expect(SEPIA[2])]);
    }

    #[test]
    fn save_strips_thumbnail_and_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        gradient(32, 24).to_rgb8().save(&src).unwrap();

        let pipe = ImageEditPipeline::open(&src).unwrap();
        let dest = dir.path().join("out.jpg");
        pipe.save(&dest).unwrap();

        let out = image::open(&dest).unwrap();
        assert_eq!((out.width(), out.height()), (32, 24));
        // Source bytes are untouched by a save elsewhere.
        assert_eq!(pipe.current().width(), 32);
    }
}
