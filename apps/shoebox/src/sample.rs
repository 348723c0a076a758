//! Generated sample media for argument-less runs.
//!
//! Every binary falls back to this set when `--dir`/`--file` is omitted.
//! The files are materialized under the system temp directory on first
//! use; the photo carries a fixed capture time and GPS position so the
//! renamer and GPS views produce deterministic output.

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use image::{DynamicImage, Rgb, RgbImage};
use metadata::{ExifCodec, ExifMeta};

pub const PHOTO_FILENAME: &str = "sample.jpg";

/// The sample directory, created and populated on first call.
pub fn dir() -> anyhow::Result<PathBuf> {
    let dir = std::env::temp_dir().join("shoebox-sample");
    std::fs::create_dir_all(&dir)?;
    let photo = dir.join(PHOTO_FILENAME);
    if !photo.exists() {
        write_photo(&photo)?;
    }
    Ok(dir)
}

/// The sample photo, created on first call.
pub fn photo() -> anyhow::Result<PathBuf> {
    Ok(dir()?.join(PHOTO_FILENAME))
}

fn write_photo(path: &std::path::Path) -> anyhow::Result<()> {
    let img = RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, 128])
    });
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .context("encode sample photo")?;

    let mut meta = ExifMeta::default();
    let taken = NaiveDate::from_ymd_opt(2021, 9, 8)
        .and_then(|d| d.and_hms_opt(12, 27, 43))
        .context("sample timestamp")?;
    meta.set_datetime_original(&taken);
    meta.set_gps_coordinates(1.305141, 103.821869);
    std::fs::write(path, ExifCodec::splice(&jpeg, &meta)?)?;
    Ok(())
}
