//! Headless image editor: apply actions from flags and save.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use engine::{CropRect, ImageEditPipeline};
use tracing::info;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Rotation {
    Cw,
    Ccw,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

#[derive(Args, Debug)]
pub struct ImgeditArgs {
    /// Source image; defaults to the generated sample photo.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Destination file; the source is never overwritten in place.
    /// Defaults to `edited.jpg` next to the sample photo.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub rotate: Option<Rotation>,

    #[arg(long)]
    pub flip: Option<FlipAxis>,

    /// Crop in image coordinates, as `x,y,width,height`.
    #[arg(long)]
    pub crop: Option<String>,

    #[arg(long)]
    pub gray: bool,

    #[arg(long)]
    pub sepia: bool,

    /// Brightness in [-255, 255].
    #[arg(long, default_value_t = 0)]
    pub lum: i32,

    /// Contrast in [-255, 255].
    #[arg(long, default_value_t = 0)]
    pub contrast: i32,
}

pub fn run(args: &ImgeditArgs) -> anyhow::Result<()> {
    let file = match &args.file {
        Some(file) => file.clone(),
        None => crate::sample::photo()?,
    };
    let out = match &args.out {
        Some(out) => out.clone(),
        None => crate::sample::dir()?.join("edited.jpg"),
    };
    anyhow::ensure!(file != out, "destination must differ from the source");
    let mut pipeline = ImageEditPipeline::open(&file)?;

    match args.rotate {
        Some(Rotation::Cw) => pipeline.rotate90_cw(),
        Some(Rotation::Ccw) => pipeline.rotate90_ccw(),
        None => {}
    }
    match args.flip {
        Some(FlipAxis::Horizontal) => pipeline.flip_horizontal(),
        Some(FlipAxis::Vertical) => pipeline.flip_vertical(),
        None => {}
    }
    if let Some(spec) = &args.crop {
        let rect = parse_crop(spec)?;
        // Widget dimensions equal to the image make the rect 1:1.
        let (w, h) = (pipeline.current().width(), pipeline.current().height());
        pipeline.crop(rect, w, h);
    }
    if args.gray {
        pipeline.to_gray();
    }
    if args.sepia {
        pipeline.to_sepia();
    }
    if args.lum != 0 || args.contrast != 0 {
        pipeline.set_lum_contrast(args.lum, args.contrast);
        pipeline.commit();
    }

    pipeline.save(&out)?;
    info!(out = %out.display(), "image saved");
    Ok(())
}

fn parse_crop(spec: &str) -> anyhow::Result<CropRect> {
    let parts: Vec<u32> = spec
        .split(',')
        .map(|p| p.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| anyhow::anyhow!("crop must be x,y,width,height, got {spec:?}"))?;
    let &[x, y, width, height] = parts.as_slice() else {
        anyhow::bail!("crop must have four components, got {spec:?}");
    };
    Ok(CropRect {
        x,
        y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_spec_parses() {
        let rect = parse_crop("1, 2, 30, 40").unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (1, 2, 30, 40));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }
}
