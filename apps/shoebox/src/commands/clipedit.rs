//! Headless clip editor: apply actions and render off-thread.

use std::path::PathBuf;

use clap::Args;

#[derive(Args, Debug)]
pub struct ClipeditArgs {
    /// Source clip; defaults to a generated sample clip.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Destination file; must differ from the source. Defaults to
    /// `rendered.mp4` next to the sample clip.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Rotation in degrees, counter-clockwise positive, multiple of 90.
    #[arg(long)]
    pub rotate: Option<i32>,

    #[arg(long)]
    pub flip_x: bool,

    #[arg(long)]
    pub flip_y: bool,

    /// Brightness in [-255, 255].
    #[arg(long, default_value_t = 0)]
    pub lum: i32,

    /// Contrast in [-255, 255].
    #[arg(long, default_value_t = 0)]
    pub contrast: i32,

    /// Temporal crop as `start:stop` frame indices; `stop = -1` means end.
    #[arg(long)]
    pub crop: Option<String>,

    /// Centered zoom as `WIDTHxHEIGHT`.
    #[arg(long)]
    pub zoom: Option<String>,

    /// Append another clip.
    #[arg(long)]
    pub concat: Option<PathBuf>,
}

#[cfg(feature = "ffmpeg")]
pub fn run(args: &ClipeditArgs) -> anyhow::Result<()> {
    use std::sync::Arc;

    use clip::{ClipAction, ClipEditPipeline, FfmpegCodec, RenderResult};
    use tracing::info;

    let codec = Arc::new(FfmpegCodec::new()?);
    let file = match &args.file {
        Some(file) => file.clone(),
        None => sample_clip_path(codec.as_ref())?,
    };
    let out = match &args.out {
        Some(out) => out.clone(),
        None => crate::sample::dir()?.join("rendered.mp4"),
    };
    let mut pipeline = ClipEditPipeline::open(codec, &file)?;

    if let Some(angle) = args.rotate {
        pipeline.apply(ClipAction::Rotate { angle });
    }
    if args.flip_x || args.flip_y {
        pipeline.apply(ClipAction::Flip {
            mirror_x: args.flip_x,
            mirror_y: args.flip_y,
        });
    }
    if let Some(spec) = &args.crop {
        let (start_frame, stop_frame) = parse_crop(spec)?;
        pipeline.apply(ClipAction::Crop {
            start_frame,
            stop_frame,
        });
    }
    if let Some(spec) = &args.zoom {
        let (width, height) = parse_zoom(spec)?;
        pipeline.apply(ClipAction::Zoom { width, height });
    }
    if let Some(path) = &args.concat {
        pipeline.apply(ClipAction::Concat { path: path.clone() });
    }
    if args.lum != 0 || args.contrast != 0 {
        pipeline.apply(ClipAction::LumContrast {
            lum: args.lum,
            contrast: args.contrast,
        });
    }

    let progress = pipeline.render_to_file(&out)?;
    match progress.recv()? {
        RenderResult::Done(path) => {
            info!(out = %path.display(), "clip rendered");
            Ok(())
        }
        RenderResult::Failed(message) => anyhow::bail!("render failed: {message}"),
    }
}

#[cfg(not(feature = "ffmpeg"))]
pub fn run(_args: &ClipeditArgs) -> anyhow::Result<()> {
    anyhow::bail!("this build has no video support; rebuild with --features ffmpeg")
}

/// Generated sample clip: a bar sweeping over a flat background.
#[cfg(feature = "ffmpeg")]
fn sample_clip_path(codec: &clip::FfmpegCodec) -> anyhow::Result<std::path::PathBuf> {
    use clip::{Clip, ClipCodec};
    use core_types::RgbFrame;

    let path = crate::sample::dir()?.join("sample.mp4");
    if path.exists() {
        return Ok(path);
    }
    let (w, h, fps) = (64u32, 48u32, 12.0);
    let frames = (0..24u32)
        .map(|i| {
            let mut frame = RgbFrame::filled(w, h, [16, 16, 64]);
            let bar = i * w / 24;
            for y in 0..h {
                frame.set_pixel(bar, y, [240, 240, 240]);
            }
            frame
        })
        .collect();
    let clip = Clip {
        frames,
        fps,
        audio: None,
    };
    codec.save(&clip, &path)?;
    Ok(path)
}

#[cfg(feature = "ffmpeg")]
fn parse_crop(spec: &str) -> anyhow::Result<(i64, i64)> {
    match spec.split_once(':') {
        Some((start, stop)) => Ok((start.trim().parse()?, stop.trim().parse()?)),
        None => anyhow::bail!("crop must be start:stop, got {spec:?}"),
    }
}

#[cfg(feature = "ffmpeg")]
fn parse_zoom(spec: &str) -> anyhow::Result<(u32, u32)> {
    match spec.split_once('x') {
        Some((w, h)) => Ok((w.trim().parse()?, h.trim().parse()?)),
        None => anyhow::bail!("zoom must be WIDTHxHEIGHT, got {spec:?}"),
    }
}
