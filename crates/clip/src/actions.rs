//! Edit actions and their per-frame transforms.
//!
//! Actions are ordered and never commuted. Each variant knows how to fold a
//! later invocation of the same kind into itself (`fold`) and how to apply
//! itself to a whole clip (`apply`).

use std::path::PathBuf;

use core_types::RgbFrame;
use tracing::warn;

use crate::codec::ClipCodec;
use crate::{Clip, Result};

/// Brightness/contrast pivot used for video frames.
pub const LUM_CONTRAST_THRESHOLD: f64 = 128.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ClipAction {
    /// Rotation in degrees, counter-clockwise positive, multiples of 90.
    Rotate { angle: i32 },
    Flip { mirror_x: bool, mirror_y: bool },
    LumContrast { lum: i32, contrast: i32 },
    /// Temporal subclip. Indices are clamped; `stop_frame == -1` means "to end".
    Crop { start_frame: i64, stop_frame: i64 },
    /// Centered spatial crop to `width` x `height`, then integer upscale.
    Zoom { width: u32, height: u32 },
    Concat { path: PathBuf },
}

impl ClipAction {
    pub fn kind_matches(&self, other: &ClipAction) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Folds a repeated invocation into this action. Rotations accumulate,
    /// flips toggle, everything else takes the newer parameters. Concat is
    /// never folded (each invocation names a distinct file).
    pub fn fold(&mut self, newer: ClipAction) {
        match (self, newer) {
            (ClipAction::Rotate { angle }, ClipAction::Rotate { angle: more }) => {
                *angle += more;
            }
            (
                ClipAction::Flip { mirror_x, mirror_y },
                ClipAction::Flip {
                    mirror_x: fx,
                    mirror_y: fy,
                },
            ) => {
                *mirror_x ^= fx;
                *mirror_y ^= fy;
            }
            (current, newer) => *current = newer,
        }
    }

    pub fn apply(&self, clip: Clip, codec: &dyn ClipCodec) -> Result<Clip> {
        Ok(match self {
            ClipAction::Rotate { angle } => rotate_clip(clip, *angle),
            ClipAction::Flip { mirror_x, mirror_y } => flip_clip(clip, *mirror_x, *mirror_y),
            ClipAction::LumContrast { lum, contrast } => {
                map_frames(clip, |f| lum_contrast_frame(f, *lum, *contrast))
            }
            ClipAction::Crop {
                start_frame,
                stop_frame,
            } => crop_clip(clip, *start_frame, *stop_frame),
            ClipAction::Zoom { width, height } => zoom_clip(clip, *width, *height),
            ClipAction::Concat { path } => {
                let second = codec.open(path)?;
                concat_clips(clip, second)
            }
        })
    }
}

fn map_frames(mut clip: Clip, f: impl Fn(&RgbFrame) -> RgbFrame) -> Clip {
    clip.frames = clip.frames.iter().map(f).collect();
    clip
}

fn rotate_clip(clip: Clip, angle: i32) -> Clip {
    match angle.rem_euclid(360) {
        90 => map_frames(clip, rotate_ccw),
        180 => map_frames(clip, rotate_180),
        270 => map_frames(clip, rotate_cw),
        _ => clip,
    }
}

fn flip_clip(clip: Clip, mirror_x: bool, mirror_y: bool) -> Clip {
    match (mirror_x, mirror_y) {
        (false, false) => clip,
        (true, false) => map_frames(clip, flip_x),
        (false, true) => map_frames(clip, flip_y),
        (true, true) => map_frames(clip, rotate_180),
    }
}

fn crop_clip(mut clip: Clip, start_frame: i64, stop_frame: i64) -> Clip {
    let n = clip.frames.len() as i64;
    let start = start_frame.clamp(0, n);
    let stop = if stop_frame < 0 {
        n
    } else {
        stop_frame.clamp(start, n)
    };
    clip.frames = clip.frames[start as usize..stop as usize].to_vec();
    if let Some(track) = clip.audio.take() {
        let per_frame = track.samples_per_frame(clip.fps);
        let lo = (start as usize * per_frame).min(track.samples.len());
        let hi = (stop as usize * per_frame).min(track.samples.len());
        clip.audio = Some(crate::AudioTrack {
            samples: track.samples[lo..hi].to_vec(),
            ..track
        });
    }
    clip
}

fn zoom_clip(clip: Clip, width: u32, height: u32) -> Clip {
    let (orig_w, orig_h) = (clip.width(), clip.height());
    if width == 0 || height == 0 || orig_w == 0 {
        return clip;
    }
    let w = width.min(orig_w);
    let h = height.min(orig_h);
    let x0 = (orig_w - w) / 2;
    let y0 = (orig_h - h) / 2;
    // Largest integer factor whose output still fits the original frame.
    let factor = (orig_w / w).min(orig_h / h).max(1);
    map_frames(clip, |frame| {
        let cropped = crop_frame(frame, x0, y0, w, h);
        upscale_frame(&cropped, factor)
    })
}

/// Appends `second` after `first`, resizing and retiming it to the first
/// clip's resolution and fps.
fn concat_clips(mut first: Clip, second: Clip) -> Clip {
    if first.frames.is_empty() {
        return second;
    }
    let (tw, th, fps) = (first.width(), first.height(), first.fps);
    let retimed = if second.fps > 0.0 {
        (second.duration() * fps).round() as usize
    } else {
        0
    };
    for j in 0..retimed {
        let src = ((j as f64 * second.fps / fps) as usize).min(second.frames.len() - 1);
        first.frames.push(resize_frame(&second.frames[src], tw, th));
    }
    match (&mut first.audio, second.audio) {
        (Some(a), Some(b)) if a.sample_rate == b.sample_rate && a.channels == b.channels => {
            a.samples.extend_from_slice(&b.samples);
        }
        (Some(_), Some(_)) => {
            warn!("concat: audio formats differ, dropping appended track");
        }
        _ => {}
    }
    first
}

pub(crate) fn rotate_cw(src: &RgbFrame) -> RgbFrame {
    let mut dst = RgbFrame::filled(src.height, src.width, [0, 0, 0]);
    for y in 0..dst.height {
        for x in 0..dst.width {
            dst.set_pixel(x, y, src.pixel(y, src.height - 1 - x));
        }
    }
    dst
}

pub(crate) fn rotate_ccw(src: &RgbFrame) -> RgbFrame {
    let mut dst = RgbFrame::filled(src.height, src.width, [0, 0, 0]);
    for y in 0..dst.height {
        for x in 0..dst.width {
            dst.set_pixel(x, y, src.pixel(src.width - 1 - y, x));
        }
    }
    dst
}

pub(crate) fn rotate_180(src: &RgbFrame) -> RgbFrame {
    let mut dst = RgbFrame::filled(src.width, src.height, [0, 0, 0]);
    for y in 0..src.height {
        for x in 0..src.width {
            dst.set_pixel(src.width - 1 - x, src.height - 1 - y, src.pixel(x, y));
        }
    }
    dst
}

pub(crate) fn flip_x(src: &RgbFrame) -> RgbFrame {
    let mut dst = RgbFrame::filled(src.width, src.height, [0, 0, 0]);
    for y in 0..src.height {
        for x in 0..src.width {
            dst.set_pixel(src.width - 1 - x, y, src.pixel(x, y));
        }
    }
    dst
}

pub(crate) fn flip_y(src: &RgbFrame) -> RgbFrame {
    let mut dst = RgbFrame::filled(src.width, src.height, [0, 0, 0]);
    for y in 0..src.height {
        for x in 0..src.width {
            dst.set_pixel(x, src.height - 1 - y, src.pixel(x, y));
        }
    }
    dst
}

/// `f = 259(c+255) / (255(259-c))`, pivoting on [`LUM_CONTRAST_THRESHOLD`].
pub(crate) fn lum_contrast_frame(src: &RgbFrame, lum: i32, contrast: i32) -> RgbFrame {
    let c = f64::from(contrast.clamp(-255, 255));
    let f = 259.0 * (c + 255.0) / (255.0 * (259.0 - c));
    let lum = f64::from(lum.clamp(-255, 255));
    let mut dst = src.clone();
    for p in dst.data.iter_mut() {
        *p = (f * (f64::from(*p) - LUM_CONTRAST_THRESHOLD) + LUM_CONTRAST_THRESHOLD + lum)
            .clamp(0.0, 255.0) as u8;
    }
    dst
}

fn crop_frame(src: &RgbFrame, x0: u32, y0: u32, w: u32, h: u32) -> RgbFrame {
    let mut dst = RgbFrame::filled(w, h, [0, 0, 0]);
    for y in 0..h {
        for x in 0..w {
            dst.set_pixel(x, y, src.pixel(x0 + x, y0 + y));
        }
    }
    dst
}

fn upscale_frame(src: &RgbFrame, factor: u32) -> RgbFrame {
    if factor <= 1 {
        return src.clone();
    }
    let (w, h) = (src.width * factor, src.height * factor);
    let mut dst = RgbFrame::filled(w, h, [0, 0, 0]);
    for y in 0..h {
        for x in 0..w {
            dst.set_pixel(x, y, src.pixel(x / factor, y / factor));
        }
    }
    dst
}

pub(crate) fn resize_frame(src: &RgbFrame, w: u32, h: u32) -> RgbFrame {
    if src.width == w && src.height == h {
        return src.clone();
    }
    let mut dst = RgbFrame::filled(w, h, [0, 0, 0]);
    for y in 0..h {
        for x in 0..w {
            let sx = (u64::from(x) * u64::from(src.width) / u64::from(w)) as u32;
            let sy = (u64::from(y) * u64::from(src.height) / u64::from(h)) as u32;
            dst.set_pixel(x, y, src.pixel(sx, sy));
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::MemoryCodec;
    use crate::AudioTrack;

    fn numbered_clip(n: usize, fps: f64) -> Clip {
        Clip {
            frames: (0..n)
                .map(|i| RgbFrame::filled(4, 2, [i as u8, 0, 0]))
                .collect(),
            fps,
            audio: None,
        }
    }

    #[test]
    fn rotate_folds_cumulatively() {
        let mut action = ClipAction::Rotate { angle: 90 };
        action.fold(ClipAction::Rotate { angle: 90 });
        assert_eq!(action, ClipAction::Rotate { angle: 180 });
    }

    #[test]
    fn flip_folds_as_toggle() {
        let mut action = ClipAction::Flip {
            mirror_x: true,
            mirror_y: false,
        };
        action.fold(ClipAction::Flip {
            mirror_x: true,
            mirror_y: true,
        });
        assert_eq!(
            action,
            ClipAction::Flip {
                mirror_x: false,
                mirror_y: true,
            }
        );
    }

    #[test]
    fn full_turn_is_identity() {
        let codec = MemoryCodec::default();
        let clip = numbered_clip(3, 10.0);
        let turned = ClipAction::Rotate { angle: 360 }
            .apply(clip.clone(), &codec)
            .unwrap();
        assert_eq!(turned, clip);
    }

    #[test]
    fn rotate_quarter_swaps_dimensions() {
        let codec = MemoryCodec::default();
        let clip = numbered_clip(1, 10.0);
        let turned = ClipAction::Rotate { angle: 90 }
            .apply(clip, &codec)
            .unwrap();
        assert_eq!((turned.width(), turned.height()), (2, 4));
    }

    #[test]
    fn temporal_crop_clamps_and_trims_audio() {
        let codec = MemoryCodec::default();
        let mut clip = numbered_clip(10, 10.0);
        clip.audio = Some(AudioTrack {
            sample_rate: 100,
            channels: 1,
            samples: (0..100).collect(),
        });
        let cropped = ClipAction::Crop {
            start_frame: 2,
            stop_frame: 50,
        }
        .apply(clip, &codec)
        .unwrap();
        assert_eq!(cropped.frame_count(), 8);
        assert_eq!(cropped.frames[0].pixel(0, 0)[0], 2);
        assert_eq!(cropped.audio.unwrap().samples.len(), 80);
    }

    #[test]
    fn temporal_crop_stop_minus_one_runs_to_end() {
        let codec = MemoryCodec::default();
        let clip = numbered_clip(10, 10.0);
        let cropped = ClipAction::Crop {
            start_frame: 4,
            stop_frame: -1,
        }
        .apply(clip, &codec)
        .unwrap();
        assert_eq!(cropped.frame_count(), 6);
    }

    #[test]
    fn zoom_uses_largest_integer_factor() {
        let codec = MemoryCodec::default();
        let clip = Clip {
            frames: vec![RgbFrame::filled(12, 8, [5, 5, 5])],
            fps: 10.0,
            audio: None,
        };
        // 5x3 centered crop: fits 12/5 = 2 horizontally, 8/3 = 2 vertically.
        let zoomed = ClipAction::Zoom {
            width: 5,
            height: 3,
        }
        .apply(clip, &codec)
        .unwrap();
        assert_eq!((zoomed.width(), zoomed.height()), (10, 6));
    }

    #[test]
    fn concat_retimes_and_resizes_the_second_clip() {
        let codec = MemoryCodec::default();
        codec.insert(
            "second.mp4",
            Clip {
                frames: vec![RgbFrame::filled(8, 4, [9, 9, 9]); 5],
                fps: 5.0,
                audio: None,
            },
        );
        let first = numbered_clip(10, 10.0);
        let joined = ClipAction::Concat {
            path: "second.mp4".into(),
        }
        .apply(first, &codec)
        .unwrap();
        // 1 s at 5 fps becomes 10 frames at 10 fps, resized to 4x2.
        assert_eq!(joined.frame_count(), 20);
        assert!((joined.duration() - 2.0).abs() < 1e-9);
        assert_eq!(joined.frames[15].width, 4);
        assert_eq!(joined.frames[15].pixel(0, 0), [9, 9, 9]);
    }

    #[test]
    fn lum_contrast_zero_is_identity() {
        let frame = RgbFrame::filled(4, 4, [17, 130, 250]);
        assert_eq!(lum_contrast_frame(&frame, 0, 0), frame);
    }
}
