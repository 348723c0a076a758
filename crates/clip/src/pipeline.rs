//! Ordered action list over a source clip, with live preview and
//! off-thread rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use core_types::RgbFrame;
use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, warn};

use crate::actions::lum_contrast_frame;
use crate::codec::ClipCodec;
use crate::{Clip, ClipAction, ClipError, Result};

/// How long after the last slider tick the preview cache is rebuilt.
pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The invocation folded into the last action of the same kind.
    Folded,
    /// A new action was appended; transient UI controls should reset.
    NewAction,
}

#[derive(Debug)]
pub enum RenderResult {
    Done(PathBuf),
    Failed(String),
}

struct PreviewCache {
    base: Clip,
    /// False when `base` stops short of a trailing brightness/contrast
    /// action, which is then re-evaluated per frame.
    includes_last: bool,
    last_change: Instant,
}

pub struct ClipEditPipeline {
    source: PathBuf,
    original: Clip,
    actions: Vec<ClipAction>,
    codec: Arc<dyn ClipCodec>,
    cache: Option<PreviewCache>,
    debounce: Duration,
}

impl ClipEditPipeline {
    pub fn open(codec: Arc<dyn ClipCodec>, path: &Path) -> Result<Self> {
        let original = codec.open(path)?;
        debug!(path = %path.display(), frames = original.frame_count(), fps = original.fps, "clip opened");
        Ok(Self {
            source: path.to_path_buf(),
            original,
            actions: Vec::new(),
            codec,
            cache: None,
            debounce: PREVIEW_DEBOUNCE,
        })
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn original(&self) -> &Clip {
        &self.original
    }

    pub fn actions(&self) -> &[ClipAction] {
        &self.actions
    }

    /// Folds `action` into the last one when the kinds match, else appends.
    /// Actions are never reordered.
    pub fn apply(&mut self, action: ClipAction) -> ApplyOutcome {
        let concat = matches!(action, ClipAction::Concat { .. });
        match self.actions.last_mut() {
            Some(last) if last.kind_matches(&action) && !concat => {
                let slider = matches!(action, ClipAction::LumContrast { .. });
                last.fold(action);
                // A slider fold leaves the cached base valid; only the
                // per-frame transform parameters changed.
                match (&mut self.cache, slider) {
                    (Some(cache), true) if !cache.includes_last => {
                        cache.last_change = Instant::now();
                    }
                    _ => self.cache = None,
                }
                ApplyOutcome::Folded
            }
            _ => {
                self.actions.push(action);
                self.cache = None;
                ApplyOutcome::NewAction
            }
        }
    }

    /// Runs the whole pipeline over the original clip.
    pub fn rendered(&self) -> Result<Clip> {
        fold_actions(self.original.clone(), &self.actions, self.codec.as_ref())
    }

    /// Frame `i` of the edited clip, indices clamped to the last frame.
    ///
    /// When the trailing action is brightness/contrast, the frame comes from
    /// a cached run of the pipeline minus that action, and only the pure
    /// pixel transform is recomputed, so slider movement stays cheap. The
    /// cache is rebuilt once the slider has been idle past the debounce.
    pub fn preview_frame(&mut self, i: usize) -> Result<RgbFrame> {
        let trailing_slider = matches!(self.actions.last(), Some(ClipAction::LumContrast { .. }));

        let stale = match &self.cache {
            Some(cache) => {
                cache.includes_last == trailing_slider
                    || (!cache.includes_last && cache.last_change.elapsed() >= self.debounce)
            }
            None => true,
        };
        if stale {
            let upto = if trailing_slider {
                &self.actions[..self.actions.len() - 1]
            } else {
                &self.actions[..]
            };
            let base = fold_actions(self.original.clone(), upto, self.codec.as_ref())?;
            self.cache = Some(PreviewCache {
                base,
                includes_last: !trailing_slider,
                last_change: Instant::now(),
            });
        }

        let cache = self.cache.as_ref().expect("cache just ensured");
        let Some(frame) = cache
            .base
            .frames
            .get(i.min(cache.base.frames.len().saturating_sub(1)))
        else {
            return Err(ClipError::Empty);
        };
        Ok(match self.actions.last() {
            Some(ClipAction::LumContrast { lum, contrast }) => {
                lum_contrast_frame(frame, *lum, *contrast)
            }
            _ => frame.clone(),
        })
    }

    /// Renders the full pipeline to `dest` on a worker thread. The worker
    /// re-opens the source file itself and reports exactly one result on
    /// the returned channel. Partial output is removed on failure.
    pub fn render_to_file(&self, dest: &Path) -> Result<Receiver<RenderResult>> {
        if dest == self.source {
            return Err(ClipError::SameFile(dest.to_path_buf()));
        }
        let (tx, rx) = unbounded();
        let source = self.source.clone();
        let dest = dest.to_path_buf();
        let actions = self.actions.clone();
        let codec = Arc::clone(&self.codec);

        thread::spawn(move || {
            let outcome = codec
                .open(&source)
                .and_then(|clip| fold_actions(clip, &actions, codec.as_ref()))
                .and_then(|clip| codec.save(&clip, &dest));
            let result = match outcome {
                Ok(()) => RenderResult::Done(dest),
                Err(err) => {
                    warn!(dest = %dest.display(), error = %err, "render failed");
                    if dest.exists() {
                        if let Err(rm) = std::fs::remove_file(&dest) {
                            warn!(dest = %dest.display(), error = %rm, "could not remove partial output");
                        }
                    }
                    RenderResult::Failed(err.to_string())
                }
            };
            let _ = tx.send(result);
        });
        Ok(rx)
    }
}

fn fold_actions(clip: Clip, actions: &[ClipAction], codec: &dyn ClipCodec) -> Result<Clip> {
    actions
        .iter()
        .try_fold(clip, |clip, action| action.apply(clip, codec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::MemoryCodec;
    use std::time::Duration;

    fn seeded_codec(frames: usize, fps: f64) -> MemoryCodec {
        let codec = MemoryCodec::default();
        codec.insert(
            "src.mp4",
            Clip {
                frames: (0..frames)
                    .map(|i| RgbFrame::filled(4, 4, [i as u8, 0, 0]))
                    .collect(),
                fps,
                audio: None,
            },
        );
        codec
    }

    fn pipeline(codec: &MemoryCodec) -> ClipEditPipeline {
        ClipEditPipeline::open(Arc::new(codec.clone()), Path::new("src.mp4")).unwrap()
    }

    #[test]
    fn repeated_kind_folds_fresh_kind_appends() {
        let codec = seeded_codec(10, 10.0);
        let mut pipe = pipeline(&codec);
        assert_eq!(
            pipe.apply(ClipAction::Rotate { angle: 90 }),
            ApplyOutcome::NewAction
        );
        assert_eq!(
            pipe.apply(ClipAction::Rotate { angle: 90 }),
            ApplyOutcome::Folded
        );
        assert_eq!(
            pipe.apply(ClipAction::Flip {
                mirror_x: true,
                mirror_y: false,
            }),
            ApplyOutcome::NewAction
        );
        assert_eq!(pipe.actions().len(), 2);
        assert_eq!(pipe.actions()[0], ClipAction::Rotate { angle: 180 });
    }

    #[test]
    fn concat_never_folds() {
        let codec = seeded_codec(10, 10.0);
        codec.insert(
            "a.mp4",
            Clip {
                frames: vec![RgbFrame::filled(4, 4, [1, 1, 1])],
                fps: 10.0,
                audio: None,
            },
        );
        let mut pipe = pipeline(&codec);
        pipe.apply(ClipAction::Concat { path: "a.mp4".into() });
        assert_eq!(
            pipe.apply(ClipAction::Concat { path: "a.mp4".into() }),
            ApplyOutcome::NewAction
        );
        assert_eq!(pipe.actions().len(), 2);
    }

    #[test]
    fn slider_preview_reads_the_cached_base() {
        let codec = seeded_codec(10, 10.0);
        let mut pipe = pipeline(&codec);
        pipe.apply(ClipAction::LumContrast {
            lum: 40,
            contrast: 0,
        });
        let once = pipe.preview_frame(3).unwrap();
        // A second slider tick with the same values folds and must not stack.
        pipe.apply(ClipAction::LumContrast {
            lum: 40,
            contrast: 0,
        });
        let twice = pipe.preview_frame(3).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.pixel(0, 0)[0], 43);
    }

    #[test]
    fn debounce_rebuilds_but_preserves_pixels() {
        let codec = seeded_codec(4, 10.0);
        let mut pipe = pipeline(&codec).with_debounce(Duration::from_millis(10));
        pipe.apply(ClipAction::LumContrast {
            lum: 10,
            contrast: 0,
        });
        let before = pipe.preview_frame(0).unwrap();
        std::thread::sleep(Duration::from_millis(25));
        let after = pipe.preview_frame(0).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn render_rejects_destination_equal_to_source() {
        let codec = seeded_codec(4, 10.0);
        let pipe = pipeline(&codec);
        assert!(matches!(
            pipe.render_to_file(Path::new("src.mp4")),
            Err(ClipError::SameFile(_))
        ));
    }

    #[test]
    fn render_reports_worker_errors() {
        let codec = seeded_codec(4, 10.0);
        let pipe = pipeline(&codec);
        codec.set_fail_saves(true);
        let rx = pipe.render_to_file(Path::new("out.mp4")).unwrap();
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, RenderResult::Failed(_)));
    }

    #[test]
    fn temporal_crop_renders_to_expected_duration() {
        let fps = 30.0;
        let codec = seeded_codec(60, fps);
        let mut pipe = pipeline(&codec);
        let stop = (1.1 * fps).round() as i64;
        pipe.apply(ClipAction::Crop {
            start_frame: 0,
            stop_frame: stop,
        });

        let rx = pipe.render_to_file(Path::new("out.mp4")).unwrap();
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            RenderResult::Done(path) => assert_eq!(path, PathBuf::from("out.mp4")),
            RenderResult::Failed(err) => panic!("render failed: {err}"),
        }

        let rendered = codec.get("out.mp4").unwrap();
        assert_eq!(rendered.fps, fps);
        assert!((rendered.duration() - 1.1).abs() <= 2.0 / fps);
    }
}
