//! Video clip editing and playback over fully-decoded frame buffers.
//!
//! A [`Clip`] is a vector of RGB frames plus an optional PCM audio track.
//! [`ClipEditPipeline`] folds an ordered list of [`ClipAction`]s over a clip;
//! [`ClipPlayer`] presents a clip as a time-addressable frame source behind a
//! small state machine. Container I/O goes through the [`ClipCodec`] trait;
//! the `ffmpeg` feature provides the libav-backed implementation.

use std::path::PathBuf;

pub mod actions;
pub mod codec;
pub mod pipeline;
pub mod player;

mod clip;

pub use actions::ClipAction;
pub use clip::{AudioTrack, Clip};
pub use codec::ClipCodec;
#[cfg(feature = "ffmpeg")]
pub use codec::ffmpeg::FfmpegCodec;
pub use pipeline::{ApplyOutcome, ClipEditPipeline, RenderResult};
pub use player::{ClipPlayer, PlayerState};

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("clip has no frames")]
    Empty,

    #[error("destination equals the source file: {0}")]
    SameFile(PathBuf),

    #[error("player has no clip loaded")]
    Uninitialized,

    #[error("render worker disappeared")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, ClipError>;
