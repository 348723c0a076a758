//! Time-addressable clip playback.
//!
//! The player owns an interval-summing clock: accumulated time from past
//! play intervals plus the wall-clock elapsed of the current one. Pausing
//! commits the running interval and discards the wall-clock reference, so
//! the clock never moves backwards across pause/resume.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use core_types::RgbFrame;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use tracing::debug;

use crate::{Clip, ClipError, Result};

/// Decoders misbehave at exactly zero; every seek lands at or after this.
pub const MIN_SEEK_SECS: f64 = 0.5;

/// Audio chunks queued ahead of the consumer.
const AUDIO_QUEUE_DEPTH: usize = 3;

const AUDIO_SEND_RETRY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Uninitialized,
    Stopped,
    Playing,
    Paused,
    Eos,
}

#[derive(Default)]
struct Clock {
    accumulated: f64,
    started_at: Option<Instant>,
}

impl Clock {
    fn time(&self) -> f64 {
        self.accumulated
            + self
                .started_at
                .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += started.elapsed().as_secs_f64();
        }
    }

    fn set(&mut self, t: f64) {
        self.accumulated = t;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }
}

type FrameCallback = Box<dyn Fn(usize, &RgbFrame) + Send + Sync>;

struct Inner {
    clip: Option<Arc<Clip>>,
    state: PlayerState,
    clock: Clock,
    looping: bool,
    loop_count: u32,
    next_audio_frame: usize,
    audio_tx: Option<Sender<Vec<i16>>>,
    frame_cb: Option<Arc<FrameCallback>>,
    render_running: bool,
    audio_running: bool,
}

pub struct ClipPlayer {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ClipPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipPlayer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                clip: None,
                state: PlayerState::Uninitialized,
                clock: Clock::default(),
                looping: false,
                loop_count: 0,
                next_audio_frame: 0,
                audio_tx: None,
                frame_cb: None,
                render_running: false,
                audio_running: false,
            })),
        }
    }

    pub fn set_clip(&self, clip: Clip) {
        let mut inner = self.lock();
        inner.clip = Some(Arc::new(clip));
        inner.state = PlayerState::Stopped;
        inner.clock = Clock::default();
        inner.loop_count = 0;
        inner.next_audio_frame = 0;
    }

    pub fn state(&self) -> PlayerState {
        self.lock().state
    }

    pub fn time(&self) -> f64 {
        self.lock().clock.time()
    }

    pub fn current_frame(&self) -> usize {
        let inner = self.lock();
        let fps = inner.clip.as_ref().map_or(0.0, |c| c.fps);
        (fps * inner.clock.time()).floor().max(0.0) as usize
    }

    pub fn loop_count(&self) -> u32 {
        self.lock().loop_count
    }

    pub fn set_looping(&self, looping: bool) {
        self.lock().looping = looping;
    }

    /// Called from the render thread with each new frame index.
    pub fn set_frame_callback(&self, cb: impl Fn(usize, &RgbFrame) + Send + Sync + 'static) {
        self.lock().frame_cb = Some(Arc::new(Box::new(cb)));
    }

    /// Opens the bounded audio queue. Chunks are one video frame's worth of
    /// interleaved samples; the feeding thread starts with playback.
    pub fn enable_audio(&self) -> Result<Receiver<Vec<i16>>> {
        let mut inner = self.lock();
        if inner.clip.is_none() {
            return Err(ClipError::Uninitialized);
        }
        let (tx, rx) = bounded(AUDIO_QUEUE_DEPTH);
        inner.audio_tx = Some(tx);
        Ok(rx)
    }

    pub fn play(&self) -> Result<()> {
        let mut inner = self.lock();
        let Some(clip) = inner.clip.clone() else {
            return Err(ClipError::Uninitialized);
        };
        match inner.state {
            PlayerState::Playing => return Ok(()),
            PlayerState::Eos => {
                inner.clock = Clock::default();
                inner.next_audio_frame = 0;
            }
            _ => {}
        }
        inner.state = PlayerState::Playing;
        inner.clock.start();

        if !inner.render_running {
            inner.render_running = true;
            let shared = Arc::clone(&self.inner);
            let clip_for_render = Arc::clone(&clip);
            thread::spawn(move || render_loop(shared, clip_for_render));
        }
        if inner.audio_tx.is_some() && !inner.audio_running && clip.audio.is_some() {
            inner.audio_running = true;
            let shared = Arc::clone(&self.inner);
            thread::spawn(move || audio_loop(shared, clip));
        }
        Ok(())
    }

    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.state == PlayerState::Playing {
            inner.clock.pause();
            inner.state = PlayerState::Paused;
        }
    }

    /// Stops playback and rewinds. Also the way out of EOS.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.state == PlayerState::Uninitialized {
            return;
        }
        inner.state = PlayerState::Stopped;
        inner.clock = Clock::default();
        inner.next_audio_frame = 0;
    }

    /// Seeks to `secs`, clamped to `[MIN_SEEK_SECS, duration]`. Valid in
    /// any state with a clip loaded; recomputes pending audio chunks.
    pub fn seek(&self, secs: f64) -> Result<()> {
        let mut inner = self.lock();
        let Some(clip) = inner.clip.clone() else {
            return Err(ClipError::Uninitialized);
        };
        let target = secs.max(MIN_SEEK_SECS).min(clip.duration().max(MIN_SEEK_SECS));
        inner.clock.set(target);
        inner.next_audio_frame = (clip.fps * target).floor().max(0.0) as usize;
        debug!(target, frame = inner.next_audio_frame, "seek");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("player mutex poisoned")
    }
}

fn render_loop(shared: Arc<Mutex<Inner>>, clip: Arc<Clip>) {
    let duration = clip.duration();
    let poll = Duration::from_secs_f64(1.0 / clip.fps.max(1.0));
    let mut last_rendered: Option<usize> = None;
    let mut first = true;

    loop {
        if !first {
            thread::sleep(poll);
        }
        first = false;

        let (idx, cb) = {
            let mut inner = shared.lock().expect("player mutex poisoned");
            match inner.state {
                PlayerState::Playing => {}
                PlayerState::Paused => continue,
                _ => {
                    inner.render_running = false;
                    return;
                }
            }
            if inner.clock.time() >= duration {
                if inner.looping {
                    inner.clock.set(MIN_SEEK_SECS);
                    inner.loop_count += 1;
                    inner.next_audio_frame =
                        (clip.fps * MIN_SEEK_SECS).floor().max(0.0) as usize;
                } else {
                    inner.state = PlayerState::Eos;
                    inner.clock.pause();
                    inner.render_running = false;
                    return;
                }
            }
            let idx = ((clip.fps * inner.clock.time()).floor().max(0.0) as usize)
                .min(clip.frames.len().saturating_sub(1));
            (idx, inner.frame_cb.clone())
        };

        if last_rendered != Some(idx) {
            last_rendered = Some(idx);
            if let Some(cb) = cb {
                cb(idx, &clip.frames[idx]);
            }
        }
    }
}

fn audio_loop(shared: Arc<Mutex<Inner>>, clip: Arc<Clip>) {
    let track = clip.audio.as_ref().expect("audio thread implies track");

    loop {
        let (mut chunk, tx) = {
            let mut inner = shared.lock().expect("player mutex poisoned");
            match inner.state {
                PlayerState::Playing => {}
                PlayerState::Paused => {
                    drop(inner);
                    thread::sleep(AUDIO_SEND_RETRY);
                    continue;
                }
                _ => {
                    inner.audio_running = false;
                    return;
                }
            }
            let Some(tx) = inner.audio_tx.clone() else {
                inner.audio_running = false;
                return;
            };
            let chunk = track.chunk_for_frame(inner.next_audio_frame, clip.fps);
            if chunk.is_empty() {
                inner.audio_running = false;
                return;
            }
            inner.next_audio_frame += 1;
            (chunk.to_vec(), tx)
        };

        // Full queue: retry in short slices so state changes interleave.
        loop {
            match tx.send_timeout(chunk, AUDIO_SEND_RETRY) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(back)) => {
                    chunk = back;
                    let mut inner = shared.lock().expect("player mutex poisoned");
                    if !matches!(inner.state, PlayerState::Playing | PlayerState::Paused) {
                        inner.audio_running = false;
                        return;
                    }
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    shared.lock().expect("player mutex poisoned").audio_running = false;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioTrack;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clip(frames: usize, fps: f64) -> Clip {
        Clip {
            frames: (0..frames)
                .map(|i| RgbFrame::filled(2, 2, [i as u8, 0, 0]))
                .collect(),
            fps,
            audio: None,
        }
    }

    #[test]
    fn uninitialized_player_rejects_transport() {
        let player = ClipPlayer::new();
        assert_eq!(player.state(), PlayerState::Uninitialized);
        assert!(matches!(player.play(), Err(ClipError::Uninitialized)));
        assert!(matches!(player.seek(1.0), Err(ClipError::Uninitialized)));
    }

    #[test]
    fn loading_a_clip_stops_the_player() {
        let player = ClipPlayer::new();
        player.set_clip(clip(10, 10.0));
        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(player.current_frame(), 0);
    }

    #[test]
    fn seek_clamps_to_half_a_second() {
        let player = ClipPlayer::new();
        player.set_clip(clip(100, 10.0));
        player.seek(0.0).unwrap();
        assert!((player.time() - MIN_SEEK_SECS).abs() < 1e-9);
        player.seek(3.2).unwrap();
        assert!((player.time() - 3.2).abs() < 1e-9);
        assert_eq!(player.current_frame(), 32);
        // Past the end: clamp to duration.
        player.seek(1000.0).unwrap();
        assert!((player.time() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn clock_is_monotone_across_pause_and_resume() {
        let player = ClipPlayer::new();
        player.set_clip(clip(1000, 10.0));
        player.play().unwrap();
        thread::sleep(Duration::from_millis(40));
        player.pause();
        assert_eq!(player.state(), PlayerState::Paused);
        let frozen = player.time();
        assert!(frozen > 0.0);
        thread::sleep(Duration::from_millis(40));
        assert!((player.time() - frozen).abs() < 1e-9);
        player.play().unwrap();
        thread::sleep(Duration::from_millis(40));
        assert!(player.time() >= frozen);
        player.stop();
    }

    #[test]
    fn playback_renders_frames_and_reaches_eos() {
        let player = ClipPlayer::new();
        player.set_clip(clip(5, 50.0));
        let rendered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rendered);
        player.set_frame_callback(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        player.play().unwrap();
        let deadline = Instant::now() + Duration::from_secs(3);
        while player.state() != PlayerState::Eos && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(player.state(), PlayerState::Eos);
        assert!(rendered.load(Ordering::SeqCst) > 0);
        player.stop();
        assert_eq!(player.state(), PlayerState::Stopped);
    }

    #[test]
    fn loop_mode_restarts_near_the_beginning() {
        let player = ClipPlayer::new();
        // 0.6 s clip so the loop seek target (0.5 s) stays inside it.
        player.set_clip(clip(30, 50.0));
        player.set_looping(true);
        player.play().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while player.loop_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(player.loop_count() >= 1);
        assert_eq!(player.state(), PlayerState::Playing);
        player.stop();
    }

    #[test]
    fn audio_chunks_arrive_frame_sized() {
        let player = ClipPlayer::new();
        let mut media = clip(5, 10.0);
        media.audio = Some(AudioTrack {
            sample_rate: 100,
            channels: 1,
            samples: (0..50).collect(),
        });
        player.set_clip(media);
        let rx = player.enable_audio().unwrap();
        player.play().unwrap();

        let mut received = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(3);
        while received.len() < 50 && Instant::now() < deadline {
            if let Ok(chunk) = rx.recv_timeout(Duration::from_millis(100)) {
                assert_eq!(chunk.len(), 10);
                received.extend(chunk);
            }
        }
        assert_eq!(received, (0..50).collect::<Vec<i16>>());
        player.stop();
    }
}
