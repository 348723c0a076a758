use core_types::RgbFrame;

/// Interleaved PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioTrack {
    /// Interleaved samples per video frame at the given fps.
    pub fn samples_per_frame(&self, fps: f64) -> usize {
        if fps <= 0.0 {
            return 0;
        }
        (f64::from(self.sample_rate) / fps) as usize * usize::from(self.channels)
    }

    /// The interleaved chunk covering video frame `idx`, empty past the end.
    pub fn chunk_for_frame(&self, idx: usize, fps: f64) -> &[i16] {
        let per_frame = self.samples_per_frame(fps);
        let start = (idx * per_frame).min(self.samples.len());
        let end = (start + per_frame).min(self.samples.len());
        &self.samples[start..end]
    }
}

/// A fully-decoded video clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub frames: Vec<RgbFrame>,
    pub fps: f64,
    pub audio: Option<AudioTrack>,
}

impl Clip {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn duration(&self) -> f64 {
        if self.fps <= 0.0 {
            0.0
        } else {
            self.frames.len() as f64 / self.fps
        }
    }

    pub fn width(&self) -> u32 {
        self.frames.first().map_or(0, |f| f.width)
    }

    pub fn height(&self) -> u32 {
        self.frames.first().map_or(0, |f| f.height)
    }
}
