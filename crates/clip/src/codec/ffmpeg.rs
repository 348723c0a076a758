//! libav-backed [`ClipCodec`].
//!
//! Decode: whole-file demux of the best video stream scaled to RGB24, plus
//! the best audio stream resampled to packed stereo i16.
//! Encode: H.264 (YUV420P, CRF 18, preset fast) and AAC in one pass, with
//! monotonic frame/sample counters as PTS so trimmed and concatenated
//! material never carries source discontinuities into the output.

use std::path::Path;

use ffmpeg_the_third as av;

use av::codec::{self, Id as CodecId};
use av::format::sample::Type as SampleType;
use av::format::{input, output, Pixel, Sample};
use av::media::Type as MediaType;
use av::software::resampling;
use av::software::scaling::{context::Context as ScaleCtx, flag::Flags as ScaleFlags};
use av::util::channel_layout::ChannelLayout;
use av::util::frame::audio::Audio as AudioFrame;
use av::util::frame::video::Video as VideoFrame;
use av::util::rational::Rational;
use av::Packet;

use core_types::RgbFrame;
use tracing::warn;

use super::ClipCodec;
use crate::{AudioTrack, Clip, ClipError, Result};

const AUDIO_BIT_RATE: usize = 128_000;

pub struct FfmpegCodec;

impl FfmpegCodec {
    pub fn new() -> Result<Self> {
        av::init().map_err(|e| ClipError::Codec(format!("libav init: {e}")))?;
        Ok(Self)
    }
}

fn codec_err(what: &str, err: impl std::fmt::Display) -> ClipError {
    ClipError::Codec(format!("{what}: {err}"))
}

impl ClipCodec for FfmpegCodec {
    fn open(&self, path: &Path) -> Result<Clip> {
        let mut ictx = input(path).map_err(|e| codec_err("open input", e))?;

        let video_idx = ictx
            .streams()
            .best(MediaType::Video)
            .ok_or_else(|| ClipError::Codec(format!("no video stream in {}", path.display())))?
            .index();
        let audio_idx = ictx.streams().best(MediaType::Audio).map(|s| s.index());

        let fps = {
            let stream = ictx.stream(video_idx).expect("best stream exists");
            f64::from(stream.avg_frame_rate())
        };

        let vdec_ctx = codec::context::Context::from_parameters(
            ictx.stream(video_idx).expect("best stream exists").parameters(),
        )
        .map_err(|e| codec_err("video decoder context", e))?;
        let mut vdec = vdec_ctx
            .decoder()
            .video()
            .map_err(|e| codec_err("open video decoder", e))?;

        // A corrupt audio stream downgrades to a silent clip rather than a
        // failed open.
        let mut adec = audio_idx.and_then(|idx| {
            let params = ictx.stream(idx).expect("best stream exists").parameters();
            match codec::context::Context::from_parameters(params)
                .and_then(|ctx| ctx.decoder().audio())
            {
                Ok(dec) => Some(dec),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "audio decoder unavailable");
                    None
                }
            }
        });

        let mut scaler: Option<ScaleCtx> = None;
        let mut resampler: Option<resampling::Context> = None;
        let mut frames = Vec::new();
        let mut audio = adec.as_ref().map(|dec| AudioTrack {
            sample_rate: dec.rate(),
            channels: 2,
            samples: Vec::new(),
        });

        for (stream, packet) in ictx.packets().flatten() {
            if stream.index() == video_idx {
                if vdec.send_packet(&packet).is_err() {
                    continue;
                }
                receive_video_frames(&mut vdec, &mut scaler, &mut frames)?;
            } else if Some(stream.index()) == audio_idx {
                let Some(dec) = adec.as_mut() else { continue };
                if dec.send_packet(&packet).is_err() {
                    continue;
                }
                if let Some(track) = audio.as_mut() {
                    receive_audio_samples(dec, &mut resampler, track);
                }
            }
        }

        // Drain the held B-frames.
        let _ = vdec.send_eof();
        receive_video_frames(&mut vdec, &mut scaler, &mut frames)?;
        if let (Some(dec), Some(track)) = (adec.as_mut(), audio.as_mut()) {
            let _ = dec.send_eof();
            receive_audio_samples(dec, &mut resampler, track);
        }

        if frames.is_empty() {
            return Err(ClipError::Empty);
        }
        Ok(Clip { frames, fps, audio })
    }

    fn save(&self, clip: &Clip, path: &Path) -> Result<()> {
        if clip.frames.is_empty() {
            return Err(ClipError::Empty);
        }
        // H.264 requires even dimensions.
        let width = clip.width() & !1;
        let height = clip.height() & !1;
        let fps = clip.fps.round().max(1.0) as i32;
        let frame_tb = Rational::new(1, fps);

        let mut octx = output(path).map_err(|e| codec_err("open output", e))?;

        let h264 = av::encoder::find(CodecId::H264)
            .ok_or_else(|| ClipError::Codec("H.264 encoder not found".into()))?;
        let mut ost_video = octx
            .add_stream(h264)
            .map_err(|e| codec_err("add video stream", e))?;
        ost_video.set_time_base(frame_tb);

        let venc_ctx = codec::context::Context::new_with_codec(h264);
        let mut venc = venc_ctx
            .encoder()
            .video()
            .map_err(|e| codec_err("video encoder context", e))?;
        venc.set_width(width);
        venc.set_height(height);
        venc.set_format(Pixel::YUV420P);
        venc.set_time_base(frame_tb);
        venc.set_frame_rate(Some(Rational::new(fps, 1)));
        venc.set_bit_rate(0);

        let mut opts = av::Dictionary::new();
        opts.set("crf", "18");
        opts.set("preset", "fast");
        let mut video_encoder = venc
            .open_as_with(h264, opts)
            .map_err(|e| codec_err("open H.264 encoder", e))?;
        video_encoder.set_aspect_ratio(Rational::new(1, 1));

        // encoder::Video does not implement AsPtr<AVCodecParameters>; copy
        // the codecpar through FFI like any libav muxing sample does.
        unsafe {
            let ret = av::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
                video_encoder.as_ptr() as *mut av::ffi::AVCodecContext,
            );
            if ret < 0 {
                return Err(ClipError::Codec(format!(
                    "avcodec_parameters_from_context (video): {ret}"
                )));
            }
        }

        let mut audio_encoder = match &clip.audio {
            Some(track) => Some(open_audio_encoder(&mut octx, track)?),
            None => None,
        };

        octx.write_header().map_err(|e| codec_err("write header", e))?;

        let ost_video_tb = octx.stream(0).expect("stream 0 added").time_base();
        let mut scaler = ScaleCtx::get(
            Pixel::RGB24,
            clip.width(),
            clip.height(),
            Pixel::YUV420P,
            width,
            height,
            ScaleFlags::BILINEAR,
        )
        .map_err(|e| codec_err("create scaler", e))?;

        for (idx, frame) in clip.frames.iter().enumerate() {
            let rgb = rgb_to_avframe(frame);
            let mut yuv = VideoFrame::empty();
            scaler
                .run(&rgb, &mut yuv)
                .map_err(|e| codec_err("scale frame", e))?;
            yuv.set_pts(Some(idx as i64));
            unsafe {
                (*yuv.as_mut_ptr()).sample_aspect_ratio = av::ffi::AVRational { num: 1, den: 1 };
            }
            video_encoder
                .send_frame(&yuv)
                .map_err(|e| codec_err("send video frame", e))?;
            write_video_packets(&mut video_encoder, &mut octx, frame_tb, ost_video_tb)?;

            if let Some(enc) = audio_encoder.as_mut() {
                let track = clip.audio.as_ref().expect("encoder implies track");
                enc.push_frame_chunk(track, idx, clip.fps);
                enc.drain(&mut octx, false)?;
            }
        }

        video_encoder
            .send_eof()
            .map_err(|e| codec_err("flush video encoder", e))?;
        write_video_packets(&mut video_encoder, &mut octx, frame_tb, ost_video_tb)?;

        if let Some(enc) = audio_encoder.as_mut() {
            enc.drain(&mut octx, true)?;
            enc.flush(&mut octx)?;
        }

        octx.write_trailer().map_err(|e| codec_err("write trailer", e))?;
        Ok(())
    }
}

fn receive_video_frames(
    vdec: &mut av::decoder::video::Video,
    scaler: &mut Option<ScaleCtx>,
    frames: &mut Vec<RgbFrame>,
) -> Result<()> {
    let mut decoded = VideoFrame::empty();
    while vdec.receive_frame(&mut decoded).is_ok() {
        let (w, h) = (decoded.width(), decoded.height());
        let sc = match scaler {
            Some(sc) => sc,
            None => scaler.insert(
                ScaleCtx::get(
                    decoded.format(),
                    w,
                    h,
                    Pixel::RGB24,
                    w,
                    h,
                    ScaleFlags::BILINEAR,
                )
                .map_err(|e| codec_err("create scaler", e))?,
            ),
        };
        let mut rgb = VideoFrame::empty();
        sc.run(&decoded, &mut rgb)
            .map_err(|e| codec_err("scale frame", e))?;
        let stride = rgb.stride(0);
        let raw = rgb.data(0);
        let row_bytes = w as usize * 3;
        let data: Vec<u8> = (0..h as usize)
            .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
            .copied()
            .collect();
        frames.push(RgbFrame::new(w, h, data));
    }
    Ok(())
}

fn receive_audio_samples(
    adec: &mut av::decoder::audio::Audio,
    resampler: &mut Option<resampling::Context>,
    track: &mut AudioTrack,
) {
    let target_fmt = Sample::I16(SampleType::Packed);
    let mut raw = AudioFrame::empty();
    while adec.receive_frame(&mut raw).is_ok() {
        if raw.samples() == 0 {
            continue;
        }
        let rs = resampler.get_or_insert_with(|| {
            let src_layout = if raw.ch_layout().channels() >= 2 {
                raw.ch_layout()
            } else {
                ChannelLayout::MONO
            };
            resampling::Context::get2(
                raw.format(),
                src_layout,
                raw.rate(),
                target_fmt,
                ChannelLayout::STEREO,
                track.sample_rate,
            )
            .expect("create audio resampler")
        });
        let mut packed = AudioFrame::empty();
        if rs.run(&raw, &mut packed).is_err() || packed.samples() == 0 {
            continue;
        }
        let n = packed.samples() * 2;
        unsafe {
            let bytes = packed.data(0);
            let samples = std::slice::from_raw_parts(bytes.as_ptr() as *const i16, n);
            track.samples.extend_from_slice(samples);
        }
    }
}

fn rgb_to_avframe(frame: &RgbFrame) -> VideoFrame {
    let mut out = VideoFrame::new(Pixel::RGB24, frame.width, frame.height);
    let stride = out.stride(0);
    let row_bytes = frame.width as usize * 3;
    let dst = out.data_mut(0);
    for row in 0..frame.height as usize {
        dst[row * stride..row * stride + row_bytes]
            .copy_from_slice(&frame.data[row * row_bytes..(row + 1) * row_bytes]);
    }
    out
}

fn write_video_packets(
    encoder: &mut av::encoder::video::Video,
    octx: &mut av::format::context::Output,
    frame_tb: Rational,
    ost_tb: Rational,
) -> Result<()> {
    let mut pkt = Packet::empty();
    while encoder.receive_packet(&mut pkt).is_ok() {
        pkt.set_stream(0);
        pkt.rescale_ts(frame_tb, ost_tb);
        pkt.write_interleaved(octx)
            .map_err(|e| codec_err("write video packet", e))?;
    }
    Ok(())
}

/// AAC encoder plus the planar-float FIFO feeding it.
struct AudioEncoder {
    encoder: av::encoder::Audio,
    frame_size: usize,
    sample_rate: u32,
    out_sample_idx: i64,
    left: Vec<f32>,
    right: Vec<f32>,
    audio_tb: Rational,
    ost_tb: Rational,
}

fn open_audio_encoder(
    octx: &mut av::format::context::Output,
    track: &AudioTrack,
) -> Result<AudioEncoder> {
    let audio_tb = Rational::new(1, track.sample_rate as i32);
    let aac = av::encoder::find(CodecId::AAC)
        .ok_or_else(|| ClipError::Codec("AAC encoder not found".into()))?;

    let mut ost = octx
        .add_stream(aac)
        .map_err(|e| codec_err("add audio stream", e))?;
    ost.set_time_base(audio_tb);

    let enc_ctx = codec::context::Context::new_with_codec(aac);
    let mut enc = enc_ctx
        .encoder()
        .audio()
        .map_err(|e| codec_err("audio encoder context", e))?;
    enc.set_rate(track.sample_rate as i32);
    enc.set_ch_layout(ChannelLayout::STEREO);
    enc.set_format(Sample::F32(SampleType::Planar));
    enc.set_bit_rate(AUDIO_BIT_RATE);

    let encoder = enc
        .open_as_with(aac, av::Dictionary::new())
        .map_err(|e| codec_err("open AAC encoder", e))?;
    let frame_size = (encoder.frame_size() as usize).max(1024);
    let ost_tb = octx.stream(1).expect("stream 1 added").time_base();

    unsafe {
        let ret = av::ffi::avcodec_parameters_from_context(
            (**(*octx.as_mut_ptr()).streams.add(1)).codecpar,
            encoder.as_ptr() as *mut av::ffi::AVCodecContext,
        );
        if ret < 0 {
            return Err(ClipError::Codec(format!(
                "avcodec_parameters_from_context (audio): {ret}"
            )));
        }
    }

    Ok(AudioEncoder {
        encoder,
        frame_size,
        sample_rate: track.sample_rate,
        out_sample_idx: 0,
        left: Vec::new(),
        right: Vec::new(),
        audio_tb,
        ost_tb,
    })
}

impl AudioEncoder {
    /// Converts the interleaved i16 chunk covering video frame `idx` to
    /// planar float and buffers it. Mono input feeds both planes.
    fn push_frame_chunk(&mut self, track: &AudioTrack, idx: usize, fps: f64) {
        let chunk = track.chunk_for_frame(idx, fps);
        if chunk.is_empty() {
            return;
        }
        let channels = usize::from(track.channels.max(1));
        for frame in chunk.chunks(channels) {
            let l = f32::from(frame[0]) / 32768.0;
            let r = f32::from(*frame.last().expect("non-empty chunk")) / 32768.0;
            self.left.push(l);
            self.right.push(r);
        }
    }

    fn drain(&mut self, octx: &mut av::format::context::Output, flush: bool) -> Result<()> {
        while self.left.len() >= self.frame_size || (flush && !self.left.is_empty()) {
            let n = self.frame_size;
            let available = self.left.len().min(n);
            let mut frame = AudioFrame::new(
                Sample::F32(SampleType::Planar),
                n,
                av::util::channel_layout::ChannelLayoutMask::STEREO,
            );
            frame.set_rate(self.sample_rate);
            frame.set_pts(Some(self.out_sample_idx));
            unsafe {
                for (plane, src) in [(0, &mut self.left), (1, &mut self.right)] {
                    let data = frame.data_mut(plane);
                    let dst = std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut f32, n);
                    dst[..available].copy_from_slice(&src[..available]);
                    dst[available..].fill(0.0);
                    src.drain(..available);
                }
            }
            self.out_sample_idx += n as i64;
            self.encoder
                .send_frame(&frame)
                .map_err(|e| codec_err("send audio frame", e))?;
            self.write_packets(octx)?;
        }
        Ok(())
    }

    fn flush(&mut self, octx: &mut av::format::context::Output) -> Result<()> {
        self.encoder
            .send_eof()
            .map_err(|e| codec_err("flush audio encoder", e))?;
        self.write_packets(octx)
    }

    fn write_packets(&mut self, octx: &mut av::format::context::Output) -> Result<()> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(1);
            pkt.rescale_ts(self.audio_tb, self.ost_tb);
            pkt.write_interleaved(octx)
                .map_err(|e| codec_err("write audio packet", e))?;
        }
        Ok(())
    }
}
