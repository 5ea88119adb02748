//! Export encoding through an ffmpeg child reading raw RGBA on stdin.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use splice_core::time::TIME_EPSILON;
use splice_core::{FrameBuffer, Result, SpliceError};
use tracing::{debug, info, warn};

use super::ffmpeg_path;
use crate::encoder::{
    AudioFeed, EncodedArtifact, EncoderSession, ExportFormat, StreamEncoder, VideoCodec, VideoFeed,
};

/// Encodes the composited feed to a file with FFmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    output_path: PathBuf,
    format: ExportFormat,
}

impl FfmpegEncoder {
    pub fn new(output_path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            output_path: output_path.into(),
            format,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self, video: &VideoFeed, audio: &[AudioFeed]) -> Vec<String> {
        let fmt = &self.format;
        let rate = fmt.frame_rate;
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            // Input 0: raw frames from the pipe
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgba".into(),
            "-video_size".into(),
            format!("{}x{}", video.width, video.height),
            "-framerate".into(),
            format!("{}/{}", rate.numerator, rate.denominator),
            "-i".into(),
            "pipe:0".into(),
        ];

        // Inputs 1..: one trimmed source per audio feed
        for feed in audio {
            args.extend([
                "-ss".into(),
                format!("{:.6}", feed.source_start),
                "-t".into(),
                format!("{:.6}", feed.duration),
                "-i".into(),
                feed.source.clone(),
            ]);
        }

        if let Some(graph) = audio_filter_graph(audio) {
            args.extend(["-filter_complex".into(), graph]);
            args.extend(["-map".into(), "0:v".into(), "-map".into(), "[aout]".into()]);
            args.extend([
                "-c:a".into(),
                fmt.audio_codec.ffmpeg_encoder().into(),
                "-b:a".into(),
                format!("{}k", fmt.audio_bitrate),
                "-ar".into(),
                fmt.audio_sample_rate.to_string(),
            ]);
        } else {
            args.extend(["-map".into(), "0:v".into()]);
        }

        args.extend(["-c:v".into(), fmt.video_codec.ffmpeg_encoder().into()]);
        if let Some(crf) = fmt.crf {
            args.extend(["-crf".into(), crf.to_string()]);
        }
        if let Some(bitrate) = fmt.video_bitrate {
            args.extend(["-b:v".into(), format!("{bitrate}k")]);
        } else if fmt.video_codec == VideoCodec::Vp9 {
            // Constant-quality mode for VP9
            args.extend(["-b:v".into(), "0".into()]);
        }
        if fmt.video_codec == VideoCodec::ProRes422 {
            args.extend(["-profile:v".into(), "2".into()]);
        }
        args.extend(["-pix_fmt".into(), fmt.video_codec.pixel_format().into()]);
        args.extend(["-t".into(), format!("{:.6}", video.duration)]);

        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }
}

/// `filter_complex` mixing every feed, or None without feeds.
fn audio_filter_graph(audio: &[AudioFeed]) -> Option<String> {
    if audio.is_empty() {
        return None;
    }
    let mut chains = Vec::with_capacity(audio.len() + 1);
    let mut labels = String::new();
    for (i, feed) in audio.iter().enumerate() {
        let delay_ms = (feed.timeline_start.max(0.0) * 1000.0).round() as u64;
        let reverse = if feed.reversed { "areverse," } else { "" };
        chains.push(format!(
            "[{input}:a]{reverse}volume={gain:.4},adelay=delays={delay_ms}:all=1[a{i}]",
            input = i + 1,
            gain = feed.gain,
        ));
        labels.push_str(&format!("[a{i}]"));
    }
    chains.push(format!(
        "{labels}amix=inputs={}:duration=longest:dropout_transition=0:normalize=0[aout]",
        audio.len()
    ));
    Some(chains.join(";"))
}

impl StreamEncoder for FfmpegEncoder {
    fn open(&mut self, video: VideoFeed, audio: Vec<AudioFeed>) -> Result<Box<dyn EncoderSession>> {
        if video.width == 0 || video.height == 0 {
            return Err(SpliceError::Encoder("empty video feed".into()));
        }
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let args = self.ffmpeg_args(&video, &audio);
        debug!("ffmpeg {}", args.join(" "));
        Ok(Box::new(FfmpegSession {
            args,
            output_path: self.output_path.clone(),
            video,
            frame_duration: self.format.frame_rate.frame_duration(),
            child: None,
            stdin: None,
            packed: Vec::new(),
            last: Vec::new(),
            frames_pushed: 0,
            frames_written: 0,
        }))
    }
}

struct FfmpegSession {
    args: Vec<String>,
    output_path: PathBuf,
    video: VideoFeed,
    frame_duration: f64,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    /// Scratch buffer for the incoming frame.
    packed: Vec<u8>,
    /// Last written frame, repeated to fill gaps.
    last: Vec<u8>,
    frames_pushed: u64,
    frames_written: u64,
}

impl FfmpegSession {
    fn write_raw(&mut self, use_last: bool) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SpliceError::Encoder("session not started".into()))?;
        let bytes = if use_last { &self.last } else { &self.packed };
        stdin
            .write_all(bytes)
            .map_err(|e| SpliceError::Encoder(format!("failed to write frame: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    /// Number of output frames whose slot starts at or before `timestamp`.
    fn slots_through(&self, timestamp: f64) -> u64 {
        if timestamp < 0.0 {
            return 0;
        }
        (timestamp / self.frame_duration + TIME_EPSILON).floor() as u64 + 1
    }

    fn total_slots(&self) -> u64 {
        (self.video.duration / self.frame_duration - TIME_EPSILON).ceil().max(0.0) as u64
    }

    fn kill(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl EncoderSession for FfmpegSession {
    fn start(&mut self) -> Result<()> {
        let mut child = Command::new(ffmpeg_path())
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpliceError::Encoder(format!("failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpliceError::Encoder("failed to open ffmpeg stdin".into()))?;
        self.child = Some(child);
        self.stdin = Some(stdin);
        info!("Encoding to {}", self.output_path.display());
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer, timestamp: f64) -> Result<()> {
        if frame.width != self.video.width || frame.height != self.video.height {
            return Err(SpliceError::Encoder(format!(
                "frame is {}x{}, feed is {}x{}",
                frame.width, frame.height, self.video.width, self.video.height
            )));
        }
        self.frames_pushed += 1;

        // Constant frame rate: repeat the previous frame over gaps, drop
        // frames landing in an already written slot.
        let due = self.slots_through(timestamp).min(self.total_slots());
        if due <= self.frames_written {
            return Ok(());
        }
        self.packed = frame.to_packed_rgba();
        while self.frames_written + 1 < due && !self.last.is_empty() {
            self.write_raw(true)?;
        }
        while self.frames_written < due {
            self.write_raw(false)?;
        }
        std::mem::swap(&mut self.last, &mut self.packed);
        Ok(())
    }

    fn stop(mut self: Box<Self>) -> Result<EncodedArtifact> {
        // Pad to the full length with the last frame
        let total = self.total_slots();
        while self.frames_written < total && !self.last.is_empty() {
            self.write_raw(true)?;
        }

        self.stdin = None;
        let mut child = self
            .child
            .take()
            .ok_or_else(|| SpliceError::Encoder("session not started".into()))?;
        let status = child
            .wait()
            .map_err(|e| SpliceError::Encoder(format!("failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            let _ = std::fs::remove_file(&self.output_path);
            return Err(SpliceError::Encoder(format!("ffmpeg exited with status: {status}")));
        }

        let bytes = std::fs::metadata(&self.output_path).map(|m| m.len()).unwrap_or(0);
        info!(
            "Encoded {} frames ({} pushed) to {}",
            self.frames_written,
            self.frames_pushed,
            self.output_path.display()
        );
        Ok(EncodedArtifact {
            path: Some(self.output_path.clone()),
            frames_pushed: self.frames_pushed,
            frames_written: self.frames_written,
            duration: self.frames_written as f64 * self.frame_duration,
            bytes,
        })
    }

    fn abort(mut self: Box<Self>) {
        self.kill();
        if self.output_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.output_path) {
                warn!("Failed to remove partial export {}: {}", self.output_path.display(), e);
            }
        }
        info!("Export encoding aborted");
    }
}

impl Drop for FfmpegSession {
    fn drop(&mut self) {
        self.kill();
    }
}
