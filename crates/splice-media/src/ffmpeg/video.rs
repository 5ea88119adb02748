//! Video and still-image handles.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use splice_core::defaults::LOOKAHEAD_FRAMES;
use splice_core::{FrameBuffer, FrameRate, Result, SharedFrameBuffer};
use tracing::{debug, warn};

use super::{ffmpeg_reader, Playhead};
use crate::provider::DecoderHandle;

struct DecodedFrame {
    pts: f64,
    frame: SharedFrameBuffer,
}

/// Read RGBA frames of `size` from an ffmpeg child until told to stop or
/// the receiver goes away.
fn decode_worker(
    args: Vec<String>,
    size: (u32, u32),
    start: f64,
    frame_rate: FrameRate,
    tx: Sender<DecodedFrame>,
    stop: Arc<AtomicBool>,
) {
    let mut child = match ffmpeg_reader(&args).spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to spawn ffmpeg decoder: {}", e);
            return;
        }
    };
    let Some(mut stdout) = child.stdout.take() else {
        let _ = child.kill();
        return;
    };

    let (width, height) = size;
    let mut buf = vec![0u8; width as usize * height as usize * 4];
    let mut index: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        if let Err(e) = stdout.read_exact(&mut buf) {
            if e.kind() != std::io::ErrorKind::UnexpectedEof {
                debug!("Decoder stream ended: {}", e);
            }
            break;
        }
        let frame = match FrameBuffer::from_rgba(width, height, &buf) {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                break;
            }
        };
        let pts = start + index as f64 * frame_rate.frame_duration();
        index += 1;
        if tx.send(DecodedFrame { pts, frame }).is_err() {
            break;
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}

/// How much a worker decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeMode {
    /// Frames from `start` onwards, buffered ahead of a running playhead.
    Stream,
    /// The one frame at `start`, for a paused handle.
    Single,
}

struct DecodeRequest {
    args: Vec<String>,
    size: (u32, u32),
    start: f64,
    frame_rate: FrameRate,
    mode: DecodeMode,
}

struct Worker {
    rx: Receiver<DecodedFrame>,
    stop: Arc<AtomicBool>,
    mode: DecodeMode,
}

type Launcher = fn(DecodeRequest) -> Worker;

impl Worker {
    fn spawn(request: DecodeRequest) -> Self {
        let (tx, rx) = bounded(LOOKAHEAD_FRAMES);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();
        let DecodeRequest {
            args,
            size,
            start,
            frame_rate,
            mode,
        } = request;
        thread::spawn(move || decode_worker(args, size, start, frame_rate, tx, worker_stop));
        Self { rx, stop, mode }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn scale_filter((width, height): (u32, u32)) -> String {
    format!("scale={width}:{height}")
}

/// A video source decoded ahead of the playhead.
///
/// While running, one worker streams frames ahead of the playhead. While
/// paused, each seek decodes a single frame; seeks arriving before that frame
/// is delivered collapse into one queued target.
pub(crate) struct VideoHandle {
    source: String,
    size: (u32, u32),
    frame_rate: FrameRate,
    playhead: Playhead,
    launch: Launcher,
    worker: Option<Worker>,
    /// Latest paused seek waiting for the single frame in flight.
    queued_seek: Option<f64>,
    /// Decoded frame not yet due.
    pending: Option<DecodedFrame>,
    current: Option<SharedFrameBuffer>,
    volume: f64,
}

impl VideoHandle {
    pub(crate) fn open(source: &str, size: (u32, u32), frame_rate: FrameRate, duration: f64) -> Self {
        Self::with_launcher(source, size, frame_rate, duration, Worker::spawn)
    }

    fn with_launcher(
        source: &str,
        size: (u32, u32),
        frame_rate: FrameRate,
        duration: f64,
        launch: Launcher,
    ) -> Self {
        let mut handle = Self {
            source: source.to_string(),
            size,
            frame_rate,
            playhead: Playhead::new(duration),
            launch,
            worker: None,
            queued_seek: None,
            pending: None,
            current: None,
            volume: 1.0,
        };
        handle.start_worker(0.0, DecodeMode::Stream);
        handle
    }

    fn start_worker(&mut self, start: f64, mode: DecodeMode) {
        let fps = self.frame_rate;
        let mut args = vec![
            "-ss".into(),
            format!("{start:.6}"),
            "-i".into(),
            self.source.clone(),
            "-an".into(),
        ];
        if mode == DecodeMode::Single {
            args.extend(["-frames:v".into(), "1".into()]);
        }
        args.extend([
            "-vf".into(),
            format!("{},fps={}/{}", scale_filter(self.size), fps.numerator, fps.denominator),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "pipe:1".into(),
        ]);
        self.pending = None;
        self.worker = Some((self.launch)(DecodeRequest {
            args,
            size: self.size,
            start,
            frame_rate: fps,
            mode,
        }));
    }

    fn worker_mode(&self) -> Option<DecodeMode> {
        self.worker.as_ref().map(|w| w.mode)
    }

    fn poll(&mut self) {
        match self.worker_mode() {
            Some(DecodeMode::Stream) => self.drain_due(),
            Some(DecodeMode::Single) => self.poll_single(),
            None => {}
        }
    }

    /// Take the single frame once it arrives, then issue the queued seek.
    fn poll_single(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let finished = match worker.rx.try_recv() {
            Ok(decoded) => {
                self.current = Some(decoded.frame);
                true
            }
            Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        };
        if finished {
            self.worker = None;
            if let Some(target) = self.queued_seek.take() {
                self.start_worker(target, DecodeMode::Single);
            }
        }
    }

    /// Pull frames that are due at the current position.
    fn drain_due(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let due = self.playhead.position() + self.frame_rate.frame_duration() * 0.5;
        loop {
            let next = match self.pending.take() {
                Some(frame) => frame,
                None => match worker.rx.try_recv() {
                    Ok(frame) => frame,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                },
            };
            if next.pts <= due || self.current.is_none() {
                self.current = Some(next.frame);
            } else {
                self.pending = Some(next);
                break;
            }
        }
    }
}

impl DecoderHandle for VideoHandle {
    fn seek(&mut self, position: f64) {
        self.playhead.seek(position);
        let target = self.playhead.position();
        if self.playhead.is_running() {
            self.queued_seek = None;
            self.start_worker(target, DecodeMode::Stream);
        } else if self.worker_mode() == Some(DecodeMode::Single) {
            self.queued_seek = Some(target);
        } else {
            self.start_worker(target, DecodeMode::Single);
        }
    }

    fn play(&mut self) -> Result<()> {
        if self.playhead.is_running() {
            return Ok(());
        }
        if self.worker_mode() != Some(DecodeMode::Stream) {
            self.queued_seek = None;
            self.start_worker(self.playhead.position(), DecodeMode::Stream);
        }
        self.playhead.run();
        Ok(())
    }

    fn pause(&mut self) {
        self.playhead.halt();
    }

    fn is_playing(&self) -> bool {
        self.playhead.is_running()
    }

    fn is_presentable(&self) -> bool {
        self.current.is_some() || self.pending.is_some()
            || self.worker.as_ref().is_some_and(|w| !w.rx.is_empty())
    }

    fn current_position(&self) -> f64 {
        self.playhead.position()
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        self.poll();
        self.current.clone()
    }

    fn set_volume(&mut self, volume: f64) {
        // Video handles carry no sound
        self.volume = volume;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn dispose(&mut self) {
        self.worker = None;
        self.queued_seek = None;
        self.pending = None;
        self.current = None;
        self.playhead.halt();
        debug!("Disposed video decoder for {}", self.source);
    }
}

/// A still image, decoded once.
pub(crate) struct StillHandle {
    source: String,
    rx: Option<Receiver<SharedFrameBuffer>>,
    frame: Option<SharedFrameBuffer>,
    playhead: Playhead,
    volume: f64,
}

impl StillHandle {
    pub(crate) fn open(source: &str, size: (u32, u32), duration: f64) -> Self {
        let (tx, rx) = bounded(1);
        let args = vec![
            "-i".into(),
            source.to_string(),
            "-frames:v".into(),
            "1".into(),
            "-vf".into(),
            scale_filter(size),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "pipe:1".into(),
        ];
        let name = source.to_string();
        thread::spawn(move || match load_still(&args, size) {
            Ok(frame) => {
                let _ = tx.send(Arc::new(frame));
            }
            Err(e) => warn!("Failed to load still {}: {}", name, e),
        });

        Self {
            source: source.to_string(),
            rx: Some(rx),
            frame: None,
            playhead: Playhead::new(duration),
            volume: 1.0,
        }
    }

    fn poll(&mut self) {
        if self.frame.is_some() {
            return;
        }
        if let Some(rx) = &self.rx {
            if let Ok(frame) = rx.try_recv() {
                self.frame = Some(frame);
                self.rx = None;
            }
        }
    }
}

fn load_still(args: &[String], (width, height): (u32, u32)) -> Result<FrameBuffer> {
    let output = ffmpeg_reader(args).output()?;
    if !output.status.success() {
        return Err(splice_core::SpliceError::Decoder(format!(
            "ffmpeg exited with {}",
            output.status
        )));
    }
    FrameBuffer::from_rgba(width, height, &output.stdout)
}

impl DecoderHandle for StillHandle {
    fn seek(&mut self, position: f64) {
        self.playhead.seek(position);
    }

    fn play(&mut self) -> Result<()> {
        self.playhead.run();
        Ok(())
    }

    fn pause(&mut self) {
        self.playhead.halt();
    }

    fn is_playing(&self) -> bool {
        self.playhead.is_running()
    }

    fn is_presentable(&self) -> bool {
        self.frame.is_some() || self.rx.as_ref().is_some_and(|rx| !rx.is_empty())
    }

    fn current_position(&self) -> f64 {
        self.playhead.position()
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        self.poll();
        self.frame.clone()
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn dispose(&mut self) {
        self.rx = None;
        self.frame = None;
        debug!("Disposed still loader for {}", self.source);
    }
}
