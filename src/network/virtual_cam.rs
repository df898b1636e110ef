//! Virtual camera output
//!
//! Writes composited frames as raw RGB24 to a video device or FIFO so
//! conferencing and streaming software can pick them up. Frames are handed
//! to a dedicated writer thread through a small bounded channel; when the
//! writer falls behind, new frames are dropped rather than queued.
//!
//! A device that cannot be opened disables the sink; callers can keep
//! calling [`VirtualCamera::send_frame`], which becomes a no-op.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::Frame;

/// Frames buffered between the pipeline and the writer thread
const QUEUE_DEPTH: usize = 2;

/// Virtual camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualCameraConfig {
    /// Whether to start the sink at all
    pub enabled: bool,
    /// Device node or FIFO receiving raw RGB24 frames
    pub device: PathBuf,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Output frame rate
    pub fps: u32,
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device: PathBuf::from("/dev/video10"),
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

#[derive(Error, Debug)]
pub enum VirtualCameraError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn writer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Raw-frame virtual camera sink
pub struct VirtualCamera {
    config: VirtualCameraConfig,
    /// Channel to the writer thread (None when disabled)
    frame_sender: Option<Sender<Frame>>,
    /// Cleared when the writer stops
    active: Arc<AtomicBool>,
    frames_written: Arc<AtomicU64>,
    frames_dropped: AtomicU64,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl VirtualCamera {
    /// A sink that discards every frame
    pub fn disabled(config: VirtualCameraConfig) -> Self {
        Self {
            config,
            frame_sender: None,
            active: Arc::new(AtomicBool::new(false)),
            frames_written: Arc::new(AtomicU64::new(0)),
            frames_dropped: AtomicU64::new(0),
            thread_handle: None,
        }
    }

    /// Start the sink described by `config`
    ///
    /// Never fails: a disabled config or an unavailable device yields a
    /// disabled sink.
    pub fn start(config: VirtualCameraConfig) -> Self {
        if !config.enabled {
            return Self::disabled(config);
        }

        match Self::try_start(config.clone()) {
            Ok(camera) => {
                tracing::info!(
                    device = %config.device.display(),
                    width = config.width,
                    height = config.height,
                    fps = config.fps,
                    "Virtual camera started"
                );
                camera
            }
            Err(e) => {
                tracing::warn!(error = %e, "Virtual camera unavailable, output disabled");
                Self::disabled(config)
            }
        }
    }

    fn try_start(config: VirtualCameraConfig) -> Result<Self, VirtualCameraError> {
        let device = OpenOptions::new()
            .write(true)
            .open(&config.device)
            .map_err(|source| VirtualCameraError::Open {
                path: config.device.clone(),
                source,
            })?;

        let (frame_sender, frame_receiver) = crossbeam_channel::bounded::<Frame>(QUEUE_DEPTH);
        let active = Arc::new(AtomicBool::new(true));
        let frames_written = Arc::new(AtomicU64::new(0));

        let writer = FrameWriter {
            width: config.width.max(1),
            height: config.height.max(1),
            frame_interval: Duration::from_secs_f64(1.0 / config.fps.max(1) as f64),
            active: active.clone(),
            frames_written: frames_written.clone(),
        };

        let thread_handle = std::thread::Builder::new()
            .name("virtual-camera".to_string())
            .spawn(move || writer.run(frame_receiver, device))
            .map_err(VirtualCameraError::Spawn)?;

        Ok(Self {
            config,
            frame_sender: Some(frame_sender),
            active,
            frames_written,
            frames_dropped: AtomicU64::new(0),
            thread_handle: Some(thread_handle),
        })
    }

    pub fn config(&self) -> &VirtualCameraConfig {
        &self.config
    }

    /// Whether frames are currently being written
    pub fn is_active(&self) -> bool {
        self.frame_sender.is_some() && self.active.load(Ordering::Acquire)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Queue a frame for output; dropped if the writer is busy
    pub fn send_frame(&self, frame: &Frame) {
        if !self.is_active() {
            return;
        }
        let Some(sender) = &self.frame_sender else {
            return;
        };

        match sender.try_send(frame.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.active.store(false, Ordering::Release);
            }
        }
    }

    /// Stop the writer thread, flushing queued frames
    pub fn stop(&mut self) {
        self.frame_sender = None;
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("Virtual camera writer thread panicked");
            }
            tracing::info!(frames = self.frames_written(), "Virtual camera stopped");
        }
    }
}

impl Drop for VirtualCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Writer thread state
struct FrameWriter {
    width: u32,
    height: u32,
    frame_interval: Duration,
    active: Arc<AtomicBool>,
    frames_written: Arc<AtomicU64>,
}

impl FrameWriter {
    fn run(self, frame_receiver: Receiver<Frame>, mut device: impl Write) {
        tracing::debug!("Virtual camera writer started");
        let mut next_deadline = Instant::now();

        while let Ok(frame) = frame_receiver.recv() {
            let frame = if frame.dimensions() == (self.width, self.height) {
                frame
            } else {
                imageops::resize(&frame, self.width, self.height, FilterType::Triangle)
            };

            if let Err(e) = device.write_all(frame.as_raw()).and_then(|_| device.flush()) {
                tracing::warn!(error = %e, "Virtual camera write failed, output disabled");
                break;
            }
            self.frames_written.fetch_add(1, Ordering::Relaxed);

            // Hold the configured frame rate
            next_deadline += self.frame_interval;
            let now = Instant::now();
            if next_deadline > now {
                std::thread::sleep(next_deadline - now);
            } else {
                next_deadline = now;
            }
        }

        self.active.store(false, Ordering::Release);
        tracing::debug!("Virtual camera writer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn config_for(device: PathBuf, width: u32, height: u32) -> VirtualCameraConfig {
        VirtualCameraConfig {
            enabled: true,
            device,
            width,
            height,
            fps: 1000,
        }
    }

    #[test]
    fn test_disabled_config_is_noop() {
        let camera = VirtualCamera::start(VirtualCameraConfig::default());
        assert!(!camera.is_active());
        camera.send_frame(&Frame::new(2, 2));
        assert_eq!(camera.frames_written(), 0);
    }

    #[test]
    fn test_missing_device_disables_sink() {
        let dir = tempfile::tempdir().unwrap();
        let camera = VirtualCamera::start(config_for(dir.path().join("missing").join("video"), 2, 2));
        assert!(!camera.is_active());
        camera.send_frame(&Frame::new(2, 2));
    }

    #[test]
    fn test_writes_raw_rgb_frames() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut camera = VirtualCamera::start(config_for(file.path().to_path_buf(), 2, 2));
        assert!(camera.is_active());

        camera.send_frame(&Frame::from_pixel(2, 2, Rgb([1, 2, 3])));
        camera.stop();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(bytes.len(), 2 * 2 * 3);
        assert_eq!(&bytes[..3], &[1, 2, 3]);
        assert_eq!(camera.frames_written(), 1);
    }

    #[test]
    fn test_frames_are_resized() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut camera = VirtualCamera::start(config_for(file.path().to_path_buf(), 3, 1));
        camera.send_frame(&Frame::from_pixel(8, 8, Rgb([50, 60, 70])));
        camera.stop();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(bytes.len(), 3 * 3);
        assert!(!camera.is_active());
    }
}
