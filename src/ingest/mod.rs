//! Frame ingestion sources.
//!
//! This module provides the video sources the tracking loop reads from:
//! - Synthetic scenes (`stub://...`) for bench runs and tests
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - Local video files (feature: ingest-file-ffmpeg)
//!
//! Every source yields RGB24 `Frame`s one at a time, blocking until a frame is
//! available. `Ok(None)` means the source is exhausted (end of file); errors
//! are per-frame read failures the caller may retry.

#[cfg(feature = "ingest-file-ffmpeg")]
mod file_ffmpeg;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

#[cfg(feature = "ingest-file-ffmpeg")]
use file_ffmpeg::FfmpegFileSource;
pub use synthetic::{Scene, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
use v4l2::V4l2Source;

const STUB_SCHEME: &str = "stub://";

/// Configuration for a video source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Device node ("/dev/video0"), local file path, or "stub://<scene>".
    pub source: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width. Files keep their native size.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            source: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Kind of source a path resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Synthetic,
    Device,
    File,
}

impl SourceKind {
    pub fn classify(source: &str) -> Result<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(anyhow!("video source is empty"));
        }
        if source.starts_with(STUB_SCHEME) {
            return Ok(SourceKind::Synthetic);
        }
        if source.contains("://") {
            return Err(anyhow!(
                "video source must be a local device or file path (no URL schemes)"
            ));
        }
        if source.starts_with("/dev/video") {
            Ok(SourceKind::Device)
        } else {
            Ok(SourceKind::File)
        }
    }
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct VideoStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Anything the tracking loop can pull frames from.
pub trait FrameSource {
    /// Capture the next frame. `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool {
        true
    }
}

/// A video source, owned exclusively by the capture loop.
pub struct VideoSource {
    backend: VideoBackend,
}

enum VideoBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(V4l2Source),
    #[cfg(feature = "ingest-file-ffmpeg")]
    File(FfmpegFileSource),
}

impl VideoSource {
    pub fn new(config: VideoConfig) -> Result<Self> {
        let backend = match SourceKind::classify(&config.source)? {
            SourceKind::Synthetic => VideoBackend::Synthetic(SyntheticSource::new(config)?),
            SourceKind::Device => device_backend(config)?,
            SourceKind::File => file_backend(config)?,
        };
        Ok(Self { backend })
    }

    /// Open the underlying device or file.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            VideoBackend::Device(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::File(source) => source.connect(),
        }
    }

    /// Capture the next frame. `Ok(None)` once the source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.next_frame().map(Some),
            #[cfg(feature = "ingest-v4l2")]
            VideoBackend::Device(source) => source.next_frame().map(Some),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::File(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            VideoBackend::Synthetic(_) => true,
            #[cfg(feature = "ingest-v4l2")]
            VideoBackend::Device(source) => source.is_healthy(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::File(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> VideoStats {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            VideoBackend::Device(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::File(source) => source.stats(),
        }
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        VideoSource::next_frame(self)
    }

    fn is_healthy(&self) -> bool {
        VideoSource::is_healthy(self)
    }
}

#[cfg(feature = "ingest-v4l2")]
fn device_backend(config: VideoConfig) -> Result<VideoBackend> {
    Ok(VideoBackend::Device(V4l2Source::new(config)))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn device_backend(_config: VideoConfig) -> Result<VideoBackend> {
    Err(anyhow!("capture devices require the ingest-v4l2 feature"))
}

#[cfg(feature = "ingest-file-ffmpeg")]
fn file_backend(config: VideoConfig) -> Result<VideoBackend> {
    Ok(VideoBackend::File(FfmpegFileSource::new(config)?))
}

#[cfg(not(feature = "ingest-file-ffmpeg"))]
fn file_backend(_config: VideoConfig) -> Result<VideoBackend> {
    Err(anyhow!(
        "file ingestion requires the ingest-file-ffmpeg feature"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sources() -> Result<()> {
        assert_eq!(SourceKind::classify("stub://sweep")?, SourceKind::Synthetic);
        assert_eq!(SourceKind::classify("/dev/video2")?, SourceKind::Device);
        assert_eq!(SourceKind::classify("clips/walk.mp4")?, SourceKind::File);
        assert!(SourceKind::classify("rtsp://camera/stream").is_err());
        assert!(SourceKind::classify("  ").is_err());
        Ok(())
    }

    #[test]
    fn stub_source_produces_frames() -> Result<()> {
        let mut source = VideoSource::new(VideoConfig {
            source: "stub://center".to_string(),
            ..VideoConfig::default()
        })?;
        source.connect()?;
        let frame = source.next_frame()?.expect("synthetic sources never end");
        assert_eq!((frame.width, frame.height), (640, 480));
        assert!(source.is_healthy());
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn device_requires_feature() {
        let config = VideoConfig::default();
        assert!(VideoSource::new(config).is_err());
    }
}
