//! Poster extraction
//!
//! [`FrameExtractor`] picks the last frame of a video and writes it as a lossy WebP
//! still. Decoding and encoding are delegated to a [`VideoSource`] and a
//! [`PosterEncoder`]; [`FfmpegBackend`] implements both with the ffmpeg tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PosterConfig;
use crate::{AssetError, Result};

pub mod ffmpeg;

pub use ffmpeg::FfmpegBackend;

/// Channel order of packed 8-bit pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelLayout {
    Rgb24,
    Bgr24,
}

/// A single decoded video frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            layout,
            data,
        }
    }

    /// Bytes a complete frame of this size occupies
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn is_complete(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }

    /// Reorder channels into RGB, the layout the poster encoder expects
    pub fn into_rgb24(mut self) -> Self {
        if self.layout == PixelLayout::Bgr24 {
            for pixel in self.data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
            self.layout = PixelLayout::Rgb24;
        }
        self
    }
}

/// Lossy WebP settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebpOptions {
    /// 0-100
    pub quality: u8,
    /// 0 (fast) to 6 (slowest, smallest)
    pub compression_effort: u8,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            quality: 85,
            compression_effort: 6,
        }
    }
}

impl From<&PosterConfig> for WebpOptions {
    fn from(config: &PosterConfig) -> Self {
        Self {
            quality: config.quality,
            compression_effort: config.compression_effort,
        }
    }
}

/// Reads frames from local video files
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Total number of frames as reported by the container (may be approximate)
    async fn frame_count(&self, video: &Path) -> Result<u64>;

    /// Decode the frame at `index`; `None` when nothing can be decoded there
    async fn read_frame(&self, video: &Path, index: u64) -> Result<Option<Frame>>;
}

/// Writes frames as still images
#[async_trait]
pub trait PosterEncoder: Send + Sync {
    async fn encode_webp(&self, frame: &Frame, dest: &Path, options: WebpOptions) -> Result<()>;
}

/// Frame to use as poster: the last one when there are several, else the first
pub fn poster_frame_index(frame_count: u64) -> u64 {
    if frame_count > 1 {
        frame_count - 1
    } else {
        0
    }
}

/// Extracts poster images from downloaded videos
#[derive(Clone)]
pub struct FrameExtractor {
    source: Arc<dyn VideoSource>,
    encoder: Arc<dyn PosterEncoder>,
    options: WebpOptions,
}

impl FrameExtractor {
    pub fn new(
        source: Arc<dyn VideoSource>,
        encoder: Arc<dyn PosterEncoder>,
        options: WebpOptions,
    ) -> Self {
        Self {
            source,
            encoder,
            options,
        }
    }

    /// Extractor backed by the ffmpeg command line tools
    pub fn ffmpeg(config: &PosterConfig) -> Self {
        let backend = Arc::new(FfmpegBackend::new(&config.ffmpeg_path, &config.ffprobe_path));
        Self::new(backend.clone(), backend, WebpOptions::from(config))
    }

    /// Write the last frame of `video` to `dest` as WebP.
    ///
    /// Seeking by frame index is best-effort on compressed containers, so the frame
    /// written may sit slightly before the true last frame.
    pub async fn extract_poster(&self, video: &Path, dest: &Path) -> Result<PathBuf> {
        let frame_count = match self.source.frame_count(video).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Frame count unavailable for {}: {}", video.display(), e);
                0
            }
        };
        let index = poster_frame_index(frame_count);
        debug!(
            "🎞️  {} has {} frames, reading frame {}",
            video.display(),
            frame_count,
            index
        );

        let frame = self
            .source
            .read_frame(video, index)
            .await?
            .filter(Frame::is_complete)
            .ok_or_else(|| AssetError::FrameRead {
                path: video.to_path_buf(),
                index,
            })?
            .into_rgb24();

        self.encoder.encode_webp(&frame, dest, self.options).await?;

        info!(
            "🎨 Poster written: {} ({}x{}, frame {})",
            dest.display(),
            frame.width,
            frame.height,
            index
        );
        Ok(dest.to_path_buf())
    }
}
