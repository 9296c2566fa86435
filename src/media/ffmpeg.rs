use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{Frame, PixelLayout, PosterEncoder, VideoSource, WebpOptions};
use crate::{AssetError, Result};

/// Stream facts needed to decode a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<u64>,
}

/// Frame decoding and WebP encoding through the ffmpeg command line tools
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: &Path, ffprobe: &Path) -> Self {
        Self {
            ffmpeg: ffmpeg.to_path_buf(),
            ffprobe: ffprobe.to_path_buf(),
        }
    }

    /// Check that both executables can be started
    pub async fn check_installed(&self) -> Result<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            let status = Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map_err(|e| AssetError::Media(format!("{} not available: {}", tool.display(), e)))?;
            if !status.success() {
                return Err(AssetError::Media(format!("{} -version failed", tool.display())));
            }
        }
        Ok(())
    }

    /// Read dimensions and frame count of the first video stream, decoding the
    /// stream to count frames when the container has no total
    pub async fn probe(&self, video: &Path) -> Result<VideoProbe> {
        let mut probe = self.probe_stream(video).await?;
        if probe.frame_count.is_none() {
            probe.frame_count = self.count_frames(video).await?;
        }
        Ok(probe)
    }

    /// Container-level facts only; never decodes
    async fn probe_stream(&self, video: &Path) -> Result<VideoProbe> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height,nb_frames",
                "-of", "json",
            ])
            .arg(video)
            .output()
            .await
            .map_err(|e| AssetError::Media(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(AssetError::Media(format!(
                "ffprobe failed for {}: {}",
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe(&output.stdout)
    }

    /// Decode the whole stream to count frames when the container has no total
    async fn count_frames(&self, video: &Path) -> Result<Option<u64>> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-count_frames",
                "-show_entries", "stream=nb_read_frames",
                "-of", "csv=p=0",
            ])
            .arg(video)
            .output()
            .await
            .map_err(|e| AssetError::Media(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .trim()
            .trim_end_matches(',')
            .parse()
            .ok())
    }
}

fn parse_probe(stdout: &[u8]) -> Result<VideoProbe> {
    let json: serde_json::Value = serde_json::from_slice(stdout)?;
    let stream = json["streams"]
        .as_array()
        .and_then(|streams| streams.first())
        .ok_or_else(|| AssetError::Media("No video stream found".to_string()))?;

    Ok(VideoProbe {
        width: stream["width"].as_u64().unwrap_or(0) as u32,
        height: stream["height"].as_u64().unwrap_or(0) as u32,
        // ffprobe prints nb_frames as a string, or omits it for some containers
        frame_count: stream["nb_frames"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| stream["nb_frames"].as_u64()),
    })
}

#[async_trait]
impl VideoSource for FfmpegBackend {
    async fn frame_count(&self, video: &Path) -> Result<u64> {
        Ok(self.probe(video).await?.frame_count.unwrap_or(0))
    }

    async fn read_frame(&self, video: &Path, index: u64) -> Result<Option<Frame>> {
        // An unreadable container has no frame to offer
        let probe = match self.probe_stream(video).await {
            Ok(probe) => probe,
            Err(e) => {
                debug!("Cannot probe {}: {}", video.display(), e);
                return Ok(None);
            }
        };
        if probe.width == 0 || probe.height == 0 {
            return Ok(None);
        }

        // Rotation metadata is ignored so the buffer matches the probed size.
        // ffmpeg converts from the stream's native pixel format to packed RGB.
        let select = format!("select=eq(n\\,{})", index);
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-noautorotate", "-i"])
            .arg(video)
            .args([
                "-vf", select.as_str(),
                "-vsync", "0",
                "-frames:v", "1",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AssetError::Media(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() || output.stdout.is_empty() {
            debug!(
                "No frame {} in {}: {}",
                index,
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(Some(Frame::new(
            probe.width,
            probe.height,
            PixelLayout::Rgb24,
            output.stdout,
        )))
    }
}

#[async_trait]
impl PosterEncoder for FfmpegBackend {
    async fn encode_webp(&self, frame: &Frame, dest: &Path, options: WebpOptions) -> Result<()> {
        if frame.layout != PixelLayout::Rgb24 {
            return Err(AssetError::Media("WebP encoder expects RGB frames".to_string()));
        }

        let size = format!("{}x{}", frame.width, frame.height);
        let quality = options.quality.to_string();
        let effort = options.compression_effort.to_string();

        let mut child = Command::new(&self.ffmpeg)
            .args([
                "-v", "error",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-s", size.as_str(),
                "-i", "pipe:0",
                "-frames:v", "1",
                "-c:v", "libwebp",
                "-lossless", "0",
                "-quality", quality.as_str(),
                "-compression_level", effort.as_str(),
                "-y",
            ])
            .arg(dest)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AssetError::Media(format!("failed to run ffmpeg: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AssetError::Media("Failed to open ffmpeg stdin".to_string()))?;
        stdin.write_all(&frame.data).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AssetError::Media(format!(
                "WebP encoding failed for {}: {}",
                dest.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
