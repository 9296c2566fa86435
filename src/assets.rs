//! Asset pair layout and completeness checks

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{AssetError, Result};

const VIDEO_SUFFIX: &str = "_video.mp4";
const POSTER_SUFFIX: &str = "_poster.webp";

/// What exists on disk for one effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssetStatus {
    Missing,
    VideoOnly,
    PosterOnly,
    Complete,
}

impl AssetStatus {
    pub fn status_string(&self) -> &'static str {
        match self {
            AssetStatus::Missing => "missing",
            AssetStatus::VideoOnly => "video only",
            AssetStatus::PosterOnly => "poster only",
            AssetStatus::Complete => "complete",
        }
    }
}

/// The video and poster files of one effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    id: String,
    video_path: PathBuf,
    poster_path: PathBuf,
}

impl AssetPair {
    pub fn new(output_dir: &Path, id: &str) -> Self {
        Self {
            id: id.to_string(),
            video_path: output_dir.join(format!("{}{}", id, VIDEO_SUFFIX)),
            poster_path: output_dir.join(format!("{}{}", id, POSTER_SUFFIX)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn poster_path(&self) -> &Path {
        &self.poster_path
    }

    pub fn has_video(&self) -> bool {
        is_non_empty_file(&self.video_path)
    }

    pub fn has_poster(&self) -> bool {
        is_non_empty_file(&self.poster_path)
    }

    pub fn status(&self) -> AssetStatus {
        match (self.has_video(), self.has_poster()) {
            (true, true) => AssetStatus::Complete,
            (true, false) => AssetStatus::VideoOnly,
            (false, true) => AssetStatus::PosterOnly,
            (false, false) => AssetStatus::Missing,
        }
    }

    /// Both files present and non-empty; anything less must be regenerated
    pub fn is_complete(&self) -> bool {
        self.status() == AssetStatus::Complete
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Find every downloaded video in `output_dir`, sorted by effect id
pub fn scan_videos(output_dir: &Path) -> Result<Vec<AssetPair>> {
    if !output_dir.is_dir() {
        return Err(AssetError::Config(format!(
            "Output directory does not exist: {}",
            output_dir.display()
        )));
    }

    let mut pairs = Vec::new();
    for entry in WalkDir::new(output_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| AssetError::Io(std::io::Error::other(e)))?;
        let name = entry.file_name().to_string_lossy();
        if let Some(id) = name.strip_suffix(VIDEO_SUFFIX) {
            if !id.is_empty() && entry.file_type().is_file() {
                pairs.push(AssetPair::new(output_dir, id));
            }
        }
    }

    pairs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(pairs)
}

/// Pairs whose poster still has to be created
pub fn missing_posters(pairs: Vec<AssetPair>) -> Vec<AssetPair> {
    pairs.into_iter().filter(|pair| !pair.has_poster()).collect()
}
