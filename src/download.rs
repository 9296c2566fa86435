use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::{AssetError, Result};

/// Buffer size used when writing the response body to disk
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Streams remote videos to local files
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Download `url` to `dest`, replacing any existing file.
    ///
    /// The body is written to `<dest>.part` first and renamed once complete, so a
    /// failed or empty download never leaves a file at `dest`.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("⬇️  Downloading: {}", url);
        let part_path = part_path(dest);

        match self.stream_to(url, &part_path).await {
            Ok(0) => {
                remove_quietly(&part_path).await;
                Err(AssetError::Download(format!("{} returned an empty body", url)))
            }
            Ok(bytes) => {
                tokio::fs::rename(&part_path, dest).await.map_err(|e| {
                    AssetError::Download(format!("cannot move download into {}: {}", dest.display(), e))
                })?;
                info!("✅ Downloaded {} bytes: {}", bytes, dest.display());
                Ok(bytes)
            }
            Err(e) => {
                remove_quietly(&part_path).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssetError::Download(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Download(format!("{} returned HTTP {}", url, status)));
        }

        let file = tokio::fs::File::create(path).await.map_err(|e| {
            AssetError::Download(format!("cannot create {}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AssetError::Download(format!("{}: {}", url, e)))?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        debug!("Wrote {} bytes to {}", written, path.display());
        Ok(written)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
