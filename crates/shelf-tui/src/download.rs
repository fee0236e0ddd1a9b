//! Download manager for catalog tracks.
//!
//! Handles async downloading with per-track status tracking. The limiter
//! gate lives in the app: by the time `start_download` runs, the download
//! has already been Allowed. Network failures here are reported per item
//! and never touch limiter state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info};

use shelf_core::catalog::TrackRecord;

/// Download status for a track.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadStatus {
    Downloading,
    /// Downloaded and available at path
    Done(PathBuf),
    /// Download failed with error message
    Failed(String),
}

/// Progress update from a download task.
#[derive(Debug, Clone)]
pub struct DownloadUpdate {
    pub track_id: u64,
    pub filename: String,
    pub status: DownloadStatus,
}

pub struct DownloadManager {
    statuses: HashMap<u64, DownloadStatus>,
    download_dir: PathBuf,
    progress_tx: mpsc::Sender<DownloadUpdate>,
    progress_rx: mpsc::Receiver<DownloadUpdate>,
}

impl DownloadManager {
    pub fn new(download_dir: PathBuf) -> Self {
        let (progress_tx, progress_rx) = mpsc::channel(100);
        Self {
            statuses: HashMap::new(),
            download_dir,
            progress_tx,
            progress_rx,
        }
    }

    /// Start downloading a track. Spawns the transfer and returns
    /// immediately; completion arrives through `drain_updates`.
    pub fn start_download(&mut self, track: &TrackRecord) -> Result<(), String> {
        if let Some(DownloadStatus::Downloading) = self.statuses.get(&track.id) {
            return Err("already downloading".to_string());
        }

        info!("starting download of {} ({})", track.filename, track.url);
        self.statuses.insert(track.id, DownloadStatus::Downloading);

        let dest = self.download_dir.join(&track.filename);
        let url = track.url.clone();
        let track_id = track.id;
        let filename = track.filename.clone();
        let progress_tx = self.progress_tx.clone();

        tokio::spawn(async move {
            let status = match do_download(&url, &dest).await {
                Ok(()) => {
                    info!("download complete: {}", dest.display());
                    DownloadStatus::Done(dest)
                }
                Err(e) => {
                    error!("download of {} failed: {}", filename, e);
                    DownloadStatus::Failed(e.to_string())
                }
            };

            let _ = progress_tx
                .send(DownloadUpdate {
                    track_id,
                    filename,
                    status,
                })
                .await;
        });

        Ok(())
    }

    /// Collect pending progress updates and fold them into the status map.
    /// Returns the drained updates so the caller can toast on completion.
    pub fn drain_updates(&mut self) -> Vec<DownloadUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.progress_rx.try_recv() {
            self.statuses.insert(update.track_id, update.status.clone());
            updates.push(update);
        }
        updates
    }

    pub fn status(&self, track_id: u64) -> Option<&DownloadStatus> {
        self.statuses.get(&track_id)
    }

    pub fn active_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| matches!(s, DownloadStatus::Downloading))
            .count()
    }
}

async fn do_download(url: &str, dest: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = reqwest::get(url).await?.error_for_status()?;
    let mut stream = response.bytes_stream();

    let mut file = tokio::fs::File::create(dest).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
