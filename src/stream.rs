//! Asynchronous JSONL observation stream tailer with rotation detection

use crate::observation::Observation;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Follows a growing JSONL observation file the way `tail -f` would
pub struct TailReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
    inode: Option<u64>,
    poll_interval: Duration,
}

impl TailReader {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            inode: None,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Start tailing the file (seeks to end)
    pub async fn start(&mut self) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;

        #[cfg(unix)]
        {
            let metadata = file.metadata().await?;
            self.inode = Some(metadata.ino());
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(0)).await?;
        self.file = Some(reader);

        log::info!("📖 Tailing observation stream: {}", self.path.display());
        Ok(())
    }

    /// Read the next non-empty line, waiting if necessary
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if self.detect_rotation().await? {
                log::info!(
                    "🔄 Stream rotation detected, reopening: {}",
                    self.path.display()
                );
                self.start().await?;
            }

            if let Some(ref mut reader) = self.file {
                let mut line = String::new();
                match reader.read_line(&mut line).await? {
                    0 => {
                        // No new data yet
                        sleep(self.poll_interval).await;
                        continue;
                    }
                    _ => {
                        if !line.trim().is_empty() {
                            return Ok(Some(line.trim().to_string()));
                        }
                        continue;
                    }
                }
            } else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "stream not opened",
                ));
            }
        }
    }

    /// Read and parse the next observation, skipping malformed lines
    pub async fn read_observation(&mut self) -> std::io::Result<Option<Observation>> {
        loop {
            match self.read_line().await? {
                Some(line) => match Observation::from_jsonl(&line) {
                    Ok(observation) => return Ok(Some(observation)),
                    Err(e) => {
                        log::warn!("skipping malformed observation: {} ({})", e, line);
                        continue;
                    }
                },
                None => return Ok(None),
            }
        }
    }

    /// Detect if the file has been rotated (inode changed)
    async fn detect_rotation(&self) -> std::io::Result<bool> {
        #[cfg(unix)]
        {
            let metadata = tokio::fs::metadata(&self.path).await?;
            let current_inode = metadata.ino();
            Ok(self.inode.map_or(false, |old| old != current_inode))
        }

        #[cfg(not(unix))]
        {
            Ok(false)
        }
    }
}
