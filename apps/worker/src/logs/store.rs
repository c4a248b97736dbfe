use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const LIVE_SUFFIX: &str = ".log";
const ARCHIVE_SUFFIX: &str = ".gz.b64";

#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("Log I/O failed for '{id}': {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive '{0}' already exists")]
    AlreadyExists(String),

    #[error("Compression failed for '{id}': {source}")]
    Compression {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive '{id}' is not valid base64: {source}")]
    Decode {
        id: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Directory of live logs and compressed archives
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn live_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}{LIVE_SUFFIX}"))
    }

    fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.dir.join(format!("{archive_id}{ARCHIVE_SUFFIX}"))
    }

    /// Append one newline-terminated line, creating the log if needed
    pub async fn append(&self, id: &str, line: &str) -> Result<(), LogStoreError> {
        let io = |source: std::io::Error| LogStoreError::Io { id: id.to_string(), source };

        fs::create_dir_all(&self.dir).await.map_err(io)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.live_path(id))
            .await
            .map_err(io)?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes()).await.map_err(io)?;
        file.flush().await.map_err(io)
    }

    /// Ids of live logs, plus archive ids when `include_archived` is set
    pub async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogStoreError> {
        let io = |source: std::io::Error| LogStoreError::Io { id: self.dir.display().to_string(), source };

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(id) = name.strip_suffix(LIVE_SUFFIX) {
                ids.push(id.to_string());
            } else if let Some(id) = name.strip_suffix(ARCHIVE_SUFFIX) {
                if include_archived {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Read the live log of `id` in full
    pub async fn read(&self, id: &str) -> Result<Vec<u8>, LogStoreError> {
        fs::read(self.live_path(id))
            .await
            .map_err(|source| LogStoreError::Io { id: id.to_string(), source })
    }

    /// Whether the live log of `id` holds no content
    pub async fn is_empty(&self, id: &str) -> Result<bool, LogStoreError> {
        let metadata = fs::metadata(self.live_path(id))
            .await
            .map_err(|source| LogStoreError::Io { id: id.to_string(), source })?;
        Ok(metadata.len() == 0)
    }

    /// Compress the live log of `id` into a new archive `archive_id`.
    ///
    /// Returns the number of uncompressed bytes archived. Never overwrites:
    /// an existing archive with the same id is an error.
    pub async fn compress(&self, id: &str, archive_id: &str) -> Result<usize, LogStoreError> {
        let content = self.read(id).await?;
        let encoded = STANDARD.encode(gzip(&content).map_err(|source| {
            LogStoreError::Compression { id: id.to_string(), source }
        })?);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.archive_path(archive_id))
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => LogStoreError::AlreadyExists(archive_id.to_string()),
                _ => LogStoreError::Io { id: archive_id.to_string(), source },
            })?;

        let io = |source: std::io::Error| LogStoreError::Io { id: archive_id.to_string(), source };
        file.write_all(encoded.as_bytes()).await.map_err(io)?;
        file.flush().await.map_err(io)?;

        Ok(content.len())
    }

    /// Decompress an archive back into the exact bytes that were archived
    pub async fn decompress(&self, archive_id: &str) -> Result<Vec<u8>, LogStoreError> {
        let encoded = fs::read_to_string(self.archive_path(archive_id))
            .await
            .map_err(|source| LogStoreError::Io { id: archive_id.to_string(), source })?;

        let compressed = STANDARD
            .decode(encoded.trim())
            .map_err(|source| LogStoreError::Decode { id: archive_id.to_string(), source })?;

        gunzip(&compressed)
            .map_err(|source| LogStoreError::Compression { id: archive_id.to_string(), source })
    }

    /// Empty the live log of `id`
    pub async fn truncate(&self, id: &str) -> Result<(), LogStoreError> {
        let io = |source: std::io::Error| LogStoreError::Io { id: id.to_string(), source };
        let file = fs::OpenOptions::new().write(true).open(self.live_path(id)).await.map_err(io)?;
        file.set_len(0).await.map_err(io)
    }
}

pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    GzDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(decoded)
}
