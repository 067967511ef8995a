//! services/api/src/adapters/uploads.rs
//!
//! Local-disk implementation of the `PhotoStorage` port. Files live in one flat
//! directory and are named `photo-<unix-millis>-<9 random digits><.ext>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citizen_registry_core::domain::{Photo, StoredFile};
use citizen_registry_core::ports::{PhotoStorage, PortError, PortResult};
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// How often `stage` retries when a generated name is already taken.
const MAX_NAME_ATTEMPTS: usize = 5;

/// A photo storage adapter rooted at the uploads directory.
#[derive(Clone, Debug)]
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the uploads directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    fn path_for(&self, stored_file_name: &str) -> PortResult<PathBuf> {
        if !is_plain_file_name(stored_file_name) {
            return Err(PortError::InvalidInput(format!(
                "Invalid file name: {}",
                stored_file_name
            )));
        }
        Ok(self.root.join(stored_file_name))
    }
}

/// True for a single path component that cannot escape the uploads directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Builds a stored file name from the upload's original name.
///
/// The original extension is kept verbatim when it is purely alphanumeric and
/// dropped otherwise.
pub fn stored_file_name(original_file_name: &str, unix_millis: i64, suffix: u32) -> String {
    let extension = Path::new(original_file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("photo-{}-{:09}{}", unix_millis, suffix, extension)
}

fn fresh_file_name(original_file_name: &str) -> String {
    let suffix = rand::thread_rng().gen_range(0..1_000_000_000u32);
    stored_file_name(original_file_name, Utc::now().timestamp_millis(), suffix)
}

fn io_error(context: &str, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", context, e))
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn stage(&self, original_file_name: &str, data: &[u8]) -> PortResult<Photo> {
        self.ensure_dir()
            .await
            .map_err(|e| io_error("Cannot create uploads directory", e))?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = fresh_file_name(original_file_name);
            let path = self.root.join(&name);

            // create_new refuses to overwrite, so a name is never handed out twice.
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Generated file name {} already taken, retrying", name);
                    continue;
                }
                Err(e) => return Err(io_error("Cannot write photo", e)),
            };

            let written = async {
                file.write_all(data).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                // Do not leave a truncated file behind.
                let _ = tokio::fs::remove_file(&path).await;
                return Err(io_error("Cannot write photo", e));
            }

            info!("Staged photo {} ({} bytes)", name, data.len());
            return Ok(Photo {
                stored_file_name: name,
                original_file_name: original_file_name.to_string(),
                captured_at: Utc::now(),
            });
        }

        Err(PortError::Unexpected(
            "Could not generate a unique photo file name".to_string(),
        ))
    }

    async fn remove(&self, stored_file_name: &str) -> PortResult<()> {
        let path = self.path_for(stored_file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted photo file {}", stored_file_name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("Cannot delete photo", e)),
        }
    }

    async fn exists(&self, stored_file_name: &str) -> PortResult<bool> {
        let path = self.path_for(stored_file_name)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error("Cannot check photo", e))
    }

    async fn list(&self) -> PortResult<Vec<StoredFile>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("Cannot read uploads directory", e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("Cannot read uploads directory", e))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| io_error("Cannot read file metadata", e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            files.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
