//! JSON file storage implementation.
//!
//! Stores the estfile as a single pretty-printed JSON document. Writes go to
//! a sibling temporary file which is then renamed over the estfile, so a
//! crash mid-write leaves the previous version intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{EstFile, Result, Storage, StorageError, ESTFILE_VERSION};

/// Owner read/write only; the estfile is a personal work log.
#[cfg(unix)]
const ESTFILE_MODE: u32 = 0o600;

/// File-based JSON storage backend.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Open the estfile at `path`, creating it from `init` if it doesn't
    /// exist yet. An existing file is never overwritten here.
    pub async fn open<F>(path: impl AsRef<Path>, init: F) -> Result<Self>
    where
        F: FnOnce() -> EstFile,
    {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        match new_file(&path).await {
            Ok(mut file) => {
                let json = serde_json::to_string_pretty(&init())?;
                file.write_all(json.as_bytes()).await?;
                file.sync_all().await?;
                info!(path = %path.display(), "created estfile");
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "using existing estfile");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self { path })
    }

    /// Location of the estfile.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn load(&self) -> Result<EstFile> {
        let json = fs::read_to_string(&self.path).await?;
        let file: EstFile = serde_json::from_str(&json)?;
        if file.version > ESTFILE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: file.version,
                supported: ESTFILE_VERSION,
            });
        }
        debug!(path = %self.path.display(), tasks = file.tasks.len(), "loaded estfile");
        Ok(file)
    }

    async fn save(&mut self, file: &EstFile) -> Result<()> {
        let json = serde_json::to_string_pretty(file)?;
        let temp = self.temp_path();
        // A stale temp file from an interrupted save is simply replaced.
        match fs::remove_file(&temp).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut out = new_file(&temp).await?;
        out.write_all(json.as_bytes()).await?;
        out.sync_all().await?;
        drop(out);
        fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), tasks = file.tasks.len(), "saved estfile");
        Ok(())
    }
}

/// Create `path` exclusively, failing with `AlreadyExists` if it's there.
async fn new_file(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(ESTFILE_MODE);
    options.open(path).await
}
