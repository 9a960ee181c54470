//! Storage trait abstraction.

use async_trait::async_trait;

use crate::estfile::EstFile;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Written by a newer est
    #[error("estfile version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Storage abstraction for the estfile.
///
/// The whole document is read and written at once; commands load it, apply
/// one operation, and save it back.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the estfile.
    async fn load(&self) -> Result<EstFile>;

    /// Replace the stored estfile.
    async fn save(&mut self, file: &EstFile) -> Result<()>;
}
