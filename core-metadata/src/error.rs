use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read tags: {0}")]
    ReadFailed(String),

    #[error("Failed to write tags: {0}")]
    WriteFailed(String),

    #[error("Backup failed: {0}")]
    BackupFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
