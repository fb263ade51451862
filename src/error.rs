use std::path::PathBuf;
use thiserror::Error;

/// Build error types
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Cannot read {path}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    Configuration { path: PathBuf, reason: String },

    #[error("Invalid directory structure at {path}: {reason}")]
    Structural { path: PathBuf, reason: String },

    #[error("No space left on device for {path}")]
    DiskFull { path: PathBuf },

    #[error("Failed to copy {src} to {dst}")]
    CopyFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Style compilation failed for {path}: {message}")]
    StyleCompile { path: PathBuf, message: String },

    #[error("File watcher error")]
    Watch(#[from] notify::Error),

    #[error("Build cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub(crate) fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn configuration(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuildError::Configuration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn structural(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuildError::Structural {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
