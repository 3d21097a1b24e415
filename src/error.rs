use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Broad failure classes, used by non-interactive callers to decide what to do
/// with a failed install without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The host or the asset can never work (unsupported platform or archive type).
    Configuration,
    /// The release API or asset download could not be reached or answered non-2xx.
    Transport,
    /// The downloaded archive could not be opened or extracted.
    Archive,
    /// Local disk trouble: temp file, lock, copy, permissions.
    Io,
    /// The release does not offer an asset for this host.
    AssetSelection,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Unsupported OS: {0}")]
    UnsupportedOperatingSystem(String),

    #[error("Unsupported archive extension: {0}.")]
    UnsupportedArchiveExtension(String),

    #[error("No assets found in the latest release.")]
    NoAssetsInRelease,

    #[error("No matching asset found for platform {suffix}.")]
    NoMatchingAsset { suffix: String },

    #[error("GitHub API request failed ({status}): {url}")]
    RequestFailed { status: StatusCode, url: String },

    #[error("Failed to request {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read download stream: {0}")]
    StreamRead(String),

    #[error("Failed to write to file {}: {source}", path.display())]
    StreamWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open ZIP archive {}: {source}", path.display())]
    ArchiveOpenFailure {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to extract archive {}: {details}", path.display())]
    ArchiveExtractFailure { path: PathBuf, details: String },

    #[error("Failed to create temporary file in {}: {source}", dir.display())]
    TempFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to acquire install lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid repository identifier '{0}'")]
    InvalidRepository(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::UnsupportedArchitecture(_)
            | InstallError::UnsupportedOperatingSystem(_)
            | InstallError::UnsupportedArchiveExtension(_)
            | InstallError::InvalidRepository(_) => ErrorKind::Configuration,
            InstallError::NoAssetsInRelease | InstallError::NoMatchingAsset { .. } => {
                ErrorKind::AssetSelection
            }
            InstallError::RequestFailed { .. }
            | InstallError::Transport { .. }
            | InstallError::StreamRead(_) => ErrorKind::Transport,
            InstallError::ArchiveOpenFailure { .. }
            | InstallError::ArchiveExtractFailure { .. } => ErrorKind::Archive,
            InstallError::StreamWriteFailure { .. }
            | InstallError::TempFile { .. }
            | InstallError::Lock { .. }
            | InstallError::Io(_) => ErrorKind::Io,
        }
    }
}
