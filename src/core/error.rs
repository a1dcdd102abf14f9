use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the synchronization engine.
/// Every module returns `Result<T, ModpackError>`.
#[derive(Debug, Error)]
pub enum ModpackError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Manifest source ─────────────────────────────────
    #[error("Manifest source {location} unavailable: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("Manifest not found in {0:?}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    // ── Metadata ────────────────────────────────────────
    #[error("Cannot resolve file {file_id} of project {project_id}: {reason}")]
    UnresolvedArtifact {
        project_id: u32,
        file_id: u32,
        reason: String,
    },

    #[error("No file of project {project_id} matches the manifest constraints")]
    NoMatchingFile { project_id: u32 },

    // ── Filter ──────────────────────────────────────────
    #[error("Invalid id range: lower bound {lower} must be below upper bound {upper}")]
    InvalidIdRange { lower: u32, upper: u32 },

    // ── Configuration ───────────────────────────────────
    #[error("Invalid installer config: {0}")]
    InvalidConfig(String),

    // ── Workers ─────────────────────────────────────────
    #[error("Download worker failed: {0}")]
    Worker(String),

    // ── Loader ──────────────────────────────────────────
    #[error("Loader error: {0}")]
    Loader(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Failure classes a caller can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The manifest source could not be reached or understood.
    Resolution,
    /// An artifact reference could not be turned into a URL or catalog entry.
    Metadata,
    /// Reading, writing or deleting a file failed.
    Filesystem,
    /// A download inside a batch failed.
    Worker,
}

impl ModpackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModpackError::SourceUnavailable { .. }
            | ModpackError::ManifestNotFound(_)
            | ModpackError::InvalidManifest(_)
            | ModpackError::Zip(_) => ErrorKind::Resolution,
            ModpackError::UnresolvedArtifact { .. }
            | ModpackError::NoMatchingFile { .. }
            | ModpackError::InvalidIdRange { .. }
            | ModpackError::Loader(_) => ErrorKind::Metadata,
            ModpackError::Io { .. }
            | ModpackError::Json(_)
            | ModpackError::InvalidConfig(_)
            | ModpackError::Other(_) => ErrorKind::Filesystem,
            ModpackError::Http(_)
            | ModpackError::DownloadFailed { .. }
            | ModpackError::Sha1Mismatch { .. }
            | ModpackError::Worker(_) => ErrorKind::Worker,
        }
    }

    /// Shorthand for an IO error at a known path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModpackError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type ModpackResult<T> = Result<T, ModpackError>;

impl From<std::io::Error> for ModpackError {
    fn from(source: std::io::Error) -> Self {
        ModpackError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for IPC / JSON reports ────────────────
impl serde::Serialize for ModpackError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
