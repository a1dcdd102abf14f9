// ─── Scratch Space ───
// Temporary paths created while resolving a manifest source. Everything
// tracked here is removed when the run ends, whatever its outcome.

use std::path::PathBuf;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::{ModpackError, ModpackResult};

pub struct ScratchSpace {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl ScratchSpace {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            paths: Vec::new(),
        }
    }

    /// Create a fresh, uniquely named directory and track it for cleanup.
    pub async fn create_dir(&mut self, label: &str) -> ModpackResult<PathBuf> {
        let dir = self.root.join(format!("{}-{}", label, Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ModpackError::io(&dir, e))?;
        self.paths.push(dir.clone());
        Ok(dir)
    }

    /// Reserve a uniquely named file path (not created) and track it.
    pub fn file_path(&mut self, label: &str, extension: &str) -> PathBuf {
        let path = self
            .root
            .join(format!("{}-{}.{}", label, Uuid::new_v4(), extension));
        self.paths.push(path.clone());
        path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every tracked path. Failures are logged, never returned.
    pub async fn cleanup(&mut self) {
        for path in self.paths.drain(..).rev() {
            let result = match tokio::fs::symlink_metadata(&path).await {
                Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&path).await,
                Ok(_) => tokio::fs::remove_file(&path).await,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => debug!("Removed scratch path {:?}", path),
                Err(e) => warn!("Could not remove scratch path {:?}: {}", path, e),
            }
        }
    }
}
