use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::artifact::{ArtifactRef, FileSet};
use crate::core::error::{ModpackError, ModpackResult};

/// One mod file written by a previous run. Paths are relative to the
/// install root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModRecord {
    pub project_id: u32,
    pub file_id: u32,
    pub location: PathBuf,
    #[serde(default)]
    pub related_files: Vec<PathBuf>,
}

impl ModRecord {
    pub fn artifact(&self) -> ArtifactRef {
        ArtifactRef::new(self.project_id, self.file_id)
    }

    /// The mod file followed by its related files.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.location).chain(self.related_files.iter())
    }
}

/// Snapshot of what the last successful run wrote, persisted as JSON next
/// to the installed pack.
///
/// Only ever replaced as a whole: a run builds a fresh value in memory and
/// saves it once every other phase has succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstalledState {
    #[serde(default)]
    pub pack_name: String,
    #[serde(default)]
    pub pack_version: String,
    pub loader_version: String,
    pub platform_version: String,
    #[serde(default)]
    pub mods: Vec<ModRecord>,
    #[serde(default)]
    pub override_files: Vec<PathBuf>,
    pub installed_at: DateTime<Utc>,
}

impl InstalledState {
    pub fn new(
        pack_name: impl Into<String>,
        pack_version: impl Into<String>,
        platform_version: impl Into<String>,
        loader_version: impl Into<String>,
    ) -> Self {
        Self {
            pack_name: pack_name.into(),
            pack_version: pack_version.into(),
            loader_version: loader_version.into(),
            platform_version: platform_version.into(),
            mods: Vec::new(),
            override_files: Vec::new(),
            installed_at: Utc::now(),
        }
    }

    /// Read a state file. A missing file means nothing was installed yet and
    /// yields `None`; a file that exists but cannot be parsed is an error.
    pub async fn load(path: &Path) -> ModpackResult<Option<Self>> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No installed state at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(ModpackError::io(path, e)),
        };

        let state: InstalledState = serde_json::from_str(&json)?;
        debug!(
            "Loaded installed state: {} mods, {} override files",
            state.mods.len(),
            state.override_files.len()
        );
        Ok(Some(state))
    }

    /// Replace the state file at `path` with this snapshot.
    ///
    /// Writes a sibling temporary file first and renames it over the target.
    pub async fn save(&self, path: &Path) -> ModpackResult<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ModpackError::io(parent, e))?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| ModpackError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| ModpackError::io(path, e))?;

        Ok(())
    }

    /// The record written for exactly this project and file.
    pub fn record_for(&self, artifact: &ArtifactRef) -> Option<&ModRecord> {
        self.mods
            .iter()
            .find(|m| m.project_id == artifact.project_id && m.file_id == artifact.file_id)
    }

    /// Installed mods as a file set, for diffing against a manifest.
    pub fn file_set(&self) -> FileSet {
        self.mods.iter().map(ModRecord::artifact).collect()
    }

    pub fn add_mod(&mut self, record: ModRecord) {
        self.mods.push(record);
    }

    pub fn add_override_file(&mut self, path: PathBuf) {
        if !self.override_files.contains(&path) {
            self.override_files.push(path);
        }
    }

    /// Sort records so equal installs serialize identically.
    pub fn normalize(&mut self) {
        self.mods.sort_by_key(|m| (m.project_id, m.file_id));
        self.override_files.sort();
    }
}
