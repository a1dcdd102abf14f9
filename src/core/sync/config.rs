use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::downloader::{is_plain_file_name, FailurePolicy, DEFAULT_MAX_WORKERS};
use crate::core::error::{ModpackError, ModpackResult};
use crate::core::manifest::{InstallSide, ManifestSource};

const APP_DIR_NAME: &str = "modsync";
pub const DEFAULT_STATE_FILE: &str = "modsync_state.json";
pub const DEFAULT_MODS_DIR: &str = "mods";

/// Settings for one modpack install target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallerConfig {
    pub install_dir: PathBuf,
    pub source: Option<ManifestSource>,
    /// State file name, relative to `install_dir`.
    pub state_file_name: String,
    pub mods_dir_name: String,
    pub excluded_project_ids: Vec<u32>,
    pub force_redownload: bool,
    pub side: InstallSide,
    pub reinstall_loader: bool,
    pub delete_old_loader: bool,
    pub max_workers: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub scratch_dir: Option<PathBuf>,
    // Accepted for compatibility; nothing is generated yet.
    pub create_eula: bool,
    pub create_server_starter: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("."),
            source: None,
            state_file_name: DEFAULT_STATE_FILE.into(),
            mods_dir_name: DEFAULT_MODS_DIR.into(),
            excluded_project_ids: Vec::new(),
            force_redownload: false,
            side: InstallSide::Client,
            reinstall_loader: false,
            delete_old_loader: false,
            max_workers: None,
            failure_policy: FailurePolicy::AttemptAll,
            scratch_dir: None,
            create_eula: false,
            create_server_starter: false,
        }
    }
}

impl InstallerConfig {
    pub fn new(install_dir: impl Into<PathBuf>, source: ManifestSource) -> Self {
        Self {
            install_dir: install_dir.into(),
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn with_side(mut self, side: InstallSide) -> Self {
        self.side = side;
        self
    }

    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = Some(n);
        self
    }

    pub fn with_force_redownload(mut self, force: bool) -> Self {
        self.force_redownload = force;
        self
    }

    pub fn with_excluded_projects(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.excluded_project_ids = ids.into_iter().collect();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_state_file_name(mut self, name: impl Into<String>) -> Self {
        self.state_file_name = name.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_loader_flags(mut self, reinstall: bool, delete_old: bool) -> Self {
        self.reinstall_loader = reinstall;
        self.delete_old_loader = delete_old;
        self
    }

    pub fn state_path(&self) -> PathBuf {
        self.install_dir.join(&self.state_file_name)
    }

    pub fn worker_limit(&self) -> usize {
        self.max_workers.unwrap_or(DEFAULT_MAX_WORKERS).max(1)
    }

    /// Directory scratch paths are created under.
    pub fn scratch_root(&self) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join("scratch"))
                .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME)),
        }
    }

    /// Reject names that would place mods or the state file outside
    /// `install_dir`.
    pub fn validate(&self) -> ModpackResult<()> {
        if !is_relative_inside(Path::new(&self.mods_dir_name)) {
            return Err(ModpackError::InvalidConfig(format!(
                "mods directory {:?} must be a relative path inside the install dir",
                self.mods_dir_name
            )));
        }
        if !is_plain_file_name(&self.state_file_name) {
            return Err(ModpackError::InvalidConfig(format!(
                "state file name {:?} must be a plain file name",
                self.state_file_name
            )));
        }
        Ok(())
    }

    pub async fn load(path: &Path) -> ModpackResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ModpackError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save(&self, path: &Path) -> ModpackResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ModpackError::io(path, e))
    }
}

fn is_relative_inside(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}
