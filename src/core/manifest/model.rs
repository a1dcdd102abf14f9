use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::artifact::{ArtifactRef, Stability};
use crate::core::error::{ModpackError, ModpackResult};

/// Which kind of install is being built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallSide {
    #[default]
    Client,
    Server,
}

impl std::fmt::Display for InstallSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallSide::Client => write!(f, "client"),
            InstallSide::Server => write!(f, "server"),
        }
    }
}

/// Sides a manifest entry applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Universal,
    ClientOnly,
    ServerOnly,
}

impl Role {
    pub fn applies_to(self, side: InstallSide) -> bool {
        match self {
            Role::Universal => true,
            Role::ClientOnly => side == InstallSide::Client,
            Role::ServerOnly => side == InstallSide::Server,
        }
    }
}

/// How the loader version is chosen: `"latest"`, `"recommended"`, or any
/// other string taken as an explicit version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoaderVersionSelector {
    Latest,
    #[default]
    Recommended,
    Explicit(String),
}

impl From<String> for LoaderVersionSelector {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "latest" => LoaderVersionSelector::Latest,
            "recommended" => LoaderVersionSelector::Recommended,
            _ => LoaderVersionSelector::Explicit(raw.trim().to_string()),
        }
    }
}

impl From<LoaderVersionSelector> for String {
    fn from(selector: LoaderVersionSelector) -> Self {
        match selector {
            LoaderVersionSelector::Latest => "latest".into(),
            LoaderVersionSelector::Recommended => "recommended".into(),
            LoaderVersionSelector::Explicit(version) => version,
        }
    }
}

/// One mod requested by a manifest.
///
/// `file_id == 0` asks for the newest catalog file that satisfies the
/// manifest's platform version and minimum stability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "projectID")]
    pub project_id: u32,
    #[serde(rename = "fileID", default)]
    pub file_id: u32,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub related_files: Vec<PathBuf>,
    #[serde(default)]
    pub alternatives: Vec<ManifestEntry>,
}

impl ManifestEntry {
    pub fn new(project_id: u32, file_id: u32) -> Self {
        Self {
            title: String::new(),
            project_id,
            file_id,
            role: Role::Universal,
            related_files: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    pub fn needs_resolution(&self) -> bool {
        self.file_id == 0
    }

    pub fn artifact(&self) -> ArtifactRef {
        ArtifactRef::new(self.project_id, self.file_id)
    }

    /// This entry if its role covers `side`, otherwise the first alternative
    /// (searched depth-first) that does.
    pub fn for_side(&self, side: InstallSide) -> Option<&ManifestEntry> {
        if self.role.applies_to(side) {
            return Some(self);
        }
        self.alternatives.iter().find_map(|alt| alt.for_side(side))
    }

    fn label(&self) -> String {
        if self.title.is_empty() {
            format!("project {}", self.project_id)
        } else {
            self.title.clone()
        }
    }
}

fn default_overrides() -> String {
    "overrides".into()
}

/// Declarative description of a modpack, read from `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub loader_version: LoaderVersionSelector,
    pub platform_version: String,
    #[serde(default)]
    pub minimum_stability: Stability,
    #[serde(default = "default_overrides")]
    pub overrides: String,
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    pub const FILE_NAME: &'static str = "manifest.json";

    pub fn parse(json: &str) -> ModpackResult<Self> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| ModpackError::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read `manifest.json` from a pack root directory.
    pub async fn load_from_dir(root: &Path) -> ModpackResult<Self> {
        let path = root.join(Self::FILE_NAME);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModpackError::ManifestNotFound(root.to_path_buf()))
            }
            Err(e) => return Err(ModpackError::io(path, e)),
        };
        Self::parse(&json)
    }

    fn validate(&self) -> ModpackResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModpackError::InvalidManifest("missing pack name".into()));
        }
        if self.platform_version.trim().is_empty() {
            return Err(ModpackError::InvalidManifest(
                "missing platform version".into(),
            ));
        }
        let overrides = Path::new(&self.overrides);
        if overrides.is_absolute()
            || overrides
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ModpackError::InvalidManifest(format!(
                "override directory {:?} escapes the pack root",
                self.overrides
            )));
        }
        Ok(())
    }

    /// `"<name> <version>"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.version)
    }

    /// Entries that apply to `side`, with alternatives substituted for
    /// entries of the other side and excluded projects removed.
    pub fn entries_for(&self, side: InstallSide, excluded_projects: &[u32]) -> Vec<ManifestEntry> {
        self.files
            .iter()
            .filter_map(|entry| match entry.for_side(side) {
                Some(chosen) => Some(chosen.clone()),
                None => {
                    tracing::debug!("Skipping {} ({} install)", entry.label(), side);
                    None
                }
            })
            .filter(|entry| !excluded_projects.contains(&entry.project_id))
            .collect()
    }

    /// Related files of every entry whose own role excludes `side`. Override
    /// paths under these belong to the other side's install.
    pub fn exclusive_files(&self, side: InstallSide) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|entry| !entry.role.applies_to(side))
            .flat_map(|entry| entry.related_files.iter().cloned())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "name": "Skyfactory",
        "version": "4.2.4",
        "author": "Bacon_Donut",
        "loaderVersion": "latest",
        "platformVersion": "1.12.2",
        "minimumStability": "release",
        "files": [
            { "title": "JEI", "projectID": 238222, "fileID": 2995350 },
            {
                "title": "Shaders",
                "projectID": 100,
                "fileID": 1000,
                "role": "client_only",
                "relatedFiles": ["shaderpacks"],
                "alternatives": [
                    { "title": "Server shim", "projectID": 101, "role": "server_only" }
                ]
            },
            { "title": "Backups", "projectID": 200, "fileID": 2000, "role": "server_only",
              "relatedFiles": ["config/backups.cfg"] }
        ]
    }"#;

    #[test]
    fn parse_applies_defaults() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.overrides, "overrides");
        assert_eq!(manifest.loader_version, LoaderVersionSelector::Latest);
        assert_eq!(manifest.minimum_stability, Stability::Release);
        assert_eq!(manifest.full_name(), "Skyfactory 4.2.4");
        assert_eq!(manifest.files[0].role, Role::Universal);
        assert!(manifest.files[1].alternatives[0].needs_resolution());
    }

    #[test]
    fn explicit_loader_version_round_trips_as_string() {
        let selector = LoaderVersionSelector::from("14.23.5.2860".to_string());
        assert_eq!(
            selector,
            LoaderVersionSelector::Explicit("14.23.5.2860".into())
        );
        assert_eq!(String::from(selector), "14.23.5.2860");
    }

    #[test]
    fn client_entries_drop_server_only_mods() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let ids: Vec<u32> = manifest
            .entries_for(InstallSide::Client, &[])
            .iter()
            .map(|e| e.project_id)
            .collect();
        assert_eq!(ids, vec![238222, 100]);
        assert_eq!(
            manifest.exclusive_files(InstallSide::Client),
            vec![PathBuf::from("config/backups.cfg")]
        );
    }

    #[test]
    fn server_entries_use_alternatives_and_exclusions() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let ids: Vec<u32> = manifest
            .entries_for(InstallSide::Server, &[238222])
            .iter()
            .map(|e| e.project_id)
            .collect();
        assert_eq!(ids, vec![101, 200]);
        assert_eq!(
            manifest.exclusive_files(InstallSide::Server),
            vec![PathBuf::from("shaderpacks")]
        );
    }

    #[test]
    fn rejects_manifest_without_platform_version() {
        let err = Manifest::parse(r#"{ "name": "x", "version": "1", "platformVersion": " " }"#)
            .unwrap_err();
        assert!(matches!(err, ModpackError::InvalidManifest(_)));
    }

    #[test]
    fn rejects_override_dir_outside_root() {
        let err = Manifest::parse(
            r#"{ "name": "x", "version": "1", "platformVersion": "1.20.1", "overrides": "../etc" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModpackError::InvalidManifest(_)));
    }
}
