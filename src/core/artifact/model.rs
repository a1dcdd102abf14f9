use serde::{Deserialize, Serialize};

/// Release channel of a file, ordered from most to least stable.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Release,
    #[default]
    Beta,
    Alpha,
}

impl Stability {
    /// Position on the stability scale; lower is more stable.
    pub fn rank(self) -> u8 {
        match self {
            Stability::Release => 1,
            Stability::Beta => 2,
            Stability::Alpha => 3,
        }
    }

    /// Whether a file of stability `other` is acceptable when `self` is the
    /// least stable channel the caller is willing to take.
    pub fn admits(self, other: Stability) -> bool {
        other.rank() <= self.rank()
    }
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stability::Release => write!(f, "release"),
            Stability::Beta => write!(f, "beta"),
            Stability::Alpha => write!(f, "alpha"),
        }
    }
}

/// Metadata a provider attaches to a file once it has been resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDetails {
    pub display_name: String,
    pub file_name: String,
    #[serde(default)]
    pub game_versions: Vec<String>,
    pub stability: Stability,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

/// One versioned downloadable file, identified by `(project_id, file_id)`.
///
/// A ref without `details` is a bare placeholder: only the ids are known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    #[serde(rename = "projectID")]
    pub project_id: u32,
    #[serde(rename = "fileID")]
    pub file_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ArtifactDetails>,
}

impl ArtifactRef {
    pub fn new(project_id: u32, file_id: u32) -> Self {
        Self {
            project_id,
            file_id,
            details: None,
        }
    }

    pub fn with_details(mut self, details: ArtifactDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.details.is_some()
    }

    /// Stability of the file. Unresolved refs rank as the least stable channel.
    pub fn stability(&self) -> Stability {
        self.details
            .as_ref()
            .map(|d| d.stability)
            .unwrap_or(Stability::Alpha)
    }

    pub fn game_versions(&self) -> &[String] {
        self.details
            .as_ref()
            .map(|d| d.game_versions.as_slice())
            .unwrap_or(&[])
    }

    pub fn display_name(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.display_name.as_str())
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{} ({}:{})", name, self.project_id, self.file_id),
            None => write!(f, "{}:{}", self.project_id, self.file_id),
        }
    }
}
