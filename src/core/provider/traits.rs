use async_trait::async_trait;

use crate::core::artifact::ArtifactRef;
use crate::core::error::ModpackResult;

/// Metadata lookups against the mod-hosting platform.
#[async_trait]
pub trait ArtifactProvider: Send + Sync {
    /// Direct download URL of one file.
    async fn resolve_download_url(&self, project_id: u32, file_id: u32) -> ModpackResult<String>;

    async fn resolve_changelog(&self, project_id: u32, file_id: u32) -> ModpackResult<String>;

    /// Every file the platform lists for a project, with details attached.
    async fn list_catalog(&self, project_id: u32) -> ModpackResult<Vec<ArtifactRef>>;
}
