use async_trait::async_trait;
use serde::Serialize;

use crate::core::error::ModpackResult;
use crate::core::manifest::LoaderVersionSelector;
use crate::core::state::InstalledState;

use super::context::InstallContext;

/// Installs the mod loader / runtime a pack runs on.
#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    /// Turn `latest` / `recommended` / explicit into a concrete version.
    async fn resolve_version(
        &self,
        platform_version: &str,
        selector: &LoaderVersionSelector,
    ) -> ModpackResult<String>;

    async fn install(&self, ctx: InstallContext<'_>) -> ModpackResult<()>;

    async fn uninstall(&self, ctx: InstallContext<'_>) -> ModpackResult<()>;
}

/// Whether this run touches the loader, decided before any mod work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderPlan {
    pub version: String,
    /// Loader version recorded by the previous run, if any.
    pub previous: Option<String>,
    pub install: bool,
    pub remove_previous: bool,
}

impl LoaderPlan {
    /// Install when forced, on first install, or when the loader or platform
    /// version moved. The old loader is removed only when asked to and only
    /// if it differs from the one being installed.
    pub fn decide(
        version: String,
        platform_version: &str,
        previous: Option<&InstalledState>,
        force_reinstall: bool,
        delete_old: bool,
    ) -> Self {
        let previous_version = previous
            .map(|state| state.loader_version.clone())
            .filter(|v| !v.is_empty());

        let changed = match previous {
            Some(state) => {
                state.loader_version != version || state.platform_version != platform_version
            }
            None => true,
        };
        let install = force_reinstall || changed;
        let remove_previous = install
            && delete_old
            && previous_version
                .as_deref()
                .is_some_and(|old| old != version);

        Self {
            version,
            previous: previous_version,
            install,
            remove_previous,
        }
    }
}
