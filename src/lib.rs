pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::artifact::{ArtifactDetails, ArtifactRef, FileFilter, FileSet, Stability};
pub use crate::core::diff::DiffResult;
pub use crate::core::downloader::{BatchScheduler, Downloader, FailurePolicy, FileFetcher};
pub use crate::core::error::{ErrorKind, ModpackError, ModpackResult};
pub use crate::core::loaders::{InstallContext, LoaderInstaller};
pub use crate::core::manifest::{InstallSide, Manifest, ManifestEntry, ManifestSource};
pub use crate::core::provider::{ArtifactProvider, CachingProvider};
pub use crate::core::state::{InstalledState, ModRecord};
pub use crate::core::sync::{InstallReport, InstallerConfig, ModpackInstaller};

/// Install a `tracing` subscriber filtered by `RUST_LOG`. Safe to call more
/// than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,modsync_lib=debug")),
        )
        .try_init();
}
