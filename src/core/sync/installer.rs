use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::InstallerConfig;
use super::fsops::{prune_empty_dirs, remove_recorded, resolve_inside};
use super::overrides::{OverrideTree, Placeholders, TransferMode};
use crate::core::artifact::{ArtifactRef, FileFilter, FileSet};
use crate::core::diff::DiffResult;
use crate::core::downloader::{
    file_name_from_url, is_plain_file_name, BatchScheduler, FileFetcher,
};
use crate::core::error::{ModpackError, ModpackResult};
use crate::core::loaders::{InstallContext, LoaderInstaller, LoaderPlan};
use crate::core::manifest::{InstallSide, Manifest, ManifestEntry, ResolvedSource};
use crate::core::provider::ArtifactProvider;
use crate::core::scratch::ScratchSpace;
use crate::core::state::{InstalledState, ModRecord};

/// A manifest entry paired with the concrete file it installs.
#[derive(Debug, Clone)]
pub struct PlannedMod {
    pub entry: ManifestEntry,
    pub artifact: ArtifactRef,
}

/// What a run keeps, fetches and deletes, derived from the previous state
/// and the planned mods.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub retained: Vec<ModRecord>,
    pub to_download: Vec<PlannedMod>,
    /// Relative paths recorded by the previous run that must go.
    pub stale_paths: Vec<PathBuf>,
}

impl SyncPlan {
    /// Retain a previous record only when the planned file id is identical,
    /// no redownload is forced and the recorded file is still on disk.
    pub fn build(
        install_dir: &Path,
        previous: Option<&InstalledState>,
        planned: Vec<PlannedMod>,
        overrides: &OverrideTree,
        force_redownload: bool,
    ) -> Self {
        let Some(previous) = previous else {
            return Self {
                to_download: planned,
                ..Self::default()
            };
        };

        let planned_set: FileSet = planned.iter().map(|p| p.artifact.clone()).collect();
        let diff = DiffResult::compute(&previous.file_set(), &planned_set);
        let unchanged: BTreeSet<(u32, u32)> = diff
            .unchanged
            .iter()
            .map(|a| (a.project_id, a.file_id))
            .collect();

        let mut plan = SyncPlan::default();
        let mut kept_keys = BTreeSet::new();

        for planned_mod in planned {
            let key = (planned_mod.artifact.project_id, planned_mod.artifact.file_id);
            let record = previous.record_for(&planned_mod.artifact);

            match record {
                Some(record)
                    if !force_redownload
                        && unchanged.contains(&key)
                        && file_present(install_dir, &record.location) =>
                {
                    kept_keys.insert(key);
                    plan.retained.push(ModRecord {
                        related_files: planned_mod.entry.related_files.clone(),
                        ..record.clone()
                    });
                }
                _ => plan.to_download.push(planned_mod),
            }
        }

        let kept_paths: BTreeSet<&PathBuf> =
            plan.retained.iter().flat_map(ModRecord::paths).collect();
        let mut stale = BTreeSet::new();

        for record in &previous.mods {
            if kept_keys.contains(&(record.project_id, record.file_id)) {
                continue;
            }
            stale.extend(record.paths().filter(|p| !kept_paths.contains(p)).cloned());
        }
        for path in &previous.override_files {
            if !overrides.contains_file(path) && !kept_paths.contains(&path) {
                stale.insert(path.clone());
            }
        }

        plan.stale_paths = stale.into_iter().collect();
        plan
    }
}

fn file_present(install_dir: &Path, relative: &Path) -> bool {
    resolve_inside(install_dir, relative).is_some_and(|path| path.is_file())
}

/// Summary of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub retained: usize,
    pub downloaded: Vec<ModRecord>,
    pub deleted: Vec<PathBuf>,
    pub override_files: usize,
    pub loader_installed: bool,
    pub pruned_dirs: usize,
    pub state: InstalledState,
}

/// Drives one synchronization run of an install directory against a
/// modpack manifest.
pub struct ModpackInstaller {
    config: InstallerConfig,
    provider: Arc<dyn ArtifactProvider>,
    fetcher: Arc<dyn FileFetcher>,
    loader: Arc<dyn LoaderInstaller>,
}

impl ModpackInstaller {
    pub fn new(
        config: InstallerConfig,
        provider: Arc<dyn ArtifactProvider>,
        fetcher: Arc<dyn FileFetcher>,
        loader: Arc<dyn LoaderInstaller>,
    ) -> ModpackResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            fetcher,
            loader,
        })
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Run every phase. Scratch paths are removed whether or not the run
    /// succeeds; the state file is only written when everything before it
    /// succeeded.
    pub async fn install(&self) -> ModpackResult<InstallReport> {
        let mut scratch = ScratchSpace::new(self.config.scratch_root());
        let result = self.run(&mut scratch).await;
        scratch.cleanup().await;

        match &result {
            Ok(report) => info!(
                "Install finished: {} retained, {} downloaded, {} deleted",
                report.retained,
                report.downloaded.len(),
                report.deleted.len()
            ),
            Err(e) => warn!("Install failed: {}", e),
        }
        result
    }

    async fn run(&self, scratch: &mut ScratchSpace) -> ModpackResult<InstallReport> {
        let config = &self.config;
        let install_dir = config.install_dir.as_path();

        // Source
        let source = config.source.as_ref().ok_or_else(|| {
            ModpackError::InvalidManifest("no manifest source configured".into())
        })?;
        let resolved = source
            .resolve(self.provider.as_ref(), self.fetcher.as_ref(), scratch)
            .await?;
        let manifest = &resolved.manifest;
        info!(
            "Installing {} ({} side) into {:?}",
            manifest.full_name(),
            config.side,
            install_dir
        );

        // Role filtering
        let entries = manifest.entries_for(config.side, &config.excluded_project_ids);
        let overrides = OverrideTree::scan(
            resolved.overrides_dir(),
            &manifest.exclusive_files(config.side),
        )
        .await?;
        let planned = self.plan_mods(manifest, entries).await?;

        // Retain / delete
        let previous = InstalledState::load(&config.state_path()).await?;
        let loader_version = self
            .loader
            .resolve_version(&manifest.platform_version, &manifest.loader_version)
            .await?;
        let loader_plan = LoaderPlan::decide(
            loader_version,
            &manifest.platform_version,
            previous.as_ref(),
            config.reinstall_loader,
            config.delete_old_loader,
        );

        let plan = SyncPlan::build(
            install_dir,
            previous.as_ref(),
            planned,
            &overrides,
            config.force_redownload,
        );
        let deleted = self.delete_stale(&plan.stale_paths).await?;

        let mut state = InstalledState::new(
            &manifest.name,
            &manifest.version,
            &manifest.platform_version,
            &loader_plan.version,
        );
        let retained = plan.retained.len();
        for record in plan.retained {
            state.add_mod(record);
        }

        // Overrides
        let copied = self.copy_overrides(&resolved, &overrides).await?;
        let override_count = copied.len();
        for path in copied {
            state.add_override_file(path);
        }

        // Downloads
        let downloaded = self.download_mods(plan.to_download).await?;
        for record in &downloaded {
            state.add_mod(record.clone());
        }

        // Loader
        let loader_installed = self.apply_loader(&loader_plan, manifest).await?;
        self.write_extras();

        let pruned_dirs = prune_empty_dirs(install_dir).await;
        debug!("Pruned {} empty directories", pruned_dirs);

        state.normalize();
        state.save(&config.state_path()).await?;

        Ok(InstallReport {
            retained,
            downloaded,
            deleted,
            override_files: override_count,
            loader_installed,
            pruned_dirs,
            state,
        })
    }

    /// Pin every entry to a concrete file, resolving `fileID == 0` against
    /// the provider's catalog. Entries pinned to a file already planned are
    /// dropped; the first one wins.
    async fn plan_mods(
        &self,
        manifest: &Manifest,
        entries: Vec<ManifestEntry>,
    ) -> ModpackResult<Vec<PlannedMod>> {
        let mut planned = Vec::with_capacity(entries.len());
        let mut seen = BTreeSet::new();
        for entry in entries {
            let artifact = if entry.needs_resolution() {
                self.latest_matching(manifest, entry.project_id).await?
            } else {
                entry.artifact()
            };
            if !seen.insert(artifact.file_id) {
                debug!("Skipping duplicate entry for {}", artifact);
                continue;
            }
            planned.push(PlannedMod { entry, artifact });
        }
        Ok(planned)
    }

    async fn latest_matching(
        &self,
        manifest: &Manifest,
        project_id: u32,
    ) -> ModpackResult<ArtifactRef> {
        let mut catalog: FileSet = self
            .provider
            .list_catalog(project_id)
            .await?
            .into_iter()
            .collect();
        let filter = FileFilter::new(
            [manifest.platform_version.as_str()],
            0,
            u32::MAX,
            manifest.minimum_stability,
        )?;
        catalog.filter(&filter);

        let latest = catalog
            .latest()
            .cloned()
            .ok_or(ModpackError::NoMatchingFile { project_id })?;
        debug!("Resolved project {} to {}", project_id, latest);
        Ok(latest)
    }

    async fn delete_stale(&self, stale: &[PathBuf]) -> ModpackResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();
        for path in stale {
            if remove_recorded(&self.config.install_dir, path).await? {
                deleted.push(path.clone());
            }
        }
        if !deleted.is_empty() {
            info!("Deleted {} files from the previous install", deleted.len());
        }
        Ok(deleted)
    }

    async fn copy_overrides(
        &self,
        resolved: &ResolvedSource,
        overrides: &OverrideTree,
    ) -> ModpackResult<Vec<PathBuf>> {
        let mode = if resolved.in_scratch {
            TransferMode::Move
        } else {
            TransferMode::Copy
        };
        let placeholders = Placeholders::from_manifest(&resolved.manifest);
        overrides
            .apply(&self.config.install_dir, &placeholders, mode)
            .await
    }

    async fn download_mods(&self, mods: Vec<PlannedMod>) -> ModpackResult<Vec<ModRecord>> {
        if mods.is_empty() {
            return Ok(Vec::new());
        }

        let scheduler =
            BatchScheduler::new(self.config.worker_limit()).with_policy(self.config.failure_policy);
        let provider = Arc::clone(&self.provider);
        let fetcher = Arc::clone(&self.fetcher);
        let install_dir = self.config.install_dir.clone();
        let mods_dir = PathBuf::from(&self.config.mods_dir_name);

        scheduler
            .run(mods, move |planned| {
                let provider = Arc::clone(&provider);
                let fetcher = Arc::clone(&fetcher);
                let install_dir = install_dir.clone();
                let mods_dir = mods_dir.clone();
                async move {
                    download_one(
                        planned,
                        provider.as_ref(),
                        fetcher.as_ref(),
                        &install_dir,
                        &mods_dir,
                    )
                    .await
                }
            })
            .await
            .into_result()
    }

    async fn apply_loader(&self, plan: &LoaderPlan, manifest: &Manifest) -> ModpackResult<bool> {
        let install_dir = self.config.install_dir.as_path();

        if plan.remove_previous {
            if let Some(previous) = &plan.previous {
                info!("Removing loader {}", previous);
                self.loader
                    .uninstall(InstallContext {
                        platform_version: &manifest.platform_version,
                        loader_version: previous,
                        install_dir,
                        side: self.config.side,
                    })
                    .await?;
            }
        }

        if !plan.install {
            debug!("Loader {} already installed", plan.version);
            return Ok(false);
        }

        info!("Installing loader {}", plan.version);
        self.loader
            .install(InstallContext {
                platform_version: &manifest.platform_version,
                loader_version: &plan.version,
                install_dir,
                side: self.config.side,
            })
            .await?;
        Ok(true)
    }

    fn write_extras(&self) {
        if self.config.side != InstallSide::Server {
            return;
        }
        if self.config.create_eula {
            debug!("EULA generation requested; not supported, skipping");
        }
        if self.config.create_server_starter {
            debug!("Server starter generation requested; not supported, skipping");
        }
    }
}

async fn download_one(
    planned: PlannedMod,
    provider: &dyn ArtifactProvider,
    fetcher: &dyn FileFetcher,
    install_dir: &Path,
    mods_dir: &Path,
) -> ModpackResult<ModRecord> {
    let artifact = &planned.artifact;
    let details = artifact.details.as_ref();

    let url = match details.and_then(|d| d.download_url.clone()) {
        Some(url) => url,
        None => {
            provider
                .resolve_download_url(artifact.project_id, artifact.file_id)
                .await?
        }
    };

    let provided_name = details
        .map(|d| d.file_name.as_str())
        .filter(|name| !name.is_empty());
    if let Some(name) = provided_name.filter(|name| !is_plain_file_name(name)) {
        warn!("Ignoring unsafe file name {:?} for {}", name, artifact);
    }
    let file_name = provided_name
        .filter(|name| is_plain_file_name(name))
        .map(str::to_string)
        .or_else(|| file_name_from_url(&url))
        .ok_or_else(|| ModpackError::UnresolvedArtifact {
            project_id: artifact.project_id,
            file_id: artifact.file_id,
            reason: format!("no file name in {url}"),
        })?;

    let location = mods_dir.join(&file_name);
    let sha1 = details.and_then(|d| d.sha1.as_deref());
    fetcher.fetch(&url, &install_dir.join(&location), sha1).await?;
    debug!("Downloaded {} to {:?}", artifact, location);

    Ok(ModRecord {
        project_id: artifact.project_id,
        file_id: artifact.file_id,
        location,
        related_files: planned.entry.related_files,
    })
}
