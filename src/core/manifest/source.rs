use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::Manifest;
use crate::core::downloader::FileFetcher;
use crate::core::error::{ModpackError, ModpackResult};
use crate::core::provider::ArtifactProvider;
use crate::core::scratch::ScratchSpace;

/// Where the manifest of a run comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestSource {
    /// A modpack archive hosted on the platform itself.
    Embedded { project_id: u32, file_id: u32 },
    /// A zip archive at an arbitrary URL.
    Url { url: String },
    /// An unpacked pack directory or a zip archive on disk.
    LocalPath { path: PathBuf },
}

/// A manifest located on disk, ready to install from.
#[derive(Debug)]
pub struct ResolvedSource {
    pub root: PathBuf,
    pub manifest: Manifest,
    /// `root` was extracted into scratch space, so its files may be moved
    /// rather than copied.
    pub in_scratch: bool,
}

impl ResolvedSource {
    pub fn overrides_dir(&self) -> PathBuf {
        self.root.join(&self.manifest.overrides)
    }
}

impl ManifestSource {
    pub fn describe(&self) -> String {
        match self {
            ManifestSource::Embedded {
                project_id,
                file_id,
            } => format!("project {project_id} file {file_id}"),
            ManifestSource::Url { url } => url.clone(),
            ManifestSource::LocalPath { path } => path.display().to_string(),
        }
    }

    /// Bring the manifest onto local disk and parse it. Anything downloaded
    /// or extracted is tracked in `scratch`.
    pub async fn resolve(
        &self,
        provider: &dyn ArtifactProvider,
        fetcher: &dyn FileFetcher,
        scratch: &mut ScratchSpace,
    ) -> ModpackResult<ResolvedSource> {
        info!("Resolving manifest source {}", self.describe());

        match self {
            ManifestSource::Embedded {
                project_id,
                file_id,
            } => {
                let url = provider
                    .resolve_download_url(*project_id, *file_id)
                    .await
                    .map_err(|e| self.unavailable(e))?;
                self.download_and_extract(&url, fetcher, scratch).await
            }
            ManifestSource::Url { url } => self.download_and_extract(url, fetcher, scratch).await,
            ManifestSource::LocalPath { path } => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| self.unavailable(e))?;

                if metadata.is_dir() {
                    let manifest = Manifest::load_from_dir(path).await?;
                    Ok(ResolvedSource {
                        root: path.clone(),
                        manifest,
                        in_scratch: false,
                    })
                } else {
                    extract_into_scratch(path, scratch).await
                }
            }
        }
    }

    async fn download_and_extract(
        &self,
        url: &str,
        fetcher: &dyn FileFetcher,
        scratch: &mut ScratchSpace,
    ) -> ModpackResult<ResolvedSource> {
        let archive = scratch.file_path("modpack", "zip");
        fetcher
            .fetch(url, &archive, None)
            .await
            .map_err(|e| self.unavailable(e))?;
        extract_into_scratch(&archive, scratch).await
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> ModpackError {
        ModpackError::SourceUnavailable {
            location: self.describe(),
            reason: reason.to_string(),
        }
    }
}

async fn extract_into_scratch(
    archive: &Path,
    scratch: &mut ScratchSpace,
) -> ModpackResult<ResolvedSource> {
    let dest = scratch.create_dir("modpack").await?;

    let archive_path = archive.to_path_buf();
    let extract_dest = dest.clone();
    tokio::task::spawn_blocking(move || extract_zip(&archive_path, &extract_dest))
        .await
        .map_err(|e| ModpackError::Other(format!("Extraction task failed: {e}")))??;

    let root = locate_manifest_root(&dest).await?;
    let manifest = Manifest::load_from_dir(&root).await?;
    debug!("Extracted {:?} to {:?}", archive, root);

    Ok(ResolvedSource {
        root,
        manifest,
        in_scratch: true,
    })
}

/// Unpack every entry of a zip archive below `dest`. Entries whose names
/// would escape `dest` are rejected.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> ModpackResult<()> {
    let zip_file = std::fs::File::open(zip_path).map_err(|e| ModpackError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;

        let enclosed_name = zipped
            .enclosed_name()
            .ok_or_else(|| ModpackError::InvalidManifest("Invalid zip entry path".into()))?;
        let rel_path: PathBuf = enclosed_name
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let out_path = dest.join(rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| ModpackError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModpackError::io(parent, e))?;
        }

        let mut out =
            std::fs::File::create(&out_path).map_err(|e| ModpackError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| ModpackError::io(&out_path, e))?;
    }

    Ok(())
}

/// `dir` itself if it holds the manifest, or its single child directory when
/// the archive wrapped everything in one top-level folder.
async fn locate_manifest_root(dir: &Path) -> ModpackResult<PathBuf> {
    if tokio::fs::try_exists(dir.join(Manifest::FILE_NAME))
        .await
        .unwrap_or(false)
    {
        return Ok(dir.to_path_buf());
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ModpackError::io(dir, e))?;
    let mut children = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ModpackError::io(dir, e))?
    {
        children.push(entry.path());
    }

    if let [only] = children.as_slice() {
        if tokio::fs::try_exists(only.join(Manifest::FILE_NAME))
            .await
            .unwrap_or(false)
        {
            return Ok(only.clone());
        }
    }

    Err(ModpackError::ManifestNotFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use async_trait::async_trait;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::core::artifact::ArtifactRef;
    use crate::core::error::ErrorKind;

    const MANIFEST: &str =
        r#"{ "name": "Pack", "version": "1.0", "platformVersion": "1.20.1" }"#;

    /// Treats URLs as local file paths.
    struct LocalFetcher;

    #[async_trait]
    impl FileFetcher for LocalFetcher {
        async fn fetch(&self, url: &str, dest: &Path, _sha1: Option<&str>) -> ModpackResult<()> {
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(url, dest)
                .await
                .map(|_| ())
                .map_err(|e| ModpackError::io(url, e))
        }
    }

    struct FixedProvider(String);

    #[async_trait]
    impl ArtifactProvider for FixedProvider {
        async fn resolve_download_url(&self, _: u32, _: u32) -> ModpackResult<String> {
            Ok(self.0.clone())
        }
        async fn resolve_changelog(&self, _: u32, _: u32) -> ModpackResult<String> {
            Ok(String::new())
        }
        async fn list_catalog(&self, _: u32) -> ModpackResult<Vec<ArtifactRef>> {
            Ok(Vec::new())
        }
    }

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, contents) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn local_directory_is_used_in_place() {
        let pack = tempfile::tempdir().unwrap();
        std::fs::write(pack.path().join("manifest.json"), MANIFEST).unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::new(scratch_root.path().to_path_buf());

        let source = ManifestSource::LocalPath {
            path: pack.path().to_path_buf(),
        };
        let resolved = source
            .resolve(&FixedProvider(String::new()), &LocalFetcher, &mut scratch)
            .await
            .unwrap();

        assert_eq!(resolved.root, pack.path());
        assert!(!resolved.in_scratch);
        assert!(scratch.paths().is_empty());
        assert_eq!(resolved.overrides_dir(), pack.path().join("overrides"));
    }

    #[tokio::test]
    async fn wrapped_archive_is_unwrapped() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("pack.zip");
        write_zip(
            &archive,
            &[
                ("Pack-1.0/manifest.json", MANIFEST),
                ("Pack-1.0/overrides/config/a.cfg", "a=1"),
            ],
        );
        let mut scratch = ScratchSpace::new(work.path().join("scratch"));

        let source = ManifestSource::LocalPath { path: archive };
        let resolved = source
            .resolve(&FixedProvider(String::new()), &LocalFetcher, &mut scratch)
            .await
            .unwrap();

        assert!(resolved.in_scratch);
        assert!(resolved.root.ends_with("Pack-1.0"));
        assert!(resolved.overrides_dir().join("config/a.cfg").is_file());
        assert_eq!(resolved.manifest.name, "Pack");

        scratch.cleanup().await;
        assert!(!resolved.root.exists());
    }

    #[tokio::test]
    async fn embedded_source_downloads_through_provider_url() {
        let work = tempfile::tempdir().unwrap();
        let hosted = work.path().join("hosted.zip");
        write_zip(&hosted, &[("manifest.json", MANIFEST)]);
        let mut scratch = ScratchSpace::new(work.path().join("scratch"));

        let source = ManifestSource::Embedded {
            project_id: 1,
            file_id: 2,
        };
        let provider = FixedProvider(hosted.to_string_lossy().to_string());
        let resolved = source
            .resolve(&provider, &LocalFetcher, &mut scratch)
            .await
            .unwrap();

        assert!(resolved.in_scratch);
        // downloaded archive + extraction dir
        assert_eq!(scratch.paths().len(), 2);
    }

    #[tokio::test]
    async fn unreachable_url_is_a_resolution_error() {
        let work = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::new(work.path().to_path_buf());

        let source = ManifestSource::Url {
            url: work.path().join("missing.zip").to_string_lossy().to_string(),
        };
        let err = source
            .resolve(&FixedProvider(String::new()), &LocalFetcher, &mut scratch)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[tokio::test]
    async fn archive_without_manifest_is_rejected() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("pack.zip");
        write_zip(&archive, &[("readme.txt", "hi"), ("other.txt", "x")]);
        let mut scratch = ScratchSpace::new(work.path().join("scratch"));

        let err = ManifestSource::LocalPath { path: archive }
            .resolve(&FixedProvider(String::new()), &LocalFetcher, &mut scratch)
            .await
            .unwrap_err();

        assert!(matches!(err, ModpackError::ManifestNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn source_config_uses_tagged_json() {
        let source: ManifestSource =
            serde_json::from_str(r#"{ "kind": "embedded", "project_id": 5, "file_id": 9 }"#)
                .unwrap();
        assert_eq!(
            source,
            ManifestSource::Embedded {
                project_id: 5,
                file_id: 9
            }
        );
    }
}
