use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{ModpackError, ModpackResult};
use crate::core::manifest::Manifest;

/// Extensions of override files that get placeholder substitution.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "cfg", "conf", "json", "json5", "toml", "properties", "ini", "yml", "yaml", "md", "js",
    "zs", "mcmeta", "snbt",
];

pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Pack metadata tokens replaced inside text override files.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pairs: Vec<(&'static str, String)>,
}

impl Placeholders {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            pairs: vec![
                ("::PACK_FULL_NAME::", manifest.full_name()),
                ("::PACK_NAME::", manifest.name.clone()),
                ("::PACK_VERSION::", manifest.version.clone()),
                ("::PACK_AUTHOR::", manifest.author.clone()),
                ("::PLATFORM_VERSION::", manifest.platform_version.clone()),
            ],
        }
    }

    pub fn apply(&self, text: &str) -> String {
        self.pairs
            .iter()
            .fold(text.to_string(), |acc, (token, value)| {
                if acc.contains(token) {
                    acc.replace(token, value)
                } else {
                    acc
                }
            })
    }
}

/// How non-text override files reach the install directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Source is a scratch extraction and may be consumed.
    Move,
    /// Source belongs to the user and must stay untouched.
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverrideEntry {
    relative: PathBuf,
    is_dir: bool,
}

/// The bundled override tree of a pack, minus paths excluded for this side.
#[derive(Debug, Clone)]
pub struct OverrideTree {
    source_dir: PathBuf,
    entries: Vec<OverrideEntry>,
}

impl OverrideTree {
    /// Walk `source_dir`. A pack without an override directory yields an
    /// empty tree.
    pub async fn scan(source_dir: PathBuf, excluded: &[PathBuf]) -> ModpackResult<Self> {
        if !tokio::fs::try_exists(&source_dir).await.unwrap_or(false) {
            debug!("No override directory at {:?}", source_dir);
            return Ok(Self {
                source_dir,
                entries: Vec::new(),
            });
        }

        let root = source_dir.clone();
        let excluded = excluded.to_vec();
        let entries = tokio::task::spawn_blocking(move || walk_tree(&root, &excluded))
            .await
            .map_err(|e| ModpackError::Other(format!("Override scan task failed: {e}")))??;

        Ok(Self {
            source_dir,
            entries,
        })
    }

    /// Relative paths of every file in the tree.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.relative.as_path())
    }

    pub fn contains_file(&self, relative: &Path) -> bool {
        self.files().any(|f| f == relative)
    }

    /// Write the tree into `install_dir`. Returns the relative paths of the
    /// files written.
    pub async fn apply(
        &self,
        install_dir: &Path,
        placeholders: &Placeholders,
        mode: TransferMode,
    ) -> ModpackResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        for entry in &self.entries {
            let dest = install_dir.join(&entry.relative);

            if entry.is_dir {
                ensure_dir(&dest).await?;
                continue;
            }

            let src = self.source_dir.join(&entry.relative);
            prepare_file_dest(&dest).await?;

            if !(is_text_file(&src) && write_substituted(&src, &dest, placeholders).await?) {
                transfer(&src, &dest, mode).await?;
            }

            written.push(entry.relative.clone());
        }

        info!(
            "Copied {} override files from {:?}",
            written.len(),
            self.source_dir
        );
        Ok(written)
    }
}

fn walk_tree(root: &Path, excluded: &[PathBuf]) -> ModpackResult<Vec<OverrideEntry>> {
    let mut entries = Vec::new();

    let walker = walkdir::WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            !excluded.iter().any(|ex| relative.starts_with(ex))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            ModpackError::io(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ModpackError::Other(e.to_string()))?
            .to_path_buf();

        entries.push(OverrideEntry {
            relative,
            is_dir: entry.file_type().is_dir(),
        });
    }

    Ok(entries)
}

/// Make `dest` a directory, deleting a non-directory squatting on the path.
async fn ensure_dir(dest: &Path) -> ModpackResult<()> {
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            debug!("Replacing file {:?} with a directory", dest);
            tokio::fs::remove_file(dest)
                .await
                .map_err(|e| ModpackError::io(dest, e))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(ModpackError::io(dest, e)),
    }

    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| ModpackError::io(dest, e))
}

async fn prepare_file_dest(dest: &Path) -> ModpackResult<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent).await?;
    }

    if let Ok(meta) = tokio::fs::symlink_metadata(dest).await {
        if meta.is_dir() {
            debug!("Replacing directory {:?} with a file", dest);
            tokio::fs::remove_dir_all(dest)
                .await
                .map_err(|e| ModpackError::io(dest, e))?;
        }
    }
    Ok(())
}

/// Rewrite a text file with placeholders filled in. Returns `false` when the
/// file is not valid UTF-8 and has to be transferred as bytes instead.
async fn write_substituted(
    src: &Path,
    dest: &Path,
    placeholders: &Placeholders,
) -> ModpackResult<bool> {
    let text = match tokio::fs::read_to_string(src).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => return Ok(false),
        Err(e) => return Err(ModpackError::io(src, e)),
    };

    tokio::fs::write(dest, placeholders.apply(&text))
        .await
        .map_err(|e| ModpackError::io(dest, e))?;
    Ok(true)
}

async fn transfer(src: &Path, dest: &Path, mode: TransferMode) -> ModpackResult<()> {
    if mode == TransferMode::Move && tokio::fs::rename(src, dest).await.is_ok() {
        return Ok(());
    }

    // Copy mode, or a rename across filesystems
    tokio::fs::copy(src, dest)
        .await
        .map_err(|e| ModpackError::io(src, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::parse(
            r#"{ "name": "Skyblock", "version": "2.1", "author": "Dev",
                 "platformVersion": "1.20.1" }"#,
        )
        .unwrap()
    }

    fn write(path: &Path, contents: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn placeholders_are_substituted() {
        let placeholders = Placeholders::from_manifest(&manifest());
        assert_eq!(
            placeholders.apply("title=::PACK_FULL_NAME:: by ::PACK_AUTHOR:: (::PLATFORM_VERSION::)"),
            "title=Skyblock 2.1 by Dev (1.20.1)"
        );
        assert_eq!(placeholders.apply("::PACK_NAME::-::PACK_VERSION::"), "Skyblock-2.1");
    }

    #[test]
    fn text_detection_uses_extension() {
        assert!(is_text_file(Path::new("config/server.PROPERTIES")));
        assert!(is_text_file(Path::new("scripts/recipes.zs")));
        assert!(!is_text_file(Path::new("resourcepacks/pack.zip")));
        assert!(!is_text_file(Path::new("README")));
    }

    #[tokio::test]
    async fn copy_mode_substitutes_text_and_keeps_source() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(&src.path().join("config/menu.cfg"), b"name=::PACK_NAME::");
        write(&src.path().join("resourcepacks/art.zip"), b"\x00\x01");

        let tree = OverrideTree::scan(src.path().to_path_buf(), &[]).await.unwrap();
        let written = tree
            .apply(
                dest.path(),
                &Placeholders::from_manifest(&manifest()),
                TransferMode::Copy,
            )
            .await
            .unwrap();

        assert_eq!(
            written,
            vec![
                PathBuf::from("config/menu.cfg"),
                PathBuf::from("resourcepacks/art.zip")
            ]
        );
        assert_eq!(
            std::fs::read_to_string(dest.path().join("config/menu.cfg")).unwrap(),
            "name=Skyblock"
        );
        assert_eq!(
            std::fs::read(dest.path().join("resourcepacks/art.zip")).unwrap(),
            b"\x00\x01"
        );
        assert!(src.path().join("resourcepacks/art.zip").exists());
    }

    #[tokio::test]
    async fn move_mode_consumes_binary_sources() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(&src.path().join("mods/bundled.jar"), b"jar");

        let tree = OverrideTree::scan(src.path().to_path_buf(), &[]).await.unwrap();
        tree.apply(
            dest.path(),
            &Placeholders::from_manifest(&manifest()),
            TransferMode::Move,
        )
        .await
        .unwrap();

        assert!(dest.path().join("mods/bundled.jar").exists());
        assert!(!src.path().join("mods/bundled.jar").exists());
    }

    #[tokio::test]
    async fn excluded_paths_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(&src.path().join("shaderpacks/bsl.zip"), b"zip");
        write(&src.path().join("config/backups.cfg"), b"keep=5");
        write(&src.path().join("config/jei.cfg"), b"x=1");

        let excluded = vec![PathBuf::from("shaderpacks"), PathBuf::from("config/backups.cfg")];
        let tree = OverrideTree::scan(src.path().to_path_buf(), &excluded)
            .await
            .unwrap();

        let files: Vec<&Path> = tree.files().collect();
        assert_eq!(files, vec![Path::new("config/jei.cfg")]);
        assert!(!tree.contains_file(Path::new("config/backups.cfg")));

        tree.apply(
            dest.path(),
            &Placeholders::from_manifest(&manifest()),
            TransferMode::Copy,
        )
        .await
        .unwrap();
        assert!(!dest.path().join("shaderpacks").exists());
    }

    #[tokio::test]
    async fn stale_file_is_replaced_by_directory() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(&src.path().join("config/sub/a.toml"), b"a = 1");
        write(&dest.path().join("config"), b"i am a file");

        let tree = OverrideTree::scan(src.path().to_path_buf(), &[]).await.unwrap();
        tree.apply(
            dest.path(),
            &Placeholders::from_manifest(&manifest()),
            TransferMode::Copy,
        )
        .await
        .unwrap();

        assert!(dest.path().join("config").is_dir());
        assert!(dest.path().join("config/sub/a.toml").is_file());
    }

    #[tokio::test]
    async fn invalid_utf8_text_file_is_copied_verbatim() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(&src.path().join("notes.txt"), b"\xff\xfe::PACK_NAME::");

        let tree = OverrideTree::scan(src.path().to_path_buf(), &[]).await.unwrap();
        tree.apply(
            dest.path(),
            &Placeholders::from_manifest(&manifest()),
            TransferMode::Copy,
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read(dest.path().join("notes.txt")).unwrap(),
            b"\xff\xfe::PACK_NAME::"
        );
    }

    #[tokio::test]
    async fn missing_override_dir_is_empty_tree() {
        let src = tempfile::tempdir().unwrap();
        let tree = OverrideTree::scan(src.path().join("overrides"), &[])
            .await
            .unwrap();
        assert_eq!(tree.files().count(), 0);
    }
}
