use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{ModpackError, ModpackResult};

/// Join a recorded relative path onto `root`, refusing anything that could
/// point outside it.
pub fn resolve_inside(root: &Path, relative: &Path) -> Option<PathBuf> {
    if relative.as_os_str().is_empty() {
        return None;
    }
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then(|| root.join(relative))
}

/// Delete one previously recorded path. Returns whether something was
/// removed; a path that is already gone is not an error.
pub async fn remove_recorded(root: &Path, relative: &Path) -> ModpackResult<bool> {
    let Some(path) = resolve_inside(root, relative) else {
        warn!("Ignoring recorded path outside the install dir: {:?}", relative);
        return Ok(false);
    };

    let result = match tokio::fs::symlink_metadata(&path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&path).await,
        Ok(_) => tokio::fs::remove_file(&path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            debug!("Deleted {:?}", path);
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ModpackError::io(path, e)),
    }
}

/// Remove every empty directory below `root` (never `root` itself).
/// Best-effort: returns how many were removed and ignores failures.
pub async fn prune_empty_dirs(root: &Path) -> usize {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut removed = 0;
        for entry in walkdir::WalkDir::new(&root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .flatten()
        {
            if entry.file_type().is_dir() && std::fs::remove_dir(entry.path()).is_ok() {
                removed += 1;
            }
        }
        removed
    })
    .await
    .unwrap_or_else(|e| {
        warn!("Pruning empty directories failed: {}", e);
        0
    })
}
