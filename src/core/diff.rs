// ─── File Set Diff ───
// Five-way partition of two file sets, matched by owning project.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::artifact::{ArtifactRef, FileSet};

/// Result of comparing an old file set with a new one.
///
/// Every project present in either side lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub unchanged: Vec<ArtifactRef>,
    /// `(old, new)` pairs where the new file id is higher.
    pub updated: Vec<(ArtifactRef, ArtifactRef)>,
    /// `(old, new)` pairs where the new file id is lower.
    pub downgraded: Vec<(ArtifactRef, ArtifactRef)>,
    pub removed: Vec<ArtifactRef>,
    pub added: Vec<ArtifactRef>,
}

impl DiffResult {
    /// Compare `old` against `new`.
    ///
    /// Each old member is matched with the first new member of the same
    /// project. Quadratic in the set sizes, which is fine at manifest scale.
    pub fn compute(old: &FileSet, new: &FileSet) -> Self {
        let mut diff = DiffResult::default();
        let mut seen_old = BTreeSet::new();

        for old_file in old {
            if !seen_old.insert(old_file.project_id) {
                continue;
            }

            match new.find_by_project(old_file.project_id) {
                None => diff.removed.push(old_file.clone()),
                Some(new_file) if new_file.file_id == old_file.file_id => {
                    diff.unchanged.push(old_file.clone())
                }
                Some(new_file) if new_file.file_id > old_file.file_id => {
                    diff.updated.push((old_file.clone(), new_file.clone()))
                }
                Some(new_file) => diff
                    .downgraded
                    .push((old_file.clone(), new_file.clone())),
            }
        }

        let old_projects = old.project_ids();
        let mut seen_new = BTreeSet::new();
        for new_file in new {
            if !old_projects.contains(&new_file.project_id) && seen_new.insert(new_file.project_id)
            {
                diff.added.push(new_file.clone());
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
            && self.downgraded.is_empty()
            && self.removed.is_empty()
            && self.added.is_empty()
    }

    /// Files of the old side that must go: removed plus the old half of every
    /// updated or downgraded pair.
    pub fn outgoing(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.removed.iter().chain(
            self.updated
                .iter()
                .chain(self.downgraded.iter())
                .map(|(old, _)| old),
        )
    }

    /// Files of the new side that must be fetched: added plus the new half
    /// of every updated or downgraded pair.
    pub fn incoming(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.added.iter().chain(
            self.updated
                .iter()
                .chain(self.downgraded.iter())
                .map(|(_, new)| new),
        )
    }
}
