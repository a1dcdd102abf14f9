use std::collections::BTreeSet;

use super::filter::FileFilter;
use super::model::ArtifactRef;

/// Sort orders supported by `FileSet::sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    IdAscending,
    IdDescending,
}

/// Ordered collection of artifact refs with at most one member per file id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<ArtifactRef>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ref, keeping the set free of duplicate file ids.
    ///
    /// When the id is already present, a resolved ref replaces a bare one;
    /// otherwise the member that was inserted first stays. Returns `true` if
    /// the set changed.
    pub fn insert(&mut self, artifact: ArtifactRef) -> bool {
        match self.files.iter_mut().find(|f| f.file_id == artifact.file_id) {
            Some(existing) if !existing.is_resolved() && artifact.is_resolved() => {
                *existing = artifact;
                true
            }
            Some(_) => false,
            None => {
                self.files.push(artifact);
                true
            }
        }
    }

    pub fn get(&self, file_id: u32) -> Option<&ArtifactRef> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    pub fn contains(&self, file_id: u32) -> bool {
        self.get(file_id).is_some()
    }

    /// First member belonging to `project_id`, in set order.
    pub fn find_by_project(&self, project_id: u32) -> Option<&ArtifactRef> {
        self.files.iter().find(|f| f.project_id == project_id)
    }

    pub fn project_ids(&self) -> BTreeSet<u32> {
        self.files.iter().map(|f| f.project_id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArtifactRef> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop every member rejected by `filter`. Clone first to keep the
    /// unfiltered set around.
    pub fn filter(&mut self, filter: &FileFilter) {
        self.files.retain(|f| filter.matches(f));
    }

    /// Member with the highest file id, i.e. the newest upload.
    pub fn latest(&self) -> Option<&ArtifactRef> {
        self.files.iter().max_by_key(|f| f.file_id)
    }

    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::IdAscending => self.files.sort_by_key(|f| f.file_id),
            SortOrder::IdDescending => self.files.sort_by(|a, b| b.file_id.cmp(&a.file_id)),
        }
    }

    /// Stable sort by a display name the caller supplies (for example from a
    /// provider lookup that is not part of the ref itself).
    pub fn sort_by_name<F>(&mut self, mut name_of: F)
    where
        F: FnMut(&ArtifactRef) -> String,
    {
        self.files.sort_by_cached_key(|f| name_of(f).to_lowercase());
    }

    pub fn into_vec(self) -> Vec<ArtifactRef> {
        self.files
    }
}

impl FromIterator<ArtifactRef> for FileSet {
    fn from_iter<T: IntoIterator<Item = ArtifactRef>>(iter: T) -> Self {
        let mut set = FileSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<ArtifactRef> for FileSet {
    fn extend<T: IntoIterator<Item = ArtifactRef>>(&mut self, iter: T) {
        for artifact in iter {
            self.insert(artifact);
        }
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a ArtifactRef;
    type IntoIter = std::slice::Iter<'a, ArtifactRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl IntoIterator for FileSet {
    type Item = ArtifactRef;
    type IntoIter = std::vec::IntoIter<ArtifactRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}
