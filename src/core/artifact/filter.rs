use std::collections::BTreeSet;

use super::model::{ArtifactRef, Stability};
use crate::core::error::{ModpackError, ModpackResult};

/// Declarative filter over a `FileSet`.
///
/// A file passes when all three predicates hold:
/// - it targets one of `game_versions` (an empty set means any version),
/// - its id lies in `(id_lower_exclusive, id_upper_inclusive]`,
/// - its stability is admitted by `minimum_stability`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    game_versions: BTreeSet<String>,
    id_lower_exclusive: u32,
    id_upper_inclusive: u32,
    minimum_stability: Stability,
}

impl FileFilter {
    pub fn new<I, S>(
        game_versions: I,
        id_lower_exclusive: u32,
        id_upper_inclusive: u32,
        minimum_stability: Stability,
    ) -> ModpackResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if id_lower_exclusive >= id_upper_inclusive {
            return Err(ModpackError::InvalidIdRange {
                lower: id_lower_exclusive,
                upper: id_upper_inclusive,
            });
        }

        Ok(Self {
            game_versions: game_versions.into_iter().map(Into::into).collect(),
            id_lower_exclusive,
            id_upper_inclusive,
            minimum_stability,
        })
    }

    /// Filter that only enforces a minimum stability.
    pub fn with_stability(minimum_stability: Stability) -> Self {
        Self {
            game_versions: BTreeSet::new(),
            id_lower_exclusive: 0,
            id_upper_inclusive: u32::MAX,
            minimum_stability,
        }
    }

    pub fn matches(&self, artifact: &ArtifactRef) -> bool {
        self.matches_version(artifact)
            && self.matches_id(artifact.file_id)
            && self.minimum_stability.admits(artifact.stability())
    }

    fn matches_version(&self, artifact: &ArtifactRef) -> bool {
        self.game_versions.is_empty()
            || artifact
                .game_versions()
                .iter()
                .any(|v| self.game_versions.contains(v))
    }

    fn matches_id(&self, file_id: u32) -> bool {
        file_id > self.id_lower_exclusive && file_id <= self.id_upper_inclusive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::ArtifactDetails;

    fn file(file_id: u32, version: &str, stability: Stability) -> ArtifactRef {
        ArtifactRef::new(10, file_id).with_details(ArtifactDetails {
            display_name: format!("file-{file_id}"),
            file_name: format!("file-{file_id}.jar"),
            game_versions: vec![version.to_string()],
            stability,
            download_url: None,
            sha1: None,
        })
    }

    #[test]
    fn rejects_inverted_or_empty_id_range() {
        assert!(matches!(
            FileFilter::new(Vec::<String>::new(), 10, 10, Stability::Alpha),
            Err(ModpackError::InvalidIdRange { lower: 10, upper: 10 })
        ));
        assert!(FileFilter::new(Vec::<String>::new(), 20, 10, Stability::Alpha).is_err());
    }

    #[test]
    fn id_bounds_are_lower_exclusive_upper_inclusive() {
        let filter = FileFilter::new(Vec::<String>::new(), 100, 200, Stability::Alpha).unwrap();
        assert!(!filter.matches(&file(100, "1.20.1", Stability::Release)));
        assert!(filter.matches(&file(101, "1.20.1", Stability::Release)));
        assert!(filter.matches(&file(200, "1.20.1", Stability::Release)));
        assert!(!filter.matches(&file(201, "1.20.1", Stability::Release)));
    }

    #[test]
    fn version_set_constrains_only_when_non_empty() {
        let any = FileFilter::with_stability(Stability::Alpha);
        assert!(any.matches(&file(1, "1.19.2", Stability::Release)));

        let pinned = FileFilter::new(["1.20.1"], 0, u32::MAX, Stability::Alpha).unwrap();
        assert!(pinned.matches(&file(1, "1.20.1", Stability::Release)));
        assert!(!pinned.matches(&file(2, "1.19.2", Stability::Release)));
        assert!(!pinned.matches(&ArtifactRef::new(10, 3)));
    }
}
