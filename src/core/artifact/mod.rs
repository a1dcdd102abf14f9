mod file_set;
mod filter;
mod model;

pub use file_set::{FileSet, SortOrder};
pub use filter::FileFilter;
pub use model::{ArtifactDetails, ArtifactRef, Stability};
