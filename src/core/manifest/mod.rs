mod model;
mod source;

pub use model::{InstallSide, LoaderVersionSelector, Manifest, ManifestEntry, Role};
pub use source::{extract_zip, ManifestSource, ResolvedSource};
