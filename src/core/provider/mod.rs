// Metadata provider seam - the hosting platform's API lives behind this trait.

mod cache;
mod traits;

pub use cache::CachingProvider;
pub use traits::ArtifactProvider;
