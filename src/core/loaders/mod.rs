pub mod context;
pub mod installer;

pub use context::InstallContext;
pub use installer::{LoaderInstaller, LoaderPlan};
