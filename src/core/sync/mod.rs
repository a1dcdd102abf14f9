pub mod config;
pub mod fsops;
pub mod installer;
pub mod overrides;

pub use config::InstallerConfig;
pub use installer::{InstallReport, ModpackInstaller, PlannedMod, SyncPlan};
pub use overrides::{OverrideTree, Placeholders, TransferMode};
