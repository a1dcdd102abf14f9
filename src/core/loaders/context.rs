use std::path::Path;

use crate::core::manifest::InstallSide;

/// Everything a loader installer needs to know about the target.
pub struct InstallContext<'a> {
    pub platform_version: &'a str,
    pub loader_version: &'a str,
    pub install_dir: &'a Path,
    pub side: InstallSide,
}
