mod installed;

pub use installed::{InstalledState, ModRecord};
