// ─── modsync core ───
// Synchronizes an install directory with a declarative modpack manifest.
//
// Architecture:
//   core/
//     artifact/  : File references, stability channels, FileSet + FileFilter
//     diff       : Old/new FileSet comparison
//     manifest/  : Manifest model, role filtering, source resolution
//     provider/  : Metadata provider seam + memoizing wrapper
//     downloader/: Streaming downloads with SHA-1 validation, batch scheduler
//     loaders/   : Loader installer seam + reinstall decision
//     state/     : Persisted record of what the last run wrote
//     sync/      : Config, override copying, orchestrator
//     scratch    : Temporary paths removed at the end of every run

pub mod artifact;
pub mod diff;
pub mod downloader;
pub mod error;
pub mod http;
pub mod loaders;
pub mod manifest;
pub mod provider;
pub mod scratch;
pub mod state;
pub mod sync;
