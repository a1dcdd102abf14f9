mod client;
mod scheduler;

pub use client::{file_name_from_url, is_plain_file_name, Downloader, FileFetcher};
pub use scheduler::{
    chunk_ranges, BatchReport, BatchScheduler, FailurePolicy, ItemOutcome, DEFAULT_MAX_WORKERS,
};
