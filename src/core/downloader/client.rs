use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{ModpackError, ModpackResult};
use crate::core::http::build_http_client;

/// Something that can place the bytes behind a URL at a local path.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Download `url` to `dest`, creating parent directories and replacing
    /// any existing file. When `sha1` is given the content must match it.
    async fn fetch(&self, url: &str, dest: &Path, sha1: Option<&str>) -> ModpackResult<()>;
}

/// HTTP downloader with optional SHA-1 validation.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> ModpackResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    // ── Single file download ────────────────────────────

    /// Stream `url` into `dest`.
    ///
    /// Bytes go to a `.part` sibling first and are renamed into place only
    /// after the hash check passes, so a failed download never leaves a
    /// truncated file at `dest`.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> ModpackResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ModpackError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModpackError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let part_path = part_path(dest);
        let (digest, written) = match write_part(response, &part_path).await {
            Ok(done) => done,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        if let Some(expected) = sha1_expected {
            let actual = hex::encode(digest);
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(ModpackError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        if let Err(e) = tokio::fs::rename(&part_path, dest).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(ModpackError::io(dest, e));
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(())
    }
}

#[async_trait]
impl FileFetcher for Downloader {
    async fn fetch(&self, url: &str, dest: &Path, sha1: Option<&str>) -> ModpackResult<()> {
        self.download_file(url, dest, sha1).await
    }
}

/// Stream the body into `part_path`, returning its SHA-1 and length. The
/// handle is closed before returning so the caller can rename or delete it.
async fn write_part(
    response: reqwest::Response,
    part_path: &Path,
) -> ModpackResult<(Vec<u8>, u64)> {
    let mut file = tokio::fs::File::create(part_path)
        .await
        .map_err(|e| ModpackError::io(part_path, e))?;
    let mut hasher = Sha1::new();
    let mut written: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        written += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| ModpackError::io(part_path, e))?;
    }
    file.flush()
        .await
        .map_err(|e| ModpackError::io(part_path, e))?;

    Ok((hasher.finalize().to_vec(), written))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Last path segment of a download URL, with `%20` decoded.
///
/// Returns `None` when the URL has no usable file name.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query.rsplit('/').next()?;
    let name = segment.replace("%20", " ");
    is_plain_file_name(&name).then_some(name)
}

/// A single normal path segment: no separators, no `.` or `..`, not
/// absolute.
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(
            file_name_from_url("https://edge.forgecdn.net/files/2995/350/jei_1.12.2-4.16.1.301.jar"),
            Some("jei_1.12.2-4.16.1.301.jar".into())
        );
        assert_eq!(
            file_name_from_url("https://cdn.example/files/Some%20Mod%201.0.jar?token=abc"),
            Some("Some Mod 1.0.jar".into())
        );
    }

    #[test]
    fn url_without_file_name_is_rejected() {
        assert_eq!(file_name_from_url("https://cdn.example/files/"), None);
        assert_eq!(file_name_from_url("https://cdn.example/files/.."), None);
    }

    #[test]
    fn part_file_sits_next_to_destination() {
        assert_eq!(
            part_path(Path::new("mods/jei.jar")),
            PathBuf::from("mods/jei.jar.part")
        );
    }

    #[test]
    fn only_single_segment_names_are_plain() {
        assert!(is_plain_file_name("jei-1.0.jar"));
        assert!(!is_plain_file_name("../../escaped.jar"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name("sub/dir.jar"));
        assert!(!is_plain_file_name("..\\up.jar"));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name(""));
    }

    #[tokio::test]
    async fn truncated_body_leaves_no_part_file() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nonly fifteen by")
                .await;
            let _ = socket.shutdown().await;
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("mods/a.jar");
        let downloader = Downloader::with_client(Client::new());

        let result = downloader
            .download_file(&format!("http://{addr}/a.jar"), &dest, None)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
