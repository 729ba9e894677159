//! Makes sure the model artifact exists on local disk, fetching it from the
//! remote object store once when it is missing. No retries and no integrity
//! check unless an operator pins a sha256.

use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::ArtifactError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    Cached,
    Downloaded { bytes: u64 },
}

pub struct ArtifactFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl ArtifactFetcher {
    /// `url_template` must contain an `{id}` placeholder for the object identifier.
    pub fn new(url_template: impl Into<String>) -> Result<Self, ArtifactError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("neuroscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url_template: url_template.into() })
    }

    pub fn url_for(&self, id: &str) -> String { self.url_template.replace("{id}", id) }

    /// No-op when `path` exists; otherwise download object `id` into it.
    ///
    /// The body is streamed into `<path>.part` and renamed into place only once
    /// complete, so an interrupted download never leaves a file at `path`.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn ensure_present(&self, id: &str, path: &Path) -> Result<ArtifactStatus, ArtifactError> {
        if tokio::fs::try_exists(path).await? {
            debug!("model artifact already present");
            return Ok(ArtifactStatus::Cached);
        }
        let url = self.url_for(id);
        info!(%url, "downloading model artifact");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ArtifactError::Status(status.as_u16()));
        }
        if is_html(resp.headers()) {
            return Err(ArtifactError::UnexpectedContent);
        }

        let part = part_path(path);
        let mut file = tokio::fs::File::create(&part).await?;
        let written = match write_body(&mut resp, &mut file).await {
            Ok(0) => Err(ArtifactError::Empty),
            other => other,
        };
        drop(file);
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&part, path).await?;
        info!(bytes, "model artifact downloaded");
        Ok(ArtifactStatus::Downloaded { bytes })
    }
}

async fn write_body(resp: &mut reqwest::Response, file: &mut tokio::fs::File) -> Result<u64, ArtifactError> {
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

// Drive serves its virus-scan interstitial as a 200 text/html page.
fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Compare the artifact's sha256 against a hex pin (case-insensitive).
pub async fn verify_sha256(path: &Path, expected: &str) -> Result<(), ArtifactError> {
    let bytes = tokio::fs::read(path).await?;
    let actual = hex::encode(Sha256::digest(&bytes));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        debug!(sha256 = %actual, "model artifact checksum verified");
        Ok(())
    } else {
        Err(ArtifactError::ChecksumMismatch { expected: expected.trim().to_string(), actual })
    }
}
