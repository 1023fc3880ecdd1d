// Shared HTTP client utilities

use crate::constants::REPOSITORY_URL;
use crate::providers::hash::{self, HashAlgorithm};
use crate::ui;
use anyhow::Result;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

lazy_static::lazy_static! {
    /// User-Agent string for all HTTP requests
    static ref USER_AGENT: String = format!(
        "nyxpatcher/{} (+{})",
        env!("CARGO_PKG_VERSION"),
        REPOSITORY_URL
    );

    /// Shared HTTP client with proper User-Agent
    static ref CLIENT: Client = Client::builder()
        .user_agent(USER_AGENT.as_str())
        .build()
        .expect("Failed to create HTTP client");
}

/// Get a reference to the shared HTTP client
pub fn client() -> &'static Client {
    &CLIENT
}

/// Send a request, retrying failures with exponential backoff.
///
/// A 404 is returned as an error immediately without retrying.
pub async fn send_with_retry(request: RequestBuilder) -> Result<Response> {
    let mut last_error = None;

    for attempt in 0..MAX_ATTEMPTS {
        let Some(req) = request.try_clone() else {
            anyhow::bail!("Request body cannot be retried");
        };

        match req.send().await {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                anyhow::bail!("Resource not found: {}", response.url());
            }
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                last_error = Some(anyhow::anyhow!(
                    "HTTP request failed: {} ({})",
                    response.url(),
                    response.status()
                ));
            }
            Err(e) => last_error = Some(e.into()),
        }

        if let Some(e) = &last_error {
            warn!(
                "Request failed (attempt {}/{}): {}",
                attempt + 1,
                MAX_ATTEMPTS,
                e
            );
        }

        if attempt + 1 < MAX_ATTEMPTS {
            let wait = RETRY_DELAY * 2u32.pow(attempt);
            debug!("Retrying in {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed")))
}

/// Fetch JSON and deserialize it
pub async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = send_with_retry(request).await?;
    let result = response.json().await?;
    Ok(result)
}

/// Stream a download to `destination`, verifying the sha512 digest when known.
///
/// Bytes land in `<destination>.download.tmp` and are only renamed into place
/// once complete and verified.
pub async fn download_to_path(
    request: RequestBuilder,
    destination: &Path,
    expected_sha512: Option<&str>,
) -> Result<()> {
    let response = send_with_retry(request).await?;

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(destination);
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let pb = match response.content_length() {
        Some(total) => ui::download_bar(total),
        None => ui::download_bar_indeterminate(),
    };
    pb.set_message(name.clone());

    let result = match stream_to_file(response, &tmp, &pb).await {
        Ok(()) => commit_download(&tmp, destination, expected_sha512),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    };

    match result {
        Ok(()) => {
            ui::finish_download_success(&pb, &name, expected_sha512.is_some());
            Ok(())
        }
        Err(e) => {
            ui::clear_bar(&pb);
            Err(e)
        }
    }
}

/// Verify `tmp` and rename it over `destination`. `tmp` is removed on any error.
fn commit_download(tmp: &Path, destination: &Path, expected_sha512: Option<&str>) -> Result<()> {
    let result = verify_and_rename(tmp, destination, expected_sha512);
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

fn verify_and_rename(tmp: &Path, destination: &Path, expected_sha512: Option<&str>) -> Result<()> {
    if let Some(expected) = expected_sha512 {
        let actual = hash::compute_file_hash(tmp, HashAlgorithm::Sha512)?;
        let expected = hash::format_hash(expected, HashAlgorithm::Sha512);
        if actual != expected {
            anyhow::bail!(
                "Hash mismatch for {}: expected {}, got {}",
                destination.display(),
                expected,
                actual
            );
        }
    }

    fs::rename(tmp, destination)?;
    Ok(())
}

async fn stream_to_file(response: Response, path: &Path, pb: &indicatif::ProgressBar) -> Result<()> {
    let mut file = File::create(path)?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        pb.inc(chunk.len() as u64);
    }

    file.flush()?;
    Ok(())
}

fn temp_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".download.tmp");
    PathBuf::from(name)
}
