//! Staging raw bytes for a source
//!
//! One handler per retrieval strategy: cached GET-to-file, always-refresh
//! POST-to-file, and GET-to-memory. A staged file written by the cached GET
//! strategy is reused on later runs with no freshness check against the
//! remote (no ETag, no hash); refreshing means deleting the staging file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use atlas_common::{AtlasError, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tracing::info;

use crate::sources::{RetrievalStrategy, SourceDescriptor};

/// Raw bytes for one source, either persisted at a staging path or held in
/// memory, per the strategy that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedPayload {
    File(PathBuf),
    Memory(String),
}

/// Obtain the raw bytes for a source per its retrieval strategy.
pub async fn stage(client: &Client, descriptor: &SourceDescriptor) -> Result<StagedPayload> {
    match &descriptor.strategy {
        RetrievalStrategy::CachedFile => stage_cached_file(client, descriptor).await,
        RetrievalStrategy::AlwaysRefreshFile { form } => {
            stage_refresh_file(client, descriptor, form).await
        },
        RetrievalStrategy::InMemory => stage_in_memory(client, descriptor).await,
    }
}

/// GET to the staging path, reusing an existing file indefinitely.
async fn stage_cached_file(client: &Client, descriptor: &SourceDescriptor) -> Result<StagedPayload> {
    let path = staging_path(descriptor)?;
    if path.exists() {
        info!(
            source = %descriptor.key,
            path = %path.display(),
            "Staged file exists, reusing (no freshness check)"
        );
        return Ok(StagedPayload::File(path.to_path_buf()));
    }

    info!(source = %descriptor.key, url = %descriptor.url, "Downloading to staging file");
    let response = client
        .get(descriptor.url.clone())
        .timeout(descriptor.timeout)
        .send()
        .await
        .map_err(|e| AtlasError::network(e.to_string()))?;
    check_status(descriptor, &response)?;

    let total_size = response.content_length().unwrap_or(0);
    let progress = download_bar(total_size, &descriptor.key);

    // Chunks are written as received; an interrupted transfer leaves a
    // truncated staging file behind.
    let mut file = File::create(path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AtlasError::network(e.to_string()))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }
    progress.finish_and_clear();

    info!(
        source = %descriptor.key,
        path = %path.display(),
        bytes = downloaded,
        "Download complete"
    );
    Ok(StagedPayload::File(path.to_path_buf()))
}

/// POST the fixed form body and overwrite the staging file, every run.
async fn stage_refresh_file(
    client: &Client,
    descriptor: &SourceDescriptor,
    form: &[(String, String)],
) -> Result<StagedPayload> {
    let path = staging_path(descriptor)?;

    info!(source = %descriptor.key, url = %descriptor.url, "Posting query to server");
    let response = client
        .post(descriptor.url.clone())
        .timeout(descriptor.timeout)
        .form(form)
        .send()
        .await
        .map_err(|e| AtlasError::network(e.to_string()))?;
    check_status(descriptor, &response)?;

    let body = response
        .bytes()
        .await
        .map_err(|e| AtlasError::network(e.to_string()))?;
    std::fs::write(path, &body)?;

    info!(
        source = %descriptor.key,
        path = %path.display(),
        bytes = body.len(),
        "Query response saved"
    );
    Ok(StagedPayload::File(path.to_path_buf()))
}

/// GET the body straight into memory; nothing is persisted.
async fn stage_in_memory(client: &Client, descriptor: &SourceDescriptor) -> Result<StagedPayload> {
    info!(source = %descriptor.key, url = %descriptor.url, "Fetching to memory");
    let response = client
        .get(descriptor.url.clone())
        .timeout(descriptor.timeout)
        .send()
        .await
        .map_err(|e| AtlasError::network(e.to_string()))?;
    check_status(descriptor, &response)?;

    let body = response
        .text()
        .await
        .map_err(|e| AtlasError::network(e.to_string()))?;
    info!(source = %descriptor.key, bytes = body.len(), "Fetched");
    Ok(StagedPayload::Memory(body))
}

fn staging_path(descriptor: &SourceDescriptor) -> Result<&Path> {
    descriptor.staging_path.as_deref().ok_or_else(|| {
        AtlasError::Config(format!(
            "source '{}': file strategy requires a staging path",
            descriptor.key
        ))
    })
}

fn check_status(descriptor: &SourceDescriptor, response: &reqwest::Response) -> Result<()> {
    if !response.status().is_success() {
        return Err(AtlasError::network(format!(
            "source '{}': {} returned HTTP {}",
            descriptor.key,
            descriptor.url,
            response.status()
        )));
    }
    Ok(())
}

fn download_bar(total_size: u64, key: &str) -> ProgressBar {
    let progress = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress.set_message(format!("Downloading {key}"));
    progress
}
