//! Output retrieval.
//!
//! Each manifest entry is written to `target_dir/<final URL segment>`. Entries are fetched
//! in manifest order, so when two share a file name the later one's content is what
//! remains. With `MaxConcurrentFetches` above 1 downloads overlap, and an entry whose file
//! name reappears later in the manifest is skipped so the result is the same.

use super::Orchestrator;
use crate::error::Result;
use crate::transport::{TransportRequest, io_context};
use crate::types::{LocalArtifact, OutputManifestEntry};
use crate::utils::{artifact_file_name, ensure_dir};
use futures::{StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

impl Orchestrator {
    /// Download every manifest entry into `target_dir`, creating it if needed
    ///
    /// Existing files are overwritten. The first failed download aborts the fetch; files
    /// written before it are left in place. Artifacts are returned in manifest order, one
    /// per file left on disk.
    pub async fn fetch_all(
        &self,
        manifest: &[OutputManifestEntry],
        target_dir: &Path,
    ) -> Result<Vec<LocalArtifact>> {
        ensure_dir(target_dir).await?;

        let planned = manifest
            .iter()
            .map(|entry| artifact_file_name(&entry.url).map(|name| (entry, target_dir.join(name))))
            .collect::<Result<Vec<_>>>()?;

        let concurrency = self.config.fetch.max_concurrent_fetches.max(1);
        tracing::debug!(
            entries = planned.len(),
            concurrency,
            target_dir = %target_dir.display(),
            "fetching outputs"
        );

        if concurrency == 1 {
            let mut artifacts = Vec::with_capacity(planned.len());
            for (entry, path) in planned {
                artifacts.push(self.fetch_entry(entry, path).await?);
            }
            return Ok(drop_overwritten(artifacts));
        }

        let selected = last_of_each_path(planned);
        let mut artifacts: Vec<(usize, LocalArtifact)> = futures::stream::iter(selected)
            .map(|(index, entry, path)| async move {
                self.fetch_entry(entry, path)
                    .await
                    .map(|artifact| (index, artifact))
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        artifacts.sort_by_key(|(index, _)| *index);
        Ok(artifacts.into_iter().map(|(_, artifact)| artifact).collect())
    }

    async fn fetch_entry(&self, entry: &OutputManifestEntry, path: PathBuf) -> Result<LocalArtifact> {
        tracing::info!(name = %entry.name, format = %entry.format, "retrieving output");

        let mut response = self
            .transport
            .send(TransportRequest::get(&entry.url))
            .await?
            .error_for_status(&format!("download of {}", entry.url))?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| io_context(e, "create", &path))?;

        let mut bytes: u64 = 0;
        while let Some(chunk) = response.next_chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| io_context(e, "write", &path))?;
            bytes += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| io_context(e, "flush", &path))?;

        tracing::debug!(path = %path.display(), bytes, "output saved");

        Ok(LocalArtifact {
            name: entry.name.clone(),
            format: entry.format.clone(),
            url: entry.url.clone(),
            path,
            bytes,
        })
    }
}

/// Drop artifacts whose file a later manifest entry overwrote
fn drop_overwritten(artifacts: Vec<LocalArtifact>) -> Vec<LocalArtifact> {
    let mut last_index: HashMap<PathBuf, usize> = HashMap::new();
    for (index, artifact) in artifacts.iter().enumerate() {
        last_index.insert(artifact.path.clone(), index);
    }

    artifacts
        .into_iter()
        .enumerate()
        .filter(|(index, artifact)| last_index.get(&artifact.path) == Some(index))
        .map(|(_, artifact)| artifact)
        .collect()
}

/// Keep only the last entry for each destination path, remembering manifest positions
fn last_of_each_path(
    planned: Vec<(&OutputManifestEntry, PathBuf)>,
) -> Vec<(usize, &OutputManifestEntry, PathBuf)> {
    let mut last_index: HashMap<PathBuf, usize> = HashMap::new();
    for (index, (_, path)) in planned.iter().enumerate() {
        last_index.insert(path.clone(), index);
    }

    planned
        .into_iter()
        .enumerate()
        .filter_map(|(index, (entry, path))| {
            if last_index.get(&path) == Some(&index) {
                Some((index, entry, path))
            } else {
                tracing::warn!(
                    name = %entry.name,
                    path = %path.display(),
                    "skipping output overwritten by a later manifest entry"
                );
                None
            }
        })
        .collect()
}
