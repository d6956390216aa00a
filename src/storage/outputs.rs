use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::BatchError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputJob {
    pub job_id: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub filename: String,
    pub url: String,
}

/// Read-only view over stored batch outputs (`<root>/<job_id>/*.png`).
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Job directories, newest name first.
    pub async fn list_jobs(&self) -> io::Result<Vec<OutputJob>> {
        let mut jobs = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(jobs),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let job_id = entry.file_name().to_string_lossy().into_owned();
            let file_count = png_files(&entry.path()).await?.len();
            jobs.push(OutputJob { job_id, file_count });
        }
        jobs.sort_by(|a, b| b.job_id.cmp(&a.job_id));
        Ok(jobs)
    }

    pub async fn list_files(&self, job_id: &str) -> Result<Vec<OutputFile>, BatchError> {
        let dir = self.job_dir(job_id)?;
        let files = png_files(&dir)
            .await?
            .into_iter()
            .map(|filename| OutputFile {
                url: format!("/api/outputs/{job_id}/{filename}"),
                filename,
            })
            .collect();
        Ok(files)
    }

    /// Path of one stored file, if it exists.
    pub async fn file_path(&self, job_id: &str, filename: &str) -> Result<PathBuf, BatchError> {
        if !is_plain_name(filename) {
            return Err(BatchError::NotFound(format!("{job_id}/{filename}")));
        }
        let path = self.job_dir(job_id)?.join(filename);
        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            Ok(path)
        } else {
            Err(BatchError::NotFound(format!("{job_id}/{filename}")))
        }
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf, BatchError> {
        let dir = self.root.join(job_id);
        if is_plain_name(job_id) && dir.is_dir() {
            Ok(dir)
        } else {
            Err(BatchError::NotFound(job_id.to_string()))
        }
    }
}

/// Rejects names that could escape the output root.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

async fn png_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".png") {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}
