use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Workflow,
    Template,
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Workflow => "Workflow",
            DocumentKind::Template => "Template",
        }
    }
}

/// Keeps ASCII letters, digits, `-` and `_`. Fails when nothing is left.
pub fn sanitize_name(name: &str) -> Result<String> {
    let safe: String = name
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        bail!("Invalid name: {:?}", name);
    }
    Ok(safe)
}

// --- Interfaces ---

/// Named workflow and template documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores `doc` and returns the sanitized name it was stored under.
    async fn save(&self, kind: DocumentKind, name: &str, doc: &Value) -> Result<String>;
    async fn load(&self, kind: DocumentKind, name: &str) -> Result<Value>;
    /// Removing a missing document is not an error.
    async fn delete(&self, kind: DocumentKind, name: &str) -> Result<()>;
    /// Stored names, sorted.
    async fn list(&self, kind: DocumentKind) -> Result<Vec<String>>;
}

// --- File Implementation ---

/// One `<name>.json` per document under a directory per kind.
pub struct FileDocumentStore {
    workflows_dir: PathBuf,
    templates_dir: PathBuf,
}

impl FileDocumentStore {
    pub fn new(workflows_dir: impl Into<PathBuf>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            workflows_dir: workflows_dir.into(),
            templates_dir: templates_dir.into(),
        }
    }

    fn dir(&self, kind: DocumentKind) -> &Path {
        match kind {
            DocumentKind::Workflow => &self.workflows_dir,
            DocumentKind::Template => &self.templates_dir,
        }
    }

    fn path(&self, kind: DocumentKind, name: &str) -> Result<PathBuf> {
        Ok(self.dir(kind).join(format!("{}.json", sanitize_name(name)?)))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn save(&self, kind: DocumentKind, name: &str, doc: &Value) -> Result<String> {
        let safe = sanitize_name(name)?;
        let dir = self.dir(kind);
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{safe}.json"));
        let body = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(safe)
    }

    async fn load(&self, kind: DocumentKind, name: &str) -> Result<Value> {
        let path = self.path(kind, name)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!("{} not found: {}", kind.label(), name)
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&body).with_context(|| format!("Failed to parse {}", path.display()))
    }

    async fn delete(&self, kind: DocumentKind, name: &str) -> Result<()> {
        let path = self.path(kind, name)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn list(&self, kind: DocumentKind) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.dir(kind)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(name) = file_name.strip_suffix(".json") {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<(DocumentKind, String), Value>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn save(&self, kind: DocumentKind, name: &str, doc: &Value) -> Result<String> {
        let safe = sanitize_name(name)?;
        self.docs.write().await.insert((kind, safe.clone()), doc.clone());
        Ok(safe)
    }

    async fn load(&self, kind: DocumentKind, name: &str) -> Result<Value> {
        let safe = sanitize_name(name)?;
        self.docs
            .read()
            .await
            .get(&(kind, safe))
            .cloned()
            .ok_or_else(|| anyhow!("{} not found: {}", kind.label(), name))
    }

    async fn delete(&self, kind: DocumentKind, name: &str) -> Result<()> {
        let safe = sanitize_name(name)?;
        self.docs.write().await.remove(&(kind, safe));
        Ok(())
    }

    async fn list(&self, kind: DocumentKind) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .docs
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
