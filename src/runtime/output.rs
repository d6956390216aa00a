use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::info;

use crate::remote::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Text,
}

/// A captured engine output, tagged with the node that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputArtifact {
    pub node_id: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Stored file name, relative to the batch output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Inline payload: a `data:` URL for images, the text itself otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Where captured outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    Inline,
    /// Write each output under `dir` and keep the inline payload as well.
    Stored { dir: PathBuf },
}

pub fn image_data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn inline(node_id: &str, artifact: &Artifact) -> OutputArtifact {
    let (kind, data) = match artifact {
        Artifact::Image(bytes) => (ArtifactKind::Image, image_data_url(bytes)),
        Artifact::Text(text) => (ArtifactKind::Text, text.clone()),
    };
    OutputArtifact {
        node_id: node_id.to_string(),
        kind,
        filename: None,
        data: Some(data),
    }
}

/// Records one output of job `index` according to `mode`.
pub async fn capture(
    index: usize,
    node_id: &str,
    artifact: &Artifact,
    mode: &OutputMode,
) -> io::Result<OutputArtifact> {
    let mut record = inline(node_id, artifact);
    if let OutputMode::Stored { dir } = mode {
        let filename = format!("run_{}_{}.{}", index, node_id, extension(artifact));
        let path = dir.join(&filename);
        write_artifact(&path, artifact).await?;
        info!(path = %path.display(), "Saved output");
        record.filename = Some(filename);
    }
    Ok(record)
}

fn extension(artifact: &Artifact) -> &'static str {
    match artifact {
        Artifact::Image(_) => "png",
        Artifact::Text(_) => "txt",
    }
}

async fn write_artifact(path: &Path, artifact: &Artifact) -> io::Result<()> {
    match artifact {
        Artifact::Image(bytes) => tokio::fs::write(path, bytes).await,
        Artifact::Text(text) => tokio::fs::write(path, text.as_bytes()).await,
    }
}
