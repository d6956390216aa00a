use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A node entry that carries an `inputs` block but no `class_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIssue {
    pub node_id: String,
    pub title: String,
}

impl fmt::Display for NodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node #{} ({}) is missing 'class_type'", self.node_id, self.title)
    }
}

fn join_issues(issues: &[NodeIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid workflow format:\n{}", join_issues(.issues))]
    MissingClassType { issues: Vec<NodeIssue> },

    #[error("Workflow must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("UI workflow conversion failed: {0:#}")]
    Conversion(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Batch not found: {0}")]
    NotFound(String),

    #[error("Batch has no input sets")]
    EmptyBatch,

    #[error("Upload of '{}' failed in job {index}: {source:#}", .path.display())]
    Upload {
        index: usize,
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Engine failure in job {index}: {source:#}")]
    Engine { index: usize, source: anyhow::Error },

    #[error("Could not connect to engine at {server}: {source:#}")]
    Connect { server: String, source: anyhow::Error },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Job index the failure happened in, if it is tied to one.
    pub fn job_index(&self) -> Option<usize> {
        match self {
            BatchError::Upload { index, .. } | BatchError::Engine { index, .. } => Some(*index),
            _ => None,
        }
    }
}
