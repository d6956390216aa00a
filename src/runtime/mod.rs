pub mod batch;
pub mod engine;
pub mod expander;
pub mod output;

pub use batch::{BatchRegistry, BatchSnapshot, BatchState, BatchStatus, JobResult};
pub use engine::{BatchRequest, BatchTicket, Orchestrator};
pub use expander::FolderExpander;
pub use output::{ArtifactKind, OutputArtifact, OutputMode};
