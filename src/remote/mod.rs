use anyhow::Result;
use async_trait::async_trait;

use crate::graph::Graph;

pub mod http;

/// What the engine produced for one output node.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Encoded PNG bytes.
    Image(Vec<u8>),
    Text(String),
}

/// Outputs of one submission in the order the engine reported them.
pub type EngineOutputs = Vec<(String, Artifact)>;

/// Opens sessions against an engine and delivers out-of-band interrupts.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    async fn connect(&self, server: &str) -> Result<Box<dyn EngineSession>>;

    /// Asks the engine at `server` to stop its current unit of work.
    async fn interrupt(&self, server: &str) -> Result<()>;
}

/// A connected client. Calls are made from one task at a time.
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Uploads a local file, returning the engine-side reference to it.
    async fn upload_file(&mut self, data: Vec<u8>, filename: &str) -> Result<String>;

    /// Queues a concrete graph and waits until its outputs are available.
    async fn submit(&mut self, graph: &Graph) -> Result<EngineOutputs>;

    async fn close(&mut self) -> Result<()>;
}
