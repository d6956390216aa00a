use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::{BatchError, FormatError};
use crate::graph::{Graph, GraphConverter, normalize};
use crate::remote::{EngineConnector, EngineSession};
use crate::runtime::batch::{
    BatchRegistry, BatchSnapshot, BatchState, BatchStatus, JobResult, new_job_id,
};
use crate::runtime::expander::FolderExpander;
use crate::runtime::output::{OutputArtifact, OutputMode, capture};
use crate::template::{InputSet, inject, var_types};

/// One batch invocation as submitted by a caller.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Workflow document in either representation.
    pub workflow: Value,
    pub inputs: Vec<InputSet>,
    /// Declared input types (e.g. from a template); extracted pattern types fill the rest.
    pub var_types: HashMap<String, String>,
    pub server_address: Option<String>,
    /// Write outputs to disk in addition to keeping them inline.
    pub save_outputs: bool,
    /// Where stored outputs go; defaults to `<outputs>/<job_id>`.
    pub output_dir: Option<PathBuf>,
}

impl BatchRequest {
    pub fn new(workflow: Value, inputs: Vec<InputSet>) -> Self {
        Self {
            workflow,
            inputs,
            var_types: HashMap::new(),
            server_address: None,
            save_outputs: false,
            output_dir: None,
        }
    }
}

/// Handle to a batch driven on its own task.
#[derive(Debug)]
pub struct BatchTicket {
    pub job_id: String,
    pub handle: JoinHandle<Result<BatchSnapshot, BatchError>>,
}

struct PreparedBatch {
    state: Arc<BatchState>,
    graph: Graph,
    jobs: Vec<InputSet>,
    mode: OutputMode,
}

/// Runs workflows against the engine: single jobs and sequential batches.
#[derive(Clone)]
pub struct Orchestrator {
    connector: Arc<dyn EngineConnector>,
    converter: Arc<dyn GraphConverter>,
    registry: BatchRegistry,
    settings: Arc<Settings>,
}

impl Orchestrator {
    pub fn new(
        connector: Arc<dyn EngineConnector>,
        converter: Arc<dyn GraphConverter>,
        settings: Settings,
    ) -> Self {
        Self {
            connector,
            converter,
            registry: BatchRegistry::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &BatchRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn normalize(&self, workflow: Value) -> Result<Graph, FormatError> {
        normalize(workflow, self.converter.as_ref())
    }

    fn server_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.settings.server_address)
    }

    /// Runs one input set and returns its outputs inline.
    pub async fn run_single_job(
        &self,
        workflow: Value,
        inputs: InputSet,
        server_address: Option<&str>,
    ) -> Result<Vec<OutputArtifact>, BatchError> {
        let graph = self.normalize(workflow)?;
        let server = self.server_for(server_address).to_string();

        let mut session = self.connect(&server).await?;
        info!(%server, "Running workflow");
        let outcome = execute_job(session.as_mut(), &graph, 0, &inputs, &OutputMode::Inline).await;
        close_session(session.as_mut()).await;
        outcome
    }

    /// Registers and drives a batch in the caller's task.
    ///
    /// A failed job ends the batch with `Failed`; results recorded before it
    /// stay readable through [`Orchestrator::get_batch_status`].
    pub async fn run_batch(&self, request: BatchRequest) -> Result<BatchSnapshot, BatchError> {
        let prepared = self.prepare(request).await?;
        self.drive(prepared).await
    }

    /// Registers a batch and drives it on a new task.
    pub async fn submit_batch(&self, request: BatchRequest) -> Result<BatchTicket, BatchError> {
        let prepared = self.prepare(request).await?;
        let job_id = prepared.state.job_id.clone();
        let this = self.clone();
        let handle = tokio::spawn(async move { this.drive(prepared).await });
        Ok(BatchTicket { job_id, handle })
    }

    /// Stops a batch before its next job and interrupts the engine's current work.
    pub async fn cancel_batch(&self, job_id: &str) -> Result<(), BatchError> {
        let state = self.registry.get(job_id)?;
        if state.status().await.is_terminal() {
            return Ok(());
        }
        state.cancel();
        info!(%job_id, "Batch cancellation requested");

        if let Err(e) = self.connector.interrupt(&state.server_address).await {
            warn!(%job_id, server = %state.server_address, error = %e, "Failed to interrupt engine");
        }
        Ok(())
    }

    pub async fn get_batch_status(&self, job_id: &str) -> Result<BatchSnapshot, BatchError> {
        Ok(self.registry.get(job_id)?.snapshot().await)
    }

    async fn connect(&self, server: &str) -> Result<Box<dyn EngineSession>, BatchError> {
        self.connector
            .connect(server)
            .await
            .map_err(|source| BatchError::Connect { server: server.to_string(), source })
    }

    async fn prepare(&self, request: BatchRequest) -> Result<PreparedBatch, BatchError> {
        if request.inputs.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let graph = self.normalize(request.workflow)?;

        let mut types = var_types(&graph, None);
        types.extend(request.var_types);
        let inputs = request.inputs;
        let jobs = tokio::task::spawn_blocking(move || FolderExpander::new(&types).expand_all(&inputs))
            .await
            .map_err(std::io::Error::other)??;

        let job_id = new_job_id();
        let mode = if request.save_outputs {
            let dir = request
                .output_dir
                .unwrap_or_else(|| self.settings.outputs_dir().join(&job_id));
            tokio::fs::create_dir_all(&dir).await?;
            OutputMode::Stored { dir }
        } else {
            OutputMode::Inline
        };

        let server = self.server_for(request.server_address.as_deref()).to_string();
        let state = self.registry.register(BatchState::new(job_id, server, jobs.len()));
        info!(job_id = %state.job_id, total = jobs.len(), "Batch registered");

        Ok(PreparedBatch { state, graph, jobs, mode })
    }

    async fn drive(&self, batch: PreparedBatch) -> Result<BatchSnapshot, BatchError> {
        let PreparedBatch { state, graph, jobs, mode } = batch;
        state.set_status(BatchStatus::Running).await;

        let outcome = match self.connect(&state.server_address).await {
            Ok(mut session) => {
                let outcome = run_jobs(&state, session.as_mut(), &graph, &jobs, &mode).await;
                close_session(session.as_mut()).await;
                outcome
            }
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(JobsOutcome::Finished) => {
                state.set_status(BatchStatus::Completed).await;
                info!(job_id = %state.job_id, total = state.total, "Batch completed");
                Ok(state.snapshot().await)
            }
            Ok(JobsOutcome::Cancelled) => {
                state.set_status(BatchStatus::Cancelled).await;
                Ok(state.snapshot().await)
            }
            Err(e) => {
                error!(job_id = %state.job_id, error = %e, "Batch failed");
                state.fail(e.to_string()).await;
                Err(e)
            }
        };

        self.registry.expire_after(&state.job_id, self.settings.result_grace);
        result
    }
}

enum JobsOutcome {
    Finished,
    Cancelled,
}

async fn run_jobs(
    state: &BatchState,
    session: &mut dyn EngineSession,
    graph: &Graph,
    jobs: &[InputSet],
    mode: &OutputMode,
) -> Result<JobsOutcome, BatchError> {
    for (index, inputs) in jobs.iter().enumerate() {
        if state.is_cancelled() {
            info!(job_id = %state.job_id, completed = index, total = jobs.len(), "Batch cancelled");
            return Ok(JobsOutcome::Cancelled);
        }
        info!(job_id = %state.job_id, "Running job {}/{}", index + 1, jobs.len());

        let outputs = match execute_job(session, graph, index, inputs, mode).await {
            Ok(outputs) => outputs,
            // an interrupted job surfaces as an engine error
            Err(e) if state.is_cancelled() => {
                info!(job_id = %state.job_id, completed = index, error = %e, "Batch cancelled during job");
                return Ok(JobsOutcome::Cancelled);
            }
            Err(e) => return Err(e),
        };
        state
            .push_result(JobResult { index, inputs: inputs.clone(), outputs })
            .await;
    }
    Ok(JobsOutcome::Finished)
}

/// Uploads local files, injects, submits and captures the outputs of one job.
async fn execute_job(
    session: &mut dyn EngineSession,
    graph: &Graph,
    index: usize,
    inputs: &InputSet,
    mode: &OutputMode,
) -> Result<Vec<OutputArtifact>, BatchError> {
    let resolved = upload_local_files(session, index, inputs).await?;
    let concrete = inject(graph, &resolved);

    let outputs = session
        .submit(&concrete)
        .await
        .map_err(|source| BatchError::Engine { index, source })?;

    let mut artifacts = Vec::with_capacity(outputs.len());
    for (node_id, artifact) in &outputs {
        artifacts.push(capture(index, node_id, artifact, mode).await?);
    }
    Ok(artifacts)
}

/// Replaces values naming an existing local file with the engine's reference.
async fn upload_local_files(
    session: &mut dyn EngineSession,
    index: usize,
    inputs: &InputSet,
) -> Result<InputSet, BatchError> {
    let mut resolved = inputs.clone();
    for (key, value) in inputs {
        let Some(path) = value.as_str().map(Path::new) else {
            continue;
        };
        let is_file = tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file());
        if !is_file {
            continue;
        }

        info!(variable = %key, path = %path.display(), "Uploading");
        let upload_err = |source: anyhow::Error| BatchError::Upload {
            index,
            path: path.to_path_buf(),
            source,
        };
        let data = tokio::fs::read(path).await.map_err(|e| upload_err(e.into()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.clone());
        let reference = session.upload_file(data, &filename).await.map_err(upload_err)?;
        info!(variable = %key, %reference, "Uploaded");

        resolved.insert(key.clone(), Value::String(reference));
    }
    Ok(resolved)
}

async fn close_session(session: &mut dyn EngineSession) {
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close engine session");
    }
}
