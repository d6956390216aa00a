use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};

use flowbatch::config::{Settings, strip_scheme};
use flowbatch::graph::UnsupportedConverter;
use flowbatch::loader::{load_batch, load_document, load_template, parse_assignment};
use flowbatch::remote::http::HttpEngineConnector;
use flowbatch::runtime::{BatchRequest, BatchStatus, Orchestrator};
use flowbatch::storage::{DocumentKind, DocumentStore, FileDocumentStore, OutputStore};
use flowbatch::template::{InputSet, extract_variables, scan_inputs, var_types};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory holding workflows/, templates/ and outputs/
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the placeholder variables of a workflow as JSON
    ExtractVars {
        /// Path to workflow.json
        workflow: PathBuf,
    },

    /// Print the literal node inputs of a workflow as JSON
    Scan {
        /// Path to workflow.json
        workflow: PathBuf,
    },

    /// Run a workflow with variables, once or as a batch
    Run {
        /// Path to workflow.json (optional if using --template)
        workflow: Option<PathBuf>,

        /// Template file saved from the web UI
        #[arg(long, short)]
        template: Option<PathBuf>,

        /// Set variable value: name=value
        #[arg(long = "set", value_parser = parse_assignment)]
        vars: Vec<(String, Value)>,

        /// Set file variable: name=path (a folder expands to one job per file)
        #[arg(long = "file", value_parser = parse_assignment)]
        files: Vec<(String, Value)>,

        /// JSON/YAML file with a list of input sets
        #[arg(long, short)]
        batch: Option<PathBuf>,

        /// Output directory
        #[arg(long, short, default_value = "./outputs")]
        out: PathBuf,

        /// Engine address (defaults to COMFY_BASE_URL or 127.0.0.1:8188)
        #[arg(long)]
        server: Option<String>,
    },

    /// Manage saved workflows
    Workflows {
        #[command(subcommand)]
        action: DocAction,
    },

    /// Manage saved templates
    Templates {
        #[command(subcommand)]
        action: DocAction,
    },

    /// List stored batch outputs, or the files of one batch
    Outputs { job_id: Option<String> },
}

#[derive(Subcommand)]
enum DocAction {
    List,
    Show { name: String },
    Save { name: String, file: PathBuf },
    Delete { name: String },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn manage_documents(store: &dyn DocumentStore, kind: DocumentKind, action: DocAction) -> Result<()> {
    match action {
        DocAction::List => print_json(&store.list(kind).await?)?,
        DocAction::Show { name } => print_json(&store.load(kind, &name).await?)?,
        DocAction::Save { name, file } => {
            let doc = load_document(&file)?;
            let saved = store.save(kind, &name, &doc).await?;
            info!("{} saved as {}", kind.label(), saved);
        }
        DocAction::Delete { name } => {
            store.delete(kind, &name).await?;
            info!("{} {} deleted", kind.label(), name);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    let converter = Arc::new(UnsupportedConverter);

    match cli.command {
        Commands::ExtractVars { workflow } => {
            let orchestrator = orchestrator(settings, converter);
            let graph = orchestrator.normalize(load_document(&workflow)?)?;
            print_json(&extract_variables(&graph))?;
        }

        Commands::Scan { workflow } => {
            let orchestrator = orchestrator(settings, converter);
            let graph = orchestrator.normalize(load_document(&workflow)?)?;
            print_json(&scan_inputs(&graph))?;
        }

        Commands::Run { workflow, template, vars, files, batch, out, server } => {
            let orchestrator = orchestrator(settings, converter);

            let (doc, declared) = match (template, workflow) {
                (Some(path), _) => {
                    let template = load_template(&path)?;
                    info!("Loaded template with {} variables", template.variables.len());
                    let graph = orchestrator.normalize(template.workflow.clone())?;
                    let declared = var_types(&graph, Some(&template));
                    (template.workflow, declared)
                }
                (None, Some(path)) => (load_document(&path)?, Default::default()),
                (None, None) => bail!("Either a workflow path or --template is required"),
            };

            let inputs: Vec<InputSet> = match batch {
                Some(path) => load_batch(&path)?,
                None => vec![vars.into_iter().chain(files).collect()],
            };

            let mut request = BatchRequest::new(doc, inputs);
            request.var_types = declared;
            request.server_address = server.map(|s| strip_scheme(&s));
            request.save_outputs = true;
            request.output_dir = Some(out.clone());

            let ticket = orchestrator.submit_batch(request).await?;
            let job_id = ticket.job_id.clone();
            let mut handle = ticket.handle;

            let outcome = tokio::select! {
                joined = &mut handle => joined,
                _ = tokio::signal::ctrl_c() => {
                    warn!(%job_id, "Interrupted, cancelling batch");
                    orchestrator.cancel_batch(&job_id).await?;
                    handle.await
                }
            };
            let snapshot = outcome.context("batch task panicked")??;

            match snapshot.status {
                BatchStatus::Cancelled => info!(
                    "Cancelled after {}/{} jobs. Output saved to: {}",
                    snapshot.completed,
                    snapshot.total,
                    out.display()
                ),
                _ => info!("Completed {} jobs. Output saved to: {}", snapshot.completed, out.display()),
            }
        }

        Commands::Workflows { action } => {
            let store = FileDocumentStore::new(settings.workflows_dir(), settings.templates_dir());
            manage_documents(&store, DocumentKind::Workflow, action).await?;
        }

        Commands::Templates { action } => {
            let store = FileDocumentStore::new(settings.workflows_dir(), settings.templates_dir());
            manage_documents(&store, DocumentKind::Template, action).await?;
        }

        Commands::Outputs { job_id } => {
            let store = OutputStore::new(settings.outputs_dir());
            match job_id {
                Some(job_id) => print_json(&store.list_files(&job_id).await?)?,
                None => print_json(&store.list_jobs().await?)?,
            }
        }
    }

    Ok(())
}

fn orchestrator(settings: Settings, converter: Arc<UnsupportedConverter>) -> Orchestrator {
    let connector = Arc::new(HttpEngineConnector::new(settings.poll_interval, settings.job_timeout));
    Orchestrator::new(connector, converter, settings)
}
