use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "127.0.0.1:8188";

/// Runtime settings shared by the CLI and the orchestrator.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Engine address without scheme, e.g. `127.0.0.1:8188`.
    pub server_address: String,
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    /// How long a finished batch stays queryable.
    pub result_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER.to_string(),
            data_dir: PathBuf::from("data"),
            poll_interval: Duration::from_millis(500),
            job_timeout: Duration::from_secs(600),
            result_grace: Duration::from_secs(300),
        }
    }
}

impl Settings {
    /// Defaults, with the engine address taken from `COMFY_BASE_URL` when set.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = env::var("COMFY_BASE_URL") {
            settings.server_address = strip_scheme(&url);
        }
        settings
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.data_dir.join("workflows")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }
}

pub fn strip_scheme(address: &str) -> String {
    address
        .trim()
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .to_string()
}
