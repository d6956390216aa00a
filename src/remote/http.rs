use std::time::Duration;

use anyhow::{Context as _, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Artifact, EngineConnector, EngineOutputs, EngineSession};
use crate::graph::Graph;

/// Talks to the engine's HTTP API, polling history for results.
#[derive(Debug, Clone)]
pub struct HttpEngineConnector {
    client: Client,
    poll_interval: Duration,
    job_timeout: Duration,
}

impl HttpEngineConnector {
    pub fn new(poll_interval: Duration, job_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            poll_interval,
            job_timeout,
        }
    }
}

fn base_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", server.trim_end_matches('/'))
    }
}

#[async_trait]
impl EngineConnector for HttpEngineConnector {
    async fn connect(&self, server: &str) -> Result<Box<dyn EngineSession>> {
        let base = base_url(server);
        // Reachability probe; a wrong address fails here, before any upload.
        self.client
            .get(format!("{base}/system_stats"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("engine at {base} is not reachable"))?;

        let client_id = Uuid::new_v4().to_string();
        debug!(%client_id, server = %base, "Engine session opened");
        Ok(Box::new(HttpEngineSession {
            client: self.client.clone(),
            base,
            client_id,
            poll_interval: self.poll_interval,
            job_timeout: self.job_timeout,
        }))
    }

    async fn interrupt(&self, server: &str) -> Result<()> {
        self.client
            .post(format!("{}/interrupt", base_url(server)))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn str_field<'a>(value: &'a Value, name: &str) -> &'a str {
    value.get(name).and_then(Value::as_str).unwrap_or("")
}

struct HttpEngineSession {
    client: Client,
    base: String,
    client_id: String,
    poll_interval: Duration,
    job_timeout: Duration,
}

impl HttpEngineSession {
    async fn wait_for_history(&self, prompt_id: &str) -> Result<Value> {
        let deadline = Instant::now() + self.job_timeout;
        loop {
            let history: Value = self
                .client
                .get(format!("{}/history/{}", self.base, prompt_id))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if let Some(entry) = history.get(prompt_id) {
                return Ok(entry.clone());
            }
            if Instant::now() >= deadline {
                bail!("prompt {} did not finish within {:?}", prompt_id, self.job_timeout);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch_image(&self, image: &Value) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(format!("{}/view", self.base))
            .query(&[
                ("filename", str_field(image, "filename")),
                ("subfolder", str_field(image, "subfolder")),
                ("type", str_field(image, "type")),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn to_artifact(&self, output: &Value) -> Result<Artifact> {
        if let Some(image) = output.get("images").and_then(Value::as_array).and_then(|a| a.first()) {
            return Ok(Artifact::Image(self.fetch_image(image).await?));
        }
        for key in ["text", "string"] {
            if let Some(parts) = output.get(key).and_then(Value::as_array) {
                let text = parts
                    .iter()
                    .map(|p| p.as_str().map(str::to_string).unwrap_or_else(|| p.to_string()))
                    .collect::<Vec<_>>()
                    .join("\n");
                return Ok(Artifact::Text(text));
            }
        }
        Ok(Artifact::Text(output.to_string()))
    }
}

#[async_trait]
impl EngineSession for HttpEngineSession {
    async fn upload_file(&mut self, data: Vec<u8>, filename: &str) -> Result<String> {
        let form = Form::new()
            .part("image", Part::bytes(data).file_name(filename.to_string()))
            .text("overwrite", "true");
        let resp: Value = self
            .client
            .post(format!("{}/upload/image", self.base))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let name = resp
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("upload response has no name: {}", resp))?;
        match resp.get("subfolder").and_then(Value::as_str) {
            Some(sub) if !sub.is_empty() => Ok(format!("{sub}/{name}")),
            _ => Ok(name.to_string()),
        }
    }

    async fn submit(&mut self, graph: &Graph) -> Result<EngineOutputs> {
        let resp = self
            .client
            .post(format!("{}/prompt", self.base))
            .json(&json!({ "prompt": graph, "client_id": self.client_id }))
            .send()
            .await?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            bail!("engine rejected prompt ({}): {}", status, body);
        }
        let prompt_id = body
            .get("prompt_id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("engine response has no prompt_id: {}", body))?
            .to_string();
        info!(%prompt_id, "Prompt queued");

        let entry = self.wait_for_history(&prompt_id).await?;
        if entry.pointer("/status/status_str").and_then(Value::as_str) == Some("error") {
            bail!("prompt {} failed on the engine: {}", prompt_id, entry["status"]);
        }

        let mut outputs = Vec::new();
        if let Some(nodes) = entry.get("outputs").and_then(Value::as_object) {
            for (node_id, output) in nodes {
                outputs.push((node_id.clone(), self.to_artifact(output).await?));
            }
        }
        Ok(outputs)
    }

    async fn close(&mut self) -> Result<()> {
        debug!(client_id = %self.client_id, "Engine session closed");
        Ok(())
    }
}
