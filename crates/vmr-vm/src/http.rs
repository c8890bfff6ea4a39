// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP transport to the in-VM automation server

use crate::controller::{CommandResponse, VmController};
use crate::error::{Result, VmError};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use vmr_domain_types::TaskSpec;

/// Prepended to every command so the bare function names resolve.
pub const COMMAND_PRELUDE: &str = "import pyautogui; import time; pyautogui.FAILSAFE = False; \
                                   from pyautogui import *; from time import sleep; ";

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    command: [&'a str; 3],
    shell: bool,
}

#[derive(Debug, Serialize)]
struct ResetRequest<'a> {
    task_config: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    score: Option<f64>,
}

/// Talks to the automation server running inside the VM and, optionally, to
/// the task harness that knows how to reset and score tasks.
#[derive(Debug, Clone)]
pub struct HttpController {
    http_client: HttpClient,
    server_url: Url,
    harness_url: Option<Url>,
}

impl HttpController {
    pub fn new(server_url: Url, harness_url: Option<Url>, timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .user_agent("vm-recorder/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            server_url,
            harness_url,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn harness(&self, what: &'static str) -> Result<&Url> {
        self.harness_url.as_ref().ok_or(VmError::NoHarness(what))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(VmError::Server {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl VmController for HttpController {
    async fn reset(&self, task: &TaskSpec) -> Result<()> {
        let Some(harness) = self.harness_url.as_ref() else {
            warn!(task = %task.name, "No harness configured, skipping VM reset");
            return Ok(());
        };
        info!(task = %task.name, domain = %task.domain, "Resetting VM");
        let url = harness.join("reset")?;
        let response = self
            .http_client
            .post(url)
            .json(&ResetRequest {
                task_config: &task.config,
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let url = self.server_url.join("screenshot")?;
        let response = Self::check(self.http_client.get(url).send().await?).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(VmError::EmptyScreenshot);
        }
        Ok(bytes.to_vec())
    }

    async fn execute(&self, command: &str) -> Result<CommandResponse> {
        let script = format!("{}{}", COMMAND_PRELUDE, command);
        debug!(command, "Dispatching command");
        let url = self.server_url.join("execute")?;
        let response = self
            .http_client
            .post(url)
            .json(&ExecuteRequest {
                command: ["python", "-c", &script],
                shell: false,
            })
            .send()
            .await?;
        let text = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn start_recording(&self) -> Result<()> {
        let url = self.server_url.join("start_recording")?;
        Self::check(self.http_client.post(url).send().await?).await?;
        Ok(())
    }

    async fn end_recording(&self, dest: &Path) -> Result<()> {
        let url = self.server_url.join("end_recording")?;
        let response = Self::check(self.http_client.post(url).send().await?).await?;
        let bytes = response.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        debug!(path = %dest.display(), bytes = bytes.len(), "Recording saved");
        Ok(())
    }

    async fn evaluate(&self) -> Result<f64> {
        let url = self.harness("evaluation")?.join("evaluate")?;
        let text = Self::check(self.http_client.post(url).send().await?).await?.text().await?;
        let reply: EvaluateResponse = serde_json::from_str(&text)?;
        Ok(reply.score.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_request_shape() {
        let body = serde_json::to_value(ExecuteRequest {
            command: ["python", "-c", "click(1, 2)"],
            shell: false,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"command": ["python", "-c", "click(1, 2)"], "shell": false})
        );
    }

    #[test]
    fn evaluation_requires_harness() {
        let controller = HttpController::new(
            Url::parse("http://localhost:5000/").unwrap(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(
            controller.harness("evaluation"),
            Err(VmError::NoHarness("evaluation"))
        ));
    }
}
