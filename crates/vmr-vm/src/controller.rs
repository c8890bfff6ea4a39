// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The external execution channel into the VM.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vmr_domain_types::TaskSpec;

/// Reply of the in-VM automation server to a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub returncode: Option<i32>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            status: "success".into(),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// The command failed when the server reports a non-empty error.
    pub fn failure(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }
}

/// Transport to a running VM session. Implementations are expected to be
/// thin; retry, caching and settle policy live in [`crate::VmInterface`].
#[async_trait]
pub trait VmController: Send + Sync {
    /// Restore the VM to the task's initial state.
    async fn reset(&self, task: &TaskSpec) -> Result<()>;

    /// Fetch the current screen as encoded image bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Run one automation command.
    async fn execute(&self, command: &str) -> Result<CommandResponse>;

    async fn start_recording(&self) -> Result<()>;

    /// Stop the screen recording and write the video to `dest`.
    async fn end_recording(&self, dest: &Path) -> Result<()>;

    /// Score the current VM state against the task.
    async fn evaluate(&self) -> Result<f64>;
}
