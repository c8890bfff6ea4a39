// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Task descriptions handed to the VM harness and the recorder

use serde::{Deserialize, Serialize};

pub const MISSING_INSTRUCTION: &str = "No instruction provided";

/// One task to demonstrate: its location in the task catalogue plus the raw
/// harness configuration it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub domain: String,
    pub name: String,
    pub instruction: String,
    /// Full task configuration, passed through to the harness on reset.
    pub config: serde_json::Value,
}

impl TaskSpec {
    /// Builds a task from its configuration document, reading the
    /// instruction from its `instruction` field.
    pub fn from_config(domain: &str, name: &str, config: serde_json::Value) -> Self {
        let instruction = config
            .get("instruction")
            .and_then(|v| v.as_str())
            .unwrap_or(MISSING_INSTRUCTION)
            .to_string();
        Self {
            domain: domain.to_string(),
            name: name.to_string(),
            instruction,
            config,
        }
    }

    /// The first related application, used as the transcript's domain label.
    pub fn primary_app(&self) -> Option<&str> {
        self.config
            .get("related_apps")
            .and_then(|apps| apps.as_array())
            .and_then(|apps| apps.first())
            .and_then(|app| app.as_str())
    }

    /// Task id from the config, falling back to the task name.
    pub fn id(&self) -> &str {
        self.config.get("id").and_then(|v| v.as_str()).unwrap_or(&self.name)
    }
}
