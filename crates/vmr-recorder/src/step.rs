// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use serde::{Deserialize, Serialize};
use vmr_domain_types::{ActionKind, ActionParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Path of the step's "before" screenshot, empty if it could not be saved.
    pub screenshot: String,
}

/// One line of `trajectory.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step: usize,
    pub observation: Observation,
    pub instruction: String,
    pub action: String,
    pub action_type: ActionKind,
    /// Unix time in seconds.
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_details: Option<ActionParams>,
}
