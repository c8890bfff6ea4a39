// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Session-level policy on top of a [`VmController`]
//!
//! `VmInterface` is the only thing the rest of the recorder talks to. It
//! turns every controller failure into a value: command failures become an
//! unsuccessful [`ExecutionResult`], screenshot failures fall back to the
//! last good frame, and evaluation failures score zero.

use crate::command;
use crate::controller::VmController;
use crate::error::{Result, VmError};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vmr_domain_types::{Intent, TaskSpec};

/// A decoded screenshot. Cheap to clone.
pub type Frame = Arc<DynamicImage>;

#[derive(Debug, Clone, PartialEq)]
pub struct VmTimings {
    /// Pause after a reset before the desktop is considered stable.
    pub reset_settle: Duration,
    /// Pause after a successful action before the next screenshot.
    pub action_settle: Duration,
    pub screenshot_attempts: u32,
    pub retry_delay: Duration,
    /// Consecutive exhausted fetches tolerated before reporting an outage.
    pub max_stale_fetches: u32,
}

impl Default for VmTimings {
    fn default() -> Self {
        Self {
            reset_settle: Duration::from_secs(3),
            action_settle: Duration::from_millis(500),
            screenshot_attempts: 3,
            retry_delay: Duration::from_secs(1),
            max_stale_fetches: 5,
        }
    }
}

/// Outcome of one dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub command: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct SessionState {
    last_frame: Option<Frame>,
    stale_fetches: u32,
    recording: bool,
}

pub struct VmInterface {
    controller: Arc<dyn VmController>,
    timings: VmTimings,
    state: Mutex<SessionState>,
}

impl VmInterface {
    pub fn new(controller: Arc<dyn VmController>, timings: VmTimings) -> Self {
        Self {
            controller,
            timings,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn timings(&self) -> &VmTimings {
        &self.timings
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last successfully decoded frame, if any.
    pub fn last_frame(&self) -> Option<Frame> {
        self.state().last_frame.clone()
    }

    /// Reset the VM for `task` and wait for it to settle. The frame cache is
    /// dropped so nothing from a previous task is shown.
    pub async fn reset(&self, task: &TaskSpec) -> Result<()> {
        info!(task = %task.name, "Resetting environment");
        if let Err(e) = self.controller.reset(task).await {
            error!(task = %task.name, error = %e, "Failed to reset environment");
            return Err(e);
        }
        {
            let mut state = self.state();
            state.last_frame = None;
            state.stale_fetches = 0;
        }
        tokio::time::sleep(self.timings.reset_settle).await;
        Ok(())
    }

    /// One fetch-and-decode attempt. A decoded frame replaces the cache.
    pub async fn screenshot(&self) -> Result<Frame> {
        let bytes = self.controller.screenshot().await?;
        if bytes.is_empty() {
            return Err(VmError::EmptyScreenshot);
        }
        let frame = Arc::new(image::load_from_memory(&bytes)?);
        self.state().last_frame = Some(frame.clone());
        Ok(frame)
    }

    /// Fetch a screenshot with bounded retries.
    ///
    /// When every attempt fails the cached frame is returned, or `None` if
    /// there never was one. After `max_stale_fetches` exhausted calls in a
    /// row an error is returned instead so the outage becomes visible.
    pub async fn screenshot_with_retry(&self) -> Result<Option<Frame>> {
        let attempts = self.timings.screenshot_attempts.max(1);
        for attempt in 1..=attempts {
            match self.screenshot().await {
                Ok(frame) => {
                    self.state().stale_fetches = 0;
                    return Ok(Some(frame));
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Screenshot fetch failed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.timings.retry_delay).await;
            }
        }

        let mut state = self.state();
        state.stale_fetches += 1;
        if state.stale_fetches >= self.timings.max_stale_fetches {
            error!(fetches = state.stale_fetches, "Screenshots unavailable");
            return Err(VmError::StaleScreenshots {
                fetches: state.stale_fetches,
            });
        }
        Ok(state.last_frame.clone())
    }

    /// Render and run one intent. Sleep intents pause locally.
    pub async fn execute(&self, intent: &Intent) -> ExecutionResult {
        let command = command::render(intent);

        if let Intent::Sleep(seconds) = intent {
            tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
            return ExecutionResult {
                command,
                success: true,
                error: None,
            };
        }

        debug!(%command, "Executing");
        match self.controller.execute(&command).await {
            Ok(response) => match response.failure() {
                Some(err) => {
                    warn!(%command, error = err, "Command error");
                    ExecutionResult {
                        error: Some(err.to_string()),
                        command,
                        success: false,
                    }
                }
                None => ExecutionResult {
                    command,
                    success: true,
                    error: None,
                },
            },
            Err(e) => {
                error!(%command, error = %e, "Failed to execute command");
                ExecutionResult {
                    command,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Wait for the VM to process the last action.
    pub async fn settle(&self) {
        tokio::time::sleep(self.timings.action_settle).await;
    }

    pub async fn start_recording(&self) -> bool {
        match self.controller.start_recording().await {
            Ok(()) => {
                self.state().recording = true;
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to start recording");
                false
            }
        }
    }

    /// Stop the recording if one is running. Returns the written path.
    pub async fn stop_recording(&self, dest: &Path) -> Option<PathBuf> {
        {
            let mut state = self.state();
            if !state.recording {
                return None;
            }
            state.recording = false;
        }
        match self.controller.end_recording(dest).await {
            Ok(()) => Some(dest.to_path_buf()),
            Err(e) => {
                error!(error = %e, "Failed to stop recording");
                None
            }
        }
    }

    /// Score in `[0, 1]`; any failure scores zero.
    pub async fn evaluate(&self) -> f64 {
        match self.controller.evaluate().await {
            Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
            Ok(score) => {
                warn!(score, "Evaluation returned a non-finite score");
                0.0
            }
            Err(e) => {
                error!(error = %e, "Evaluation failed");
                0.0
            }
        }
    }
}
