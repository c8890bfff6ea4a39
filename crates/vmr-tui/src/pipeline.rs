// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Single-flight execution of remote work
//!
//! At most one job runs at a time. `submit` marks the pipeline busy before
//! returning, the job runs on a spawned task, and its outcome comes back
//! through a oneshot channel that the event loop polls every tick. Worker
//! bodies never fail: every error becomes a status message.

use std::sync::{Arc, MutexGuard};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, error, info, warn};
use vmr_domain_types::Intent;
use vmr_recorder::{SharedRecorder, TrajectoryRecorder, format_score};
use vmr_vm::{Frame, VmInterface};

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Execute an intent and record it on success.
    Action { intent: Intent, from_overlay: bool },
    /// Fetch a fresh screenshot without recording anything.
    Refresh,
    /// Save, evaluate and write every output file, then exit.
    Finish,
    /// Save what was recorded so far without evaluating, then exit.
    Abandon,
}

impl Job {
    fn label(&self) -> &'static str {
        match self {
            Job::Action { .. } => "action",
            Job::Refresh => "refresh",
            Job::Finish => "finish",
            Job::Abandon => "abandon",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    /// Replaces the displayed frame when present.
    pub frame: Option<Frame>,
    pub status: String,
    /// Command text of a recorded step.
    pub last_action: Option<String>,
    pub recorded: bool,
    pub close_overlay: bool,
    pub exit: bool,
    pub score: Option<f64>,
}

impl ActionOutcome {
    fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }
}

pub struct ActionPipeline {
    vm: Arc<VmInterface>,
    recorder: SharedRecorder,
    in_flight: Option<oneshot::Receiver<ActionOutcome>>,
}

impl ActionPipeline {
    pub fn new(vm: Arc<VmInterface>, recorder: SharedRecorder) -> Self {
        Self {
            vm,
            recorder,
            in_flight: None,
        }
    }

    pub fn vm(&self) -> &Arc<VmInterface> {
        &self.vm
    }

    pub fn recorder(&self) -> &SharedRecorder {
        &self.recorder
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of recorded steps.
    pub fn step_count(&self) -> usize {
        lock(&self.recorder).step_count()
    }

    /// Start `job` unless another job is running. `before` is the frame on
    /// screen when the job was requested; actions persist it as their
    /// "before" screenshot.
    pub fn submit(&mut self, job: Job, before: Option<Frame>) -> bool {
        if self.is_busy() {
            debug!(job = job.label(), "Pipeline busy, job rejected");
            return false;
        }

        let (tx, rx) = oneshot::channel();
        self.in_flight = Some(rx);

        let vm = self.vm.clone();
        let recorder = self.recorder.clone();
        debug!(job = job.label(), "Submitting job");
        tokio::spawn(async move {
            let outcome = match job {
                Job::Action {
                    intent,
                    from_overlay,
                } => run_action(&vm, &recorder, intent, before, from_overlay).await,
                Job::Refresh => run_refresh(&vm).await,
                Job::Finish => run_finish(&vm, &recorder).await,
                Job::Abandon => run_abandon(&vm, &recorder).await,
            };
            // The receiver is gone only if the UI already shut down.
            let _ = tx.send(outcome);
        });
        true
    }

    /// Non-blocking check for the outcome of the running job.
    pub fn poll(&mut self) -> Option<ActionOutcome> {
        let rx = self.in_flight.as_mut()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.in_flight = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.in_flight = None;
                error!("Worker stopped without reporting an outcome");
                Some(ActionOutcome::status("Action aborted unexpectedly"))
            }
        }
    }

    /// Wait for the running job, if any.
    pub async fn wait(&mut self) -> Option<ActionOutcome> {
        let rx = self.in_flight.take()?;
        match rx.await {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                error!("Worker stopped without reporting an outcome");
                Some(ActionOutcome::status("Action aborted unexpectedly"))
            }
        }
    }
}

fn lock(recorder: &SharedRecorder) -> MutexGuard<'_, TrajectoryRecorder> {
    recorder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_action(
    vm: &VmInterface,
    recorder: &SharedRecorder,
    intent: Intent,
    before: Option<Frame>,
    from_overlay: bool,
) -> ActionOutcome {
    let mut notes = Vec::new();

    let screenshot = match &before {
        Some(frame) => {
            let saved = lock(recorder).save_before_screenshot(frame);
            match saved {
                Ok(path) => path.to_string_lossy().into_owned(),
                Err(e) => {
                    error!(error = %e, "Failed to persist screenshot");
                    notes.push("screenshot not saved".to_string());
                    String::new()
                }
            }
        }
        None => {
            warn!("No frame to persist before action");
            String::new()
        }
    };

    let result = vm.execute(&intent).await;
    let mut outcome = ActionOutcome {
        close_overlay: from_overlay,
        ..Default::default()
    };

    if !result.success {
        let reason = result.error.unwrap_or_else(|| "unknown error".into());
        outcome.status = format!("Action failed: {}", reason);
        return outcome;
    }

    if !intent.is_local() {
        vm.settle().await;
    }

    let index = lock(recorder)
        .record(
            result.command.clone(),
            screenshot,
            intent.kind(),
            intent.params(),
        )
        .step;
    outcome.recorded = true;
    outcome.last_action = Some(result.command.clone());

    match vm.screenshot_with_retry().await {
        Ok(frame) => outcome.frame = frame,
        Err(e) => notes.push(e.to_string()),
    }

    outcome.status = format!("Step {}: {}", index + 1, result.command);
    if !notes.is_empty() {
        outcome.status = format!("{} ({})", outcome.status, notes.join("; "));
    }
    outcome
}

async fn run_refresh(vm: &VmInterface) -> ActionOutcome {
    match vm.screenshot_with_retry().await {
        Ok(Some(frame)) => ActionOutcome {
            frame: Some(frame),
            status: "Screenshot refreshed".into(),
            ..Default::default()
        },
        Ok(None) => ActionOutcome::status("No screenshot available"),
        Err(e) => ActionOutcome::status(e.to_string()),
    }
}

fn persist_trajectory(recorder: &SharedRecorder, problems: &mut Vec<&'static str>) {
    let saved = lock(recorder).save();
    if let Err(e) = saved {
        error!(error = %format!("{:#}", e), "Failed to save trajectory");
        problems.push("trajectory");
    }
}

async fn run_finish(vm: &VmInterface, recorder: &SharedRecorder) -> ActionOutcome {
    info!("Finishing task");
    let mut problems = Vec::new();

    persist_trajectory(recorder, &mut problems);

    let score = vm.evaluate().await;
    info!(score, "Task evaluated");

    let recording_file = {
        let rec = lock(recorder);
        if let Err(e) = rec.save_score(score) {
            error!(error = %format!("{:#}", e), "Failed to save score");
            problems.push("score");
        }
        if let Err(e) = rec.generate_transcript() {
            error!(error = %format!("{:#}", e), "Failed to generate transcript");
            problems.push("transcript");
        }
        rec.layout().recording_file()
    };

    match vm.stop_recording(&recording_file).await {
        Some(path) => info!(path = %path.display(), "Saved screen recording"),
        None => debug!("No screen recording saved"),
    }

    let logged = lock(recorder).save_session_log(Some(score));
    if let Err(e) = logged {
        error!(error = %format!("{:#}", e), "Failed to write session log");
        problems.push("session log");
    }

    let mut status = format!("Done! Score: {}", format_score(score));
    if !problems.is_empty() {
        status = format!("{} (failed to save: {})", status, problems.join(", "));
    }
    ActionOutcome {
        status,
        exit: true,
        score: Some(score),
        ..Default::default()
    }
}

async fn run_abandon(vm: &VmInterface, recorder: &SharedRecorder) -> ActionOutcome {
    info!("Abandoning task");
    let mut problems = Vec::new();

    persist_trajectory(recorder, &mut problems);

    let recording_file = lock(recorder).layout().recording_file();
    vm.stop_recording(&recording_file).await;

    let logged = lock(recorder).save_session_log(None);
    if let Err(e) = logged {
        error!(error = %format!("{:#}", e), "Failed to write session log");
        problems.push("session log");
    }

    let mut status = "Recording stopped without evaluation".to_string();
    if !problems.is_empty() {
        status = format!("{} (failed to save: {})", status, problems.join(", "));
    }
    ActionOutcome {
        status,
        exit: true,
        ..Default::default()
    }
}
