// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Append-only trajectory of recorded steps and the files derived from it

use crate::layout::OutputLayout;
use crate::step::{Observation, Step};
use crate::transcript::{self, TranscriptContext};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use vmr_domain_types::{ActionKind, ActionParams, TaskSpec};

/// Shared handle used by the action workers.
pub type SharedRecorder = Arc<Mutex<TrajectoryRecorder>>;

/// Statistics reported when a recording ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total_steps: usize,
    pub duration_seconds: f64,
    pub task_dir: PathBuf,
    pub trajectory_file: PathBuf,
}

pub struct TrajectoryRecorder {
    layout: OutputLayout,
    task_id: String,
    domain: String,
    instruction: String,
    steps: Vec<Step>,
    started_at: DateTime<Local>,
    model_pass_rate: BTreeMap<String, f64>,
}

impl TrajectoryRecorder {
    /// Start a new recording for `task`, creating the output directories.
    pub fn create(layout: OutputLayout, task: &TaskSpec) -> Result<Self> {
        Self::create_at(layout, task, Local::now())
    }

    pub fn create_at(
        layout: OutputLayout,
        task: &TaskSpec,
        started_at: DateTime<Local>,
    ) -> Result<Self> {
        layout.create()?;
        debug!(dir = %layout.task_dir().display(), "Created trajectory recorder");
        Ok(Self {
            layout,
            task_id: task.id().to_string(),
            domain: task.primary_app().unwrap_or("unknown").to_string(),
            instruction: task.instruction.clone(),
            steps: Vec::new(),
            started_at,
            model_pass_rate: BTreeMap::new(),
        })
    }

    pub fn shared(self) -> SharedRecorder {
        Arc::new(Mutex::new(self))
    }

    /// Pass rates copied into the transcript metadata.
    pub fn set_model_pass_rate(&mut self, rates: BTreeMap<String, f64>) {
        self.model_pass_rate = rates;
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Write the "before" screenshot for the step about to be recorded.
    pub fn save_before_screenshot(&self, image: &DynamicImage) -> Result<PathBuf> {
        let path = self.layout.screenshot_file(self.step_count());
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to save screenshot {}", path.display()))?;
        debug!(path = %path.display(), "Saved screenshot");
        Ok(path)
    }

    /// Append a step. This is the only way the step index advances.
    pub fn record(
        &mut self,
        command: String,
        screenshot: String,
        kind: ActionKind,
        params: ActionParams,
    ) -> &Step {
        let index = self.steps.len();
        let now = Utc::now();
        let timestamp = now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1e6;
        self.steps.push(Step {
            step: index,
            observation: Observation { screenshot },
            instruction: self.instruction.clone(),
            action: command,
            action_type: kind,
            timestamp,
            action_details: Some(params),
        });
        let step = &self.steps[index];
        info!(step = index + 1, action = %step.action, "Recorded step");
        step
    }

    /// Write `trajectory.jsonl`, replacing any previous contents.
    pub fn save(&self) -> Result<PathBuf> {
        let path = self.layout.trajectory_file();
        write_trajectory(&path, &self.steps)?;
        info!(path = %path.display(), steps = self.steps.len(), "Saved trajectory");
        Ok(path)
    }

    /// Write `evaluation_score.txt`.
    pub fn save_score(&self, score: f64) -> Result<PathBuf> {
        let path = self.layout.score_file();
        std::fs::write(&path, format_score(score))
            .with_context(|| format!("Failed to write score to {}", path.display()))?;
        info!(score, "Saved evaluation score");
        Ok(path)
    }

    pub fn transcript_context(&self) -> TranscriptContext {
        TranscriptContext {
            task_id: self.task_id.clone(),
            domain: self.domain.clone(),
            instruction: self.instruction.clone(),
            started_at: self.started_at,
            model_pass_rate: self.model_pass_rate.clone(),
        }
    }

    /// Write the notebook transcript. Named after the recording start, so
    /// calling this again overwrites the same file with the same content.
    pub fn generate_transcript(&self) -> Result<PathBuf> {
        let path = self.layout.transcript_file(self.started_at.timestamp());
        let json = transcript::render(&self.transcript_context(), &self.steps)
            .context("Failed to serialize transcript")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write transcript {}", path.display()))?;
        info!(path = %path.display(), "Saved transcript");
        Ok(path)
    }

    pub fn summary(&self) -> SessionSummary {
        let elapsed = Local::now().signed_duration_since(self.started_at);
        let duration_seconds = (elapsed.num_milliseconds().max(0) as f64 / 10.0).round() / 100.0;
        SessionSummary {
            total_steps: self.steps.len(),
            duration_seconds,
            task_dir: self.layout.task_dir().to_path_buf(),
            trajectory_file: self.layout.trajectory_file(),
        }
    }

    /// Write a short human-readable session log next to the trajectory.
    pub fn save_session_log(&self, score: Option<f64>) -> Result<PathBuf> {
        let summary = self.summary();
        let stamp = Local::now().format("%Y%m%d@%H%M%S").to_string();
        let path = self.layout.session_log_file(&stamp);
        let score = score.map(format_score).unwrap_or_else(|| "not evaluated".into());
        let content = format!(
            "VM Recorder Session Log\n\
             =======================\n\
             Task: {}\n\
             Total Steps: {}\n\
             Duration: {}s\n\
             Evaluation Score: {}\n\
             Result Directory: {}\n\
             =======================\n",
            self.instruction,
            summary.total_steps,
            summary.duration_seconds,
            score,
            summary.task_dir.display(),
        );
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write session log {}", path.display()))?;
        Ok(path)
    }
}

/// Scores always carry a fractional part, e.g. `1.0`.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.is_finite() {
        format!("{:.1}", score)
    } else {
        score.to_string()
    }
}

fn write_trajectory(path: &Path, steps: &[Step]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create trajectory file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for step in steps {
        let json = serde_json::to_string(step).context("Failed to serialize step")?;
        writeln!(writer, "{}", json).context("Failed to write step")?;
    }
    writer.flush().context("Failed to flush trajectory file")?;
    Ok(())
}

/// Read a saved trajectory back.
pub fn load_trajectory(path: &Path) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trajectory {}", path.display()))?;

    let mut steps = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let step: Step = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse step at line {}", line_num + 1))?;
        steps.push(step);
    }

    debug!(count = steps.len(), "Loaded trajectory");
    Ok(steps)
}
