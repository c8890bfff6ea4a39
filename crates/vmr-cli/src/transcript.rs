// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `vmr transcript`: rebuild the notebook of an existing recording

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::Args;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use vmr_domain_types::{MISSING_INSTRUCTION, TaskSpec};
use vmr_recorder::{OutputLayout, TranscriptContext, load_trajectory, transcript};

#[derive(Args, Clone, Debug)]
#[command(about = "Regenerate the notebook transcript of a saved trajectory")]
pub struct TranscriptArgs {
    /// Path to `trajectory.jsonl`
    pub trajectory: PathBuf,

    /// Task configuration used for the notebook metadata
    #[arg(long)]
    pub task_config: Option<PathBuf>,
}

impl TranscriptArgs {
    pub fn run(self) -> Result<()> {
        let path = self.write()?;
        println!("{}", path.display());
        Ok(())
    }

    /// Write the notebook into the recording's `Colab` directory.
    pub fn write(&self) -> Result<PathBuf> {
        let steps = load_trajectory(&self.trajectory)?;
        let Some(first) = steps.first() else {
            bail!("{} contains no steps", self.trajectory.display());
        };
        let task_dir = task_dir(&self.trajectory)?;
        let started_at = DateTime::from_timestamp_millis((first.timestamp * 1000.0) as i64)
            .map(|t| t.with_timezone(&Local))
            .unwrap_or_else(Local::now);

        let task = match &self.task_config {
            Some(path) => Some(load_task(path, &task_dir)?),
            None => None,
        };
        let fallback_id = file_name(&task_dir);
        let context = TranscriptContext {
            task_id: task
                .as_ref()
                .map(|t| t.id().to_string())
                .unwrap_or(fallback_id),
            domain: task
                .as_ref()
                .and_then(|t| t.primary_app())
                .unwrap_or("unknown")
                .to_string(),
            instruction: task
                .as_ref()
                .map(|t| t.instruction.clone())
                .unwrap_or_else(|| {
                    if first.instruction.is_empty() {
                        MISSING_INSTRUCTION.to_string()
                    } else {
                        first.instruction.clone()
                    }
                }),
            started_at,
            model_pass_rate: BTreeMap::new(),
        };

        let layout = OutputLayout::new(&task_dir);
        std::fs::create_dir_all(layout.colab_dir())
            .with_context(|| format!("Failed to create {}", layout.colab_dir().display()))?;
        let path = layout.transcript_file(started_at.timestamp());
        let json = transcript::render(&context, &steps).context("Failed to serialize transcript")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write transcript {}", path.display()))?;
        info!(path = %path.display(), steps = steps.len(), "Regenerated transcript");
        Ok(path)
    }
}

/// The task directory is two levels above the trajectory file.
fn task_dir(trajectory: &Path) -> Result<PathBuf> {
    match trajectory.parent().and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.to_path_buf()),
        _ => bail!(
            "{} is not inside a recording directory",
            trajectory.display()
        ),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_task(path: &Path, task_dir: &Path) -> Result<TaskSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task config {}", path.display()))?;
    let config: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse task config {}", path.display()))?;
    let domain = task_dir.parent().map(file_name).unwrap_or_default();
    Ok(TaskSpec::from_config(&domain, &file_name(task_dir), config))
}
