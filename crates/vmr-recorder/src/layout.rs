// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! On-disk layout of one recording
//!
//! ```text
//! <result>/<domain>/<task>/
//!   Trajectory and Screenshot/
//!     step_0_before.png ...
//!     trajectory.jsonl
//!     evaluation_score.txt
//!     recording.mp4
//!     manual-YYYYmmdd@HHMMSS.log
//!   Colab/
//!     osw.manual_task.<unix>.ipynb
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const TRAJECTORY_DIR: &str = "Trajectory and Screenshot";
pub const COLAB_DIR: &str = "Colab";
pub const TRAJECTORY_FILE: &str = "trajectory.jsonl";
pub const SCORE_FILE: &str = "evaluation_score.txt";
pub const RECORDING_FILE: &str = "recording.mp4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    task_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(task_dir: impl Into<PathBuf>) -> Self {
        Self {
            task_dir: task_dir.into(),
        }
    }

    pub fn for_task(result_dir: &Path, domain: &str, task: &str) -> Self {
        Self::new(result_dir.join(domain).join(task))
    }

    /// Create both output directories.
    pub fn create(&self) -> Result<()> {
        for dir in [self.trajectory_dir(), self.colab_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn task_dir(&self) -> &Path {
        &self.task_dir
    }

    pub fn trajectory_dir(&self) -> PathBuf {
        self.task_dir.join(TRAJECTORY_DIR)
    }

    pub fn colab_dir(&self) -> PathBuf {
        self.task_dir.join(COLAB_DIR)
    }

    pub fn screenshot_name(index: usize) -> String {
        format!("step_{}_before.png", index)
    }

    pub fn screenshot_file(&self, index: usize) -> PathBuf {
        self.trajectory_dir().join(Self::screenshot_name(index))
    }

    pub fn trajectory_file(&self) -> PathBuf {
        self.trajectory_dir().join(TRAJECTORY_FILE)
    }

    pub fn score_file(&self) -> PathBuf {
        self.trajectory_dir().join(SCORE_FILE)
    }

    pub fn recording_file(&self) -> PathBuf {
        self.trajectory_dir().join(RECORDING_FILE)
    }

    pub fn session_log_file(&self, stamp: &str) -> PathBuf {
        self.trajectory_dir().join(format!("manual-{}.log", stamp))
    }

    pub fn transcript_file(&self, unix_seconds: i64) -> PathBuf {
        self.colab_dir().join(format!("osw.manual_task.{}.ipynb", unix_seconds))
    }
}
