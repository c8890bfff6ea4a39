// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Trajectory recording for VM demonstrations
//!
//! A [`TrajectoryRecorder`] owns the ordered list of steps for one task and
//! every file derived from it: per-step screenshots, the JSONL trajectory,
//! the score file, the notebook transcript and the session log.

pub mod layout;
pub mod step;
pub mod trajectory;
pub mod transcript;

pub use layout::OutputLayout;
pub use step::{Observation, Step};
pub use trajectory::{
    SessionSummary, SharedRecorder, TrajectoryRecorder, format_score, load_trajectory,
};
pub use transcript::TranscriptContext;
