// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Terminal user interface for recording VM desktop demonstrations
//!
//! The operator sees the VM screenshot through a pannable window, clicks
//! and types to drive the remote desktop, and every successful action is
//! appended to the task trajectory.

pub mod pipeline;
pub mod record_loop;
pub mod settings;
pub mod terminal;
pub mod tui_config;
pub mod view;
pub mod view_model;
pub mod viewport;

pub use pipeline::{ActionOutcome, ActionPipeline, Job};
pub use record_loop::{RecorderDependencies, RecorderExit, run_recorder};
pub use settings::{KeyBinding, RecorderKeymap, RecorderSettings};
pub use terminal::TerminalConfig;
pub use tui_config::{ConfigError, RecorderConfig};
pub use view::{HitTestRegistry, Theme, ViewCache};
pub use view_model::{PickerKind, RecorderMouseAction, RecorderViewModel, UiMode};
pub use viewport::{CellGeometry, PanConfig, Viewport};
