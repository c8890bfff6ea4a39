// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! ViewModel Layer - UI State and Input Processing
//!
//! The recorder's view model owns the interaction state machine: which mode
//! the UI is in, what the overlay has selected, and which job the pipeline
//! is running. Input arrives here as key events and already hit-tested
//! mouse actions; rendering lives in [`crate::view`].
//!
//! ## Headless Testing
//!
//! Nothing in this layer touches the terminal. Tests drive it with a
//! scripted VM controller and Tokio's paused clock, so settle and retry
//! delays cost no wall time.
//!
//! ## Architecture Role:
//!
//! 1. **Processes Input** - keys and mouse actions become state transitions
//! 2. **Dispatches Work** - intents go to the single-flight pipeline
//! 3. **Applies Outcomes** - new frames, status text and exit requests
//! 4. **Owns the Viewport** - panning and coordinate mapping

pub mod recorder_model;

pub use recorder_model::{
    PickerKind, RecorderMouseAction, RecorderViewModel, STATUS_ROWS, UiMode,
};
