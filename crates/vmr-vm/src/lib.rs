// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! VM session adapter
//!
//! Everything the recorder needs from a remote desktop goes through this
//! crate: rendering intents into command text, dispatching them, fetching
//! screenshots, screen recording and task evaluation.

pub mod command;
pub mod controller;
pub mod error;
pub mod http;
pub mod interface;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use controller::{CommandResponse, VmController};
pub use error::{Result, VmError};
pub use http::HttpController;
pub use interface::{ExecutionResult, Frame, VmInterface, VmTimings};
