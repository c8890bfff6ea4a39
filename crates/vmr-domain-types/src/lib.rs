// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Domain types for the VM desktop recorder
//!
//! These are the value types shared by the VM adapter, the trajectory
//! recorder and the terminal UI. They carry no behaviour beyond
//! conversions between each other, so every crate can depend on them
//! without pulling in I/O.

pub mod action;
pub mod geometry;
pub mod task;

pub use action::*;
pub use geometry::*;
pub use task::*;
