// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the VM session adapter

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("VM returned an empty screenshot")]
    EmptyScreenshot,

    #[error("No fresh screenshot after {fetches} consecutive attempts")]
    StaleScreenshots { fetches: u32 },

    #[error("No task harness configured for {0}")]
    NoHarness(&'static str),
}
