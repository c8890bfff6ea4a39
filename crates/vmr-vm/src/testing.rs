// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Scripted in-memory controller for tests

use crate::controller::{CommandResponse, VmController};
use crate::error::{Result, VmError};
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use vmr_domain_types::TaskSpec;

/// Encodes a solid-colour PNG.
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

fn scripted_error(message: &str) -> VmError {
    VmError::Server {
        status: 500,
        body: message.to_string(),
    }
}

#[derive(Default)]
struct Script {
    frame: Option<Vec<u8>>,
    screenshot_failures: VecDeque<()>,
    command_replies: VecDeque<std::result::Result<CommandResponse, String>>,
    commands: Vec<String>,
    screenshots_served: usize,
    score: Option<f64>,
    reset_error: Option<String>,
    resets: Vec<String>,
    recording_dests: Vec<PathBuf>,
}

/// A controller whose replies are queued up front. Anything not scripted
/// succeeds: commands return success, screenshots return the current frame.
#[derive(Default)]
pub struct ScriptedController {
    script: Mutex<Script>,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a solid frame of the given size.
    pub fn with_frame(width: u32, height: u32) -> Self {
        let controller = Self::new();
        controller.set_frame(png_bytes(width, height, [40, 90, 160, 255]));
        controller
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn set_frame(&self, bytes: Vec<u8>) {
        self.script().frame = Some(bytes);
    }

    pub fn clear_frame(&self) {
        self.script().frame = None;
    }

    /// The next `count` screenshot fetches fail.
    pub fn fail_screenshots(&self, count: usize) {
        let mut script = self.script();
        for _ in 0..count {
            script.screenshot_failures.push_back(());
        }
    }

    /// The next command gets an error reply from the server.
    pub fn reject_next_command(&self, error: &str) {
        self.script()
            .command_replies
            .push_back(Ok(CommandResponse::failed(error)));
    }

    /// The next command fails at the transport level.
    pub fn drop_next_command(&self, error: &str) {
        self.script().command_replies.push_back(Err(error.to_string()));
    }

    pub fn set_score(&self, score: f64) {
        self.script().score = Some(score);
    }

    pub fn fail_reset(&self, error: &str) {
        self.script().reset_error = Some(error.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.script().commands.clone()
    }

    pub fn screenshots_served(&self) -> usize {
        self.script().screenshots_served
    }

    pub fn resets(&self) -> Vec<String> {
        self.script().resets.clone()
    }

    pub fn recording_dests(&self) -> Vec<PathBuf> {
        self.script().recording_dests.clone()
    }
}

#[async_trait]
impl VmController for ScriptedController {
    async fn reset(&self, task: &TaskSpec) -> Result<()> {
        let mut script = self.script();
        script.resets.push(task.name.clone());
        match &script.reset_error {
            Some(e) => Err(scripted_error(e)),
            None => Ok(()),
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let mut script = self.script();
        if script.screenshot_failures.pop_front().is_some() {
            return Err(scripted_error("screenshot unavailable"));
        }
        match script.frame.clone() {
            Some(frame) => {
                script.screenshots_served += 1;
                Ok(frame)
            }
            None => Err(VmError::EmptyScreenshot),
        }
    }

    async fn execute(&self, command: &str) -> Result<CommandResponse> {
        let mut script = self.script();
        script.commands.push(command.to_string());
        match script.command_replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(scripted_error(&e)),
            None => Ok(CommandResponse::ok()),
        }
    }

    async fn start_recording(&self) -> Result<()> {
        Ok(())
    }

    async fn end_recording(&self, dest: &Path) -> Result<()> {
        self.script().recording_dests.push(dest.to_path_buf());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"video")?;
        Ok(())
    }

    async fn evaluate(&self) -> Result<f64> {
        self.script()
            .score
            .ok_or_else(|| scripted_error("no evaluator"))
    }
}
