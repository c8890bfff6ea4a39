// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Terminal setup and restoration for the recorder UI
//!
//! The recorder needs raw mode, the alternate screen and mouse capture with
//! motion reporting. Everything enabled here is tracked in atomics so that
//! [`cleanup_terminal`] can run from the Ctrl-C handler, the panic hook or
//! normal shutdown, and only undoes what was actually done, once.

use anyhow::{Context, Result};
use crossterm::{
    ExecutableCommand,
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{
    io, panic,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

static CLEANUP_DONE: AtomicBool = AtomicBool::new(false);
static RAW_MODE_ENABLED: AtomicBool = AtomicBool::new(false);
static ALTERNATE_SCREEN_ACTIVE: AtomicBool = AtomicBool::new(false);
static KB_FLAGS_PUSHED: AtomicBool = AtomicBool::new(false);
static MOUSE_CAPTURE_ENABLED: AtomicBool = AtomicBool::new(false);
static HANDLERS_INSTALLED: AtomicBool = AtomicBool::new(false);
/// Flag of the UI session currently on screen, cleared on Ctrl-C.
static RUNNING_FLAG: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// Ask for unambiguous Esc and press/release reporting when supported
    pub keyboard_enhancement: bool,
    pub mouse_capture: bool,
    pub install_signal_handlers: bool,
    /// Cleared by the Ctrl-C handler
    pub running_flag: Option<Arc<AtomicBool>>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            keyboard_enhancement: true,
            mouse_capture: true,
            install_signal_handlers: true,
            running_flag: None,
        }
    }
}

impl TerminalConfig {
    pub fn with_running_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.running_flag = Some(flag);
        self
    }
}

pub fn setup_terminal(config: TerminalConfig) -> Result<()> {
    let mut stdout = io::stdout();
    CLEANUP_DONE.store(false, Ordering::SeqCst);

    crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    RAW_MODE_ENABLED.store(true, Ordering::SeqCst);

    stdout
        .execute(EnterAlternateScreen)
        .context("Failed to enter alternate screen")?;
    ALTERNATE_SCREEN_ACTIVE.store(true, Ordering::SeqCst);

    if config.keyboard_enhancement
        && crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false)
    {
        stdout.execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))?;
        KB_FLAGS_PUSHED.store(true, Ordering::SeqCst);
    }

    if config.mouse_capture {
        // reports button presses and motion
        stdout.execute(EnableMouseCapture)?;
        MOUSE_CAPTURE_ENABLED.store(true, Ordering::SeqCst);
    }

    *RUNNING_FLAG.lock().unwrap_or_else(|p| p.into_inner()) = config.running_flag.clone();

    // ctrlc allows a single handler per process; tasks run one after another
    if config.install_signal_handlers && !HANDLERS_INSTALLED.swap(true, Ordering::SeqCst) {
        ctrlc::set_handler(|| {
            cleanup_terminal();
            if let Some(flag) = RUNNING_FLAG.lock().unwrap_or_else(|p| p.into_inner()).as_ref() {
                flag.store(false, Ordering::SeqCst);
            }
        })
        .context("Failed to install Ctrl-C handler")?;

        let default_panic = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            cleanup_terminal();
            default_panic(panic_info);
        }));
    }

    Ok(())
}

/// Restore the terminal. Safe to call more than once.
pub fn cleanup_terminal() {
    if CLEANUP_DONE.swap(true, Ordering::SeqCst) {
        return;
    }
    let mut stdout = io::stdout();

    // keyboard flags must be popped while still on the alternate screen
    if KB_FLAGS_PUSHED.swap(false, Ordering::SeqCst) {
        let _ = stdout.execute(PopKeyboardEnhancementFlags);
    }
    if MOUSE_CAPTURE_ENABLED.swap(false, Ordering::SeqCst) {
        let _ = stdout.execute(DisableMouseCapture);
    }
    if RAW_MODE_ENABLED.swap(false, Ordering::SeqCst) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
    if ALTERNATE_SCREEN_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}
