// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Recorder event loop with dependency injection.
//!
//! Input events from a reader thread and a 60 FPS ticker are funnelled
//! through one channel. Input updates the view model, ticks poll the
//! pipeline and drive edge panning, and the screen is redrawn only when
//! something changed.

use crate::pipeline::ActionPipeline;
use crate::settings::RecorderSettings;
use crate::terminal::{self, TerminalConfig};
use crate::view::{self, HitTestRegistry, Theme, ViewCache};
use crate::view_model::{RecorderMouseAction, RecorderViewModel};
use crate::viewport::CellGeometry;
use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info};
use vmr_domain_types::Size;
use vmr_recorder::SharedRecorder;
use vmr_vm::{Frame, VmInterface};

#[derive(Debug)]
enum LoopMsg {
    Input(Event),
    Tick,
}

struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Everything one recording session needs.
pub struct RecorderDependencies {
    pub vm: Arc<VmInterface>,
    pub recorder: SharedRecorder,
    pub settings: RecorderSettings,
    pub instruction: String,
    /// Canvas size used until a screenshot arrives
    pub screen_size: Size,
    pub initial_frame: Option<Frame>,
    pub terminal_config: TerminalConfig,
    pub theme: Theme,
}

/// How a recording session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderExit {
    pub steps: usize,
    /// Set when the task was finished and evaluated
    pub score: Option<f64>,
}

pub async fn run_recorder(deps: RecorderDependencies) -> anyhow::Result<RecorderExit> {
    let running = Arc::new(AtomicBool::new(true));
    terminal::setup_terminal(deps.terminal_config.clone().with_running_flag(running.clone()))
        .context("failed to set up terminal")?;

    let result = drive(deps, running).await;
    terminal::cleanup_terminal();
    result
}

async fn drive(
    deps: RecorderDependencies,
    running: Arc<AtomicBool>,
) -> anyhow::Result<RecorderExit> {
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;

    // must happen before the reader thread starts consuming stdin
    let mut cache = ViewCache::detect();
    let cells = cache
        .font_size()
        .map(|(w, h)| CellGeometry::new(w, h))
        .unwrap_or_default();
    let (columns, rows) = crossterm::terminal::size()?;
    debug!(columns, rows, ?cells, "Terminal geometry");

    let pipeline = ActionPipeline::new(deps.vm, deps.recorder);
    let mut view_model = RecorderViewModel::new(
        pipeline,
        deps.settings,
        deps.instruction,
        deps.screen_size,
        deps.initial_frame,
        cells,
        (columns, rows),
    );
    let theme = deps.theme;
    let mut hits: HitTestRegistry<RecorderMouseAction> = HitTestRegistry::new();

    let (tx, mut rx) = mpsc::unbounded_channel::<LoopMsg>();

    // The reader polls so it can notice shutdown; a blocked read would
    // swallow the first event meant for the next session.
    let stop_reader = StopOnDrop(Arc::new(AtomicBool::new(false)));
    let tx_input = tx.clone();
    let reader_stop = stop_reader.0.clone();
    std::thread::spawn(move || {
        while !reader_stop.load(Ordering::SeqCst) {
            match crossterm::event::poll(Duration::from_millis(50)) {
                Ok(true) => match crossterm::event::read() {
                    Ok(ev) => {
                        if tx_input.send(LoopMsg::Input(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        }
    });

    let tx_tick = tx;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(16));
        loop {
            ticker.tick().await;
            if tx_tick.send(LoopMsg::Tick).is_err() {
                break;
            }
        }
    });

    let mut needs_redraw = true;
    while let Some(msg) = rx.recv().await {
        match msg {
            LoopMsg::Tick => {
                if !running.load(Ordering::SeqCst) {
                    info!("Interrupted, stopping recording");
                    view_model.request_abandon();
                    running.store(true, Ordering::SeqCst);
                }
                needs_redraw |= view_model.tick();
                if view_model.take_exit_request() {
                    break;
                }
            }
            LoopMsg::Input(Event::Key(key)) => {
                if key.kind == KeyEventKind::Press
                    && key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    view_model.request_abandon();
                    needs_redraw = true;
                } else {
                    needs_redraw |= view_model.handle_key(key);
                }
            }
            LoopMsg::Input(Event::Mouse(mouse)) => match mouse.kind {
                MouseEventKind::Down(button) => {
                    let action = hits.hit_test(mouse.column, mouse.row);
                    needs_redraw |= view_model.handle_mouse_click(
                        action,
                        button,
                        mouse.column,
                        mouse.row,
                        mouse.modifiers,
                    );
                }
                MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                    needs_redraw |= view_model.handle_mouse_move(mouse.column, mouse.row);
                }
                _ => {}
            },
            LoopMsg::Input(Event::Resize(columns, rows)) => {
                view_model.resize(columns, rows);
                needs_redraw = true;
            }
            LoopMsg::Input(_) => {}
        }

        if needs_redraw {
            needs_redraw = false;
            terminal.draw(|f| view::render(f, &view_model, &mut cache, &mut hits, &theme))?;
        }
    }

    drop(stop_reader);
    if view_model.is_busy() {
        view_model.await_job().await;
    }

    Ok(RecorderExit {
        steps: view_model.step_count(),
        score: view_model.score(),
    })
}
