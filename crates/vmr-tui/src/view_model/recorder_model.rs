// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Interaction state machine for the recorder UI

use crate::pipeline::{ActionOutcome, ActionPipeline, Job};
use crate::settings::{RecorderSettings, SCROLL_CLICKS, format_seconds};
use crate::viewport::{CellGeometry, Viewport};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton};
use tokio::time::Instant;
use tracing::{debug, info};
use vmr_domain_types::{Intent, Point, Size};
use vmr_vm::{Frame, command};

/// Terminal rows reserved for the status bar above the screenshot.
pub const STATUS_ROWS: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Hotkey,
    Key,
    Sleep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMode {
    /// Clicks on the screenshot go straight to the VM.
    Plain,
    /// The control panel is open. Text entry and pickers are sub-states.
    Overlay {
        text_entry: bool,
        picker: Option<PickerKind>,
    },
    /// Waiting for the drag start point.
    DragArmed,
    /// Waiting for the drag end point; carries the VM-space start.
    DragPendingEnd(Point),
}

impl UiMode {
    fn overlay() -> Self {
        UiMode::Overlay {
            text_entry: false,
            picker: None,
        }
    }
}

/// Semantic targets registered by the view during rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderMouseAction {
    /// The screenshot area
    View,
    TypeField,
    TypeGo,
    HotkeyField,
    HotkeyGo,
    KeyField,
    KeyGo,
    SleepField,
    SleepGo,
    ScrollUp,
    ScrollDown,
    Refresh,
    StartDrag,
    Finish,
    /// Overlay background that is not a control
    Panel,
    PickerItem(usize),
    /// Picker background that is not an item
    PickerPanel,
}

pub struct RecorderViewModel {
    pipeline: ActionPipeline,
    settings: RecorderSettings,
    viewport: Viewport,
    cells: CellGeometry,
    terminal_size: (u16, u16),

    mode: UiMode,
    frame: Option<Frame>,
    frame_generation: u64,
    instruction: String,
    status: String,
    last_action: Option<String>,
    /// Last known mouse position in screen pixels.
    cursor: Option<Point>,

    type_text: String,
    selected_hotkey: usize,
    selected_key: usize,
    selected_sleep: usize,

    /// Finish or abandon requested while another job was running.
    pending_exit: Option<Job>,
    exiting: bool,
    exit_at: Option<Instant>,
    exit_requested: bool,
    score: Option<f64>,
}

impl RecorderViewModel {
    /// `canvas` is used until the first frame arrives; after that the frame
    /// size is the canvas.
    pub fn new(
        pipeline: ActionPipeline,
        settings: RecorderSettings,
        instruction: String,
        canvas: Size,
        frame: Option<Frame>,
        cells: CellGeometry,
        terminal_size: (u16, u16),
    ) -> Self {
        let canvas = frame
            .as_ref()
            .map(|f| Size::new(f.width(), f.height()))
            .unwrap_or(canvas);
        let (visible, top_strip) = screen_layout(cells, terminal_size);
        let viewport = Viewport::new(canvas, visible, top_strip, settings.pan);
        let status = if frame.is_some() {
            "Ready".to_string()
        } else {
            "Waiting for screenshot".to_string()
        };

        Self {
            pipeline,
            settings,
            viewport,
            cells,
            terminal_size,
            mode: UiMode::Plain,
            frame,
            frame_generation: 0,
            instruction,
            status,
            last_action: None,
            cursor: None,
            type_text: String::new(),
            selected_hotkey: 0,
            selected_key: 0,
            selected_sleep: 0,
            pending_exit: None,
            exiting: false,
            exit_at: None,
            exit_requested: false,
            score: None,
        }
    }

    pub fn mode(&self) -> &UiMode {
        &self.mode
    }

    pub fn overlay_visible(&self) -> bool {
        matches!(self.mode, UiMode::Overlay { .. })
    }

    pub fn open_picker(&self) -> Option<PickerKind> {
        match self.mode {
            UiMode::Overlay { picker, .. } => picker,
            _ => None,
        }
    }

    pub fn text_entry_active(&self) -> bool {
        matches!(self.mode, UiMode::Overlay { text_entry: true, .. })
    }

    pub fn drag_start(&self) -> Option<Point> {
        match self.mode {
            UiMode::DragPendingEnd(p) => Some(p),
            _ => None,
        }
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Bumped whenever the frame changes, so the view can cache its crop.
    pub fn frame_generation(&self) -> u64 {
        self.frame_generation
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn cells(&self) -> CellGeometry {
        self.cells
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_action(&self) -> Option<&str> {
        self.last_action.as_deref()
    }

    pub fn step_count(&self) -> usize {
        self.pipeline.step_count()
    }

    pub fn is_busy(&self) -> bool {
        self.pipeline.is_busy()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// VM coordinate under the mouse, when it is over the screenshot.
    pub fn cursor_vm(&self) -> Option<Point> {
        self.cursor
            .filter(|p| self.viewport.is_on_canvas(*p))
            .map(|p| self.viewport.screen_to_vm(p))
    }

    pub fn type_text(&self) -> &str {
        &self.type_text
    }

    pub fn selected(&self, kind: PickerKind) -> usize {
        match kind {
            PickerKind::Hotkey => self.selected_hotkey,
            PickerKind::Key => self.selected_key,
            PickerKind::Sleep => self.selected_sleep,
        }
    }

    /// Display labels for a picker's items.
    pub fn picker_items(&self, kind: PickerKind) -> Vec<String> {
        match kind {
            PickerKind::Hotkey => self.settings.hotkeys.iter().map(|h| h.label.clone()).collect(),
            PickerKind::Key => self.settings.special_keys.clone(),
            PickerKind::Sleep => self
                .settings
                .sleep_seconds
                .iter()
                .map(|s| format_seconds(*s))
                .collect(),
        }
    }

    pub fn selected_label(&self, kind: PickerKind) -> String {
        self.picker_items(kind)
            .into_iter()
            .nth(self.selected(kind))
            .unwrap_or_default()
    }

    /// Returns true once the UI should close.
    pub fn take_exit_request(&mut self) -> bool {
        std::mem::take(&mut self.exit_requested)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// The terminal changed size.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.terminal_size = (columns, rows);
        let (visible, top_strip) = screen_layout(self.cells, self.terminal_size);
        self.viewport.resize(visible, top_strip);
    }

    /// Cell pixel size became known from the graphics protocol.
    pub fn set_cell_geometry(&mut self, cells: CellGeometry) {
        self.cells = cells;
        let (columns, rows) = self.terminal_size;
        self.resize(columns, rows);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        let keymap = &self.settings.keymap;

        if keymap.finish.matches(&key) {
            self.request_finish();
            return true;
        }
        if keymap.cancel.matches(&key) {
            self.cancel();
            return true;
        }

        if self.text_entry_active() {
            if keymap.confirm.matches(&key) {
                self.submit_text();
                return true;
            }
            return match key.code {
                KeyCode::Backspace => {
                    self.type_text.pop();
                    true
                }
                KeyCode::Char(c)
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                {
                    self.type_text.push(c);
                    true
                }
                _ => false,
            };
        }

        if keymap.toggle_overlay.matches(&key) {
            self.toggle_overlay();
            return true;
        }
        false
    }

    fn toggle_overlay(&mut self) {
        match self.mode {
            UiMode::Plain => self.mode = UiMode::overlay(),
            UiMode::Overlay { picker: None, .. } => self.mode = UiMode::Plain,
            // a picker is open, or a drag is in progress
            _ => {}
        }
    }

    /// Esc: close the innermost thing that is open, or end the session.
    fn cancel(&mut self) {
        match self.mode {
            UiMode::Overlay {
                text_entry,
                picker: Some(_),
            } => {
                self.mode = UiMode::Overlay {
                    text_entry,
                    picker: None,
                }
            }
            UiMode::Overlay {
                text_entry: true,
                picker: None,
            } => self.mode = UiMode::overlay(),
            UiMode::Overlay { .. } => self.mode = UiMode::Plain,
            UiMode::DragArmed | UiMode::DragPendingEnd(_) => {
                self.mode = UiMode::Plain;
                self.status = "Drag cancelled".into();
            }
            UiMode::Plain => self.request_exit(Job::Abandon),
        }
    }

    pub fn request_finish(&mut self) {
        self.request_exit(Job::Finish);
    }

    /// Stop without evaluating, keeping what was recorded.
    pub fn request_abandon(&mut self) {
        self.request_exit(Job::Abandon);
    }

    fn request_exit(&mut self, job: Job) {
        if self.exiting || self.pending_exit.is_some() {
            return;
        }
        self.mode = UiMode::Plain;
        let label = if job == Job::Finish {
            "Finishing"
        } else {
            "Stopping"
        };
        if self.pipeline.is_busy() {
            info!(?job, "Exit deferred until the running action completes");
            self.status = format!("{} after the current action...", label);
            self.pending_exit = Some(job);
        } else {
            self.start_exit(job);
        }
    }

    fn start_exit(&mut self, job: Job) {
        self.status = if job == Job::Finish {
            "Saving and evaluating...".into()
        } else {
            "Saving trajectory...".into()
        };
        self.exiting = self.pipeline.submit(job, None);
    }

    /// Hand an intent to the pipeline. Ignored while another job runs.
    fn dispatch(&mut self, intent: Intent, from_overlay: bool) -> bool {
        if self.exiting || self.pending_exit.is_some() {
            return false;
        }
        let rendered = command::render(&intent);
        if !self.pipeline.submit(
            Job::Action {
                intent,
                from_overlay,
            },
            self.frame.clone(),
        ) {
            debug!(command = %rendered, "Busy, intent ignored");
            return false;
        }
        self.status = format!("Executing: {}", rendered);
        true
    }

    fn submit_text(&mut self) {
        if self.type_text.is_empty() {
            self.mode = UiMode::overlay();
            return;
        }
        if self.dispatch(Intent::Type(self.type_text.clone()), true) {
            self.type_text.clear();
            self.mode = UiMode::overlay();
        }
    }

    fn refresh(&mut self) {
        if self.exiting || self.pending_exit.is_some() {
            return;
        }
        if self.pipeline.submit(Job::Refresh, None) {
            self.status = "Refreshing screenshot...".into();
        }
    }

    pub fn handle_mouse_move(&mut self, column: u16, row: u16) -> bool {
        let p = self.cells.cell_center(column, row);
        let changed = self.cursor != Some(p);
        self.cursor = Some(p);
        changed
    }

    /// A mouse press at a terminal cell. `action` is the hit-tested zone
    /// under it, `None` when nothing was registered there.
    pub fn handle_mouse_click(
        &mut self,
        action: Option<RecorderMouseAction>,
        button: MouseButton,
        column: u16,
        row: u16,
        modifiers: KeyModifiers,
    ) -> bool {
        let p = self.cells.cell_center(column, row);
        self.cursor = Some(p);
        if self.exiting {
            return false;
        }

        match self.mode.clone() {
            UiMode::Overlay {
                text_entry,
                picker: Some(kind),
            } => {
                if button != MouseButton::Left {
                    return false;
                }
                match action {
                    Some(RecorderMouseAction::PickerItem(index)) => {
                        self.select(kind, index);
                        self.mode = UiMode::Overlay {
                            text_entry,
                            picker: None,
                        };
                    }
                    Some(RecorderMouseAction::PickerPanel) => return false,
                    _ => {
                        self.mode = UiMode::Overlay {
                            text_entry,
                            picker: None,
                        };
                    }
                }
                true
            }
            UiMode::Overlay { .. } => {
                if button != MouseButton::Left {
                    return false;
                }
                self.handle_overlay_click(action);
                true
            }
            UiMode::DragArmed => {
                if button == MouseButton::Right {
                    self.mode = UiMode::Plain;
                    self.status = "Drag cancelled".into();
                    return true;
                }
                if button == MouseButton::Left && self.on_view(action, p) {
                    let start = self.viewport.screen_to_vm(p);
                    self.mode = UiMode::DragPendingEnd(start);
                    self.status = format!("Drag from {}: click the end point", start);
                    return true;
                }
                false
            }
            UiMode::DragPendingEnd(start) => {
                if button == MouseButton::Right {
                    self.mode = UiMode::Plain;
                    self.status = "Drag cancelled".into();
                    return true;
                }
                if button == MouseButton::Left && self.on_view(action, p) {
                    let end = self.viewport.screen_to_vm(p);
                    let intent = Intent::Drag {
                        start,
                        end,
                        duration: self.settings.drag_seconds,
                    };
                    if self.dispatch(intent, false) {
                        self.mode = UiMode::Plain;
                    }
                    return true;
                }
                false
            }
            UiMode::Plain => {
                if !self.on_view(action, p) {
                    return false;
                }
                let vm = self.viewport.screen_to_vm(p);
                let intent = match button {
                    MouseButton::Left if modifiers.contains(KeyModifiers::SHIFT) => {
                        Intent::DoubleClick(vm)
                    }
                    MouseButton::Left => Intent::Click(vm),
                    MouseButton::Right => Intent::RightClick(vm),
                    MouseButton::Middle => return false,
                };
                self.dispatch(intent, false)
            }
        }
    }

    fn on_view(&self, action: Option<RecorderMouseAction>, p: Point) -> bool {
        action == Some(RecorderMouseAction::View) && self.viewport.is_on_canvas(p)
    }

    fn select(&mut self, kind: PickerKind, index: usize) {
        let len = self.picker_items(kind).len();
        if index >= len {
            return;
        }
        match kind {
            PickerKind::Hotkey => self.selected_hotkey = index,
            PickerKind::Key => self.selected_key = index,
            PickerKind::Sleep => self.selected_sleep = index,
        }
    }

    fn open(&mut self, kind: PickerKind) {
        self.mode = UiMode::Overlay {
            text_entry: false,
            picker: Some(kind),
        };
    }

    fn handle_overlay_click(&mut self, action: Option<RecorderMouseAction>) {
        use RecorderMouseAction as A;

        let Some(action) = action else {
            self.mode = UiMode::Plain;
            return;
        };
        match action {
            A::View => self.mode = UiMode::Plain,
            A::Panel | A::PickerPanel | A::PickerItem(_) => self.mode = UiMode::overlay(),
            A::TypeField => {
                self.mode = UiMode::Overlay {
                    text_entry: true,
                    picker: None,
                }
            }
            A::TypeGo => self.submit_text(),
            A::HotkeyField => self.open(PickerKind::Hotkey),
            A::KeyField => self.open(PickerKind::Key),
            A::SleepField => self.open(PickerKind::Sleep),
            A::HotkeyGo => {
                if let Some(preset) = self.settings.hotkeys.get(self.selected_hotkey) {
                    self.dispatch(Intent::Hotkey(preset.keys.clone()), true);
                }
            }
            A::KeyGo => {
                if let Some(key) = self.settings.special_keys.get(self.selected_key) {
                    self.dispatch(Intent::Press(key.clone()), true);
                }
            }
            A::SleepGo => {
                if let Some(seconds) = self.settings.sleep_seconds.get(self.selected_sleep) {
                    self.dispatch(Intent::Sleep(*seconds), true);
                }
            }
            A::ScrollUp => {
                self.dispatch(Intent::Scroll(SCROLL_CLICKS), true);
            }
            A::ScrollDown => {
                self.dispatch(Intent::Scroll(-SCROLL_CLICKS), true);
            }
            A::Refresh => self.refresh(),
            A::StartDrag => {
                self.mode = UiMode::DragArmed;
                self.status = "Drag: click the start point".into();
            }
            A::Finish => self.request_finish(),
        }
    }

    /// Per-frame housekeeping. Returns true when something visible changed.
    pub fn tick(&mut self) -> bool {
        let mut dirty = false;

        if let Some(outcome) = self.pipeline.poll() {
            self.apply_outcome(outcome);
            dirty = true;
        }

        if !self.pipeline.is_busy() {
            if let Some(job) = self.pending_exit.take() {
                self.start_exit(job);
                dirty = true;
            }
        }

        if let Some(at) = self.exit_at {
            if Instant::now() >= at {
                self.exit_at = None;
                self.exit_requested = true;
            }
        }

        if !self.overlay_visible() && !self.exiting {
            if let Some(cursor) = self.cursor {
                dirty |= self.viewport.pan_towards(cursor);
            }
        }

        dirty
    }

    /// Wait for the running job and apply its outcome.
    pub async fn await_job(&mut self) -> bool {
        match self.pipeline.wait().await {
            Some(outcome) => {
                self.apply_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn apply_outcome(&mut self, outcome: ActionOutcome) {
        if let Some(frame) = outcome.frame {
            let size = Size::new(frame.width(), frame.height());
            if size != self.viewport.canvas() {
                info!(%size, "Canvas size changed");
                let offset = self.viewport.offset();
                self.viewport = Viewport::new(
                    size,
                    self.viewport.visible(),
                    self.viewport.top_strip(),
                    self.settings.pan,
                );
                self.viewport.set_offset(offset);
            }
            self.frame = Some(frame);
            self.frame_generation += 1;
        }

        self.status = outcome.status;
        if let Some(action) = outcome.last_action {
            self.last_action = Some(action);
        }
        if outcome.close_overlay && self.overlay_visible() {
            self.mode = UiMode::Plain;
        }
        if outcome.score.is_some() {
            self.score = outcome.score;
        }
        if outcome.exit {
            self.exit_at = Some(Instant::now() + self.settings.finish_linger);
        }
    }
}

/// Visible pixel size and status strip height for a terminal size.
fn screen_layout(cells: CellGeometry, (columns, rows): (u16, u16)) -> (Size, i32) {
    let visible = cells.cells_to_pixels(columns, rows.saturating_sub(STATUS_ROWS));
    let top_strip = STATUS_ROWS as i32 * cells.cell_height as i32;
    (visible, top_strip)
}
