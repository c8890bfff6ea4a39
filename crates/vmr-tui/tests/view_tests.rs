// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use vmr_domain_types::{Size, TaskSpec};
use vmr_recorder::{OutputLayout, TrajectoryRecorder};
use vmr_tui::{
    ActionPipeline, CellGeometry, HitTestRegistry, RecorderMouseAction as A, RecorderSettings,
    RecorderViewModel, Theme, ViewCache, view,
};
use vmr_vm::testing::ScriptedController;
use vmr_vm::{VmInterface, VmTimings};

const COLUMNS: u16 = 128;
const ROWS: u16 = 38;

async fn model(dir: &TempDir, with_frame: bool) -> RecorderViewModel {
    let controller = Arc::new(ScriptedController::with_frame(1920, 1080));
    let vm = Arc::new(VmInterface::new(controller, VmTimings::default()));
    let task = TaskSpec::from_config(
        "os",
        "task-7",
        json!({"id": "task-7", "instruction": "Rename the file"}),
    );
    let recorder =
        TrajectoryRecorder::create(OutputLayout::for_task(dir.path(), "os", "task-7"), &task)
            .unwrap()
            .shared();
    let frame = if with_frame {
        Some(vm.screenshot().await.unwrap())
    } else {
        None
    };
    RecorderViewModel::new(
        ActionPipeline::new(vm, recorder),
        RecorderSettings::default(),
        task.instruction.clone(),
        Size::new(1920, 1080),
        frame,
        CellGeometry::new(10, 20),
        (COLUMNS, ROWS),
    )
}

/// Draw one frame without terminal graphics and return its text.
fn draw(model: &RecorderViewModel, hits: &mut HitTestRegistry<A>) -> String {
    let mut terminal = Terminal::new(TestBackend::new(COLUMNS, ROWS)).unwrap();
    let mut cache = ViewCache::new(None);
    let theme = Theme::default();
    terminal
        .draw(|f| view::render(f, model, &mut cache, hits, &theme))
        .unwrap();
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

fn click(model: &mut RecorderViewModel, hits: &HitTestRegistry<A>, column: u16, row: u16) {
    let action = hits.hit_test(column, row);
    model.handle_mouse_click(action, MouseButton::Left, column, row, KeyModifiers::NONE);
}

#[tokio::test]
async fn plain_mode_shows_status_and_screen_zone() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(&dir, true).await;
    let mut hits = HitTestRegistry::new();

    let text = draw(&model, &mut hits);

    assert!(text.contains("REC"));
    assert!(text.contains("Step 0"));
    assert!(text.contains("Rename the file"));
    assert!(text.contains("Screenshot 1920x1080 (terminal graphics unavailable)"));
    // 1920 px does not fit in 1280, so the minimap is shown
    assert!(text.contains('█'));

    assert_eq!(hits.hit_test(10, 0), None);
    assert_eq!(hits.hit_test(10, 5), Some(A::View));
    assert_eq!(hits.hit_test(127, 37), Some(A::View));
}

#[tokio::test]
async fn placeholder_before_first_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(&dir, false).await;
    let mut hits = HitTestRegistry::new();

    let text = draw(&model, &mut hits);

    assert!(text.contains("Waiting for the first screenshot"));
    assert!(text.contains("Waiting for screenshot"));
}

#[tokio::test]
async fn overlay_controls_sit_above_the_screen() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = model(&dir, true).await;
    let mut hits = HitTestRegistry::new();

    model.handle_key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE));
    let text = draw(&model, &mut hits);

    assert!(text.contains("Controls"));
    assert!(text.contains("click to type"));
    assert!(text.contains("Ctrl+S ▾"));
    assert!(text.contains("enter ▾"));
    assert!(text.contains("0.5s ▾"));

    // panel is 60x10, centered in the 128x36 area below the status bar
    assert_eq!(hits.hit_test(34, 15), Some(A::Panel));
    assert_eq!(hits.hit_test(50, 16), Some(A::TypeField));
    assert_eq!(hits.hit_test(90, 16), Some(A::TypeGo));
    assert_eq!(hits.hit_test(50, 17), Some(A::HotkeyField));
    assert_eq!(hits.hit_test(90, 17), Some(A::HotkeyGo));
    assert_eq!(hits.hit_test(90, 19), Some(A::SleepGo));
    assert_eq!(hits.hit_test(36, 21), Some(A::ScrollUp));
    assert_eq!(hits.hit_test(10, 5), Some(A::View));
}

#[tokio::test]
async fn picker_items_resolve_to_indices() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = model(&dir, true).await;
    let mut hits = HitTestRegistry::new();

    model.handle_key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE));
    draw(&model, &mut hits);
    click(&mut model, &hits, 50, 17);

    let text = draw(&model, &mut hits);
    assert!(text.contains("Hotkey"));
    assert!(text.contains("Ctrl+Alt+T"));

    // three columns of 14 cells starting at column 43, first row at 17
    assert_eq!(hits.hit_test(44, 17), Some(A::PickerItem(0)));
    assert_eq!(hits.hit_test(60, 17), Some(A::PickerItem(1)));
    assert_eq!(hits.hit_test(44, 18), Some(A::PickerItem(3)));
    assert_eq!(hits.hit_test(42, 16), Some(A::PickerPanel));

    click(&mut model, &hits, 60, 17);
    assert_eq!(model.selected_label(vmr_tui::PickerKind::Hotkey), "Ctrl+Shift+S");
    let text = draw(&model, &mut hits);
    assert!(text.contains("Ctrl+Shift+S ▾"));
}

#[tokio::test]
async fn drag_marker_drawn_at_start_point() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = model(&dir, true).await;
    let mut hits = HitTestRegistry::new();

    model.handle_key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE));
    draw(&model, &mut hits);
    click(&mut model, &hits, 68, 21);
    assert_eq!(model.mode(), &vmr_tui::UiMode::DragArmed);

    draw(&model, &mut hits);
    click(&mut model, &hits, 10, 5);

    let mut terminal = Terminal::new(TestBackend::new(COLUMNS, ROWS)).unwrap();
    let mut cache = ViewCache::new(None);
    terminal
        .draw(|f| view::render(f, &model, &mut cache, &mut hits, &Theme::default()))
        .unwrap();
    assert_eq!(terminal.backend().buffer()[(10, 5)].symbol(), "◎");
}
