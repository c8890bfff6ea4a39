// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vmr_domain_types::{Point, Size, TaskSpec};
use vmr_recorder::{OutputLayout, SharedRecorder, TrajectoryRecorder, load_trajectory};
use vmr_tui::{
    ActionPipeline, CellGeometry, PickerKind, RecorderMouseAction as A, RecorderSettings,
    RecorderViewModel, UiMode,
};
use vmr_vm::testing::ScriptedController;
use vmr_vm::{VmInterface, VmTimings};

struct Harness {
    controller: Arc<ScriptedController>,
    model: RecorderViewModel,
    recorder: SharedRecorder,
    dir: TempDir,
}

/// 1920x1080 desktop seen through a 128x38 terminal of 10x20 px cells:
/// a 1280x720 window below a 40 px status strip.
async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(ScriptedController::with_frame(1920, 1080));
    let vm = Arc::new(VmInterface::new(controller.clone(), VmTimings::default()));
    let task = TaskSpec::from_config(
        "chrome",
        "task-1",
        json!({"id": "task-1", "instruction": "Open the settings page"}),
    );
    let recorder = TrajectoryRecorder::create(
        OutputLayout::for_task(dir.path(), "chrome", "task-1"),
        &task,
    )
    .unwrap()
    .shared();
    assert!(vm.start_recording().await);
    let frame = vm.screenshot().await.unwrap();
    let model = RecorderViewModel::new(
        ActionPipeline::new(vm, recorder.clone()),
        RecorderSettings::default(),
        task.instruction.clone(),
        Size::new(1920, 1080),
        Some(frame),
        CellGeometry::new(10, 20),
        (128, 38),
    );
    Harness {
        controller,
        model,
        recorder,
        dir,
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn press(h: &mut Harness, action: Option<A>, column: u16, row: u16) -> bool {
    h.model
        .handle_mouse_click(action, MouseButton::Left, column, row, KeyModifiers::NONE)
}

fn press_control(h: &mut Harness, action: A) -> bool {
    press(h, Some(action), 60, 18)
}

fn step_commands(h: &Harness) -> Vec<String> {
    h.recorder
        .lock()
        .unwrap()
        .steps()
        .iter()
        .map(|s| s.action.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn click_maps_cell_to_vm_pixel_and_records_one_step() {
    let mut h = harness().await;

    // cell (10, 5) has its centre at (105, 110), 70 px below the strip
    assert!(press(&mut h, Some(A::View), 10, 5));
    assert!(h.model.is_busy());
    assert!(h.model.await_job().await);

    assert_eq!(h.controller.commands(), vec!["click(105, 70)"]);
    assert_eq!(h.model.step_count(), 1);
    assert_eq!(h.model.status(), "Step 1: click(105, 70)");
    assert_eq!(h.model.last_action(), Some("click(105, 70)"));
    assert_eq!(h.model.frame_generation(), 1);

    let steps = h.recorder.lock().unwrap().steps().to_vec();
    assert!(steps[0].observation.screenshot.ends_with("step_0_before.png"));
    assert!(
        h.dir
            .path()
            .join("chrome/task-1/Trajectory and Screenshot/step_0_before.png")
            .exists()
    );
}

#[tokio::test(start_paused = true)]
async fn second_intent_is_ignored_while_busy() {
    let mut h = harness().await;

    assert!(press(&mut h, Some(A::View), 10, 5));
    assert!(!press(&mut h, Some(A::View), 20, 5));
    h.model.await_job().await;

    assert_eq!(h.controller.commands().len(), 1);
    assert_eq!(h.model.step_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn step_count_equals_successful_executions() {
    let mut h = harness().await;

    h.controller.reject_next_command("element not found");
    press(&mut h, Some(A::View), 10, 5);
    h.model.await_job().await;
    assert_eq!(h.model.step_count(), 0);
    assert_eq!(h.model.status(), "Action failed: element not found");

    h.controller.drop_next_command("connection reset");
    press(&mut h, Some(A::View), 10, 5);
    h.model.await_job().await;
    assert_eq!(h.model.step_count(), 0);

    press(&mut h, Some(A::View), 10, 5);
    h.model.await_job().await;
    press(&mut h, Some(A::View), 11, 5);
    h.model.await_job().await;

    assert_eq!(h.controller.commands().len(), 4);
    assert_eq!(h.model.step_count(), 2);
    let indices: Vec<usize> = h
        .recorder
        .lock()
        .unwrap()
        .steps()
        .iter()
        .map(|s| s.step)
        .collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn right_and_shift_clicks() {
    let mut h = harness().await;

    h.model.handle_mouse_click(
        Some(A::View),
        MouseButton::Right,
        10,
        5,
        KeyModifiers::NONE,
    );
    h.model.await_job().await;
    h.model.handle_mouse_click(
        Some(A::View),
        MouseButton::Left,
        10,
        5,
        KeyModifiers::SHIFT,
    );
    h.model.await_job().await;

    assert_eq!(
        step_commands(&h),
        vec!["rightClick(105, 70)", "doubleClick(105, 70)"]
    );
}

#[tokio::test(start_paused = true)]
async fn clicks_on_the_status_strip_are_ignored() {
    let mut h = harness().await;

    assert!(!press(&mut h, None, 10, 0));
    // row 1 is still inside the 40 px strip even if a zone claims it
    assert!(!press(&mut h, Some(A::View), 10, 1));
    assert!(!h.model.is_busy());
    assert!(h.controller.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn drag_takes_two_clicks_and_renders_relative_motion() {
    let mut h = harness().await;

    h.model.handle_key(key(KeyCode::Char(' ')));
    assert!(h.model.overlay_visible());
    press_control(&mut h, A::StartDrag);
    assert_eq!(h.model.mode(), &UiMode::DragArmed);

    press(&mut h, Some(A::View), 10, 5);
    assert_eq!(h.model.mode(), &UiMode::DragPendingEnd(Point::new(105, 70)));
    assert!(!h.model.is_busy());

    // (305, 30): 200 right, 40 up
    press(&mut h, Some(A::View), 30, 3);
    assert_eq!(h.model.mode(), &UiMode::Plain);
    h.model.await_job().await;

    assert_eq!(
        h.controller.commands(),
        vec!["moveTo(105, 70); drag(200, -40, duration=0.5)"]
    );
    assert_eq!(h.model.step_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn right_click_cancels_drag() {
    let mut h = harness().await;

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::StartDrag);
    press(&mut h, Some(A::View), 10, 5);
    h.model
        .handle_mouse_click(Some(A::View), MouseButton::Right, 30, 3, KeyModifiers::NONE);

    assert_eq!(h.model.mode(), &UiMode::Plain);
    assert!(!h.model.is_busy());
    assert!(h.controller.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_closes_innermost_state_first() {
    let mut h = harness().await;
    let esc = key(KeyCode::Esc);

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::TypeField);
    assert!(h.model.text_entry_active());
    h.model.handle_key(esc);
    assert_eq!(
        h.model.mode(),
        &UiMode::Overlay {
            text_entry: false,
            picker: None
        }
    );

    press_control(&mut h, A::HotkeyField);
    assert_eq!(h.model.open_picker(), Some(PickerKind::Hotkey));
    h.model.handle_key(esc);
    assert_eq!(h.model.open_picker(), None);
    assert!(h.model.overlay_visible());

    h.model.handle_key(esc);
    assert_eq!(h.model.mode(), &UiMode::Plain);

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::StartDrag);
    h.model.handle_key(esc);
    assert_eq!(h.model.mode(), &UiMode::Plain);
    assert!(!h.model.is_exiting());

    // nothing left to close: the session ends without evaluation
    h.model.handle_key(esc);
    assert!(h.model.is_exiting());
    h.model.await_job().await;
    assert_eq!(h.model.status(), "Recording stopped without evaluation");
    assert_eq!(h.model.score(), None);
    assert!(
        h.dir
            .path()
            .join("chrome/task-1/Trajectory and Screenshot/trajectory.jsonl")
            .exists()
    );

    assert!(!h.model.take_exit_request());
    tokio::time::advance(Duration::from_secs(2)).await;
    h.model.tick();
    assert!(h.model.take_exit_request());
}

#[tokio::test(start_paused = true)]
async fn text_entry_captures_space_and_submits_on_enter() {
    let mut h = harness().await;

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::TypeField);
    for c in "hi there".chars() {
        h.model.handle_key(key(KeyCode::Char(c)));
    }
    h.model.handle_key(key(KeyCode::Backspace));
    assert_eq!(h.model.type_text(), "hi ther");
    assert!(h.model.text_entry_active());

    h.model.handle_key(key(KeyCode::Enter));
    assert_eq!(h.model.type_text(), "");
    assert!(h.model.overlay_visible());
    assert!(!h.model.text_entry_active());

    h.model.await_job().await;
    assert_eq!(
        h.controller.commands(),
        vec!["typewrite('hi ther', interval=0.05)"]
    );
    // overlay actions close the overlay when they finish
    assert_eq!(h.model.mode(), &UiMode::Plain);
}

#[tokio::test(start_paused = true)]
async fn empty_text_is_not_submitted() {
    let mut h = harness().await;

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::TypeField);
    h.model.handle_key(key(KeyCode::Enter));

    assert!(!h.model.is_busy());
    assert!(h.model.overlay_visible());
}

#[tokio::test(start_paused = true)]
async fn picker_selection_feeds_go_buttons() {
    let mut h = harness().await;

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::HotkeyField);
    // toggle is ignored while a picker is open
    h.model.handle_key(key(KeyCode::Char(' ')));
    assert_eq!(h.model.open_picker(), Some(PickerKind::Hotkey));

    press_control(&mut h, A::PickerItem(1));
    assert_eq!(h.model.open_picker(), None);
    assert_eq!(h.model.selected(PickerKind::Hotkey), 1);
    assert_eq!(h.model.selected_label(PickerKind::Hotkey), "Ctrl+Shift+S");

    // clicking outside a picker closes it without changing the selection
    press_control(&mut h, A::SleepField);
    press(&mut h, Some(A::View), 1, 30);
    assert_eq!(h.model.selected(PickerKind::Sleep), 0);
    assert!(h.model.overlay_visible());

    press_control(&mut h, A::HotkeyGo);
    h.model.await_job().await;
    assert_eq!(
        h.controller.commands(),
        vec!["hotkey('ctrl', 'shift', 's')"]
    );
}

#[tokio::test(start_paused = true)]
async fn overlay_buttons_dispatch_scroll_key_and_sleep() {
    let mut h = harness().await;

    for action in [A::ScrollUp, A::ScrollDown, A::KeyGo, A::SleepGo] {
        h.model.handle_key(key(KeyCode::Char(' ')));
        press_control(&mut h, action);
        assert!(h.model.overlay_visible());
        h.model.await_job().await;
        assert!(!h.model.overlay_visible());
    }

    // sleep runs locally and never reaches the VM
    assert_eq!(
        h.controller.commands(),
        vec!["scroll(3)", "scroll(-3)", "press('enter')"]
    );
    assert_eq!(
        step_commands(&h),
        vec!["scroll(3)", "scroll(-3)", "press('enter')", "sleep(0.5)"]
    );
}

#[tokio::test(start_paused = true)]
async fn click_outside_panel_closes_overlay() {
    let mut h = harness().await;

    h.model.handle_key(key(KeyCode::Char(' ')));
    press(&mut h, Some(A::View), 1, 30);
    assert_eq!(h.model.mode(), &UiMode::Plain);
    assert!(!h.model.is_busy());

    h.model.handle_key(key(KeyCode::Char(' ')));
    press(&mut h, None, 1, 0);
    assert_eq!(h.model.mode(), &UiMode::Plain);
}

#[tokio::test(start_paused = true)]
async fn refresh_updates_frame_without_recording() {
    let mut h = harness().await;
    let served = h.controller.screenshots_served();

    h.model.handle_key(key(KeyCode::Char(' ')));
    press_control(&mut h, A::Refresh);
    h.model.await_job().await;

    assert_eq!(h.model.status(), "Screenshot refreshed");
    assert_eq!(h.model.step_count(), 0);
    assert_eq!(h.model.frame_generation(), 1);
    assert_eq!(h.controller.screenshots_served(), served + 1);
    assert!(h.model.overlay_visible());
}

#[tokio::test(start_paused = true)]
async fn finish_waits_for_running_action_then_writes_outputs() {
    let mut h = harness().await;
    h.controller.set_score(1.0);

    press(&mut h, Some(A::View), 10, 5);
    h.model.handle_key(key(KeyCode::F(12)));
    assert_eq!(h.model.status(), "Finishing after the current action...");
    assert!(!h.model.is_exiting());

    h.model.await_job().await;
    assert_eq!(h.model.step_count(), 1);
    h.model.tick();
    assert!(h.model.is_exiting());
    h.model.await_job().await;

    assert_eq!(h.model.score(), Some(1.0));
    assert_eq!(h.model.status(), "Done! Score: 1.0");

    let task_dir = h.dir.path().join("chrome/task-1");
    let trajectory = task_dir.join("Trajectory and Screenshot");
    assert_eq!(
        std::fs::read_to_string(trajectory.join("evaluation_score.txt")).unwrap(),
        "1.0"
    );
    assert_eq!(
        load_trajectory(&trajectory.join("trajectory.jsonl"))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        h.controller.recording_dests(),
        vec![trajectory.join("recording.mp4")]
    );
    assert!(trajectory.join("recording.mp4").exists());
    let notebooks: Vec<_> = std::fs::read_dir(task_dir.join("Colab")).unwrap().collect();
    assert_eq!(notebooks.len(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    h.model.tick();
    assert!(h.model.take_exit_request());
}

#[tokio::test(start_paused = true)]
async fn screenshot_outage_is_reported_but_step_is_kept() {
    let mut h = harness().await;

    h.controller.fail_screenshots(3);
    press(&mut h, Some(A::View), 10, 5);
    h.model.await_job().await;

    // stale frame kept, session continues
    assert_eq!(h.model.step_count(), 1);
    assert!(h.model.frame().is_some());
    assert_eq!(h.model.frame_generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn edge_panning_follows_cursor_when_overlay_hidden() {
    let mut h = harness().await;

    // x = 1275 is within 50 px of the right edge
    h.model.handle_mouse_move(127, 20);
    assert!(h.model.tick());
    assert_eq!(h.model.viewport().offset(), Point::new(20, 0));

    h.model.handle_key(key(KeyCode::Char(' ')));
    h.model.tick();
    assert_eq!(h.model.viewport().offset(), Point::new(20, 0));

    h.model.handle_key(key(KeyCode::Esc));
    h.model.handle_mouse_move(64, 20);
    // clicks land on the panned canvas
    press(&mut h, Some(A::View), 10, 5);
    h.model.await_job().await;
    assert_eq!(h.controller.commands(), vec!["click(125, 70)"]);
}

#[tokio::test(start_paused = true)]
async fn resize_reclamps_viewport() {
    let mut h = harness().await;

    for _ in 0..100 {
        h.model.handle_mouse_move(127, 37);
        h.model.tick();
    }
    assert_eq!(h.model.viewport().offset(), Point::new(640, 360));

    // 1700x1000 visible
    h.model.resize(170, 52);
    assert_eq!(h.model.viewport().offset(), Point::new(220, 80));
}
