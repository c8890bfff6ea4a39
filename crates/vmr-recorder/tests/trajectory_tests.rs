// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::{Local, TimeZone};
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::json;
use vmr_domain_types::{Intent, Point, TaskSpec};
use vmr_recorder::{OutputLayout, TrajectoryRecorder, load_trajectory};

fn task() -> TaskSpec {
    TaskSpec::from_config(
        "libreoffice_writer",
        "task-42",
        json!({"id": "task-42", "instruction": "Make the title bold", "related_apps": ["libreoffice_writer"]}),
    )
}

fn recorder(dir: &std::path::Path) -> TrajectoryRecorder {
    let layout = OutputLayout::for_task(dir, "libreoffice_writer", "task-42");
    let started = Local.timestamp_opt(1_700_000_000, 0).unwrap();
    TrajectoryRecorder::create_at(layout, &task(), started).unwrap()
}

fn record(rec: &mut TrajectoryRecorder, intent: Intent, command: &str) {
    let shot = rec.layout().screenshot_file(rec.step_count());
    rec.record(
        command.to_string(),
        shot.to_string_lossy().into_owned(),
        intent.kind(),
        intent.params(),
    );
}

#[test]
fn indices_are_sequential_and_gapless() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    record(&mut rec, Intent::Click(Point::new(10, 20)), "click(10, 20)");
    record(&mut rec, Intent::Press("enter".into()), "press('enter')");
    record(&mut rec, Intent::Scroll(-3), "scroll(-3)");

    let indices: Vec<usize> = rec.steps().iter().map(|s| s.step).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(rec.steps().iter().all(|s| s.instruction == "Make the title bold"));
}

#[test]
fn saved_trajectory_round_trips_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    record(
        &mut rec,
        Intent::Drag {
            start: Point::new(100, 100),
            end: Point::new(300, 50),
            duration: 0.5,
        },
        "moveTo(100, 100); drag(200, -50, duration=0.5)",
    );
    record(&mut rec, Intent::Type("it's \"done\"".into()), r#"typewrite('it\'s \"done\"', interval=0.05)"#);
    record(&mut rec, Intent::Sleep(1.0), "sleep(1)");
    record(&mut rec, Intent::Hotkey(vec!["ctrl".into(), "s".into()]), "hotkey('ctrl', 's')");

    let path = rec.save().unwrap();
    let loaded = load_trajectory(&path).unwrap();
    assert_eq!(loaded, rec.steps());

    let original = std::fs::read_to_string(&path).unwrap();
    for (line, step) in original.lines().zip(&loaded) {
        assert_eq!(line, serde_json::to_string(step).unwrap());
    }
    assert_eq!(original.lines().count(), 4);
}

#[test]
fn step_json_shape() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    record(&mut rec, Intent::RightClick(Point::new(5, 7)), "rightClick(5, 7)");
    let value = serde_json::to_value(&rec.steps()[0]).unwrap();

    assert_eq!(value["step"], 0);
    assert_eq!(value["action"], "rightClick(5, 7)");
    assert_eq!(value["action_type"], "right_click");
    assert_eq!(value["action_details"], json!({"x": 5, "y": 7}));
    assert!(value["observation"]["screenshot"]
        .as_str()
        .unwrap()
        .ends_with("step_0_before.png"));
    assert!(value["timestamp"].is_f64());
}

#[test]
fn screenshot_names_track_next_index() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));

    let first = rec.save_before_screenshot(&img).unwrap();
    assert!(first.ends_with("step_0_before.png"));
    record(&mut rec, Intent::Click(Point::new(1, 1)), "click(1, 1)");

    let second = rec.save_before_screenshot(&img).unwrap();
    assert!(second.ends_with("step_1_before.png"));
    assert!(first.exists() && second.exists());
    let reread = image::open(&second).unwrap();
    assert_eq!((reread.width(), reread.height()), (4, 4));
}

#[test]
fn score_file_is_plain_text() {
    let dir = tempfile::tempdir().unwrap();
    let rec = recorder(dir.path());
    let path = rec.save_score(1.0).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "1.0");
}

#[test]
fn transcript_is_idempotent_and_named_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    record(&mut rec, Intent::Click(Point::new(3, 4)), "click(3, 4)");

    let first = rec.generate_transcript().unwrap();
    let first_bytes = std::fs::read(&first).unwrap();
    let second = rec.generate_transcript().unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second).unwrap(), first_bytes);
    assert!(first.ends_with("Colab/osw.manual_task.1700000000.ipynb"));

    let notebook: serde_json::Value = serde_json::from_slice(&first_bytes).unwrap();
    assert_eq!(notebook["nbformat"], 4);
    assert_eq!(notebook["cells"].as_array().unwrap().len(), 5);
    let metadata: String = notebook["cells"][0]["source"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l.as_str().unwrap())
        .collect();
    assert!(metadata.contains("\"task_id\": \"task-42\""));
    assert!(metadata.contains("\"domain\": \"libreoffice_writer\""));
}

#[test]
fn session_log_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = recorder(dir.path());
    record(&mut rec, Intent::Click(Point::new(3, 4)), "click(3, 4)");

    let summary = rec.summary();
    assert_eq!(summary.total_steps, 1);
    assert!(summary.trajectory_file.ends_with("Trajectory and Screenshot/trajectory.jsonl"));

    let log = rec.save_session_log(Some(0.0)).unwrap();
    let text = std::fs::read_to_string(log).unwrap();
    assert!(text.contains("Total Steps: 1"));
    assert!(text.contains("Evaluation Score: 0.0"));
}
