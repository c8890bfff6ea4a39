// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Notebook transcript derived from a trajectory
//!
//! The transcript is a Jupyter notebook made only of markdown cells: a
//! metadata cell, the task instruction, then three cells per step (the
//! screenshot reference, a templated description of the action, and the
//! literal command). Building it is a pure function of the trajectory and
//! its context, so regenerating it yields identical bytes.

use crate::step::Step;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use vmr_domain_types::{ActionKind, ActionParams};

/// Everything besides the steps that the transcript mentions.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptContext {
    pub task_id: String,
    pub domain: String,
    pub instruction: String,
    pub started_at: DateTime<Local>,
    pub model_pass_rate: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notebook {
    pub nbformat: u32,
    pub nbformat_minor: u32,
    pub metadata: serde_json::Value,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub cell_type: &'static str,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub source: Vec<String>,
}

impl Cell {
    pub fn markdown(content: &str) -> Self {
        Self {
            cell_type: "markdown",
            metadata: serde_json::Map::new(),
            source: source_lines(content),
        }
    }

    pub fn text(&self) -> String {
        self.source.concat()
    }
}

/// Splits text into notebook source lines, each keeping its newline except
/// the last.
fn source_lines(content: &str) -> Vec<String> {
    content.split_inclusive('\n').map(str::to_string).collect()
}

#[derive(Serialize)]
struct MetadataBlock<'a> {
    task_id: &'a str,
    domain: &'a str,
    instruction: &'a str,
    total_steps: usize,
    timestamp: String,
    model_pass_rate: &'a BTreeMap<String, f64>,
}

/// Templated first-person description of a step.
pub fn describe(step: &Step) -> String {
    let details = step.action_details.as_ref();
    let point = || match details {
        Some(ActionParams::Point { x, y }) => format!("({}, {})", x, y),
        _ => "(?, ?)".to_string(),
    };

    match step.action_type {
        ActionKind::Click => format!(
            "I'll click at position {} to interact with the element at that location.",
            point()
        ),
        ActionKind::DoubleClick => format!(
            "I'll double-click at position {} to open or select the element.",
            point()
        ),
        ActionKind::RightClick => format!(
            "I'll right-click at position {} to open the context menu.",
            point()
        ),
        ActionKind::Typewrite => {
            let text = match details {
                Some(ActionParams::Text { text }) => text.as_str(),
                _ => "",
            };
            format!("I'll type '{}' to enter the required text.", text)
        }
        ActionKind::Hotkey => {
            let keys = match details {
                Some(ActionParams::Keys { keys }) => keys.join("+"),
                _ => String::new(),
            };
            format!("I'll press {} to execute this keyboard shortcut.", keys)
        }
        ActionKind::Press => {
            let key = match details {
                Some(ActionParams::Key { key }) => key.as_str(),
                _ => "",
            };
            format!("I'll press the {} key.", key)
        }
        ActionKind::Scroll => {
            let direction = match details {
                Some(ActionParams::Scroll { clicks }) if *clicks > 0 => "up",
                _ => "down",
            };
            format!("I'll scroll {} to navigate the content.", direction)
        }
        ActionKind::Drag => {
            "I'll drag from the starting position to the ending position.".to_string()
        }
        ActionKind::Sleep => match details {
            Some(ActionParams::Sleep { seconds }) => format!(
                "I'll wait {} seconds for the screen to finish updating.",
                seconds
            ),
            _ => "I'll perform this action to progress with the task.".to_string(),
        },
    }
}

pub fn build(context: &TranscriptContext, steps: &[Step]) -> Notebook {
    let metadata = MetadataBlock {
        task_id: &context.task_id,
        domain: &context.domain,
        instruction: &context.instruction,
        total_steps: steps.len(),
        timestamp: context.started_at.to_rfc3339(),
        model_pass_rate: &context.model_pass_rate,
    };
    let metadata_json = serde_json::to_string_pretty(&metadata).unwrap_or_default();

    let mut cells = vec![
        Cell::markdown(&format!(
            "## Task Metadata\n\n```json\n{}\n```",
            metadata_json
        )),
        Cell::markdown(&format!("## Task Instruction\n\n{}", context.instruction)),
    ];

    for step in steps {
        let screenshot = if step.observation.screenshot.is_empty() {
            "N/A"
        } else {
            step.observation.screenshot.as_str()
        };
        cells.push(Cell::markdown(&format!(
            "**[user]**\n\nScreenshot: `{}`",
            screenshot
        )));
        cells.push(Cell::markdown(&format!(
            "**[assistant]**\n\n{}",
            describe(step)
        )));
        cells.push(Cell::markdown(&format!(
            "**[tool_call]**\n\n```python\n{}\n```",
            step.action
        )));
    }

    Notebook {
        nbformat: 4,
        nbformat_minor: 5,
        metadata: serde_json::json!({
            "kernelspec": {
                "display_name": "Python 3",
                "language": "python",
                "name": "python3"
            },
            "language_info": {
                "name": "python",
                "version": "3.10.0"
            }
        }),
        cells,
    }
}

/// Notebook JSON, pretty-printed with a trailing newline.
pub fn render(context: &TranscriptContext, steps: &[Step]) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(&build(context, steps))?;
    json.push('\n');
    Ok(json)
}
