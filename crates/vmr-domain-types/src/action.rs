// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Action intents and their recorded parameter maps

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Action-type tag stored with every recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    DoubleClick,
    RightClick,
    Typewrite,
    Hotkey,
    Press,
    Scroll,
    Drag,
    Sleep,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::DoubleClick => "double_click",
            ActionKind::RightClick => "right_click",
            ActionKind::Typewrite => "typewrite",
            ActionKind::Hotkey => "hotkey",
            ActionKind::Press => "press",
            ActionKind::Scroll => "scroll",
            ActionKind::Drag => "drag",
            ActionKind::Sleep => "sleep",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured parameters recorded as `action_details`.
///
/// Serialized untagged so each step carries a flat object such as
/// `{"x": 10, "y": 20}`. Variant order matters for deserialization: the
/// drag shape is tried before the point shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionParams {
    Drag {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
    },
    Point {
        x: i32,
        y: i32,
    },
    Text {
        text: String,
    },
    Keys {
        keys: Vec<String>,
    },
    Key {
        key: String,
    },
    Scroll {
        clicks: i32,
    },
    Sleep {
        seconds: f64,
    },
}

/// A single operator action, in VM coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Click(Point),
    DoubleClick(Point),
    RightClick(Point),
    Type(String),
    Hotkey(Vec<String>),
    Press(String),
    /// Positive clicks scroll up, negative scroll down.
    Scroll(i32),
    Drag {
        start: Point,
        end: Point,
        duration: f64,
    },
    Sleep(f64),
}

impl Intent {
    pub fn kind(&self) -> ActionKind {
        match self {
            Intent::Click(_) => ActionKind::Click,
            Intent::DoubleClick(_) => ActionKind::DoubleClick,
            Intent::RightClick(_) => ActionKind::RightClick,
            Intent::Type(_) => ActionKind::Typewrite,
            Intent::Hotkey(_) => ActionKind::Hotkey,
            Intent::Press(_) => ActionKind::Press,
            Intent::Scroll(_) => ActionKind::Scroll,
            Intent::Drag { .. } => ActionKind::Drag,
            Intent::Sleep(_) => ActionKind::Sleep,
        }
    }

    pub fn params(&self) -> ActionParams {
        match self {
            Intent::Click(p) | Intent::DoubleClick(p) | Intent::RightClick(p) => {
                ActionParams::Point { x: p.x, y: p.y }
            }
            Intent::Type(text) => ActionParams::Text { text: text.clone() },
            Intent::Hotkey(keys) => ActionParams::Keys { keys: keys.clone() },
            Intent::Press(key) => ActionParams::Key { key: key.clone() },
            Intent::Scroll(clicks) => ActionParams::Scroll { clicks: *clicks },
            Intent::Drag { start, end, .. } => ActionParams::Drag {
                start_x: start.x,
                start_y: start.y,
                end_x: end.x,
                end_y: end.y,
            },
            Intent::Sleep(seconds) => ActionParams::Sleep { seconds: *seconds },
        }
    }

    /// Sleep intents are a local pause and never reach the VM.
    pub fn is_local(&self) -> bool {
        matches!(self, Intent::Sleep(_))
    }
}

/// A named hotkey chord shown in the overlay picker, e.g. `Ctrl+Shift+S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyPreset {
    pub label: String,
    pub keys: Vec<String>,
}

impl HotkeyPreset {
    /// Builds a preset from its label; keys are the lower-cased `+` parts.
    pub fn from_label(label: &str) -> Self {
        let keys = label
            .split('+')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            label: label.to_string(),
            keys,
        }
    }
}
