// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Rendering intents into automation command text
//!
//! The text produced here is both what the VM executes and what the
//! trajectory stores, so the formats are fixed:
//!
//! | intent        | command                                      |
//! |---------------|----------------------------------------------|
//! | click         | `click(x, y)`                                |
//! | double click  | `doubleClick(x, y)`                          |
//! | right click   | `rightClick(x, y)`                           |
//! | type          | `typewrite('<escaped>', interval=0.05)`      |
//! | hotkey        | `hotkey('k1', 'k2', ...)`                    |
//! | press         | `press('key')`                               |
//! | scroll        | `scroll(clicks)`                             |
//! | drag          | `moveTo(x1, y1); drag(dx, dy, duration=d)`   |
//! | sleep         | `sleep(seconds)`                             |

use vmr_domain_types::Intent;

/// Delay between keystrokes for `typewrite`.
pub const TYPEWRITE_INTERVAL: f64 = 0.05;

/// Escapes text for embedding in a single-quoted literal.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out
}

fn quoted(text: &str) -> String {
    format!("'{}'", escape_text(text))
}

/// Renders exactly one command for an intent.
pub fn render(intent: &Intent) -> String {
    match intent {
        Intent::Click(p) => format!("click({}, {})", p.x, p.y),
        Intent::DoubleClick(p) => format!("doubleClick({}, {})", p.x, p.y),
        Intent::RightClick(p) => format!("rightClick({}, {})", p.x, p.y),
        Intent::Type(text) => format!(
            "typewrite({}, interval={})",
            quoted(text),
            TYPEWRITE_INTERVAL
        ),
        Intent::Hotkey(keys) => {
            let keys: Vec<String> = keys.iter().map(|k| quoted(k)).collect();
            format!("hotkey({})", keys.join(", "))
        }
        Intent::Press(key) => format!("press({})", quoted(key)),
        Intent::Scroll(clicks) => format!("scroll({})", clicks),
        Intent::Drag {
            start,
            end,
            duration,
        } => format!(
            "moveTo({}, {}); drag({}, {}, duration={})",
            start.x,
            start.y,
            end.x - start.x,
            end.y - start.y,
            duration
        ),
        Intent::Sleep(seconds) => format!("sleep({})", seconds),
    }
}
