// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Runtime settings: key bindings and overlay presets

use crate::viewport::PanConfig;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use thiserror::Error;
use vmr_domain_types::HotkeyPreset;

pub const DEFAULT_HOTKEYS: &[&str] = &[
    "Ctrl+S",
    "Ctrl+Shift+S",
    "Ctrl+C",
    "Ctrl+V",
    "Ctrl+X",
    "Ctrl+Z",
    "Ctrl+A",
    "Ctrl+F",
    "Ctrl+H",
    "Ctrl+N",
    "Ctrl+O",
    "Ctrl+P",
    "Ctrl+W",
    "Alt+F4",
    "Ctrl+Alt+T",
];

pub const DEFAULT_SPECIAL_KEYS: &[&str] = &[
    "enter",
    "tab",
    "escape",
    "backspace",
    "delete",
    "up",
    "down",
    "left",
    "right",
    "space",
    "home",
    "end",
    "pageup",
    "pagedown",
];

pub const DEFAULT_SLEEP_SECONDS: &[f64] = &[0.5, 1.0, 2.0, 3.0, 5.0, 10.0];

/// Duration of the drag gesture sent to the VM.
pub const DEFAULT_DRAG_SECONDS: f64 = 0.5;

/// Clicks per overlay scroll button press.
pub const SCROLL_CLICKS: i32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyBindingError {
    #[error("empty key binding")]
    Empty,
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),
}

/// A single key with required modifiers, e.g. `F12` or `Ctrl+Q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn parse(s: &str) -> Result<Self, KeyBindingError> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, mods)) = parts.split_last() else {
            return Err(KeyBindingError::Empty);
        };
        if key.is_empty() {
            return Err(KeyBindingError::Empty);
        }

        let mut modifiers = KeyModifiers::NONE;
        for m in mods {
            match m.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" | "option" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                other => return Err(KeyBindingError::UnsupportedKey(other.to_string())),
            }
        }

        let lower = key.to_lowercase();
        let code = match lower.as_str() {
            "enter" | "return" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "esc" | "escape" => KeyCode::Esc,
            "space" => KeyCode::Char(' '),
            "backspace" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" | "pgup" => KeyCode::PageUp,
            "pagedown" | "pgdown" => KeyCode::PageDown,
            f if f.starts_with('f') && f.len() > 1 => match f[1..].parse::<u8>() {
                Ok(n) if (1..=24).contains(&n) => KeyCode::F(n),
                _ => return Err(KeyBindingError::UnsupportedKey(key.to_string())),
            },
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return Err(KeyBindingError::UnsupportedKey(key.to_string())),
                }
            }
        };

        Ok(Self { code, modifiers })
    }

    /// Shift is ignored for character keys so `q` also matches `Q`.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let code_matches = match (self.code, event.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        };
        let mut mods = event.modifiers;
        if matches!(self.code, KeyCode::Char(_)) && !self.modifiers.contains(KeyModifiers::SHIFT)
        {
            mods.remove(KeyModifiers::SHIFT);
        }
        code_matches && mods == self.modifiers
    }
}

impl std::fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            write!(f, "Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            write!(f, "Shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Esc => write!(f, "Esc"),
            KeyCode::Enter => write!(f, "Enter"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Keys handled by the recorder itself. Everything else only matters while
/// typing into the text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderKeymap {
    pub toggle_overlay: KeyBinding,
    pub finish: KeyBinding,
    pub cancel: KeyBinding,
    pub confirm: KeyBinding,
}

impl Default for RecorderKeymap {
    fn default() -> Self {
        Self {
            toggle_overlay: KeyBinding::plain(KeyCode::Char(' ')),
            finish: KeyBinding::plain(KeyCode::F(12)),
            cancel: KeyBinding::plain(KeyCode::Esc),
            confirm: KeyBinding::plain(KeyCode::Enter),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSettings {
    pub keymap: RecorderKeymap,
    pub hotkeys: Vec<HotkeyPreset>,
    pub special_keys: Vec<String>,
    pub sleep_seconds: Vec<f64>,
    pub pan: PanConfig,
    pub drag_seconds: f64,
    /// How long the final status stays on screen before the UI exits.
    pub finish_linger: Duration,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            keymap: RecorderKeymap::default(),
            hotkeys: DEFAULT_HOTKEYS.iter().map(|l| HotkeyPreset::from_label(l)).collect(),
            special_keys: DEFAULT_SPECIAL_KEYS.iter().map(|k| k.to_string()).collect(),
            sleep_seconds: DEFAULT_SLEEP_SECONDS.to_vec(),
            pan: PanConfig::default(),
            drag_seconds: DEFAULT_DRAG_SECONDS,
            finish_linger: Duration::from_secs(2),
        }
    }
}

/// `0.5s`, `1s`
pub fn format_seconds(seconds: f64) -> String {
    format!("{}s", seconds)
}
