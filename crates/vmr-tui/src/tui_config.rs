// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Recorder configuration file types
//!
//! Every field is optional; anything left out keeps its built-in default.

use crate::settings::{KeyBinding, KeyBindingError, RecorderSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use vmr_domain_types::HotkeyPreset;
use vmr_vm::VmTimings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid key binding for {field}: {source}")]
    KeyBinding {
        field: &'static str,
        source: KeyBindingError,
    },
    #[error("{0} must not be empty")]
    EmptyList(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RecorderConfig {
    pub timing: Option<TimingConfig>,
    pub viewport: Option<ViewportConfig>,
    pub presets: Option<PresetsConfig>,
    pub keymap: Option<KeymapConfig>,
}

/// Durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TimingConfig {
    pub reset_settle: Option<f64>,
    pub action_settle: Option<f64>,
    pub screenshot_attempts: Option<u32>,
    pub retry_delay: Option<f64>,
    pub max_stale_fetches: Option<u32>,
    pub drag_duration: Option<f64>,
    pub finish_linger: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ViewportConfig {
    pub pan_threshold: Option<i32>,
    pub pan_step: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PresetsConfig {
    /// Labels such as `Ctrl+Shift+S`
    pub hotkeys: Option<Vec<String>>,
    pub special_keys: Option<Vec<String>>,
    pub sleep_seconds: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KeymapConfig {
    pub toggle_overlay: Option<String>,
    pub finish: Option<String>,
    pub cancel: Option<String>,
    pub confirm: Option<String>,
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

fn non_empty<T>(list: Vec<T>, field: &'static str) -> Result<Vec<T>, ConfigError> {
    if list.is_empty() {
        Err(ConfigError::EmptyList(field))
    } else {
        Ok(list)
    }
}

fn binding(value: &Option<String>, field: &'static str) -> Result<Option<KeyBinding>, ConfigError> {
    value
        .as_deref()
        .map(KeyBinding::parse)
        .transpose()
        .map_err(|source| ConfigError::KeyBinding { field, source })
}

impl RecorderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay this file onto the built-in VM timings.
    pub fn vm_timings(&self) -> VmTimings {
        let mut timings = VmTimings::default();
        if let Some(t) = &self.timing {
            if let Some(v) = t.reset_settle {
                timings.reset_settle = secs(v);
            }
            if let Some(v) = t.action_settle {
                timings.action_settle = secs(v);
            }
            if let Some(v) = t.screenshot_attempts {
                timings.screenshot_attempts = v.max(1);
            }
            if let Some(v) = t.retry_delay {
                timings.retry_delay = secs(v);
            }
            if let Some(v) = t.max_stale_fetches {
                timings.max_stale_fetches = v.max(1);
            }
        }
        timings
    }

    /// Overlay this file onto the built-in UI settings.
    pub fn settings(&self) -> Result<RecorderSettings, ConfigError> {
        let mut settings = RecorderSettings::default();

        if let Some(t) = &self.timing {
            if let Some(v) = t.drag_duration {
                settings.drag_seconds = v.max(0.0);
            }
            if let Some(v) = t.finish_linger {
                settings.finish_linger = secs(v);
            }
        }

        if let Some(v) = &self.viewport {
            if let Some(threshold) = v.pan_threshold {
                settings.pan.threshold = threshold.max(0);
            }
            if let Some(step) = v.pan_step {
                settings.pan.step = step.max(1);
            }
        }

        if let Some(p) = &self.presets {
            if let Some(labels) = &p.hotkeys {
                settings.hotkeys = non_empty(
                    labels.iter().map(|l| HotkeyPreset::from_label(l)).collect(),
                    "presets.hotkeys",
                )?;
            }
            if let Some(keys) = &p.special_keys {
                settings.special_keys = non_empty(keys.clone(), "presets.special-keys")?;
            }
            if let Some(seconds) = &p.sleep_seconds {
                settings.sleep_seconds = non_empty(
                    seconds.iter().map(|s| s.max(0.0)).collect(),
                    "presets.sleep-seconds",
                )?;
            }
        }

        if let Some(k) = &self.keymap {
            if let Some(b) = binding(&k.toggle_overlay, "keymap.toggle-overlay")? {
                settings.keymap.toggle_overlay = b;
            }
            if let Some(b) = binding(&k.finish, "keymap.finish")? {
                settings.keymap.finish = b;
            }
            if let Some(b) = binding(&k.cancel, "keymap.cancel")? {
                settings.keymap.cancel = b;
            }
            if let Some(b) = binding(&k.confirm, "keymap.confirm")? {
                settings.keymap.confirm = b;
            }
        }

        Ok(settings)
    }
}
