// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! View Layer - Pure Rendering and Presentation
//!
//! Turns [`RecorderViewModel`](crate::view_model::RecorderViewModel) state
//! into ratatui widgets. The view never changes view model state; its only
//! output besides the drawn frame is the set of hit-test zones the event
//! loop uses to resolve mouse clicks.

use ratatui::{prelude::*, widgets::*};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;
use vmr_domain_types::{Point, Size};

pub mod hit_test;
pub mod overlay;
pub mod recorder_view;

pub use hit_test::HitTestRegistry;
pub use recorder_view::render;

/// Identifies which canvas region the cached protocol was encoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CropKey {
    pub generation: u64,
    pub offset: Point,
    pub size: Size,
}

/// Image encoding state kept between frames
#[derive(Default)]
pub struct ViewCache {
    /// `None` when the terminal has no usable graphics support.
    pub picker: Option<Picker>,
    frame_protocol: Option<StatefulProtocol>,
    crop_key: Option<CropKey>,
}

impl ViewCache {
    pub fn new(picker: Option<Picker>) -> Self {
        Self {
            picker,
            frame_protocol: None,
            crop_key: None,
        }
    }

    /// Query the terminal for its graphics protocol and cell size, falling
    /// back to an 8x16 cell when the query fails.
    pub fn detect() -> Self {
        let picker = match Picker::from_query_stdio() {
            Ok(picker) => picker,
            Err(e) => {
                tracing::warn!(error = %e, "Terminal graphics query failed, using defaults");
                Picker::from_fontsize((8, 16))
            }
        };
        Self::new(Some(picker))
    }

    pub fn font_size(&self) -> Option<(u16, u16)> {
        self.picker.as_ref().map(|p| p.font_size())
    }

    pub(crate) fn invalidate(&mut self) {
        self.frame_protocol = None;
        self.crop_key = None;
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub surface: Color,
    pub text: Color,
    pub muted: Color,
    pub primary: Color,
    pub accent: Color,
    pub warning: Color,
    pub error: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Rgb(17, 17, 27),
            surface: Color::Rgb(24, 24, 37),
            text: Color::Rgb(205, 214, 244),
            muted: Color::Rgb(127, 132, 156),
            primary: Color::Rgb(137, 180, 250),
            accent: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(250, 179, 135),
            error: Color::Rgb(243, 139, 168),
            border: Color::Rgb(69, 71, 90),
        }
    }
}

impl Theme {
    /// Rounded panel with a bold title.
    pub fn panel_block(&self, title: &str) -> Block<'_> {
        let title_line = Line::from(vec![
            Span::raw("┤").fg(self.border),
            Span::raw(format!(" {} ", title))
                .style(Style::default().fg(self.text).add_modifier(Modifier::BOLD)),
            Span::raw("├").fg(self.border),
        ]);

        Block::default()
            .title(title_line)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .style(Style::default().bg(self.bg))
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn button_style(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .bg(self.surface)
            .add_modifier(Modifier::BOLD)
    }

    pub fn field_style(&self, active: bool) -> Style {
        if active {
            Style::default().fg(self.bg).bg(self.primary)
        } else {
            Style::default().fg(self.text).bg(self.surface)
        }
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }
}
