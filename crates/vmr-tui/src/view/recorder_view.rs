// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main recorder screen: status bar, screenshot window and minimap

use super::{CropKey, HitTestRegistry, Theme, ViewCache, overlay};
use crate::settings::KeyBinding;
use crate::view_model::{RecorderMouseAction, RecorderViewModel, STATUS_ROWS, UiMode};
use ratatui::{prelude::*, widgets::*};
use ratatui_image::StatefulImage;
use tracing::warn;

/// Minimap width in terminal columns.
const MINIMAP_COLUMNS: u32 = 20;

pub fn render(
    frame: &mut Frame<'_>,
    vm: &RecorderViewModel,
    cache: &mut ViewCache,
    hits: &mut HitTestRegistry<RecorderMouseAction>,
    theme: &Theme,
) {
    hits.clear();
    let area = frame.area();
    let [hud_area, screen_area] = Layout::vertical([
        Constraint::Length(STATUS_ROWS.min(area.height)),
        Constraint::Min(0),
    ])
    .areas(area);

    render_hud(frame, hud_area, vm, theme);

    hits.register(screen_area, RecorderMouseAction::View);
    render_screen(frame, screen_area, vm, cache, theme);
    render_drag_marker(frame, screen_area, vm, theme);
    if vm.viewport().needs_panning() {
        render_minimap(frame, screen_area, vm, theme);
    }

    if vm.overlay_visible() {
        overlay::render_overlay(frame, screen_area, vm, hits, theme);
    }
}

fn key_hint(binding: &KeyBinding, label: &str) -> String {
    format!("{}: {}", binding, label)
}

fn mode_hint(vm: &RecorderViewModel) -> String {
    let keymap = &vm.settings().keymap;
    match vm.mode() {
        UiMode::Plain => [
            key_hint(&keymap.toggle_overlay, "controls"),
            key_hint(&keymap.finish, "finish"),
            key_hint(&keymap.cancel, "quit"),
            "Shift+click: double-click".to_string(),
        ]
        .join("  "),
        UiMode::Overlay {
            text_entry: true, ..
        } => format!(
            "Typing  {}  {}",
            key_hint(&keymap.confirm, "send"),
            key_hint(&keymap.cancel, "stop typing")
        ),
        UiMode::Overlay { .. } => key_hint(&keymap.cancel, "close"),
        UiMode::DragArmed => "Click the drag start point (right-click cancels)".to_string(),
        UiMode::DragPendingEnd(start) => {
            format!("Drag from {}: click the end point (right-click cancels)", start)
        }
    }
}

fn render_hud(frame: &mut Frame<'_>, area: Rect, vm: &RecorderViewModel, theme: &Theme) {
    if area.height == 0 {
        return;
    }

    let mut first = vec![
        Span::styled(" ● REC ", Style::default().fg(theme.bg).bg(theme.error)),
        Span::styled(
            format!(" Step {} ", vm.step_count()),
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", theme.muted_style()),
        Span::styled(vm.instruction().to_string(), theme.text_style()),
    ];
    if vm.is_busy() {
        first.insert(2, Span::styled(" working… ", theme.warning_style()));
    }

    let status_style = if vm.status().contains("failed") || vm.status().contains("unavailable")
    {
        theme.error_style()
    } else {
        theme.accent_style()
    };
    let mut second = vec![Span::styled(format!(" {}", vm.status()), status_style)];
    if let Some(action) = vm.last_action() {
        second.push(Span::styled("  │ last: ", theme.muted_style()));
        second.push(Span::styled(action.to_string(), theme.text_style()));
    }
    if let Some(p) = vm.cursor_vm() {
        second.push(Span::styled(format!("  │ VM {}", p), theme.muted_style()));
    }
    second.push(Span::styled(
        format!("  │ {}", mode_hint(vm)),
        theme.muted_style(),
    ));

    let hud = Paragraph::new(vec![Line::from(first), Line::from(second)])
        .style(Style::default().bg(theme.surface));
    frame.render_widget(hud, area);
}

fn render_placeholder(frame: &mut Frame<'_>, area: Rect, message: String, theme: &Theme) {
    let text = Paragraph::new(message)
        .style(theme.muted_style().bg(theme.bg))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    let y = area.y + area.height / 2;
    frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), area);
    frame.render_widget(text, Rect::new(area.x, y, area.width, 1.min(area.height)));
}

fn render_screen(
    frame: &mut Frame<'_>,
    area: Rect,
    vm: &RecorderViewModel,
    cache: &mut ViewCache,
    theme: &Theme,
) {
    if area.is_empty() {
        return;
    }
    let Some(image) = vm.frame() else {
        cache.invalidate();
        render_placeholder(frame, area, "Waiting for the first screenshot…".into(), theme);
        return;
    };

    let viewport = vm.viewport();
    let shown = viewport.shown();
    let offset = viewport.offset();
    let key = CropKey {
        generation: vm.frame_generation(),
        offset,
        size: shown,
    };
    if cache.crop_key != Some(key) {
        cache.frame_protocol = cache.picker.as_ref().map(|picker| {
            let crop = image.crop_imm(
                offset.x.max(0) as u32,
                offset.y.max(0) as u32,
                shown.width,
                shown.height,
            );
            picker.new_resize_protocol(crop)
        });
        cache.crop_key = Some(key);
    }

    let (columns, rows) = vm.cells().pixels_to_cells(shown);
    let target = Rect::new(
        area.x,
        area.y,
        columns.min(area.width),
        rows.min(area.height),
    );

    match cache.frame_protocol.as_mut() {
        Some(protocol) => {
            frame.render_stateful_widget(StatefulImage::default(), target, protocol);
            if let Some(Err(e)) = protocol.last_encoding_result() {
                warn!(error = %e, "Screenshot encoding failed");
            }
        }
        None => render_placeholder(
            frame,
            area,
            format!(
                "Screenshot {}x{} (terminal graphics unavailable)",
                image.width(),
                image.height()
            ),
            theme,
        ),
    }
}

fn render_drag_marker(frame: &mut Frame<'_>, area: Rect, vm: &RecorderViewModel, theme: &Theme) {
    let Some(start) = vm.drag_start() else {
        return;
    };
    let screen = vm.viewport().vm_to_screen(start);
    if !vm.viewport().is_on_canvas(screen) {
        return;
    }
    let (column, row) = vm.cells().cell_at(screen);
    let marker = Rect::new(column, row, 1, 1);
    if area.intersects(marker) {
        frame.render_widget(
            Paragraph::new("◎").style(Style::default().fg(theme.warning).bg(theme.bg)),
            marker,
        );
    }
}

fn render_minimap(frame: &mut Frame<'_>, area: Rect, vm: &RecorderViewModel, theme: &Theme) {
    let viewport = vm.viewport();
    let cells = vm.cells();
    let map = viewport.minimap_size(MINIMAP_COLUMNS);
    // cells are taller than wide
    let rows = ((map.height as f64 * cells.cell_width as f64 / cells.cell_height as f64).round()
        as u32)
        .max(1);
    let map = vmr_domain_types::Size::new(MINIMAP_COLUMNS, rows);

    let width = map.width as u16 + 2;
    let height = map.height as u16 + 2;
    if area.width < width + 1 || area.height < height + 1 {
        return;
    }
    let outer = Rect::new(
        area.right() - width - 1,
        area.bottom() - height - 1,
        width,
        height,
    );

    let rect = viewport.minimap_rect(map);
    let (x0, x1) = (rect.x.floor(), (rect.x + rect.width).ceil());
    let (y0, y1) = (rect.y.floor(), (rect.y + rect.height).ceil());
    let lines: Vec<Line<'_>> = (0..map.height)
        .map(|r| {
            let row: String = (0..map.width)
                .map(|c| {
                    let (c, r) = (c as f64, r as f64);
                    if c >= x0 && c < x1 && r >= y0 && r < y1 {
                        '█'
                    } else {
                        '·'
                    }
                })
                .collect();
            Line::from(Span::styled(row, Style::default().fg(theme.primary)))
        })
        .collect();

    frame.render_widget(Clear, outer);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(theme.muted_style())
                .style(Style::default().bg(theme.bg)),
        ),
        outer,
    );
}
