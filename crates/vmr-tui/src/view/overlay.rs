// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Control panel drawn over the screenshot, and its preset pickers

use super::{HitTestRegistry, Theme};
use crate::view_model::{PickerKind, RecorderMouseAction, RecorderViewModel};
use ratatui::{prelude::*, widgets::*};

const PANEL_WIDTH: u16 = 60;
const PANEL_HEIGHT: u16 = 10;
const LABEL_WIDTH: u16 = 8;
const GO_WIDTH: u16 = 4;
const PICKER_COLUMNS: usize = 3;

fn text_width(s: &str) -> u16 {
    s.chars().count().min(u16::MAX as usize) as u16
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

struct FieldRow<'a> {
    label: &'a str,
    value: Span<'a>,
    field: RecorderMouseAction,
    go: RecorderMouseAction,
}

pub fn render_overlay(
    frame: &mut Frame<'_>,
    area: Rect,
    vm: &RecorderViewModel,
    hits: &mut HitTestRegistry<RecorderMouseAction>,
    theme: &Theme,
) {
    let panel = centered(area, PANEL_WIDTH, PANEL_HEIGHT);
    if panel.is_empty() {
        return;
    }
    frame.render_widget(Clear, panel);
    let block = theme.panel_block("Controls");
    let inner = block.inner(panel);
    frame.render_widget(block, panel);
    hits.register(panel, RecorderMouseAction::Panel);

    let typing = vm.text_entry_active();
    let type_value = if typing {
        Span::styled(format!("{}▏", vm.type_text()), theme.field_style(true))
    } else if vm.type_text().is_empty() {
        Span::styled("click to type", theme.muted_style().bg(theme.surface))
    } else {
        Span::styled(vm.type_text().to_string(), theme.field_style(false))
    };
    let picker_value = |kind: PickerKind| {
        let open = vm.open_picker() == Some(kind);
        Span::styled(
            format!("{} ▾", vm.selected_label(kind)),
            theme.field_style(open),
        )
    };

    let rows = [
        FieldRow {
            label: "Type",
            value: type_value,
            field: RecorderMouseAction::TypeField,
            go: RecorderMouseAction::TypeGo,
        },
        FieldRow {
            label: "Hotkey",
            value: picker_value(PickerKind::Hotkey),
            field: RecorderMouseAction::HotkeyField,
            go: RecorderMouseAction::HotkeyGo,
        },
        FieldRow {
            label: "Key",
            value: picker_value(PickerKind::Key),
            field: RecorderMouseAction::KeyField,
            go: RecorderMouseAction::KeyGo,
        },
        FieldRow {
            label: "Sleep",
            value: picker_value(PickerKind::Sleep),
            field: RecorderMouseAction::SleepField,
            go: RecorderMouseAction::SleepGo,
        },
    ];

    let field_width = inner.width.saturating_sub(LABEL_WIDTH + GO_WIDTH + 1);
    for (i, row) in rows.into_iter().enumerate() {
        let y = inner.y + i as u16;
        if y >= inner.bottom() {
            return;
        }
        let label_rect = Rect::new(inner.x, y, LABEL_WIDTH.min(inner.width), 1);
        let field_rect = Rect::new(inner.x + label_rect.width, y, field_width, 1);
        let go_rect = Rect::new(field_rect.right() + 1, y, GO_WIDTH, 1).intersection(inner);

        frame.render_widget(
            Paragraph::new(Span::styled(row.label, theme.text_style())),
            label_rect,
        );
        frame.render_widget(
            Paragraph::new(Line::from(row.value)).style(Style::default().bg(theme.surface)),
            field_rect,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(" Go ", theme.button_style())),
            go_rect,
        );
        hits.register(field_rect, row.field);
        hits.register(go_rect, row.go);
    }

    let button_y = inner.y + 5;
    if button_y < inner.bottom() {
        let buttons = [
            ("↑ Scroll", RecorderMouseAction::ScrollUp),
            ("↓ Scroll", RecorderMouseAction::ScrollDown),
            ("Refresh", RecorderMouseAction::Refresh),
            ("Drag", RecorderMouseAction::StartDrag),
            ("Finish", RecorderMouseAction::Finish),
        ];
        let mut x = inner.x;
        for (label, action) in buttons {
            let rect = Rect::new(x, button_y, text_width(label) + 2, 1).intersection(inner);
            if rect.is_empty() {
                break;
            }
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {} ", label), theme.button_style())),
                rect,
            );
            hits.register(rect, action);
            x = rect.right() + 1;
        }
    }

    let hint_y = inner.y + 7;
    if hint_y < inner.bottom() {
        let keymap = &vm.settings().keymap;
        let hint = format!(
            "{}: close   {}: finish   Shift+click: double-click",
            keymap.cancel, keymap.finish
        );
        frame.render_widget(
            Paragraph::new(Span::styled(hint, theme.muted_style())),
            Rect::new(inner.x, hint_y, inner.width, 1),
        );
    }

    if let Some(kind) = vm.open_picker() {
        render_picker(frame, panel, vm, kind, hits, theme);
    }
}

fn render_picker(
    frame: &mut Frame<'_>,
    anchor: Rect,
    vm: &RecorderViewModel,
    kind: PickerKind,
    hits: &mut HitTestRegistry<RecorderMouseAction>,
    theme: &Theme,
) {
    let items = vm.picker_items(kind);
    let selected = vm.selected(kind);
    let column_width = items
        .iter()
        .map(|item| text_width(item))
        .max()
        .unwrap_or(0)
        .max(8)
        + 2;
    let columns = PICKER_COLUMNS.min(items.len()).max(1);
    let rows = items.len().div_ceil(columns) as u16;

    let popup = centered(
        anchor,
        column_width * columns as u16 + 2,
        rows + 2,
    );
    if popup.is_empty() {
        return;
    }
    let title = match kind {
        PickerKind::Hotkey => "Hotkey",
        PickerKind::Key => "Key",
        PickerKind::Sleep => "Sleep",
    };
    frame.render_widget(Clear, popup);
    let block = theme.panel_block(title);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    hits.register(popup, RecorderMouseAction::PickerPanel);

    for (index, item) in items.iter().enumerate() {
        let column = (index % columns) as u16;
        let row = (index / columns) as u16;
        let rect = Rect::new(
            inner.x + column * column_width,
            inner.y + row,
            column_width,
            1,
        )
        .intersection(inner);
        if rect.is_empty() {
            continue;
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", item),
                theme.field_style(index == selected),
            )),
            rect,
        );
        hits.register(rect, RecorderMouseAction::PickerItem(index));
    }
}
