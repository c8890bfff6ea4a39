// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use ratatui::layout::{Position, Rect};

/// Clickable zones collected while drawing a frame. Zones registered later
/// sit on top of earlier ones.
#[derive(Debug)]
pub struct HitTestRegistry<A> {
    zones: Vec<(Rect, A)>,
}

impl<A> Default for HitTestRegistry<A> {
    fn default() -> Self {
        Self { zones: Vec::new() }
    }
}

impl<A> HitTestRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame's zones.
    pub fn clear(&mut self) {
        self.zones.clear();
    }

    pub fn register(&mut self, rect: Rect, action: A) {
        if rect.width > 0 && rect.height > 0 {
            self.zones.push((rect, action));
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl<A: Copy> HitTestRegistry<A> {
    /// Top-most action at a terminal cell.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<A> {
        let position = Position::new(column, row);
        self.zones
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(position))
            .map(|(_, action)| *action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Zone {
        Screen,
        Button,
    }

    #[test]
    fn later_zones_win() {
        let mut registry = HitTestRegistry::new();
        registry.register(Rect::new(0, 0, 80, 24), Zone::Screen);
        registry.register(Rect::new(10, 5, 6, 1), Zone::Button);

        assert_eq!(registry.hit_test(12, 5), Some(Zone::Button));
        assert_eq!(registry.hit_test(12, 6), Some(Zone::Screen));
        assert_eq!(registry.hit_test(80, 0), None);
    }

    #[test]
    fn empty_rects_are_not_registered() {
        let mut registry = HitTestRegistry::new();
        registry.register(Rect::new(3, 3, 0, 4), Zone::Button);
        assert!(registry.is_empty());
        registry.register(Rect::new(3, 3, 1, 1), Zone::Button);
        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
