// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Viewport and coordinate engine
//!
//! Screen space is the pixel space of the terminal window, with a strip of
//! `top_strip` pixels reserved for the status bar. VM space is the pixel
//! space of the remote desktop (the canvas). The visible window shows the
//! canvas region starting at `offset` 1:1, so mapping between the two
//! spaces is a pure translation.

use vmr_domain_types::{Point, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanConfig {
    /// Distance from an edge, in pixels, at which panning starts.
    pub threshold: i32,
    /// Pixels moved per pan update.
    pub step: i32,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            step: 20,
        }
    }
}

/// Viewport rectangle on the minimap, in minimap units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    canvas: Size,
    visible: Size,
    top_strip: i32,
    offset: Point,
    pan: PanConfig,
}

impl Viewport {
    pub fn new(canvas: Size, visible: Size, top_strip: i32, pan: PanConfig) -> Self {
        let mut viewport = Self {
            canvas,
            visible,
            top_strip,
            offset: Point::default(),
            pan,
        };
        viewport.clamp();
        viewport
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Size of the window onto the canvas.
    pub fn visible(&self) -> Size {
        self.visible
    }

    /// Part of the canvas actually on screen.
    pub fn shown(&self) -> Size {
        Size::new(
            self.visible.width.min(self.canvas.width),
            self.visible.height.min(self.canvas.height),
        )
    }

    pub fn top_strip(&self) -> i32 {
        self.top_strip
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn pan_config(&self) -> PanConfig {
        self.pan
    }

    /// True when the canvas does not fit the window on some axis.
    pub fn needs_panning(&self) -> bool {
        self.canvas.width > self.visible.width || self.canvas.height > self.visible.height
    }

    pub fn max_offset(&self) -> Point {
        Point::new(
            (self.canvas.width as i64 - self.visible.width as i64).max(0) as i32,
            (self.canvas.height as i64 - self.visible.height as i64).max(0) as i32,
        )
    }

    fn clamp(&mut self) {
        let max = self.max_offset();
        self.offset.x = self.offset.x.clamp(0, max.x);
        self.offset.y = self.offset.y.clamp(0, max.y);
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
        self.clamp();
    }

    /// The window changed size; the offset is re-clamped.
    pub fn resize(&mut self, visible: Size, top_strip: i32) {
        self.visible = visible;
        self.top_strip = top_strip;
        self.clamp();
    }

    /// Map a screen pixel to the VM pixel under it, clamped to the canvas.
    pub fn screen_to_vm(&self, p: Point) -> Point {
        let x = p.x + self.offset.x;
        let y = p.y - self.top_strip + self.offset.y;
        Point::new(
            x.clamp(0, (self.canvas.width as i32 - 1).max(0)),
            y.clamp(0, (self.canvas.height as i32 - 1).max(0)),
        )
    }

    pub fn vm_to_screen(&self, p: Point) -> Point {
        Point::new(p.x - self.offset.x, p.y - self.offset.y + self.top_strip)
    }

    /// Whether a screen pixel lies on the displayed part of the canvas.
    pub fn is_on_canvas(&self, p: Point) -> bool {
        let shown = self.shown();
        p.x >= 0
            && p.y >= self.top_strip
            && p.x < shown.width as i32
            && p.y < self.top_strip + shown.height as i32
    }

    /// Edge panning: move toward whichever edges `cursor` is close to.
    /// Returns true when the offset changed.
    pub fn pan_towards(&mut self, cursor: Point) -> bool {
        let before = self.offset;
        let PanConfig { threshold, step } = self.pan;
        let right_edge = self.visible.width as i32;
        let bottom_edge = self.top_strip + self.visible.height as i32;

        if self.canvas.width > self.visible.width {
            if cursor.x < threshold {
                self.offset.x -= step;
            } else if cursor.x > right_edge - threshold {
                self.offset.x += step;
            }
        }
        if self.canvas.height > self.visible.height {
            if cursor.y < self.top_strip + threshold {
                self.offset.y -= step;
            } else if cursor.y > bottom_edge - threshold {
                self.offset.y += step;
            }
        }

        self.clamp();
        self.offset != before
    }

    /// Minimap height for a given width, keeping the canvas aspect ratio.
    pub fn minimap_size(&self, width: u32) -> Size {
        Size::new(width, (width as f64 * self.canvas.aspect()).round() as u32)
    }

    /// Rectangle of the visible window inside a minimap of size `map`.
    pub fn minimap_rect(&self, map: Size) -> MinimapRect {
        if self.canvas.is_empty() {
            return MinimapRect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            };
        }
        let sx = map.width as f64 / self.canvas.width as f64;
        let sy = map.height as f64 / self.canvas.height as f64;
        let shown = self.shown();
        MinimapRect {
            x: self.offset.x as f64 * sx,
            y: self.offset.y as f64 * sy,
            width: shown.width as f64 * sx,
            height: shown.height as f64 * sy,
        }
    }
}

/// Pixel size of one terminal cell, used to move between cell and pixel
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGeometry {
    pub cell_width: u16,
    pub cell_height: u16,
}

impl Default for CellGeometry {
    fn default() -> Self {
        Self {
            cell_width: 8,
            cell_height: 16,
        }
    }
}

impl CellGeometry {
    pub fn new(cell_width: u16, cell_height: u16) -> Self {
        Self {
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
        }
    }

    /// Screen pixel at the centre of a cell.
    pub fn cell_center(&self, column: u16, row: u16) -> Point {
        let (w, h) = (self.cell_width as i32, self.cell_height as i32);
        Point::new(column as i32 * w + w / 2, row as i32 * h + h / 2)
    }

    /// Cell containing a screen pixel.
    pub fn cell_at(&self, p: Point) -> (u16, u16) {
        let column = p.x.max(0) / self.cell_width as i32;
        let row = p.y.max(0) / self.cell_height as i32;
        (
            column.min(u16::MAX as i32) as u16,
            row.min(u16::MAX as i32) as u16,
        )
    }

    pub fn cells_to_pixels(&self, columns: u16, rows: u16) -> Size {
        Size::new(
            columns as u32 * self.cell_width as u32,
            rows as u32 * self.cell_height as u32,
        )
    }

    /// Whole cells needed to show `size` pixels.
    pub fn pixels_to_cells(&self, size: Size) -> (u16, u16) {
        let columns = size.width.div_ceil(self.cell_width as u32);
        let rows = size.height.div_ceil(self.cell_height as u32);
        (
            columns.min(u16::MAX as u32) as u16,
            rows.min(u16::MAX as u32) as u16,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(
            Size::new(1920, 1080),
            Size::new(1280, 680),
            40,
            PanConfig::default(),
        )
    }

    #[test]
    fn screen_and_vm_are_inverse_inside_canvas() {
        let mut vp = viewport();
        vp.set_offset(Point::new(300, 200));
        for p in [Point::new(0, 40), Point::new(640, 360), Point::new(1279, 719)] {
            let vm = vp.screen_to_vm(p);
            assert_eq!(vp.vm_to_screen(vm), p);
            assert_eq!(vp.screen_to_vm(vp.vm_to_screen(vm)), vm);
        }
    }

    #[test]
    fn screen_to_vm_clamps_to_canvas() {
        let vp = viewport();
        assert_eq!(vp.screen_to_vm(Point::new(-10, 0)), Point::new(0, 0));
        assert_eq!(vp.screen_to_vm(Point::new(5000, 5000)), Point::new(1919, 1079));
    }

    #[test]
    fn offset_stays_clamped_under_any_pan_sequence() {
        let mut vp = viewport();
        let corners = [
            Point::new(0, 0),
            Point::new(1279, 719),
            Point::new(0, 719),
            Point::new(1279, 41),
        ];
        for i in 0..500 {
            vp.pan_towards(corners[(i * 7 + i / 13) % corners.len()]);
            let max = vp.max_offset();
            let o = vp.offset();
            assert!((0..=max.x).contains(&o.x), "x {o:?}");
            assert!((0..=max.y).contains(&o.y), "y {o:?}");
        }
    }

    #[test]
    fn panning_moves_toward_near_edge_only() {
        let mut vp = viewport();
        assert!(vp.pan_towards(Point::new(1270, 400)));
        assert_eq!(vp.offset(), Point::new(20, 0));
        assert!(!vp.pan_towards(Point::new(640, 400)));
        assert!(vp.pan_towards(Point::new(640, 700)));
        assert_eq!(vp.offset(), Point::new(20, 20));
        // top threshold is measured below the status strip
        assert!(vp.pan_towards(Point::new(640, 60)));
        assert_eq!(vp.offset(), Point::new(20, 0));
    }

    #[test]
    fn no_panning_when_canvas_fits() {
        let mut vp = Viewport::new(
            Size::new(800, 600),
            Size::new(1280, 680),
            40,
            PanConfig::default(),
        );
        assert!(!vp.needs_panning());
        assert!(!vp.pan_towards(Point::new(1279, 719)));
        assert_eq!(vp.offset(), Point::new(0, 0));
    }

    #[test]
    fn resize_reclamps_offset() {
        let mut vp = viewport();
        vp.set_offset(Point::new(640, 400));
        vp.resize(Size::new(1600, 1000), 40);
        assert_eq!(vp.offset(), Point::new(320, 80));
    }

    #[test]
    fn minimap_tracks_offset() {
        let mut vp = viewport();
        vp.set_offset(Point::new(640, 400));
        let map = vp.minimap_size(150);
        assert_eq!(map, Size::new(150, 84));
        let rect = vp.minimap_rect(map);
        assert!((rect.x - 50.0).abs() < 1e-9);
        assert!((rect.width - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cell_geometry_round_trip() {
        let cells = CellGeometry::new(10, 20);
        assert_eq!(cells.cell_center(3, 2), Point::new(35, 50));
        assert_eq!(cells.cell_at(Point::new(35, 50)), (3, 2));
        assert_eq!(cells.pixels_to_cells(Size::new(1921, 1080)), (193, 54));
        assert_eq!(cells.cells_to_pixels(4, 3), Size::new(40, 60));
    }
}
