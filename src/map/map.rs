use egui::epaint::{Color32, Pos2, Shape, Stroke};
use egui::{Align2, FontId, Response, Sense, Ui, Vec2};
use serde::{Deserialize, Serialize};

use super::hex_layer::HexLayer;
use super::projection::{project, unproject, Coordinate, Viewport};
use crate::vibe::color_scale::{ColorScale, MetricMode};
use crate::vibe::dataset::VibeDataset;
use crate::vibe::popup::tooltip_text;

pub const MIN_ZOOM: f32 = 0.0;
pub const MAX_ZOOM: f32 = 12.0;

const BACKGROUND: Color32 = Color32::from_rgb(24, 26, 31);
const CELL_OUTLINE: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 90);
const HOVER_OUTLINE: Color32 = Color32::WHITE;
const SELECTED_OUTLINE: Color32 = Color32::from_rgb(255, 214, 10);

#[derive(Clone, Serialize, Deserialize)]
pub struct MapState {
    center: Coordinate,
    zoom: f32,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            center: Coordinate::default(),
            zoom: 1.5,
        }
    }
}

impl MapState {
    pub fn load(ctx: &egui::Context, id: egui::Id) -> Self {
        ctx.data_mut(|d| d.get_persisted::<Self>(id).unwrap_or_default())
    }

    pub fn store(self, ctx: &egui::Context, id: egui::Id) {
        ctx.data_mut(|d| d.insert_persisted(id, self));
    }

    /// Recentres the stored map state, e.g. when a list entry is picked.
    pub fn focus(ctx: &egui::Context, id: egui::Id, center: Coordinate, zoom: f32) {
        let mut state = Self::load(ctx, id);
        state.center = center.wrapped();
        state.zoom = state.zoom.max(zoom).clamp(MIN_ZOOM, MAX_ZOOM);
        state.store(ctx, id);
    }

    fn pan(&mut self, delta: Vec2) {
        let (x, y) = project(&self.center, self.zoom);
        self.center = unproject(x - delta.x as f64, y - delta.y as f64, self.zoom).wrapped();
    }

    /// Zooms by `step` while keeping the geographic point under `anchor` in place.
    fn zoom_around(&mut self, viewport: &Viewport, anchor: Pos2, step: f32) {
        let target = viewport.to_geo(anchor);
        self.zoom = (self.zoom + step).clamp(MIN_ZOOM, MAX_ZOOM);
        let (tx, ty) = project(&target, self.zoom);
        let mid = viewport.rect.center();
        self.center = unproject(tx - (anchor.x - mid.x) as f64, ty - (anchor.y - mid.y) as f64, self.zoom).wrapped();
    }
}

/// What happened on the map this frame.
pub struct MapOutput {
    pub hovered: Option<usize>,
    pub clicked: bool,
}

pub struct Map<'a> {
    id: egui::Id,
    dataset: &'a VibeDataset,
    layer: &'a HexLayer,
    mode: MetricMode,
    scale: ColorScale,
    selected: Option<usize>,
    viewport_size: Vec2,
}

impl<'a> Map<'a> {
    pub fn new(id_source: impl std::hash::Hash, dataset: &'a VibeDataset, layer: &'a HexLayer) -> Self {
        Self {
            id: egui::Id::new(id_source),
            dataset,
            layer,
            mode: MetricMode::default(),
            scale: MetricMode::default().scale(),
            selected: None,
            viewport_size: Vec2::new(1024.0, 768.0),
        }
    }

    pub fn viewport_size(mut self, size: Vec2) -> Self {
        self.viewport_size = size;
        self
    }

    pub fn mode(mut self, mode: MetricMode) -> Self {
        self.mode = mode;
        self.scale = mode.scale();
        self
    }

    pub fn selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn show(self, ui: &mut Ui) -> MapOutput {
        let mut state = MapState::load(ui.ctx(), self.id);

        let (rect, mut response) = ui.allocate_exact_size(self.viewport_size, Sense::click_and_drag());
        let painter = ui.painter().with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, BACKGROUND);

        // Handle interactions
        if response.dragged() {
            state.pan(response.drag_delta());
        }

        if let Some(pointer) = response.hover_pos() {
            let viewport = Viewport::new(state.center, state.zoom, rect);

            // pinch / touch
            let zoom_delta = ui.input(|i| i.zoom_delta());
            if (zoom_delta - 1.0).abs() > f32::EPSILON {
                state.zoom_around(&viewport, pointer, zoom_delta.log2());
            } else {
                let scroll = ui.input(|i| i.smooth_scroll_delta).y;
                if scroll.abs() > f32::EPSILON {
                    // Normalize scroll using tanh
                    state.zoom_around(&viewport, pointer, (scroll / 10.0).tanh() * 0.5);
                }
            }
        }

        let viewport = Viewport::new(state.center, state.zoom, rect);
        let cells = self.dataset.cells();
        let outline = Stroke::new(if state.zoom >= 3.0 { 0.6 } else { 0.0 }, CELL_OUTLINE);

        let hovered = response
            .hover_pos()
            .and_then(|pos| self.layer.hit_test(cells, &viewport.to_geo(pos)));

        let visible = self.layer.visible(&viewport.bounds());
        let mut highlights: Vec<(Vec<Pos2>, Stroke)> = Vec::new();
        for entry in &visible {
            let Some(cell) = cells.get(entry.slot) else {
                continue;
            };
            let points: Vec<Pos2> = cell
                .ring
                .iter()
                .map(|p| viewport.to_screen(&p.shifted(entry.longitude_offset)))
                .collect();
            let fill = self.scale.color_for_stats(self.mode, cell.stats.as_ref());

            if self.selected == Some(entry.slot) {
                highlights.push((points.clone(), Stroke::new(2.5, SELECTED_OUTLINE)));
            } else if hovered == Some(entry.slot) {
                highlights.push((points.clone(), Stroke::new(1.5, HOVER_OUTLINE)));
            }
            painter.add(Shape::convex_polygon(points, fill, outline));
        }
        // Outlines go on top so neighbours don't paint over them
        for (points, stroke) in highlights {
            painter.add(Shape::closed_line(points, stroke));
        }

        if self.layer.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No cells published",
                FontId::proportional(16.0),
                Color32::from_gray(160),
            );
        }

        painter.text(
            rect.left_bottom() + egui::vec2(8.0, -8.0),
            Align2::LEFT_BOTTOM,
            format!(
                "{:.2}°, {:.2}° · z{:.1} · {}/{} cells",
                state.center.latitude(),
                state.center.longitude(),
                state.zoom,
                visible.len(),
                self.layer.len()
            ),
            FontId::monospace(12.0),
            Color32::from_gray(160),
        );

        if let Some(cell) = hovered.and_then(|slot| cells.get(slot)) {
            let text = tooltip_text(cell);
            response = response.on_hover_ui_at_pointer(|ui| {
                ui.label(text);
            });
        }

        let clicked = response.clicked();

        // Store updated state
        state.store(ui.ctx(), self.id);

        MapOutput {
            hovered,
            clicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    #[test]
    fn pan_moves_center_against_drag() {
        let mut state = MapState {
            center: Coordinate::new(0.0, 0.0),
            zoom: 2.0,
        };
        // world is 1024 px wide at zoom 2, so 256 px is a quarter turn
        state.pan(egui::vec2(256.0, 0.0));
        assert_relative_eq!(state.center.longitude(), -90.0, epsilon = 1e-9);
        assert_relative_eq!(state.center.latitude(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn pan_wraps_longitude() {
        let mut state = MapState {
            center: Coordinate::new(0.0, 170.0),
            zoom: 0.0,
        };
        state.pan(egui::vec2(-256.0 * 20.0 / 360.0, 0.0));
        assert_relative_eq!(state.center.longitude(), -170.0, epsilon = 1e-6);
    }

    #[test]
    fn zoom_keeps_anchor_in_place() {
        let mut state = MapState {
            center: Coordinate::new(10.0, 10.0),
            zoom: 3.0,
        };
        let anchor = egui::pos2(650.0, 120.0);
        let before = Viewport::new(state.center, state.zoom, rect()).to_geo(anchor);
        state.zoom_around(&Viewport::new(state.center, state.zoom, rect()), anchor, 1.0);
        assert_relative_eq!(state.zoom, 4.0);
        let after = Viewport::new(state.center, state.zoom, rect()).to_geo(anchor);
        assert_relative_eq!(after.latitude(), before.latitude(), epsilon = 1e-3);
        assert_relative_eq!(after.longitude(), before.longitude(), epsilon = 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut state = MapState::default();
        let viewport = Viewport::new(state.center, state.zoom, rect());
        state.zoom_around(&viewport, viewport.rect.center(), 100.0);
        assert_eq!(state.zoom, MAX_ZOOM);
        let viewport = Viewport::new(state.center, state.zoom, rect());
        state.zoom_around(&viewport, viewport.rect.center(), -100.0);
        assert_eq!(state.zoom, MIN_ZOOM);
    }
}
