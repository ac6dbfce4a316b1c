use eframe::egui;
use wfdesigner::Scene;
use wfdesigner::entity::{Entity, ITEM_X_PAD};
use wfdesigner::link::LineGroup;
use wfdesigner::nodes::{NodeAppearance, NodeShape};
use wfdesigner::shape::ShapeKind;

use super::{InProgress, View};

const ELLIPSE_STEPS: usize = 48;

pub(super) fn draw_background(painter: &egui::Painter, rect: egui::Rect, view: &View) {
    let visuals = &painter.ctx().style().visuals;
    painter.rect_filled(rect, 0.0, visuals.extreme_bg_color);
    let grid_color = if visuals.dark_mode {
        egui::Color32::from_gray(60)
    } else {
        egui::Color32::from_gray(220)
    };
    let spacing_screen = 64.0 * view.zoom;
    if spacing_screen < 24.0 {
        return;
    }
    let start = rect.min + view.pan_screen;
    let stroke = egui::Stroke::new(1.0, grid_color);
    let mut x = ((rect.min.x - start.x) / spacing_screen).floor() * spacing_screen + start.x;
    while x < rect.max.x {
        painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
        x += spacing_screen;
    }
    let mut y = ((rect.min.y - start.y) / spacing_screen).floor() * spacing_screen + start.y;
    while y < rect.max.y {
        painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
        y += spacing_screen;
    }
}

/// Links first so entity fills cover the segment ends, then entities, then
/// the handle layers on top.
pub(super) fn draw_scene(painter: &egui::Painter, origin: egui::Pos2, view: &View, scene: &Scene) {
    let link_color = if painter.ctx().style().visuals.dark_mode {
        egui::Color32::from_gray(200)
    } else {
        egui::Color32::from_gray(50)
    };
    for (_, link) in scene.links() {
        draw_link(painter, origin, view, link, link_color);
    }
    for (_, entity) in scene.entities() {
        draw_entity(painter, origin, view, entity);
    }
    for (_, link) in scene.links() {
        draw_link_nodes(painter, origin, view, link);
    }
}

fn ellipse_points(rect: egui::Rect) -> Vec<egui::Pos2> {
    let center = rect.center();
    let rx = rect.width() * 0.5;
    let ry = rect.height() * 0.5;
    if rx <= f32::EPSILON || ry <= f32::EPSILON {
        return vec![];
    }
    (0..ELLIPSE_STEPS)
        .map(|i| {
            let t = (i as f32) / (ELLIPSE_STEPS as f32) * std::f32::consts::TAU;
            center + egui::vec2(t.cos() * rx, t.sin() * ry)
        })
        .collect()
}

fn draw_entity(painter: &egui::Painter, origin: egui::Pos2, view: &View, entity: &Entity) {
    let style = entity.style;
    let rect = view.rect_to_screen(origin, entity.shape.current_bounds());
    let stroke = match entity.shape.selection_color() {
        Some(color) => egui::Stroke::new(2.0_f32.max(style.stroke.width), color),
        None => egui::Stroke::new(style.stroke.width, style.stroke.color.to_color32()),
    };
    let font_id = egui::FontId::proportional(style.text_size * view.zoom);
    let text_color = style.text_color.to_color32();

    match entity.shape.kind() {
        ShapeKind::Ellipse => {
            let points = ellipse_points(rect);
            if points.len() >= 3 {
                painter.add(egui::Shape::convex_polygon(points, style.fill.to_color32(), stroke));
            }
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                &entity.title,
                font_id,
                text_color,
            );
        }
        ShapeKind::Rectangle => {
            painter.rect_filled(rect, 0.0, style.fill.to_color32());
            painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Middle);

            let title = view.rect_to_screen(origin, entity.title_rect());
            painter.text(
                title.center(),
                egui::Align2::CENTER_CENTER,
                &entity.title,
                font_id.clone(),
                text_color,
            );
            painter.line_segment(
                [
                    egui::pos2(rect.left(), title.bottom()),
                    egui::pos2(rect.right(), title.bottom()),
                ],
                egui::Stroke::new(1.0, style.stroke.color.to_color32()),
            );

            let row_font = egui::FontId::proportional(style.text_size * 0.9 * view.zoom);
            for (row, line) in entity.status_lines.iter().enumerate() {
                let Some(bounds) = entity.status_line_bounds(row) else {
                    continue;
                };
                let bounds = view.rect_to_screen(origin, bounds);
                if bounds.bottom() > rect.bottom() {
                    break;
                }
                painter.text(
                    bounds.left_center() + egui::vec2(ITEM_X_PAD * view.zoom, 0.0),
                    egui::Align2::LEFT_CENTER,
                    &line.title,
                    row_font.clone(),
                    text_color,
                );
                let pen = line.pen();
                if pen != egui::Stroke::NONE {
                    painter.rect_stroke(bounds, 0.0, pen, egui::StrokeKind::Inside);
                }
            }
        }
    }
}

fn draw_link(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    link: &LineGroup,
    color: egui::Color32,
) {
    let stroke = match link.selection_color() {
        Some(selected) => egui::Stroke::new(2.0, selected),
        None => egui::Stroke::new(1.5, color),
    };
    for segment in link.arrow.segments().iter().filter(|s| s.visible) {
        painter.line_segment(
            [
                view.world_to_screen(origin, segment.start),
                view.world_to_screen(origin, segment.end),
            ],
            stroke,
        );
    }
    if let Some(head) = link.arrow.arrowhead() {
        let points = head
            .points()
            .iter()
            .map(|p| view.world_to_screen(origin, *p))
            .collect();
        painter.add(egui::Shape::convex_polygon(points, stroke.color, egui::Stroke::NONE));
    }
}

fn draw_link_nodes(painter: &egui::Painter, origin: egui::Pos2, view: &View, link: &LineGroup) {
    if !link.nodes.is_visible() {
        return;
    }
    let color = link.nodes.selection_color();
    for node in link.nodes.midpoint_nodes() {
        draw_node(painter, view.world_to_screen(origin, node.position), node.appearance(color));
    }
    for node in link.nodes.waypoint_nodes() {
        draw_node(painter, view.world_to_screen(origin, node.position), node.appearance(color));
    }
}

fn draw_node(painter: &egui::Painter, center: egui::Pos2, appearance: NodeAppearance) {
    let stroke = egui::Stroke::new(1.0, appearance.stroke);
    match appearance.shape {
        NodeShape::Circle => {
            painter.circle(center, appearance.size * 0.5, appearance.fill, stroke);
        }
        NodeShape::Square => {
            let r = egui::Rect::from_center_size(center, egui::Vec2::splat(appearance.size));
            painter.rect_filled(r, 0.0, appearance.fill);
            painter.rect_stroke(r, 0.0, stroke, egui::StrokeKind::Middle);
        }
    }
}

pub(super) fn draw_in_progress(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    in_progress: Option<&InProgress>,
    selection_color: egui::Color32,
) {
    if let Some(InProgress::SelectBox { start, current }) = in_progress {
        let r = egui::Rect::from_two_pos(
            view.world_to_screen(origin, *start),
            view.world_to_screen(origin, *current),
        );
        let [red, green, blue, _] = selection_color.to_srgba_unmultiplied();
        painter.rect_filled(r, 0.0, egui::Color32::from_rgba_unmultiplied(red, green, blue, 32));
        painter.rect_stroke(
            r,
            0.0,
            egui::Stroke::new(1.0, selection_color),
            egui::StrokeKind::Middle,
        );
    }
}
