//! Where a link terminates on the border of an entity.

use crate::entity::Entity;
use crate::geometry::{circle_edge_intersection, rectangle_edge_intersection};
use crate::shape::ShapeKind;
use eframe::egui;

/// One end of a link: an entity, optionally narrowed to a status row of a
/// workflow.
#[derive(Clone, Copy, Debug)]
pub struct Endpoint<'a> {
    pub entity: &'a Entity,
    pub status_key: Option<&'a str>,
}

impl<'a> Endpoint<'a> {
    pub fn new(entity: &'a Entity, status_key: Option<&'a str>) -> Self {
        Self { entity, status_key }
    }

    /// Logical center the opposite end aims at.
    pub fn anchor(&self) -> egui::Pos2 {
        let bounds = self.entity.shape.current_bounds();
        match self.status_row_y(bounds) {
            Some(y) => egui::pos2(bounds.center().x, y),
            None => self.entity.shape.current_center(),
        }
    }

    pub fn edge_point_toward(&self, target: egui::Pos2) -> egui::Pos2 {
        let bounds = self.entity.shape.current_bounds();
        match self.status_row_y(bounds) {
            Some(y) => egui::pos2(bounds.left(), y),
            None => calculate_entity_edge_point(self.entity, target),
        }
    }

    fn status_row_y(&self, bounds: egui::Rect) -> Option<f32> {
        let key = self.status_key?;
        if !self.entity.is_workflow() {
            return None;
        }
        match self.entity.status_line(key) {
            Some(line) => Some(bounds.top() + line.local_mid_y()),
            None => {
                tracing::warn!(
                    entity = %self.entity.key,
                    status_key = key,
                    "status key not found in workflow, attaching to center"
                );
                None
            }
        }
    }
}

/// Border point of `entity` on the line from its current center toward
/// `target`. Ellipses keep the radii they were created with.
pub fn calculate_entity_edge_point(entity: &Entity, target: egui::Pos2) -> egui::Pos2 {
    let shape = &entity.shape;
    let center = shape.current_center();
    match shape.kind() {
        ShapeKind::Ellipse => {
            let rect = shape.rect();
            circle_edge_intersection(
                center.x,
                center.y,
                rect.rx(),
                rect.ry(),
                center.x,
                center.y,
                target.x,
                target.y,
            )
        }
        ShapeKind::Rectangle => {
            let bounds = shape.current_bounds();
            rectangle_edge_intersection(
                bounds.left(),
                bounds.top(),
                bounds.width(),
                bounds.height(),
                center.x,
                center.y,
                target.x,
                target.y,
            )
        }
    }
}

/// Start and end points of a direct link. Each side is resolved against
/// the other side's anchor independently.
pub fn calculate_line_endpoints(src: Endpoint<'_>, dst: Endpoint<'_>) -> (egui::Pos2, egui::Pos2) {
    let start = src.edge_point_toward(dst.anchor());
    let end = dst.edge_point_toward(src.anchor());
    (start, end)
}
