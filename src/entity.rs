use crate::model::{EntityKind, EntityRecord, LinkId, Rect, Style};
use crate::selection::StrokeFallback;
use crate::shape::{Shape, ShapeKind};
use eframe::egui;
use std::collections::BTreeSet;

pub const STATUS_DEFAULT_SIZE: egui::Vec2 = egui::vec2(53.0, 53.0);
pub const WORKFLOW_DEFAULT_SIZE: egui::Vec2 = egui::vec2(127.0, 174.0);

pub const TITLE_HEIGHT: f32 = 18.0;
pub const ROW_HEIGHT: f32 = 16.0;
pub const TITLE_X_PAD: f32 = 1.0;
pub const TITLE_Y_PAD: f32 = 2.0;
pub const ITEM_X_PAD: f32 = 2.0;
pub const ITEM_Y_PAD: f32 = 2.0;

pub fn new_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One status row inside a workflow box. Positions are local to the
/// workflow's top-left corner so they follow the workflow when it moves.
#[derive(Clone, Debug)]
pub struct WorkflowStatusLine {
    pub status_key: String,
    pub title: String,
    local_y: f32,
    height: f32,
    pen: egui::Stroke,
}

impl WorkflowStatusLine {
    fn new(status_key: String, title: String, row: usize) -> Self {
        let local_y =
            TITLE_HEIGHT + TITLE_Y_PAD * 2.0 + row as f32 * (ROW_HEIGHT + ITEM_Y_PAD);
        Self {
            status_key,
            title,
            local_y,
            height: ROW_HEIGHT,
            pen: egui::Stroke::NONE,
        }
    }

    pub fn local_y(&self) -> f32 {
        self.local_y
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn local_mid_y(&self) -> f32 {
        self.local_y + self.height * 0.5
    }

    pub fn bounds_in(&self, workflow: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            egui::pos2(workflow.left() + ITEM_X_PAD, workflow.top() + self.local_y),
            egui::vec2((workflow.width() - ITEM_X_PAD * 2.0).max(0.0), self.height),
        )
    }

    pub fn pen(&self) -> egui::Stroke {
        self.pen
    }
}

impl StrokeFallback for WorkflowStatusLine {
    fn stroke(&self) -> egui::Stroke {
        self.pen
    }

    fn set_stroke(&mut self, stroke: egui::Stroke) {
        self.pen = stroke;
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub key: String,
    pub title: String,
    kind: EntityKind,
    pub shape: Shape,
    pub style: Style,
    pub status_lines: Vec<WorkflowStatusLine>,
    pub source_lines: BTreeSet<LinkId>,
    pub dest_lines: BTreeSet<LinkId>,
}

impl Entity {
    pub fn from_record(record: &EntityRecord) -> Self {
        let shape_kind = match record.kind {
            EntityKind::Status => ShapeKind::Ellipse,
            EntityKind::Workflow => ShapeKind::Rectangle,
        };
        let style = record.style.unwrap_or(match record.kind {
            EntityKind::Status => Style::default_for_status(),
            EntityKind::Workflow => Style::default_for_workflow(),
        });
        let status_lines = match record.kind {
            EntityKind::Status => Vec::new(),
            EntityKind::Workflow => record
                .status_titles
                .iter()
                .enumerate()
                .map(|(row, title)| {
                    let key = record.status_keys.get(row).cloned().unwrap_or_else(new_key);
                    WorkflowStatusLine::new(key, title.clone(), row)
                })
                .collect(),
        };
        Self {
            key: record.key.clone(),
            title: record.title.clone(),
            kind: record.kind,
            shape: Shape::new(shape_kind, record.rect),
            style,
            status_lines,
            source_lines: BTreeSet::new(),
            dest_lines: BTreeSet::new(),
        }
    }

    pub fn new_status(position: egui::Pos2, title: &str) -> Self {
        Self::from_record(&EntityRecord {
            key: new_key(),
            kind: EntityKind::Status,
            rect: Rect::new(
                position.x,
                position.y,
                STATUS_DEFAULT_SIZE.x,
                STATUS_DEFAULT_SIZE.y,
            ),
            title: title.to_owned(),
            status_titles: Vec::new(),
            status_keys: Vec::new(),
            style: None,
        })
    }

    pub fn new_workflow(position: egui::Pos2, title: &str, statuses: &[String]) -> Self {
        Self::from_record(&EntityRecord {
            key: new_key(),
            kind: EntityKind::Workflow,
            rect: Rect::new(
                position.x,
                position.y,
                WORKFLOW_DEFAULT_SIZE.x,
                WORKFLOW_DEFAULT_SIZE.y,
            ),
            title: title.to_owned(),
            status_titles: statuses.to_vec(),
            status_keys: Vec::new(),
            style: None,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_workflow(&self) -> bool {
        self.kind == EntityKind::Workflow
    }

    pub fn status_line_index(&self, status_key: &str) -> Option<usize> {
        self.status_lines
            .iter()
            .position(|line| line.status_key == status_key)
    }

    pub fn status_line(&self, status_key: &str) -> Option<&WorkflowStatusLine> {
        self.status_lines
            .iter()
            .find(|line| line.status_key == status_key)
    }

    pub fn status_line_bounds(&self, row: usize) -> Option<egui::Rect> {
        let line = self.status_lines.get(row)?;
        Some(line.bounds_in(self.shape.current_bounds()))
    }

    pub fn status_line_at(&self, p: egui::Pos2) -> Option<usize> {
        let bounds = self.shape.current_bounds();
        self.status_lines
            .iter()
            .position(|line| line.bounds_in(bounds).contains(p))
    }

    pub fn title_rect(&self) -> egui::Rect {
        let bounds = self.shape.current_bounds();
        egui::Rect::from_min_size(
            bounds.min + egui::vec2(TITLE_X_PAD, TITLE_Y_PAD),
            egui::vec2(bounds.width() - TITLE_X_PAD * 2.0, TITLE_HEIGHT),
        )
    }

    /// Every link touching this entity, as source or destination.
    pub fn connected_lines(&self) -> BTreeSet<LinkId> {
        self.source_lines.union(&self.dest_lines).copied().collect()
    }

    pub fn contains(&self, p: egui::Pos2) -> bool {
        self.shape.contains(p)
    }

    /// Record reflecting the live position.
    pub fn to_record(&self) -> EntityRecord {
        let pos = self.shape.position();
        let size = self.shape.size();
        EntityRecord {
            key: self.key.clone(),
            kind: self.kind,
            rect: Rect::new(pos.x, pos.y, size.x, size.y),
            title: self.title.clone(),
            status_titles: self.status_lines.iter().map(|l| l.title.clone()).collect(),
            status_keys: self
                .status_lines
                .iter()
                .map(|l| l.status_key.clone())
                .collect(),
            style: Some(self.style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow_record() -> EntityRecord {
        EntityRecord {
            key: "wf".into(),
            kind: EntityKind::Workflow,
            rect: Rect::new(200.0, 100.0, 80.0, 120.0),
            title: "Review".into(),
            status_titles: vec!["Draft".into(), "Approved".into()],
            status_keys: vec!["s-draft".into()],
            style: None,
        }
    }

    #[test]
    fn workflow_rows_stack_below_title() {
        let wf = Entity::from_record(&workflow_record());
        assert_eq!(wf.status_lines.len(), 2);
        let first = &wf.status_lines[0];
        let second = &wf.status_lines[1];
        assert_eq!(first.local_y(), TITLE_HEIGHT + TITLE_Y_PAD * 2.0);
        assert_eq!(second.local_y() - first.local_y(), ROW_HEIGHT + ITEM_Y_PAD);
        assert_eq!(first.status_key, "s-draft");
        // Missing keys are generated.
        assert!(!second.status_key.is_empty());
        assert_ne!(second.status_key, first.status_key);
    }

    #[test]
    fn status_rows_follow_the_workflow() {
        let mut wf = Entity::from_record(&workflow_record());
        let before = wf.status_line_bounds(0).unwrap();
        let _ = wf.shape.set_position(egui::pos2(300.0, 150.0));
        let after = wf.status_line_bounds(0).unwrap();
        assert_eq!(after.min - before.min, egui::vec2(100.0, 50.0));
        let row_centre = after.center();
        assert_eq!(wf.status_line_at(row_centre), Some(0));
    }

    #[test]
    fn status_entities_have_no_rows() {
        let status = Entity::new_status(egui::pos2(10.0, 10.0), "Open");
        assert!(status.status_lines.is_empty());
        assert_eq!(status.shape.kind(), ShapeKind::Ellipse);
        assert_eq!(status.shape.size(), STATUS_DEFAULT_SIZE);
        assert_eq!(status.style, Style::default_for_status());
    }

    #[test]
    fn record_reflects_live_position() {
        let mut wf = Entity::new_workflow(egui::pos2(0.0, 0.0), "Flow", &["A".into()]);
        let _ = wf.shape.set_position(egui::pos2(5.0, 6.0));
        let record = wf.to_record();
        assert_eq!(record.rect.left(), 5.0);
        assert_eq!(record.rect.top(), 6.0);
        assert_eq!(record.rect.width(), WORKFLOW_DEFAULT_SIZE.x);
        assert_eq!(record.status_keys.len(), 1);
    }
}
