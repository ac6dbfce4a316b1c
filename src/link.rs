use crate::arrow::MultiSegmentArrow;
use crate::model::{LinkId, LinkRecord, Point};
use crate::nodes::LineNodeManager;
use crate::selection::{HasInteractiveNodes, Selectable};
use eframe::egui;

/// A link as it lives in the scene: the arrow plus its handle layer.
#[derive(Clone, Debug)]
pub struct LineGroup {
    pub id: LinkId,
    pub arrow: MultiSegmentArrow,
    pub nodes: LineNodeManager,
    selected: bool,
    selection_color: Option<egui::Color32>,
}

impl LineGroup {
    pub fn new(id: LinkId, arrow: MultiSegmentArrow, nodes: LineNodeManager) -> Self {
        Self {
            id,
            arrow,
            nodes,
            selected: false,
            selection_color: None,
        }
    }

    pub fn selection_color(&self) -> Option<egui::Color32> {
        self.selection_color
    }

    /// Record for the persistence layer with the current waypoints.
    pub fn to_record(&self, source_key: &str, dest_key: &str) -> LinkRecord {
        LinkRecord {
            source_key: source_key.to_owned(),
            dest_key: dest_key.to_owned(),
            waypoints: self
                .arrow
                .waypoints()
                .iter()
                .map(|w| Point::from_pos2(w.position()))
                .collect(),
            source_status_key: self.arrow.src_status_key.clone(),
            dest_status_key: self.arrow.dst_status_key.clone(),
        }
    }
}

impl Selectable for LineGroup {
    fn set_selected(&mut self, selected: bool, color: egui::Color32) {
        self.selected = selected;
        self.selection_color = selected.then_some(color);
        self.nodes.set_selection_color(color);
    }

    fn is_selected(&self) -> bool {
        self.selected
    }
}

impl HasInteractiveNodes for LineGroup {
    fn show_nodes(&mut self) {
        self.nodes.show_nodes(&self.arrow);
    }

    fn hide_nodes(&mut self) {
        self.nodes.hide_nodes();
    }

    fn nodes_visible(&self) -> bool {
        self.nodes.is_visible()
    }
}
