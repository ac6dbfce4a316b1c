//! Draggable handles on a selected link and the waypoint split/merge rules.
//!
//! Each link owns one [`LineNodeManager`]. It shows a round node on every
//! waypoint and a small square node in the middle of every segment.
//! Dragging a waypoint node moves the waypoint; dragging a midpoint node
//! splits its segment by inserting a user-created waypoint, after which the
//! drag continues on the new waypoint. Releasing a waypoint drag runs
//! [`check_for_merges`].

use crate::arrow::MultiSegmentArrow;
use crate::entity::Entity;
use crate::geometry::{angle_between_deg, distance_to_line, distance_to_segment, midpoint};
use crate::model::Rgba;
use crate::waypoint::InteractiveWaypoint;
use eframe::egui;
use serde::{Deserialize, Serialize};

pub const WAYPOINT_NODE_SIZE: f32 = 12.0;
pub const MIDPOINT_NODE_SIZE: f32 = 8.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeSettings {
    pub angle_threshold_deg: f32,
    pub distance_threshold: f32,
    pub global_distance_threshold: f32,
    pub match_tolerance: f32,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            angle_threshold_deg: 5.0,
            distance_threshold: 10.0,
            global_distance_threshold: 15.0,
            match_tolerance: 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
    #[default]
    Idle,
    Hover,
    Dragging,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
    Circle,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeAppearance {
    pub shape: NodeShape,
    pub size: f32,
    pub fill: egui::Color32,
    pub stroke: egui::Color32,
}

fn hex(s: &str) -> egui::Color32 {
    Rgba::from_hex(s)
        .map(Rgba::to_color32)
        .unwrap_or(egui::Color32::GRAY)
}

#[derive(Clone, Debug)]
pub struct WaypointNode {
    pub node_id: String,
    pub position: egui::Pos2,
    pub state: NodeState,
}

impl WaypointNode {
    pub fn appearance(&self, selection_color: egui::Color32) -> NodeAppearance {
        let (stroke, fill) = match self.state {
            NodeState::Idle => (hex("#666666"), hex("#CCCCCC")),
            NodeState::Hover => (hex("#333333"), hex("#FFFFFF")),
            NodeState::Dragging => (hex("#333333"), selection_color),
        };
        NodeAppearance {
            shape: NodeShape::Circle,
            size: WAYPOINT_NODE_SIZE,
            fill,
            stroke,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MidpointNode {
    pub segment_index: usize,
    pub position: egui::Pos2,
    pub state: NodeState,
}

impl MidpointNode {
    pub fn appearance(&self, selection_color: egui::Color32) -> NodeAppearance {
        let (stroke, fill) = match self.state {
            NodeState::Idle => (hex("#888888"), hex("#CCCCCC80")),
            NodeState::Hover => (hex("#444444"), hex("#FFFFFF80")),
            NodeState::Dragging => {
                let [r, g, b, _] = selection_color.to_srgba_unmultiplied();
                (selection_color, egui::Color32::from_rgba_unmultiplied(r, g, b, 128))
            }
        };
        NodeAppearance {
            shape: NodeShape::Square,
            size: MIDPOINT_NODE_SIZE,
            fill,
            stroke,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeHandle {
    Waypoint(usize),
    Midpoint(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragOutcome {
    /// A waypoint moved and the geometry was recomputed.
    Moved,
    /// A midpoint drag inserted a new waypoint.
    Split { node_id: String },
    /// The move was refused (invalid coordinates).
    Rejected,
    /// No drag in progress.
    Ignored,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeOutcome {
    pub removed: Vec<InteractiveWaypoint>,
    /// True when the whole path was straight and every waypoint went.
    pub collapsed: bool,
}

impl MergeOutcome {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct LineNodeManager {
    visible: bool,
    waypoint_nodes: Vec<WaypointNode>,
    midpoint_nodes: Vec<MidpointNode>,
    active: Option<NodeHandle>,
    is_dragging: bool,
    selection_color: egui::Color32,
    merge: MergeSettings,
}

impl LineNodeManager {
    pub fn new(selection_color: egui::Color32, merge: MergeSettings) -> Self {
        Self {
            visible: false,
            waypoint_nodes: Vec::new(),
            midpoint_nodes: Vec::new(),
            active: None,
            is_dragging: false,
            selection_color,
            merge,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn waypoint_nodes(&self) -> &[WaypointNode] {
        &self.waypoint_nodes
    }

    pub fn midpoint_nodes(&self) -> &[MidpointNode] {
        &self.midpoint_nodes
    }

    pub fn selection_color(&self) -> egui::Color32 {
        self.selection_color
    }

    pub fn set_selection_color(&mut self, color: egui::Color32) {
        self.selection_color = color;
    }

    pub fn merge_settings(&self) -> MergeSettings {
        self.merge
    }

    pub fn set_merge_settings(&mut self, merge: MergeSettings) {
        self.merge = merge;
    }

    /// Rebuilds every node from the arrow's current geometry.
    pub fn create_nodes(&mut self, arrow: &MultiSegmentArrow) {
        self.waypoint_nodes = arrow
            .waypoints()
            .iter()
            .map(|w| WaypointNode {
                node_id: w.node_id.clone(),
                position: w.position(),
                state: NodeState::Idle,
            })
            .collect();
        let path = arrow.current_path();
        self.midpoint_nodes = path
            .windows(2)
            .enumerate()
            .map(|(segment_index, pair)| MidpointNode {
                segment_index,
                position: midpoint(pair[0], pair[1]),
                state: NodeState::Idle,
            })
            .collect();
    }

    pub fn show_nodes(&mut self, arrow: &MultiSegmentArrow) {
        self.create_nodes(arrow);
        self.visible = true;
    }

    pub fn hide_nodes(&mut self) {
        self.visible = false;
        self.cancel_drag();
    }

    pub fn clear_nodes(&mut self) {
        self.waypoint_nodes.clear();
        self.midpoint_nodes.clear();
        self.visible = false;
        self.active = None;
        self.is_dragging = false;
    }

    /// Syncs node positions after the arrow geometry changed.
    pub fn update_positions(&mut self, arrow: &MultiSegmentArrow) {
        if !self.visible {
            return;
        }
        let path = arrow.current_path();
        if self.waypoint_nodes.len() != arrow.waypoints().len()
            || self.midpoint_nodes.len() != path.len().saturating_sub(1)
        {
            let active = self.active;
            self.create_nodes(arrow);
            self.restore_active(active);
            return;
        }
        for (node, waypoint) in self.waypoint_nodes.iter_mut().zip(arrow.waypoints()) {
            node.position = waypoint.position();
        }
        self.update_midpoint_positions(&path);
    }

    fn update_midpoint_positions(&mut self, path: &[egui::Pos2]) {
        for node in &mut self.midpoint_nodes {
            if let (Some(&a), Some(&b)) = (path.get(node.segment_index), path.get(node.segment_index + 1)) {
                node.position = midpoint(a, b);
            }
        }
    }

    fn restore_active(&mut self, active: Option<NodeHandle>) {
        if let Some(NodeHandle::Waypoint(i)) = active
            && let Some(node) = self.waypoint_nodes.get_mut(i)
        {
            node.state = NodeState::Dragging;
        }
    }

    /// Topmost node under `p`. Waypoint nodes win over midpoint nodes.
    pub fn node_at(&self, p: egui::Pos2, hit_radius: f32) -> Option<NodeHandle> {
        if !self.visible {
            return None;
        }
        let nearest = |positions: &mut dyn Iterator<Item = (usize, egui::Pos2)>, radius: f32| {
            positions
                .map(|(i, pos)| (i, pos.distance(p)))
                .filter(|(_, d)| *d <= radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
        };
        let waypoint_radius = hit_radius.max(WAYPOINT_NODE_SIZE * 0.5);
        if let Some(i) = nearest(
            &mut self.waypoint_nodes.iter().map(|n| n.position).enumerate(),
            waypoint_radius,
        ) {
            return Some(NodeHandle::Waypoint(i));
        }
        let midpoint_radius = hit_radius.max(MIDPOINT_NODE_SIZE * 0.5);
        nearest(
            &mut self.midpoint_nodes.iter().map(|n| n.position).enumerate(),
            midpoint_radius,
        )
        .map(NodeHandle::Midpoint)
    }

    pub fn set_hover(&mut self, hovered: Option<NodeHandle>) {
        for (i, node) in self.waypoint_nodes.iter_mut().enumerate() {
            if node.state != NodeState::Dragging {
                node.state = if hovered == Some(NodeHandle::Waypoint(i)) {
                    NodeState::Hover
                } else {
                    NodeState::Idle
                };
            }
        }
        for (i, node) in self.midpoint_nodes.iter_mut().enumerate() {
            if node.state != NodeState::Dragging {
                node.state = if hovered == Some(NodeHandle::Midpoint(i)) {
                    NodeState::Hover
                } else {
                    NodeState::Idle
                };
            }
        }
    }

    /// Starts a drag on `handle`. A drag that never saw its release is
    /// dropped first.
    pub fn on_press(&mut self, handle: NodeHandle) -> bool {
        if !self.visible {
            tracing::debug!(?handle, "press on hidden node layer ignored");
            return false;
        }
        self.cancel_drag();
        let state = match handle {
            NodeHandle::Waypoint(i) => self.waypoint_nodes.get_mut(i).map(|n| &mut n.state),
            NodeHandle::Midpoint(i) => self.midpoint_nodes.get_mut(i).map(|n| &mut n.state),
        };
        let Some(state) = state else {
            tracing::warn!(?handle, "press on a node that no longer exists");
            return false;
        };
        *state = NodeState::Dragging;
        self.active = Some(handle);
        self.is_dragging = true;
        true
    }

    /// Applies one pointer move of the current drag. Geometry is recomputed
    /// before returning.
    pub fn on_drag(
        &mut self,
        arrow: &mut MultiSegmentArrow,
        src: &Entity,
        dst: &Entity,
        position: egui::Pos2,
    ) -> DragOutcome {
        if !self.is_dragging {
            return DragOutcome::Ignored;
        }
        match self.active {
            Some(NodeHandle::Waypoint(i)) => {
                let Some(node_id) = self.waypoint_nodes.get(i).map(|n| n.node_id.clone()) else {
                    tracing::warn!(index = i, "dragged waypoint node vanished");
                    self.cancel_drag();
                    return DragOutcome::Ignored;
                };
                if !arrow.move_waypoint(&node_id, position) {
                    return DragOutcome::Rejected;
                }
                arrow.update_geometry(src, dst);
                self.update_positions(arrow);
                DragOutcome::Moved
            }
            Some(NodeHandle::Midpoint(i)) => {
                let Some(segment_index) = self.midpoint_nodes.get(i).map(|n| n.segment_index) else {
                    self.cancel_drag();
                    return DragOutcome::Ignored;
                };
                // A successful split moves the drag onto the new waypoint, so
                // a rejected first move leaves the midpoint armed.
                match self.split_segment_at_midpoint(arrow, src, dst, segment_index, position) {
                    Some(node_id) => DragOutcome::Split { node_id },
                    None => DragOutcome::Rejected,
                }
            }
            None => DragOutcome::Ignored,
        }
    }

    /// Inserts a user-created waypoint at `position` into segment
    /// `segment_index` and rebuilds the nodes. If a drag is running it
    /// continues on the new waypoint.
    pub fn split_segment_at_midpoint(
        &mut self,
        arrow: &mut MultiSegmentArrow,
        src: &Entity,
        dst: &Entity,
        segment_index: usize,
        position: egui::Pos2,
    ) -> Option<String> {
        let mut waypoint = InteractiveWaypoint::user_created(egui::Pos2::ZERO);
        if !waypoint.move_to(position) {
            return None;
        }
        let node_id = waypoint.node_id.clone();
        let index = arrow.add_waypoint_at_index(waypoint, segment_index);
        arrow.update_geometry(src, dst);
        self.create_nodes(arrow);
        if self.is_dragging {
            self.active = Some(NodeHandle::Waypoint(index));
            self.restore_active(self.active);
        }
        tracing::debug!(%node_id, segment_index, "split segment");
        Some(node_id)
    }

    /// Ends the current drag. Waypoint drags run the merge pass; a midpoint
    /// that never moved just returns to idle. Safe to call without a
    /// matching press.
    pub fn on_release(
        &mut self,
        arrow: &mut MultiSegmentArrow,
        src: &Entity,
        dst: &Entity,
    ) -> Option<MergeOutcome> {
        let active = self.active.take();
        let was_dragging = std::mem::replace(&mut self.is_dragging, false);
        self.reset_states();
        match active {
            Some(NodeHandle::Waypoint(_)) if was_dragging => {
                let outcome = self.check_for_merges(arrow, src, dst);
                Some(outcome)
            }
            _ => None,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.active = None;
        self.is_dragging = false;
        self.reset_states();
    }

    fn reset_states(&mut self) {
        for node in &mut self.waypoint_nodes {
            node.state = NodeState::Idle;
        }
        for node in &mut self.midpoint_nodes {
            node.state = NodeState::Idle;
        }
    }

    /// Runs [`check_for_merges`] with this layer's thresholds and rebuilds
    /// the nodes when anything was removed.
    pub fn check_for_merges(
        &mut self,
        arrow: &mut MultiSegmentArrow,
        src: &Entity,
        dst: &Entity,
    ) -> MergeOutcome {
        let outcome = check_for_merges(arrow, src, dst, &self.merge);
        arrow.update_geometry(src, dst);
        if !outcome.is_empty() {
            self.create_nodes(arrow);
        }
        outcome
    }
}

/// True when the turn at `p2` is below the angle threshold. Zero-length
/// legs count as straight.
pub fn is_angle_straight(p1: egui::Pos2, p2: egui::Pos2, p3: egui::Pos2, threshold_deg: f32) -> bool {
    match angle_between_deg(p2 - p1, p3 - p2) {
        Some(angle) => angle < threshold_deg,
        None => true,
    }
}

pub fn is_distance_straight(p1: egui::Pos2, p2: egui::Pos2, p3: egui::Pos2, threshold: f32) -> bool {
    distance_to_segment(p2, p1, p3) < threshold
}

pub fn should_merge_points(
    p1: egui::Pos2,
    p2: egui::Pos2,
    p3: egui::Pos2,
    settings: &MergeSettings,
) -> bool {
    is_angle_straight(p1, p2, p3, settings.angle_threshold_deg)
        || is_distance_straight(p1, p2, p3, settings.distance_threshold)
}

/// True when every interior point lies within `threshold` of the infinite
/// line through the first and last points.
pub fn is_globally_straight(path: &[egui::Pos2], threshold: f32) -> bool {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return false;
    };
    path.len() > 2
        && path[1..path.len() - 1]
            .iter()
            .all(|&p| distance_to_line(p, first, last) < threshold)
}

/// Waypoint closest to `point` within `tolerance`, skipping ids in
/// `exclude`.
pub fn nearest_waypoint<'a>(
    waypoints: &'a [InteractiveWaypoint],
    point: egui::Pos2,
    tolerance: f32,
    exclude: &[String],
) -> Option<&'a InteractiveWaypoint> {
    waypoints
        .iter()
        .filter(|w| !exclude.contains(&w.node_id))
        .map(|w| (w, w.distance_to(point)))
        .filter(|(_, d)| *d < tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(w, _)| w)
}

/// Removes waypoints that no longer bend the path.
///
/// A globally straight path loses every waypoint, structural ones
/// included. Otherwise each interior point that passes
/// [`should_merge_points`] marks the waypoint nearest to it (within
/// `match_tolerance`); marks are collected first and removed afterwards.
pub fn check_for_merges(
    arrow: &mut MultiSegmentArrow,
    src: &Entity,
    dst: &Entity,
    settings: &MergeSettings,
) -> MergeOutcome {
    if arrow.waypoints().is_empty() {
        return MergeOutcome::default();
    }
    let path = arrow.path_points(src, dst);

    if is_globally_straight(&path, settings.global_distance_threshold) {
        let removed = arrow.clear_waypoints();
        tracing::info!(count = removed.len(), "path is straight, removed all waypoints");
        return MergeOutcome {
            removed,
            collapsed: true,
        };
    }

    let mut marked: Vec<String> = Vec::new();
    for window in path.windows(3) {
        let (prev, current, next) = (window[0], window[1], window[2]);
        if !should_merge_points(prev, current, next, settings) {
            continue;
        }
        if let Some(waypoint) =
            nearest_waypoint(arrow.waypoints(), current, settings.match_tolerance, &marked)
        {
            marked.push(waypoint.node_id.clone());
        }
    }

    let removed: Vec<InteractiveWaypoint> = marked
        .iter()
        .filter_map(|id| arrow.remove_waypoint(id))
        .collect();
    if !removed.is_empty() {
        tracing::info!(count = removed.len(), "merged straight waypoints");
    }
    MergeOutcome {
        removed,
        collapsed: false,
    }
}
