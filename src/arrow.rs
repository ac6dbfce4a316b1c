use crate::edge::{Endpoint, calculate_line_endpoints};
use crate::entity::Entity;
use crate::model::EntityId;
use crate::waypoint::InteractiveWaypoint;
use eframe::egui;

pub const DEFAULT_HEAD_SIZE: f32 = 8.0;
const WING_ANGLE: f32 = std::f32::consts::PI / 6.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineSegment {
    pub start: egui::Pos2,
    pub end: egui::Pos2,
    pub visible: bool,
}

impl LineSegment {
    pub fn midpoint(&self) -> egui::Pos2 {
        crate::geometry::midpoint(self.start, self.end)
    }

    pub fn distance_to(&self, p: egui::Pos2) -> f32 {
        crate::geometry::distance_to_segment(p, self.start, self.end)
    }
}

/// Triangle at the end of the last segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrowhead {
    pub tip: egui::Pos2,
    pub left: egui::Pos2,
    pub right: egui::Pos2,
}

impl Arrowhead {
    pub fn from_segment(from: egui::Pos2, tip: egui::Pos2, head_size: f32) -> Self {
        let angle = (tip.y - from.y).atan2(tip.x - from.x);
        let back = angle + std::f32::consts::PI;
        let wing = |a: f32| tip + egui::vec2(a.cos(), a.sin()) * head_size;
        Self {
            tip,
            left: wing(back - WING_ANGLE),
            right: wing(back + WING_ANGLE),
        }
    }

    pub fn points(&self) -> [egui::Pos2; 3] {
        [self.tip, self.left, self.right]
    }
}

/// Directed polyline from one entity to another through user-editable
/// waypoints. Holds one [`LineSegment`] per path edge; the arrowhead is kept
/// apart from the segment list.
#[derive(Clone, Debug)]
pub struct MultiSegmentArrow {
    pub src: EntityId,
    pub dst: EntityId,
    pub src_status_key: Option<String>,
    pub dst_status_key: Option<String>,
    waypoints: Vec<InteractiveWaypoint>,
    segments: Vec<LineSegment>,
    arrowhead: Option<Arrowhead>,
    head_size: f32,
}

impl MultiSegmentArrow {
    pub fn new(src: EntityId, dst: EntityId, waypoints: Vec<InteractiveWaypoint>) -> Self {
        let mut arrow = Self {
            src,
            dst,
            src_status_key: None,
            dst_status_key: None,
            waypoints,
            segments: Vec::new(),
            arrowhead: None,
            head_size: DEFAULT_HEAD_SIZE,
        };
        arrow.rebuild_segments();
        arrow
    }

    pub fn with_status_keys(mut self, src: Option<String>, dst: Option<String>) -> Self {
        self.src_status_key = src;
        self.dst_status_key = dst;
        self
    }

    pub fn with_head_size(mut self, head_size: f32) -> Self {
        self.set_head_size(head_size);
        self
    }

    pub fn set_head_size(&mut self, head_size: f32) {
        self.head_size = head_size.max(0.0);
    }

    pub fn head_size(&self) -> f32 {
        self.head_size
    }

    pub fn waypoints(&self) -> &[InteractiveWaypoint] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn arrowhead(&self) -> Option<&Arrowhead> {
        self.arrowhead.as_ref()
    }

    pub fn waypoint(&self, node_id: &str) -> Option<&InteractiveWaypoint> {
        self.waypoints.iter().find(|w| w.node_id == node_id)
    }

    pub fn waypoint_index(&self, node_id: &str) -> Option<usize> {
        self.waypoints.iter().position(|w| w.node_id == node_id)
    }

    /// Full path: source edge, every waypoint in order, destination edge.
    /// The edge points aim at the nearest waypoint, or at the opposite
    /// entity when there are none.
    pub fn path_points(&self, src: &Entity, dst: &Entity) -> Vec<egui::Pos2> {
        let src_end = Endpoint::new(src, self.src_status_key.as_deref());
        let dst_end = Endpoint::new(dst, self.dst_status_key.as_deref());

        let (Some(first), Some(last)) = (self.waypoints.first(), self.waypoints.last()) else {
            let (start, end) = calculate_line_endpoints(src_end, dst_end);
            return vec![start, end];
        };

        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(src_end.edge_point_toward(first.position()));
        points.extend(self.waypoints.iter().map(|w| w.position()));
        points.push(dst_end.edge_point_toward(last.position()));
        points
    }

    /// Recomputes every segment and the arrowhead from the live entities.
    pub fn update_geometry(&mut self, src: &Entity, dst: &Entity) {
        let points = self.path_points(src, dst);
        if self.segments.len() != points.len() - 1 {
            self.rebuild_segments();
        }
        for (i, segment) in self.segments.iter_mut().enumerate() {
            match (points.get(i), points.get(i + 1)) {
                (Some(&start), Some(&end)) => {
                    *segment = LineSegment {
                        start,
                        end,
                        visible: true,
                    };
                }
                _ => segment.visible = false,
            }
        }
        self.arrowhead = match points.as_slice() {
            [.., from, tip] => Some(Arrowhead::from_segment(*from, *tip, self.head_size)),
            _ => None,
        };
    }

    /// Inserts before waypoint `segment_index` (clamped), splitting that
    /// segment. Returns the index the waypoint landed at.
    pub fn add_waypoint_at_index(
        &mut self,
        waypoint: InteractiveWaypoint,
        segment_index: usize,
    ) -> usize {
        let index = segment_index.min(self.waypoints.len());
        self.waypoints.insert(index, waypoint);
        self.rebuild_segments();
        index
    }

    pub fn remove_waypoint(&mut self, node_id: &str) -> Option<InteractiveWaypoint> {
        let index = self.waypoint_index(node_id)?;
        let removed = self.waypoints.remove(index);
        self.rebuild_segments();
        Some(removed)
    }

    pub fn clear_waypoints(&mut self) -> Vec<InteractiveWaypoint> {
        let removed = std::mem::take(&mut self.waypoints);
        self.rebuild_segments();
        removed
    }

    /// Moves one waypoint. Invalid coordinates are rejected by the waypoint.
    pub fn move_waypoint(&mut self, node_id: &str, position: egui::Pos2) -> bool {
        match self.waypoints.iter_mut().find(|w| w.node_id == node_id) {
            Some(waypoint) => waypoint.move_to(position),
            None => false,
        }
    }

    /// Resizes the segment list to `waypoints + 1`, reusing existing
    /// segment objects.
    pub fn rebuild_segments(&mut self) {
        let wanted = self.waypoints.len() + 1;
        self.segments.truncate(wanted);
        self.segments.resize(wanted, LineSegment::default());
    }

    /// Path as of the last [`Self::update_geometry`], read back from the
    /// segments. Empty before the first update.
    pub fn current_path(&self) -> Vec<egui::Pos2> {
        let visible: Vec<&LineSegment> = self.segments.iter().filter(|s| s.visible).collect();
        let Some(last) = visible.last() else {
            return Vec::new();
        };
        let mut points: Vec<egui::Pos2> = visible.iter().map(|s| s.start).collect();
        points.push(last.end);
        points
    }

    pub fn waypoint_positions(&self) -> Vec<egui::Pos2> {
        self.waypoints.iter().map(|w| w.position()).collect()
    }

    /// Index of the visible segment closest to `p` within `threshold`.
    pub fn segment_near(&self, p: egui::Pos2, threshold: f32) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visible)
            .map(|(i, s)| (i, s.distance_to(p)))
            .filter(|(_, d)| *d <= threshold)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, EntityRecord, Rect};

    fn entity(kind: EntityKind, rect: Rect) -> Entity {
        Entity::from_record(&EntityRecord {
            key: format!("{kind:?}"),
            kind,
            rect,
            title: String::new(),
            status_titles: Vec::new(),
            status_keys: Vec::new(),
            style: None,
        })
    }

    fn pair() -> (Entity, Entity) {
        (
            entity(EntityKind::Status, Rect::new(100.0, 100.0, 50.0, 50.0)),
            entity(EntityKind::Workflow, Rect::new(300.0, 100.0, 80.0, 60.0)),
        )
    }

    #[test]
    fn segment_count_tracks_waypoints() {
        let (s, d) = pair();
        let mut arrow = MultiSegmentArrow::new(EntityId(0), EntityId(1), Vec::new());
        assert_eq!(arrow.segments().len(), 1);
        let mut ids = Vec::new();
        for i in 0..4 {
            let wp = InteractiveWaypoint::user_created(egui::pos2(200.0 + i as f32 * 10.0, 300.0));
            ids.push(wp.node_id.clone());
            arrow.add_waypoint_at_index(wp, usize::MAX);
            assert_eq!(arrow.segments().len(), arrow.waypoints().len() + 1);
            arrow.update_geometry(&s, &d);
            assert_eq!(arrow.path_points(&s, &d).len(), arrow.waypoints().len() + 2);
        }
        for id in &ids {
            assert!(arrow.remove_waypoint(id).is_some());
            assert_eq!(arrow.segments().len(), arrow.waypoints().len() + 1);
        }
        assert!(arrow.remove_waypoint("gone").is_none());
        assert_eq!(arrow.segments().len(), 1);
    }

    #[test]
    fn insertion_index_is_clamped() {
        let mut arrow = MultiSegmentArrow::new(
            EntityId(0),
            EntityId(1),
            vec![InteractiveWaypoint::structural(egui::pos2(1.0, 1.0))],
        );
        let at_front = arrow.add_waypoint_at_index(
            InteractiveWaypoint::user_created(egui::pos2(0.0, 0.0)),
            0,
        );
        let at_back = arrow.add_waypoint_at_index(
            InteractiveWaypoint::user_created(egui::pos2(2.0, 2.0)),
            99,
        );
        assert_eq!((at_front, at_back), (0, 2));
        assert_eq!(
            arrow.waypoint_positions(),
            vec![egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0), egui::pos2(2.0, 2.0)]
        );
    }

    #[test]
    fn direct_path_has_two_points() {
        let (s, d) = pair();
        let arrow = MultiSegmentArrow::new(EntityId(0), EntityId(1), Vec::new());
        let path = arrow.path_points(&s, &d);
        assert_eq!(path.len(), 2);
        assert!((path[0].x - 150.0).abs() < 0.1);
        assert!((path[1].x - 300.0).abs() < 1e-3);
    }

    #[test]
    fn edge_points_aim_at_nearest_waypoint() {
        let (s, d) = pair();
        // Waypoint straight above the status center.
        let arrow = MultiSegmentArrow::new(
            EntityId(0),
            EntityId(1),
            vec![InteractiveWaypoint::structural(egui::pos2(125.0, 0.0))],
        );
        let path = arrow.path_points(&s, &d);
        assert!((path[0].x - 125.0).abs() < 1e-3 && (path[0].y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn arrowhead_follows_last_segment() {
        let (s, d) = pair();
        let mut arrow = MultiSegmentArrow::new(EntityId(0), EntityId(1), Vec::new());
        arrow.update_geometry(&s, &d);
        let head = arrow.arrowhead().copied().unwrap();
        let last = *arrow.segments().last().unwrap();
        assert_eq!(head.tip, last.end);
        // Pointing right: both wings sit behind the tip, mirrored around it.
        assert!(head.left.x < head.tip.x && head.right.x < head.tip.x);
        assert!((head.tip.distance(head.left) - DEFAULT_HEAD_SIZE).abs() < 1e-3);
        assert!(((head.left.y + head.right.y) * 0.5 - head.tip.y).abs() < 0.5);
    }

    #[test]
    fn rejected_waypoint_move_keeps_position() {
        let wp = InteractiveWaypoint::structural(egui::pos2(10.0, 10.0));
        let id = wp.node_id.clone();
        let mut arrow = MultiSegmentArrow::new(EntityId(0), EntityId(1), vec![wp]);
        assert!(!arrow.move_waypoint(&id, egui::pos2(f32::NAN, 5.0)));
        assert!(arrow.move_waypoint(&id, egui::pos2(20.0, 5.0)));
        assert_eq!(arrow.waypoint_positions(), vec![egui::pos2(20.0, 5.0)]);
    }
}
