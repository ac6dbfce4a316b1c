use eframe::egui;

/// Coordinates beyond this magnitude are treated as corrupt input.
pub const MAX_COORDINATE: f32 = 100_000.0;

/// An intermediate point of a link.
///
/// `is_user_created` is false for waypoints loaded from a layout and true for
/// waypoints produced by splitting a segment. Both kinds can be merged away.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractiveWaypoint {
    position: egui::Pos2,
    pub is_user_created: bool,
    pub node_id: String,
}

impl InteractiveWaypoint {
    pub fn new(position: egui::Pos2, is_user_created: bool) -> Self {
        Self {
            position,
            is_user_created,
            node_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn structural(position: egui::Pos2) -> Self {
        Self::new(position, false)
    }

    pub fn user_created(position: egui::Pos2) -> Self {
        Self::new(position, true)
    }

    pub fn position(&self) -> egui::Pos2 {
        self.position
    }

    /// Replaces the position in place. Pathological coordinates are logged
    /// and ignored; returns whether the move was applied.
    pub fn move_to(&mut self, position: egui::Pos2) -> bool {
        if !is_valid_coordinate(position.x) || !is_valid_coordinate(position.y) {
            tracing::warn!(
                node_id = %self.node_id,
                x = position.x,
                y = position.y,
                "rejected waypoint move to invalid coordinates"
            );
            return false;
        }
        self.position = position;
        true
    }

    pub fn distance_to(&self, point: egui::Pos2) -> f32 {
        self.position.distance(point)
    }
}

fn is_valid_coordinate(v: f32) -> bool {
    v.is_finite() && v.abs() <= MAX_COORDINATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_move_is_ignored() {
        let mut wp = InteractiveWaypoint::structural(egui::pos2(10.0, 20.0));
        assert!(!wp.move_to(egui::pos2(f32::NAN, 5.0)));
        assert_eq!(wp.position(), egui::pos2(10.0, 20.0));
    }

    #[test]
    fn extreme_and_infinite_moves_are_ignored() {
        let mut wp = InteractiveWaypoint::user_created(egui::pos2(1.0, 2.0));
        assert!(!wp.move_to(egui::pos2(100_001.0, 0.0)));
        assert!(!wp.move_to(egui::pos2(0.0, f32::NEG_INFINITY)));
        assert!(!wp.move_to(egui::pos2(0.0, -250_000.0)));
        assert_eq!(wp.position(), egui::pos2(1.0, 2.0));
    }

    #[test]
    fn valid_move_replaces_position() {
        let mut wp = InteractiveWaypoint::structural(egui::pos2(0.0, 0.0));
        assert!(wp.move_to(egui::pos2(-100_000.0, 42.5)));
        assert_eq!(wp.position(), egui::pos2(-100_000.0, 42.5));
    }

    #[test]
    fn distance_is_euclidean() {
        let wp = InteractiveWaypoint::structural(egui::pos2(0.0, 0.0));
        assert_eq!(wp.distance_to(egui::pos2(3.0, 4.0)), 5.0);
    }

    #[test]
    fn node_ids_are_unique() {
        let a = InteractiveWaypoint::structural(egui::pos2(0.0, 0.0));
        let b = InteractiveWaypoint::structural(egui::pos2(0.0, 0.0));
        assert_ne!(a.node_id, b.node_id);
        assert!(!a.is_user_created);
    }
}
