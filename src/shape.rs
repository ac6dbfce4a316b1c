use crate::model::{LinkId, Rect};
use crate::selection::Selectable;
use eframe::egui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Ellipse,
    Rectangle,
}

/// Position provider for one entity.
///
/// The original [`Rect`] is kept untouched; dragging only changes the live
/// top-left position. Links interested in moves register themselves with
/// [`Shape::subscribe`] and the owning scene notifies them synchronously with
/// the ids returned by [`Shape::set_position`].
#[derive(Clone, Debug)]
pub struct Shape {
    kind: ShapeKind,
    rect: Rect,
    position: egui::Pos2,
    selected: bool,
    selection_color: Option<egui::Color32>,
    subscribers: Vec<LinkId>,
}

impl Shape {
    pub fn new(kind: ShapeKind, rect: Rect) -> Self {
        Self {
            kind,
            rect,
            position: egui::pos2(rect.left(), rect.top()),
            selected: false,
            selection_color: None,
            subscribers: Vec::new(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn position(&self) -> egui::Pos2 {
        self.position
    }

    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.rect.width(), self.rect.height())
    }

    pub fn current_center(&self) -> egui::Pos2 {
        self.position + self.size() * 0.5
    }

    pub fn current_bounds(&self) -> egui::Rect {
        egui::Rect::from_min_size(self.position, self.size())
    }

    /// Moves the shape and returns the links that must recompute. Returns an
    /// empty slice when the position did not change or is not finite.
    pub fn set_position(&mut self, position: egui::Pos2) -> &[LinkId] {
        if !position.x.is_finite() || !position.y.is_finite() || position == self.position {
            return &[];
        }
        self.position = position;
        &self.subscribers
    }

    pub fn subscribe(&mut self, link: LinkId) {
        if !self.subscribers.contains(&link) {
            self.subscribers.push(link);
        }
    }

    pub fn unsubscribe(&mut self, link: LinkId) {
        self.subscribers.retain(|l| *l != link);
    }

    pub fn subscribers(&self) -> &[LinkId] {
        &self.subscribers
    }

    pub fn contains(&self, p: egui::Pos2) -> bool {
        match self.kind {
            ShapeKind::Rectangle => self.current_bounds().contains(p),
            ShapeKind::Ellipse => {
                let c = self.current_center();
                let (rx, ry) = (self.rect.rx(), self.rect.ry());
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (p.x - c.x) / rx;
                let dy = (p.y - c.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }

    pub fn selection_color(&self) -> Option<egui::Color32> {
        self.selection_color
    }
}

impl Selectable for Shape {
    fn set_selected(&mut self, selected: bool, color: egui::Color32) {
        self.selected = selected;
        self.selection_color = selected.then_some(color);
    }

    fn is_selected(&self) -> bool {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_position_leaves_rect_untouched() {
        let mut shape = Shape::new(ShapeKind::Ellipse, Rect::new(100.0, 100.0, 50.0, 50.0));
        shape.subscribe(LinkId(7));
        let notified = shape.set_position(egui::pos2(200.0, 10.0)).to_vec();
        assert_eq!(notified, vec![LinkId(7)]);
        assert_eq!(shape.current_center(), egui::pos2(225.0, 35.0));
        assert_eq!(shape.rect().left(), 100.0);
        assert_eq!(shape.current_bounds().width(), 50.0);
    }

    #[test]
    fn unchanged_or_invalid_position_notifies_nobody() {
        let mut shape = Shape::new(ShapeKind::Rectangle, Rect::new(0.0, 0.0, 10.0, 10.0));
        shape.subscribe(LinkId(1));
        assert!(shape.set_position(egui::pos2(0.0, 0.0)).is_empty());
        assert!(shape.set_position(egui::pos2(f32::NAN, 0.0)).is_empty());
        assert_eq!(shape.position(), egui::pos2(0.0, 0.0));
    }

    #[test]
    fn subscribers_are_unique() {
        let mut shape = Shape::new(ShapeKind::Rectangle, Rect::new(0.0, 0.0, 10.0, 10.0));
        shape.subscribe(LinkId(1));
        shape.subscribe(LinkId(1));
        shape.subscribe(LinkId(2));
        shape.unsubscribe(LinkId(1));
        assert_eq!(shape.subscribers(), &[LinkId(2)]);
    }

    #[test]
    fn ellipse_containment_uses_radii() {
        let shape = Shape::new(ShapeKind::Ellipse, Rect::new(0.0, 0.0, 100.0, 20.0));
        assert!(shape.contains(egui::pos2(95.0, 10.0)));
        assert!(!shape.contains(egui::pos2(95.0, 2.0)));
    }
}
