//! Selection state for one diagram.
//!
//! The manager only knows items by [`ItemRef`]. Visual feedback goes
//! through a [`SelectionHost`], which hands out whichever capability the
//! item has: a shape that can be marked selected, a line with a handle
//! layer, or just a stroke that can be recolored.

use crate::model::{EntityId, LinkId, Rgba};
use eframe::egui;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;

pub const LIGHT_SELECTION: Rgba = Rgba::rgb(0xFF, 0x8C, 0x00);
pub const LIGHT_SELECTION_LIGHTER: Rgba = Rgba::rgb(0xFF, 0xB3, 0x47);
pub const DARK_SELECTION: Rgba = Rgba::rgb(0x5D, 0xAD, 0xE2);
pub const DARK_SELECTION_LIGHTER: Rgba = Rgba::rgb(0x85, 0xC1, 0xE9);

const FALLBACK_SELECTED_WIDTH: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemRef {
    Entity(EntityId),
    /// Row `usize` of the workflow entity.
    StatusLine(EntityId, usize),
    Line(LinkId),
}

impl ItemRef {
    pub fn mode(self) -> SelectionMode {
        match self {
            ItemRef::Entity(_) | ItemRef::StatusLine(..) => SelectionMode::Entity,
            ItemRef::Line(_) => SelectionMode::Line,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMode {
    Entity,
    Line,
}

pub trait Selectable {
    fn set_selected(&mut self, selected: bool, color: egui::Color32);
    fn is_selected(&self) -> bool;
}

pub trait HasInteractiveNodes {
    fn show_nodes(&mut self);
    fn hide_nodes(&mut self);
    fn nodes_visible(&self) -> bool;
}

/// Items without a selection state of their own get their stroke swapped.
pub trait StrokeFallback {
    fn stroke(&self) -> egui::Stroke;
    fn set_stroke(&mut self, stroke: egui::Stroke);
}

pub trait SelectableLine: Selectable + HasInteractiveNodes {}

impl<T: Selectable + HasInteractiveNodes> SelectableLine for T {}

pub enum Feedback<'a> {
    Shape(&'a mut dyn Selectable),
    Line(&'a mut dyn SelectableLine),
    Stroke(&'a mut dyn StrokeFallback),
}

pub trait SelectionHost {
    /// The feedback capability of `item`, or `None` if it does not exist.
    fn feedback(&mut self, item: ItemRef) -> Option<Feedback<'_>>;
}

/// Background color the selection color is derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThemeContext {
    pub background: Rgba,
}

impl Default for ThemeContext {
    fn default() -> Self {
        Self::light()
    }
}

impl ThemeContext {
    pub fn new(background: Rgba) -> Self {
        Self { background }
    }

    pub fn light() -> Self {
        Self::new(Rgba::rgb(248, 248, 248))
    }

    pub fn dark() -> Self {
        Self::new(Rgba::rgb(27, 27, 27))
    }

    pub fn from_visuals(visuals: &egui::Visuals) -> Self {
        Self::new(Rgba::from_color32(visuals.panel_fill))
    }

    pub fn is_dark(&self) -> bool {
        self.background.luminance() < 0.5
    }

    pub fn selection_color(&self) -> egui::Color32 {
        if self.is_dark() {
            DARK_SELECTION.to_color32()
        } else {
            LIGHT_SELECTION.to_color32()
        }
    }

    pub fn selection_color_lighter(&self) -> egui::Color32 {
        if self.is_dark() {
            DARK_SELECTION_LIGHTER.to_color32()
        } else {
            LIGHT_SELECTION_LIGHTER.to_color32()
        }
    }
}

/// Sent to every subscriber whenever the selected set changes.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionChanged {
    pub items: Vec<ItemRef>,
    pub mode: Option<SelectionMode>,
}

#[derive(Debug, Default)]
pub struct SelectionManager {
    selected: BTreeSet<ItemRef>,
    mode: Option<SelectionMode>,
    theme: ThemeContext,
    original_strokes: BTreeMap<ItemRef, egui::Stroke>,
    listeners: Vec<mpsc::Sender<SelectionChanged>>,
}

impl SelectionManager {
    pub fn new(theme: ThemeContext) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn theme(&self) -> ThemeContext {
        self.theme
    }

    pub fn selection_color(&self) -> egui::Color32 {
        self.theme.selection_color()
    }

    pub fn mode(&self) -> Option<SelectionMode> {
        self.mode
    }

    pub fn selected(&self) -> &BTreeSet<ItemRef> {
        &self.selected
    }

    pub fn is_selected(&self, item: ItemRef) -> bool {
        self.selected.contains(&item)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Receiver for [`SelectionChanged`] events. Dropped receivers are
    /// pruned on the next send.
    pub fn subscribe(&mut self) -> mpsc::Receiver<SelectionChanged> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    /// Plain click selects only `item`. With the modifier held the item is
    /// toggled, and only joins when it matches the current mode.
    pub fn select_item(&mut self, host: &mut dyn SelectionHost, item: ItemRef, with_modifier: bool) {
        if !with_modifier {
            if self.selected.len() == 1 && self.selected.contains(&item) {
                return;
            }
            self.clear_visuals(host);
            self.selected.clear();
            self.mode = None;
            if self.apply(host, item) {
                self.selected.insert(item);
                self.mode = Some(item.mode());
            }
            self.notify();
            return;
        }

        if self.selected.contains(&item) {
            self.remove_visual(host, item);
            self.selected.remove(&item);
            if self.selected.is_empty() {
                self.mode = None;
            }
            self.notify();
            return;
        }

        if let Some(mode) = self.mode
            && mode != item.mode()
        {
            tracing::debug!(?item, ?mode, "ignoring item of another type");
            return;
        }
        if self.apply(host, item) {
            self.selected.insert(item);
            self.mode = Some(item.mode());
            self.notify();
        }
    }

    /// Rubber-band selection. Entities win over lines; switching type
    /// clears the previous selection first.
    pub fn add_items_to_selection(
        &mut self,
        host: &mut dyn SelectionHost,
        items: impl IntoIterator<Item = ItemRef>,
    ) {
        let (entities, lines): (Vec<ItemRef>, Vec<ItemRef>) = items
            .into_iter()
            .partition(|item| item.mode() == SelectionMode::Entity);
        let (chosen, mode) = if !entities.is_empty() {
            (entities, SelectionMode::Entity)
        } else if !lines.is_empty() {
            (lines, SelectionMode::Line)
        } else {
            return;
        };

        let mut changed = false;
        if self.mode.is_some_and(|m| m != mode) {
            self.clear_visuals(host);
            self.selected.clear();
            changed = true;
        }
        for item in chosen {
            if self.selected.contains(&item) {
                continue;
            }
            if self.apply(host, item) {
                self.selected.insert(item);
                changed = true;
            }
        }
        self.mode = if self.selected.is_empty() { None } else { Some(mode) };
        if changed {
            self.notify();
        }
    }

    pub fn deselect_all(&mut self, host: &mut dyn SelectionHost) {
        if self.selected.is_empty() {
            self.mode = None;
            return;
        }
        self.clear_visuals(host);
        self.selected.clear();
        self.mode = None;
        self.notify();
    }

    /// Drops items that no longer exist without touching their visuals.
    pub fn discard(&mut self, items: &[ItemRef]) {
        let before = self.selected.len();
        for item in items {
            self.selected.remove(item);
            self.original_strokes.remove(item);
        }
        if self.selected.is_empty() {
            self.mode = None;
        }
        if self.selected.len() != before {
            self.notify();
        }
    }

    /// Switches theme and recolors everything currently selected.
    pub fn set_theme(&mut self, host: &mut dyn SelectionHost, theme: ThemeContext) {
        if theme.selection_color() == self.theme.selection_color() {
            self.theme = theme;
            return;
        }
        let items: Vec<ItemRef> = self.selected.iter().copied().collect();
        self.clear_visuals(host);
        self.theme = theme;
        for item in items {
            if !self.apply(host, item) {
                self.selected.remove(&item);
            }
        }
        if self.selected.is_empty() {
            self.mode = None;
        }
        tracing::debug!(dark = theme.is_dark(), "selection theme updated");
    }

    fn apply(&mut self, host: &mut dyn SelectionHost, item: ItemRef) -> bool {
        let color = self.theme.selection_color();
        match host.feedback(item) {
            Some(Feedback::Shape(shape)) => shape.set_selected(true, color),
            Some(Feedback::Line(line)) => {
                line.set_selected(true, color);
                line.show_nodes();
            }
            Some(Feedback::Stroke(target)) => {
                let original = *self
                    .original_strokes
                    .entry(item)
                    .or_insert_with(|| target.stroke());
                target.set_stroke(egui::Stroke::new(
                    original.width.max(FALLBACK_SELECTED_WIDTH),
                    color,
                ));
            }
            None => {
                tracing::warn!(?item, "cannot select an item missing from the scene");
                return false;
            }
        }
        true
    }

    fn remove_visual(&mut self, host: &mut dyn SelectionHost, item: ItemRef) {
        let color = self.theme.selection_color();
        let original = self.original_strokes.remove(&item);
        match host.feedback(item) {
            Some(Feedback::Shape(shape)) => shape.set_selected(false, color),
            Some(Feedback::Line(line)) => {
                line.set_selected(false, color);
                line.hide_nodes();
            }
            Some(Feedback::Stroke(target)) => {
                if let Some(original) = original {
                    target.set_stroke(original);
                }
            }
            None => {}
        }
    }

    fn clear_visuals(&mut self, host: &mut dyn SelectionHost) {
        let items: Vec<ItemRef> = self.selected.iter().copied().collect();
        for item in items {
            self.remove_visual(host, item);
        }
    }

    fn notify(&mut self) {
        let event = SelectionChanged {
            items: self.selected.iter().copied().collect(),
            mode: self.mode,
        };
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Flag {
        selected: bool,
        color: Option<egui::Color32>,
        nodes: bool,
    }

    impl Selectable for Flag {
        fn set_selected(&mut self, selected: bool, color: egui::Color32) {
            self.selected = selected;
            self.color = selected.then_some(color);
        }

        fn is_selected(&self) -> bool {
            self.selected
        }
    }

    impl HasInteractiveNodes for Flag {
        fn show_nodes(&mut self) {
            self.nodes = true;
        }

        fn hide_nodes(&mut self) {
            self.nodes = false;
        }

        fn nodes_visible(&self) -> bool {
            self.nodes
        }
    }

    struct Pen(egui::Stroke);

    impl StrokeFallback for Pen {
        fn stroke(&self) -> egui::Stroke {
            self.0
        }

        fn set_stroke(&mut self, stroke: egui::Stroke) {
            self.0 = stroke;
        }
    }

    #[derive(Default)]
    struct Host {
        shapes: BTreeMap<ItemRef, Flag>,
        lines: BTreeMap<ItemRef, Flag>,
        pens: BTreeMap<ItemRef, Pen>,
    }

    impl SelectionHost for Host {
        fn feedback(&mut self, item: ItemRef) -> Option<Feedback<'_>> {
            if let Some(shape) = self.shapes.get_mut(&item) {
                return Some(Feedback::Shape(shape));
            }
            if let Some(line) = self.lines.get_mut(&item) {
                return Some(Feedback::Line(line));
            }
            self.pens
                .get_mut(&item)
                .map(|pen| Feedback::Stroke(pen as &mut dyn StrokeFallback))
        }
    }

    const E1: ItemRef = ItemRef::Entity(EntityId(1));
    const E2: ItemRef = ItemRef::Entity(EntityId(2));
    const ROW: ItemRef = ItemRef::StatusLine(EntityId(2), 0);
    const L1: ItemRef = ItemRef::Line(LinkId(1));
    const L2: ItemRef = ItemRef::Line(LinkId(2));

    fn host() -> Host {
        let mut host = Host::default();
        host.shapes.insert(E1, Flag::default());
        host.shapes.insert(E2, Flag::default());
        host.lines.insert(L1, Flag::default());
        host.lines.insert(L2, Flag::default());
        host.pens.insert(ROW, Pen(egui::Stroke::new(1.0, egui::Color32::BLACK)));
        host
    }

    #[test]
    fn modifier_select_ignores_other_type() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.select_item(&mut host, E1, false);
        sel.select_item(&mut host, L1, true);
        assert_eq!(sel.selected().iter().copied().collect::<Vec<_>>(), vec![E1]);
        assert_eq!(sel.mode(), Some(SelectionMode::Entity));
        assert!(!host.lines[&L1].selected);
        assert!(!host.lines[&L1].nodes);
        assert!(host.shapes[&E1].selected);
    }

    #[test]
    fn plain_click_replaces_selection() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.select_item(&mut host, E1, false);
        sel.select_item(&mut host, L1, false);
        assert!(!host.shapes[&E1].selected);
        assert!(host.lines[&L1].selected);
        assert!(host.lines[&L1].nodes);
        assert_eq!(sel.mode(), Some(SelectionMode::Line));
    }

    #[test]
    fn toggling_last_item_clears_mode() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.select_item(&mut host, L1, true);
        sel.select_item(&mut host, L2, true);
        assert_eq!(sel.len(), 2);
        sel.select_item(&mut host, L1, true);
        sel.select_item(&mut host, L2, true);
        assert!(sel.is_empty());
        assert_eq!(sel.mode(), None);
        assert!(!host.lines[&L2].nodes);
        // Empty selection accepts any type again.
        sel.select_item(&mut host, E2, true);
        assert_eq!(sel.mode(), Some(SelectionMode::Entity));
    }

    #[test]
    fn box_selection_prefers_entities() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.add_items_to_selection(&mut host, [L1, E1]);
        assert_eq!(sel.selected().iter().copied().collect::<Vec<_>>(), vec![E1]);
        assert!(!host.lines[&L1].selected);
    }

    #[test]
    fn box_selection_of_other_type_replaces_selection() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.select_item(&mut host, E1, false);
        sel.add_items_to_selection(&mut host, [L1, L2]);
        assert_eq!(sel.mode(), Some(SelectionMode::Line));
        assert_eq!(sel.len(), 2);
        assert!(!host.shapes[&E1].selected);
    }

    #[test]
    fn status_rows_use_stroke_fallback() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.select_item(&mut host, E1, false);
        sel.select_item(&mut host, ROW, true);
        let pen = host.pens[&ROW].0;
        assert_eq!(pen.color, LIGHT_SELECTION.to_color32());
        assert_eq!(pen.width, 2.0);
        sel.deselect_all(&mut host);
        assert_eq!(host.pens[&ROW].0, egui::Stroke::new(1.0, egui::Color32::BLACK));
        assert!(!host.shapes[&E1].selected);
    }

    #[test]
    fn theme_change_recolors_selection() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.add_items_to_selection(&mut host, [E1, ROW]);
        sel.set_theme(&mut host, ThemeContext::dark());
        let dark = DARK_SELECTION.to_color32();
        assert_eq!(host.shapes[&E1].color, Some(dark));
        assert_eq!(host.pens[&ROW].0.color, dark);
        sel.deselect_all(&mut host);
        assert_eq!(host.pens[&ROW].0.color, egui::Color32::BLACK);
    }

    #[test]
    fn missing_items_are_not_selected() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        sel.select_item(&mut host, ItemRef::Entity(EntityId(99)), false);
        assert!(sel.is_empty());
        assert_eq!(sel.mode(), None);
    }

    #[test]
    fn changes_are_broadcast() {
        let mut host = host();
        let mut sel = SelectionManager::new(ThemeContext::light());
        let rx = sel.subscribe();
        sel.select_item(&mut host, E1, false);
        sel.select_item(&mut host, E1, false);
        sel.select_item(&mut host, E2, true);
        sel.deselect_all(&mut host);
        let events: Vec<SelectionChanged> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].items, vec![E1, E2]);
        assert_eq!(events[2].items, Vec::new());
        assert_eq!(events[2].mode, None);
    }

    #[test]
    fn theme_detection_uses_luminance() {
        assert!(!ThemeContext::light().is_dark());
        assert!(ThemeContext::dark().is_dark());
        assert_eq!(
            ThemeContext::new(Rgba::rgb(0, 0, 0)).selection_color_lighter(),
            DARK_SELECTION_LIGHTER.to_color32()
        );
    }
}
