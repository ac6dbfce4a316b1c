//! The diagram: entity and link arenas, selection, deletion and hit testing.
//!
//! Entities and links reference each other by id only. Moving an entity
//! walks the subscriber list of its shape and recomputes those links before
//! returning, so geometry is never stale after a call.

use crate::arrow::MultiSegmentArrow;
use crate::entity::Entity;
use crate::error::{SceneError, SceneResult};
use crate::geometry::segment_intersects_rect;
use crate::link::LineGroup;
use crate::model::{EntityId, EntityKind, LayoutDocument, LinkId, LinkRecord, Point};
use crate::nodes::{DragOutcome, LineNodeManager, MergeOutcome, MergeSettings, NodeHandle};
use crate::selection::{
    Feedback, ItemRef, SelectionChanged, SelectionHost, SelectionManager, ThemeContext,
};
use crate::settings::AppSettings;
use crate::waypoint::{InteractiveWaypoint, MAX_COORDINATE};
use eframe::egui;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
    pub arrow_head_size: f32,
    pub merge: MergeSettings,
    pub node_hit_radius: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl SceneConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            arrow_head_size: settings.arrow_head_size,
            merge: settings.merge,
            node_hit_radius: settings.node_hit_radius,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeletedLink {
    pub id: LinkId,
    /// Last state of the link, waypoints included.
    pub record: LinkRecord,
}

/// What a deletion removed, for cascading into the backing store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeletionResult {
    pub deleted_workflows: Vec<String>,
    pub deleted_statuses: Vec<String>,
    pub deleted_links: Vec<DeletedLink>,
}

impl DeletionResult {
    pub fn total(&self) -> usize {
        self.deleted_workflows.len() + self.deleted_statuses.len() + self.deleted_links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn merge(&mut self, other: DeletionResult) {
        self.deleted_workflows.extend(other.deleted_workflows);
        self.deleted_statuses.extend(other.deleted_statuses);
        self.deleted_links.extend(other.deleted_links);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImpactSummary {
    pub workflows: usize,
    pub statuses: usize,
    /// Links removed along with the entities.
    pub links: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    Node(LinkId, NodeHandle),
    Item(ItemRef),
}

/// Entity and link storage. Kept apart from the selection manager so the
/// manager can borrow it as its [`SelectionHost`].
#[derive(Debug, Default)]
pub struct Graph {
    entities: BTreeMap<EntityId, Entity>,
    links: BTreeMap<LinkId, LineGroup>,
    keys: BTreeMap<String, EntityId>,
    next_entity: u64,
    next_link: u64,
}

impl Graph {
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn link(&self, id: LinkId) -> Option<&LineGroup> {
        self.links.get(&id)
    }

    /// Runs `f` with the link and both of its entities. Logs and returns
    /// `None` when any of them is missing.
    fn with_link<R>(
        &mut self,
        id: LinkId,
        f: impl FnOnce(&mut LineGroup, &Entity, &Entity) -> R,
    ) -> Option<R> {
        let Some(link) = self.links.get_mut(&id) else {
            tracing::warn!(?id, "no such link");
            return None;
        };
        let (Some(src), Some(dst)) = (
            self.entities.get(&link.arrow.src),
            self.entities.get(&link.arrow.dst),
        ) else {
            tracing::warn!(?id, "link endpoint is not in the scene");
            return None;
        };
        Some(f(link, src, dst))
    }

    fn refresh_link(&mut self, id: LinkId) {
        self.with_link(id, |link, src, dst| {
            link.arrow.update_geometry(src, dst);
            link.nodes.update_positions(&link.arrow);
        });
    }
}

impl SelectionHost for Graph {
    fn feedback(&mut self, item: ItemRef) -> Option<Feedback<'_>> {
        match item {
            ItemRef::Entity(id) => self
                .entities
                .get_mut(&id)
                .map(|e| Feedback::Shape(&mut e.shape)),
            ItemRef::StatusLine(id, row) => self
                .entities
                .get_mut(&id)
                .and_then(|e| e.status_lines.get_mut(row))
                .map(|line| Feedback::Stroke(line)),
            ItemRef::Line(id) => self.links.get_mut(&id).map(|l| Feedback::Line(l)),
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    graph: Graph,
    selection: SelectionManager,
    config: SceneConfig,
}

impl Scene {
    pub fn new(config: SceneConfig, theme: ThemeContext) -> Self {
        Self {
            graph: Graph::default(),
            selection: SelectionManager::new(theme),
            config,
        }
    }

    /// Builds a scene from loaded records. Duplicate keys and links to
    /// unknown keys fail the whole load.
    pub fn from_layout(
        doc: &LayoutDocument,
        config: SceneConfig,
        theme: ThemeContext,
    ) -> SceneResult<Self> {
        let mut scene = Self::new(config, theme);
        for record in &doc.entities {
            if scene.graph.keys.contains_key(&record.key) {
                return Err(SceneError::DuplicateKey(record.key.clone()));
            }
            scene.insert_entity(Entity::from_record(record));
        }
        for record in &doc.links {
            let (src, src_status) =
                scene.resolve_endpoint(&record.source_key, record.source_status_key.as_deref(), record)?;
            let (dst, dst_status) =
                scene.resolve_endpoint(&record.dest_key, record.dest_status_key.as_deref(), record)?;
            let waypoints = record
                .waypoints
                .iter()
                .filter(|p| {
                    let ok = p.is_finite() && p.x.abs() <= MAX_COORDINATE && p.y.abs() <= MAX_COORDINATE;
                    if !ok {
                        tracing::warn!(x = p.x, y = p.y, link = %record.source_key, "skipping invalid waypoint");
                    }
                    ok
                })
                .map(|p| InteractiveWaypoint::structural(p.to_pos2()))
                .collect();
            scene.insert_link(src, dst, src_status, dst_status, waypoints);
        }
        tracing::info!(
            entities = scene.graph.entities.len(),
            links = scene.graph.links.len(),
            "scene built"
        );
        Ok(scene)
    }

    /// A key names either an entity or a status row of some workflow.
    fn resolve_endpoint(
        &self,
        key: &str,
        status_key: Option<&str>,
        record: &LinkRecord,
    ) -> SceneResult<(EntityId, Option<String>)> {
        if let Some(&id) = self.graph.keys.get(key) {
            if let Some(status_key) = status_key {
                let entity = &self.graph.entities[&id];
                if entity.status_line(status_key).is_none() {
                    return Err(SceneError::UnknownStatusKey {
                        workflow: key.to_owned(),
                        status_key: status_key.to_owned(),
                    });
                }
            }
            return Ok((id, status_key.map(str::to_owned)));
        }
        self.graph
            .entities
            .iter()
            .find(|(_, e)| e.status_line(key).is_some())
            .map(|(id, _)| (*id, Some(key.to_owned())))
            .ok_or_else(|| SceneError::UnknownEndpoint {
                key: key.to_owned(),
                source_key: record.source_key.clone(),
                dest_key: record.dest_key.clone(),
            })
    }

    fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.graph.next_entity);
        self.graph.next_entity += 1;
        self.graph.keys.insert(entity.key.clone(), id);
        self.graph.entities.insert(id, entity);
        id
    }

    fn insert_link(
        &mut self,
        src: EntityId,
        dst: EntityId,
        src_status: Option<String>,
        dst_status: Option<String>,
        waypoints: Vec<InteractiveWaypoint>,
    ) -> LinkId {
        let id = LinkId(self.graph.next_link);
        self.graph.next_link += 1;
        let arrow = MultiSegmentArrow::new(src, dst, waypoints)
            .with_status_keys(src_status, dst_status)
            .with_head_size(self.config.arrow_head_size);
        let nodes = LineNodeManager::new(self.selection.selection_color(), self.config.merge);
        self.graph.links.insert(id, LineGroup::new(id, arrow, nodes));
        if let Some(entity) = self.graph.entities.get_mut(&src) {
            entity.source_lines.insert(id);
            entity.shape.subscribe(id);
        }
        if let Some(entity) = self.graph.entities.get_mut(&dst) {
            entity.dest_lines.insert(id);
            entity.shape.subscribe(id);
        }
        self.graph.refresh_link(id);
        id
    }

    pub fn config(&self) -> SceneConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SceneConfig) {
        self.config = config;
        for link in self.graph.links.values_mut() {
            link.nodes.set_merge_settings(config.merge);
            link.arrow.set_head_size(config.arrow_head_size);
        }
        let ids: Vec<LinkId> = self.graph.links.keys().copied().collect();
        for id in ids {
            self.graph.refresh_link(id);
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.graph.entity(id)
    }

    pub fn entity_id(&self, key: &str) -> Option<EntityId> {
        self.graph.keys.get(key).copied()
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.graph.entities.iter().map(|(id, e)| (*id, e))
    }

    pub fn link(&self, id: LinkId) -> Option<&LineGroup> {
        self.graph.link(id)
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &LineGroup)> {
        self.graph.links.iter().map(|(id, l)| (*id, l))
    }

    pub fn path_points(&self, id: LinkId) -> Option<Vec<egui::Pos2>> {
        let link = self.graph.links.get(&id)?;
        let src = self.graph.entities.get(&link.arrow.src)?;
        let dst = self.graph.entities.get(&link.arrow.dst)?;
        Some(link.arrow.path_points(src, dst))
    }

    // Entity factory and link factory.

    pub fn add_status(&mut self, position: egui::Pos2, title: &str) -> EntityId {
        let entity = Entity::new_status(position, title);
        tracing::info!(key = %entity.key, title, "added status");
        self.insert_entity(entity)
    }

    pub fn add_workflow(&mut self, position: egui::Pos2, title: &str, statuses: &[String]) -> EntityId {
        let entity = Entity::new_workflow(position, title, statuses);
        tracing::info!(key = %entity.key, title, rows = statuses.len(), "added workflow");
        self.insert_entity(entity)
    }

    fn connection_end(&self, item: ItemRef) -> SceneResult<(EntityId, Option<String>)> {
        match item {
            ItemRef::Entity(id) => {
                self.graph
                    .entities
                    .get(&id)
                    .ok_or(SceneError::UnknownEntity(id))?;
                Ok((id, None))
            }
            ItemRef::StatusLine(id, row) => {
                let entity = self
                    .graph
                    .entities
                    .get(&id)
                    .ok_or(SceneError::UnknownEntity(id))?;
                let line = entity
                    .status_lines
                    .get(row)
                    .ok_or(SceneError::NotConnectable(item))?;
                Ok((id, Some(line.status_key.clone())))
            }
            ItemRef::Line(_) => Err(SceneError::NotConnectable(item)),
        }
    }

    /// Connects two entities or status rows. A status row connects its
    /// workflow with a status key hint.
    pub fn connect(
        &mut self,
        source: ItemRef,
        target: ItemRef,
        waypoints: Vec<egui::Pos2>,
    ) -> SceneResult<LinkId> {
        let (src, src_status) = self.connection_end(source)?;
        let (dst, dst_status) = self.connection_end(target)?;
        if src == dst {
            let key = self.graph.entities[&src].key.clone();
            return Err(SceneError::SelfConnection(key));
        }
        let waypoints = waypoints
            .into_iter()
            .map(InteractiveWaypoint::user_created)
            .collect();
        let id = self.insert_link(src, dst, src_status, dst_status, waypoints);
        tracing::info!(
            ?id,
            source = %self.graph.entities[&src].key,
            target = %self.graph.entities[&dst].key,
            "created link"
        );
        Ok(id)
    }

    /// Connects every selected entity or status row to `target`.
    pub fn connect_selection_to(&mut self, target: ItemRef) -> Vec<LinkId> {
        let sources: Vec<ItemRef> = self
            .selection
            .selected()
            .iter()
            .copied()
            .filter(|item| *item != target && !matches!(item, ItemRef::Line(_)))
            .collect();
        let mut created = Vec::new();
        for source in sources {
            match self.connect(source, target, Vec::new()) {
                Ok(id) => created.push(id),
                Err(e) => tracing::warn!(?source, ?target, "connection failed: {e}"),
            }
        }
        tracing::info!(count = created.len(), "connected selection");
        created
    }

    // Interactive editing.

    /// Moves an entity and recomputes every link attached to it.
    pub fn move_entity(&mut self, id: EntityId, position: egui::Pos2) -> bool {
        let Some(entity) = self.graph.entities.get_mut(&id) else {
            tracing::warn!(?id, "move of unknown entity");
            return false;
        };
        let before = entity.shape.position();
        let notified = entity.shape.set_position(position).to_vec();
        let moved = entity.shape.position() != before;
        for link in notified {
            self.graph.refresh_link(link);
        }
        moved
    }

    pub fn move_entity_by(&mut self, id: EntityId, delta: egui::Vec2) -> bool {
        match self.graph.entities.get(&id) {
            Some(entity) => {
                let position = entity.shape.position() + delta;
                self.move_entity(id, position)
            }
            None => false,
        }
    }

    /// Moves every selected entity (status rows move their workflow).
    pub fn move_selection_by(&mut self, delta: egui::Vec2) {
        let ids: BTreeSet<EntityId> = self
            .selection
            .selected()
            .iter()
            .filter_map(|item| match item {
                ItemRef::Entity(id) | ItemRef::StatusLine(id, _) => Some(*id),
                ItemRef::Line(_) => None,
            })
            .collect();
        for id in ids {
            self.move_entity_by(id, delta);
        }
    }

    pub fn hover_node(&mut self, link: LinkId, handle: Option<NodeHandle>) {
        if let Some(group) = self.graph.links.get_mut(&link) {
            group.nodes.set_hover(handle);
        }
    }

    pub fn press_node(&mut self, link: LinkId, handle: NodeHandle) -> bool {
        match self.graph.links.get_mut(&link) {
            Some(group) => group.nodes.on_press(handle),
            None => {
                tracing::warn!(?link, "node press without a link");
                false
            }
        }
    }

    pub fn drag_node(&mut self, link: LinkId, position: egui::Pos2) -> DragOutcome {
        self.graph
            .with_link(link, |group, src, dst| {
                group.nodes.on_drag(&mut group.arrow, src, dst, position)
            })
            .unwrap_or(DragOutcome::Ignored)
    }

    pub fn release_node(&mut self, link: LinkId) -> Option<MergeOutcome> {
        self.graph
            .with_link(link, |group, src, dst| {
                group.nodes.on_release(&mut group.arrow, src, dst)
            })
            .flatten()
    }

    /// Drops any drag whose release never arrived.
    pub fn cancel_node_drags(&mut self) {
        for group in self.graph.links.values_mut() {
            if group.nodes.is_dragging() {
                group.nodes.cancel_drag();
            }
        }
    }

    /// Runs the merge pass on a link outside of a drag.
    pub fn straighten_link(&mut self, link: LinkId) -> MergeOutcome {
        self.graph
            .with_link(link, |group, src, dst| {
                group.nodes.check_for_merges(&mut group.arrow, src, dst)
            })
            .unwrap_or_default()
    }

    pub fn remove_all_waypoints(&mut self, link: LinkId) -> Vec<InteractiveWaypoint> {
        let removed = match self.graph.links.get_mut(&link) {
            Some(group) => group.arrow.clear_waypoints(),
            None => return Vec::new(),
        };
        self.graph.refresh_link(link);
        if let Some(group) = self.graph.links.get_mut(&link)
            && group.nodes.is_visible()
        {
            group.nodes.create_nodes(&group.arrow);
        }
        removed
    }

    // Selection.

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn subscribe_selection(&mut self) -> mpsc::Receiver<SelectionChanged> {
        self.selection.subscribe()
    }

    pub fn select_item(&mut self, item: ItemRef, with_modifier: bool) {
        self.selection.select_item(&mut self.graph, item, with_modifier);
    }

    pub fn add_items_to_selection(&mut self, items: impl IntoIterator<Item = ItemRef>) {
        self.selection.add_items_to_selection(&mut self.graph, items);
    }

    pub fn select_all(&mut self) {
        let entities: Vec<ItemRef> = self.graph.entities.keys().map(|id| ItemRef::Entity(*id)).collect();
        self.selection.deselect_all(&mut self.graph);
        self.selection.add_items_to_selection(&mut self.graph, entities);
    }

    pub fn deselect_all(&mut self) {
        self.selection.deselect_all(&mut self.graph);
    }

    pub fn set_theme(&mut self, theme: ThemeContext) {
        self.selection.set_theme(&mut self.graph, theme);
        let color = self.selection.selection_color();
        for link in self.graph.links.values_mut() {
            link.nodes.set_selection_color(color);
        }
    }

    // Deletion.

    /// How much a deletion of `ids` would remove, links included.
    pub fn impacted_items(&self, ids: &[EntityId]) -> ImpactSummary {
        let mut summary = ImpactSummary::default();
        let mut links = BTreeSet::new();
        for entity in ids.iter().filter_map(|id| self.graph.entities.get(id)) {
            match entity.kind() {
                EntityKind::Workflow => summary.workflows += 1,
                EntityKind::Status => summary.statuses += 1,
            }
            links.extend(entity.connected_lines());
        }
        summary.links = links.len();
        summary
    }

    pub fn delete_links(&mut self, ids: &[LinkId]) -> DeletionResult {
        let mut result = DeletionResult::default();
        for id in ids {
            let Some(group) = self.graph.links.remove(id) else {
                continue;
            };
            let (src, dst) = (group.arrow.src, group.arrow.dst);
            let key_of = |entity: EntityId| {
                self.graph
                    .entities
                    .get(&entity)
                    .map(|e| e.key.clone())
                    .unwrap_or_default()
            };
            let record = group.to_record(&key_of(src), &key_of(dst));
            for entity_id in [src, dst] {
                if let Some(entity) = self.graph.entities.get_mut(&entity_id) {
                    entity.source_lines.remove(id);
                    entity.dest_lines.remove(id);
                    entity.shape.unsubscribe(*id);
                }
            }
            self.selection.discard(&[ItemRef::Line(*id)]);
            result.deleted_links.push(DeletedLink { id: *id, record });
        }
        result
    }

    /// Deletes entities and every link attached to them.
    pub fn delete_entities(&mut self, ids: &[EntityId]) -> DeletionResult {
        let mut result = DeletionResult::default();
        for id in ids {
            let Some(entity) = self.graph.entities.get(id) else {
                continue;
            };
            let lines: Vec<LinkId> = entity.connected_lines().into_iter().collect();
            result.merge(self.delete_links(&lines));

            let Some(entity) = self.graph.entities.remove(id) else {
                continue;
            };
            self.graph.keys.remove(&entity.key);
            let mut gone = vec![ItemRef::Entity(*id)];
            gone.extend((0..entity.status_lines.len()).map(|row| ItemRef::StatusLine(*id, row)));
            self.selection.discard(&gone);
            tracing::info!(key = %entity.key, links = lines.len(), "deleted entity");
            match entity.kind() {
                EntityKind::Workflow => result.deleted_workflows.push(entity.key),
                EntityKind::Status => result.deleted_statuses.push(entity.key),
            }
        }
        result
    }

    /// Deletes whatever is selected. The selection is cleared first.
    pub fn delete_selected(&mut self) -> DeletionResult {
        let items: Vec<ItemRef> = self.selection.selected().iter().copied().collect();
        self.selection.deselect_all(&mut self.graph);

        let mut entities = Vec::new();
        let mut links = Vec::new();
        for item in items {
            match item {
                ItemRef::Entity(id) => entities.push(id),
                ItemRef::Line(id) => links.push(id),
                ItemRef::StatusLine(..) => {
                    tracing::debug!(?item, "status rows are deleted with their workflow");
                }
            }
        }
        let mut result = self.delete_links(&links);
        result.merge(self.delete_entities(&entities));
        tracing::info!(
            workflows = result.deleted_workflows.len(),
            statuses = result.deleted_statuses.len(),
            links = result.deleted_links.len(),
            total = result.total(),
            "deleted selection"
        );
        result
    }

    // Hit testing.

    /// Topmost item under `pos`: visible node handles first, then status
    /// rows, entities and finally link segments within `threshold`.
    pub fn hit_test(&self, pos: egui::Pos2, threshold: f32) -> Option<HitTarget> {
        let radius = self.config.node_hit_radius.max(threshold);
        for (id, link) in self.graph.links.iter().rev() {
            if let Some(handle) = link.nodes.node_at(pos, radius) {
                return Some(HitTarget::Node(*id, handle));
            }
        }
        for (id, entity) in self.graph.entities.iter().rev() {
            if let Some(row) = entity.status_line_at(pos) {
                return Some(HitTarget::Item(ItemRef::StatusLine(*id, row)));
            }
            if entity.contains(pos) {
                return Some(HitTarget::Item(ItemRef::Entity(*id)));
            }
        }
        self.graph
            .links
            .iter()
            .filter_map(|(id, link)| {
                let distance = link
                    .arrow
                    .segments()
                    .iter()
                    .filter(|s| s.visible)
                    .map(|s| s.distance_to(pos))
                    .fold(f32::INFINITY, f32::min);
                (distance <= threshold).then_some((*id, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| HitTarget::Item(ItemRef::Line(id)))
    }

    /// Candidates for a rubber-band selection.
    pub fn items_in_rect(&self, rect: egui::Rect) -> Vec<ItemRef> {
        let mut items: Vec<ItemRef> = self
            .graph
            .entities
            .iter()
            .filter(|(_, e)| e.shape.current_bounds().intersects(rect))
            .map(|(id, _)| ItemRef::Entity(*id))
            .collect();
        items.extend(
            self.graph
                .links
                .iter()
                .filter(|(_, link)| {
                    link.arrow
                        .segments()
                        .iter()
                        .filter(|s| s.visible)
                        .any(|s| segment_intersects_rect(s.start, s.end, rect))
                })
                .map(|(id, _)| ItemRef::Line(*id)),
        );
        items
    }

    // Output.

    /// Current waypoints of one link, as the persistence layer stores them.
    pub fn link_waypoints(&self, id: LinkId) -> Option<Vec<Point>> {
        self.graph.links.get(&id).map(|link| {
            link.arrow
                .waypoints()
                .iter()
                .map(|w| Point::from_pos2(w.position()))
                .collect()
        })
    }

    pub fn export_layout(&self) -> LayoutDocument {
        let entities = self.graph.entities.values().map(Entity::to_record).collect();
        let links = self
            .graph
            .links
            .values()
            .filter_map(|link| {
                let src = self.graph.entities.get(&link.arrow.src)?;
                let dst = self.graph.entities.get(&link.arrow.dst)?;
                Some(link.to_record(&src.key, &dst.key))
            })
            .collect();
        LayoutDocument { entities, links }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{circle_edge_intersection, rectangle_edge_intersection};
    use crate::model::{EntityRecord, Rect};

    fn status_record(key: &str, rect: Rect) -> EntityRecord {
        EntityRecord {
            key: key.into(),
            kind: EntityKind::Status,
            rect,
            title: key.to_uppercase(),
            status_titles: Vec::new(),
            status_keys: Vec::new(),
            style: None,
        }
    }

    fn workflow_record(key: &str, rect: Rect, rows: &[&str]) -> EntityRecord {
        EntityRecord {
            key: key.into(),
            kind: EntityKind::Workflow,
            rect,
            title: key.to_uppercase(),
            status_titles: rows.iter().map(|r| r.to_uppercase()).collect(),
            status_keys: rows.iter().map(|r| r.to_string()).collect(),
            style: None,
        }
    }

    fn link_record(src: &str, dst: &str, waypoints: &[(f32, f32)]) -> LinkRecord {
        LinkRecord {
            source_key: src.into(),
            dest_key: dst.into(),
            waypoints: waypoints.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            ..LinkRecord::default()
        }
    }

    fn doc() -> LayoutDocument {
        LayoutDocument {
            entities: vec![
                status_record("open", Rect::new(300.0, 200.0, 50.0, 50.0)),
                workflow_record("review", Rect::new(500.0, 200.0, 100.0, 80.0), &["draft", "done"]),
                status_record("closed", Rect::new(300.0, 400.0, 50.0, 50.0)),
            ],
            links: vec![
                link_record("open", "review", &[(400.0, 226.5), (450.0, 241.5)]),
                link_record("review", "closed", &[]),
            ],
        }
    }

    fn scene() -> Scene {
        Scene::from_layout(&doc(), SceneConfig::default(), ThemeContext::light()).unwrap()
    }

    fn link_between(scene: &Scene, src: &str, dst: &str) -> LinkId {
        let (s, d) = (scene.entity_id(src).unwrap(), scene.entity_id(dst).unwrap());
        scene
            .links()
            .find(|(_, l)| l.arrow.src == s && l.arrow.dst == d)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn loaded_link_path_attaches_to_both_boundaries() {
        let scene = scene();
        let id = link_between(&scene, "open", "review");
        let path = scene.path_points(id).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path[1], egui::pos2(400.0, 226.5));
        assert_eq!(path[2], egui::pos2(450.0, 241.5));

        let first = circle_edge_intersection(325.0, 225.0, 25.0, 25.0, 325.0, 225.0, 400.0, 226.5);
        assert_eq!(path[0], first);
        assert!((path[0].distance(egui::pos2(325.0, 225.0)) - 25.0).abs() < 1e-3);

        let last = rectangle_edge_intersection(500.0, 200.0, 100.0, 80.0, 550.0, 240.0, 450.0, 241.5);
        assert_eq!(path[3], last);
        assert!((path[3].x - 500.0).abs() < 1e-3);

        let link = scene.link(id).unwrap();
        assert_eq!(link.arrow.segments().len(), 3);
        assert_eq!(link.arrow.arrowhead().unwrap().tip, path[3]);
    }

    #[test]
    fn duplicate_keys_fail_the_load() {
        let mut doc = doc();
        doc.entities.push(status_record("open", Rect::new(0.0, 0.0, 10.0, 10.0)));
        let err = Scene::from_layout(&doc, SceneConfig::default(), ThemeContext::light()).unwrap_err();
        assert_eq!(err, SceneError::DuplicateKey("open".into()));
    }

    #[test]
    fn unknown_link_endpoint_fails_the_load() {
        let mut doc = doc();
        doc.links.push(link_record("open", "nowhere", &[]));
        let err = Scene::from_layout(&doc, SceneConfig::default(), ThemeContext::light()).unwrap_err();
        assert!(matches!(err, SceneError::UnknownEndpoint { ref key, .. } if key == "nowhere"));
    }

    #[test]
    fn status_key_as_link_endpoint_attaches_to_its_row() {
        let mut doc = doc();
        doc.links.push(link_record("closed", "done", &[]));
        let scene = Scene::from_layout(&doc, SceneConfig::default(), ThemeContext::light()).unwrap();
        let id = link_between(&scene, "closed", "review");
        let link = scene.link(id).unwrap();
        assert_eq!(link.arrow.dst_status_key.as_deref(), Some("done"));
        let review = scene.entity(scene.entity_id("review").unwrap()).unwrap();
        let row_y = 200.0 + review.status_line("done").unwrap().local_mid_y();
        let path = scene.path_points(id).unwrap();
        assert_eq!(path[1], egui::pos2(500.0, row_y));
    }

    #[test]
    fn invalid_waypoints_are_skipped_on_load() {
        let mut doc = doc();
        doc.links[1].waypoints = vec![Point::new(f32::NAN, 1.0), Point::new(420.0, 380.0)];
        let scene = Scene::from_layout(&doc, SceneConfig::default(), ThemeContext::light()).unwrap();
        let id = link_between(&scene, "review", "closed");
        assert_eq!(scene.link_waypoints(id).unwrap(), vec![Point::new(420.0, 380.0)]);
    }

    #[test]
    fn moving_an_entity_updates_its_links_immediately() {
        let mut scene = scene();
        let id = link_between(&scene, "review", "closed");
        let before = scene.link(id).unwrap().arrow.segments()[0];
        let closed = scene.entity_id("closed").unwrap();
        assert!(scene.move_entity(closed, egui::pos2(700.0, 400.0)));
        let after = scene.link(id).unwrap().arrow.segments()[0];
        assert_ne!(before.end, after.end);
        assert_eq!(after, {
            let path = scene.path_points(id).unwrap();
            crate::arrow::LineSegment {
                start: path[0],
                end: path[1],
                visible: true,
            }
        });
    }

    #[test]
    fn deleting_an_entity_cascades_to_its_links() {
        let mut scene = scene();
        let review = scene.entity_id("review").unwrap();
        let impact = scene.impacted_items(&[review]);
        assert_eq!(impact, ImpactSummary { workflows: 1, statuses: 0, links: 2 });

        let result = scene.delete_entities(&[review]);
        assert_eq!(result.deleted_workflows, vec!["review".to_string()]);
        assert_eq!(result.deleted_links.len(), 2);
        assert_eq!(result.total(), 3);
        let with_points = result
            .deleted_links
            .iter()
            .find(|l| l.record.source_key == "open")
            .unwrap();
        assert_eq!(with_points.record.waypoints.len(), 2);

        assert_eq!(scene.links().count(), 0);
        let open = scene.entity(scene.entity_id("open").unwrap()).unwrap();
        assert!(open.connected_lines().is_empty());
        assert!(open.shape.subscribers().is_empty());
        assert!(scene.entity_id("review").is_none());
    }

    #[test]
    fn delete_selected_clears_selection_first() {
        let mut scene = scene();
        let rx = scene.subscribe_selection();
        let id = link_between(&scene, "open", "review");
        scene.select_item(ItemRef::Line(id), false);
        assert!(scene.link(id).unwrap().nodes.is_visible());
        let result = scene.delete_selected();
        assert_eq!(result.deleted_links.len(), 1);
        assert!(scene.selection().is_empty());
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.last().unwrap().items, Vec::new());
        assert_eq!(scene.links().count(), 1);
    }

    #[test]
    fn selection_is_exclusive_by_type() {
        let mut scene = scene();
        let open = scene.entity_id("open").unwrap();
        let line = link_between(&scene, "open", "review");
        scene.select_item(ItemRef::Entity(open), false);
        scene.select_item(ItemRef::Line(line), true);
        assert_eq!(scene.selection().len(), 1);
        assert!(!scene.link(line).unwrap().nodes.is_visible());
        assert!(scene.entity(open).unwrap().shape.selection_color().is_some());
    }

    #[test]
    fn box_selection_over_entity_and_line_takes_the_entity() {
        let mut scene = scene();
        // Covers the "open" status and the first segment of its link.
        let rect = egui::Rect::from_min_max(egui::pos2(290.0, 190.0), egui::pos2(390.0, 260.0));
        let candidates = scene.items_in_rect(rect);
        assert!(candidates.iter().any(|i| matches!(i, ItemRef::Line(_))));
        scene.add_items_to_selection(candidates);
        let open = scene.entity_id("open").unwrap();
        assert_eq!(
            scene.selection().selected().iter().copied().collect::<Vec<_>>(),
            vec![ItemRef::Entity(open)]
        );
    }

    #[test]
    fn connecting_and_rejecting_self_links() {
        let mut scene = scene();
        let open = scene.entity_id("open").unwrap();
        let closed = scene.entity_id("closed").unwrap();
        let review = scene.entity_id("review").unwrap();
        assert_eq!(
            scene.connect(ItemRef::Entity(open), ItemRef::Entity(open), Vec::new()),
            Err(SceneError::SelfConnection("open".into()))
        );
        let id = scene
            .connect(ItemRef::StatusLine(review, 1), ItemRef::Entity(closed), Vec::new())
            .unwrap();
        let link = scene.link(id).unwrap();
        assert_eq!(link.arrow.src_status_key.as_deref(), Some("done"));
        assert!(scene.entity(review).unwrap().source_lines.contains(&id));
        assert!(scene.entity(closed).unwrap().dest_lines.contains(&id));
    }

    #[test]
    fn connect_selection_skips_the_target() {
        let mut scene = scene();
        let open = scene.entity_id("open").unwrap();
        let closed = scene.entity_id("closed").unwrap();
        let review = scene.entity_id("review").unwrap();
        scene.add_items_to_selection([ItemRef::Entity(open), ItemRef::Entity(closed)]);
        let created = scene.connect_selection_to(ItemRef::Entity(closed));
        assert_eq!(created.len(), 1);
        scene.select_item(ItemRef::Entity(review), false);
        assert_eq!(scene.connect_selection_to(ItemRef::Entity(review)).len(), 0);
    }

    #[test]
    fn hit_test_prefers_rows_then_entities_then_lines() {
        let scene = scene();
        let review = scene.entity_id("review").unwrap();
        let row_center = scene.entity(review).unwrap().status_line_bounds(0).unwrap().center();
        assert_eq!(
            scene.hit_test(row_center, 4.0),
            Some(HitTarget::Item(ItemRef::StatusLine(review, 0)))
        );
        let open = scene.entity_id("open").unwrap();
        assert_eq!(
            scene.hit_test(egui::pos2(325.0, 225.0), 4.0),
            Some(HitTarget::Item(ItemRef::Entity(open)))
        );
        let line = link_between(&scene, "open", "review");
        assert_eq!(
            scene.hit_test(egui::pos2(425.0, 235.0), 4.0),
            Some(HitTarget::Item(ItemRef::Line(line)))
        );
        assert_eq!(scene.hit_test(egui::pos2(-500.0, -500.0), 4.0), None);
    }

    #[test]
    fn dragging_nodes_through_the_scene() {
        let mut scene = scene();
        let line = link_between(&scene, "review", "closed");
        scene.select_item(ItemRef::Line(line), false);
        let mid = scene.link(line).unwrap().nodes.midpoint_nodes()[0].position;
        let Some(HitTarget::Node(hit_line, handle)) = scene.hit_test(mid, 4.0) else {
            panic!("midpoint node not hit");
        };
        assert_eq!(hit_line, line);
        assert!(scene.press_node(line, handle));
        assert!(matches!(
            scene.drag_node(line, egui::pos2(200.0, 300.0)),
            DragOutcome::Split { .. }
        ));
        assert_eq!(scene.drag_node(line, egui::pos2(150.0, 320.0)), DragOutcome::Moved);
        let merged = scene.release_node(line).unwrap();
        assert!(merged.is_empty());
        assert_eq!(scene.link_waypoints(line).unwrap(), vec![Point::new(150.0, 320.0)]);
        let exported = scene.export_layout();
        let record = exported
            .links
            .iter()
            .find(|l| l.source_key == "review" && l.dest_key == "closed")
            .unwrap();
        assert_eq!(record.waypoints, vec![Point::new(150.0, 320.0)]);
    }

    #[test]
    fn straightened_waypoints_do_not_come_back_on_export() {
        let mut doc = doc();
        // Nearly on the line between "review" (550, 240) and "closed" (325, 425).
        doc.links[1].waypoints = vec![Point::new(440.0, 333.0)];
        let mut scene = Scene::from_layout(&doc, SceneConfig::default(), ThemeContext::light()).unwrap();
        let id = link_between(&scene, "review", "closed");
        let outcome = scene.straighten_link(id);
        assert!(outcome.collapsed);
        assert!(scene.link_waypoints(id).unwrap().is_empty());
        let exported = scene.export_layout();
        assert!(exported.links.iter().all(|l| l.source_key != "review" || l.waypoints.is_empty()));
    }

    #[test]
    fn export_round_trips_through_from_layout() {
        let mut scene = scene();
        let open = scene.entity_id("open").unwrap();
        scene.move_entity_by(open, egui::vec2(-20.0, 10.0));
        let exported = scene.export_layout();
        let rebuilt = Scene::from_layout(&exported, SceneConfig::default(), ThemeContext::light()).unwrap();
        assert_eq!(rebuilt.export_layout(), exported);
        let open = rebuilt.entity(rebuilt.entity_id("open").unwrap()).unwrap();
        assert_eq!(open.shape.position(), egui::pos2(280.0, 210.0));
    }

    #[test]
    fn new_entities_get_default_sizes_and_fresh_keys() {
        let mut scene = scene();
        let a = scene.add_status(egui::pos2(0.0, 0.0), "New");
        let b = scene.add_workflow(egui::pos2(0.0, 0.0), "Flow", &["One".into(), "Two".into()]);
        let (a, b) = (scene.entity(a).unwrap(), scene.entity(b).unwrap());
        assert_ne!(a.key, b.key);
        assert_eq!(a.shape.size(), egui::vec2(53.0, 53.0));
        assert_eq!(b.shape.size(), egui::vec2(127.0, 174.0));
        assert_eq!(b.status_lines.len(), 2);
        assert!(scene.entity_id(&a.key).is_some());
    }

    #[test]
    fn theme_switch_recolors_nodes() {
        let mut scene = scene();
        let line = link_between(&scene, "open", "review");
        scene.select_item(ItemRef::Line(line), false);
        scene.set_theme(ThemeContext::dark());
        let link = scene.link(line).unwrap();
        assert_eq!(link.nodes.selection_color(), ThemeContext::dark().selection_color());
        assert_eq!(link.selection_color(), Some(ThemeContext::dark().selection_color()));
    }
}
