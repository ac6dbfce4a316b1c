use eframe::egui;
use wfdesigner::model::{EntityId, LinkId};
use wfdesigner::selection::ItemRef;
use wfdesigner::settings::{self, ThemeChoice};
use wfdesigner::{Scene, SceneConfig, layout};

use super::{DesignerApp, PendingDelete, apply_visuals};

impl DesignerApp {
    /// Where new entities land: the last pointer position on the canvas, else
    /// the middle of the window.
    pub(super) fn placement_world(&self, ctx: &egui::Context) -> egui::Pos2 {
        let screen = ctx.content_rect();
        let origin = screen.min;
        self.last_pointer_world
            .unwrap_or_else(|| self.view.screen_to_world(origin, screen.center()))
    }

    pub(super) fn add_status(&mut self, ctx: &egui::Context) {
        let pos = self.placement_world(ctx);
        self.add_status_at(pos);
    }

    pub(super) fn add_status_at(&mut self, pos: egui::Pos2) {
        let id = self.scene.add_status(pos, &self.new_title);
        self.scene.select_item(ItemRef::Entity(id), false);
        self.status = Some(format!("Added status '{}'", self.new_title));
    }

    pub(super) fn add_workflow(&mut self, ctx: &egui::Context) {
        let pos = self.placement_world(ctx);
        self.add_workflow_at(pos);
    }

    pub(super) fn add_workflow_at(&mut self, pos: egui::Pos2) {
        let statuses: Vec<String> = self
            .new_statuses
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        let id = self.scene.add_workflow(pos, &self.new_title, &statuses);
        self.scene.select_item(ItemRef::Entity(id), false);
        self.status = Some(format!(
            "Added workflow '{}' with {} statuses",
            self.new_title,
            statuses.len()
        ));
    }

    pub(super) fn can_connect(&self) -> bool {
        self.scene
            .selection()
            .selected()
            .iter()
            .any(|item| !matches!(item, ItemRef::Line(_)))
    }

    pub(super) fn begin_connect(&mut self) {
        if self.can_connect() {
            self.connect_mode = true;
            self.status = Some("Click the target entity or status".to_string());
        } else {
            self.status = Some("Select the source entities first".to_string());
        }
    }

    pub(super) fn finish_connect(&mut self, target: ItemRef) {
        self.connect_mode = false;
        if matches!(target, ItemRef::Line(_)) {
            self.status = Some("Links cannot be connected".to_string());
            return;
        }
        let created = self.scene.connect_selection_to(target);
        self.status = Some(format!("Created {} link(s)", created.len()));
    }

    fn selected_entities(&self) -> Vec<EntityId> {
        self.scene
            .selection()
            .selected()
            .iter()
            .filter_map(|item| match item {
                ItemRef::Entity(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub(super) fn selected_links(&self) -> Vec<LinkId> {
        self.scene
            .selection()
            .selected()
            .iter()
            .filter_map(|item| match item {
                ItemRef::Line(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Deletes right away unless entities would take links down with them.
    pub(super) fn request_delete(&mut self) {
        if self.scene.selection().is_empty() {
            return;
        }
        let entities = self.selected_entities();
        let impact = self.scene.impacted_items(&entities);
        if impact.links > 0 {
            self.pending_delete = Some(PendingDelete {
                impact,
                lines: self.selected_links().len(),
            });
        } else {
            self.delete_selected();
        }
    }

    pub(super) fn delete_selected(&mut self) {
        self.pending_delete = None;
        self.in_progress = None;
        self.hovered_node = None;
        let result = self.scene.delete_selected();
        self.status = Some(format!(
            "Deleted {} workflow(s), {} status(es), {} link(s)",
            result.deleted_workflows.len(),
            result.deleted_statuses.len(),
            result.deleted_links.len()
        ));
    }

    pub(super) fn straighten_selected(&mut self) {
        let mut removed = 0;
        for link in self.selected_links() {
            let outcome = self.scene.straighten_link(link);
            removed += outcome.removed.len();
        }
        self.status = Some(format!("Removed {removed} waypoint(s)"));
    }

    pub(super) fn clear_selected_waypoints(&mut self) {
        let mut removed = 0;
        for link in self.selected_links() {
            removed += self.scene.remove_all_waypoints(link).len();
        }
        self.status = Some(format!("Removed {removed} waypoint(s)"));
    }

    pub(super) fn save_to_path(&mut self) {
        let path = self.settings.layout_path.clone();
        match layout::save_layout(&path, &self.scene.export_layout()) {
            Ok(()) => self.status = Some(format!("Saved {path}")),
            Err(e) => self.status = Some(format!("Save failed: {e}")),
        }
    }

    pub(super) fn save_layout_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("layout.json")
            .add_filter("JSON", &["json"])
            .save_file()
        {
            self.settings.layout_path = path.display().to_string();
            self.persist_settings();
            self.save_to_path();
        }
    }

    pub(super) fn load_from_path(&mut self) {
        let path = self.settings.layout_path.clone();
        let config = SceneConfig::from_settings(&self.settings);
        let theme = self.scene.selection().theme();
        match layout::load_layout(&path).and_then(|doc| Ok(Scene::from_layout(&doc, config, theme)?)) {
            Ok(scene) => {
                self.replace_scene(scene);
                self.status = Some(format!("Loaded {path}"));
            }
            Err(e) => {
                tracing::error!(%path, "layout load failed: {e}");
                self.status = Some(format!("Load failed: {e}"));
            }
        }
    }

    pub(super) fn open_layout_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.settings.layout_path = path.display().to_string();
            self.persist_settings();
            self.load_from_path();
        }
    }

    pub(super) fn set_theme(&mut self, ctx: &egui::Context, theme: ThemeChoice) {
        self.settings.theme = theme;
        apply_visuals(ctx, theme);
        self.scene.set_theme(theme.resolve(&ctx.style().visuals));
        self.persist_settings();
    }

    /// Keeps the selection color in step with the window background when
    /// the theme follows the system.
    pub(super) fn sync_theme(&mut self, ctx: &egui::Context) {
        if self.settings.theme != ThemeChoice::Auto {
            return;
        }
        let theme = ThemeChoice::Auto.resolve(&ctx.style().visuals);
        if theme != self.scene.selection().theme() {
            self.scene.set_theme(theme);
        }
    }

    pub(super) fn persist_settings(&mut self) {
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            self.status = Some(format!("Settings save failed: {e}"));
        }
    }

    pub(super) fn reload_settings(&mut self, ctx: &egui::Context) {
        self.settings = settings::load_settings(&self.settings_path)
            .or_else(|| settings::load_settings("settings.json"))
            .unwrap_or_default();
        apply_visuals(ctx, self.settings.theme);
        self.scene.set_config(SceneConfig::from_settings(&self.settings));
        self.scene
            .set_theme(self.settings.theme.resolve(&ctx.style().visuals));
        self.status = Some("Settings reloaded".to_string());
    }
}
