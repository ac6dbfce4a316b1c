use eframe::egui;
use wfdesigner::model::EntityKind;
use wfdesigner::nodes::DragOutcome;
use wfdesigner::scene::HitTarget;
use wfdesigner::selection::{ItemRef, SelectionMode};
use wfdesigner::settings::ThemeChoice;
use wfdesigner::SceneConfig;

use super::command_palette::{CommandContext, CommandPalette};
use super::render::{draw_background, draw_in_progress, draw_scene};
use super::{DesignerApp, InProgress};

/// Keyboard actions gathered inside `input_mut` and run once the input lock
/// is released.
#[derive(Clone, Copy, Debug)]
enum KeyAction {
    Palette,
    Help,
    Save,
    Open,
    SelectAll,
    Escape,
    Delete,
    AddStatus,
    AddWorkflow,
    Connect,
    Straighten,
    Nudge(egui::Vec2),
}

impl eframe::App for DesignerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_theme(ctx);
        self.drain_selection_events();
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open... (⌘O)").clicked() {
                        self.open_layout_dialog();
                        ui.close();
                    }
                    if ui.button("Save (⌘S)").clicked() {
                        self.save_to_path();
                        ui.close();
                    }
                    if ui.button("Save as...").clicked() {
                        self.save_layout_dialog();
                        ui.close();
                    }
                    if ui.button("Reload").clicked() {
                        self.load_from_path();
                        ui.close();
                    }
                    ui.separator();
                    ui.small("Layout path:");
                    if ui.text_edit_singleline(&mut self.settings.layout_path).lost_focus() {
                        self.persist_settings();
                    }
                    ui.separator();
                    if ui.button("Reload settings").clicked() {
                        self.reload_settings(ui.ctx());
                        ui.close();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui.button("Add status (S)").clicked() {
                        self.add_status(ui.ctx());
                        ui.close();
                    }
                    if ui.button("Add workflow (W)").clicked() {
                        self.add_workflow(ui.ctx());
                        ui.close();
                    }
                    ui.separator();
                    if ui
                        .add_enabled(self.can_connect(), egui::Button::new("Connect to... (C)"))
                        .clicked()
                    {
                        self.begin_connect();
                        ui.close();
                    }
                    let has_links = !self.selected_links().is_empty();
                    if ui
                        .add_enabled(has_links, egui::Button::new("Straighten links (L)"))
                        .clicked()
                    {
                        self.straighten_selected();
                        ui.close();
                    }
                    if ui
                        .add_enabled(has_links, egui::Button::new("Remove all waypoints"))
                        .clicked()
                    {
                        self.clear_selected_waypoints();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Select all (⌘A)").clicked() {
                        self.scene.select_all();
                        ui.close();
                    }
                    let has_selection = !self.scene.selection().is_empty();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Deselect all"))
                        .clicked()
                    {
                        self.scene.deselect_all();
                        ui.close();
                    }
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Delete (⌫)"))
                        .clicked()
                    {
                        self.request_delete();
                        ui.close();
                    }
                });
                ui.menu_button("View", |ui| {
                    let mut theme = self.settings.theme;
                    ui.radio_value(&mut theme, ThemeChoice::Auto, "Follow system");
                    ui.radio_value(&mut theme, ThemeChoice::Light, "Light");
                    ui.radio_value(&mut theme, ThemeChoice::Dark, "Dark");
                    if theme != self.settings.theme {
                        self.set_theme(ui.ctx(), theme);
                    }
                    ui.separator();
                    if ui.button("Reset zoom").clicked() {
                        self.view = super::View::default();
                        ui.close();
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("Shortcuts (F1)").clicked() {
                        self.show_help = true;
                        ui.close();
                    }
                    if ui.button("Command palette (⌘⇧P)").clicked() {
                        self.command_palette.open("");
                        ui.close();
                    }
                });
            });
        });

        egui::SidePanel::right("right_panel")
            .resizable(true)
            .min_width(220.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.details_panel(ui);
                });
            });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status.as_deref().unwrap_or("Ready"));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.view.zoom * 100.0));
                    ui.separator();
                    ui.label(format!(
                        "Entities: {}  Links: {}",
                        self.scene.entities().count(),
                        self.scene.links().count()
                    ));
                    ui.separator();
                    ui.label(format!("Selected: {}", self.scene.selection().len()));
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ctx, ui);
        });

        self.delete_confirmation(ctx);

        let cx = CommandContext {
            selected_len: self.scene.selection().len(),
            selected_links: self.selected_links().len(),
            can_connect: self.can_connect(),
        };
        if let Some(cmd) = self.command_palette.ui(ctx, cx) {
            CommandPalette::execute(self, ctx, cmd);
        }

        super::help::draw_help_window(ctx, &mut self.show_help);
    }
}

impl DesignerApp {
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let skip_shortcuts =
            ctx.wants_keyboard_input() || self.command_palette.open || self.pending_delete.is_some();
        let (step, step_fast) = (self.settings.move_step, self.settings.move_step_fast);
        let mut actions = Vec::new();
        ctx.input_mut(|i| {
            if !self.command_palette.open
                && i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::P)
            {
                actions.push(KeyAction::Palette);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F1) {
                actions.push(KeyAction::Help);
            }
            if skip_shortcuts {
                return;
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                actions.push(KeyAction::Save);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                actions.push(KeyAction::Open);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::A) {
                actions.push(KeyAction::SelectAll);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                actions.push(KeyAction::Escape);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
            {
                actions.push(KeyAction::Delete);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::S) {
                actions.push(KeyAction::AddStatus);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::W) {
                actions.push(KeyAction::AddWorkflow);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::C) {
                actions.push(KeyAction::Connect);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::L) {
                actions.push(KeyAction::Straighten);
            }
            let amount = if i.modifiers.shift { step_fast } else { step };
            for (key, dir) in [
                (egui::Key::ArrowLeft, egui::vec2(-1.0, 0.0)),
                (egui::Key::ArrowRight, egui::vec2(1.0, 0.0)),
                (egui::Key::ArrowUp, egui::vec2(0.0, -1.0)),
                (egui::Key::ArrowDown, egui::vec2(0.0, 1.0)),
            ] {
                if i.consume_key(egui::Modifiers::NONE, key)
                    || i.consume_key(egui::Modifiers::SHIFT, key)
                {
                    actions.push(KeyAction::Nudge(dir * amount));
                }
            }
        });

        for action in actions {
            match action {
                KeyAction::Palette => self.command_palette.open(""),
                KeyAction::Help => self.show_help = !self.show_help,
                KeyAction::Save => self.save_to_path(),
                KeyAction::Open => self.open_layout_dialog(),
                KeyAction::SelectAll => self.scene.select_all(),
                KeyAction::Escape => {
                    if self.connect_mode {
                        self.connect_mode = false;
                        self.status = Some("Connect cancelled".to_string());
                    } else {
                        self.scene.cancel_node_drags();
                        self.in_progress = None;
                        self.scene.deselect_all();
                    }
                }
                KeyAction::Delete => self.request_delete(),
                KeyAction::AddStatus => self.add_status(ctx),
                KeyAction::AddWorkflow => self.add_workflow(ctx),
                KeyAction::Connect => self.begin_connect(),
                KeyAction::Straighten => self.straighten_selected(),
                KeyAction::Nudge(delta) => {
                    if self.scene.selection().mode() == Some(SelectionMode::Entity) {
                        self.scene.move_selection_by(delta);
                    } else {
                        self.view.pan_screen -= delta * self.view.zoom;
                    }
                }
            }
        }
    }

    fn details_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Selection");
        ui.separator();
        if self.selection_items.is_empty() {
            ui.label("Nothing selected");
        }
        for item in &self.selection_items {
            match *item {
                ItemRef::Entity(id) => {
                    let Some(entity) = self.scene.entity(id) else {
                        continue;
                    };
                    let kind = match entity.kind() {
                        EntityKind::Status => "Status",
                        EntityKind::Workflow => "Workflow",
                    };
                    ui.strong(format!("{kind}: {}", entity.title));
                    ui.small(format!("key {}", entity.key));
                    let pos = entity.shape.position();
                    ui.label(format!("at ({:.1}, {:.1})", pos.x, pos.y));
                    ui.label(format!(
                        "{} outgoing, {} incoming",
                        entity.source_lines.len(),
                        entity.dest_lines.len()
                    ));
                }
                ItemRef::StatusLine(id, row) => {
                    let Some(entity) = self.scene.entity(id) else {
                        continue;
                    };
                    let Some(line) = entity.status_lines.get(row) else {
                        continue;
                    };
                    ui.strong(format!("Status row: {}", line.title));
                    ui.label(format!("in workflow {}", entity.title));
                    ui.small(format!("key {}", line.status_key));
                }
                ItemRef::Line(id) => {
                    let Some(link) = self.scene.link(id) else {
                        continue;
                    };
                    let title = |id| self.scene.entity(id).map_or("?", |e| e.title.as_str());
                    ui.strong(format!(
                        "Link: {} → {}",
                        title(link.arrow.src),
                        title(link.arrow.dst)
                    ));
                    if let Some(key) = &link.arrow.src_status_key {
                        ui.small(format!("from status {key}"));
                    }
                    if let Some(key) = &link.arrow.dst_status_key {
                        ui.small(format!("to status {key}"));
                    }
                    ui.label(format!("{} waypoint(s)", link.arrow.waypoints().len()));
                }
            }
            ui.add_space(6.0);
        }

        ui.add_space(12.0);
        ui.heading("New entity");
        ui.separator();
        ui.label("Title");
        ui.text_edit_singleline(&mut self.new_title);
        ui.label("Workflow statuses (comma separated)");
        ui.text_edit_singleline(&mut self.new_statuses);
        ui.horizontal(|ui| {
            if ui.button("Add status").clicked() {
                self.add_status(ui.ctx());
            }
            if ui.button("Add workflow").clicked() {
                self.add_workflow(ui.ctx());
            }
        });

        ui.add_space(12.0);
        ui.heading("Links");
        ui.separator();
        let mut changed = false;
        changed |= ui
            .add(egui::Slider::new(&mut self.settings.arrow_head_size, 4.0..=24.0).text("Arrowhead"))
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut self.settings.merge.angle_threshold_deg, 0.5..=20.0)
                    .text("Merge angle °"),
            )
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut self.settings.merge.distance_threshold, 1.0..=40.0)
                    .text("Merge distance"),
            )
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut self.settings.merge.global_distance_threshold, 1.0..=60.0)
                    .text("Collapse distance"),
            )
            .changed();
        if changed {
            self.scene.set_config(SceneConfig::from_settings(&self.settings));
            self.persist_settings();
        }
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let origin = rect.min;

        let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll_delta.abs() > 0.0
            && let Some(hover_pos) = ctx.input(|i| i.pointer.hover_pos())
            && rect.contains(hover_pos)
        {
            let zoom_delta = (1.0 + scroll_delta * 0.001).clamp(0.8, 1.25);
            self.view.zoom_about_screen_point(origin, hover_pos, zoom_delta);
        }
        if response.dragged_by(egui::PointerButton::Middle) {
            self.view.pan_screen += response.drag_delta();
        }

        let pointer_pos = ctx.input(|i| i.pointer.interact_pos());
        let pointer_world = pointer_pos.map(|p| self.view.screen_to_world(origin, p));
        let threshold_world = 6.0 / self.view.zoom;
        if pointer_pos.is_some_and(|p| rect.contains(p)) {
            self.last_pointer_world = pointer_world;
        }

        if self.in_progress.is_none() {
            self.update_hover(pointer_world, threshold_world);
        }

        let pressed = response.drag_started_by(egui::PointerButton::Primary) || response.clicked();
        let released = response.drag_stopped_by(egui::PointerButton::Primary) || response.clicked();

        if pressed {
            let press_world = ctx
                .input(|i| i.pointer.press_origin())
                .map(|p| self.view.screen_to_world(origin, p))
                .or(pointer_world);
            if let Some(world_pos) = press_world {
                let modifier =
                    ctx.input(|i| i.modifiers.command || i.modifiers.ctrl || i.modifiers.shift);
                self.on_press(world_pos, threshold_world, modifier);
            }
        }

        if response.dragged_by(egui::PointerButton::Primary)
            && let Some(world_pos) = pointer_world
        {
            match &mut self.in_progress {
                Some(InProgress::DragNode(link)) => match self.scene.drag_node(*link, world_pos) {
                    DragOutcome::Rejected => {
                        self.status = Some("Waypoint position rejected".to_string());
                    }
                    DragOutcome::Split { .. } => {
                        self.status = Some("Inserted waypoint".to_string());
                    }
                    DragOutcome::Moved | DragOutcome::Ignored => {}
                },
                Some(InProgress::DragEntities { last }) => {
                    self.scene.move_selection_by(world_pos - *last);
                    *last = world_pos;
                }
                Some(InProgress::SelectBox { current, .. }) => *current = world_pos,
                None => {}
            }
        }

        if released {
            match self.in_progress.take() {
                Some(InProgress::DragNode(link)) => {
                    if let Some(outcome) = self.scene.release_node(link)
                        && !outcome.is_empty()
                    {
                        self.status = Some(format!("Merged {} waypoint(s)", outcome.removed.len()));
                    }
                }
                Some(InProgress::SelectBox { start, current }) => {
                    let r = egui::Rect::from_two_pos(start, current);
                    if r.width() > 1.0 || r.height() > 1.0 {
                        let items = self.scene.items_in_rect(r);
                        self.scene.add_items_to_selection(items);
                    }
                }
                Some(InProgress::DragEntities { .. }) | None => {}
            }
        }

        // A release that happened outside the window never reaches us.
        let lost_release = self.in_progress.is_some()
            && !ctx.input(|i| i.pointer.primary_down() && i.focused);
        if lost_release {
            self.scene.cancel_node_drags();
            self.in_progress = None;
        }

        if response.secondary_clicked() {
            self.context_world_pos = pointer_world;
            self.context_hit = pointer_world.and_then(|p| match self.scene.hit_test(p, threshold_world) {
                Some(HitTarget::Item(item)) => Some(item),
                _ => None,
            });
            if let Some(item) = self.context_hit
                && !self.scene.selection().is_selected(item)
            {
                self.scene.select_item(item, false);
            }
        }
        response.context_menu(|ui| self.context_menu(ui));

        if self.connect_mode {
            ctx.set_cursor_icon(egui::CursorIcon::Crosshair);
        } else if self.hovered_node.is_some() {
            ctx.set_cursor_icon(egui::CursorIcon::Grab);
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.view);
        draw_scene(&painter, origin, &self.view, &self.scene);
        draw_in_progress(
            &painter,
            origin,
            &self.view,
            self.in_progress.as_ref(),
            self.scene.selection().selection_color(),
        );
    }

    fn context_menu(&mut self, ui: &mut egui::Ui) {
        let Some(world_pos) = self.context_world_pos else {
            ui.close();
            return;
        };
        ui.label(position_label(world_pos));
        ui.separator();
        if ui.button("Add status here").clicked() {
            self.add_status_at(world_pos);
            ui.close();
        }
        if ui.button("Add workflow here").clicked() {
            self.add_workflow_at(world_pos);
            ui.close();
        }
        let Some(hit) = self.context_hit else {
            return;
        };
        ui.separator();
        if let ItemRef::Line(link) = hit {
            let bent = self.scene.link(link).is_some_and(|l| !l.arrow.waypoints().is_empty());
            if ui.add_enabled(bent, egui::Button::new("Straighten link")).clicked() {
                self.straighten_selected();
                ui.close();
            }
            if ui.add_enabled(bent, egui::Button::new("Remove all waypoints")).clicked() {
                self.clear_selected_waypoints();
                ui.close();
            }
        } else if ui
            .add_enabled(self.can_connect(), egui::Button::new("Connect selection to..."))
            .clicked()
        {
            self.begin_connect();
            ui.close();
        }
        if ui.button("Delete").clicked() {
            self.request_delete();
            ui.close();
        }
    }

    fn update_hover(&mut self, pointer_world: Option<egui::Pos2>, threshold_world: f32) {
        let hovered = pointer_world.and_then(|p| match self.scene.hit_test(p, threshold_world) {
            Some(HitTarget::Node(link, handle)) => Some((link, handle)),
            _ => None,
        });
        if hovered == self.hovered_node {
            return;
        }
        if let Some((link, _)) = self.hovered_node {
            self.scene.hover_node(link, None);
        }
        if let Some((link, handle)) = hovered {
            self.scene.hover_node(link, Some(handle));
        }
        self.hovered_node = hovered;
    }

    fn on_press(&mut self, world_pos: egui::Pos2, threshold_world: f32, modifier: bool) {
        let hit = self.scene.hit_test(world_pos, threshold_world);
        if self.connect_mode {
            match hit {
                Some(HitTarget::Item(item)) => self.finish_connect(item),
                _ => {
                    self.connect_mode = false;
                    self.status = Some("Connect cancelled".to_string());
                }
            }
            return;
        }
        match hit {
            Some(HitTarget::Node(link, handle)) => {
                if self.scene.press_node(link, handle) {
                    self.in_progress = Some(InProgress::DragNode(link));
                }
            }
            Some(HitTarget::Item(item)) => {
                if modifier {
                    self.scene.select_item(item, true);
                } else {
                    if !self.scene.selection().is_selected(item) {
                        self.scene.select_item(item, false);
                    }
                    if !matches!(item, ItemRef::Line(_)) {
                        self.in_progress = Some(InProgress::DragEntities { last: world_pos });
                    }
                }
            }
            None => {
                if !modifier {
                    self.scene.deselect_all();
                }
                self.in_progress = Some(InProgress::SelectBox {
                    start: world_pos,
                    current: world_pos,
                });
            }
        }
    }

    fn delete_confirmation(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.pending_delete else {
            return;
        };
        let mut confirm = false;
        let mut cancel = false;
        egui::Window::new("Delete selection?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                let impact = pending.impact;
                ui.label(format!(
                    "{} workflow(s) and {} status(es) will be deleted.",
                    impact.workflows, impact.statuses
                ));
                ui.label(format!(
                    "{} connected link(s) go with them.",
                    impact.links
                ));
                if pending.lines > 0 {
                    ui.label(format!("{} selected link(s) are deleted as well.", pending.lines));
                }
                ui.horizontal(|ui| {
                    confirm = ui.button("Delete").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });
        if confirm {
            self.delete_selected();
        } else if cancel || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.pending_delete = None;
        }
    }
}

/// World coordinates shown at the top of the canvas context menu.
fn position_label(world_pos: egui::Pos2) -> String {
    format!("Position: ({:.0}, {:.0})", world_pos.x, world_pos.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_menu_reports_rounded_world_position() {
        assert_eq!(position_label(egui::pos2(120.4, 79.6)), "Position: (120, 80)");
        assert_eq!(position_label(egui::pos2(-35.0, 2.0)), "Position: (-35, 2)");
    }
}
