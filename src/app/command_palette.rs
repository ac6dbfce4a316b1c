use eframe::egui;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use wfdesigner::settings::ThemeChoice;

use super::DesignerApp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CommandId {
    AddStatus,
    AddWorkflow,
    Connect,
    Delete,
    SelectAll,
    DeselectAll,
    StraightenLinks,
    RemoveWaypoints,
    SaveLayout,
    SaveLayoutAs,
    OpenLayout,
    ReloadLayout,
    ThemeAuto,
    ThemeLight,
    ThemeDark,
    ReloadSettings,
    Help,
}

pub(super) struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub search: &'static str,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec { id: CommandId::AddStatus, name: "Add: Status", search: "add new status circle s" },
    CommandSpec { id: CommandId::AddWorkflow, name: "Add: Workflow", search: "add new workflow box w" },
    CommandSpec { id: CommandId::Connect, name: "Edit: Connect selection to...", search: "connect link arrow c" },
    CommandSpec { id: CommandId::Delete, name: "Edit: Delete", search: "delete remove" },
    CommandSpec { id: CommandId::SelectAll, name: "Select: All", search: "select all" },
    CommandSpec { id: CommandId::DeselectAll, name: "Select: None", search: "deselect none clear selection" },
    CommandSpec { id: CommandId::StraightenLinks, name: "Link: Straighten", search: "straighten merge waypoints link l" },
    CommandSpec { id: CommandId::RemoveWaypoints, name: "Link: Remove all waypoints", search: "remove clear waypoints link reset" },
    CommandSpec { id: CommandId::SaveLayout, name: "File: Save", search: "save file layout json" },
    CommandSpec { id: CommandId::SaveLayoutAs, name: "File: Save as...", search: "save as file layout json" },
    CommandSpec { id: CommandId::OpenLayout, name: "File: Open...", search: "open load file layout json" },
    CommandSpec { id: CommandId::ReloadLayout, name: "File: Reload", search: "reload revert file layout" },
    CommandSpec { id: CommandId::ThemeAuto, name: "Theme: Follow system", search: "theme auto system" },
    CommandSpec { id: CommandId::ThemeLight, name: "Theme: Light", search: "theme light warm" },
    CommandSpec { id: CommandId::ThemeDark, name: "Theme: Dark", search: "theme dark cool" },
    CommandSpec { id: CommandId::ReloadSettings, name: "Settings: Reload", search: "settings reload config" },
    CommandSpec { id: CommandId::Help, name: "Help: Shortcuts", search: "help keys shortcuts" },
];

#[derive(Default)]
pub(super) struct CommandPalette {
    pub open: bool,
    pub query: String,
    pub selected: usize,
    request_focus: bool,
}

#[derive(Clone, Copy)]
pub(super) struct CommandContext {
    pub selected_len: usize,
    pub selected_links: usize,
    pub can_connect: bool,
}

impl CommandPalette {
    pub fn open(&mut self, query: impl Into<String>) {
        self.open = true;
        self.query = query.into();
        self.selected = 0;
        self.request_focus = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.selected = 0;
        self.request_focus = false;
    }

    fn is_enabled(cx: CommandContext, id: CommandId) -> bool {
        match id {
            CommandId::Delete | CommandId::DeselectAll => cx.selected_len > 0,
            CommandId::Connect => cx.can_connect,
            CommandId::StraightenLinks | CommandId::RemoveWaypoints => cx.selected_links > 0,
            _ => true,
        }
    }

    pub(super) fn execute(app: &mut DesignerApp, ctx: &egui::Context, id: CommandId) {
        match id {
            CommandId::AddStatus => app.add_status(ctx),
            CommandId::AddWorkflow => app.add_workflow(ctx),
            CommandId::Connect => app.begin_connect(),
            CommandId::Delete => app.request_delete(),
            CommandId::SelectAll => app.scene.select_all(),
            CommandId::DeselectAll => app.scene.deselect_all(),
            CommandId::StraightenLinks => app.straighten_selected(),
            CommandId::RemoveWaypoints => app.clear_selected_waypoints(),
            CommandId::SaveLayout => app.save_to_path(),
            CommandId::SaveLayoutAs => app.save_layout_dialog(),
            CommandId::OpenLayout => app.open_layout_dialog(),
            CommandId::ReloadLayout => app.load_from_path(),
            CommandId::ThemeAuto => app.set_theme(ctx, ThemeChoice::Auto),
            CommandId::ThemeLight => app.set_theme(ctx, ThemeChoice::Light),
            CommandId::ThemeDark => app.set_theme(ctx, ThemeChoice::Dark),
            CommandId::ReloadSettings => app.reload_settings(ctx),
            CommandId::Help => app.show_help = true,
        }
        ctx.request_repaint();
    }

    fn filtered(&self) -> Vec<(&'static CommandSpec, i64)> {
        let matcher = SkimMatcherV2::default();
        let q = self.query.trim();
        if q.is_empty() {
            return COMMANDS.iter().map(|c| (c, 0)).collect();
        }
        let mut out: Vec<_> = COMMANDS
            .iter()
            .filter_map(|c| matcher.fuzzy_match(c.search, q).map(|score| (c, score)))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(b.0.name)));
        out
    }

    pub fn ui(&mut self, ctx: &egui::Context, cx: CommandContext) -> Option<CommandId> {
        if !self.open {
            return None;
        }
        let matches = self.filtered();
        if self.selected >= matches.len() {
            self.selected = matches.len().saturating_sub(1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.close();
            return None;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowDown)) && !matches.is_empty() {
            self.selected = (self.selected + 1).min(matches.len() - 1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowUp)) && !matches.is_empty() {
            self.selected = self.selected.saturating_sub(1);
        }
        let mut run_selected = ctx.input(|i| i.key_pressed(egui::Key::Enter));

        let screen = ctx.content_rect();
        let width = 480.0;
        let height = 300.0;
        let pos = egui::pos2(screen.center().x - width * 0.5, screen.top() + 48.0);
        egui::Area::new(egui::Id::new("command_palette"))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::popup(ui.style()).inner_margin(10.0);
                frame.show(ui, |ui| {
                    ui.set_min_size(egui::vec2(width, height));
                    let resp = ui.add(
                        egui::TextEdit::singleline(&mut self.query)
                            .desired_width(f32::INFINITY)
                            .hint_text("Search commands"),
                    );
                    if self.request_focus {
                        resp.request_focus();
                        self.request_focus = false;
                    }
                    ui.separator();
                    egui::ScrollArea::vertical().max_height(height - 64.0).show(ui, |ui| {
                        for (idx, (spec, _score)) in matches.iter().enumerate() {
                            let enabled = CommandPalette::is_enabled(cx, spec.id);
                            let resp = ui.add_enabled(
                                enabled,
                                egui::Button::new(spec.name).selected(idx == self.selected),
                            );
                            if resp.clicked() {
                                self.selected = idx;
                                run_selected = true;
                            }
                        }
                    });
                });
            });

        if run_selected
            && let Some((spec, _)) = matches.get(self.selected)
            && CommandPalette::is_enabled(cx, spec.id)
        {
            let cmd = spec.id;
            self.close();
            return Some(cmd);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(query: &str) -> CommandPalette {
        let mut p = CommandPalette::default();
        p.open(query);
        p
    }

    #[test]
    fn empty_query_lists_every_command() {
        assert_eq!(palette("").filtered().len(), COMMANDS.len());
    }

    #[test]
    fn fuzzy_query_finds_straighten() {
        let hits = palette("straight").filtered();
        assert_eq!(hits.first().map(|(c, _)| c.id), Some(CommandId::StraightenLinks));
    }

    #[test]
    fn link_commands_need_selected_links() {
        let cx = CommandContext {
            selected_len: 1,
            selected_links: 0,
            can_connect: true,
        };
        assert!(!CommandPalette::is_enabled(cx, CommandId::StraightenLinks));
        assert!(CommandPalette::is_enabled(cx, CommandId::Connect));
        assert!(CommandPalette::is_enabled(cx, CommandId::Delete));
    }
}
