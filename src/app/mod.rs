use eframe::egui;
use std::sync::mpsc;
use wfdesigner::model::LinkId;
use wfdesigner::nodes::NodeHandle;
use wfdesigner::scene::ImpactSummary;
use wfdesigner::selection::{ItemRef, SelectionChanged, SelectionMode};
use wfdesigner::settings::{AppSettings, ThemeChoice};
use wfdesigner::{Scene, SceneConfig, layout};

mod actions;
mod command_palette;
mod help;
mod render;
mod update;

#[derive(Clone, Debug)]
enum InProgress {
    SelectBox {
        start: egui::Pos2,
        current: egui::Pos2,
    },
    DragEntities {
        last: egui::Pos2,
    },
    DragNode(LinkId),
}

#[derive(Clone, Copy, Debug)]
struct View {
    pan_screen: egui::Vec2,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl View {
    fn world_to_screen(&self, origin: egui::Pos2, world: egui::Pos2) -> egui::Pos2 {
        origin + self.pan_screen + world.to_vec2() * self.zoom
    }

    fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.pan_screen) / self.zoom).to_pos2()
    }

    fn rect_to_screen(&self, origin: egui::Pos2, world: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_max(
            self.world_to_screen(origin, world.min),
            self.world_to_screen(origin, world.max),
        )
    }

    fn zoom_about_screen_point(
        &mut self,
        origin: egui::Pos2,
        screen_point: egui::Pos2,
        zoom_delta: f32,
    ) {
        let before = self.screen_to_world(origin, screen_point);
        self.zoom = (self.zoom * zoom_delta).clamp(0.1, 8.0);
        let after_screen = self.world_to_screen(origin, before);
        self.pan_screen += screen_point - after_screen;
    }
}

/// Deletion waiting for the user to confirm the cascade.
#[derive(Clone, Copy, Debug)]
struct PendingDelete {
    impact: ImpactSummary,
    lines: usize,
}

pub struct DesignerApp {
    scene: Scene,
    view: View,
    in_progress: Option<InProgress>,
    hovered_node: Option<(LinkId, NodeHandle)>,
    last_pointer_world: Option<egui::Pos2>,
    context_world_pos: Option<egui::Pos2>,
    context_hit: Option<ItemRef>,
    selection_events: mpsc::Receiver<SelectionChanged>,
    selection_items: Vec<ItemRef>,
    selection_mode: Option<SelectionMode>,
    connect_mode: bool,
    pending_delete: Option<PendingDelete>,
    new_title: String,
    new_statuses: String,
    settings: AppSettings,
    settings_path: String,
    status: Option<String>,
    command_palette: command_palette::CommandPalette,
    show_help: bool,
}

impl DesignerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings_path: String, settings: AppSettings) -> Self {
        apply_visuals(&cc.egui_ctx, settings.theme);
        let theme = settings.theme.resolve(&cc.egui_ctx.style().visuals);
        let config = SceneConfig::from_settings(&settings);

        let mut status = None;
        let mut scene = if std::path::Path::new(&settings.layout_path).exists() {
            match layout::load_layout(&settings.layout_path)
                .and_then(|doc| Ok(Scene::from_layout(&doc, config, theme)?))
            {
                Ok(scene) => {
                    status = Some(format!("Loaded {}", settings.layout_path));
                    scene
                }
                Err(e) => {
                    tracing::error!(path = %settings.layout_path, "layout load failed: {e}");
                    status = Some(format!("Load failed: {e}"));
                    Scene::new(config, theme)
                }
            }
        } else {
            Scene::new(config, theme)
        };
        let selection_events = scene.subscribe_selection();

        Self {
            scene,
            view: View::default(),
            in_progress: None,
            hovered_node: None,
            last_pointer_world: None,
            context_world_pos: None,
            context_hit: None,
            selection_events,
            selection_items: Vec::new(),
            selection_mode: None,
            connect_mode: false,
            pending_delete: None,
            new_title: "New".to_string(),
            new_statuses: "Open, In Progress, Done".to_string(),
            settings,
            settings_path,
            status,
            command_palette: command_palette::CommandPalette::default(),
            show_help: false,
        }
    }

    /// Swaps in a freshly loaded scene; the old selection channel dies with
    /// the old scene.
    pub(super) fn replace_scene(&mut self, mut scene: Scene) {
        self.selection_events = scene.subscribe_selection();
        self.scene = scene;
        self.in_progress = None;
        self.hovered_node = None;
        self.context_hit = None;
        self.connect_mode = false;
        self.pending_delete = None;
        self.selection_items.clear();
        self.selection_mode = None;
    }

    pub(super) fn drain_selection_events(&mut self) {
        while let Ok(event) = self.selection_events.try_recv() {
            self.selection_items = event.items;
            self.selection_mode = event.mode;
        }
    }
}

pub(super) fn apply_visuals(ctx: &egui::Context, theme: ThemeChoice) {
    match theme {
        ThemeChoice::Auto => {}
        ThemeChoice::Light => ctx.set_visuals(egui::Visuals::light()),
        ThemeChoice::Dark => ctx.set_visuals(egui::Visuals::dark()),
    }
}
