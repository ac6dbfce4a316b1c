use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help & Commands")
        .open(open)
        .resizable(true)
        .default_width(520.0)
        .default_height(460.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();

                ui.label("General");
                help_row(ui, "⌘⇧P", "Open command palette");
                help_row(ui, "F1", "Toggle this window");
                help_row(ui, "⌘S", "Save layout");
                help_row(ui, "⌘O", "Open layout");
                help_row(ui, "Escape", "Cancel connect / clear selection");

                ui.add_space(10.0);
                ui.label("Editing");
                help_row(ui, "S", "Add status at the pointer");
                help_row(ui, "W", "Add workflow at the pointer");
                help_row(ui, "C", "Connect selection to the next clicked item");
                help_row(ui, "L", "Straighten selected links");
                help_row(ui, "⌘A", "Select all entities");
                help_row(ui, "Delete / Backspace", "Delete selected");
                help_row(ui, "Arrow keys", "Move selection or pan canvas");
                help_row(ui, "Shift + Arrow keys", "Move selection faster");

                ui.add_space(10.0);
                ui.label("Mouse");
                help_row(ui, "Click", "Select an entity, status row or link");
                help_row(ui, "⌘/Ctrl + click", "Toggle in selection");
                help_row(ui, "Drag on empty canvas", "Rubber-band select");
                help_row(ui, "Right click", "Add here, or act on the clicked item");
                help_row(ui, "Middle drag", "Pan");
                help_row(ui, "Scroll wheel", "Zoom in/out");

                ui.add_space(20.0);
                ui.heading("Link Handles");
                ui.separator();
                ui.label("Selecting a link shows its handles.");
                ui.label("• Circles are waypoints: drag them to bend the link.");
                ui.label("• Squares sit on segment midpoints: drag one to insert a waypoint.");
                ui.label("• On release, waypoints that sit on a straight run are merged away.");

                ui.add_space(20.0);
                ui.heading("Files");
                ui.separator();
                ui.label("• Layouts are JSON files listing entities and links with their waypoints");
                ui.label("• Settings are read from ~/.config/wfdesigner.toml or settings.toml");
                ui.label("• Set RUST_LOG or log_filter in settings to change log verbosity");
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [140.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}
