mod app;

use tracing_subscriber::EnvFilter;
use wfdesigner::settings;

fn main() -> eframe::Result<()> {
    let settings_path = settings::config_path().unwrap_or_else(|| "settings.toml".to_string());
    let settings = settings::load_settings(&settings_path)
        .or_else(|| settings::load_settings("settings.json"))
        .unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(path = %settings_path, "settings loaded");

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Workflow Designer",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::DesignerApp::new(cc, settings_path, settings)))),
    )
}
