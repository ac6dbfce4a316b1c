use crate::arrow::DEFAULT_HEAD_SIZE;
use crate::error::SettingsError;
use crate::nodes::MergeSettings;
use crate::selection::ThemeContext;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    /// Follow the background of the host window.
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeChoice {
    pub fn resolve(self, visuals: &eframe::egui::Visuals) -> ThemeContext {
        match self {
            ThemeChoice::Auto => ThemeContext::from_visuals(visuals),
            ThemeChoice::Light => ThemeContext::light(),
            ThemeChoice::Dark => ThemeContext::dark(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub layout_path: String,
    pub theme: ThemeChoice,
    pub log_filter: String,
    pub arrow_head_size: f32,
    pub merge: MergeSettings,
    pub node_hit_radius: f32,
    pub move_step: f32,
    pub move_step_fast: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            layout_path: "layout.json".to_string(),
            theme: ThemeChoice::Auto,
            log_filter: "info".to_string(),
            arrow_head_size: DEFAULT_HEAD_SIZE,
            merge: MergeSettings::default(),
            node_hit_radius: 6.0,
            move_step: 1.0,
            move_step_fast: 10.0,
        }
    }
}

/// `~/.config/wfdesigner.toml` if present, else `settings.toml` in the
/// working directory if present.
pub fn config_path() -> Option<String> {
    if let Some(home) = std::env::var_os("HOME") {
        let path = std::path::PathBuf::from(home)
            .join(".config")
            .join("wfdesigner.toml");
        if path.exists() {
            return Some(path.display().to_string());
        }
    }
    if std::path::Path::new("settings.toml").exists() {
        return Some("settings.toml".to_string());
    }
    None
}

pub fn load_settings(path: &str) -> Option<AppSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    parse_settings(&s, path.ends_with(".toml"))
}

fn parse_settings(s: &str, toml_first: bool) -> Option<AppSettings> {
    if toml_first {
        toml::from_str::<AppSettings>(s)
            .ok()
            .or_else(|| serde_json::from_str::<AppSettings>(s).ok())
    } else {
        serde_json::from_str::<AppSettings>(s)
            .ok()
            .or_else(|| toml::from_str::<AppSettings>(s).ok())
    }
}

/// Writes TOML for `.toml` paths and JSON for anything else.
pub fn save_settings(path: &str, settings: &AppSettings) -> Result<(), SettingsError> {
    let text = if path.ends_with(".toml") {
        toml::to_string_pretty(settings)?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text).map_err(|source| SettingsError::Io {
        path: path.into(),
        source,
    })?;
    tracing::debug!(path, "saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = parse_settings(
            "theme = \"dark\"\narrow_head_size = 12.0\n\n[merge]\nangle_threshold_deg = 3.0\n",
            true,
        )
        .unwrap();
        assert_eq!(settings.theme, ThemeChoice::Dark);
        assert_eq!(settings.arrow_head_size, 12.0);
        assert_eq!(settings.merge.angle_threshold_deg, 3.0);
        assert_eq!(settings.merge.distance_threshold, 10.0);
        assert_eq!(settings.layout_path, "layout.json");
    }

    #[test]
    fn json_is_accepted_as_fallback() {
        let settings = parse_settings(r#"{"node_hit_radius": 9.0}"#, true).unwrap();
        assert_eq!(settings.node_hit_radius, 9.0);
        assert_eq!(settings.theme, ThemeChoice::Auto);
    }

    #[test]
    fn settings_survive_a_save() {
        let path = std::env::temp_dir().join(format!("wfdesigner-{}.toml", uuid::Uuid::new_v4()));
        let path = path.display().to_string();
        let mut settings = AppSettings::default();
        settings.theme = ThemeChoice::Light;
        settings.merge.global_distance_threshold = 20.0;
        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn json_path_saves_json() {
        let path = std::env::temp_dir().join(format!("wfdesigner-{}.json", uuid::Uuid::new_v4()));
        let path = path.display().to_string();
        save_settings(&path, &AppSettings::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(text.trim_start().starts_with('{'));
        assert_eq!(parse_settings(&text, false), Some(AppSettings::default()));
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let err = save_settings("/definitely/not/here/settings.toml", &AppSettings::default())
            .unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here/settings.toml"));
    }
}
