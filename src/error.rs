use crate::model::EntityId;
use crate::selection::ItemRef;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("Entity key '{0}' is used more than once")]
    DuplicateKey(String),

    #[error("Link '{source_key}' -> '{dest_key}' references unknown key '{key}'")]
    UnknownEndpoint {
        key: String,
        source_key: String,
        dest_key: String,
    },

    #[error("Workflow '{workflow}' has no status '{status_key}'")]
    UnknownStatusKey { workflow: String, status_key: String },

    #[error("Entity {0:?} does not exist")]
    UnknownEntity(EntityId),

    #[error("Cannot connect '{0}' to itself")]
    SelfConnection(String),

    #[error("{0:?} cannot be a link endpoint")]
    NotConnectable(ItemRef),
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to access layout file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid layout document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to write settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot encode settings as TOML: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Cannot encode settings as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SceneResult<T> = Result<T, SceneError>;
