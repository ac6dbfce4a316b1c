//! Workflow diagram engine: entities, multi-segment links with draggable
//! waypoints, selection and deletion. The `wfdesigner` binary puts an
//! eframe canvas on top of it.

pub mod arrow;
pub mod edge;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod link;
pub mod model;
pub mod nodes;
pub mod scene;
pub mod selection;
pub mod settings;
pub mod shape;
pub mod waypoint;

pub use error::{LayoutError, SceneError, SettingsError};
pub use scene::{Scene, SceneConfig};
