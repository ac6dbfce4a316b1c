use eframe::egui;
use serde::{Deserialize, Serialize};

/// Arena index of an entity inside a [`crate::scene::Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

/// Arena index of a link (line group) inside a [`crate::scene::Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(pub u64);

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Deserialize)]
struct RectFields {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl From<RectFields> for Rect {
    fn from(r: RectFields) -> Self {
        Rect::new(r.left, r.top, r.width, r.height)
    }
}

/// Axis-aligned box an entity is created from. Never mutated: a dragged
/// entity keeps its live position in its [`crate::shape::Shape`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "RectFields")]
pub struct Rect {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn rx(&self) -> f32 {
        self.width * 0.5
    }

    pub fn ry(&self) -> f32 {
        self.height * 0.5
    }

    pub fn cx(&self) -> f32 {
        self.left + self.rx()
    }

    pub fn cy(&self) -> f32 {
        self.top + self.ry()
    }

    pub fn center(&self) -> egui::Pos2 {
        egui::pos2(self.cx(), self.cy())
    }

    pub fn to_rect(self) -> egui::Rect {
        egui::Rect::from_min_size(
            egui::pos2(self.left, self.top),
            egui::vec2(self.width, self.height),
        )
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        let a = if hex.len() == 8 {
            u8::from_str_radix(&hex[6..8], 16).ok()?
        } else {
            255
        };
        Some(Self { r, g, b, a })
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Perceived brightness in `0.0..=1.0`.
    pub fn luminance(self) -> f32 {
        (self.r as f32 * 0.299 + self.g as f32 * 0.587 + self.b as f32 * 0.114) / 255.0
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Rgba::rgb(30, 30, 30),
            width: 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Style {
    pub stroke: StrokeStyle,
    pub fill: Rgba,
    pub text_color: Rgba,
    pub text_size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke: StrokeStyle::default(),
            fill: Rgba::rgb(255, 255, 255),
            text_color: Rgba::rgb(30, 30, 30),
            text_size: 12.0,
        }
    }
}

impl Style {
    pub fn default_for_status() -> Self {
        Self {
            fill: Rgba::rgb(214, 234, 248),
            ..Self::default()
        }
    }

    pub fn default_for_workflow() -> Self {
        Self {
            fill: Rgba::rgb(252, 243, 207),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Status,
    Workflow,
}

/// Entity as handed over by the loader.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub key: String,
    pub kind: EntityKind,
    pub rect: Rect,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_titles: Vec<String>,
    /// Keys matching `status_titles` by index. Missing entries get fresh keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
}

/// Directed link as handed over by the loader, and as written back.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub source_key: String,
    pub dest_key: String,
    #[serde(default)]
    pub waypoints: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_status_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_status_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LayoutDocument {
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}
