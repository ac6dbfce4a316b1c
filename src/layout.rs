//! Layout files: the JSON form of [`LayoutDocument`].

use crate::error::LayoutError;
use crate::model::LayoutDocument;
use std::path::Path;

pub fn parse_layout(s: &str) -> Result<LayoutDocument, LayoutError> {
    Ok(serde_json::from_str(s)?)
}

pub fn load_layout(path: impl AsRef<Path>) -> Result<LayoutDocument, LayoutError> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = parse_layout(&s)?;
    tracing::info!(
        path = %path.display(),
        entities = doc.entities.len(),
        links = doc.links.len(),
        "loaded layout"
    );
    Ok(doc)
}

pub fn save_layout(path: impl AsRef<Path>, doc: &LayoutDocument) -> Result<(), LayoutError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, json).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "saved layout");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, Point};

    const SAMPLE: &str = r#"{
        "entities": [
            {"key": "a", "kind": "Status", "rect": {"left": 0, "top": 0, "width": 50, "height": 50}, "title": "Open"},
            {"key": "b", "kind": "Workflow", "rect": {"left": 200, "top": 0, "width": 100, "height": 80},
             "title": "Review", "statusTitles": ["Draft"]}
        ],
        "links": [
            {"sourceKey": "a", "destKey": "b", "waypoints": [{"x": 120.5, "y": 40.25}, {"x": 150, "y": 60}]}
        ]
    }"#;

    #[test]
    fn sample_document_parses() {
        let doc = parse_layout(SAMPLE).unwrap();
        assert_eq!(doc.entities.len(), 2);
        assert_eq!(doc.entities[1].kind, EntityKind::Workflow);
        assert_eq!(doc.entities[1].status_titles, vec!["Draft".to_string()]);
        assert_eq!(
            doc.links[0].waypoints,
            vec![Point::new(120.5, 40.25), Point::new(150.0, 60.0)]
        );
    }

    #[test]
    fn saved_file_loads_back_unchanged() {
        let doc = parse_layout(SAMPLE).unwrap();
        let path = std::env::temp_dir().join(format!("wfdesigner-layout-{}.json", uuid::Uuid::new_v4()));
        save_layout(&path, &doc).unwrap();
        let loaded = load_layout(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, doc);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_layout("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LayoutError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_layout("{\"entities\": 3}"), Err(LayoutError::Json(_))));
    }
}
