//! Reads a [`Document`] from TOML or JSON.
//!
//! Parse failures are returned as produced by the underlying parser.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::description::Document;

/// Errors that can arise while reading a description.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML model description: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON model description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported model description format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl Document {
    pub fn from_toml_str(raw: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Load a description, choosing the format from the file extension
/// (`.toml` or `.json`).
pub fn load(path: &Path) -> Result<Document, LoadError> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Format::Toml,
        Some("json") => Format::Json,
        _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    };
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = raw.len(), "read model description");
    match format {
        Format::Toml => Document::from_toml_str(&raw),
        Format::Json => Document::from_json_str(&raw),
    }
}

enum Format {
    Toml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfgraph_types::JointType;

    const ARM: &str = r#"
[[world]]
name = "lab"

[[world.model]]
name = "arm"
static = true

[[world.model.link]]
name = "base"

[[world.model.link]]
name = "forearm"
pose = { translation = [0.0, 0.0, 0.3] }

[[world.model.joint]]
name = "elbow"
type = "revolute"
parent = "base"
child = "forearm"
axis = { xyz = [0.0, 1.0, 0.0], limit = { lower = -1.5, upper = 1.5 } }
"#;

    #[test]
    fn parses_toml_hierarchy() {
        let doc = Document::from_toml_str(ARM).unwrap();
        assert_eq!(doc.worlds.len(), 1);
        let arm = &doc.worlds[0].models[0];
        assert!(arm.is_static);
        assert_eq!(arm.links.len(), 2);
        assert_eq!(arm.links[1].pose.translation.z, 0.3);
        let elbow = &arm.joints[0];
        assert_eq!(elbow.joint_type, JointType::Revolute);
        assert_eq!(elbow.range(), (-1.5, 1.5));
    }

    #[test]
    fn parses_json() {
        let doc = Document::from_json_str(
            r#"{"model": [{"name": "m", "link": [{"name": "l"}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.models[0].links[0].name, "l");
        assert!(!doc.models[0].is_static);
    }

    #[test]
    fn joint_without_child_is_a_parse_error() {
        let err = Document::from_json_str(
            r#"{"model": [{"name": "m", "joint": [{"name": "j", "type": "fixed", "parent": "a"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
        assert!(err.to_string().contains("child"));
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("arm.toml");
        fs::write(&path, ARM).unwrap();
        let doc = load(&path).unwrap();
        assert_eq!(doc.worlds[0].name, "lab");
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = load(Path::new("robot.urdf")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
