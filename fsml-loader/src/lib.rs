//! # fsml-loader
//!
//! Turns model documents into resolved [`fsml_core::Statemachine`] values.
//!
//! Documents are JSON or YAML; see [`document`] for the layout and
//! [`syntax`] for the expression grammar.

pub mod document;
pub mod error;
pub mod syntax;

pub use document::{ActionDoc, AttributeDoc, ExprSource, ModelDocument, StateDoc, TransitionDoc};
pub use error::LoadError;
pub use syntax::{parse_expr, parse_print_value};

use fsml_core::Statemachine;
use std::path::Path;

/// On-disk document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Picks the format from a file extension. Anything that is not
    /// `.yaml`/`.yml` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// Loads and resolves a model from a JSON document.
pub fn from_json_str(s: &str) -> Result<Statemachine, LoadError> {
    ModelDocument::from_json_str(s)?.into_model()
}

/// Loads and resolves a model from a YAML document.
pub fn from_yaml_str(s: &str) -> Result<Statemachine, LoadError> {
    ModelDocument::from_yaml_str(s)?.into_model()
}

/// Loads and resolves a model file.
pub fn load_path(path: impl AsRef<Path>) -> Result<Statemachine, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let format = DocumentFormat::from_path(path);
    tracing::debug!("loading {:?} as {:?}", path, format);

    match format {
        DocumentFormat::Json => from_json_str(&content),
        DocumentFormat::Yaml => from_yaml_str(&content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const YAML_MODEL: &str = r#"
name: Door
events: [open, close]
initial: Closed
states:
  - name: Closed
    transitions:
      - { event: open, target: Opened }
  - name: Opened
    transitions:
      - { event: close, target: Closed }
"#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("m.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("m.YML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("m.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("model")), DocumentFormat::Json);
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML_MODEL.as_bytes()).unwrap();

        let model = load_path(file.path()).unwrap();
        assert_eq!(model.name, "Door");
        assert_eq!(model.states.len(), 2);
        assert_eq!(model.events_from("Closed"), vec!["open"]);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(
            br#"{"name": "M", "events": ["e"], "initial": "A",
                 "states": [{"name": "A", "transitions": [{"event": "e", "target": "A"}]}]}"#,
        )
        .unwrap();

        let model = load_path(file.path()).unwrap();
        assert_eq!(model.initial, "A");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_path(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_yaml_read_as_json_fails() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(YAML_MODEL.as_bytes()).unwrap();
        let err = load_path(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "BAD_DOCUMENT");
    }
}
