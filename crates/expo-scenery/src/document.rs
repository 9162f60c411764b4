//! Scenery document loading and validation.
//!
//! The combined document looks like:
//!
//! ```json
//! {
//!   "starting_node": "1",
//!   "sceneries_tags": { "1": ["fog", "sunrise"], "2": ["river"] },
//!   "tags_weights": { "fog": 3, "sunrise": 1, "river": 2 },
//!   "transitions": { "1": ["2"], "2": ["1"] }
//! }
//! ```
//!
//! The same data may also be split over three files: node tags, tag weights
//! and a graph document carrying `starting_node` and `transitions`.

use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use expo_models::SceneId;

use crate::error::{SceneryError, SceneryResult};

/// Start node and adjacency lists of the transitions graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphDocument {
    pub starting_node: SceneId,
    pub transitions: BTreeMap<SceneId, Vec<SceneId>>,
}

/// Static scenery data: nodes, their tags, tag weights and transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneryDocument {
    pub starting_node: SceneId,
    pub sceneries_tags: BTreeMap<SceneId, Vec<String>>,
    pub tags_weights: BTreeMap<String, f64>,
    pub transitions: BTreeMap<SceneId, Vec<SceneId>>,
}

impl SceneryDocument {
    /// Parse and validate a combined document.
    pub fn from_json_str(json: &str) -> SceneryResult<Self> {
        let document: SceneryDocument = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Load and validate a combined document from disk.
    pub fn load(path: impl AsRef<Path>) -> SceneryResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading scenery document");
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Assemble a document from its three parts.
    pub fn from_parts(
        sceneries_tags: BTreeMap<SceneId, Vec<String>>,
        tags_weights: BTreeMap<String, f64>,
        graph: GraphDocument,
    ) -> SceneryResult<Self> {
        let document = Self {
            starting_node: graph.starting_node,
            sceneries_tags,
            tags_weights,
            transitions: graph.transitions,
        };
        document.validate()?;
        Ok(document)
    }

    /// Load the split layout: node tags, tag weights and graph files.
    pub fn load_split(
        tags_path: impl AsRef<Path>,
        weights_path: impl AsRef<Path>,
        graph_path: impl AsRef<Path>,
    ) -> SceneryResult<Self> {
        let sceneries_tags = serde_json::from_str(&std::fs::read_to_string(tags_path)?)?;
        let tags_weights = serde_json::from_str(&std::fs::read_to_string(weights_path)?)?;
        let graph = serde_json::from_str(&std::fs::read_to_string(graph_path)?)?;
        Self::from_parts(sceneries_tags, tags_weights, graph)
    }

    pub fn node_count(&self) -> usize {
        self.sceneries_tags.len()
    }

    /// Every scene node, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &SceneId> + '_ {
        self.sceneries_tags.keys()
    }

    pub fn contains_node(&self, node: &SceneId) -> bool {
        self.sceneries_tags.contains_key(node)
    }

    pub fn tags_of(&self, node: &SceneId) -> Option<&[String]> {
        self.sceneries_tags.get(node).map(Vec::as_slice)
    }

    /// Check structural consistency of the document.
    pub fn validate(&self) -> SceneryResult<()> {
        if self.sceneries_tags.is_empty() {
            return Err(SceneryError::invalid_document("no sceneries defined"));
        }
        if !self.contains_node(&self.starting_node) {
            return Err(SceneryError::unknown_node(&self.starting_node, "starting_node"));
        }

        for (source, targets) in &self.transitions {
            if !self.contains_node(source) {
                return Err(SceneryError::unknown_node(source, "transitions"));
            }
            if let Some(target) = targets.iter().find(|t| !self.contains_node(t)) {
                return Err(SceneryError::unknown_node(
                    target,
                    format!("transitions of '{}'", source),
                ));
            }
        }

        if self.tags_weights.is_empty() {
            return Err(SceneryError::invalid_document("no tag weights defined"));
        }
        if let Some((tag, weight)) = self
            .tags_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(SceneryError::invalid_document(format!(
                "tag '{}' has invalid weight {}",
                tag, weight
            )));
        }
        if self.tags_weights.values().sum::<f64>() <= 0.0 {
            return Err(SceneryError::invalid_document("tag weights sum to zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DOCUMENT: &str = r#"{
        "starting_node": "1",
        "sceneries_tags": { "1": ["fog"], "2": ["river", "fog"], "3": ["sea"] },
        "tags_weights": { "fog": 2, "river": 1, "sea": 0 },
        "transitions": { "1": ["2"], "2": ["3"], "3": ["1"] }
    }"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_combined_document() {
        let document = SceneryDocument::from_json_str(DOCUMENT).unwrap();
        assert_eq!(document.starting_node, SceneId::from("1"));
        assert_eq!(document.node_count(), 3);
        assert_eq!(document.nodes().map(SceneId::as_str).collect::<Vec<_>>(), ["1", "2", "3"]);
        assert_eq!(document.tags_weights["sea"], 0.0);
        assert_eq!(
            document.tags_of(&SceneId::from("2")),
            Some(&["river".to_string(), "fog".to_string()][..])
        );
    }

    #[test]
    fn test_load_from_file() {
        let file = write_temp(DOCUMENT);
        let document = SceneryDocument::load(file.path()).unwrap();
        assert_eq!(document.transitions.len(), 3);
    }

    #[test]
    fn test_load_split_documents() {
        let tags = write_temp(r#"{ "1": ["fog"], "2": ["river"] }"#);
        let weights = write_temp(r#"{ "fog": 1, "river": 1.5 }"#);
        let graph = write_temp(r#"{ "starting_node": "1", "transitions": { "1": ["2"], "2": ["1"] } }"#);

        let document = SceneryDocument::load_split(tags.path(), weights.path(), graph.path()).unwrap();
        assert_eq!(document.node_count(), 2);
        assert_eq!(document.tags_weights["river"], 1.5);
    }

    #[test]
    fn test_unknown_start_node_rejected() {
        let json = DOCUMENT.replace(r#""starting_node": "1""#, r#""starting_node": "9""#);
        let err = SceneryDocument::from_json_str(&json).unwrap_err();
        assert!(matches!(err, SceneryError::UnknownNode { .. }));
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_unknown_transition_target_rejected() {
        let json = DOCUMENT.replace(r#""3": ["1"]"#, r#""3": ["1", "42"]"#);
        let err = SceneryDocument::from_json_str(&json).unwrap_err();
        match err {
            SceneryError::UnknownNode { node, .. } => assert_eq!(node, SceneId::from("42")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let json = DOCUMENT.replace(r#""fog": 2, "river": 1"#, r#""fog": 0, "river": 0"#);
        assert!(matches!(
            SceneryDocument::from_json_str(&json),
            Err(SceneryError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let json = DOCUMENT.replace(r#""river": 1"#, r#""river": -1"#);
        assert!(SceneryDocument::from_json_str(&json).is_err());
    }

    #[test]
    fn test_malformed_json_is_configuration_fault() {
        let err = SceneryDocument::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SceneryError::Json(_)));
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_missing_file() {
        let err = SceneryDocument::load("/nonexistent/scenery.json").unwrap_err();
        assert!(matches!(err, SceneryError::Io(_)));
    }
}
