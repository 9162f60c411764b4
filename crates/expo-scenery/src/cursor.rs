//! Pull-based scene sequence cursor.

use tracing::info;

use expo_models::{SceneId, ScenePath};

use crate::error::{SceneryError, SceneryResult};
use crate::generator::{GeneratedPath, RandomPathGenerator};
use crate::static_paths::StaticPathPool;

/// Where new paths come from. Chosen once from static configuration.
#[derive(Debug, Clone)]
pub enum PathSource {
    RandomWalk(RandomPathGenerator),
    StaticPool(StaticPathPool),
}

impl PathSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathSource::RandomWalk(_) => "random_walk",
            PathSource::StaticPool(_) => "static_pool",
        }
    }

    /// Produce the next path, with its derivation when generated.
    pub fn next_path(&mut self) -> SceneryResult<(ScenePath, Option<GeneratedPath>)> {
        match self {
            PathSource::RandomWalk(generator) => {
                let generated = generator.generate()?;
                Ok((generated.path.clone(), Some(generated)))
            }
            PathSource::StaticPool(pool) => Ok((pool.next_path(), None)),
        }
    }
}

/// Walks the current path one scene at a time, regenerating past its end.
#[derive(Debug, Clone)]
pub struct SequenceCursor {
    source: PathSource,
    path: ScenePath,
    position: Option<usize>,
    last_generated: Option<GeneratedPath>,
    paths_served: u64,
}

impl SequenceCursor {
    pub fn new(source: PathSource) -> Self {
        Self {
            source,
            path: ScenePath::default(),
            position: None,
            last_generated: None,
            paths_served: 0,
        }
    }

    pub fn policy(&self) -> &'static str {
        self.source.as_str()
    }

    /// Path currently being walked (empty before the first `next`).
    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn last_generated(&self) -> Option<&GeneratedPath> {
        self.last_generated.as_ref()
    }

    pub fn paths_served(&self) -> u64 {
        self.paths_served
    }

    /// Advance to the next scene.
    pub fn next(&mut self) -> SceneryResult<SceneId> {
        let position = self.position.map_or(0, |p| p + 1);

        if position >= self.path.len() {
            let (path, generated) = self.source.next_path()?;
            if path.is_empty() {
                return Err(SceneryError::EmptyPath);
            }

            self.paths_served += 1;
            info!(
                policy = self.source.as_str(),
                length = path.len(),
                path = %path,
                "New scene path"
            );
            self.path = path;
            self.last_generated = generated;
            self.position = Some(0);
        } else {
            self.position = Some(position);
        }

        let index = self.position.unwrap_or(0);
        self.path.get(index).cloned().ok_or(SceneryError::EmptyPath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SceneryDocument;
    use crate::generator::GeneratorSettings;

    fn static_cursor(paths: Vec<ScenePath>) -> SequenceCursor {
        SequenceCursor::new(PathSource::StaticPool(StaticPathPool::new(paths, Some(0)).unwrap()))
    }

    #[test]
    fn test_cycles_through_path_before_regenerating() {
        let mut cursor = static_cursor(vec![ScenePath::from(vec!["1", "2", "3", "1"])]);
        assert!(cursor.path().is_empty());
        assert_eq!(cursor.position(), None);

        let scenes: Vec<String> = (0..8).map(|_| cursor.next().unwrap().to_string()).collect();
        assert_eq!(scenes, vec!["1", "2", "3", "1", "1", "2", "3", "1"]);
        assert_eq!(cursor.paths_served(), 2);
        assert_eq!(cursor.position(), Some(3));
    }

    #[test]
    fn test_regenerates_only_past_end() {
        let mut cursor = static_cursor(vec![
            ScenePath::from(vec!["1", "2", "1"]),
            ScenePath::from(vec!["1", "3", "4", "1"]),
        ]);

        cursor.next().unwrap();
        let first = cursor.path().clone();
        for _ in 1..first.len() {
            cursor.next().unwrap();
            assert_eq!(cursor.path(), &first);
        }

        cursor.next().unwrap();
        assert_eq!(cursor.paths_served(), 2);
        assert_eq!(cursor.position(), Some(0));
    }

    #[test]
    fn test_random_walk_cursor_starts_at_start_node() {
        let document = SceneryDocument::from_json_str(
            r#"{
                "starting_node": "a",
                "sceneries_tags": { "a": ["x"], "b": ["y"], "c": ["z"] },
                "tags_weights": { "x": 1, "y": 1, "z": 1 },
                "transitions": { "a": ["b"], "b": ["c"], "c": ["a"] }
            }"#,
        )
        .unwrap();
        let generator =
            RandomPathGenerator::new(&document, GeneratorSettings::default(), Some(99)).unwrap();
        let mut cursor = SequenceCursor::new(PathSource::RandomWalk(generator));

        assert_eq!(cursor.policy(), "random_walk");
        assert_eq!(cursor.next().unwrap(), SceneId::from("a"));
        assert!(cursor.last_generated().is_some());
        assert!(cursor.path().is_closed_at(&SceneId::from("a")));
    }
}
