//! Pre-authored path pool.
//!
//! Paths are served from a shuffle bag: every path is drawn once per cycle,
//! in random order, and the bag is reshuffled when exhausted.

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use expo_models::ScenePath;

use crate::document::SceneryDocument;
use crate::error::{SceneryError, SceneryResult};

#[derive(Debug, Clone)]
pub struct StaticPathPool {
    paths: Vec<ScenePath>,
    next: usize,
    rng: StdRng,
}

impl StaticPathPool {
    pub fn new(paths: Vec<ScenePath>, seed: Option<u64>) -> SceneryResult<Self> {
        if paths.is_empty() {
            return Err(SceneryError::EmptyPool);
        }
        if let Some(index) = paths.iter().position(ScenePath::is_empty) {
            return Err(SceneryError::invalid_document(format!(
                "static path {} is empty",
                index
            )));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut paths = paths;
        paths.shuffle(&mut rng);

        Ok(Self { paths, next: 0, rng })
    }

    /// Load a JSON array of node id arrays.
    pub fn load(path: impl AsRef<Path>, seed: Option<u64>) -> SceneryResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading static path pool");
        let paths: Vec<ScenePath> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Self::new(paths, seed)
    }

    /// Reject paths referencing nodes the scenery document does not define.
    pub fn validate_against(&self, document: &SceneryDocument) -> SceneryResult<()> {
        for path in &self.paths {
            if let Some(node) = path.nodes().iter().find(|n| !document.contains_node(n)) {
                return Err(SceneryError::unknown_node(node, "static path pool"));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Draw the next path from the bag.
    pub fn next_path(&mut self) -> ScenePath {
        if self.next >= self.paths.len() {
            self.paths.shuffle(&mut self.rng);
            self.next = 0;
        }
        let path = self.paths[self.next].clone();
        self.next += 1;
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    fn pool(seed: u64) -> StaticPathPool {
        StaticPathPool::new(
            vec![
                ScenePath::from(vec!["1", "2", "1"]),
                ScenePath::from(vec!["1", "3", "1"]),
                ScenePath::from(vec!["1", "4", "5", "1"]),
            ],
            Some(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_each_path_once_per_cycle() {
        let mut pool = pool(17);
        for _ in 0..4 {
            let cycle: HashSet<String> = (0..3).map(|_| pool.next_path().to_string()).collect();
            assert_eq!(cycle.len(), 3);
        }
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(StaticPathPool::new(vec![], None), Err(SceneryError::EmptyPool)));
        assert!(StaticPathPool::new(vec![ScenePath::default()], None).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[["1", "2", "1"], ["1", "3", "1"]]"#).unwrap();

        let pool = StaticPathPool::load(file.path(), Some(1)).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_validate_against_document() {
        let document = SceneryDocument::from_json_str(
            r#"{
                "starting_node": "1",
                "sceneries_tags": { "1": ["a"], "2": ["a"], "3": ["a"] },
                "tags_weights": { "a": 1 },
                "transitions": { "1": ["2", "3"], "2": ["1"], "3": ["1"] }
            }"#,
        )
        .unwrap();

        assert!(matches!(
            pool(0).validate_against(&document),
            Err(SceneryError::UnknownNode { .. })
        ));

        let valid = StaticPathPool::new(vec![ScenePath::from(vec!["1", "2", "1"])], None).unwrap();
        assert!(valid.validate_against(&document).is_ok());
    }
}
