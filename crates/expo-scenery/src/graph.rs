//! Transitions graph and tag-constrained walk resolution.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use expo_models::{SceneId, ScenePath};

use crate::document::SceneryDocument;
use crate::error::{SceneryError, SceneryResult};
use crate::tags::{TagCatalog, TagGroup};

/// Directed scenery graph with a distinguished start node.
#[derive(Debug, Clone)]
pub struct SceneryGraph {
    start: SceneId,
    adjacency: BTreeMap<SceneId, Vec<SceneId>>,
}

impl SceneryGraph {
    pub fn new(document: &SceneryDocument) -> Self {
        Self {
            start: document.starting_node.clone(),
            adjacency: document.transitions.clone(),
        }
    }

    pub fn start(&self) -> &SceneId {
        &self.start
    }

    pub fn neighbors(&self, node: &SceneId) -> &[SceneId] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shortest path by edge count, never expanding through `avoid`.
    ///
    /// `from` and `to` are exempt from the avoidance filter. Neighbour order
    /// is shuffled so equally short paths are picked at random.
    pub fn shortest_path<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        from: &SceneId,
        to: &SceneId,
        avoid: &HashSet<SceneId>,
    ) -> Option<Vec<SceneId>> {
        if from == to {
            return Some(vec![from.clone()]);
        }

        let allowed = |node: &SceneId| node == to || node == from || !avoid.contains(node);

        let mut parent: HashMap<SceneId, SceneId> = HashMap::new();
        let mut seen: HashSet<SceneId> = HashSet::from([from.clone()]);
        let mut queue = VecDeque::from([from.clone()]);

        while let Some(current) = queue.pop_front() {
            let mut neighbors: Vec<&SceneId> = self
                .neighbors(&current)
                .iter()
                .filter(|n| allowed(*n))
                .collect();
            neighbors.shuffle(rng);

            for neighbor in neighbors {
                if !seen.insert(neighbor.clone()) {
                    continue;
                }
                parent.insert(neighbor.clone(), current.clone());

                if neighbor == to {
                    return Some(unwind(&parent, from, to));
                }
                queue.push_back(neighbor.clone());
            }
        }

        None
    }

    /// Avoid `visited` if possible, otherwise take any shortest path.
    pub fn path_avoiding<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        from: &SceneId,
        to: &SceneId,
        visited: &HashSet<SceneId>,
    ) -> Option<Vec<SceneId>> {
        self.shortest_path(rng, from, to, visited)
            .or_else(|| self.shortest_path(rng, from, to, &HashSet::new()))
    }

    /// Resolve tag groups into a closed walk from the start node.
    ///
    /// Groups whose candidates are unreachable are skipped with a warning.
    /// Failing to return to the start node is a configuration fault.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        catalog: &TagCatalog,
        groups: &[TagGroup],
    ) -> SceneryResult<ScenePath> {
        let mut path = vec![self.start.clone()];
        let mut visited: HashSet<SceneId> = HashSet::from([self.start.clone()]);
        let mut current = self.start.clone();

        for group in groups {
            let matching = catalog.nodes_with_tags(group);
            let unvisited: Vec<SceneId> = matching
                .iter()
                .filter(|node| !visited.contains(*node))
                .cloned()
                .collect();
            let mut candidates = if unvisited.is_empty() { matching } else { unvisited };
            candidates.shuffle(rng);

            let mut best: Option<Vec<SceneId>> = None;
            for candidate in &candidates {
                if let Some(route) = self.path_avoiding(rng, &current, candidate, &visited) {
                    if best.as_ref().map_or(true, |b| route.len() < b.len()) {
                        best = Some(route);
                    }
                }
            }

            let Some(route) = best else {
                warn!(
                    tags = ?group,
                    from = %current,
                    "Cannot reach any node matching tag group, skipping"
                );
                continue;
            };

            for node in route.iter().skip(1) {
                visited.insert(node.clone());
                path.push(node.clone());
            }
            if let Some(last) = route.last() {
                current = last.clone();
            }
            debug!(tags = ?group, node = %current, "Resolved tag group");
        }

        if current != self.start {
            let mut avoid = visited;
            avoid.remove(&self.start);

            let closing = self
                .path_avoiding(rng, &current, &self.start, &avoid)
                .ok_or_else(|| SceneryError::NoClosedWalk {
                    path: ScenePath::new(path.clone()).to_string(),
                    start: self.start.clone(),
                })?;
            path.extend(closing.into_iter().skip(1));
        }

        Ok(ScenePath::new(path))
    }
}

fn unwind(parent: &HashMap<SceneId, SceneId>, from: &SceneId, to: &SceneId) -> Vec<SceneId> {
    let mut path = vec![to.clone()];
    let mut node = to;
    while node != from {
        match parent.get(node) {
            Some(previous) => {
                path.push(previous.clone());
                node = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn document(tags: &str, transitions: &str) -> SceneryDocument {
        SceneryDocument::from_json_str(&format!(
            r#"{{ "starting_node": "s", "sceneries_tags": {tags}, "tags_weights": {{ "a": 1, "b": 1, "c": 1 }}, "transitions": {transitions} }}"#
        ))
        .unwrap()
    }

    fn ids(nodes: &[&str]) -> Vec<SceneId> {
        nodes.iter().map(|n| SceneId::from(*n)).collect()
    }

    fn group(tags: &[&str]) -> TagGroup {
        tags.iter().map(|t| t.to_string()).collect()
    }

    /// s -> x -> y -> s, s -> y (shortcut), y -> z -> s
    fn triangle() -> SceneryDocument {
        document(
            r#"{ "s": [], "x": ["a"], "y": ["b"], "z": ["c", "a"] }"#,
            r#"{ "s": ["x", "y"], "x": ["y"], "y": ["s", "z"], "z": ["s"] }"#,
        )
    }

    #[test]
    fn test_shortest_path_is_optimal() {
        let graph = SceneryGraph::new(&triangle());
        let mut rng = StdRng::seed_from_u64(1);

        let path = graph
            .shortest_path(&mut rng, &SceneId::from("s"), &SceneId::from("y"), &HashSet::new())
            .unwrap();
        assert_eq!(path, ids(&["s", "y"]));

        let path = graph
            .shortest_path(&mut rng, &SceneId::from("x"), &SceneId::from("z"), &HashSet::new())
            .unwrap();
        assert_eq!(path, ids(&["x", "y", "z"]));
    }

    #[test]
    fn test_avoidance_falls_back_to_unrestricted_path() {
        let graph = SceneryGraph::new(&triangle());
        let mut rng = StdRng::seed_from_u64(1);
        let visited: HashSet<SceneId> = ids(&["y"]).into_iter().collect();

        assert!(graph
            .shortest_path(&mut rng, &SceneId::from("x"), &SceneId::from("z"), &visited)
            .is_none());
        assert_eq!(
            graph.path_avoiding(&mut rng, &SceneId::from("x"), &SceneId::from("z"), &visited),
            Some(ids(&["x", "y", "z"]))
        );
    }

    #[test]
    fn test_endpoints_exempt_from_avoidance() {
        let graph = SceneryGraph::new(&triangle());
        let mut rng = StdRng::seed_from_u64(3);
        let visited: HashSet<SceneId> = ids(&["s", "z"]).into_iter().collect();

        assert_eq!(
            graph.shortest_path(&mut rng, &SceneId::from("s"), &SceneId::from("z"), &visited),
            Some(ids(&["s", "y", "z"]))
        );
    }

    #[test]
    fn test_resolve_returns_closed_walk() {
        let document = triangle();
        let graph = SceneryGraph::new(&document);
        let catalog = TagCatalog::new(&document).unwrap();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let path = graph
                .resolve(&mut rng, &catalog, &[group(&["c"]), group(&["a"])])
                .unwrap();

            assert!(path.is_closed_at(&SceneId::from("s")), "seed {seed}: {path}");
            assert!(path.nodes().contains(&SceneId::from("z")));
        }
    }

    #[test]
    fn test_resolve_prefers_unvisited_candidates() {
        let document = triangle();
        let graph = SceneryGraph::new(&document);
        let catalog = TagCatalog::new(&document).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        // "a" matches x and z; z was visited by the first group.
        let path = graph
            .resolve(&mut rng, &catalog, &[group(&["c"]), group(&["a"])])
            .unwrap();
        assert!(path.nodes().contains(&SceneId::from("x")));
    }

    #[test]
    fn test_unreachable_group_is_skipped() {
        let document = document(
            r#"{ "s": [], "x": ["a"], "island": ["b"] }"#,
            r#"{ "s": ["x"], "x": ["s"] }"#,
        );
        let graph = SceneryGraph::new(&document);
        let catalog = TagCatalog::new(&document).unwrap();
        let mut rng = StdRng::seed_from_u64(9);

        let path = graph
            .resolve(&mut rng, &catalog, &[group(&["b"]), group(&["a"])])
            .unwrap();
        assert_eq!(path.nodes(), ids(&["s", "x", "s"]).as_slice());
    }

    #[test]
    fn test_missing_closing_path_is_fatal() {
        let document = document(
            r#"{ "s": [], "sink": ["a"] }"#,
            r#"{ "s": ["sink"] }"#,
        );
        let graph = SceneryGraph::new(&document);
        let catalog = TagCatalog::new(&document).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let err = graph
            .resolve(&mut rng, &catalog, &[group(&["a"])])
            .unwrap_err();
        assert!(matches!(err, SceneryError::NoClosedWalk { .. }));
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_no_groups_yields_start_only() {
        let document = triangle();
        let graph = SceneryGraph::new(&document);
        let catalog = TagCatalog::new(&document).unwrap();

        let path = graph
            .resolve(&mut StdRng::seed_from_u64(0), &catalog, &[])
            .unwrap();
        assert_eq!(path.nodes(), ids(&["s"]).as_slice());
    }

    #[test]
    fn test_resolution_is_deterministic_for_seed() {
        let document = triangle();
        let graph = SceneryGraph::new(&document);
        let catalog = TagCatalog::new(&document).unwrap();
        let groups = [group(&["a"]), group(&["b"]), group(&["c"])];

        let a = graph.resolve(&mut StdRng::seed_from_u64(11), &catalog, &groups).unwrap();
        let b = graph.resolve(&mut StdRng::seed_from_u64(11), &catalog, &groups).unwrap();
        assert_eq!(a, b);
    }
}
