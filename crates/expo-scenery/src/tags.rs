//! Tag sampling and grouping.
//!
//! A tag plan is built in three steps: sample `L` tags by weight, collapse
//! immediate repeats, then greedily combine neighbouring tags into groups
//! that some single node satisfies (largest windows first).

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::Serialize;

use expo_models::SceneId;

use crate::document::SceneryDocument;
use crate::error::{SceneryError, SceneryResult};

/// Tags that must all be present on one node.
pub type TagGroup = Vec<String>;

/// Sampled tags and their combined groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPlan {
    /// Tags as drawn, before collapsing repeats.
    pub sampled: Vec<String>,
    /// Tag sequence with immediate repeats collapsed.
    pub sequence: Vec<String>,
    /// Groups in acceptance order (largest windows first).
    pub groups: Vec<TagGroup>,
}

/// Node tags and weighted tag distribution.
#[derive(Debug, Clone)]
pub struct TagCatalog {
    node_tags: Vec<(SceneId, Vec<String>)>,
    tags: Vec<String>,
    weights: WeightedIndex<f64>,
}

impl TagCatalog {
    pub fn new(document: &SceneryDocument) -> SceneryResult<Self> {
        let tags: Vec<String> = document.tags_weights.keys().cloned().collect();
        let weights = WeightedIndex::new(document.tags_weights.values().copied())
            .map_err(|e| SceneryError::invalid_document(format!("tag weights: {}", e)))?;

        Ok(Self {
            node_tags: document
                .sceneries_tags
                .iter()
                .map(|(node, tags)| (node.clone(), tags.clone()))
                .collect(),
            tags,
            weights,
        })
    }

    pub fn tags_of(&self, node: &SceneId) -> Option<&[String]> {
        self.node_tags
            .iter()
            .find(|(id, _)| id == node)
            .map(|(_, tags)| tags.as_slice())
    }

    /// Draw `length` tags independently, with replacement, by weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> Vec<String> {
        (0..length)
            .map(|_| self.tags[self.weights.sample(rng)].clone())
            .collect()
    }

    /// Nodes whose tag set is a superset of `tags`, in node id order.
    pub fn nodes_with_tags(&self, tags: &[String]) -> Vec<SceneId> {
        self.node_tags
            .iter()
            .filter(|(_, node_tags)| tags.iter().all(|tag| node_tags.contains(tag)))
            .map(|(node, _)| node.clone())
            .collect()
    }

    pub fn has_matching_node(&self, tags: &[String]) -> bool {
        self.node_tags
            .iter()
            .any(|(_, node_tags)| tags.iter().all(|tag| node_tags.contains(tag)))
    }

    /// Greedy sliding-window combination.
    ///
    /// For window sizes from `max_window` down to 1, scan left to right; a
    /// window of unassigned positions that some node satisfies becomes a
    /// group and the scan jumps past it. Tags no node carries are dropped.
    pub fn combine(&self, sequence: &[String], max_window: usize) -> Vec<TagGroup> {
        let max_window = max_window.min(sequence.len());
        let mut assigned = vec![false; sequence.len()];
        let mut groups = Vec::new();

        for size in (1..=max_window).rev() {
            let mut i = 0;
            while i + size <= sequence.len() {
                if assigned[i..i + size].iter().any(|a| *a) {
                    i += 1;
                    continue;
                }

                let window = &sequence[i..i + size];
                if self.has_matching_node(window) {
                    assigned[i..i + size].iter_mut().for_each(|a| *a = true);
                    groups.push(window.to_vec());
                    i += size;
                } else {
                    i += 1;
                }
            }
        }

        groups
    }

    /// Sample, collapse and combine a full tag plan.
    pub fn plan<R: Rng + ?Sized>(&self, rng: &mut R, length: usize, max_window: usize) -> TagPlan {
        let sampled = self.sample(rng, length);
        let sequence = collapse_repeats(&sampled);
        let groups = self.combine(&sequence, max_window);

        TagPlan {
            sampled,
            sequence,
            groups,
        }
    }
}

/// Drop tags equal to their predecessor.
pub fn collapse_repeats(tags: &[String]) -> Vec<String> {
    let mut collapsed: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if collapsed.last() != Some(tag) {
            collapsed.push(tag.clone());
        }
    }
    collapsed
}
