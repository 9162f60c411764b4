//! Random-walk path generator.
//!
//! Each attempt plans a tag sequence and resolves it into a closed walk.
//! Attempts repeating a node within `min_loop_size` consecutive entries are
//! retried up to `max_retries` times; when every attempt loops, the one with
//! the fewest looping windows is kept.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use expo_models::ScenePath;

use crate::document::SceneryDocument;
use crate::error::{SceneryError, SceneryResult};
use crate::graph::SceneryGraph;
use crate::tags::{TagCatalog, TagGroup};

/// Tuning of the random-walk generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Tags sampled per path (`L`).
    pub tag_sequence_length: usize,
    /// Largest tag window combined into one group (`W`).
    pub max_combination_window: usize,
    /// Window in which a node may not repeat.
    pub min_loop_size: usize,
    /// Generation attempts before settling for a looping path.
    pub max_retries: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            tag_sequence_length: 5,
            max_combination_window: 3,
            min_loop_size: 5,
            max_retries: 5,
        }
    }
}

impl GeneratorSettings {
    pub fn validate(&self) -> SceneryResult<()> {
        if self.tag_sequence_length == 0 {
            return Err(SceneryError::invalid_settings("tag sequence length must be at least 1"));
        }
        if self.max_combination_window == 0 {
            return Err(SceneryError::invalid_settings(
                "max combination window must be at least 1",
            ));
        }
        if self.max_retries == 0 {
            return Err(SceneryError::invalid_settings("max retries must be at least 1"));
        }
        Ok(())
    }
}

/// One generated path and how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPath {
    pub sampled_tags: Vec<String>,
    pub tags: Vec<String>,
    pub groups: Vec<TagGroup>,
    pub path: ScenePath,
    /// 1-based attempt that produced `path`.
    pub attempts: usize,
}

/// Generates closed walks from weighted tag sequences.
#[derive(Debug, Clone)]
pub struct RandomPathGenerator {
    catalog: TagCatalog,
    graph: SceneryGraph,
    settings: GeneratorSettings,
    rng: StdRng,
}

impl RandomPathGenerator {
    /// Build a generator; a fixed `seed` makes generation reproducible.
    pub fn new(
        document: &SceneryDocument,
        settings: GeneratorSettings,
        seed: Option<u64>,
    ) -> SceneryResult<Self> {
        settings.validate()?;
        document.validate()?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Ok(Self {
            catalog: TagCatalog::new(document)?,
            graph: SceneryGraph::new(document),
            settings,
            rng,
        })
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    pub fn graph(&self) -> &SceneryGraph {
        &self.graph
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Generate the next path.
    pub fn generate(&mut self) -> SceneryResult<GeneratedPath> {
        let mut best: Option<(usize, GeneratedPath)> = None;

        for attempt in 1..=self.settings.max_retries {
            let plan = self.catalog.plan(
                &mut self.rng,
                self.settings.tag_sequence_length,
                self.settings.max_combination_window,
            );
            let path = self.graph.resolve(&mut self.rng, &self.catalog, &plan.groups)?;
            let violations = loop_violations(&path, self.settings.min_loop_size);

            debug!(
                attempt,
                violations,
                tags = ?plan.sequence,
                path = %path,
                "Generated candidate path"
            );

            let candidate = GeneratedPath {
                sampled_tags: plan.sampled,
                tags: plan.sequence,
                groups: plan.groups,
                path,
                attempts: attempt,
            };

            if violations == 0 {
                info!(attempts = attempt, path = %candidate.path, "Generated scenery path");
                return Ok(candidate);
            }

            if best.as_ref().map_or(true, |(fewest, _)| violations < *fewest) {
                best = Some((violations, candidate));
            }
        }

        let (violations, generated) = best.ok_or_else(|| {
            SceneryError::invalid_settings("generator ran without any attempt")
        })?;
        warn!(
            attempts = self.settings.max_retries,
            violations,
            path = %generated.path,
            "All attempts repeat nodes within the loop window, keeping the best one"
        );
        Ok(generated)
    }
}

/// Number of `window`-long slices of `path` containing a repeated node.
pub fn loop_violations(path: &ScenePath, window: usize) -> usize {
    if window == 0 || path.len() < window {
        return 0;
    }
    path.nodes()
        .windows(window)
        .filter(|slice| {
            slice
                .iter()
                .enumerate()
                .any(|(i, node)| slice[i + 1..].contains(node))
        })
        .count()
}

/// Whether any `window`-long slice of `path` repeats a node.
pub fn has_repeats_in_window(path: &ScenePath, window: usize) -> bool {
    loop_violations(path, window) > 0
}
