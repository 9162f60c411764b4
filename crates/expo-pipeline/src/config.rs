//! Pipeline configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use expo_detector::{DistanceWindow, HysteresisConfig, ZoneLayout};
use expo_models::GroupOrder;
use expo_scenery::{
    GeneratorSettings, PathSource, RandomPathGenerator, SceneryDocument, SequenceCursor,
    StaticPathPool,
};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};

/// Counter timing and thresholds.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Sensor polling period
    pub sensor_refresh_interval: Duration,
    /// Debounce period of the counter stream
    pub counters_sampling_interval: Duration,
    pub sequence_switch_epoch: u64,
    pub new_detection_threshold: u64,
    pub continued_detection_threshold: u64,
    pub max_counter: u32,
    /// Presentation refresh rate
    pub presentation_fps: u32,
    /// Blend time between consecutive rendered frames
    pub crossfade: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sensor_refresh_interval: Duration::from_millis(200),
            counters_sampling_interval: Duration::from_millis(1000),
            sequence_switch_epoch: 45,
            new_detection_threshold: 3,
            continued_detection_threshold: 1,
            max_counter: 30,
            presentation_fps: 30,
            crossfade: Duration::from_millis(1000),
        }
    }
}

impl TimingConfig {
    pub fn presentation_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.presentation_fps.max(1)))
    }
}

/// Depth camera geometry and zoning.
#[derive(Debug, Clone)]
pub struct DepthConfig {
    pub cameras: usize,
    pub grid_vertical: usize,
    pub grid_horizontal: usize,
    pub horizontal_segments_per_camera: usize,
    pub distance_min_m: f32,
    pub distance_max_m: f32,
    /// Mirror the panorama before zoning
    pub mirror_mode: bool,
    pub group_order: GroupOrder,
    /// Use simulated visitors instead of physical sensors
    pub simulate: bool,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            cameras: 3,
            grid_vertical: 5,
            grid_horizontal: 9,
            horizontal_segments_per_camera: 3,
            distance_min_m: 0.4,
            distance_max_m: 1.8,
            mirror_mode: true,
            group_order: GroupOrder::Forward,
            simulate: true,
        }
    }
}

impl DepthConfig {
    pub fn zone_count(&self) -> usize {
        self.cameras * self.horizontal_segments_per_camera
    }

    pub fn distance_window(&self) -> DistanceWindow {
        DistanceWindow::new(self.distance_min_m, self.distance_max_m)
    }

    pub fn zone_layout(&self) -> PipelineResult<ZoneLayout> {
        Ok(ZoneLayout::uniform(
            self.cameras,
            self.grid_vertical,
            self.grid_horizontal,
            self.horizontal_segments_per_camera,
            self.distance_window(),
            self.mirror_mode,
        )?)
    }
}

/// How the next scene path is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePolicy {
    #[default]
    RandomWalk,
    StaticPool,
}

impl SequencePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequencePolicy::RandomWalk => "random_walk",
            SequencePolicy::StaticPool => "static_pool",
        }
    }
}

impl FromStr for SequencePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random_walk" | "random" => Ok(SequencePolicy::RandomWalk),
            "static_pool" | "static" => Ok(SequencePolicy::StaticPool),
            other => Err(PipelineError::config(format!("unknown sequence policy '{}'", other))),
        }
    }
}

/// Scene sequencing.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub policy: SequencePolicy,
    pub scenery_path: PathBuf,
    pub static_paths_path: PathBuf,
    pub tag_sequence_length: usize,
    pub max_combination_window: usize,
    pub min_loop_size: usize,
    pub max_retries: usize,
    /// Fixed seed for reproducible sequences
    pub seed: Option<u64>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        let settings = GeneratorSettings::default();
        Self {
            policy: SequencePolicy::RandomWalk,
            scenery_path: PathBuf::from("data/scenery.json"),
            static_paths_path: PathBuf::from("data/static_paths.json"),
            tag_sequence_length: settings.tag_sequence_length,
            max_combination_window: settings.max_combination_window,
            min_loop_size: settings.min_loop_size,
            max_retries: settings.max_retries,
            seed: None,
        }
    }
}

impl SequenceConfig {
    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            tag_sequence_length: self.tag_sequence_length,
            max_combination_window: self.max_combination_window,
            min_loop_size: self.min_loop_size,
            max_retries: self.max_retries,
        }
    }

    /// Load the scenery data and build the configured path policy.
    pub fn build_cursor(&self) -> PipelineResult<SequenceCursor> {
        let document = SceneryDocument::load(&self.scenery_path)?;
        info!(
            path = %self.scenery_path.display(),
            nodes = document.node_count(),
            start = %document.starting_node,
            "Loaded scenery document"
        );

        let source = match self.policy {
            SequencePolicy::RandomWalk => PathSource::RandomWalk(RandomPathGenerator::new(
                &document,
                self.generator_settings(),
                self.seed,
            )?),
            SequencePolicy::StaticPool => {
                let pool = StaticPathPool::load(&self.static_paths_path, self.seed)?;
                pool.validate_against(&document)?;
                info!(paths = pool.len(), "Loaded static path pool");
                PathSource::StaticPool(pool)
            }
        };

        Ok(SequenceCursor::new(source))
    }
}

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub assets_path: PathBuf,
    /// Fire every zone on every tick
    pub test_animation_mode: bool,
    /// Prometheus listener; metrics are disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            assets_path: PathBuf::from("data/landscapes"),
            test_animation_mode: false,
            metrics_addr: None,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub timing: TimingConfig,
    pub depth: DepthConfig,
    pub sequence: SequenceConfig,
    pub runtime: RuntimeConfig,
    /// `NAME=value` settings that could not be parsed
    pub rejected: Vec<String>,
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from any variable lookup. Values that fail to parse
    /// fall back to their default and make [`Self::validate`] fail.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut env = EnvReader::new(lookup);

        let timing = TimingConfig {
            sensor_refresh_interval: Duration::from_millis(env.or("SENSOR_REFRESH_MS", 200)),
            counters_sampling_interval: Duration::from_millis(env.or("COUNTERS_SAMPLING_MS", 1000)),
            sequence_switch_epoch: env.or("SEQUENCE_SWITCH_EPOCH", defaults.timing.sequence_switch_epoch),
            new_detection_threshold: env.or("NEW_DETECTION_EPOCHS", defaults.timing.new_detection_threshold),
            continued_detection_threshold: env.or(
                "CONTINUED_DETECTION_EPOCHS",
                defaults.timing.continued_detection_threshold,
            ),
            max_counter: env.or("MAX_COUNTER", defaults.timing.max_counter),
            presentation_fps: env.or("PRESENTATION_FPS", defaults.timing.presentation_fps),
            crossfade: Duration::from_millis(env.or("CROSSFADE_MS", 1000)),
        };

        let depth = DepthConfig {
            cameras: env.or("CAMERA_COUNT", defaults.depth.cameras),
            grid_vertical: env.or("DEPTH_GRID_VERTICAL", defaults.depth.grid_vertical),
            grid_horizontal: env.or("DEPTH_GRID_HORIZONTAL", defaults.depth.grid_horizontal),
            horizontal_segments_per_camera: env.or(
                "SEGMENTS_PER_CAMERA",
                defaults.depth.horizontal_segments_per_camera,
            ),
            distance_min_m: env.or("DISTANCE_MIN_M", defaults.depth.distance_min_m),
            distance_max_m: env.or("DISTANCE_MAX_M", defaults.depth.distance_max_m),
            mirror_mode: env.flag("MIRROR_MODE", defaults.depth.mirror_mode),
            group_order: env.or("COUNTER_GROUP_ORDER", defaults.depth.group_order),
            simulate: env.flag("SIMULATE_SENSORS", defaults.depth.simulate),
        };

        let sequence = SequenceConfig {
            policy: env.or("SEQUENCE_POLICY", defaults.sequence.policy),
            scenery_path: env.path("SCENERY_DOCUMENT")
                .unwrap_or(defaults.sequence.scenery_path),
            static_paths_path: env.path("STATIC_PATHS")
                .unwrap_or(defaults.sequence.static_paths_path),
            tag_sequence_length: env.or("TAG_SEQUENCE_LENGTH", defaults.sequence.tag_sequence_length),
            max_combination_window: env.or(
                "MAX_TAGS_COMBINATION_WINDOW",
                defaults.sequence.max_combination_window,
            ),
            min_loop_size: env.or("MIN_LOOP_SIZE", defaults.sequence.min_loop_size),
            max_retries: env.or("MAX_GENERATION_RETRIES", defaults.sequence.max_retries),
            seed: env.optional("SEQUENCE_SEED"),
        };

        let runtime = RuntimeConfig {
            assets_path: env.path("ASSETS_PATH")
                .unwrap_or(defaults.runtime.assets_path),
            test_animation_mode: env.flag("TEST_ANIMATION_MODE", false),
            metrics_addr: env.optional("METRICS_ADDR"),
        };

        Self {
            timing,
            depth,
            sequence,
            runtime,
            rejected: env.rejected,
        }
    }

    /// Hysteresis settings of one scene run.
    pub fn hysteresis(&self) -> HysteresisConfig {
        HysteresisConfig {
            new_detection_threshold: self.timing.new_detection_threshold,
            continued_detection_threshold: self.timing.continued_detection_threshold,
            max_counter: self.timing.max_counter,
            sequence_switch_epoch: self.timing.sequence_switch_epoch,
            group_order: self.depth.group_order,
            test_animation: self.runtime.test_animation_mode,
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.rejected.is_empty() {
            return Err(PipelineError::config(format!(
                "unparseable settings: {}",
                self.rejected.join(", ")
            )));
        }

        let timing = &self.timing;
        if timing.sensor_refresh_interval.is_zero() || timing.counters_sampling_interval.is_zero() {
            return Err(PipelineError::config("sampling intervals must be non-zero"));
        }
        if timing.presentation_fps == 0 {
            return Err(PipelineError::config("presentation fps must be at least 1"));
        }
        self.hysteresis()
            .validate()
            .map_err(|e| PipelineError::config(e.to_string()))?;

        let depth = &self.depth;
        if depth.cameras == 0 || depth.grid_vertical == 0 || depth.grid_horizontal == 0 {
            return Err(PipelineError::config(format!(
                "camera grid must be non-empty: {} cameras of {}x{}",
                depth.cameras, depth.grid_vertical, depth.grid_horizontal
            )));
        }
        if depth.horizontal_segments_per_camera == 0
            || depth.horizontal_segments_per_camera > depth.grid_horizontal
        {
            return Err(PipelineError::config(format!(
                "segments per camera must be in 1..={}, got {}",
                depth.grid_horizontal, depth.horizontal_segments_per_camera
            )));
        }
        if depth.zone_count() % 3 != 0 {
            return Err(PipelineError::config(format!(
                "zone count {} must split into left, center and right groups",
                depth.zone_count()
            )));
        }
        if !(depth.distance_min_m <= depth.distance_max_m) {
            return Err(PipelineError::config(format!(
                "distance window [{}, {}] is empty",
                depth.distance_min_m, depth.distance_max_m
            )));
        }

        self.sequence
            .generator_settings()
            .validate()
            .map_err(|e| PipelineError::config(e.to_string()))?;

        Ok(())
    }
}

/// Variable lookups that remember which values failed to parse.
struct EnvReader<F> {
    lookup: F,
    rejected: Vec<String>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            rejected: Vec::new(),
        }
    }

    fn optional<T: FromStr>(&mut self, name: &str) -> Option<T> {
        let raw = (self.lookup)(name)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(name, value = %raw, "Ignoring unparseable setting");
                self.rejected.push(format!("{}={}", name, raw));
                None
            }
        }
    }

    fn or<T: FromStr>(&mut self, name: &str, default: T) -> T {
        self.optional(name).unwrap_or(default)
    }

    fn flag(&mut self, name: &str, default: bool) -> bool {
        (self.lookup)(name)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(default)
    }

    fn path(&mut self, name: &str) -> Option<PathBuf> {
        (self.lookup)(name).map(PathBuf::from)
    }
}
