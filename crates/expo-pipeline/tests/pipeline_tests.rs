//! End-to-end pipeline tests with in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use expo_models::{AssetEvent, CameraFrame, CounterVector, GroupOrder, PresenceGrid, RasterFrame, SceneId};
use expo_pipeline::{
    Collaborators, Pipeline, PipelineConfig, PipelineError, PipelineResult, PresenceSensor,
    PreviewRenderer, RecordingTelemetry, SceneRenderer, SequencePolicy,
};

const SCENERY: &str = r#"{
    "starting_node": "1",
    "sceneries_tags": { "1": ["fog"], "2": ["river"], "3": ["sea"] },
    "tags_weights": { "fog": 1, "river": 1, "sea": 1 },
    "transitions": { "1": ["2"], "2": ["3"], "3": ["1"] }
}"#;

/// Sensor reporting a visitor in front of the first column, forever.
struct FixedSensor {
    closed: Arc<AtomicBool>,
}

impl PresenceSensor for FixedSensor {
    fn sample(&mut self) -> PresenceGrid {
        PresenceGrid::new(vec![CameraFrame::new(vec![1.0, 0.0, 0.0])])
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RenderCall {
    Select(SceneId),
    Render(CounterVector),
}

/// Preview renderer that records every call it serves.
struct RecordingRenderer {
    inner: PreviewRenderer,
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl SceneRenderer for RecordingRenderer {
    fn load_assets(
        &mut self,
        prefix: &Path,
        on_event: &mut dyn FnMut(AssetEvent),
    ) -> PipelineResult<usize> {
        self.inner.load_assets(prefix, on_event)
    }

    fn select_scene(&mut self, scene: &SceneId) -> PipelineResult<()> {
        self.calls.lock().unwrap().push(RenderCall::Select(scene.clone()));
        self.inner.select_scene(scene)
    }

    fn render_frame(&mut self, counters: &CounterVector) -> PipelineResult<RasterFrame> {
        self.calls.lock().unwrap().push(RenderCall::Render(counters.clone()));
        self.inner.render_frame(counters)
    }

    fn empty_frame(&self) -> RasterFrame {
        self.inner.empty_frame()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: PipelineConfig,
}

fn fixture(scenery: &str, policy: SequencePolicy) -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let scenery_path = dir.path().join("scenery.json");
    let pool_path = dir.path().join("static_paths.json");
    std::fs::write(&scenery_path, scenery).expect("Failed to write scenery");
    std::fs::write(&pool_path, r#"[["1", "2", "3"]]"#).expect("Failed to write pool");

    let mut config = PipelineConfig::default();
    config.timing.sensor_refresh_interval = Duration::from_millis(100);
    config.timing.counters_sampling_interval = Duration::from_secs(1);
    config.timing.new_detection_threshold = 3;
    config.timing.continued_detection_threshold = 1;
    config.timing.max_counter = 5;
    config.timing.sequence_switch_epoch = 20;
    config.timing.presentation_fps = 10;
    config.timing.crossfade = Duration::from_millis(200);
    config.depth.cameras = 1;
    config.depth.grid_vertical = 1;
    config.depth.grid_horizontal = 3;
    config.depth.horizontal_segments_per_camera = 3;
    config.depth.mirror_mode = false;
    config.depth.group_order = GroupOrder::Forward;
    config.sequence.policy = policy;
    config.sequence.scenery_path = scenery_path;
    config.sequence.static_paths_path = pool_path;
    config.sequence.seed = Some(11);
    config.runtime.assets_path = PathBuf::from(dir.path());

    Fixture { _dir: dir, config }
}

fn scenes(ids: &[&str]) -> Vec<SceneId> {
    ids.iter().copied().map(SceneId::from).collect()
}

struct Harness {
    pipeline: Pipeline,
    telemetry: Arc<RecordingTelemetry>,
    calls: Arc<Mutex<Vec<RenderCall>>>,
    sensor_closed: Arc<AtomicBool>,
}

fn harness(config: PipelineConfig, loaded_scenes: Vec<SceneId>) -> Harness {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sensor_closed = Arc::new(AtomicBool::new(false));

    let collaborators = Collaborators {
        sensor: Box::new(FixedSensor {
            closed: sensor_closed.clone(),
        }),
        renderer: Box::new(RecordingRenderer {
            inner: PreviewRenderer::new(8, 4, config.timing.max_counter, loaded_scenes),
            calls: calls.clone(),
        }),
        telemetry: telemetry.clone(),
    };

    let cursor = config.sequence.build_cursor().expect("Failed to build cursor");
    let pipeline = Pipeline::new(config, cursor, collaborators).expect("Failed to create pipeline");

    Harness {
        pipeline,
        telemetry,
        calls,
        sensor_closed,
    }
}

fn zone0(count: u32) -> CounterVector {
    CounterVector::from_zones(&[count, 0, 0], GroupOrder::Forward).unwrap()
}

/// Scene runs follow the static path, restart their counters and stop cleanly.
#[tokio::test(start_paused = true)]
async fn test_scene_runs_cycle_through_static_path() {
    let fixture = fixture(SCENERY, SequencePolicy::StaticPool);
    let Harness {
        pipeline,
        telemetry,
        calls,
        sensor_closed,
    } = harness(fixture.config, scenes(&["1", "2", "3"]));

    let shutdown = pipeline.shutdown_handle();
    let task = tokio::spawn(pipeline.run());

    tokio::time::sleep(Duration::from_secs(40)).await;
    shutdown.shutdown();
    task.await.expect("Pipeline task panicked").expect("Pipeline failed");

    let log = telemetry.snapshot();
    assert_eq!(log.assets.len(), 6);
    assert!(log.scenes.len() >= 3, "only {} scene runs", log.scenes.len());
    assert_eq!(log.scenes[..3], scenes(&["1", "2", "3"])[..]);

    // Every run counts epochs from 1, and saturates at epoch 7.
    assert_eq!(log.epochs[0], 1);
    for pair in log.epochs.windows(2) {
        assert!(pair[1] == pair[0] + 1 || pair[1] == 1, "epochs {:?}", log.epochs);
    }
    assert_eq!(log.epochs.iter().max(), Some(&7));
    assert!(log.counters.iter().all(|c| c.max() <= 5));
    assert!(log.frames > 0);

    let calls = calls.lock().unwrap().clone();
    assert_eq!(
        calls[..5],
        [
            RenderCall::Select(SceneId::from("1")),
            RenderCall::Render(zone0(0)),
            RenderCall::Render(zone0(2)),
            RenderCall::Render(zone0(4)),
            RenderCall::Select(SceneId::from("2")),
        ]
    );
    for pair in calls.windows(2) {
        if let [RenderCall::Render(a), RenderCall::Render(b)] = pair {
            assert_ne!(a, b);
        }
    }

    assert!(sensor_closed.load(Ordering::SeqCst));
}

/// Test animation mode ends every run by saturation, presence or not.
#[tokio::test(start_paused = true)]
async fn test_animation_mode_saturates_runs() {
    let mut fixture = fixture(SCENERY, SequencePolicy::StaticPool);
    fixture.config.runtime.test_animation_mode = true;
    let Harness {
        pipeline, telemetry, ..
    } = harness(fixture.config, scenes(&["1", "2", "3"]));

    let shutdown = pipeline.shutdown_handle();
    let task = tokio::spawn(pipeline.run());
    tokio::time::sleep(Duration::from_secs(20)).await;
    shutdown.shutdown();
    task.await.expect("Pipeline task panicked").expect("Pipeline failed");

    let log = telemetry.snapshot();
    assert_eq!(log.epochs.iter().max(), Some(&5));
    assert!(log.scenes.len() >= 2);
    assert_eq!(log.counters[0], CounterVector::from_zones(&[1, 1, 1], GroupOrder::Forward).unwrap());
}

/// A renderer that loads nothing stops the pipeline with an error.
#[tokio::test(start_paused = true)]
async fn test_missing_assets_fail_pipeline() {
    let fixture = fixture(SCENERY, SequencePolicy::StaticPool);
    let Harness {
        pipeline,
        telemetry,
        sensor_closed,
        ..
    } = harness(fixture.config, Vec::new());

    let result = pipeline.run().await;

    assert!(matches!(result, Err(PipelineError::InvariantViolation(_))));
    assert!(telemetry.snapshot().scenes.is_empty());
    assert!(sensor_closed.load(Ordering::SeqCst));
}

/// A scenery graph that cannot return to its start is a fatal configuration fault.
#[tokio::test(start_paused = true)]
async fn test_unclosable_walk_fails_pipeline() {
    let scenery = r#"{
        "starting_node": "1",
        "sceneries_tags": { "1": ["lake"], "2": ["peak"] },
        "tags_weights": { "lake": 0, "peak": 1 },
        "transitions": { "1": ["2"], "2": [] }
    }"#;
    let fixture = fixture(scenery, SequencePolicy::RandomWalk);
    let Harness { pipeline, .. } = harness(fixture.config, scenes(&["1", "2"]));

    let result = pipeline.run().await;

    assert!(matches!(
        result,
        Err(PipelineError::Scenery(expo_scenery::SceneryError::NoClosedWalk { .. }))
    ));
}

/// Shutdown before any scene starts is a clean stop.
#[tokio::test(start_paused = true)]
async fn test_immediate_shutdown_is_clean() {
    let fixture = fixture(SCENERY, SequencePolicy::StaticPool);
    let Harness { pipeline, .. } = harness(fixture.config, scenes(&["1", "2", "3"]));

    pipeline.shutdown_handle().shutdown();
    assert!(pipeline.run().await.is_ok());
}
