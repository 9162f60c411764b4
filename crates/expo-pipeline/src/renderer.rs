//! Preview renderer.
//!
//! Stands in for the image-synthesis step: each scene gets a base colour and
//! every zone counter is drawn as a vertical bar whose height follows the
//! counter's share of `max_counter`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use expo_models::{AssetEvent, CounterVector, RasterFrame, SceneId};

use crate::collaborators::SceneRenderer;
use crate::error::{PipelineError, PipelineResult};

/// Dependency-free renderer producing counter bar charts.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    width: u32,
    height: u32,
    max_counter: u32,
    scenes: Vec<SceneId>,
    palette: BTreeMap<SceneId, [u8; 3]>,
    selected: Option<SceneId>,
}

impl PreviewRenderer {
    pub fn new(width: u32, height: u32, max_counter: u32, scenes: Vec<SceneId>) -> Self {
        Self {
            width,
            height,
            max_counter: max_counter.max(1),
            scenes,
            palette: BTreeMap::new(),
            selected: None,
        }
    }

    pub fn loaded_scenes(&self) -> usize {
        self.palette.len()
    }

    pub fn selected(&self) -> Option<&SceneId> {
        self.selected.as_ref()
    }

    fn base_colour(&self) -> PipelineResult<[u8; 3]> {
        let scene = self
            .selected
            .as_ref()
            .ok_or_else(|| PipelineError::render("no scene selected"))?;
        self.palette
            .get(scene)
            .copied()
            .ok_or_else(|| PipelineError::render(format!("scene '{}' is not loaded", scene)))
    }
}

/// Stable colour derived from the scene id (FNV-1a).
fn scene_colour(scene: &SceneId) -> [u8; 3] {
    let hash = scene
        .as_str()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    // Keep every channel bright enough to read as a bar.
    [
        64 + (hash & 0xbf) as u8,
        64 + ((hash >> 8) & 0xbf) as u8,
        64 + ((hash >> 16) & 0xbf) as u8,
    ]
}

fn scale(colour: [u8; 3], factor: f32) -> [u8; 3] {
    colour.map(|c| (f32::from(c) * factor).round().clamp(0.0, 255.0) as u8)
}

impl SceneRenderer for PreviewRenderer {
    fn load_assets(
        &mut self,
        prefix: &Path,
        on_event: &mut dyn FnMut(AssetEvent),
    ) -> PipelineResult<usize> {
        info!(prefix = %prefix.display(), scenes = self.scenes.len(), "Loading scene assets");

        for scene in &self.scenes {
            on_event(AssetEvent::loading(scene.clone()));
            if prefix.join(scene.as_str()).exists() {
                debug!(scene = %scene, "Found scene asset directory");
            }
            self.palette.insert(scene.clone(), scene_colour(scene));
            on_event(AssetEvent::ready(scene.clone()));
        }

        Ok(self.palette.len())
    }

    fn select_scene(&mut self, scene: &SceneId) -> PipelineResult<()> {
        if !self.palette.contains_key(scene) {
            return Err(PipelineError::render(format!("scene '{}' is not loaded", scene)));
        }
        self.selected = Some(scene.clone());
        Ok(())
    }

    fn render_frame(&mut self, counters: &CounterVector) -> PipelineResult<RasterFrame> {
        let colour = self.base_colour()?;
        let background = scale(colour, 0.15);
        let zones = counters.zone_counters();
        let mut frame = RasterFrame::blank(self.width, self.height);
        if zones.is_empty() {
            return Ok(frame);
        }

        let width = self.width as usize;
        let height = self.height as usize;
        for x in 0..width {
            let zone = x * zones.len() / width;
            let level = zones[zone] as f32 / self.max_counter as f32;
            let bar = (level.min(1.0) * height as f32).round() as usize;
            let bright = scale(colour, 0.4 + 0.6 * level.min(1.0));

            for y in 0..height {
                let pixel = if y >= height - bar { bright } else { background };
                let offset = (y * width + x) * RasterFrame::CHANNELS;
                frame.pixels[offset..offset + RasterFrame::CHANNELS].copy_from_slice(&pixel);
            }
        }

        Ok(frame)
    }

    fn empty_frame(&self) -> RasterFrame {
        RasterFrame::blank(self.width, self.height)
    }
}
