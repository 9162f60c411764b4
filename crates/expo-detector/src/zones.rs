//! Zone presence aggregation.
//!
//! Each camera reports a `vertical × horizontal` grid of distances. The
//! horizontal axis is split into `segments_per_camera` contiguous column
//! groups (the last group absorbs any remainder). A zone is present when any
//! cell of its column group, in any row, lies inside the camera's distance
//! window.
//!
//! Malformed camera frames never fail: missing cameras read as all-zero
//! grids and frames of the wrong length are zero-padded or truncated.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use expo_models::{CameraFrame, PresenceGrid, PresenceSample, PresenceVector};

use crate::error::{DetectorError, DetectorResult};

/// Inclusive `[min, max]` distance window that counts as "occupied".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceWindow {
    pub min: f32,
    pub max: f32,
}

impl DistanceWindow {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// NaN never matches.
    pub fn contains(&self, distance: f32) -> bool {
        distance >= self.min && distance <= self.max
    }
}

/// Geometry of the camera grids and their partition into zones.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLayout {
    grid_vertical: usize,
    grid_horizontal: usize,
    segments_per_camera: usize,
    windows: Vec<DistanceWindow>,
    mirror: bool,
}

impl ZoneLayout {
    /// Create a layout with one distance window per camera.
    pub fn new(
        grid_vertical: usize,
        grid_horizontal: usize,
        segments_per_camera: usize,
        windows: Vec<DistanceWindow>,
        mirror: bool,
    ) -> DetectorResult<Self> {
        if windows.is_empty() {
            return Err(DetectorError::invalid_layout("at least one camera is required"));
        }
        if grid_vertical == 0 || grid_horizontal == 0 {
            return Err(DetectorError::invalid_layout(format!(
                "grid must be non-empty, got {}x{}",
                grid_vertical, grid_horizontal
            )));
        }
        if segments_per_camera == 0 || segments_per_camera > grid_horizontal {
            return Err(DetectorError::invalid_layout(format!(
                "segments per camera must be in 1..={}, got {}",
                grid_horizontal, segments_per_camera
            )));
        }
        if let Some((camera, window)) = windows
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.min <= w.max))
        {
            return Err(DetectorError::invalid_layout(format!(
                "camera {} has an empty distance window [{}, {}]",
                camera, window.min, window.max
            )));
        }

        Ok(Self {
            grid_vertical,
            grid_horizontal,
            segments_per_camera,
            windows,
            mirror,
        })
    }

    /// Layout where every camera shares the same distance window.
    pub fn uniform(
        cameras: usize,
        grid_vertical: usize,
        grid_horizontal: usize,
        segments_per_camera: usize,
        window: DistanceWindow,
        mirror: bool,
    ) -> DetectorResult<Self> {
        Self::new(
            grid_vertical,
            grid_horizontal,
            segments_per_camera,
            vec![window; cameras],
            mirror,
        )
    }

    pub fn camera_count(&self) -> usize {
        self.windows.len()
    }

    pub fn cells_per_camera(&self) -> usize {
        self.grid_vertical * self.grid_horizontal
    }

    /// Length of every presence vector produced by this layout.
    pub fn zone_count(&self) -> usize {
        self.camera_count() * self.segments_per_camera
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror
    }

    /// Column ranges of each zone within one camera grid.
    pub fn column_groups(&self) -> Vec<Range<usize>> {
        let base = self.grid_horizontal / self.segments_per_camera;
        (0..self.segments_per_camera)
            .map(|segment| {
                let start = segment * base;
                let end = if segment + 1 == self.segments_per_camera {
                    self.grid_horizontal
                } else {
                    start + base
                };
                start..end
            })
            .collect()
    }

    /// Coerce a raw sensor grid to the expected shape.
    pub fn normalize(&self, grid: &PresenceGrid) -> PresenceGrid {
        let cells = self.cells_per_camera();

        if grid.cameras.len() != self.camera_count() {
            debug!(
                expected = self.camera_count(),
                actual = grid.cameras.len(),
                "Camera count mismatch, filling missing cameras with zeros"
            );
        }

        let cameras = (0..self.camera_count())
            .map(|index| match grid.cameras.get(index) {
                Some(frame) if frame.distances.len() == cells => frame.clone(),
                Some(frame) => {
                    debug!(
                        camera = index,
                        expected = cells,
                        actual = frame.distances.len(),
                        "Reshaping malformed camera frame"
                    );
                    let mut distances = frame.distances.clone();
                    distances.resize(cells, 0.0);
                    CameraFrame::new(distances)
                }
                None => CameraFrame::zeros(cells),
            })
            .collect();

        PresenceGrid::new(cameras)
    }

    /// Compute zone presence for a grid. Never fails.
    pub fn aggregate(&self, grid: &PresenceGrid) -> PresenceVector {
        let grid = self.normalize(grid);
        let groups = self.column_groups();
        let cameras = self.camera_count();

        let mut zones = Vec::with_capacity(self.zone_count());
        for slot in 0..cameras {
            let camera = if self.mirror { cameras - 1 - slot } else { slot };
            let frame = &grid.cameras[camera];
            let window = self.windows[camera];

            for group in &groups {
                let occupied = group.clone().any(|column| {
                    let source_column = if self.mirror {
                        self.grid_horizontal - 1 - column
                    } else {
                        column
                    };
                    (0..self.grid_vertical).any(|row| {
                        window.contains(frame.distances[row * self.grid_horizontal + source_column])
                    })
                });
                zones.push(occupied);
            }
        }

        PresenceVector::from(zones)
    }

    /// Normalize a raw sensor grid and derive its zones.
    pub fn sample(&self, grid: &PresenceGrid) -> PresenceSample {
        let normalized = self.normalize(grid);
        let zones = self.aggregate(&normalized);
        PresenceSample::new(normalized, zones)
    }
}
