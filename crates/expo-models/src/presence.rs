//! Depth grids and presence vectors.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One camera's distance readings, row-major (`vertical × horizontal`), in metres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraFrame {
    pub distances: Vec<f32>,
}

impl CameraFrame {
    pub fn new(distances: Vec<f32>) -> Self {
        Self { distances }
    }

    /// All-zero frame with the given cell count.
    pub fn zeros(cells: usize) -> Self {
        Self {
            distances: vec![0.0; cells],
        }
    }
}

/// Distance readings for every camera, as returned by one sensor sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PresenceGrid {
    pub cameras: Vec<CameraFrame>,
}

impl PresenceGrid {
    pub fn new(cameras: Vec<CameraFrame>) -> Self {
        Self { cameras }
    }

    /// Zero-valued grid used whenever a sensor read fails.
    pub fn zeros(camera_count: usize, cells_per_camera: usize) -> Self {
        Self {
            cameras: (0..camera_count)
                .map(|_| CameraFrame::zeros(cells_per_camera))
                .collect(),
        }
    }
}

/// Ordered per-zone presence flags.
///
/// Zones are laid out camera by camera, each camera contributing
/// `horizontal_segments_per_camera` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PresenceVector(Vec<bool>);

impl PresenceVector {
    /// Vector with every zone absent.
    pub fn absent(zones: usize) -> Self {
        Self(vec![false; zones])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether zone `index` is occupied. Out-of-range zones read as absent.
    pub fn is_present(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Number of occupied zones.
    pub fn occupied(&self) -> usize {
        self.0.iter().filter(|p| **p).count()
    }
}

impl From<Vec<bool>> for PresenceVector {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

impl FromIterator<bool> for PresenceVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A published sampling tick: the normalized grid plus the zone flags derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PresenceSample {
    pub grid: PresenceGrid,
    pub zones: PresenceVector,
    pub captured_at: DateTime<Utc>,
}

impl PresenceSample {
    pub fn new(grid: PresenceGrid, zones: PresenceVector) -> Self {
        Self {
            grid,
            zones,
            captured_at: Utc::now(),
        }
    }
}
