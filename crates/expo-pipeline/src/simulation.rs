//! Simulated depth sensors.
//!
//! Visitors enter each camera's grid from an edge, wander, stop for a while
//! and eventually walk out through the nearest edge. Cells under a visitor
//! report the visitor's distance; every other cell reports 0 (no reading).

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use expo_detector::DistanceWindow;
use expo_models::{CameraFrame, PresenceGrid};

use crate::collaborators::PresenceSensor;
use crate::config::DepthConfig;
use crate::metrics;

/// Crowd behaviour of the simulation.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub cameras: usize,
    pub grid_vertical: usize,
    pub grid_horizontal: usize,
    /// Distances handed to visitors
    pub window: DistanceWindow,
    pub max_visitors: usize,
    /// Per-sample chance of a new visitor entering
    pub spawn_probability: f64,
    /// Per-sample chance of a walking visitor stopping
    pub stop_probability: f64,
    /// Per-sample chance of a standing visitor walking on
    pub resume_probability: f64,
    /// Per-sample chance of a visitor heading for the exit
    pub leave_probability: f64,
    /// Cells travelled per sample
    pub step: f32,
    /// Per-sample chance of a failed read
    pub dropout_probability: f64,
}

impl SimulationSettings {
    pub fn from_depth(depth: &DepthConfig) -> Self {
        Self {
            cameras: depth.cameras,
            grid_vertical: depth.grid_vertical,
            grid_horizontal: depth.grid_horizontal,
            window: depth.distance_window(),
            max_visitors: depth.cameras * 2,
            spawn_probability: 0.05,
            stop_probability: 0.1,
            resume_probability: 0.02,
            leave_probability: 0.005,
            step: 0.25,
            dropout_probability: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Visitor {
    camera: usize,
    y: f32,
    x: f32,
    distance: f32,
    dy: f32,
    dx: f32,
    moving: bool,
    leaving: bool,
}

impl Visitor {
    fn advance(&mut self, step: f32) {
        if self.moving {
            self.y += self.dy * step;
            self.x += self.dx * step;
        }
    }

    fn turn(&mut self, angle: f32) {
        self.dy = angle.sin();
        self.dx = angle.cos();
    }

    /// Head straight for the closest grid edge.
    fn start_leaving(&mut self, rows: usize, columns: usize) {
        self.leaving = true;
        self.moving = true;

        let left = self.x;
        let right = columns as f32 - 1.0 - self.x;
        let top = self.y;
        let bottom = rows as f32 - 1.0 - self.y;
        let nearest = left.min(right).min(top).min(bottom);

        (self.dx, self.dy) = if nearest == left {
            (-1.0, 0.0)
        } else if nearest == right {
            (1.0, 0.0)
        } else if nearest == top {
            (0.0, -1.0)
        } else {
            (0.0, 1.0)
        };
    }

    fn is_out_of_bounds(&self, rows: usize, columns: usize) -> bool {
        self.y < 0.0 || self.y >= rows as f32 || self.x < 0.0 || self.x >= columns as f32
    }
}

/// Sensor array driven by simulated visitors.
#[derive(Debug)]
pub struct SimulatedSensor {
    settings: SimulationSettings,
    visitors: Vec<Visitor>,
    rng: StdRng,
    samples: u64,
    dropouts: u64,
}

impl SimulatedSensor {
    pub fn new(settings: SimulationSettings, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            settings,
            visitors: Vec::new(),
            rng,
            samples: 0,
            dropouts: 0,
        }
    }

    pub fn visitor_count(&self) -> usize {
        self.visitors.len()
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn dropouts(&self) -> u64 {
        self.dropouts
    }

    fn cells(&self) -> usize {
        self.settings.grid_vertical * self.settings.grid_horizontal
    }

    fn spawn(&mut self) {
        let rows = self.settings.grid_vertical;
        let columns = self.settings.grid_horizontal;
        let from_left = self.rng.random_bool(0.5);
        let window = self.settings.window;

        let mut visitor = Visitor {
            camera: self.rng.random_range(0..self.settings.cameras),
            y: self.rng.random_range(0.0..rows as f32),
            x: if from_left { 0.0 } else { columns as f32 - 1.0 },
            distance: if window.max > window.min {
                self.rng.random_range(window.min..window.max)
            } else {
                window.min
            },
            dy: 0.0,
            dx: 0.0,
            moving: true,
            leaving: false,
        };
        // Enter facing into the grid.
        let heading: f32 = self.rng.random_range(-0.25 * TAU..0.25 * TAU);
        visitor.turn(if from_left { heading } else { heading + 0.5 * TAU });
        self.visitors.push(visitor);
    }

    fn step(&mut self) {
        let rows = self.settings.grid_vertical;
        let columns = self.settings.grid_horizontal;

        if self.visitors.len() < self.settings.max_visitors
            && self.rng.random_bool(self.settings.spawn_probability)
        {
            self.spawn();
            debug!(visitors = self.visitors.len(), "Simulated visitor entered");
        }

        for visitor in &mut self.visitors {
            if !visitor.leaving {
                if self.rng.random_bool(self.settings.leave_probability) {
                    visitor.start_leaving(rows, columns);
                } else if visitor.moving && self.rng.random_bool(self.settings.stop_probability) {
                    visitor.moving = false;
                } else if !visitor.moving && self.rng.random_bool(self.settings.resume_probability) {
                    visitor.moving = true;
                    visitor.turn(self.rng.random_range(0.0..TAU));
                }
            }

            visitor.advance(self.settings.step);

            // Wanderers bounce off the edges; only leaving visitors exit.
            if !visitor.leaving && visitor.is_out_of_bounds(rows, columns) {
                visitor.y = visitor.y.clamp(0.0, rows as f32 - 1.0);
                visitor.x = visitor.x.clamp(0.0, columns as f32 - 1.0);
                visitor.turn(self.rng.random_range(0.0..TAU));
            }
        }

        self.visitors.retain(|v| !v.is_out_of_bounds(rows, columns));
    }

    fn render_grid(&self) -> PresenceGrid {
        let columns = self.settings.grid_horizontal;
        let mut cameras = vec![CameraFrame::zeros(self.cells()); self.settings.cameras];

        for visitor in &self.visitors {
            let row = visitor.y.floor() as usize;
            let column = visitor.x.floor() as usize;
            if let Some(frame) = cameras.get_mut(visitor.camera) {
                if let Some(cell) = frame.distances.get_mut(row * columns + column) {
                    *cell = visitor.distance;
                }
            }
        }

        PresenceGrid::new(cameras)
    }
}

impl PresenceSensor for SimulatedSensor {
    fn sample(&mut self) -> PresenceGrid {
        self.samples += 1;
        self.step();

        if self.rng.random_bool(self.settings.dropout_probability) {
            self.dropouts += 1;
            metrics::record_sensor_fallback(self.name());
            debug!(sample = self.samples, "Simulated sensor read failed, reporting zeros");
            return PresenceGrid::zeros(self.settings.cameras, self.cells());
        }

        self.render_grid()
    }

    fn close(&mut self) {
        info!(
            samples = self.samples,
            dropouts = self.dropouts,
            "Simulated sensors closed"
        );
        self.visitors.clear();
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SimulationSettings {
        SimulationSettings {
            spawn_probability: 0.5,
            ..SimulationSettings::from_depth(&DepthConfig::default())
        }
    }

    #[test]
    fn test_grid_shape_matches_settings() {
        let mut sensor = SimulatedSensor::new(settings(), Some(1));
        for _ in 0..50 {
            let grid = sensor.sample();
            assert_eq!(grid.cameras.len(), 3);
            assert!(grid.cameras.iter().all(|c| c.distances.len() == 45));
        }
        assert_eq!(sensor.samples(), 50);
    }

    #[test]
    fn test_visitors_read_inside_window() {
        let window = DepthConfig::default().distance_window();
        let mut sensor = SimulatedSensor::new(settings(), Some(2));
        let mut seen_visitor = false;

        for _ in 0..100 {
            let grid = sensor.sample();
            for distance in grid.cameras.iter().flat_map(|c| c.distances.iter()) {
                if *distance != 0.0 {
                    seen_visitor = true;
                    assert!(window.contains(*distance));
                }
            }
        }

        assert!(seen_visitor);
        assert!(sensor.visitor_count() <= 6);
    }

    #[test]
    fn test_dropouts_report_zero_grid() {
        let mut sensor = SimulatedSensor::new(
            SimulationSettings {
                dropout_probability: 1.0,
                ..settings()
            },
            Some(3),
        );

        let grid = sensor.sample();
        assert!(grid
            .cameras
            .iter()
            .all(|c| c.distances.iter().all(|d| *d == 0.0)));
        assert_eq!(sensor.dropouts(), 1);
    }

    #[test]
    fn test_leaving_visitor_exits_through_nearest_edge() {
        let mut visitor = Visitor {
            camera: 0,
            y: 2.0,
            x: 7.5,
            distance: 1.0,
            dy: 0.0,
            dx: 0.0,
            moving: false,
            leaving: false,
        };
        visitor.start_leaving(5, 9);
        assert_eq!((visitor.dx, visitor.dy), (1.0, 0.0));

        for _ in 0..10 {
            visitor.advance(0.25);
        }
        assert!(visitor.is_out_of_bounds(5, 9));
    }
}
