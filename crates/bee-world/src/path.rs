//! Waypoint paths and per-instance traversal state

use bee_core::geometry::distance3;
use bee_core::spline::sample_curve;
use bee_core::{BeeError, Color, PathId, Renderer, Result, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Line segments drawn per curve span
const CURVE_SAMPLES: usize = 12;

/// One point of a path with the speed multiplier used while heading to it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub speed: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64, speed: f64) -> Self {
        Self { x, y, z, speed }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A named sequence of waypoints shared by every instance following it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    pub name: String,
    coordinates: Vec<Waypoint>,
    pub is_curved: bool,
    pub is_closed: bool,
}

impl Path {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_coordinates(mut self, coordinates: impl IntoIterator<Item = Waypoint>) -> Self {
        self.coordinates.extend(coordinates);
        self
    }

    pub fn coordinates(&self) -> &[Waypoint] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn add_coordinate(&mut self, x: f64, y: f64, z: f64, speed: f64) {
        self.coordinates.push(Waypoint::new(x, y, z, speed));
    }

    pub fn remove_last_coordinate(&mut self) -> Result<Waypoint> {
        self.coordinates
            .pop()
            .ok_or_else(|| BeeError::NotApplicable(format!("path \"{}\" is empty", self.name)))
    }

    pub fn remove_coordinate(&mut self, index: usize) -> Result<Waypoint> {
        if index >= self.coordinates.len() {
            return Err(BeeError::IndexOutOfRange {
                what: "path coordinate",
                index,
                len: self.coordinates.len(),
            });
        }
        Ok(self.coordinates.remove(index))
    }

    /// Human-readable listing of the waypoints, one per line
    pub fn coordinate_table(&self) -> String {
        let mut table = String::from("(x, y, z, speed)\n");
        for w in &self.coordinates {
            let _ = writeln!(table, "({}, {}, {}, {})", w.x, w.y, w.z, w.speed);
        }
        table
    }

    /// Draw the path as traversed by `follower`
    pub fn draw_debug(&self, follower: &PathFollower, color: Color, renderer: &mut dyn Renderer) {
        let points: Vec<Vec3> = (0..self.len())
            .filter_map(|i| follower.node_position(self, i))
            .collect();
        if points.len() < 2 {
            return;
        }

        let line: Vec<Vec3> = if self.is_curved {
            sample_curve(&points, CURVE_SAMPLES, self.is_closed)
        } else if self.is_closed {
            points.iter().chain(points.first()).copied().collect()
        } else {
            points
        };
        for pair in line.windows(2) {
            renderer.draw_line(pair[0], pair[1], color);
        }
    }
}

/// What to do once the last waypoint is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEndAction {
    #[default]
    Stop,
    /// Jump back to the first waypoint and go again
    RestartFromStart,
    /// Go again with the path re-anchored at the current position
    RestartFromCurrent,
    /// Turn around and retrace the path
    Reverse,
}

/// Result of checking whether the next node was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeUpdate {
    /// Still travelling toward the target node
    Holding,
    Advanced,
    /// No node left in the direction of travel
    Ended,
}

/// Result of applying the end action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathEndOutcome {
    /// The path is finished and should be cleared
    Stop,
    /// Keep following, after moving the instance here
    Teleport(Vec3),
    Continue,
}

/// Progress of one instance along a shared path.
///
/// Waypoints are translated so the first one sits at `start`. For absolute
/// paths `start` is the first waypoint itself, so the instance follows the
/// exact coordinates; relative paths start wherever the instance was.
#[derive(Debug, Clone, PartialEq)]
pub struct PathFollower {
    pub path: PathId,
    pub start: Vec3,
    /// Signed traversal speed multiplier, negative runs backwards
    pub speed: f64,
    pub end_action: PathEndAction,
    node: usize,
    is_absolute: bool,
}

impl PathFollower {
    pub fn new(
        id: PathId,
        path: &Path,
        speed: f64,
        end_action: PathEndAction,
        is_absolute: bool,
        current: Vec3,
    ) -> Result<Self> {
        let Some(first) = path.coordinates.first() else {
            return Err(BeeError::NotApplicable(format!(
                "path \"{}\" has no coordinates",
                path.name
            )));
        };
        Ok(Self {
            path: id,
            start: if is_absolute { first.position() } else { current },
            speed,
            end_action,
            node: 0,
            is_absolute,
        })
    }

    /// Index of the last waypoint reached (or, running backwards, the next)
    pub fn node(&self) -> usize {
        self.node
    }

    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }

    /// Where waypoint `index` lies for this follower
    pub fn node_position(&self, path: &Path, index: usize) -> Option<Vec3> {
        let first = path.coordinates.first()?.position();
        let w = path.coordinates.get(index)?.position();
        Some(self.start + (w - first))
    }

    /// Index of the node being steered toward
    pub fn target_node(&self, path: &Path) -> usize {
        if self.speed >= 0.0 && self.node + 1 < path.len() {
            self.node + 1
        } else {
            self.node
        }
    }

    pub fn target(&self, path: &Path) -> Option<Vec3> {
        self.node_position(path, self.target_node(path))
    }

    /// Move to the next node once `position` is within `reach` of it
    pub fn update_node(&mut self, path: &Path, position: Vec3, reach: f64) -> NodeUpdate {
        if path.is_empty() {
            return NodeUpdate::Ended;
        }
        self.node = self.node.min(path.len() - 1);

        if self.speed >= 0.0 {
            if self.node + 1 >= path.len() {
                return NodeUpdate::Ended;
            }
            if self.within(path, self.node + 1, position, reach) {
                self.node += 1;
                return NodeUpdate::Advanced;
            }
        } else if self.within(path, self.node, position, reach) {
            if self.node == 0 {
                return NodeUpdate::Ended;
            }
            self.node -= 1;
            return NodeUpdate::Advanced;
        }
        NodeUpdate::Holding
    }

    fn within(&self, path: &Path, index: usize, position: Vec3, reach: f64) -> bool {
        self.node_position(path, index).is_some_and(|p| {
            let d = p - position;
            distance3(d.x, d.y, d.z) < reach
        })
    }

    /// Apply the end action after [`NodeUpdate::Ended`]
    pub fn handle_end(&mut self, path: &Path, current: Vec3) -> PathEndOutcome {
        match self.end_action {
            PathEndAction::Stop => PathEndOutcome::Stop,
            PathEndAction::RestartFromStart => {
                self.node = 0;
                PathEndOutcome::Teleport(self.start)
            }
            PathEndAction::RestartFromCurrent => {
                self.node = 0;
                self.start = current;
                PathEndOutcome::Continue
            }
            PathEndAction::Reverse => {
                self.speed = -self.speed;
                self.node = if self.speed >= 0.0 {
                    0
                } else {
                    path.len().saturating_sub(2)
                };
                PathEndOutcome::Continue
            }
        }
    }

    /// Go back to the first node, keeping the absolute or relative anchoring
    pub fn reset(&mut self, path: &Path, current: Vec3) -> PathEndOutcome {
        self.node = 0;
        if self.is_absolute {
            if let Some(first) = path.coordinates.first() {
                self.start = first.position();
            }
            PathEndOutcome::Teleport(self.start)
        } else {
            self.start = current;
            PathEndOutcome::Continue
        }
    }
}
