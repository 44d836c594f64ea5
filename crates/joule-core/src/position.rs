use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance in the x/y plane; altitude is ignored.
    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Signed altitude change from `self` to `other` (positive = climbing).
    pub fn altitude_delta(&self, other: &Position) -> f64 {
        other.z - self.z
    }
}

/// Last observed position of a mobile node.
///
/// Starts without a baseline: the first observation only records where the
/// node is, so the unobserved leg before it is never charged.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    last: Option<Position>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Position> {
        self.last
    }

    pub fn has_baseline(&self) -> bool {
        self.last.is_some()
    }

    /// Record `next` and return the previous position, if any.
    pub fn observe(&mut self, next: Position) -> Option<Position> {
        self.last.replace(next)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
