//! Pixel-space positions, axis-aligned boxes and movement intent.

use crate::TILE_SIZE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Pixel center of the grid cell at `(row, col)`.
    pub fn tile_center(row: usize, col: usize) -> Self {
        Self {
            x: col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            y: row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        }
    }

    /// Grid cell containing this point as `(row, col)`. Negative coordinates
    /// saturate to the first row/column.
    pub fn to_grid(&self) -> (usize, usize) {
        let row = (self.y / TILE_SIZE).floor().max(0.0) as usize;
        let col = (self.x / TILE_SIZE).floor().max(0.0) as usize;
        (row, col)
    }

    pub fn distance_to(&self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Moves up to `distance` pixels straight towards `target`.
    pub fn step_towards(&self, target: Position, distance: f32) -> Self {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            return *self;
        }
        let distance = distance.min(length);
        self.offset(dx / length * distance, dy / length * distance)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(center: Position, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    /// The full cell at `(row, col)`.
    pub fn tile(row: usize, col: usize) -> Self {
        Self {
            x: col as f32 * TILE_SIZE,
            y: row as f32 * TILE_SIZE,
            width: TILE_SIZE,
            height: TILE_SIZE,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

/// Desired movement for one tick, each axis in `-1..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveIntent {
    pub dx: i8,
    pub dy: i8,
}

impl MoveIntent {
    /// Opposing keys cancel out; the two axes are independent.
    pub fn from_keys(up: bool, down: bool, left: bool, right: bool) -> Self {
        Self {
            dx: right as i8 - left as i8,
            dy: down as i8 - up as i8,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Facing implied by this intent; horizontal movement wins over vertical.
    pub fn facing(&self) -> Option<Direction> {
        match (self.dx, self.dy) {
            (dx, _) if dx > 0 => Some(Direction::Right),
            (dx, _) if dx < 0 => Some(Direction::Left),
            (_, dy) if dy > 0 => Some(Direction::Down),
            (_, dy) if dy < 0 => Some(Direction::Up),
            _ => None,
        }
    }
}
