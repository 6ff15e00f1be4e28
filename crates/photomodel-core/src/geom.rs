use crate::linalg::{Vec2, Vec3};
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// Directions shorter than this cannot be normalized.
pub const DIRECTION_EPSILON: f64 = 1e-12;

/// Finite segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line<const D: usize> {
    pub start: SVector<f64, D>,
    pub end: SVector<f64, D>,
}

pub type Line2D = Line<2>;
pub type Line3D = Line<3>;

impl<const D: usize> Line<D> {
    pub fn new(start: SVector<f64, D>, end: SVector<f64, D>) -> Self {
        Self { start, end }
    }

    pub fn delta(&self) -> SVector<f64, D> {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.delta().norm()
    }

    /// Point at relative position `t` (0 = start, 1 = end).
    pub fn point_at(&self, t: f64) -> SVector<f64, D> {
        self.start + self.delta() * t
    }
}

/// Half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray<const D: usize> {
    start: SVector<f64, D>,
    direction: SVector<f64, D>,
}

pub type Ray2D = Ray<2>;
pub type Ray3D = Ray<3>;

impl<const D: usize> Ray<D> {
    /// Returns `None` for a zero-length direction.
    pub fn new(start: SVector<f64, D>, direction: SVector<f64, D>) -> Option<Self> {
        let len = direction.norm();
        if len < DIRECTION_EPSILON || !len.is_finite() {
            return None;
        }
        Some(Self {
            start,
            direction: direction / len,
        })
    }

    pub fn through(from: SVector<f64, D>, to: SVector<f64, D>) -> Option<Self> {
        Self::new(from, to - from)
    }

    pub fn start(&self) -> SVector<f64, D> {
        self.start
    }

    pub fn direction(&self) -> SVector<f64, D> {
        self.direction
    }

    /// Point at distance `t` from the start.
    pub fn point_at(&self, t: f64) -> SVector<f64, D> {
        self.start + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane3D {
    point: Vec3,
    normal: Vec3,
}

impl Plane3D {
    pub fn new(point: Vec3, normal: Vec3) -> Option<Self> {
        let len = normal.norm();
        if len < DIRECTION_EPSILON || !len.is_finite() {
            return None;
        }
        Some(Self {
            point,
            normal: normal / len,
        })
    }

    pub fn point(&self) -> Vec3 {
        self.point
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

/// Axis-aligned rectangle, e.g. an image frame or a face's flattened extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec2::new(f64::INFINITY, f64::INFINITY),
            max: Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Vec2::zeros(), Vec2::new(width, height))
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Self {
        let mut rect = Self::empty();
        for p in points {
            rect.include_point(*p);
        }
        rect
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn include_point(&mut self, point: Vec2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn contains(&self, p: &Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    /// Corners in order (min.x, min.y), (max.x, min.y), (max.x, max.y), (min.x, max.y).
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Edges in the order top, bottom, left, right (image convention, y down).
    pub fn edges(&self) -> [Line2D; 4] {
        let [a, b, c, d] = self.corners();
        [
            Line2D::new(a, b),
            Line2D::new(d, c),
            Line2D::new(a, d),
            Line2D::new(b, c),
        ]
    }
}
