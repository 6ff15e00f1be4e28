//! Ear clipping over a simple polygon in its own 2D plane.
//!
//! The ear with the smallest interior angle is clipped first. Each emitted
//! triangle whose smallest angle is below 30° is checked against the
//! triangles already emitted: when flipping a shared diagonal raises the
//! minimum angle of the pair, the flipped pair is kept instead.

use crate::error::FaceError;
use photomodel_core::intersect::{is_clockwise, is_point_inside_triangle};
use photomodel_core::linalg::{perp_dot, Vec2};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use tracing::debug;

const MIN_QUALITY_ANGLE: f64 = PI / 6.0;
const ANGLE_EPSILON: f64 = 1e-9;

/// Triangulates `points` (either winding) into `n - 2` index triangles that
/// keep the polygon's winding.
pub fn triangulate(points: &[Vec2]) -> Result<Vec<[usize; 3]>, FaceError> {
    let n = points.len();
    if n < 3 {
        return Err(FaceError::TooFewVertices { count: n });
    }

    let mut ring = Ring::new(points);
    let mut triangles = Vec::with_capacity(n - 2);

    while ring.remaining > 3 {
        if ring.ears.is_empty() {
            ring.refresh_all();
        }
        let ear = ring.best_ear().ok_or(FaceError::Triangulation {
            reason: "no ear left; polygon is self-intersecting or degenerate",
        })?;
        let triangle = ring.clip(ear);
        push_improved(points, &mut triangles, triangle);
    }
    let last = ring.last_triangle();
    if orientation(points, last).abs() <= ANGLE_EPSILON {
        return Err(FaceError::Triangulation {
            reason: "remaining vertices are collinear",
        });
    }
    push_improved(points, &mut triangles, last);

    Ok(triangles)
}

struct Ring<'a> {
    points: &'a [Vec2],
    clockwise: bool,
    prev: Vec<usize>,
    next: Vec<usize>,
    active: Vec<bool>,
    angle: Vec<f64>,
    ears: BTreeSet<usize>,
    remaining: usize,
}

impl<'a> Ring<'a> {
    fn new(points: &'a [Vec2]) -> Self {
        let n = points.len();
        let mut ring = Self {
            points,
            clockwise: is_clockwise(points),
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            next: (0..n).map(|i| (i + 1) % n).collect(),
            active: vec![true; n],
            angle: vec![0.0; n],
            ears: BTreeSet::new(),
            remaining: n,
        };
        ring.refresh_all();
        ring
    }

    /// Recomputes every active vertex; clipping only updates the two
    /// neighbours of the removed ear.
    fn refresh_all(&mut self) {
        let active: Vec<usize> = (0..self.points.len()).filter(|&i| self.active[i]).collect();
        for &i in &active {
            self.angle[i] = self.interior_angle(i);
        }
        for &i in &active {
            self.refresh_ear(i);
        }
    }

    /// Interior angle in `[0, 2π)` measured on the polygon's inside.
    fn interior_angle(&self, i: usize) -> f64 {
        let cur = self.points[i];
        let to_prev = self.points[self.prev[i]] - cur;
        let to_next = self.points[self.next[i]] - cur;
        let (a, b) = if self.clockwise {
            (to_prev, to_next)
        } else {
            (to_next, to_prev)
        };
        let theta = perp_dot(a, b).atan2(a.dot(&b));
        if theta < 0.0 {
            theta + 2.0 * PI
        } else {
            theta
        }
    }

    fn is_ear(&self, i: usize) -> bool {
        let angle = self.angle[i];
        if angle <= ANGLE_EPSILON || angle >= PI - ANGLE_EPSILON {
            return false;
        }
        let (p, n) = (self.prev[i], self.next[i]);
        let (a, b, c) = (self.points[p], self.points[i], self.points[n]);
        let mut j = self.next[n];
        while j != p {
            let q = self.points[j];
            if q != a && q != b && q != c
                && (is_point_inside_triangle(&q, &a, &b, &c) || lies_on_diagonal(&q, &a, &c))
            {
                return false;
            }
            j = self.next[j];
        }
        true
    }

    fn refresh_ear(&mut self, i: usize) {
        if self.is_ear(i) {
            self.ears.insert(i);
        } else {
            self.ears.remove(&i);
        }
    }

    fn best_ear(&self) -> Option<usize> {
        self.ears
            .iter()
            .copied()
            .min_by(|&a, &b| self.angle[a].total_cmp(&self.angle[b]))
    }

    fn clip(&mut self, i: usize) -> [usize; 3] {
        let (p, n) = (self.prev[i], self.next[i]);
        self.active[i] = false;
        self.ears.remove(&i);
        self.next[p] = n;
        self.prev[n] = p;
        self.remaining -= 1;

        for v in [p, n] {
            self.angle[v] = self.interior_angle(v);
        }
        for v in [p, n] {
            self.refresh_ear(v);
        }
        [p, i, n]
    }

    fn last_triangle(&self) -> [usize; 3] {
        let first = self.active.iter().position(|&a| a).unwrap_or(0);
        let second = self.next[first];
        [first, second, self.next[second]]
    }
}

/// A vertex strictly between the ends of a clipping diagonal would be cut
/// off from the rest of the ring.
fn lies_on_diagonal(q: &Vec2, a: &Vec2, c: &Vec2) -> bool {
    let ac = c - a;
    let len2 = ac.norm_squared();
    if len2 == 0.0 {
        return false;
    }
    let t = (q - a).dot(&ac) / len2;
    t > 0.0 && t < 1.0 && perp_dot(ac, q - a).abs() <= ANGLE_EPSILON * len2
}

fn orientation(points: &[Vec2], t: [usize; 3]) -> f64 {
    perp_dot(points[t[1]] - points[t[0]], points[t[2]] - points[t[0]])
}

fn corner_angle(at: Vec2, a: Vec2, b: Vec2) -> f64 {
    let u = a - at;
    let v = b - at;
    let len = u.norm() * v.norm();
    if len == 0.0 {
        return 0.0;
    }
    (u.dot(&v) / len).clamp(-1.0, 1.0).acos()
}

pub fn min_angle(points: &[Vec2], t: [usize; 3]) -> f64 {
    let (a, b, c) = (points[t[0]], points[t[1]], points[t[2]]);
    corner_angle(a, b, c)
        .min(corner_angle(b, c, a))
        .min(corner_angle(c, a, b))
}

/// Finds an emitted triangle containing the directed edge `from -> to`;
/// returns its index and its third vertex.
fn find_neighbour(triangles: &[[usize; 3]], from: usize, to: usize) -> Option<(usize, usize)> {
    triangles.iter().enumerate().find_map(|(idx, t)| {
        (0..3)
            .find(|&k| t[k] == from && t[(k + 1) % 3] == to)
            .map(|k| (idx, t[(k + 2) % 3]))
    })
}

fn push_improved(points: &[Vec2], triangles: &mut Vec<[usize; 3]>, triangle: [usize; 3]) {
    let quality = min_angle(points, triangle);
    if quality < MIN_QUALITY_ANGLE {
        let winding = orientation(points, triangle).signum();
        for k in 0..3 {
            let (a, b, c) = (triangle[k], triangle[(k + 1) % 3], triangle[(k + 2) % 3]);
            let Some((idx, d)) = find_neighbour(triangles, b, a) else {
                continue;
            };
            let flipped = [[a, d, c], [d, b, c]];
            if flipped
                .iter()
                .any(|&t| orientation(points, t) * winding <= ANGLE_EPSILON)
            {
                continue;
            }
            let before = quality.min(min_angle(points, triangles[idx]));
            let after = min_angle(points, flipped[0]).min(min_angle(points, flipped[1]));
            if after > before {
                debug!(
                    diagonal = ?(a, b),
                    replacement = ?(c, d),
                    before,
                    after,
                    "flipped shared diagonal"
                );
                triangles[idx] = flipped[0];
                triangles.push(flipped[1]);
                return;
            }
        }
    }
    triangles.push(triangle);
}
