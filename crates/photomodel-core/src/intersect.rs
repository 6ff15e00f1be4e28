//! Intersection, projection and containment routines.
//!
//! Every routine that can fail to produce a point returns `Option`; callers
//! never see NaN-bearing results.

use crate::geom::{Line2D, Plane3D, Ray, Ray2D, Ray3D, Rect2, DIRECTION_EPSILON};
use crate::linalg::{perp_dot, rotate_align, Mat3, Vec2, Vec3};
use crate::solver::solve3;
use itertools::Itertools;
use nalgebra::SVector;

/// Relative tolerance on the cross product of two directions below which
/// they count as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineIntersection {
    pub point: Vec2,
    /// Relative position along the first line (0 = start, 1 = end).
    pub t_a: f64,
    /// Relative position along the second line.
    pub t_b: f64,
}

impl LineIntersection {
    pub fn within_segments(&self) -> bool {
        (0.0..=1.0).contains(&self.t_a) && (0.0..=1.0).contains(&self.t_b)
    }
}

/// Intersection of the infinite lines through `a` and `b`.
pub fn line_line_intersection(a: &Line2D, b: &Line2D) -> Option<LineIntersection> {
    let p = a.start;
    let r = a.delta();
    let q = b.start;
    let s = b.delta();

    let r_cross_s = perp_dot(r, s);
    if r_cross_s.abs() <= PARALLEL_EPSILON * r.norm() * s.norm() || r_cross_s == 0.0 {
        return None;
    }

    let q_minus_p = q - p;
    let t = perp_dot(q_minus_p, s) / r_cross_s;
    let u = perp_dot(q_minus_p, r) / r_cross_s;

    Some(LineIntersection {
        point: p + r * t,
        t_a: t,
        t_b: u,
    })
}

/// First crossing of `ray` with the edges of `rect`, tested top, bottom,
/// left, right.
pub fn ray_box_intersection(ray: &Ray2D, rect: &Rect2) -> Option<Vec2> {
    let guide = Line2D::new(ray.start(), ray.start() + ray.direction());
    rect.edges().iter().find_map(|edge| {
        let hit = line_line_intersection(&guide, edge)?;
        (hit.t_a >= 0.0 && (0.0..=1.0).contains(&hit.t_b)).then_some(hit.point)
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayProjection<const D: usize> {
    pub point: SVector<f64, D>,
    /// Signed distance from the ray start along its direction.
    pub t: f64,
    pub distance: f64,
}

pub fn project_to_ray<const D: usize>(
    point: &SVector<f64, D>,
    ray: &Ray<D>,
) -> RayProjection<D> {
    let t = (point - ray.start()).dot(&ray.direction());
    let foot = ray.point_at(t);
    RayProjection {
        point: foot,
        t,
        distance: (point - foot).norm(),
    }
}

/// Crossing-number parity test with a horizontal ray toward +X.
///
/// Known limitation: the result is unreliable when the test ray passes
/// exactly through a polygon vertex.
pub fn is_point_inside_polygon(p: &Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    for (a, b) in polygon.iter().circular_tuple_windows() {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn is_right_of(p: &Vec2, from: &Vec2, to: &Vec2) -> bool {
    perp_dot(to - from, p - from) < 0.0
}

fn is_left_of(p: &Vec2, from: &Vec2, to: &Vec2) -> bool {
    perp_dot(to - from, p - from) > 0.0
}

/// Strict containment; points on an edge are outside. Works for either
/// winding of `a, b, c`.
pub fn is_point_inside_triangle(p: &Vec2, a: &Vec2, b: &Vec2, c: &Vec2) -> bool {
    let orientation = perp_dot(b - a, c - a);
    if orientation < 0.0 {
        is_right_of(p, a, b) && is_right_of(p, b, c) && is_right_of(p, c, a)
    } else if orientation > 0.0 {
        is_left_of(p, a, b) && is_left_of(p, b, c) && is_left_of(p, c, a)
    } else {
        false
    }
}

/// Shoelace area, positive for counter-clockwise polygons (y up).
pub fn signed_area(polygon: &[Vec2]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    polygon
        .iter()
        .circular_tuple_windows()
        .map(|(a, b)| perp_dot(*a, *b))
        .sum::<f64>()
        * 0.5
}

pub fn is_clockwise(polygon: &[Vec2]) -> bool {
    signed_area(polygon) < 0.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayRayClosest {
    pub point_a: Vec3,
    pub point_b: Vec3,
    pub t_a: f64,
    pub t_b: f64,
    pub distance: f64,
}

/// Closest points between the lines carrying two rays. Parameters may be
/// negative; parallel rays have no unique answer and return `None`.
pub fn ray_ray_closest(a: &Ray3D, b: &Ray3D) -> Option<RayRayClosest> {
    let dir_a = a.direction();
    let dir_b = b.direction();
    let cross = dir_a.cross(&dir_b);
    let len = cross.norm();
    if len < DIRECTION_EPSILON {
        return None;
    }
    let tangent = cross / len;

    let system = Mat3::from_columns(&[dir_a, -dir_b, tangent]);
    let x = solve3(&system, &(b.start() - a.start())).ok()?;

    Some(RayRayClosest {
        point_a: a.point_at(x[0]),
        point_b: b.point_at(x[1]),
        t_a: x[0],
        t_b: x[1],
        distance: x[2].abs(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Signed distance along the ray; negative hits lie behind the start.
    pub distance: f64,
}

pub fn ray_plane_intersection(ray: &Ray3D, plane: &Plane3D) -> Option<RayHit> {
    let denom = ray.direction().dot(&plane.normal());
    if denom.abs() < DIRECTION_EPSILON {
        return None;
    }
    let distance = (plane.point() - ray.start()).dot(&plane.normal()) / denom;
    Some(RayHit {
        point: ray.point_at(distance),
        distance,
    })
}

/// Hit of `ray` with a planar polygon whose unit normal is `normal`.
pub fn ray_polygon_intersection(ray: &Ray3D, polygon: &[Vec3], normal: &Vec3) -> Option<RayHit> {
    if polygon.len() < 3 {
        return None;
    }
    let plane = Plane3D::new(polygon[0], *normal)?;
    let hit = ray_plane_intersection(ray, &plane)?;

    let rotation = rotate_align(&plane.normal(), &Vec3::z());
    let flat: Vec<Vec2> = polygon.iter().map(|v| (rotation * v).xy()).collect();
    let flat_hit = (rotation * hit.point).xy();

    is_point_inside_polygon(&flat_hit, &flat).then_some(hit)
}
