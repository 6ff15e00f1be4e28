//! Vector/matrix aliases and the handful of 3x3 helpers nalgebra does not
//! provide directly.

use nalgebra::{Matrix3, Rotation3, Unit, Vector2, Vector3};
use std::f64::consts::PI;

pub type Vec2 = Vector2<f64>;
pub type Vec3 = Vector3<f64>;
pub type Mat3 = Matrix3<f64>;

/// Below this magnitude a homogeneous `w` is treated as a point at infinity.
const HOMOGENEOUS_EPSILON: f64 = 1e-12;

pub fn perp_dot(v1: Vec2, v2: Vec2) -> f64 {
    v1.x * v2.y - v1.y * v2.x
}

/// Transposed cofactor matrix: `m * adjugate(m) == det(m) * I`.
pub fn adjugate(m: &Mat3) -> Mat3 {
    let (a, b, c) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let (d, e, f) = (m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let (g, h, i) = (m[(2, 0)], m[(2, 1)], m[(2, 2)]);
    Mat3::new(
        e * i - f * h,
        c * h - b * i,
        b * f - c * e,
        f * g - d * i,
        a * i - c * g,
        c * d - a * f,
        d * h - e * g,
        b * g - a * h,
        a * e - b * d,
    )
}

/// Rotation taking the direction `from` onto the direction `to`.
///
/// Opposite directions rotate half a turn around an axis perpendicular to
/// `from`, so the result is always a proper rotation.
pub fn rotate_align(from: &Vec3, to: &Vec3) -> Mat3 {
    let a = from.normalize();
    let b = to.normalize();
    match Rotation3::rotation_between(&a, &b) {
        Some(rotation) => rotation.into_inner(),
        None => {
            let helper = if a.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
            let axis = Unit::new_normalize(a.cross(&helper));
            Rotation3::from_axis_angle(&axis, PI).into_inner()
        }
    }
}

pub fn homogeneous(p: &Vec2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

pub fn dehomogenize(v: &Vec3) -> Option<Vec2> {
    if v.z.abs() < HOMOGENEOUS_EPSILON || !v.z.is_finite() {
        return None;
    }
    Some(Vec2::new(v.x / v.z, v.y / v.z))
}

/// Projective map sending the homogeneous basis `e1, e2, e3, (1,1,1)` onto
/// the four given points.
pub fn basis_to_points(points: &[Vec2; 4]) -> Mat3 {
    let m = Mat3::from_columns(&[
        homogeneous(&points[0]),
        homogeneous(&points[1]),
        homogeneous(&points[2]),
    ]);
    let weights = adjugate(&m) * homogeneous(&points[3]);
    m * Mat3::from_diagonal(&weights)
}

/// Homography mapping each `src[i]` onto `dst[i]`.
///
/// Uses the adjugate in place of the inverse since the result is only
/// defined up to scale.
pub fn quad_to_quad(src: &[Vec2; 4], dst: &[Vec2; 4]) -> Mat3 {
    basis_to_points(dst) * adjugate(&basis_to_points(src))
}

pub fn apply_projective(m: &Mat3, p: &Vec2) -> Option<Vec2> {
    dehomogenize(&(m * homogeneous(p)))
}
