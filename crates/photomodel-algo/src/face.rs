use crate::error::FaceError;
use crate::model::{FaceId, VertexId};
use crate::triangulation::triangulate;
use itertools::Itertools;
use photomodel_core::intersect::is_clockwise;
use photomodel_core::linalg::{rotate_align, Mat3, Vec2, Vec3};
use std::collections::BTreeSet;

/// Relative size of a cross product below which three points are collinear.
const COLLINEAR_EPSILON: f64 = 1e-9;

/// Derived geometry of a planar polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGeometry {
    /// Unit normal; the polygon is counter-clockwise around it.
    pub normal: Vec3,
    /// Triangles as indices into the face's vertex list.
    pub triangles: Vec<[usize; 3]>,
}

impl FaceGeometry {
    pub fn compute(positions: &[Vec3]) -> Result<Self, FaceError> {
        if positions.len() < 3 {
            return Err(FaceError::TooFewVertices {
                count: positions.len(),
            });
        }
        let mut normal = initial_normal(positions).ok_or(FaceError::Degenerate)?;
        let mut flat = flatten(&rotate_align(&normal, &Vec3::z()), positions);
        if is_clockwise(&flat) {
            normal = -normal;
            flat = flatten(&rotate_align(&normal, &Vec3::z()), positions);
        }
        let triangles = triangulate(&flat)?;
        Ok(Self { normal, triangles })
    }
}

/// Normal of the first non-collinear corner `v0, vi, vi+1`, starting with
/// `v0, v1, v2`.
fn initial_normal(positions: &[Vec3]) -> Option<Vec3> {
    let origin = positions[0];
    positions[1..].iter().tuple_windows().find_map(|(a, b)| {
        let u = a - origin;
        let v = b - origin;
        let cross = u.cross(&v);
        let scale = u.norm() * v.norm();
        (scale > 0.0 && cross.norm() > COLLINEAR_EPSILON * scale).then(|| cross.normalize())
    })
}

pub fn flatten(rotation: &Mat3, positions: &[Vec3]) -> Vec<Vec2> {
    positions.iter().map(|p| (rotation * p).xy()).collect()
}

/// Point strictly inside the face: the centroid of its first triangle.
pub fn face_point(positions: &[Vec3], triangles: &[[usize; 3]]) -> Option<Vec3> {
    let t = triangles.first()?;
    Some((positions[t[0]] + positions[t[1]] + positions[t[2]]) / 3.0)
}

#[derive(Debug, Clone)]
pub struct Face {
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) normal: Vec3,
    pub(crate) triangles: Vec<[usize; 3]>,
    pub(crate) faces_front: BTreeSet<FaceId>,
    pub(crate) user_reversed: Option<bool>,
}

impl Face {
    pub(crate) fn new(vertices: Vec<VertexId>, geometry: FaceGeometry) -> Self {
        Self {
            vertices,
            normal: geometry.normal,
            triangles: geometry.triangles,
            faces_front: BTreeSet::new(),
            user_reversed: None,
        }
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Faces hit by a ray leaving this face along its normal.
    pub fn faces_front(&self) -> &BTreeSet<FaceId> {
        &self.faces_front
    }

    pub fn user_reversed(&self) -> Option<bool> {
        self.user_reversed
    }

    /// User override, else an odd number of faces in front means the
    /// normal points into the solid.
    pub fn reversed(&self) -> bool {
        self.user_reversed
            .unwrap_or(self.faces_front.len() % 2 == 1)
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    /// Whether `a`-`b` is one of the boundary edges, in either direction.
    pub fn uses_edge(&self, a: VertexId, b: VertexId) -> bool {
        self.vertices
            .iter()
            .circular_tuple_windows()
            .any(|(&x, &y)| (x == a && y == b) || (x == b && y == a))
    }
}
