//! Vertex/edge/face mesh stored in arenas with stable indices.
//!
//! All mutation goes through `Model`, which keeps the cross references
//! consistent, cascades removals, and queues `ModelEvent`s for a host view.

use crate::error::ModelError;
use crate::face::{face_point, Face, FaceGeometry};
use itertools::Itertools;
use photomodel_core::intersect::ray_polygon_intersection;
use photomodel_core::linalg::Vec3;
use photomodel_core::Ray3D;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Two edge directions closer than this (cross product of unit vectors)
/// are merged when their shared vertex is left with only them.
const COLLINEAR_EPSILON: f64 = 1e-6;
/// Hits closer than this to a face point do not count as "in front".
const FRONT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    VertexAdded(VertexId),
    VertexMoved(VertexId),
    VertexRemoved(VertexId),
    EdgeAdded(EdgeId),
    EdgeRemoved(EdgeId),
    FaceAdded(FaceId),
    FaceChanged(FaceId),
    FaceRemoved(FaceId),
    /// Closes every public mutation.
    Changed,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    position: Vec3,
    edges: Vec<EdgeId>,
}

impl Vertex {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    start: VertexId,
    end: VertexId,
}

impl Edge {
    pub fn start(&self) -> VertexId {
        self.start
    }

    pub fn end(&self) -> VertexId {
        self.end
    }

    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if v == self.start {
            Some(self.end)
        } else if v == self.end {
            Some(self.start)
        } else {
            None
        }
    }

    pub fn connects(&self, a: VertexId, b: VertexId) -> bool {
        (self.start == a && self.end == b) || (self.start == b && self.end == a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    vertices: Vec<Option<Vertex>>,
    edges: Vec<Option<Edge>>,
    faces: Vec<Option<Face>>,
    events: Vec<ModelEvent>,
    orientation_dirty: bool,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)?.as_ref()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)?.as_ref()
    }

    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.0)?.as_ref()
    }

    fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id.0)?.as_mut()
    }

    fn face_mut(&mut self, id: FaceId) -> Option<&mut Face> {
        self.faces.get_mut(id.0)?.as_mut()
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (VertexId(i), v)))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i), e)))
    }

    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FaceId(i), f)))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    pub fn face_count(&self) -> usize {
        self.faces().count()
    }

    /// The first vertex ever added can never be removed.
    pub fn is_protected(&self, id: VertexId) -> bool {
        id.0 == 0
    }

    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn face_positions(&self, id: FaceId) -> Option<Vec<Vec3>> {
        self.face(id)?
            .vertices
            .iter()
            .map(|v| self.vertex(*v).map(Vertex::position))
            .collect()
    }

    pub fn face_point(&self, id: FaceId) -> Option<Vec3> {
        let positions = self.face_positions(id)?;
        face_point(&positions, &self.face(id)?.triangles)
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.vertex(a)?
            .edges
            .iter()
            .copied()
            .find(|e| self.edge(*e).is_some_and(|edge| edge.connects(a, b)))
    }

    pub fn add_vertex(&mut self, position: Vec3) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(Some(Vertex {
            position,
            edges: Vec::new(),
        }));
        self.events.push(ModelEvent::VertexAdded(id));
        self.finish();
        id
    }

    /// Moves a vertex and rebuilds every face that uses it.
    pub fn move_vertex(&mut self, id: VertexId, position: Vec3) -> Result<(), ModelError> {
        let vertex = self.vertex_mut(id).ok_or(ModelError::UnknownVertex(id))?;
        vertex.position = position;
        self.events.push(ModelEvent::VertexMoved(id));

        let affected: Vec<FaceId> = self
            .faces()
            .filter(|(_, f)| f.contains_vertex(id))
            .map(|(fid, _)| fid)
            .collect();
        for face in affected {
            self.rebuild_face(face);
        }
        self.finish();
        Ok(())
    }

    /// Connects two vertices; an existing connection is returned as is.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Result<EdgeId, ModelError> {
        let id = self.insert_edge(a, b)?;
        self.finish();
        Ok(id)
    }

    /// Adds a face over `vertices`, creating missing boundary edges.
    /// Returns `None` when the polygon is rejected.
    pub fn add_face(&mut self, vertices: &[VertexId]) -> Option<FaceId> {
        match self.try_add_face(vertices) {
            Ok(id) => Some(id),
            Err(err) => {
                debug!(%err, vertices = vertices.len(), "face not added");
                None
            }
        }
    }

    pub fn try_add_face(&mut self, vertices: &[VertexId]) -> Result<FaceId, ModelError> {
        let positions = vertices
            .iter()
            .map(|v| {
                self.vertex(*v)
                    .map(Vertex::position)
                    .ok_or(ModelError::UnknownVertex(*v))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some((a, _)) = vertices
            .iter()
            .circular_tuple_windows()
            .find(|(a, b)| a == b)
        {
            return Err(ModelError::SelfLoop(*a));
        }
        let geometry = FaceGeometry::compute(&positions)?;

        for (a, b) in vertices.iter().circular_tuple_windows() {
            self.insert_edge(*a, *b)?;
        }

        let id = FaceId(self.faces.len());
        self.faces.push(Some(Face::new(vertices.to_vec(), geometry)));
        self.events.push(ModelEvent::FaceAdded(id));
        self.orientation_dirty = true;
        self.finish();
        Ok(id)
    }

    /// Removes a vertex with its edges and faces. The first vertex is
    /// protected and this returns `false` for it.
    pub fn remove_vertex(&mut self, id: VertexId) -> bool {
        if self.is_protected(id) || self.vertex(id).is_none() {
            return false;
        }
        self.delete_vertex(id);
        self.finish();
        true
    }

    /// Removes an edge and the faces bounded by it, then cleans up its
    /// endpoints.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        self.remove_edge_with(id, true)
    }

    /// Like `remove_edge` but leaves the endpoints untouched.
    pub fn remove_edge_keep_vertices(&mut self, id: EdgeId) -> bool {
        self.remove_edge_with(id, false)
    }

    fn remove_edge_with(&mut self, id: EdgeId, cleanup: bool) -> bool {
        if self.edge(id).is_none() {
            return false;
        }
        self.delete_edge(id, cleanup);
        self.finish();
        true
    }

    pub fn remove_face(&mut self, id: FaceId) -> bool {
        if self.face(id).is_none() {
            return false;
        }
        self.delete_face(id);
        self.finish();
        true
    }

    /// Forces (`Some`) or clears (`None`) the user orientation override.
    pub fn set_face_reversed(
        &mut self,
        id: FaceId,
        reversed: Option<bool>,
    ) -> Result<(), ModelError> {
        let face = self.face_mut(id).ok_or(ModelError::UnknownFace(id))?;
        face.user_reversed = reversed;
        self.events.push(ModelEvent::FaceChanged(id));
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        if self.orientation_dirty {
            self.refresh_orientation();
        }
        self.events.push(ModelEvent::Changed);
    }

    fn insert_edge(&mut self, a: VertexId, b: VertexId) -> Result<EdgeId, ModelError> {
        for v in [a, b] {
            if self.vertex(v).is_none() {
                return Err(ModelError::UnknownVertex(v));
            }
        }
        if a == b {
            return Err(ModelError::SelfLoop(a));
        }
        if let Some(existing) = self.edge_between(a, b) {
            return Ok(existing);
        }

        let id = EdgeId(self.edges.len());
        self.edges.push(Some(Edge { start: a, end: b }));
        for v in [a, b] {
            if let Some(vertex) = self.vertex_mut(v) {
                vertex.edges.push(id);
            }
        }
        self.events.push(ModelEvent::EdgeAdded(id));
        Ok(id)
    }

    fn delete_vertex(&mut self, id: VertexId) {
        let faces: Vec<FaceId> = self
            .faces()
            .filter(|(_, f)| f.contains_vertex(id))
            .map(|(fid, _)| fid)
            .collect();
        for face in faces {
            self.delete_face(face);
        }

        let Some(vertex) = self.vertices.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for edge in vertex.edges {
            self.delete_edge(edge, true);
        }
        self.events.push(ModelEvent::VertexRemoved(id));
    }

    fn delete_edge(&mut self, id: EdgeId, cleanup: bool) {
        let Some(edge) = self.edges.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for v in [edge.start, edge.end] {
            if let Some(vertex) = self.vertex_mut(v) {
                vertex.edges.retain(|e| *e != id);
            }
        }

        let faces: Vec<FaceId> = self
            .faces()
            .filter(|(_, f)| f.uses_edge(edge.start, edge.end))
            .map(|(fid, _)| fid)
            .collect();
        for face in faces {
            self.delete_face(face);
        }
        self.events.push(ModelEvent::EdgeRemoved(id));

        if cleanup {
            for v in [edge.start, edge.end] {
                self.cleanup_vertex(v);
            }
        }
    }

    fn delete_face(&mut self, id: FaceId) {
        if self.faces.get_mut(id.0).and_then(Option::take).is_some() {
            self.events.push(ModelEvent::FaceRemoved(id));
            self.orientation_dirty = true;
        }
    }

    /// Drops a vertex left without edges, or folds it away when its two
    /// remaining edges are collinear.
    fn cleanup_vertex(&mut self, id: VertexId) {
        if self.is_protected(id) {
            return;
        }
        let Some(vertex) = self.vertex(id) else {
            return;
        };
        match vertex.edges.len() {
            0 => self.delete_vertex(id),
            2 => self.merge_collinear(id),
            _ => {}
        }
    }

    fn merge_collinear(&mut self, id: VertexId) {
        if self.faces().any(|(_, f)| f.contains_vertex(id)) {
            return;
        }
        let Some(vertex) = self.vertex(id) else {
            return;
        };
        let (e1, e2) = (vertex.edges[0], vertex.edges[1]);
        let center = vertex.position;
        let (Some(o1), Some(o2)) = (
            self.edge(e1).and_then(|e| e.other(id)),
            self.edge(e2).and_then(|e| e.other(id)),
        ) else {
            return;
        };
        let (Some(p1), Some(p2)) = (self.vertex(o1), self.vertex(o2)) else {
            return;
        };
        let (Some(d1), Some(d2)) = (
            (p1.position - center).try_normalize(0.0),
            (p2.position - center).try_normalize(0.0),
        ) else {
            return;
        };
        if d1.cross(&d2).norm() > COLLINEAR_EPSILON {
            return;
        }

        debug!(vertex = id.0, "merging collinear edges");
        self.delete_edge(e1, false);
        self.delete_edge(e2, false);
        self.delete_vertex(id);
        if o1 != o2 {
            if let Err(err) = self.insert_edge(o1, o2) {
                warn!(%err, vertex = id.0, "could not merge collinear edges");
            }
        }
    }

    fn rebuild_face(&mut self, id: FaceId) {
        let Some(positions) = self.face_positions(id) else {
            return;
        };
        match FaceGeometry::compute(&positions) {
            Ok(geometry) => {
                if let Some(face) = self.face_mut(id) {
                    face.normal = geometry.normal;
                    face.triangles = geometry.triangles;
                }
                self.events.push(ModelEvent::FaceChanged(id));
                self.orientation_dirty = true;
            }
            Err(err) => {
                warn!(face = id.0, %err, "keeping previous face geometry");
            }
        }
    }

    /// Recomputes every face's `faces_front` set from scratch. Each face
    /// casts one ray against every other face, so the cost is quadratic in
    /// the face count.
    pub fn refresh_orientation(&mut self) {
        let snapshot: Vec<(FaceId, Vec<Vec3>, Vec3, Option<Vec3>)> = self
            .faces()
            .filter_map(|(id, face)| {
                let positions = self.face_positions(id)?;
                let point = face_point(&positions, &face.triangles);
                Some((id, positions, face.normal, point))
            })
            .collect();

        for (id, _, normal, point) in &snapshot {
            let front: BTreeSet<FaceId> = match point.and_then(|p| Ray3D::new(p, *normal)) {
                Some(ray) => snapshot
                    .iter()
                    .filter(|(other, ..)| other != id)
                    .filter(|(_, polygon, other_normal, _)| {
                        ray_polygon_intersection(&ray, polygon, other_normal)
                            .is_some_and(|hit| hit.distance > FRONT_EPSILON)
                    })
                    .map(|(other, ..)| *other)
                    .collect(),
                None => BTreeSet::new(),
            };

            let Some(face) = self.face_mut(*id) else {
                continue;
            };
            let was_reversed = face.reversed();
            face.faces_front = front;
            if face.reversed() != was_reversed {
                self.events.push(ModelEvent::FaceChanged(*id));
            }
        }
        self.orientation_dirty = false;
    }
}
