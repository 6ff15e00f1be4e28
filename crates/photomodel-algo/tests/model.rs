use approx::assert_relative_eq;
use photomodel_algo::error::{FaceError, ModelError};
use photomodel_algo::model::{FaceId, Model, ModelEvent, VertexId};
use photomodel_core::Vec3;

fn v(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

fn unit_square(model: &mut Model) -> [VertexId; 4] {
    [
        model.add_vertex(v(0.0, 0.0, 0.0)),
        model.add_vertex(v(1.0, 0.0, 0.0)),
        model.add_vertex(v(1.0, 1.0, 0.0)),
        model.add_vertex(v(0.0, 1.0, 0.0)),
    ]
}

/// Unit cube with every face wound so its computed normal points inward
/// for the faces listed in `inward`.
fn cube(inward: &[usize]) -> (Model, Vec<(FaceId, Vec3)>) {
    let mut model = Model::new();
    let c: Vec<VertexId> = [
        (0.0, 0.0, 0.0),
        (1.0, 0.0, 0.0),
        (1.0, 1.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, 0.0, 1.0),
        (1.0, 0.0, 1.0),
        (1.0, 1.0, 1.0),
        (0.0, 1.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| model.add_vertex(v(x, y, z)))
    .collect();

    // Counter-clockwise seen from outside.
    let outward: [([usize; 4], Vec3); 6] = [
        ([0, 3, 2, 1], v(0.0, 0.0, -1.0)),
        ([4, 5, 6, 7], v(0.0, 0.0, 1.0)),
        ([0, 1, 5, 4], v(0.0, -1.0, 0.0)),
        ([2, 3, 7, 6], v(0.0, 1.0, 0.0)),
        ([0, 4, 7, 3], v(-1.0, 0.0, 0.0)),
        ([1, 2, 6, 5], v(1.0, 0.0, 0.0)),
    ];

    let faces = outward
        .iter()
        .enumerate()
        .map(|(i, (corners, out))| {
            let mut ids: Vec<VertexId> = corners.iter().map(|&k| c[k]).collect();
            if inward.contains(&i) {
                ids.reverse();
            }
            (model.add_face(&ids).unwrap(), *out)
        })
        .collect();
    (model, faces)
}

#[test]
fn first_vertex_is_protected() {
    let mut model = Model::new();
    let first = model.add_vertex(v(0.0, 0.0, 0.0));
    let second = model.add_vertex(v(1.0, 0.0, 0.0));

    assert!(model.is_protected(first));
    assert!(!model.remove_vertex(first));
    assert!(model.vertex(first).is_some());
    assert!(model.remove_vertex(second));
    assert_eq!(model.vertex_count(), 1);
}

#[test]
fn mutations_emit_events_closed_by_changed() {
    let mut model = Model::new();
    let a = model.add_vertex(v(0.0, 0.0, 0.0));
    let b = model.add_vertex(v(1.0, 0.0, 0.0));
    let e = model.add_edge(a, b).unwrap();

    assert_eq!(
        model.take_events(),
        vec![
            ModelEvent::VertexAdded(a),
            ModelEvent::Changed,
            ModelEvent::VertexAdded(b),
            ModelEvent::Changed,
            ModelEvent::EdgeAdded(e),
            ModelEvent::Changed,
        ]
    );
    assert!(model.take_events().is_empty());
}

#[test]
fn duplicate_edges_are_reused() {
    let mut model = Model::new();
    let a = model.add_vertex(v(0.0, 0.0, 0.0));
    let b = model.add_vertex(v(1.0, 0.0, 0.0));
    let e = model.add_edge(a, b).unwrap();
    assert_eq!(model.add_edge(b, a).unwrap(), e);
    assert_eq!(model.edge_count(), 1);
    assert_eq!(model.add_edge(a, a), Err(ModelError::SelfLoop(a)));
}

#[test]
fn face_creates_missing_boundary_edges() {
    let mut model = Model::new();
    let [a, b, c, d] = unit_square(&mut model);
    model.add_edge(a, b).unwrap();
    let face = model.add_face(&[a, b, c, d]).unwrap();

    assert_eq!(model.edge_count(), 4);
    let face = model.face(face).unwrap();
    assert_eq!(face.triangles().len(), 2);
    assert_relative_eq!(face.normal(), v(0.0, 0.0, 1.0), epsilon = 1e-12);
}

#[test]
fn clockwise_face_gets_opposite_normal() {
    let mut model = Model::new();
    let [a, b, c, d] = unit_square(&mut model);
    let face = model.add_face(&[d, c, b, a]).unwrap();
    assert_relative_eq!(model.face(face).unwrap().normal(), v(0.0, 0.0, -1.0), epsilon = 1e-12);
}

#[test]
fn degenerate_faces_are_rejected() {
    let mut model = Model::new();
    let a = model.add_vertex(v(0.0, 0.0, 0.0));
    let b = model.add_vertex(v(1.0, 0.0, 0.0));
    let c = model.add_vertex(v(2.0, 0.0, 0.0));

    assert_eq!(
        model.try_add_face(&[a, b]),
        Err(ModelError::Face(FaceError::TooFewVertices { count: 2 }))
    );
    assert_eq!(
        model.try_add_face(&[a, b, c]),
        Err(ModelError::Face(FaceError::Degenerate))
    );
    assert!(model.add_face(&[a, b, c]).is_none());
    assert_eq!(model.face_count(), 0);
    assert_eq!(model.edge_count(), 0);
}

#[test]
fn removing_an_edge_removes_faces_bounded_by_it() {
    let mut model = Model::new();
    let [a, b, c, d] = unit_square(&mut model);
    let face = model.add_face(&[a, b, c, d]).unwrap();
    let edge = model.edge_between(b, c).unwrap();

    assert!(model.remove_edge_keep_vertices(edge));
    assert!(model.face(face).is_none());
    assert_eq!(model.vertex_count(), 4);
    assert_eq!(model.edge_count(), 3);
}

#[test]
fn removing_a_vertex_cascades_to_edges_and_faces() {
    let mut model = Model::new();
    let [a, b, c, d] = unit_square(&mut model);
    let apex = model.add_vertex(v(0.5, 0.5, 1.0));
    model.add_face(&[a, b, c, d]).unwrap();
    let side = model.add_face(&[a, b, apex]).unwrap();
    model.take_events();

    assert!(model.remove_vertex(apex));
    assert!(model.face(side).is_none());
    assert_eq!(model.face_count(), 1);
    assert_eq!(model.edge_count(), 4);
    let events = model.take_events();
    assert!(events.contains(&ModelEvent::VertexRemoved(apex)));
    assert!(events.contains(&ModelEvent::FaceRemoved(side)));
    assert_eq!(events.last(), Some(&ModelEvent::Changed));
}

#[test]
fn removing_a_branch_merges_collinear_edges() {
    let mut model = Model::new();
    let a = model.add_vertex(v(0.0, 0.0, 0.0));
    let b = model.add_vertex(v(1.0, 0.0, 0.0));
    let c = model.add_vertex(v(2.0, 0.0, 0.0));
    let d = model.add_vertex(v(1.0, 1.0, 0.0));
    model.add_edge(a, b).unwrap();
    model.add_edge(b, c).unwrap();
    let branch = model.add_edge(b, d).unwrap();

    assert!(model.remove_edge(branch));

    assert!(model.vertex(b).is_none());
    assert!(model.vertex(d).is_none());
    assert_eq!(model.vertex_count(), 2);
    assert_eq!(model.edge_count(), 1);
    assert!(model.edge_between(a, c).is_some());
}

#[test]
fn bent_corner_is_not_merged() {
    let mut model = Model::new();
    let a = model.add_vertex(v(0.0, 0.0, 0.0));
    let b = model.add_vertex(v(1.0, 0.0, 0.0));
    let c = model.add_vertex(v(1.0, 1.0, 0.0));
    let d = model.add_vertex(v(2.0, 0.0, 0.0));
    model.add_edge(a, b).unwrap();
    model.add_edge(b, c).unwrap();
    let branch = model.add_edge(b, d).unwrap();

    assert!(model.remove_edge(branch));
    assert!(model.vertex(b).is_some());
    assert!(model.vertex(d).is_none());
    assert_eq!(model.edge_count(), 2);
}

#[test]
fn moving_a_vertex_rebuilds_its_faces() {
    let mut model = Model::new();
    let a = model.add_vertex(v(0.0, 0.0, 0.0));
    let b = model.add_vertex(v(1.0, 0.0, 0.0));
    let c = model.add_vertex(v(0.0, 1.0, 0.0));
    let face = model.add_face(&[a, b, c]).unwrap();
    model.take_events();

    model.move_vertex(c, v(0.0, 0.0, 1.0)).unwrap();
    assert_relative_eq!(model.face(face).unwrap().normal(), v(0.0, -1.0, 0.0), epsilon = 1e-12);
    let events = model.take_events();
    assert!(events.contains(&ModelEvent::VertexMoved(c)));
    assert!(events.contains(&ModelEvent::FaceChanged(face)));
}

#[test]
fn closed_cube_reverses_inward_faces() {
    let (model, faces) = cube(&[1, 4]);
    for (id, outward) in faces {
        let face = model.face(id).unwrap();
        let inward = face.normal().dot(&outward) < 0.0;
        assert_eq!(face.reversed(), inward, "face {id:?}");
        assert_eq!(face.faces_front().len(), usize::from(inward));
    }
}

#[test]
fn user_override_wins_over_computed_orientation() {
    let (mut model, faces) = cube(&[]);
    let (id, _) = faces[0];
    assert!(!model.face(id).unwrap().reversed());

    model.set_face_reversed(id, Some(true)).unwrap();
    assert!(model.face(id).unwrap().reversed());
    model.set_face_reversed(id, None).unwrap();
    assert!(!model.face(id).unwrap().reversed());
}

#[test]
fn removing_a_face_updates_orientation_of_the_others() {
    let (mut model, faces) = cube(&[1]);
    let (top, _) = faces[1];
    let (bottom, _) = faces[0];
    assert!(model.face(top).unwrap().reversed());
    assert!(model.face(top).unwrap().faces_front().contains(&bottom));

    assert!(model.remove_face(bottom));
    assert!(!model.face(top).unwrap().reversed());
}
