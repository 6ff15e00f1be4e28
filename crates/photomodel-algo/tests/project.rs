use image::{Rgba, RgbaImage};
use photomodel_algo::camera::Calibration;
use photomodel_algo::export::ExportConfig;
use photomodel_algo::model::Model;
use photomodel_algo::project::{
    load_project, resolve_image_path, save_document, FaceRecord, PhotoRecord, ProjectDocument,
};
use photomodel_algo::export_project;
use photomodel_core::{Line2D, Vec2, Vec3};
use std::path::{Path, PathBuf};

fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Line2D {
    Line2D::new(Vec2::new(ax, ay), Vec2::new(bx, by))
}

fn calibration() -> Calibration {
    Calibration::centered(
        640,
        480,
        [line(320.0, 340.0, 570.0, 290.0), line(320.0, 140.0, 570.0, 190.0)],
        [line(320.0, 340.0, 70.0, 290.0), line(320.0, 140.0, 70.0, 190.0)],
    )
}

fn wall_document(image: &str) -> ProjectDocument {
    ProjectDocument {
        vertices: vec![
            [0.0, 0.0, 0.0],
            [0.3, 0.0, 0.0],
            [0.3, 0.0, 0.3],
            [0.0, 0.0, 0.3],
            [0.6, 0.0, 0.0],
        ],
        edges: vec![[1, 4]],
        faces: vec![FaceRecord {
            vertices: vec![0, 1, 2, 3],
            reversed: Some(true),
        }],
        photos: vec![PhotoRecord {
            image: PathBuf::from(image),
            calibration: calibration(),
        }],
    }
}

#[test]
fn document_builds_model_with_overrides() {
    let model = wall_document("photo.png").build_model().unwrap();
    assert_eq!(model.vertex_count(), 5);
    assert_eq!(model.edge_count(), 5);
    assert_eq!(model.face_count(), 1);
    let (_, face) = model.faces().next().unwrap();
    assert_eq!(face.user_reversed(), Some(true));
    assert!(face.reversed());
}

#[test]
fn model_snapshot_round_trips_through_json() {
    let document = wall_document("photo.png");
    let model = document.build_model().unwrap();
    let snapshot = ProjectDocument::from_model(&model, document.photos.clone());

    let text = serde_json::to_string(&snapshot).unwrap();
    let back: ProjectDocument = serde_json::from_str(&text).unwrap();
    assert_eq!(back, snapshot);

    let rebuilt = back.build_model().unwrap();
    assert_eq!(rebuilt.vertex_count(), model.vertex_count());
    assert_eq!(rebuilt.edge_count(), model.edge_count());
    assert_eq!(rebuilt.face_count(), model.face_count());
}

#[test]
fn snapshot_compacts_removed_vertices() {
    let mut model = Model::new();
    let a = model.add_vertex(Vec3::new(0.0, 0.0, 0.0));
    let b = model.add_vertex(Vec3::new(1.0, 0.0, 0.0));
    let c = model.add_vertex(Vec3::new(2.0, 1.0, 0.0));
    model.add_edge(a, c).unwrap();
    model.remove_vertex(b);

    let document = ProjectDocument::from_model(&model, Vec::new());
    assert_eq!(document.vertices.len(), 2);
    assert_eq!(document.edges, vec![[0, 1]]);
}

#[test]
fn out_of_range_indices_are_rejected() {
    let mut document = wall_document("photo.png");
    document.edges.push([0, 9]);
    let err = document.build_model().unwrap_err();
    assert!(format!("{err:#}").contains("vertex index 9"));
}

#[test]
fn relative_images_resolve_next_to_the_document() {
    let doc = Path::new("/data/projects/house.json");
    assert_eq!(
        resolve_image_path(doc, Path::new("photos/a.png")),
        PathBuf::from("/data/projects/photos/a.png")
    );
    assert_eq!(
        resolve_image_path(doc, Path::new("/elsewhere/b.png")),
        PathBuf::from("/elsewhere/b.png")
    );
}

#[test]
fn project_loads_photos_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    RgbaImage::from_pixel(640, 480, Rgba([10, 200, 30, 255]))
        .save(dir.path().join("photo.png"))
        .unwrap();
    let path = dir.path().join("house.json");
    save_document(&wall_document("photo.png"), &path).unwrap();

    let project = load_project(&path).unwrap();
    assert_eq!(project.photos.len(), 1);
    assert_eq!(project.photos[0].image.dimensions(), (640, 480));

    let summary = export_project(&path, &dir.path().join("house.obj"), &ExportConfig::default())
        .unwrap();
    assert_eq!(summary.textures.len(), 1);
    assert!(summary.obj.exists());
}

#[test]
fn missing_photo_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("house.json");
    save_document(&wall_document("missing.png"), &path).unwrap();

    let err = load_project(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing.png"));
}
