use approx::assert_relative_eq;
use image::{Rgba, RgbaImage};
use photomodel_algo::camera::{Calibration, Camera};
use photomodel_algo::export::{export_model, sample_weights, select_photo, ExportConfig, Photo};
use photomodel_algo::model::{FaceId, Model, VertexId};
use photomodel_algo::texture::{rectify_face, sample_bilinear};
use photomodel_core::{Line2D, Vec2, Vec3};

const PAINT: Rgba<u8> = Rgba([200, 100, 50, 255]);

fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Line2D {
    Line2D::new(Vec2::new(ax, ay), Vec2::new(bx, by))
}

/// Camera looking at the world's y = 0 plane at 45°, focal scale 500.
fn camera() -> Camera {
    Camera::new(Calibration::centered(
        640,
        480,
        [line(320.0, 340.0, 570.0, 290.0), line(320.0, 140.0, 570.0, 190.0)],
        [line(320.0, 340.0, 70.0, 290.0), line(320.0, 140.0, 70.0, 190.0)],
    ))
    .unwrap()
}

fn photo() -> Photo {
    Photo::new(camera(), RgbaImage::from_pixel(640, 480, PAINT))
}

fn wall(model: &mut Model) -> FaceId {
    let ids: Vec<VertexId> = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.3, 0.0, 0.0),
        Vec3::new(0.3, 0.0, 0.3),
        Vec3::new(0.0, 0.0, 0.3),
    ]
    .into_iter()
    .map(|p| model.add_vertex(p))
    .collect();
    model.add_face(&ids).unwrap()
}

#[test]
fn sample_weights_stay_inside_the_triangle() {
    let weights = sample_weights(10);
    assert_eq!(weights.len(), 10);
    for w in weights {
        assert!(w.iter().all(|&x| x > 0.0));
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn bilinear_sampling_blends_neighbours() {
    let mut image = RgbaImage::new(2, 1);
    image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
    image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));

    assert_eq!(sample_bilinear(&image, &Vec2::new(0.5, 0.5)), Some(Rgba([0, 0, 0, 255])));
    assert_eq!(sample_bilinear(&image, &Vec2::new(1.5, 0.5)), Some(Rgba([255, 255, 255, 255])));
    assert_eq!(sample_bilinear(&image, &Vec2::new(1.0, 0.5)), Some(Rgba([128, 128, 128, 255])));
    assert_eq!(sample_bilinear(&image, &Vec2::new(-0.1, 0.5)), None);
    assert_eq!(sample_bilinear(&image, &Vec2::new(1.0, 1.5)), None);
}

#[test]
fn rectified_texture_maps_face_bounds_to_unit_square() {
    let mut model = Model::new();
    let face = wall(&mut model);
    let positions = model.face_positions(face).unwrap();
    let normal = model.face(face).unwrap().normal();
    let photo = photo();

    let texture = rectify_face(&positions, &normal, &photo.camera, &photo.image, 1.5, 4096).unwrap();
    assert_eq!(texture.uvs.len(), 4);
    for uv in &texture.uvs {
        assert!((uv.x.abs() < 1e-9 || (uv.x - 1.0).abs() < 1e-9), "{uv:?}");
        assert!((uv.y.abs() < 1e-9 || (uv.y - 1.0).abs() < 1e-9), "{uv:?}");
    }
    let (w, h) = texture.image.dimensions();
    assert!(w > 100 && h > 100, "{w}x{h}");
    assert_eq!(*texture.image.get_pixel(w / 2, h / 2), PAINT);
}

#[test]
fn texture_size_is_capped() {
    let mut model = Model::new();
    let face = wall(&mut model);
    let positions = model.face_positions(face).unwrap();
    let normal = model.face(face).unwrap().normal();
    let photo = photo();

    let texture = rectify_face(&positions, &normal, &photo.camera, &photo.image, 50.0, 64).unwrap();
    assert_eq!(texture.image.dimensions(), (64, 64));
}

#[test]
fn visible_face_picks_first_of_equal_photos() {
    let mut model = Model::new();
    let face = wall(&mut model);
    assert_eq!(select_photo(&model, face, &[photo(), photo()], 10), Some(0));
    assert_eq!(select_photo(&model, face, &[], 10), None);
}

#[test]
fn occluded_face_has_no_photo() {
    let mut model = Model::new();
    let face = wall(&mut model);
    let blocker: Vec<VertexId> = [
        Vec3::new(-1.0, -0.3, -1.0),
        Vec3::new(1.0, -0.3, -1.0),
        Vec3::new(1.0, -0.3, 1.0),
        Vec3::new(-1.0, -0.3, 1.0),
    ]
    .into_iter()
    .map(|p| model.add_vertex(p))
    .collect();
    model.add_face(&blocker).unwrap();

    assert_eq!(select_photo(&model, face, &[photo()], 10), None);
}

#[test]
fn export_writes_obj_mtl_and_one_texture() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = Model::new();
    let face = wall(&mut model);

    let target = dir.path().join("house.obj");
    let summary = export_model(&model, &[photo()], &target, &ExportConfig::default()).unwrap();

    let bundle = dir.path().join("house");
    assert_eq!(summary.directory, bundle);
    assert_eq!(summary.obj, bundle.join("house.obj"));
    assert_eq!(summary.textures, vec![bundle.join("face0.png")]);
    assert_eq!(summary.face_photos, vec![(face, Some(0))]);

    let obj = std::fs::read_to_string(&summary.obj).unwrap();
    assert!(obj.starts_with("# photomodel export"));
    assert!(obj.contains("mtllib house.mtl"));
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 4);
    assert_eq!(obj.lines().filter(|l| l.starts_with("vt ")).count(), 4);
    assert!(obj.contains("usemtl face0"));
    assert!(obj.contains("v 0.300000 0.300000 "));
    let faces: Vec<&str> = obj.lines().filter(|l| l.starts_with("f ")).collect();
    assert_eq!(faces.len(), 2);
    assert!(faces.iter().all(|f| f.split_whitespace().skip(1).all(|c| c.contains('/'))));

    let mtl = std::fs::read_to_string(&summary.mtl).unwrap();
    assert!(mtl.contains("newmtl face0"));
    assert!(mtl.contains("map_Kd face0.png"));

    let png = image::open(bundle.join("face0.png")).unwrap().to_rgba8();
    let (w, h) = png.dimensions();
    assert_eq!(*png.get_pixel(w / 2, h / 2), PAINT);
}

#[test]
fn faces_without_photo_export_untextured() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = Model::new();
    let face = wall(&mut model);

    let target = dir.path().join("bare.obj");
    let summary = export_model(&model, &[], &target, &ExportConfig::default()).unwrap();

    assert!(summary.textures.is_empty());
    assert_eq!(summary.face_photos, vec![(face, None)]);
    let obj = std::fs::read_to_string(&summary.obj).unwrap();
    assert!(!obj.contains("usemtl"));
    assert!(!obj.contains("vt "));
    let faces: Vec<&str> = obj.lines().filter(|l| l.starts_with("f ")).collect();
    assert_eq!(faces.len(), 2);
    assert!(faces.iter().all(|f| !f.contains('/')));
    assert!(!summary.directory.join("face0.png").exists());
}

#[test]
fn reversed_faces_flip_triangle_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = Model::new();
    let face = wall(&mut model);

    let plain = export_model(&model, &[], &dir.path().join("a.obj"), &ExportConfig::default())
        .unwrap();
    model.set_face_reversed(face, Some(true)).unwrap();
    let flipped = export_model(&model, &[], &dir.path().join("b.obj"), &ExportConfig::default())
        .unwrap();

    let corners = |path: &std::path::Path| -> Vec<Vec<String>> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("f "))
            .map(|l| l.split_whitespace().skip(1).map(str::to_owned).collect())
            .collect()
    };
    let plain = corners(plain.obj.as_path());
    let flipped = corners(flipped.obj.as_path());
    assert_eq!(plain.len(), flipped.len());
    for (a, b) in plain.iter().zip(&flipped) {
        let mut reversed = a.clone();
        reversed.reverse();
        assert_eq!(&reversed, b);
    }
}

#[test]
fn unwritable_target_reports_io_category() {
    let dir = tempfile::tempdir().unwrap();
    // A file where the bundle directory should go.
    std::fs::write(dir.path().join("blocked"), b"").unwrap();
    let mut model = Model::new();
    wall(&mut model);

    let err = export_model(
        &model,
        &[],
        &dir.path().join("blocked.obj"),
        &ExportConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err.category(), "io" | "path" | "permission"));
}
