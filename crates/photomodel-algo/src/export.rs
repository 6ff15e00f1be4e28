//! Textured Wavefront OBJ export.
//!
//! `export_model(.., "out/house.obj", ..)` writes the bundle directory
//! `out/house/` holding `house.obj`, `house.mtl` and one `face{i}.png` per
//! textured face.

use crate::camera::Camera;
use crate::error::ExportError;
use crate::model::{FaceId, Model, VertexId};
use crate::texture::{rectify_face, FaceTexture};
use image::{ImageFormat, RgbaImage};
use photomodel_core::intersect::ray_polygon_intersection;
use photomodel_core::linalg::Vec3;
use photomodel_core::{Ray3D, Rect2};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Occluders closer than this to either end of a sight line are ignored.
const OCCLUSION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    /// Texture pixels per projected screen pixel.
    pub resolution: f64,
    /// Sample points per face used to pick a photograph.
    pub samples: usize,
    pub max_texture_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            resolution: 1.5,
            samples: 10,
            max_texture_size: 4096,
        }
    }
}

/// A calibrated photograph.
#[derive(Debug, Clone)]
pub struct Photo {
    pub camera: Camera,
    pub image: RgbaImage,
}

impl Photo {
    pub fn new(camera: Camera, image: RgbaImage) -> Self {
        Self { camera, image }
    }

    fn frame(&self) -> Rect2 {
        Rect2::from_size(f64::from(self.image.width()), f64::from(self.image.height()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub directory: PathBuf,
    pub obj: PathBuf,
    pub mtl: PathBuf,
    pub textures: Vec<PathBuf>,
    /// Photograph chosen for each face, in export order.
    pub face_photos: Vec<(FaceId, Option<usize>)>,
}

/// Deterministic barycentric weights spread over a triangle; every weight
/// is strictly positive.
pub fn sample_weights(count: usize) -> Vec<[f64; 3]> {
    let golden = (5f64.sqrt() - 1.0) * 0.5;
    (0..count)
        .map(|i| {
            let r1 = (i as f64 + 0.5) / count as f64;
            let r2 = ((i as f64 + 0.5) * golden).fract();
            let s = r1.sqrt();
            [1.0 - s, s * (1.0 - r2), s * r2]
        })
        .collect()
}

/// Picks the photograph that sees most of `face`'s sample points.
///
/// A sample counts for a photograph when it is in front of the camera,
/// projects inside the image and no other face crosses the sight line
/// between camera and sample. Ties keep the earlier photograph. Returns
/// `None` when no photograph sees any sample.
pub fn select_photo(model: &Model, face: FaceId, photos: &[Photo], samples: usize) -> Option<usize> {
    let positions = model.face_positions(face)?;
    let t = model.face(face)?.triangles().first().copied()?;
    let points: Vec<Vec3> = sample_weights(samples)
        .iter()
        .map(|w| positions[t[0]] * w[0] + positions[t[1]] * w[1] + positions[t[2]] * w[2])
        .collect();

    let occluders: Vec<(Vec<Vec3>, Vec3)> = model
        .faces()
        .filter(|(id, _)| *id != face)
        .filter_map(|(id, f)| Some((model.face_positions(id)?, f.normal())))
        .collect();

    let mut best: Option<(usize, usize)> = None;
    for (index, photo) in photos.iter().enumerate() {
        let visible = points
            .iter()
            .filter(|p| is_visible(photo, p, &occluders))
            .count();
        debug!(face = face.0, photo = index, visible, "face visibility");
        if visible > 0 && best.map_or(true, |(_, count)| visible > count) {
            best = Some((index, visible));
        }
    }
    best.map(|(index, _)| index)
}

fn is_visible(photo: &Photo, point: &Vec3, occluders: &[(Vec<Vec3>, Vec3)]) -> bool {
    let Some(screen) = photo.camera.world_to_screen(point) else {
        return false;
    };
    if !photo.frame().contains(&screen) {
        return false;
    }
    let center = photo.camera.camera_center();
    let Some(sight) = Ray3D::through(center, *point) else {
        return false;
    };
    let distance = (point - center).norm();
    !occluders.iter().any(|(polygon, normal)| {
        ray_polygon_intersection(&sight, polygon, normal).is_some_and(|hit| {
            hit.distance > OCCLUSION_EPSILON && hit.distance < distance - OCCLUSION_EPSILON
        })
    })
}

pub fn export_model(
    model: &Model,
    photos: &[Photo],
    target: &Path,
    config: &ExportConfig,
) -> Result<ExportSummary, ExportError> {
    let result = write_bundle(model, photos, target, config);
    if let Err(err) = &result {
        error!(category = err.category(), error = %err, "export failed");
    }
    result
}

fn write_bundle(
    model: &Model,
    photos: &[Photo],
    target: &Path,
    config: &ExportConfig,
) -> Result<ExportSummary, ExportError> {
    let name = target
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("model");
    let directory = target.parent().unwrap_or(Path::new("")).join(name);
    fs::create_dir_all(&directory).map_err(|e| ExportError::from_io(&directory, e))?;
    info!(
        directory = %directory.display(),
        faces = model.face_count(),
        photos = photos.len(),
        "exporting model"
    );

    let mut summary = ExportSummary {
        obj: directory.join(format!("{name}.obj")),
        mtl: directory.join(format!("{name}.mtl")),
        directory,
        ..ExportSummary::default()
    };

    let mut header = String::new();
    let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
    writeln!(header, "# photomodel export {timestamp}")?;
    writeln!(header, "mtllib {name}.mtl")?;

    let mut index_of: HashMap<VertexId, usize> = HashMap::new();
    for (i, (id, vertex)) in model.vertices().enumerate() {
        index_of.insert(id, i + 1);
        let p = vertex.position();
        writeln!(header, "v {:.6} {:.6} {:.6}", p.x, p.z, -p.y)?;
    }

    // Untextured faces go before the first `usemtl` so they carry no material.
    let mut plain = String::new();
    let mut textured = String::new();
    let mut mtl = String::new();
    writeln!(mtl, "# photomodel materials {timestamp}")?;
    let mut next_uv = 1;

    for (i, (face_id, face)) in model.faces().enumerate() {
        let Some(positions) = model.face_positions(face_id) else {
            continue;
        };
        let Some(indices) = face
            .vertices()
            .iter()
            .map(|v| index_of.get(v).copied())
            .collect::<Option<Vec<usize>>>()
        else {
            continue;
        };
        let corners = |t: [usize; 3]| if face.reversed() { [t[2], t[1], t[0]] } else { t };

        let photo = select_photo(model, face_id, photos, config.samples);
        summary.face_photos.push((face_id, photo));
        let texture = photo.and_then(|p| {
            let texture = rectify_face(
                &positions,
                &face.normal(),
                &photos[p].camera,
                &photos[p].image,
                config.resolution,
                config.max_texture_size,
            );
            if texture.is_none() {
                warn!(face = face_id.0, photo = p, "face could not be rectified; exporting untextured");
            }
            texture
        });

        let Some(FaceTexture { image, uvs }) = texture else {
            for &t in face.triangles() {
                let [a, b, c] = corners(t);
                writeln!(plain, "f {} {} {}", indices[a], indices[b], indices[c])?;
            }
            continue;
        };

        let material = format!("face{i}");
        let png = summary.directory.join(format!("{material}.png"));
        image
            .save_with_format(&png, ImageFormat::Png)
            .map_err(|source| image_error(&png, source))?;
        debug!(path = %png.display(), width = image.width(), height = image.height(), "wrote texture");
        summary.textures.push(png);

        writeln!(mtl, "newmtl {material}")?;
        writeln!(mtl, "Ka 1.000000 1.000000 1.000000")?;
        writeln!(mtl, "Kd 1.000000 1.000000 1.000000")?;
        writeln!(mtl, "d 1.0")?;
        writeln!(mtl, "illum 1")?;
        writeln!(mtl, "map_Kd {material}.png")?;
        writeln!(mtl)?;

        for uv in &uvs {
            writeln!(textured, "vt {:.6} {:.6}", uv.x, uv.y)?;
        }
        writeln!(textured, "usemtl {material}")?;
        for &t in face.triangles() {
            let [a, b, c] = corners(t);
            writeln!(
                textured,
                "f {}/{} {}/{} {}/{}",
                indices[a],
                next_uv + a,
                indices[b],
                next_uv + b,
                indices[c],
                next_uv + c
            )?;
        }
        next_uv += uvs.len();
    }

    let obj = header + &plain + &textured;
    fs::write(&summary.obj, obj).map_err(|e| ExportError::from_io(&summary.obj, e))?;
    fs::write(&summary.mtl, mtl).map_err(|e| ExportError::from_io(&summary.mtl, e))?;

    info!(
        obj = %summary.obj.display(),
        textures = summary.textures.len(),
        "export finished"
    );
    Ok(summary)
}

fn image_error(path: &Path, source: image::ImageError) -> ExportError {
    match source {
        image::ImageError::IoError(io) => ExportError::from_io(path, io),
        source => ExportError::Image {
            path: path.to_path_buf(),
            source,
        },
    }
}
