//! Perspective rectification of a face's image region into its own raster.

use crate::camera::Camera;
use crate::face::flatten;
use image::{Rgba, RgbaImage};
use photomodel_core::linalg::{apply_projective, quad_to_quad, rotate_align, Vec2, Vec3};
use photomodel_core::Rect2;

#[derive(Debug, Clone)]
pub struct FaceTexture {
    pub image: RgbaImage,
    /// One UV per face vertex, in face vertex order.
    pub uvs: Vec<Vec2>,
}

/// Samples `image` at pixel-space position `screen` (pixel `(i, j)` covers
/// `[i, i + 1) × [j, j + 1)`). Positions outside the image give `None`.
pub fn sample_bilinear(image: &RgbaImage, screen: &Vec2) -> Option<Rgba<u8>> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let (wf, hf) = (f64::from(w), f64::from(h));
    if !(screen.x >= 0.0 && screen.y >= 0.0 && screen.x <= wf && screen.y <= hf) {
        return None;
    }

    let x = (screen.x - 0.5).clamp(0.0, wf - 1.0);
    let y = (screen.y - 0.5).clamp(0.0, hf - 1.0);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for (c, channel) in out.iter_mut().enumerate() {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        *channel = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgba(out))
}

/// Rectifies the face seen by `camera` in `source`.
///
/// The face is rotated flat, its bounding rectangle is projected to the
/// photograph, and the raster size is the longer of each pair of opposite
/// projected edges times `resolution`, capped at `max_size`. Returns `None`
/// when the face is degenerate or a corner falls behind the camera.
pub fn rectify_face(
    positions: &[Vec3],
    normal: &Vec3,
    camera: &Camera,
    source: &RgbaImage,
    resolution: f64,
    max_size: u32,
) -> Option<FaceTexture> {
    if positions.is_empty() {
        return None;
    }
    let rotation = rotate_align(normal, &Vec3::z());
    let flat = flatten(&rotation, positions);
    let plane_z =
        positions.iter().map(|p| (rotation * p).z).sum::<f64>() / positions.len() as f64;
    let bounds = Rect2::from_points(&flat);
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return None;
    }

    let back = rotation.transpose();
    let corners = bounds.corners();
    let mut screen = [Vec2::zeros(); 4];
    for (s, c) in screen.iter_mut().zip(corners.iter()) {
        *s = camera.world_to_screen(&(back * Vec3::new(c.x, c.y, plane_z)))?;
    }

    let width = (screen[1] - screen[0]).norm().max((screen[2] - screen[3]).norm()) * resolution;
    let height = (screen[3] - screen[0]).norm().max((screen[2] - screen[1]).norm()) * resolution;
    let w = width.ceil().clamp(1.0, f64::from(max_size)) as u32;
    let h = height.ceil().clamp(1.0, f64::from(max_size)) as u32;
    let (wf, hf) = (f64::from(w), f64::from(h));

    // Raster row 0 is the top of the texture, i.e. the face's max-y edge.
    let raster = [
        Vec2::new(0.0, hf),
        Vec2::new(wf, hf),
        Vec2::new(wf, 0.0),
        Vec2::new(0.0, 0.0),
    ];
    let to_screen = quad_to_quad(&raster, &screen);

    let mut image = RgbaImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let center = Vec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
        let Some(at) = apply_projective(&to_screen, &center) else {
            continue;
        };
        if let Some(color) = sample_bilinear(source, &at) {
            *pixel = color;
        }
    }

    let unit = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    let to_uv = quad_to_quad(&corners, &unit);
    let uvs = flat
        .iter()
        .map(|p| apply_projective(&to_uv, p))
        .collect::<Option<Vec<_>>>()?;

    Some(FaceTexture { image, uvs })
}
