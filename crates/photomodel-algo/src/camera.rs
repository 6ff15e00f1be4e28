//! Projective camera recovered from two vanishing points.
//!
//! World → screen is `K · normalize_z(R · world · scale + T)` where `K` is
//! the intrinsic matrix, `R` the rotation built from the back-projected
//! vanishing directions and `T = K⁻¹ · (origin, 1)`.

use crate::error::CameraError;
use photomodel_core::intersect::{line_line_intersection, project_to_ray, ray_ray_closest};
use photomodel_core::linalg::{dehomogenize, homogeneous, Mat3, Vec2, Vec3};
use photomodel_core::{Line2D, Ray2D, Ray3D};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Camera-space depths at or below this are behind the image plane.
const DEPTH_EPSILON: f64 = 1e-9;

/// World axes the two calibration line pairs run along: the first letter
/// belongs to pair A, the second to pair B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisOrder {
    #[default]
    XY,
    XZ,
    YX,
    YZ,
    ZX,
    ZY,
}

impl AxisOrder {
    /// Rotation columns receiving the A and B directions.
    fn columns(self) -> (usize, usize) {
        match self {
            AxisOrder::XY => (0, 1),
            AxisOrder::XZ => (0, 2),
            AxisOrder::YX => (1, 0),
            AxisOrder::YZ => (1, 2),
            AxisOrder::ZX => (2, 0),
            AxisOrder::ZY => (2, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisInversion {
    #[serde(default)]
    pub x: bool,
    #[serde(default)]
    pub y: bool,
    #[serde(default)]
    pub z: bool,
}

impl AxisInversion {
    fn flags(self) -> [bool; 3] {
        [self.x, self.y, self.z]
    }
}

/// User-editable inputs of one photograph's calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub principal_point: Vec2,
    #[serde(default = "default_unit")]
    pub view_ratio: f64,
    /// Screen position of the world origin.
    pub origin: Vec2,
    /// Two lines parallel in the world along the first axis of `axes`.
    pub lines_a: [Line2D; 2],
    /// Two lines parallel in the world along the second axis of `axes`.
    pub lines_b: [Line2D; 2],
    #[serde(default)]
    pub axes: AxisOrder,
    #[serde(default)]
    pub invert: AxisInversion,
    #[serde(default = "default_unit")]
    pub scale: f64,
}

fn default_unit() -> f64 {
    1.0
}

impl Calibration {
    /// Calibration for an image of the given size with the principal point
    /// and origin at its centre.
    pub fn centered(width: u32, height: u32, lines_a: [Line2D; 2], lines_b: [Line2D; 2]) -> Self {
        let center = Vec2::new(f64::from(width) * 0.5, f64::from(height) * 0.5);
        Self {
            principal_point: center,
            view_ratio: 1.0,
            origin: center,
            lines_a,
            lines_b,
            axes: AxisOrder::default(),
            invert: AxisInversion::default(),
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    calibration: Calibration,
    vanishing_points: [Vec2; 2],
    focal: f64,
    intrinsic: Mat3,
    intrinsic_inv: Mat3,
    rotation: Mat3,
    rotation_inv: Mat3,
    translate: Vec3,
}

impl Camera {
    pub fn new(calibration: Calibration) -> Result<Self, CameraError> {
        let scale = calibration.scale;
        let ratio = calibration.view_ratio;
        if !(scale.is_finite() && scale > 0.0 && ratio.is_finite() && ratio > 0.0) {
            return Err(CameraError::InvalidScale);
        }

        let vp_a = line_line_intersection(&calibration.lines_a[0], &calibration.lines_a[1])
            .ok_or(CameraError::ParallelLines { pair: 'A' })?
            .point;
        let vp_b = line_line_intersection(&calibration.lines_b[0], &calibration.lines_b[1])
            .ok_or(CameraError::ParallelLines { pair: 'B' })?
            .point;

        let p = calibration.principal_point;
        let da = vp_a - p;
        let db = vp_b - p;
        // Orthogonality of the two back-projected vanishing directions.
        let focal_sq = -(da.x * db.x + da.y * db.y / (ratio * ratio));
        if !focal_sq.is_finite() || focal_sq == 0.0 {
            return Err(CameraError::FocalUndefined);
        }
        if focal_sq < 0.0 {
            warn!(
                focal_sq,
                "vanishing points are not orthogonal around the principal point; using |f^2|"
            );
        }
        let focal = focal_sq.abs().sqrt();

        let intrinsic = Mat3::new(focal, 0.0, p.x, 0.0, focal * ratio, p.y, 0.0, 0.0, 1.0);
        let intrinsic_inv = Mat3::new(
            1.0 / focal,
            0.0,
            -p.x / focal,
            0.0,
            1.0 / (focal * ratio),
            -p.y / (focal * ratio),
            0.0,
            0.0,
            1.0,
        );

        let axis_a = (intrinsic_inv * homogeneous(&vp_a)).normalize();
        let raw_b = (intrinsic_inv * homogeneous(&vp_b)).normalize();
        let axis_b = (raw_b - axis_a * raw_b.dot(&axis_a))
            .try_normalize(DEPTH_EPSILON)
            .ok_or(CameraError::Singular)?;

        let (col_a, col_b) = calibration.axes.columns();
        let col_c = 3 - col_a - col_b;
        let mut columns = [Vec3::zeros(); 3];
        columns[col_a] = axis_a;
        columns[col_b] = axis_b;
        columns[col_c] = columns[(col_c + 1) % 3].cross(&columns[(col_c + 2) % 3]);
        for (column, flip) in columns.iter_mut().zip(calibration.invert.flags()) {
            if flip {
                *column = -*column;
            }
        }
        let rotation = Mat3::from_columns(&columns);
        let translate = intrinsic_inv * homogeneous(&calibration.origin);

        Ok(Self {
            vanishing_points: [vp_a, vp_b],
            focal,
            intrinsic,
            intrinsic_inv,
            rotation,
            rotation_inv: rotation.transpose(),
            translate,
            calibration,
        })
    }

    /// Replaces the calibration; on error the camera keeps its previous state.
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<(), CameraError> {
        *self = Camera::new(calibration)?;
        Ok(())
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn vanishing_points(&self) -> [Vec2; 2] {
        self.vanishing_points
    }

    pub fn focal(&self) -> f64 {
        self.focal
    }

    pub fn intrinsic(&self) -> &Mat3 {
        &self.intrinsic
    }

    pub fn intrinsic_inverse(&self) -> &Mat3 {
        &self.intrinsic_inv
    }

    pub fn rotation(&self) -> &Mat3 {
        &self.rotation
    }

    pub fn rotation_inverse(&self) -> &Mat3 {
        &self.rotation_inv
    }

    pub fn translation(&self) -> &Vec3 {
        &self.translate
    }

    fn to_camera_space(&self, world: &Vec3) -> Vec3 {
        self.rotation * world * self.calibration.scale + self.translate
    }

    /// Camera-space depth of a world point; positive in front of the camera.
    pub fn world_depth(&self, world: &Vec3) -> f64 {
        self.to_camera_space(world).z
    }

    pub fn world_to_screen(&self, world: &Vec3) -> Option<Vec2> {
        let cam = self.to_camera_space(world);
        if cam.z <= DEPTH_EPSILON {
            return None;
        }
        dehomogenize(&(self.intrinsic * cam))
    }

    pub fn screen_to_world_at_depth(&self, screen: &Vec2, depth: f64) -> Vec3 {
        let cam = self.intrinsic_inv * homogeneous(screen) * depth;
        self.rotation_inv * (cam - self.translate) / self.calibration.scale
    }

    /// World point on the viewing ray of `screen` at camera depth 1.
    pub fn screen_to_world(&self, screen: &Vec2) -> Vec3 {
        self.screen_to_world_at_depth(screen, 1.0)
    }

    pub fn camera_center(&self) -> Vec3 {
        self.screen_to_world_at_depth(&Vec2::zeros(), 0.0)
    }

    /// Viewing ray through `screen`, starting at the camera centre.
    pub fn screen_to_world_ray(&self, screen: &Vec2) -> Option<Ray3D> {
        Ray3D::through(self.camera_center(), self.screen_to_world(screen))
    }

    /// Moves the origin so that `world` projects exactly onto `screen`.
    pub fn match_screen_world_point(
        &mut self,
        screen: &Vec2,
        world: &Vec3,
    ) -> Result<(), CameraError> {
        let u = self.rotation * world * self.calibration.scale;
        let q = self.intrinsic_inv * homogeneous(screen);
        // T always has z = 1, so the point's depth does not depend on the origin.
        let depth = u.z + 1.0;
        if depth <= DEPTH_EPSILON {
            return Err(CameraError::Unmatchable {
                reason: "world point would lie behind the camera",
            });
        }
        let translate = q * depth - u;

        let mut calibration = self.calibration.clone();
        calibration.origin = (self.intrinsic * translate).xy();
        self.set_calibration(calibration)
    }

    /// Solves origin and scale so `world_a` lands exactly on `screen_a` and
    /// the projection of `world_b` lands as close as possible to `screen_b`.
    ///
    /// With `u = R·world` and `q = K⁻¹·(screen, 1)`, pinning `world_a` leaves
    /// the camera-space position of `world_b` on the line `q_a + s·d` for
    /// scale `s`. Its image is a screen line through `screen_a`; the foot of
    /// `screen_b` on that line fixes `s` via a ray/ray solve.
    pub fn match_screen_world_points(
        &mut self,
        screen_a: &Vec2,
        world_a: &Vec3,
        screen_b: &Vec2,
        world_b: &Vec3,
    ) -> Result<(), CameraError> {
        let aligned = CameraError::Unmatchable {
            reason: "second point is aligned with the first viewing ray",
        };
        let u_a = self.rotation * world_a;
        let u_b = self.rotation * world_b;
        let q_a = self.intrinsic_inv * homogeneous(screen_a);
        let d = u_b - u_a + q_a * u_a.z;

        let screen_dir = (self.intrinsic * (d - q_a * d.z)).xy();
        let track_2d = Ray2D::new(*screen_a, screen_dir).ok_or(aligned.clone())?;
        let foot = project_to_ray(screen_b, &track_2d).point;

        let view = Ray3D::new(Vec3::zeros(), self.intrinsic_inv * homogeneous(&foot))
            .ok_or(aligned.clone())?;
        let track = Ray3D::new(q_a, d).ok_or(aligned.clone())?;
        let closest = ray_ray_closest(&view, &track).ok_or(aligned)?;

        let scale = closest.t_b / d.norm();
        if !scale.is_finite() || scale <= DEPTH_EPSILON {
            return Err(CameraError::Unmatchable {
                reason: "solution requires a non-positive scale",
            });
        }
        let depth = scale * u_a.z + 1.0;
        if depth <= DEPTH_EPSILON {
            return Err(CameraError::Unmatchable {
                reason: "world point would lie behind the camera",
            });
        }
        let translate = q_a * depth - u_a * scale;

        let mut calibration = self.calibration.clone();
        calibration.origin = (self.intrinsic * translate).xy();
        calibration.scale = scale;
        self.set_calibration(calibration)
    }
}
