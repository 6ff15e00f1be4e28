pub mod error;
pub mod geom;
pub mod intersect;
pub mod linalg;
pub mod solver;

pub use error::SolveError;
pub use geom::{Line, Line2D, Line3D, Plane3D, Ray, Ray2D, Ray3D, Rect2};
pub use linalg::{Mat3, Vec2, Vec3};
