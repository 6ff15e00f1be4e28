use anyhow::{Context, Result};
use std::path::Path;

pub mod camera;
pub mod error;
pub mod export;
pub mod face;
pub mod model;
pub mod project;
pub mod texture;
pub mod triangulation;

pub use camera::{AxisInversion, AxisOrder, Calibration, Camera};
pub use error::{CameraError, ExportError, FaceError, ModelError};
pub use export::{export_model, ExportConfig, ExportSummary, Photo};
pub use model::{EdgeId, FaceId, Model, ModelEvent, VertexId};
pub use project::{load_project, Project, ProjectDocument};

/// Loads a project document and writes its textured OBJ bundle next to
/// `target`.
pub fn export_project(project: &Path, target: &Path, config: &ExportConfig) -> Result<ExportSummary> {
    // 1. Decode document, model and photographs
    let project = load_project(project)?;

    // 2. Pick photographs, rectify textures and write the bundle
    let summary = export_model(&project.model, &project.photos, target, config)
        .with_context(|| format!("failed to export {}", target.display()))?;

    Ok(summary)
}
