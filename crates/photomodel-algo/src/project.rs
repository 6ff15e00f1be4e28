//! JSON project document: the model plus calibrated photographs.

use crate::camera::{Calibration, Camera};
use crate::export::Photo;
use crate::model::{FaceId, Model, VertexId};
use anyhow::{bail, Context, Result};
use photomodel_core::linalg::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub vertices: Vec<[f64; 3]>,
    /// Vertex index pairs.
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
    #[serde(default)]
    pub faces: Vec<FaceRecord>,
    #[serde(default)]
    pub photos: Vec<PhotoRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub vertices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Image path; relative paths resolve against the document's directory.
    pub image: PathBuf,
    pub calibration: Calibration,
}

impl ProjectDocument {
    /// Snapshots `model` with vertex indices compacted in id order.
    pub fn from_model(model: &Model, photos: Vec<PhotoRecord>) -> Self {
        let index_of: HashMap<VertexId, usize> = model
            .vertices()
            .enumerate()
            .map(|(i, (id, _))| (id, i))
            .collect();
        let vertices = model
            .vertices()
            .map(|(_, v)| {
                let p = v.position();
                [p.x, p.y, p.z]
            })
            .collect();
        let edges = model
            .edges()
            .filter_map(|(_, e)| Some([*index_of.get(&e.start())?, *index_of.get(&e.end())?]))
            .collect();
        let faces = model
            .faces()
            .filter_map(|(_, f)| {
                let vertices = f
                    .vertices()
                    .iter()
                    .map(|v| index_of.get(v).copied())
                    .collect::<Option<Vec<_>>>()?;
                Some(FaceRecord {
                    vertices,
                    reversed: f.user_reversed(),
                })
            })
            .collect();
        Self {
            vertices,
            edges,
            faces,
            photos,
        }
    }

    /// Rebuilds the model. Edges come before faces so face boundaries reuse
    /// them; every face must be accepted.
    pub fn build_model(&self) -> Result<Model> {
        let mut model = Model::new();
        let ids: Vec<VertexId> = self
            .vertices
            .iter()
            .map(|&[x, y, z]| model.add_vertex(Vec3::new(x, y, z)))
            .collect();
        let lookup = |index: usize| -> Result<VertexId> {
            match ids.get(index) {
                Some(&id) => Ok(id),
                None => bail!("vertex index {index} out of range ({} vertices)", ids.len()),
            }
        };

        for (i, &[a, b]) in self.edges.iter().enumerate() {
            model
                .add_edge(lookup(a)?, lookup(b)?)
                .with_context(|| format!("edge {i}"))?;
        }

        let mut faces: Vec<(FaceId, Option<bool>)> = Vec::with_capacity(self.faces.len());
        for (i, record) in self.faces.iter().enumerate() {
            let vertices = record
                .vertices
                .iter()
                .map(|&v| lookup(v))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("face {i}"))?;
            let id = model
                .try_add_face(&vertices)
                .with_context(|| format!("face {i}"))?;
            faces.push((id, record.reversed));
        }
        for (id, reversed) in faces {
            if reversed.is_some() {
                model.set_face_reversed(id, reversed)?;
            }
        }
        model.take_events();
        Ok(model)
    }
}

/// A loaded project: document, rebuilt model and decoded photographs.
#[derive(Debug, Clone)]
pub struct Project {
    pub document: ProjectDocument,
    pub model: Model,
    pub photos: Vec<Photo>,
}

pub fn load_document(path: &Path) -> Result<ProjectDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read project {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse project {}", path.display()))
}

pub fn save_document(document: &ProjectDocument, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(document)?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write project {}", path.display()))?;
    Ok(())
}

pub fn resolve_image_path(document_path: &Path, image: &Path) -> PathBuf {
    if image.is_absolute() {
        image.to_path_buf()
    } else {
        document_path
            .parent()
            .unwrap_or(Path::new(""))
            .join(image)
    }
}

pub fn load_project(path: &Path) -> Result<Project> {
    let document = load_document(path)?;
    let model = document
        .build_model()
        .with_context(|| format!("invalid model in {}", path.display()))?;

    let mut photos = Vec::with_capacity(document.photos.len());
    for (i, record) in document.photos.iter().enumerate() {
        let camera = Camera::new(record.calibration.clone())
            .with_context(|| format!("photo {i}: calibration failed"))?;
        let image_path = resolve_image_path(path, &record.image);
        let image = image::open(&image_path)
            .with_context(|| format!("photo {i}: failed to decode {}", image_path.display()))?
            .to_rgba8();
        photos.push(Photo::new(camera, image));
    }

    info!(
        vertices = model.vertex_count(),
        edges = model.edge_count(),
        faces = model.face_count(),
        photos = photos.len(),
        "loaded project"
    );
    Ok(Project {
        document,
        model,
        photos,
    })
}
