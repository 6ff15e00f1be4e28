use crate::model::{EdgeId, FaceId, VertexId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("calibration lines of pair {pair} are parallel; no vanishing point")]
    ParallelLines { pair: char },
    #[error("focal scale is undefined for the given vanishing points")]
    FocalUndefined,
    #[error("calibration matrices are not invertible")]
    Singular,
    #[error("scale and view ratio must be positive and finite")]
    InvalidScale,
    #[error("screen/world points cannot be matched: {reason}")]
    Unmatchable { reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaceError {
    #[error("a face needs at least 3 vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("face vertices are collinear; no normal can be computed")]
    Degenerate,
    #[error("face cannot be triangulated: {reason}")]
    Triangulation { reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("vertex {0:?} does not exist")]
    UnknownVertex(VertexId),
    #[error("edge {0:?} does not exist")]
    UnknownEdge(EdgeId),
    #[error("face {0:?} does not exist")]
    UnknownFace(FaceId),
    #[error("an edge cannot start and end at vertex {0:?}")]
    SelfLoop(VertexId),
    #[error("face rejected: {0}")]
    Face(#[from] FaceError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("permission denied writing {path:?}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path not found: {path:?}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error writing {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode texture {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to format export text")]
    Format(#[from] std::fmt::Error),
}

impl ExportError {
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            std::io::ErrorKind::NotFound => Self::NotFound { path, source },
            _ => Self::Io { path, source },
        }
    }

    /// Short category tag used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permission",
            Self::NotFound { .. } => "path",
            Self::Io { .. } => "io",
            Self::Image { .. } => "image",
            Self::Format(_) => "format",
        }
    }
}
