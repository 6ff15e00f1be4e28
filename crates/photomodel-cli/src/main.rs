use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use photomodel_algo::export::ExportConfig;
use photomodel_algo::project::load_project;
use photomodel_core::{Mat3, Vec2, Vec3};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "photomodel")]
#[command(about = "Photo-based modeling: camera calibration and textured OBJ export.")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the recovered camera of every photograph.
    Calibrate {
        project: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print normal, orientation and triangulation of every face.
    Inspect {
        project: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write `<target-dir>/<name>/<name>.obj` with materials and textures.
    Export {
        project: PathBuf,
        target: PathBuf,
        #[arg(long, default_value_t = ExportConfig::default().resolution)]
        resolution: f64,
        #[arg(long, default_value_t = ExportConfig::default().samples)]
        samples: usize,
        #[arg(long, default_value_t = ExportConfig::default().max_texture_size)]
        max_texture_size: u32,
    },
}

#[derive(Debug, Serialize)]
struct CameraReport {
    photo: usize,
    image: PathBuf,
    focal: f64,
    vanishing_points: [Vec2; 2],
    intrinsic: Mat3,
    rotation: Mat3,
    center: Vec3,
}

#[derive(Debug, Serialize)]
struct FaceReport {
    face: usize,
    vertices: Vec<usize>,
    normal: Vec3,
    reversed: bool,
    user_reversed: Option<bool>,
    triangles: usize,
    faces_front: Vec<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Calibrate { project, report } => calibrate(&project, report.as_deref()),
        Command::Inspect { project, report } => inspect(&project, report.as_deref()),
        Command::Export {
            project,
            target,
            resolution,
            samples,
            max_texture_size,
        } => {
            let config = ExportConfig {
                resolution,
                samples,
                max_texture_size,
            };
            export(&project, &target, &config)
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn calibrate(path: &Path, report: Option<&Path>) -> Result<()> {
    let project = load_project(path)?;
    let reports: Vec<CameraReport> = project
        .photos
        .iter()
        .zip(&project.document.photos)
        .enumerate()
        .map(|(i, (photo, record))| CameraReport {
            photo: i,
            image: record.image.clone(),
            focal: photo.camera.focal(),
            vanishing_points: photo.camera.vanishing_points(),
            intrinsic: *photo.camera.intrinsic(),
            rotation: *photo.camera.rotation(),
            center: photo.camera.camera_center(),
        })
        .collect();
    emit(&reports, report)
}

fn inspect(path: &Path, report: Option<&Path>) -> Result<()> {
    let project = load_project(path)?;
    let model = &project.model;
    let index_of: std::collections::HashMap<_, _> = model
        .vertices()
        .enumerate()
        .map(|(i, (id, _))| (id, i))
        .collect();

    let reports: Vec<FaceReport> = model
        .faces()
        .map(|(id, face)| FaceReport {
            face: id.0,
            vertices: face
                .vertices()
                .iter()
                .filter_map(|v| index_of.get(v).copied())
                .collect(),
            normal: face.normal(),
            reversed: face.reversed(),
            user_reversed: face.user_reversed(),
            triangles: face.triangles().len(),
            faces_front: face.faces_front().iter().map(|f| f.0).collect(),
        })
        .collect();
    emit(&reports, report)
}

fn export(path: &Path, target: &Path, config: &ExportConfig) -> Result<()> {
    let summary = photomodel_algo::export_project(path, target, config)?;
    let textured = summary.face_photos.iter().filter(|(_, p)| p.is_some()).count();
    info!(
        obj = %summary.obj.display(),
        faces = summary.face_photos.len(),
        textured,
        "done"
    );
    println!("{}", summary.obj.display());
    Ok(())
}

fn emit<T: Serialize>(value: &T, report: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize report")?;
    if let Some(path) = report {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(path, &json).with_context(|| format!("write report: {path:?}"))?;
    } else {
        println!("{json}");
    }
    Ok(())
}
