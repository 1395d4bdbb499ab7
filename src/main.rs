// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use son_editor::export::{export_polygons_to_csv, export_ports_to_csv};
use son_editor::{
    EditorConfig, Geometry, Project, ProjectEditor, Result, SonError, SonReader, StructuralEditor,
};

/// Inspect and edit Sonnet SON project files
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Editor settings (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize blocks and geometry
    Info { file: PathBuf },
    /// Decode, re-encode and verify the round trip
    Check { file: PathBuf },
    /// Clip all polygons to a window given in y-up coordinates
    Crop {
        file: PathBuf,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        /// Output project
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Write polygons (and optionally ports) as CSV
    Export {
        file: PathBuf,
        #[arg(long)]
        polygons: PathBuf,
        #[arg(long)]
        ports: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("son-editor: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let reader = SonReader::new();

    match args.command {
        Command::Info { file } => {
            let project = reader.read(&file)?;
            info(&project)
        }
        Command::Check { file } => {
            let text = fs::read_to_string(&file)?;
            check(&text)?;
            println!("{}: round trip OK", file.display());
            Ok(())
        }
        Command::Crop {
            file,
            x1,
            y1,
            x2,
            y2,
            out,
        } => {
            let mut editor = StructuralEditor::open(&file, config)?;
            let report = editor.crop(x1, y1, x2, y2)?;
            editor.save(Some(out.as_path()))?;
            println!(
                "Cropped {}: {} polygons dropped, {} split -> {}",
                file.display(),
                report.dropped.len(),
                report.split.len(),
                out.display()
            );
            Ok(())
        }
        Command::Export {
            file,
            polygons,
            ports,
        } => {
            let geometry = reader.read(&file)?.geometry()?;
            export_polygons_to_csv(&geometry, &polygons)?;
            if let Some(ports) = ports {
                export_ports_to_csv(&geometry, &ports)?;
            }
            Ok(())
        }
    }
}

fn info(project: &Project) -> Result<()> {
    println!("Blocks:");
    for name in project.blocks.keys() {
        println!("  {name}");
    }
    let geometry = project.geometry()?;
    let (bx, by) = geometry.box_size();
    let (cx, cy) = geometry.cell_size();
    println!("Box: {bx} x {by}");
    println!("Cell: {cx} x {cy}");
    println!("Dielectric layers: {}", geometry.substrate.layers.len());
    println!("Polygons: {}", geometry.polygons.len());
    println!("Via polygons: {}", geometry.vias.len());
    println!("Ports: {}", geometry.ports.len());
    println!("Reference planes: {}", geometry.planes.len());
    Ok(())
}

fn check(text: &str) -> Result<()> {
    let project = Project::parse(text)?;
    let encoded = project.encode();
    if Project::parse(&encoded)? != project {
        return Err(SonError::Format("project changed after re-encoding".to_string()));
    }
    let geometry = project.geometry()?;
    if Geometry::parse(&geometry.encode())? != geometry {
        return Err(SonError::Format(
            "GEO block changed after re-encoding".to_string(),
        ));
    }
    if encoded != text {
        log::warn!("[WARN] Re-encoded text differs from the input bytes");
    }
    Ok(())
}
