// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Project editing
//!
//! Every backend implements [`ProjectEditor`]. The structural editor works
//! on the decoded model in process; the remote editor forwards commands to
//! an automation engine and round-trips through the saved file for the
//! edits the engine cannot express. A [`Session`] picks one backend when it
//! is built and callers never branch on which one it is.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::config::{EditorConfig, PortSettings};
use crate::error::Result;
use crate::geo::{Polygon, PolygonId, ReferencePlane, Vertex, Wall};
use crate::son::Project;

pub mod coords;
pub mod crop;
pub mod feedline;
pub mod ids;
pub mod remote;
pub mod structural;
pub mod subcircuit;

pub use crop::CropReport;
pub use feedline::FeedLine;
pub use ids::IdAllocator;
pub use remote::{RemoteEditor, ScriptEngine};
pub use structural::StructuralEditor;

/// A metal polygon to add, in API coordinates (y up)
#[derive(Debug, Clone, PartialEq)]
pub struct NewPolygon {
    pub level: i32,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Metal type token; the default metal when absent
    pub metal_type: Option<String>,
    pub tech_layer: Option<String>,
    pub inherit: bool,
}

impl NewPolygon {
    pub fn new(level: i32, xs: Vec<f64>, ys: Vec<f64>) -> Self {
        Self {
            level,
            xs,
            ys,
            metal_type: None,
            tech_layer: None,
            inherit: true,
        }
    }

    /// Build from `(x, y)` pairs
    pub fn from_vertices(level: i32, vertices: &[Vertex]) -> Self {
        let (xs, ys) = vertices.iter().copied().unzip();
        Self::new(level, xs, ys)
    }

    pub fn with_metal_type(mut self, metal_type: impl Into<String>) -> Self {
        self.metal_type = Some(metal_type.into());
        self
    }

    pub fn with_tech_layer(mut self, name: impl Into<String>, inherit: bool) -> Self {
        self.tech_layer = Some(name.into());
        self.inherit = inherit;
        self
    }
}

/// A standard port to add on edge `vertex` of `polygon`
#[derive(Debug, Clone)]
pub struct NewPort {
    pub polygon: PolygonId,
    pub vertex: usize,
    /// `max + 1` when absent
    pub number: Option<i32>,
    /// Configured port defaults when absent
    pub impedance: Option<PortSettings>,
}

impl NewPort {
    pub fn new(polygon: PolygonId, vertex: usize) -> Self {
        Self {
            polygon,
            vertex,
            number: None,
            impedance: None,
        }
    }

    pub fn with_number(mut self, number: i32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_impedance(
        mut self,
        resistance: f64,
        reactance: f64,
        inductance: f64,
        capacitance: f64,
    ) -> Self {
        self.impedance = Some(PortSettings {
            resistance,
            reactance,
            inductance,
            capacitance,
        });
        self
    }
}

/// Operations every editing backend offers
///
/// Coordinates are in the API convention (y up). Edits that a backend
/// cannot express return [`SonError::Unsupported`](crate::SonError::Unsupported).
pub trait ProjectEditor {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    fn add_polygon(&mut self, polygon: &NewPolygon) -> Result<PolygonId>;

    fn add_via_polygon(&mut self, level: i32, to_level: i32, xs: &[f64], ys: &[f64]) -> Result<()>;

    /// Remove a polygon and every port or reference plane pointing at it
    fn delete_polygon(&mut self, id: PolygonId) -> Result<()>;

    /// Returns the port number used
    fn add_port(&mut self, port: &NewPort) -> Result<i32>;

    fn set_reference_plane(&mut self, plane: ReferencePlane) -> Result<()>;

    fn clear_reference_plane(&mut self, wall: Wall) -> Result<()>;

    fn change_box_size(&mut self, x: i64, y: i64) -> Result<()>;

    fn change_cell_size(&mut self, x: f64, y: f64) -> Result<()>;

    /// `layer` is 0-based, top layer first
    fn change_dielectric_layer_thickness(&mut self, layer: usize, thickness: f64) -> Result<()>;

    fn box_size(&mut self) -> Result<(i64, i64)>;

    fn cell_size(&mut self) -> Result<(f64, f64)>;

    /// Polygons with rings in API coordinates
    fn polygons(&mut self) -> Result<Vec<Polygon>>;

    fn crop(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<CropReport>;

    /// Copy every polygon of `source` at offset `(x, y)`; returns old id to new id
    fn place_subcircuit(
        &mut self,
        source: &Project,
        x: f64,
        y: f64,
    ) -> Result<BTreeMap<PolygonId, PolygonId>>;

    fn synthesize_feedline(
        &mut self,
        polygon: PolygonId,
        vertex: usize,
        direction: Option<Wall>,
    ) -> Result<FeedLine>;

    fn set_valvar(
        &mut self,
        name: &str,
        value: Option<&str>,
        var_type: Option<&str>,
        description: Option<&str>,
    ) -> Result<()>;

    /// Apply a text-level edit to the whole project (parameters, output files)
    fn update_project(&mut self, edit: &mut dyn FnMut(&mut Project) -> Result<()>) -> Result<()>;

    /// Current project with all pending edits applied
    fn snapshot(&mut self) -> Result<Project>;

    /// Save to `path`, or to the file the editor was opened from
    fn save(&mut self, path: Option<&Path>) -> Result<()>;

    /// Outline of one polygon in API coordinates
    fn polygon_outline(&mut self, id: PolygonId) -> Result<Vec<Vertex>> {
        self.polygons()?
            .into_iter()
            .find(|p| p.id() == id)
            .map(|p| p.ring)
            .ok_or_else(|| crate::SonError::InvalidEdit(format!("no polygon with id {id}")))
    }
}

/// An editing session over one backend
pub struct Session {
    editor: Box<dyn ProjectEditor>,
}

impl Session {
    pub fn new(editor: Box<dyn ProjectEditor>) -> Self {
        log::debug!("[INFO] Session uses the {} backend", editor.backend());
        Self { editor }
    }

    /// Edit a project in process
    pub fn structural(project: Project, config: EditorConfig) -> Self {
        Self::new(Box::new(StructuralEditor::new(project, config)))
    }

    /// Open a file for in-process editing
    pub fn open<P: AsRef<Path>>(path: P, config: EditorConfig) -> Result<Self> {
        Ok(Self::new(Box::new(StructuralEditor::open(path, config)?)))
    }

    /// Edit a file through an automation engine
    pub fn remote<E, P>(engine: E, path: P, config: EditorConfig) -> Result<Self>
    where
        E: ScriptEngine + 'static,
        P: AsRef<Path>,
    {
        Ok(Self::new(Box::new(RemoteEditor::open(engine, path, config)?)))
    }

    pub fn set_abs_sweep(&mut self, start: f64, stop: f64) -> Result<()> {
        self.editor
            .update_project(&mut |project| project.set_abs_sweep(start, stop))
    }

    pub fn set_targ_abs(&mut self, points: i64) -> Result<()> {
        self.editor
            .update_project(&mut |project| project.set_targ_abs(points))
    }

    pub fn set_res_abs(&mut self, enable: bool, resolution: f64) -> Result<()> {
        self.editor
            .update_project(&mut |project| project.set_res_abs(enable, resolution))
    }

    pub fn set_speed(&mut self, speed: i64) -> Result<()> {
        self.editor
            .update_project(&mut |project| project.set_speed(speed))
    }

    pub fn add_mdif_output(&mut self, file_output: Option<&str>) -> Result<()> {
        self.editor
            .update_project(&mut |project| project.add_mdif_output(file_output))
    }

    pub fn remove_mdif_output(&mut self, file_output: Option<&str>) -> Result<()> {
        self.editor
            .update_project(&mut |project| project.remove_mdif_output(file_output))
    }

    /// Drop repeated VALVAR lines; returns how many were removed
    pub fn dedupe_valvars(&mut self) -> Result<usize> {
        let mut removed = 0;
        self.editor.update_project(&mut |project| {
            removed = project.dedupe_valvars()?;
            Ok(())
        })?;
        Ok(removed)
    }
}

impl Deref for Session {
    type Target = dyn ProjectEditor;

    fn deref(&self) -> &Self::Target {
        self.editor.as_ref()
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.editor.as_mut()
    }
}
