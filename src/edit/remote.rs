// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Editing through an external automation engine
//!
//! The engine holds a live `Project` object and accepts script commands.
//! Edits it has no command for go through the file instead: ask the engine
//! to save, edit the saved text, write it back and have the engine reopen
//! it. The engine is known to write some VALVAR lines twice on save, so the
//! save path removes the repeats before the file is accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::coords::{fix_ring, fix_ys};
use super::structural::insert_port;
use super::{CropReport, FeedLine, NewPolygon, NewPort, ProjectEditor};
use crate::config::EditorConfig;
use crate::error::{Result, SonError};
use crate::geo::{Polygon, PolygonId, ReferencePlane, TechLayer, Wall};
use crate::son::reader::{SonReader, SonWriter};
use crate::son::Project;

/// A scripting engine holding the live project object
pub trait ScriptEngine {
    /// Run a statement
    fn eval(&mut self, command: &str) -> Result<()>;

    /// Evaluate an expression to a number
    fn number(&mut self, expression: &str) -> Result<f64>;
}

/// `[a; b; c]` column vector literal
fn column(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(f64::to_string).collect();
    format!("[{}]", items.join("; "))
}

fn unsupported(operation: &str) -> SonError {
    SonError::Unsupported(format!("{operation} is not available on the remote backend"))
}

pub struct RemoteEditor<E: ScriptEngine> {
    engine: E,
    path: PathBuf,
    config: EditorConfig,
}

impl<E: ScriptEngine> RemoteEditor<E> {
    /// Have the engine open `path`
    pub fn open<P: AsRef<Path>>(engine: E, path: P, config: EditorConfig) -> Result<Self> {
        let mut editor = Self {
            engine,
            path: path.as_ref().to_path_buf(),
            config,
        };
        editor.reload()?;
        Ok(editor)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    fn reload(&mut self) -> Result<()> {
        self.engine.eval("clear Project;")?;
        self.engine.eval(&format!(
            "Project = SonnetProject(\"{}\");",
            self.path.display()
        ))
    }

    fn box_height(&mut self) -> Result<f64> {
        self.engine.number("Project.yBoxSize()")
    }

    /// Save through the engine and clean the written file
    fn persist(&mut self, target: &Path) -> Result<()> {
        if target == self.path {
            self.engine.eval("Project.save();")?;
        } else {
            self.engine
                .eval(&format!("Project.saveAs(\"{}\");", target.display()))?;
        }
        if self.config.remote.dedupe_valvars {
            let mut project = SonReader::new().read(target)?;
            if project.dedupe_valvars()? > 0 {
                SonWriter::new().write(&project, target)?;
            }
        }
        Ok(())
    }

    /// Edit the saved file and reopen it in the engine
    fn round_trip<T>(&mut self, f: impl FnOnce(&mut Project) -> Result<T>) -> Result<T> {
        let path = self.path.clone();
        self.persist(&path)?;
        let mut project = SonReader::new().read(&path)?;
        let value = f(&mut project)?;
        SonWriter::new().write(&project, &path)?;
        self.reload()?;
        Ok(value)
    }
}

impl<E: ScriptEngine> ProjectEditor for RemoteEditor<E> {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn add_polygon(&mut self, polygon: &NewPolygon) -> Result<PolygonId> {
        if polygon.xs.len() != polygon.ys.len() || polygon.xs.len() < 3 {
            return Err(SonError::InvalidEdit(format!(
                "polygon needs matching x and y lists of at least 3 vertices, got {} and {}",
                polygon.xs.len(),
                polygon.ys.len()
            )));
        }
        let height = self.box_height()?;
        let xs = column(&polygon.xs);
        let ys = column(&fix_ys(&polygon.ys, height));
        let level = polygon.level;
        let command = match &polygon.metal_type {
            None => format!("polyId = Project.addMetalPolygonEasy({level}, {xs}, {ys}).DebugId;"),
            Some(t) if t.parse::<i64>().is_ok() => {
                format!("polyId = Project.addMetalPolygonEasy({level}, {xs}, {ys}, {t}).DebugId;")
            }
            Some(t) => {
                format!("polyId = Project.addMetalPolygonEasy({level}, {xs}, {ys}, \"{t}\").DebugId;")
            }
        };
        self.engine.eval(&command)?;
        let id = self.engine.number("polyId")? as PolygonId;

        if let Some(name) = &polygon.tech_layer {
            let tech_layer = TechLayer {
                name: name.clone(),
                inherit: polygon.inherit,
            };
            self.round_trip(|project| {
                let mut geometry = project.geometry()?;
                let target = geometry
                    .polygons
                    .iter_mut()
                    .find(|p| p.id() == id)
                    .ok_or_else(|| {
                        SonError::Backend(format!("engine did not write polygon {id}"))
                    })?;
                target.header.tech_layer = Some(tech_layer);
                project.set_geometry(&geometry);
                Ok(())
            })?;
        }
        Ok(id)
    }

    fn add_via_polygon(&mut self, level: i32, to_level: i32, xs: &[f64], ys: &[f64]) -> Result<()> {
        if xs.len() != ys.len() {
            return Err(SonError::InvalidEdit(format!(
                "{} x coordinates but {} y coordinates",
                xs.len(),
                ys.len()
            )));
        }
        let height = self.box_height()?;
        self.engine.eval(&format!(
            "Project.addViaPolygonEasy({level}, {to_level}, {}, {});",
            column(xs),
            column(&fix_ys(ys, height))
        ))
    }

    fn delete_polygon(&mut self, _: PolygonId) -> Result<()> {
        Err(unsupported("delete_polygon"))
    }

    fn add_port(&mut self, port: &NewPort) -> Result<i32> {
        let defaults = self.config.port.clone();
        self.round_trip(|project| {
            let mut geometry = project.geometry()?;
            let number = insert_port(&mut geometry, port, &defaults)?;
            geometry.validate()?;
            project.set_geometry(&geometry);
            Ok(number)
        })
    }

    fn set_reference_plane(&mut self, _: ReferencePlane) -> Result<()> {
        Err(unsupported("set_reference_plane"))
    }

    fn clear_reference_plane(&mut self, wall: Wall) -> Result<()> {
        self.round_trip(|project| {
            let mut geometry = project.geometry()?;
            if geometry.clear_plane(wall).is_some() {
                geometry.normalize();
                project.set_geometry(&geometry);
            }
            Ok(())
        })
    }

    fn change_box_size(&mut self, x: i64, y: i64) -> Result<()> {
        if x <= 0 || y <= 0 {
            return Err(SonError::InvalidEdit(format!(
                "box size {x} x {y} must be positive"
            )));
        }
        self.engine
            .eval(&format!("Project.changeBoxSize({x}, {y});"))
    }

    fn change_cell_size(&mut self, x: f64, y: f64) -> Result<()> {
        let (box_x, box_y) = self.box_size()?;
        if x <= 0.0 || y <= 0.0 || x > box_x as f64 || y > box_y as f64 {
            return Err(SonError::InvalidEdit(format!(
                "cell size {x} x {y} does not fit the box {box_x} x {box_y}"
            )));
        }
        let cells_x = (box_x as f64 / x).floor() as i64;
        let cells_y = (box_y as f64 / y).floor() as i64;
        self.engine.eval(&format!(
            "Project.changeCellSizeUsingNumberOfCellsXY({cells_x}, {cells_y});"
        ))
    }

    fn change_dielectric_layer_thickness(&mut self, layer: usize, thickness: f64) -> Result<()> {
        // Engine layers are 1-based
        self.engine.eval(&format!(
            "Project.changeDielectricLayerThickness({}, {thickness});",
            layer + 1
        ))
    }

    fn box_size(&mut self) -> Result<(i64, i64)> {
        let x = self.engine.number("Project.xBoxSize()")?;
        let y = self.engine.number("Project.yBoxSize()")?;
        Ok((x.round() as i64, y.round() as i64))
    }

    fn cell_size(&mut self) -> Result<(f64, f64)> {
        Ok(self.snapshot()?.geometry()?.cell_size())
    }

    fn polygons(&mut self) -> Result<Vec<Polygon>> {
        let geometry = self.snapshot()?.geometry()?;
        let height = geometry.box_height();
        Ok(geometry
            .polygons
            .into_iter()
            .map(|p| Polygon {
                ring: fix_ring(&p.ring, height),
                header: p.header,
            })
            .collect())
    }

    fn crop(&mut self, _: f64, _: f64, _: f64, _: f64) -> Result<CropReport> {
        Err(unsupported("crop"))
    }

    fn place_subcircuit(
        &mut self,
        _: &Project,
        _: f64,
        _: f64,
    ) -> Result<BTreeMap<PolygonId, PolygonId>> {
        Err(unsupported("place_subcircuit"))
    }

    fn synthesize_feedline(
        &mut self,
        _: PolygonId,
        _: usize,
        _: Option<Wall>,
    ) -> Result<FeedLine> {
        Err(unsupported("synthesize_feedline"))
    }

    fn set_valvar(
        &mut self,
        _: &str,
        _: Option<&str>,
        _: Option<&str>,
        _: Option<&str>,
    ) -> Result<()> {
        Err(unsupported("set_valvar"))
    }

    fn update_project(&mut self, edit: &mut dyn FnMut(&mut Project) -> Result<()>) -> Result<()> {
        self.round_trip(|project| edit(project))
    }

    fn snapshot(&mut self) -> Result<Project> {
        let path = self.path.clone();
        self.persist(&path)?;
        SonReader::new().read(&path)
    }

    fn save(&mut self, path: Option<&Path>) -> Result<()> {
        let target = path.map_or_else(|| self.path.clone(), Path::to_path_buf);
        self.persist(&target)?;
        self.path = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_literal() {
        assert_eq!(column(&[1.0, 2.5, -3.0]), "[1; 2.5; -3]");
        assert_eq!(column(&[]), "[]");
    }
}
