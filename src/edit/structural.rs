// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! In-process editor over the decoded model
//!
//! The GEO block is decoded on first use and cached. Each edit runs on a
//! copy of the cached geometry which only replaces the cache once it passes
//! validation, so a failed edit leaves the previous state untouched. The
//! cache is written back into the project text on [`StructuralEditor::commit`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::coords::{fix_ring, fix_y};
use super::ids::IdAllocator;
use super::{crop, feedline, subcircuit, CropReport, FeedLine, NewPolygon, NewPort, ProjectEditor};
use crate::config::{EditorConfig, PortSettings};
use crate::error::{Result, SonError};
use crate::geo::{
    Geometry, Polygon, PolygonHeader, PolygonId, Port, PortKind, ReferencePlane, TechLayer,
    Vertex, Wall,
};
use crate::son::reader::{SonReader, SonWriter};
use crate::son::Project;

/// Add a metal polygon given in API coordinates
pub(crate) fn insert_polygon(
    geometry: &mut Geometry,
    polygon: &NewPolygon,
    ids: &mut IdAllocator,
) -> Result<PolygonId> {
    if polygon.xs.len() != polygon.ys.len() {
        return Err(SonError::InvalidEdit(format!(
            "{} x coordinates but {} y coordinates",
            polygon.xs.len(),
            polygon.ys.len()
        )));
    }
    let height = geometry.box_height();
    let ring: Vec<Vertex> = polygon
        .xs
        .iter()
        .zip(&polygon.ys)
        .map(|(&x, &y)| (x, fix_y(y, height)))
        .collect();
    let distinct = ring
        .iter()
        .enumerate()
        .filter(|&(i, v)| !ring[..i].contains(v))
        .count();
    if distinct < 3 {
        return Err(SonError::InvalidEdit(format!(
            "polygon needs 3 distinct vertices, got {distinct}"
        )));
    }

    let id = ids.allocate(&geometry.polygon_ids());
    let mut header = PolygonHeader::metal(polygon.level, polygon.metal_type.as_deref(), id);
    header.tech_layer = polygon.tech_layer.as_ref().map(|name| TechLayer {
        name: name.clone(),
        inherit: polygon.inherit,
    });
    geometry.polygons.push(Polygon::new(header, ring));
    log::debug!("[INFO] Added polygon {id} on level {}", polygon.level);
    Ok(id)
}

/// Add a standard port at the middle of the requested edge
pub(crate) fn insert_port(
    geometry: &mut Geometry,
    port: &NewPort,
    defaults: &PortSettings,
) -> Result<i32> {
    let polygon = geometry
        .polygon(port.polygon)
        .ok_or_else(|| SonError::InvalidEdit(format!("no polygon with id {}", port.polygon)))?;
    let (a, b) = polygon.edge(port.vertex).ok_or_else(|| {
        SonError::InvalidEdit(format!("polygon {} has no edge {}", port.polygon, port.vertex))
    })?;

    let number = match port.number {
        Some(n) if n <= 0 => {
            return Err(SonError::InvalidEdit(format!(
                "port number {n} is not positive"
            )))
        }
        Some(n) if geometry.ports.iter().any(|p| p.number == n) => {
            return Err(SonError::InvalidEdit(format!("port {n} already exists")))
        }
        Some(n) => n,
        None => geometry.next_port_number(),
    };

    let impedance = port.impedance.as_ref().unwrap_or(defaults);
    geometry.push_port(Port {
        kind: PortKind::Std,
        polygon: port.polygon,
        points: 1,
        vertex: port.vertex,
        number,
        resistance: impedance.resistance,
        reactance: impedance.reactance,
        inductance: impedance.inductance,
        capacitance: impedance.capacitance,
        x: (a.0 + b.0) / 2.0,
        y: (a.1 + b.1) / 2.0,
        extra: Vec::new(),
    });
    Ok(number)
}

/// Doubled cell count for `length` split into cells of `cell`
fn doubled_cells(length: f64, cell: f64) -> Result<i64> {
    if length <= 0.0 || cell <= 0.0 {
        return Err(SonError::InvalidEdit(format!(
            "box {length} and cell {cell} must be positive"
        )));
    }
    let cells = (length / cell + 1e-9).floor() as i64;
    if cells == 0 {
        return Err(SonError::InvalidEdit(format!(
            "cell {cell} is larger than the box {length}"
        )));
    }
    Ok(2 * cells)
}

pub(crate) fn resize_box(geometry: &mut Geometry, x: i64, y: i64) -> Result<()> {
    let (cell_x, cell_y) = geometry.cell_size();
    let record = &mut geometry.substrate.record;
    record.x_cells2 = doubled_cells(x as f64, cell_x)?;
    record.y_cells2 = doubled_cells(y as f64, cell_y)?;
    record.x_width = x;
    record.y_width = y;
    Ok(())
}

pub(crate) fn resize_cells(geometry: &mut Geometry, x: f64, y: f64) -> Result<()> {
    let (box_x, box_y) = geometry.box_size();
    let record = &mut geometry.substrate.record;
    record.x_cells2 = doubled_cells(box_x as f64, x)?;
    record.y_cells2 = doubled_cells(box_y as f64, y)?;
    Ok(())
}

pub struct StructuralEditor {
    project: Project,
    /// Decoded GEO block, `None` until first needed
    geometry: Option<Geometry>,
    /// Cached geometry differs from the project text
    dirty: bool,
    config: EditorConfig,
    ids: IdAllocator,
    path: Option<PathBuf>,
}

impl StructuralEditor {
    pub fn new(project: Project, config: EditorConfig) -> Self {
        Self {
            project,
            geometry: None,
            dirty: false,
            ids: IdAllocator::new(&config.ids),
            config,
            path: None,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P, config: EditorConfig) -> Result<Self> {
        let project = SonReader::new().read(&path)?;
        let mut editor = Self::new(project, config);
        editor.path = Some(path.as_ref().to_path_buf());
        Ok(editor)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Decoded geometry, parsed on first access
    pub fn geometry(&mut self) -> Result<&Geometry> {
        let geometry = match self.geometry.take() {
            Some(geometry) => geometry,
            None => self.project.geometry()?,
        };
        Ok(self.geometry.insert(geometry))
    }

    /// Write pending geometry edits into the project text
    pub fn commit(&mut self) -> &Project {
        if self.dirty {
            if let Some(geometry) = &self.geometry {
                self.project.set_geometry(geometry);
            }
            self.dirty = false;
        }
        &self.project
    }

    pub fn into_project(mut self) -> Project {
        self.commit();
        self.project
    }

    /// Run `f` on a copy of the geometry and keep the copy if it stays valid
    fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut Geometry, &mut IdAllocator, &EditorConfig) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.geometry()?.clone();
        let value = f(&mut next, &mut self.ids, &self.config)?;
        next.normalize();
        next.validate()?;
        self.geometry = Some(next);
        self.dirty = true;
        Ok(value)
    }
}

impl ProjectEditor for StructuralEditor {
    fn backend(&self) -> &'static str {
        "structural"
    }

    fn add_polygon(&mut self, polygon: &NewPolygon) -> Result<PolygonId> {
        self.edit(|geometry, ids, _| insert_polygon(geometry, polygon, ids))
    }

    fn add_via_polygon(&mut self, _: i32, _: i32, _: &[f64], _: &[f64]) -> Result<()> {
        Err(SonError::Unsupported(
            "via polygons can only be added through a remote backend".to_string(),
        ))
    }

    fn delete_polygon(&mut self, id: PolygonId) -> Result<()> {
        self.edit(|geometry, _, _| geometry.remove_polygon(id).map(|_| ()))
    }

    fn add_port(&mut self, port: &NewPort) -> Result<i32> {
        self.edit(|geometry, _, config| insert_port(geometry, port, &config.port))
    }

    fn set_reference_plane(&mut self, plane: ReferencePlane) -> Result<()> {
        self.edit(|geometry, _, _| {
            geometry.set_plane(plane);
            Ok(())
        })
    }

    fn clear_reference_plane(&mut self, wall: Wall) -> Result<()> {
        self.edit(|geometry, _, _| {
            if geometry.clear_plane(wall).is_none() {
                log::debug!("[INFO] No reference plane on {wall} to clear");
            }
            Ok(())
        })
    }

    fn change_box_size(&mut self, x: i64, y: i64) -> Result<()> {
        self.edit(|geometry, _, _| resize_box(geometry, x, y))
    }

    fn change_cell_size(&mut self, x: f64, y: f64) -> Result<()> {
        self.edit(|geometry, _, _| resize_cells(geometry, x, y))
    }

    fn change_dielectric_layer_thickness(&mut self, layer: usize, thickness: f64) -> Result<()> {
        if thickness < 0.0 {
            return Err(SonError::InvalidEdit(format!(
                "negative layer thickness {thickness}"
            )));
        }
        self.edit(|geometry, _, _| {
            let count = geometry.substrate.layers.len();
            let target = geometry.substrate.layers.get_mut(layer).ok_or_else(|| {
                SonError::InvalidEdit(format!("layer {layer} out of range ({count} layers)"))
            })?;
            target.thickness = thickness;
            Ok(())
        })
    }

    fn box_size(&mut self) -> Result<(i64, i64)> {
        Ok(self.geometry()?.box_size())
    }

    fn cell_size(&mut self) -> Result<(f64, f64)> {
        Ok(self.geometry()?.cell_size())
    }

    fn polygons(&mut self) -> Result<Vec<Polygon>> {
        let geometry = self.geometry()?;
        let height = geometry.box_height();
        Ok(geometry
            .polygons
            .iter()
            .map(|p| Polygon {
                header: p.header.clone(),
                ring: fix_ring(&p.ring, height),
            })
            .collect())
    }

    fn crop(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<CropReport> {
        self.edit(|geometry, ids, config| {
            crop::crop(geometry, (x1, y1, x2, y2), ids, config.geometry.snap_decimals)
        })
    }

    fn place_subcircuit(
        &mut self,
        source: &Project,
        x: f64,
        y: f64,
    ) -> Result<BTreeMap<PolygonId, PolygonId>> {
        let source = source.geometry()?;
        self.edit(|geometry, ids, _| subcircuit::place_subcircuit(geometry, &source, (x, y), ids))
    }

    fn synthesize_feedline(
        &mut self,
        polygon: PolygonId,
        vertex: usize,
        direction: Option<Wall>,
    ) -> Result<FeedLine> {
        self.edit(|geometry, ids, config| {
            feedline::synthesize_feedline(geometry, polygon, vertex, direction, &config.feedline, ids)
        })
    }

    fn set_valvar(
        &mut self,
        name: &str,
        value: Option<&str>,
        var_type: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        self.edit(|geometry, _, _| geometry.set_valvar(name, value, var_type, description))
    }

    fn update_project(&mut self, edit: &mut dyn FnMut(&mut Project) -> Result<()>) -> Result<()> {
        let mut next = self.commit().clone();
        edit(&mut next)?;
        self.project = next;
        // The edit may have touched GEO text
        self.geometry = None;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Project> {
        Ok(self.commit().clone())
    }

    fn save(&mut self, path: Option<&Path>) -> Result<()> {
        let target = match (path, &self.path) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) => path.clone(),
            (None, None) => {
                return Err(SonError::InvalidEdit(
                    "no file name to save the project to".to_string(),
                ))
            }
        };
        self.commit();
        SonWriter::new().write(&self.project, &target)?;
        self.path = Some(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdSettings, IdStrategy};

    fn editor() -> StructuralEditor {
        let config = EditorConfig {
            ids: IdSettings {
                strategy: IdStrategy::Sequential,
                seed: None,
            },
            ..EditorConfig::default()
        };
        let stamp = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        StructuralEditor::new(Project::template(stamp), config)
    }

    #[test]
    fn test_doubled_cells() {
        assert_eq!(doubled_cells(160.0, 5.0).unwrap(), 64);
        assert_eq!(doubled_cells(160.0, 7.0).unwrap(), 44);
        assert!(doubled_cells(4.0, 5.0).is_err());
        assert!(doubled_cells(160.0, 0.0).is_err());
    }

    #[test]
    fn test_failed_edit_keeps_state() {
        let mut editor = editor();
        let id = editor
            .add_polygon(&NewPolygon::from_vertices(0, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]))
            .unwrap();
        let before = editor.geometry().unwrap().clone();

        assert!(editor.add_port(&NewPort::new(id, 7)).is_err());
        assert!(editor.delete_polygon(id + 100).is_err());
        assert!(editor.change_cell_size(500.0, 5.0).is_err());
        assert_eq!(editor.geometry().unwrap(), &before);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let mut editor = editor();
        let err = editor
            .add_polygon(&NewPolygon::from_vertices(0, &[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]))
            .unwrap_err();
        assert!(matches!(err, SonError::InvalidEdit(_)));
    }

    #[test]
    fn test_via_polygon_unsupported() {
        let mut editor = editor();
        let err = editor
            .add_via_polygon(0, 1, &[0.0, 1.0, 1.0], &[0.0, 0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, SonError::Unsupported(_)));
    }

    #[test]
    fn test_commit_writes_geo_text() {
        let mut editor = editor();
        editor
            .add_polygon(&NewPolygon::from_vertices(0, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]))
            .unwrap();
        let text = editor.commit().geo_text().unwrap().to_string();
        assert!(text.contains("NUM 1"));
        assert!(text.contains("0 4 -1 N 1 1 1 100 100 0 0 0 Y"));
    }
}
