// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Structured model of the GEO block
//!
//! The block is decoded into the substrate description, reference planes,
//! ports and polygons. Lines the model does not cover are kept verbatim in
//! `layout`, which also records where each structured section sits so the
//! block can be regenerated in place.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SonError};

pub mod parser;
pub mod writer;

/// A 2-D vertex as stored in the file (x, y)
pub type Vertex = (f64, f64);

pub type PolygonId = u32;

/// Box wall, named as the solver displays it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wall {
    Left,
    Right,
    Top,
    Bottom,
}

impl Wall {
    pub const ALL: [Wall; 4] = [Wall::Left, Wall::Right, Wall::Top, Wall::Bottom];
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wall::Left => write!(f, "LEFT"),
            Wall::Right => write!(f, "RIGHT"),
            Wall::Top => write!(f, "TOP"),
            Wall::Bottom => write!(f, "BOTTOM"),
        }
    }
}

impl FromStr for Wall {
    type Err = SonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LEFT" => Ok(Wall::Left),
            "RIGHT" => Ok(Wall::Right),
            "TOP" => Ok(Wall::Top),
            "BOTTOM" => Ok(Wall::Bottom),
            other => Err(SonError::Format(format!("unknown wall direction {other}"))),
        }
    }
}

/// The `BOX` line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    /// Number of dielectric layers minus one
    pub levels: i64,
    pub x_width: i64,
    pub y_width: i64,
    /// Twice the number of cells along x
    pub x_cells2: i64,
    pub y_cells2: i64,
    pub reserved: i64,
    pub eeff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DielectricLayer {
    pub thickness: f64,
    pub erel: f64,
    pub mrel: f64,
    pub eloss: f64,
    pub mloss: f64,
    pub esigma: f64,
    pub nzpart: i64,
    pub name: String,
    pub extra: Vec<f64>,
}

/// Box record plus the dielectric stack-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    pub record: BoxRecord,
    pub layers: Vec<DielectricLayer>,
    /// Indentation written before every layer line
    pub indent: String,
}

impl Substrate {
    pub fn box_size(&self) -> (i64, i64) {
        (self.record.x_width, self.record.y_width)
    }

    /// `box / (cells2 / 2)` along each axis
    pub fn cell_size(&self) -> (f64, f64) {
        (
            self.record.x_width as f64 / (self.record.x_cells2 as f64 / 2.0),
            self.record.y_width as f64 / (self.record.y_cells2 as f64 / 2.0),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechLayer {
    pub name: String,
    /// `INH` when true, `NOH` otherwise
    pub inherit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonHeader {
    /// Metalization level
    pub level: i32,
    /// Metal type token, `-1` for the default metal
    pub metal_type: String,
    /// Fill type token
    pub fill: String,
    pub id: PolygonId,
    /// Remaining header tokens (subsection sizes, conductor limits, edge mesh)
    pub extra: Vec<String>,
    pub tech_layer: Option<TechLayer>,
}

impl PolygonHeader {
    /// Header the solver writes for a plain metal polygon
    pub fn metal(level: i32, metal_type: Option<&str>, id: PolygonId) -> Self {
        Self {
            level,
            metal_type: metal_type.unwrap_or("-1").to_string(),
            fill: "N".to_string(),
            id,
            extra: ["1", "1", "100", "100", "0", "0", "0", "Y"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tech_layer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub header: PolygonHeader,
    /// Closed ring: the first vertex is repeated at the end
    pub ring: Vec<Vertex>,
}

impl Polygon {
    /// Build a polygon, closing the ring when needed
    pub fn new(header: PolygonHeader, mut ring: Vec<Vertex>) -> Self {
        close_ring(&mut ring);
        Self { header, ring }
    }

    pub fn id(&self) -> PolygonId {
        self.header.id
    }

    pub fn vertex_count(&self) -> usize {
        self.ring.len()
    }

    pub fn is_closed(&self) -> bool {
        self.ring.len() > 1 && self.ring.first() == self.ring.last()
    }

    /// Edge starting at vertex `index`
    pub fn edge(&self, index: usize) -> Option<(Vertex, Vertex)> {
        if index + 1 < self.ring.len() {
            Some((self.ring[index], self.ring[index + 1]))
        } else {
            None
        }
    }

    /// (xmin, ymin, xmax, ymax)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.ring.iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }
}

/// Append the first vertex when the ring is open
pub fn close_ring(ring: &mut Vec<Vertex>) {
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(first);
        }
    }
}

/// A via polygon, kept as the exact lines it was read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViaRegion {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgndCalibration {
    pub calib_type: String,
    pub plane_length: Option<String>,
    pub calib_length: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CupFields {
    pub calib_group: String,
    /// `CUPGRP <group> <type>`
    pub group: Option<(String, String)>,
    pub id: Option<i64>,
    pub ground_ref: Option<String>,
    pub tw_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortKind {
    Std,
    Box,
    Agnd(AgndCalibration),
    Cup(CupFields),
}

impl PortKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            PortKind::Std => "STD",
            PortKind::Box => "BOX",
            PortKind::Agnd(_) => "AGND",
            PortKind::Cup(_) => "CUP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub kind: PortKind,
    pub polygon: PolygonId,
    /// Point count written on the `POLY` line
    pub points: u32,
    pub vertex: usize,
    pub number: i32,
    pub resistance: f64,
    pub reactance: f64,
    pub inductance: f64,
    pub capacitance: f64,
    pub x: f64,
    pub y: f64,
    /// Parameter line tokens the model does not interpret
    #[serde(default)]
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaneAnchor {
    /// Anchored to a polygon vertex
    Link {
        polygon: PolygonId,
        points: u32,
        vertex: usize,
    },
    /// Fixed length from the wall
    Fix { length: f64 },
    /// Explicitly absent, trailing tokens kept
    None { trailing: Vec<String> },
}

/// Distributed reference plane on one wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePlane {
    pub wall: Wall,
    pub anchor: PlaneAnchor,
}

/// Position of a section within the GEO block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Slot {
    /// A line the model does not interpret
    Line(String),
    Substrate,
    Planes,
    Ports,
    Polygons,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub layout: Vec<Slot>,
    pub substrate: Substrate,
    pub planes: Vec<ReferencePlane>,
    pub ports: Vec<Port>,
    pub polygons: Vec<Polygon>,
    pub vias: Vec<ViaRegion>,
}

impl Geometry {
    pub fn box_size(&self) -> (i64, i64) {
        self.substrate.box_size()
    }

    pub fn cell_size(&self) -> (f64, f64) {
        self.substrate.cell_size()
    }

    /// Height used by the Y-axis inversion
    pub fn box_height(&self) -> f64 {
        self.substrate.record.y_width as f64
    }

    pub fn polygon(&self, id: PolygonId) -> Option<&Polygon> {
        self.polygons.iter().find(|p| p.id() == id)
    }

    pub fn polygon_ids(&self) -> HashSet<PolygonId> {
        self.polygons.iter().map(Polygon::id).collect()
    }

    pub fn has_vias(&self) -> bool {
        !self.vias.is_empty()
    }

    /// `max(existing) + 1`, or 1 when there are no ports
    pub fn next_port_number(&self) -> i32 {
        self.ports.iter().map(|p| p.number).max().map_or(1, |n| n + 1)
    }

    pub fn plane(&self, wall: Wall) -> Option<&ReferencePlane> {
        self.planes.iter().find(|p| p.wall == wall)
    }

    pub fn push_port(&mut self, port: Port) {
        self.ensure_slot(Slot::Ports);
        self.ports.push(port);
    }

    /// Set the plane for its wall, replacing any previous one
    pub fn set_plane(&mut self, plane: ReferencePlane) {
        self.ensure_slot(Slot::Planes);
        match self.planes.iter_mut().find(|p| p.wall == plane.wall) {
            Some(existing) => *existing = plane,
            None => self.planes.push(plane),
        }
    }

    pub fn clear_plane(&mut self, wall: Wall) -> Option<ReferencePlane> {
        let index = self.planes.iter().position(|p| p.wall == wall)?;
        Some(self.planes.remove(index))
    }

    /// Remove a polygon together with ports and planes that reference it
    pub fn remove_polygon(&mut self, id: PolygonId) -> Result<Polygon> {
        let index = self
            .polygons
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| SonError::InvalidEdit(format!("no polygon with id {id}")))?;
        let polygon = self.polygons.remove(index);
        self.drop_references(&[id].into_iter().collect());
        Ok(polygon)
    }

    /// Drop ports and LINK planes pointing at any of `ids`
    pub fn drop_references(&mut self, ids: &HashSet<PolygonId>) {
        let before = self.ports.len();
        self.ports.retain(|p| !ids.contains(&p.polygon));
        if self.ports.len() != before {
            log::warn!(
                "[WARN] Dropped {} ports referencing removed polygons",
                before - self.ports.len()
            );
        }
        self.planes.retain(|plane| match plane.anchor {
            PlaneAnchor::Link { polygon, .. } if ids.contains(&polygon) => {
                log::warn!(
                    "[WARN] Dropped {} reference plane linked to removed polygon {polygon}",
                    plane.wall
                );
                false
            }
            _ => true,
        });
    }

    /// Update a `VALVAR <name> <type> <value> <description>` line
    pub fn set_valvar(
        &mut self,
        name: &str,
        value: Option<&str>,
        var_type: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        for slot in &mut self.layout {
            let Slot::Line(line) = slot else { continue };
            // The description is the rest of the line and may contain spaces
            let mut tokens: Vec<String> = line.splitn(5, ' ').map(str::to_string).collect();
            if tokens.len() < 4 || tokens[0] != "VALVAR" || tokens[1] != name {
                continue;
            }
            if let Some(t) = var_type {
                tokens[2] = t.to_string();
            }
            if let Some(v) = value {
                tokens[3] = v.to_string();
            }
            if let Some(d) = description {
                tokens.truncate(4);
                tokens.push(d.to_string());
            }
            *line = tokens.join(" ");
            return Ok(());
        }
        Err(SonError::InvalidEdit(format!("no VALVAR named {name}")))
    }

    /// Insert a section slot if missing: planes go before ports, ports before polygons
    fn ensure_slot(&mut self, slot: Slot) {
        if self.layout.contains(&slot) {
            return;
        }
        let anchors: &[Slot] = match slot {
            Slot::Planes => &[Slot::Ports, Slot::Polygons],
            _ => &[Slot::Polygons],
        };
        let index = anchors
            .iter()
            .find_map(|a| self.layout.iter().position(|s| s == a))
            .unwrap_or(self.layout.len());
        self.layout.insert(index, slot);
    }

    /// Remove section slots that no longer hold records
    pub fn normalize(&mut self) {
        let (no_planes, no_ports) = (self.planes.is_empty(), self.ports.is_empty());
        self.layout.retain(|slot| match slot {
            Slot::Planes => !no_planes,
            Slot::Ports => !no_ports,
            _ => true,
        });
    }

    /// Check every model invariant the encoder relies on
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for polygon in &self.polygons {
            let id = polygon.id();
            if id == 0 {
                return Err(SonError::InvalidEdit("polygon without an id".to_string()));
            }
            if !ids.insert(id) {
                return Err(SonError::InvalidEdit(format!("duplicate polygon id {id}")));
            }
            if !polygon.is_closed() {
                return Err(SonError::InvalidEdit(format!(
                    "polygon {id} has an open ring"
                )));
            }
        }

        let mut numbers = HashSet::new();
        for port in &self.ports {
            if port.number <= 0 || !numbers.insert(port.number) {
                return Err(SonError::InvalidEdit(format!(
                    "port number {} is not a unique positive integer",
                    port.number
                )));
            }
            let Some(polygon) = self.polygon(port.polygon) else {
                return Err(SonError::InvalidEdit(format!(
                    "port {} references missing polygon {}",
                    port.number, port.polygon
                )));
            };
            if polygon.edge(port.vertex).is_none() {
                return Err(SonError::InvalidEdit(format!(
                    "port {} sits on edge {} of polygon {} which has {} vertices",
                    port.number,
                    port.vertex,
                    port.polygon,
                    polygon.vertex_count()
                )));
            }
        }

        let mut walls = HashSet::new();
        for plane in &self.planes {
            if !walls.insert(plane.wall) {
                return Err(SonError::InvalidEdit(format!(
                    "more than one reference plane on {}",
                    plane.wall
                )));
            }
            if let PlaneAnchor::Link { polygon, vertex, .. } = plane.anchor {
                if self.polygon(polygon).and_then(|p| p.edge(vertex)).is_none() {
                    return Err(SonError::InvalidEdit(format!(
                        "{} reference plane links to missing edge {vertex} of polygon {polygon}",
                        plane.wall
                    )));
                }
            }
        }

        if self.substrate.layers.is_empty() {
            return Err(SonError::InvalidEdit(
                "substrate has no dielectric layers".to_string(),
            ));
        }
        Ok(())
    }
}
