// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::edit::coords::{fix_ring, fix_vertex};
use crate::error::Result;
use crate::geo::{Geometry, Polygon, Port, PortKind, Vertex};

#[derive(Debug, Serialize)]
pub struct PolygonCsvRecord {
    #[serde(rename = "Id")]
    pub id: u32,
    #[serde(rename = "Level")]
    pub level: i32,
    #[serde(rename = "Vertices")]
    pub vertices: usize,
    #[serde(rename = "Bounds")]
    pub bounds: String,
    #[serde(rename = "TechLayer")]
    pub tech_layer: String,
    #[serde(rename = "Outline")]
    pub outline: String,
}

#[derive(Debug, Serialize)]
pub struct PortCsvRecord {
    #[serde(rename = "Number")]
    pub number: i32,
    #[serde(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Polygon")]
    pub polygon: u32,
    #[serde(rename = "Vertex")]
    pub vertex: usize,
    #[serde(rename = "Impedance")]
    pub impedance: String,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

/// Format a ring as space-separated "x:y" pairs
fn format_outline(ring: &[Vertex]) -> String {
    ring.iter()
        .map(|(x, y)| format!("{x}:{y}"))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Convert a polygon to a record in API coordinates
fn polygon_to_csv_record(polygon: &Polygon, box_height: f64) -> PolygonCsvRecord {
    let public = Polygon {
        header: polygon.header.clone(),
        ring: fix_ring(&polygon.ring, box_height),
    };
    let (x0, y0, x1, y1) = public.bounds();
    PolygonCsvRecord {
        id: public.id(),
        level: public.header.level,
        vertices: public.vertex_count(),
        bounds: format!("{x0:.3},{y0:.3},{x1:.3},{y1:.3}"),
        tech_layer: public
            .header
            .tech_layer
            .as_ref()
            .map(|t| format!("{}:{}", t.name, if t.inherit { "INH" } else { "NOH" }))
            .unwrap_or_default(),
        outline: format_outline(&public.ring),
    }
}

fn port_to_csv_record(port: &Port, box_height: f64) -> PortCsvRecord {
    let kind = match &port.kind {
        PortKind::Cup(cup) if !cup.calib_group.is_empty() => format!("CUP {}", cup.calib_group),
        kind => kind.keyword().to_string(),
    };
    let (x, y) = fix_vertex((port.x, port.y), box_height);
    PortCsvRecord {
        number: port.number,
        kind,
        polygon: port.polygon,
        vertex: port.vertex,
        impedance: format!(
            "R={} X={} L={} C={}",
            port.resistance, port.reactance, port.inductance, port.capacitance
        ),
        x,
        y,
    }
}

/// Write one record per polygon
pub fn write_polygons_csv<W: Write>(geometry: &Geometry, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    let height = geometry.box_height();
    for polygon in &geometry.polygons {
        writer.serialize(polygon_to_csv_record(polygon, height))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one record per port
pub fn write_ports_csv<W: Write>(geometry: &Geometry, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    let height = geometry.box_height();
    for port in &geometry.ports {
        writer.serialize(port_to_csv_record(port, height))?;
    }
    writer.flush()?;
    Ok(())
}

/// Export polygons to a CSV file
pub fn export_polygons_to_csv<P: AsRef<Path>>(geometry: &Geometry, file_path: P) -> Result<()> {
    write_polygons_csv(geometry, File::create(file_path)?)
}

/// Export ports to a CSV file
pub fn export_ports_to_csv<P: AsRef<Path>>(geometry: &Geometry, file_path: P) -> Result<()> {
    write_ports_csv(geometry, File::create(file_path)?)
}
