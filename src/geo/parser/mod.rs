// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! GEO block decoder
//!
//! Each record kind (substrate, reference plane, port, polygon section) has
//! its own parser with a fixed schema. The top-level loop only dispatches on
//! the keyword that opens a record; every other line is kept verbatim.

pub mod common;
pub mod plane;
pub mod polygon;
pub mod port;
pub mod substrate;

use super::{Geometry, Slot};
use crate::error::{Result, SonError};

pub use plane::PlaneParser;
pub use polygon::{PolygonSection, PolygonSectionParser};
pub use port::PortParser;
pub use substrate::SubstrateParser;

/// Parser for one kind of GEO record
pub trait GeoRecordParser {
    /// The type of record this parser produces
    type Item;

    /// Whether `line` opens a record of this kind
    fn matches(&self, line: &str) -> bool;

    /// Parse the record opened at `start`
    ///
    /// Returns the record and the index of the first line after it.
    fn parse(&self, lines: &[&str], start: usize) -> Result<(Self::Item, usize)>;

    /// Get the name of this record type for diagnostics
    fn item_name() -> &'static str;
}

impl Geometry {
    /// Decode GEO block text
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let mut layout = Vec::new();
        let mut substrate = None;
        let mut planes = Vec::new();
        let mut ports = Vec::new();
        let mut section: Option<PolygonSection> = None;

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];

            if substrate.is_none() && SubstrateParser.matches(line) {
                let (record, next) = SubstrateParser.parse(&lines, i)?;
                layout.push(Slot::Substrate);
                substrate = Some(record);
                i = next;
            } else if PlaneParser.matches(line) {
                let (plane, next) = PlaneParser.parse(&lines, i)?;
                if !layout.contains(&Slot::Planes) {
                    layout.push(Slot::Planes);
                }
                planes.push(plane);
                i = next;
            } else if PortParser.matches(line) {
                let (port, next) = PortParser.parse(&lines, i)?;
                if !layout.contains(&Slot::Ports) {
                    layout.push(Slot::Ports);
                }
                ports.push(port);
                i = next;
            } else if PolygonSectionParser.matches(line) {
                // The polygon section runs to the end of the block
                let (parsed, _) = PolygonSectionParser.parse(&lines, i)?;
                layout.push(Slot::Polygons);
                section = Some(parsed);
                break;
            } else {
                layout.push(Slot::Line(line.to_string()));
                i += 1;
            }
        }

        let substrate = substrate.ok_or_else(|| {
            SonError::Format(format!(
                "missing {} marker line",
                SubstrateParser::item_name()
            ))
        })?;
        let section = section.ok_or_else(|| {
            SonError::Format(format!(
                "missing {} polygon count marker line",
                PolygonSectionParser::item_name()
            ))
        })?;

        log::debug!(
            "[INFO] GEO: {} layers, {} planes, {} ports, {} polygons, {} via regions",
            substrate.layers.len(),
            planes.len(),
            ports.len(),
            section.polygons.len(),
            section.vias.len()
        );

        Ok(Geometry {
            layout,
            substrate,
            planes,
            ports,
            polygons: section.polygons,
            vias: section.vias,
        })
    }
}
