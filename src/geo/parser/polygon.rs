// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Polygon section parser
//!
//! The section starts at `NUM <count>` and runs to the end of the block.
//! Lines are classified by token count: more than three tokens start a
//! polygon header, three tokens carry the tech layer, two tokens are a
//! vertex and `END` closes the polygon. A `VIA POLYGON` line opens a via
//! region that is kept as raw lines up to its `END`.

use super::common::{field, starts_with_keyword, tokens};
use super::GeoRecordParser;
use crate::error::{Result, SonError};
use crate::geo::{Polygon, PolygonHeader, TechLayer, Vertex, ViaRegion};

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSection {
    /// Count written on the NUM line
    pub declared: usize,
    pub polygons: Vec<Polygon>,
    pub vias: Vec<ViaRegion>,
}

/// Polygon being accumulated
struct PolygonContext {
    header: PolygonHeader,
    declared_vertices: usize,
    ring: Vec<Vertex>,
    line: usize,
}

impl PolygonContext {
    fn from_header(parts: &[&str], line: usize) -> Result<Self> {
        Ok(Self {
            header: PolygonHeader {
                level: field(parts, 0, "metalization level", line)?,
                metal_type: field(parts, 2, "metal type", line)?,
                fill: field(parts, 3, "fill type", line)?,
                id: field(parts, 4, "polygon id", line)?,
                extra: parts.iter().skip(5).map(|s| s.to_string()).collect(),
                tech_layer: None,
            },
            declared_vertices: field(parts, 1, "vertex count", line)?,
            ring: Vec::new(),
            line,
        })
    }

    fn finalize(self) -> Result<Polygon> {
        let id = self.header.id;
        if self.ring.len() < 3 {
            return Err(SonError::at_line(
                self.line,
                format!("polygon {id} has {} vertices", self.ring.len()),
            ));
        }
        let open = self.ring.first() != self.ring.last();
        let polygon = Polygon::new(self.header, self.ring);
        if open {
            log::warn!("[WARN] Line {}: closed open ring of polygon {id}", self.line + 1);
        }
        if polygon.vertex_count() != self.declared_vertices {
            log::warn!(
                "[WARN] Line {}: polygon {id} declares {} vertices, ring has {}",
                self.line + 1,
                self.declared_vertices,
                polygon.vertex_count()
            );
        }
        Ok(polygon)
    }
}

fn parse_inherit(token: &str, line: usize) -> Result<bool> {
    match token {
        "INH" => Ok(true),
        "NOH" => Ok(false),
        other => Err(SonError::at_line(
            line,
            format!("expected INH or NOH, found {other}"),
        )),
    }
}

pub struct PolygonSectionParser;

impl GeoRecordParser for PolygonSectionParser {
    type Item = PolygonSection;

    fn matches(&self, line: &str) -> bool {
        starts_with_keyword(line, "NUM") && tokens(line).len() == 2
    }

    fn parse(&self, lines: &[&str], start: usize) -> Result<(PolygonSection, usize)> {
        let declared = field(&tokens(lines[start]), 1, "polygon count", start)?;
        let mut polygons = Vec::new();
        let mut vias = Vec::new();
        let mut current: Option<PolygonContext> = None;
        let mut via: Option<Vec<String>> = None;

        for (i, line) in lines.iter().enumerate().skip(start + 1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(region) = via.as_mut() {
                region.push(line.to_string());
                if trimmed == "END" {
                    if let Some(lines) = via.take() {
                        vias.push(ViaRegion { lines });
                    }
                }
                continue;
            }

            if trimmed == "VIA POLYGON" {
                if let Some(context) = current.take() {
                    polygons.push(context.finalize()?);
                }
                via = Some(vec![line.to_string()]);
                continue;
            }

            let parts = tokens(line);
            match parts.len() {
                n if n > 3 => {
                    if let Some(context) = current.take() {
                        polygons.push(context.finalize()?);
                    }
                    current = Some(PolygonContext::from_header(&parts, i)?);
                }
                3 => {
                    let context = current.as_mut().ok_or_else(|| {
                        SonError::at_line(i, "tech layer line outside a polygon")
                    })?;
                    context.header.tech_layer = Some(TechLayer {
                        name: parts[1].to_string(),
                        inherit: parse_inherit(parts[2], i)?,
                    });
                }
                2 => {
                    let context = current
                        .as_mut()
                        .ok_or_else(|| SonError::at_line(i, "vertex outside a polygon"))?;
                    let x: f64 = field(&parts, 0, "x coordinate", i)?;
                    let y: f64 = field(&parts, 1, "y coordinate", i)?;
                    context.ring.push((x, y));
                }
                _ if trimmed == "END" => {
                    if let Some(context) = current.take() {
                        polygons.push(context.finalize()?);
                    }
                }
                _ => {
                    log::warn!("[WARN] Line {}: ignoring '{trimmed}' in polygon section", i + 1);
                }
            }
        }

        // End of input closes whatever is still open
        if let Some(context) = current.take() {
            polygons.push(context.finalize()?);
        }
        if let Some(lines) = via.take() {
            vias.push(ViaRegion { lines });
        }

        if polygons.len() + vias.len() != declared {
            log::warn!(
                "[WARN] NUM declares {declared} polygons, found {} (+{} via)",
                polygons.len(),
                vias.len()
            );
        }

        Ok((
            PolygonSection {
                declared,
                polygons,
                vias,
            },
            lines.len(),
        ))
    }

    fn item_name() -> &'static str {
        "NUM"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygons_with_tech_layer() {
        let lines = vec![
            "NUM 2",
            "0 5 -1 N 7 1 1 100 100 0 0 0 Y",
            "TLAYNAM Metal1 INH",
            "10 10",
            "30 10",
            "30 30",
            "10 30",
            "10 10",
            "END",
            "1 4 -1 N 9 1 1 100 100 0 0 0 Y",
            "0 0",
            "5 0",
            "5 5",
            "END",
        ];
        let (section, next) = PolygonSectionParser.parse(&lines, 0).unwrap();
        assert_eq!(next, lines.len());
        assert_eq!(section.declared, 2);
        assert_eq!(section.polygons.len(), 2);

        let first = &section.polygons[0];
        assert_eq!(first.id(), 7);
        assert_eq!(first.header.level, 0);
        assert_eq!(first.header.metal_type, "-1");
        assert_eq!(
            first.header.tech_layer,
            Some(TechLayer {
                name: "Metal1".to_string(),
                inherit: true
            })
        );
        assert_eq!(first.vertex_count(), 5);

        // Ring closed on decode
        let second = &section.polygons[1];
        assert_eq!(second.ring.first(), second.ring.last());
        assert_eq!(second.vertex_count(), 4);
        assert_eq!(second.header.tech_layer, None);
    }

    #[test]
    fn test_unterminated_polygon_is_closed_implicitly() {
        let lines = vec!["NUM 1", "0 4 -1 N 1 1 1 100 100 0 0 0 Y", "0 0", "1 0", "1 1"];
        let (section, _) = PolygonSectionParser.parse(&lines, 0).unwrap();
        assert_eq!(section.polygons.len(), 1);
        assert!(section.polygons[0].is_closed());
    }

    #[test]
    fn test_via_region_kept_raw() {
        let lines = vec![
            "NUM 2",
            "VIA POLYGON",
            "0 5 -1 V 20 1 1 100 100 0 0 0 Y",
            "TOLEVEL 1 RING COVERS",
            "0 0",
            "1 0",
            "1 1",
            "0 1",
            "0 0",
            "END",
            "0 5 -1 N 3 1 1 100 100 0 0 0 Y",
            "0 0",
            "2 0",
            "2 2",
            "0 2",
            "0 0",
            "END",
        ];
        let (section, _) = PolygonSectionParser.parse(&lines, 0).unwrap();
        assert_eq!(section.vias.len(), 1);
        assert_eq!(section.vias[0].lines.len(), 9);
        assert_eq!(section.vias[0].lines[0], "VIA POLYGON");
        assert_eq!(section.polygons.len(), 1);
        assert_eq!(section.polygons[0].id(), 3);
    }

    #[test]
    fn test_vertex_before_header() {
        let lines = vec!["NUM 1", "0 0"];
        assert!(PolygonSectionParser.parse(&lines, 0).is_err());
    }
}
