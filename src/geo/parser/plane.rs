// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! DRP1 (distributed reference plane) parser

use super::common::{field, next_content_line, parse_poly_ref, starts_with_keyword, tokens};
use super::GeoRecordParser;
use crate::error::{Result, SonError};
use crate::geo::{PlaneAnchor, ReferencePlane, Wall};

pub struct PlaneParser;

impl GeoRecordParser for PlaneParser {
    type Item = ReferencePlane;

    fn matches(&self, line: &str) -> bool {
        starts_with_keyword(line, "DRP1")
    }

    fn parse(&self, lines: &[&str], start: usize) -> Result<(ReferencePlane, usize)> {
        let head = tokens(lines[start]);
        let wall: Wall = head
            .get(1)
            .ok_or_else(|| SonError::at_line(start, "DRP1 without a direction"))?
            .parse()
            .map_err(|e: SonError| SonError::at_line(start, e.to_string()))?;

        match head.get(2).copied() {
            Some("LINK") => {
                let poly_index = next_content_line(lines, start + 1)
                    .ok_or_else(|| SonError::at_line(start, "LINK plane without POLY line"))?;
                let (polygon, points) = parse_poly_ref(&tokens(lines[poly_index]), poly_index)?;
                let vertex_index = next_content_line(lines, poly_index + 1)
                    .ok_or_else(|| SonError::at_line(start, "LINK plane without vertex line"))?;
                let vertex = field(&tokens(lines[vertex_index]), 0, "vertex index", vertex_index)?;
                Ok((
                    ReferencePlane {
                        wall,
                        anchor: PlaneAnchor::Link {
                            polygon,
                            points,
                            vertex,
                        },
                    },
                    vertex_index + 1,
                ))
            }
            Some("FIX") => {
                let length = field(&head, 3, "plane length", start)?;
                Ok((
                    ReferencePlane {
                        wall,
                        anchor: PlaneAnchor::Fix { length },
                    },
                    start + 1,
                ))
            }
            Some("NONE") => Ok((
                ReferencePlane {
                    wall,
                    anchor: PlaneAnchor::None {
                        trailing: head.iter().skip(3).map(|s| s.to_string()).collect(),
                    },
                },
                start + 1,
            )),
            Some(other) => Err(SonError::at_line(
                start,
                format!("unknown reference plane type {other}"),
            )),
            None => Err(SonError::at_line(start, "DRP1 without a plane type")),
        }
    }

    fn item_name() -> &'static str {
        "DRP1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_plane() {
        let lines = vec!["DRP1 LEFT LINK", "POLY 12 1", "3", "POR1 STD"];
        let (plane, next) = PlaneParser.parse(&lines, 0).unwrap();
        assert_eq!(next, 3);
        assert_eq!(plane.wall, Wall::Left);
        assert_eq!(
            plane.anchor,
            PlaneAnchor::Link {
                polygon: 12,
                points: 1,
                vertex: 3
            }
        );
    }

    #[test]
    fn test_fix_plane() {
        let lines = vec!["DRP1 TOP FIX 25.5"];
        let (plane, next) = PlaneParser.parse(&lines, 0).unwrap();
        assert_eq!(next, 1);
        assert_eq!(plane.wall, Wall::Top);
        assert_eq!(plane.anchor, PlaneAnchor::Fix { length: 25.5 });
    }

    #[test]
    fn test_bad_direction() {
        let lines = vec!["DRP1 NORTH FIX 1"];
        assert!(matches!(
            PlaneParser.parse(&lines, 0),
            Err(SonError::Format(msg)) if msg.starts_with("Line 1")
        ));
    }
}
