// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! POR1 record parser
//!
//! Every port starts with `POR1 <kind>` followed by a `POLY` line, the edge
//! vertex and the electrical parameter line. AGND ports carry calibration
//! fields on the parameter line; CUP ports may be followed by `CUPGRP`,
//! `ID`, `GRNDREF` and `TWTYPE` lines.

use super::common::{field, next_content_line, parse_poly_ref, starts_with_keyword, tokens};
use super::GeoRecordParser;
use crate::error::{Result, SonError};
use crate::geo::{AgndCalibration, CupFields, Port, PortKind};

/// Fields shared by every port kind
struct PortBody {
    port: Port,
    /// Parameter line tokens after the position
    trailing: Vec<String>,
    next: usize,
}

fn required_line(lines: &[&str], from: usize, start: usize, what: &str) -> Result<usize> {
    next_content_line(lines, from)
        .ok_or_else(|| SonError::at_line(start, format!("port record ends before its {what}")))
}

fn parse_body(lines: &[&str], start: usize, kind: PortKind) -> Result<PortBody> {
    let poly_index = required_line(lines, start + 1, start, "POLY line")?;
    let (polygon, points) = parse_poly_ref(&tokens(lines[poly_index]), poly_index)?;

    let vertex_index = required_line(lines, poly_index + 1, start, "vertex line")?;
    let vertex = field(&tokens(lines[vertex_index]), 0, "vertex index", vertex_index)?;

    let param_index = required_line(lines, vertex_index + 1, start, "parameter line")?;
    let parts = tokens(lines[param_index]);
    let port = Port {
        kind,
        polygon,
        points,
        vertex,
        number: field(&parts, 0, "port number", param_index)?,
        resistance: field(&parts, 1, "resistance", param_index)?,
        reactance: field(&parts, 2, "reactance", param_index)?,
        inductance: field(&parts, 3, "inductance", param_index)?,
        capacitance: field(&parts, 4, "capacitance", param_index)?,
        x: field(&parts, 5, "x position", param_index)?,
        y: field(&parts, 6, "y position", param_index)?,
        extra: Vec::new(),
    };

    Ok(PortBody {
        port,
        trailing: parts.iter().skip(7).map(|s| s.to_string()).collect(),
        next: param_index + 1,
    })
}

fn parse_simple(lines: &[&str], start: usize, kind: PortKind) -> Result<(Port, usize)> {
    let mut body = parse_body(lines, start, kind)?;
    if !body.trailing.is_empty() {
        log::debug!(
            "[INFO] Line {}: keeping extra port fields {:?}",
            start + 1,
            body.trailing
        );
    }
    body.port.extra = body.trailing;
    Ok((body.port, body.next))
}

fn parse_agnd(lines: &[&str], start: usize) -> Result<(Port, usize)> {
    let mut body = parse_body(lines, start, PortKind::Std)?;
    let mut trailing = body.trailing.into_iter();
    body.port.kind = PortKind::Agnd(AgndCalibration {
        calib_type: trailing.next().unwrap_or_else(|| "NONE".to_string()),
        plane_length: trailing.next(),
        calib_length: trailing.next(),
    });
    body.port.extra = trailing.collect();
    Ok((body.port, body.next))
}

fn parse_cup(lines: &[&str], start: usize, calib_group: &str) -> Result<(Port, usize)> {
    let body = parse_body(lines, start, PortKind::Std)?;
    let mut port = body.port;
    port.extra = body.trailing;
    let mut cup = CupFields {
        calib_group: calib_group.to_string(),
        ..CupFields::default()
    };

    let mut next = body.next;
    while let Some(index) = next_content_line(lines, next) {
        let parts = tokens(lines[index]);
        match parts[0] {
            "CUPGRP" => {
                cup.group = Some((
                    field(&parts, 1, "CUP group", index)?,
                    field(&parts, 2, "CUP group type", index)?,
                ))
            }
            "ID" => cup.id = Some(field(&parts, 1, "CUP id", index)?),
            "GRNDREF" => cup.ground_ref = Some(field(&parts, 1, "ground reference", index)?),
            "TWTYPE" => cup.tw_type = Some(field(&parts, 1, "TW type", index)?),
            _ => break,
        }
        next = index + 1;
    }

    port.kind = PortKind::Cup(cup);
    Ok((port, next))
}

pub struct PortParser;

impl GeoRecordParser for PortParser {
    type Item = Port;

    fn matches(&self, line: &str) -> bool {
        starts_with_keyword(line, "POR1")
    }

    fn parse(&self, lines: &[&str], start: usize) -> Result<(Port, usize)> {
        let head = tokens(lines[start]);
        match head.get(1).copied() {
            Some("STD") => parse_simple(lines, start, PortKind::Std),
            Some("BOX") => parse_simple(lines, start, PortKind::Box),
            Some("AGND") => parse_agnd(lines, start),
            Some("CUP") => parse_cup(lines, start, head.get(2).copied().unwrap_or("")),
            Some(other) => Err(SonError::at_line(
                start,
                format!("unknown port kind {other}"),
            )),
            None => Err(SonError::at_line(start, "POR1 without a port kind")),
        }
    }

    fn item_name() -> &'static str {
        "POR1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_port() {
        let lines = vec!["POR1 STD", "POLY 7 1", "2", "1 50 0 0 0 20 80", "NUM 0"];
        let (port, next) = PortParser.parse(&lines, 0).unwrap();
        assert_eq!(next, 4);
        assert_eq!(port.kind, PortKind::Std);
        assert_eq!(port.polygon, 7);
        assert_eq!(port.vertex, 2);
        assert_eq!(port.number, 1);
        assert_eq!(port.resistance, 50.0);
        assert_eq!((port.x, port.y), (20.0, 80.0));
    }

    #[test]
    fn test_agnd_port_calibration() {
        let lines = vec!["POR1 AGND", "POLY 3 1", "0", "2 50 0 0 0 0 40 FIXED 12.5 3"];
        let (port, _) = PortParser.parse(&lines, 0).unwrap();
        assert_eq!(
            port.kind,
            PortKind::Agnd(AgndCalibration {
                calib_type: "FIXED".to_string(),
                plane_length: Some("12.5".to_string()),
                calib_length: Some("3".to_string()),
            })
        );

        let lines = vec!["POR1 AGND", "POLY 3 1", "0", "2 50 0 0 0 0 40"];
        let (port, _) = PortParser.parse(&lines, 0).unwrap();
        assert!(matches!(port.kind, PortKind::Agnd(ref c) if c.calib_type == "NONE"));
    }

    #[test]
    fn test_cup_port_optional_lines() {
        let lines = vec![
            "POR1 CUP \"A\"",
            "POLY 4 1",
            "1",
            "3 50 0 0 0 10 10",
            "CUPGRP \"A\" TERM",
            "ID 9",
            "GRNDREF FLOAT",
            "POR1 STD",
        ];
        let (port, next) = PortParser.parse(&lines, 0).unwrap();
        assert_eq!(next, 7);
        let PortKind::Cup(cup) = port.kind else {
            panic!("expected a CUP port");
        };
        assert_eq!(cup.calib_group, "\"A\"");
        assert_eq!(cup.group, Some(("\"A\"".to_string(), "TERM".to_string())));
        assert_eq!(cup.id, Some(9));
        assert_eq!(cup.ground_ref.as_deref(), Some("FLOAT"));
        assert_eq!(cup.tw_type, None);
    }

    #[test]
    fn test_extra_parameter_fields_kept() {
        let lines = vec!["POR1 BOX", "POLY 7 1", "2", "1 50 0 0 0 20 80 7 Q"];
        let (port, _) = PortParser.parse(&lines, 0).unwrap();
        assert_eq!(port.kind, PortKind::Box);
        assert_eq!(port.extra, vec!["7".to_string(), "Q".to_string()]);

        let lines = vec!["POR1 AGND", "POLY 3 1", "0", "2 50 0 0 0 0 40 FIXED 12.5 3 X"];
        let (port, _) = PortParser.parse(&lines, 0).unwrap();
        assert_eq!(port.extra, vec!["X".to_string()]);
    }

    #[test]
    fn test_truncated_port_is_format_error() {
        let lines = vec!["POR1 STD", "POLY 7 1", "2"];
        assert!(matches!(
            PortParser.parse(&lines, 0),
            Err(SonError::Format(_))
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let lines = vec!["POR1 WEIRD"];
        assert!(PortParser.parse(&lines, 0).is_err());
    }
}
