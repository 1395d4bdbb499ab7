// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! GEO block encoder
//!
//! Walks the recorded layout and regenerates each structured section in
//! place. Unmodeled lines are written back verbatim.

use super::{
    Geometry, PlaneAnchor, Polygon, Port, PortKind, ReferencePlane, Slot, Substrate, ViaRegion,
};

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// BOX line plus one indented line per dielectric layer
pub fn substrate_lines(substrate: &Substrate) -> Vec<String> {
    let r = &substrate.record;
    // The level count always follows the layer list
    let levels = substrate.layers.len() as i64 - 1;
    let mut lines = vec![format!(
        "BOX {} {} {} {} {} {} {}",
        levels, r.x_width, r.y_width, r.x_cells2, r.y_cells2, r.reserved, r.eeff
    )];

    for layer in &substrate.layers {
        let mut line = format!(
            "{}{} {} \"{}\"",
            substrate.indent,
            join_numbers(&[
                layer.thickness,
                layer.erel,
                layer.mrel,
                layer.eloss,
                layer.mloss,
                layer.esigma
            ]),
            layer.nzpart,
            layer.name
        );
        if !layer.extra.is_empty() {
            line.push(' ');
            line.push_str(&join_numbers(&layer.extra));
        }
        lines.push(line);
    }
    lines
}

pub fn plane_lines(plane: &ReferencePlane) -> Vec<String> {
    match &plane.anchor {
        PlaneAnchor::Link {
            polygon,
            points,
            vertex,
        } => vec![
            format!("DRP1 {} LINK", plane.wall),
            format!("POLY {polygon} {points}"),
            vertex.to_string(),
        ],
        PlaneAnchor::Fix { length } => vec![format!("DRP1 {} FIX {length}", plane.wall)],
        PlaneAnchor::None { trailing } => {
            let mut line = format!("DRP1 {} NONE", plane.wall);
            for token in trailing {
                line.push(' ');
                line.push_str(token);
            }
            vec![line]
        }
    }
}

pub fn port_lines(port: &Port) -> Vec<String> {
    let head = match &port.kind {
        PortKind::Cup(cup) if !cup.calib_group.is_empty() => {
            format!("POR1 CUP {}", cup.calib_group)
        }
        kind => format!("POR1 {}", kind.keyword()),
    };

    let mut params = format!(
        "{} {}",
        port.number,
        join_numbers(&[
            port.resistance,
            port.reactance,
            port.inductance,
            port.capacitance,
            port.x,
            port.y
        ])
    );
    if let PortKind::Agnd(calibration) = &port.kind {
        params.push(' ');
        params.push_str(&calibration.calib_type);
        for value in [&calibration.plane_length, &calibration.calib_length]
            .into_iter()
            .flatten()
        {
            params.push(' ');
            params.push_str(value);
        }
    }
    for token in &port.extra {
        params.push(' ');
        params.push_str(token);
    }

    let mut lines = vec![
        head,
        format!("POLY {} {}", port.polygon, port.points),
        port.vertex.to_string(),
        params,
    ];

    if let PortKind::Cup(cup) = &port.kind {
        if let Some((group, group_type)) = &cup.group {
            lines.push(format!("CUPGRP {group} {group_type}"));
        }
        if let Some(id) = cup.id {
            lines.push(format!("ID {id}"));
        }
        if let Some(ground_ref) = &cup.ground_ref {
            lines.push(format!("GRNDREF {ground_ref}"));
        }
        if let Some(tw_type) = &cup.tw_type {
            lines.push(format!("TWTYPE {tw_type}"));
        }
    }
    lines
}

pub fn polygon_lines(polygon: &Polygon) -> Vec<String> {
    let header = &polygon.header;
    let mut head = format!(
        "{} {} {} {} {}",
        header.level,
        polygon.vertex_count(),
        header.metal_type,
        header.fill,
        header.id
    );
    for token in &header.extra {
        head.push(' ');
        head.push_str(token);
    }

    let mut lines = vec![head];
    if let Some(tech) = &header.tech_layer {
        let inherit = if tech.inherit { "INH" } else { "NOH" };
        lines.push(format!("TLAYNAM {} {inherit}", tech.name));
    }
    lines.extend(polygon.ring.iter().map(|(x, y)| format!("{x} {y}")));
    lines.push("END".to_string());
    lines
}

/// NUM line, modeled polygons, then via regions verbatim
pub fn polygon_section_lines(polygons: &[Polygon], vias: &[ViaRegion]) -> Vec<String> {
    let mut lines = vec![format!("NUM {}", polygons.len() + vias.len())];
    for polygon in polygons {
        lines.extend(polygon_lines(polygon));
    }
    for via in vias {
        lines.extend(via.lines.iter().cloned());
    }
    lines
}

impl Geometry {
    /// Regenerate GEO block text
    pub fn encode(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for slot in &self.layout {
            match slot {
                Slot::Line(line) => lines.push(line.clone()),
                Slot::Substrate => lines.extend(substrate_lines(&self.substrate)),
                Slot::Planes => {
                    for plane in &self.planes {
                        lines.extend(plane_lines(plane));
                    }
                }
                Slot::Ports => {
                    for port in &self.ports {
                        lines.extend(port_lines(port));
                    }
                }
                Slot::Polygons => lines.extend(polygon_section_lines(&self.polygons, &self.vias)),
            }
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{AgndCalibration, PolygonHeader, TechLayer, Wall};

    #[test]
    fn test_polygon_lines_with_tech_layer() {
        let mut header = PolygonHeader::metal(0, None, 4);
        header.tech_layer = Some(TechLayer {
            name: "Top".to_string(),
            inherit: false,
        });
        let polygon = Polygon::new(header, vec![(0.0, 0.0), (2.5, 0.0), (2.5, 1.0)]);
        assert_eq!(
            polygon_lines(&polygon),
            vec![
                "0 4 -1 N 4 1 1 100 100 0 0 0 Y",
                "TLAYNAM Top NOH",
                "0 0",
                "2.5 0",
                "2.5 1",
                "0 0",
                "END"
            ]
        );
    }

    #[test]
    fn test_agnd_port_lines() {
        let port = Port {
            kind: PortKind::Agnd(AgndCalibration {
                calib_type: "FIXED".to_string(),
                plane_length: Some("12".to_string()),
                calib_length: None,
            }),
            polygon: 2,
            points: 1,
            vertex: 0,
            number: 3,
            resistance: 50.0,
            reactance: 0.0,
            inductance: 0.0,
            capacitance: 0.0,
            x: 0.0,
            y: 40.5,
            extra: Vec::new(),
        };
        assert_eq!(
            port_lines(&port),
            vec!["POR1 AGND", "POLY 2 1", "0", "3 50 0 0 0 0 40.5 FIXED 12"]
        );
    }

    #[test]
    fn test_plane_lines() {
        let plane = ReferencePlane {
            wall: Wall::Right,
            anchor: PlaneAnchor::Fix { length: 12.5 },
        };
        assert_eq!(plane_lines(&plane), vec!["DRP1 RIGHT FIX 12.5"]);
    }
}
