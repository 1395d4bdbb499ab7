// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Crop: clip every polygon to a rectangular window

use ::geo::{Area, BooleanOps, Coord, LineString, Polygon as GeoPolygon, Rect};
use std::collections::{HashMap, HashSet};

use super::coords::{fix_ring, fix_vertex};
use super::ids::IdAllocator;
use crate::error::{Result, SonError};
use crate::geo::{Geometry, PlaneAnchor, Polygon, PolygonId, Vertex};

/// What a crop did to the polygon list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropReport {
    /// Polygons entirely outside the window
    pub dropped: Vec<PolygonId>,
    /// Polygons split into several fragments: original id, ids of the extra fragments
    pub split: Vec<(PolygonId, Vec<PolygonId>)>,
}

/// Convert a ring to a `geo` polygon without holes
pub(crate) fn to_geo_polygon(ring: &[Vertex]) -> GeoPolygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|&(x, y)| Coord { x, y }).collect();
    GeoPolygon::new(LineString::from(coords), vec![])
}

fn snap(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let snapped = (value * factor).round() / factor;
    // Avoid writing "-0"
    if snapped == 0.0 {
        0.0
    } else {
        snapped
    }
}

/// Translate a clipped exterior ring, snap it and drop repeated vertices
fn fragment_ring(exterior: &LineString<f64>, origin: Vertex, decimals: u32) -> Vec<Vertex> {
    let mut ring: Vec<Vertex> = Vec::with_capacity(exterior.0.len());
    for c in exterior.coords() {
        let v = (
            snap(c.x - origin.0, decimals),
            snap(c.y - origin.1, decimals),
        );
        if ring.last() != Some(&v) {
            ring.push(v);
        }
    }
    ring
}

/// A kept polygon before and after clipping, in window coordinates (y up)
struct Clipped {
    /// Ring before clipping, translated like the fragments
    before: Vec<Vertex>,
    /// Index into the kept polygons and the fragment ring
    pieces: Vec<(usize, Vec<Vertex>)>,
}

/// Point `p` lies on segment `a`-`b` within `tolerance`
fn on_segment(p: Vertex, (a, b): (Vertex, Vertex), tolerance: f64) -> bool {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length = dx.hypot(dy);
    if length <= tolerance {
        return (p.0 - a.0).hypot(p.1 - a.1) <= tolerance;
    }
    let (px, py) = (p.0 - a.0, p.1 - a.1);
    let offset = (px * dy - py * dx) / length;
    let along = (px * dx + py * dy) / length;
    offset.abs() <= tolerance && along >= -tolerance && along <= length + tolerance
}

impl Clipped {
    /// Fragment edge covering part of edge `vertex` of the unclipped ring:
    /// polygon index, edge index and the edge itself
    fn locate(&self, vertex: usize, tolerance: f64) -> Option<(usize, usize, (Vertex, Vertex))> {
        let old = (*self.before.get(vertex)?, *self.before.get(vertex + 1)?);
        self.pieces.iter().find_map(|(index, ring)| {
            ring.windows(2)
                .position(|w| {
                    w[0] != w[1] && on_segment(w[0], old, tolerance) && on_segment(w[1], old, tolerance)
                })
                .map(|i| (*index, i, (ring[i], ring[i + 1])))
        })
    }
}

/// Move ports and LINK planes of clipped polygons onto the matching fragment
/// edge; references whose edge was cut away are dropped
fn relocate_references(
    geometry: &mut Geometry,
    clipped: &HashMap<PolygonId, Clipped>,
    tolerance: f64,
) {
    let height = geometry.box_height();
    let ids: Vec<PolygonId> = geometry.polygons.iter().map(Polygon::id).collect();

    geometry.ports.retain_mut(|port| {
        let Some(clip) = clipped.get(&port.polygon) else {
            return true;
        };
        match clip.locate(port.vertex, tolerance) {
            Some((index, edge, (a, b))) => {
                let (x, y) = fix_vertex(((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0), height);
                port.polygon = ids[index];
                port.vertex = edge;
                port.x = x;
                port.y = y;
                true
            }
            None => {
                log::warn!(
                    "[WARN] Dropped port {}: edge {} of polygon {} lies outside the crop window",
                    port.number,
                    port.vertex,
                    port.polygon
                );
                false
            }
        }
    });

    geometry.planes.retain_mut(|plane| {
        let wall = plane.wall;
        let PlaneAnchor::Link {
            polygon, vertex, ..
        } = &mut plane.anchor
        else {
            return true;
        };
        let (id, old) = (*polygon, *vertex);
        let Some(clip) = clipped.get(&id) else {
            return true;
        };
        match clip.locate(old, tolerance) {
            Some((index, edge, _)) => {
                *polygon = ids[index];
                *vertex = edge;
                true
            }
            None => {
                log::warn!(
                    "[WARN] Dropped {wall} reference plane: edge {old} of polygon {id} lies outside the crop window"
                );
                false
            }
        }
    });
}

/// Clip every polygon to the window `(x1, y1)`-`(x2, y2)` given in API coordinates
///
/// Polygons outside the window are dropped, the rest are translated so the
/// window's lower-left corner becomes the origin. A polygon cut into several
/// pieces keeps its id on the first piece; the others get fresh ids. Ports
/// and LINK reference planes follow their edge onto the fragment that still
/// holds part of it, and are dropped when none does. The box itself is not
/// resized.
pub fn crop(
    geometry: &mut Geometry,
    (x1, y1, x2, y2): (f64, f64, f64, f64),
    ids: &mut IdAllocator,
    snap_decimals: u32,
) -> Result<CropReport> {
    if geometry.has_vias() {
        return Err(SonError::Unsupported(
            "crop cannot clip via polygons".to_string(),
        ));
    }
    let window = Rect::new(Coord { x: x1, y: y1 }, Coord { x: x2, y: y2 });
    if window.width() <= 0.0 || window.height() <= 0.0 {
        return Err(SonError::InvalidEdit(format!(
            "crop window ({x1}, {y1})-({x2}, {y2}) has no area"
        )));
    }
    let origin = (window.min().x, window.min().y);
    let window = window.to_polygon();
    let height = geometry.box_height();

    let mut report = CropReport::default();
    let mut kept: Vec<Polygon> = Vec::new();
    let mut fragments: Vec<(PolygonId, usize)> = Vec::new();
    let mut clipped: HashMap<PolygonId, Clipped> = HashMap::new();

    for polygon in &geometry.polygons {
        let public = fix_ring(&polygon.ring, height);
        let shape = to_geo_polygon(&public);
        let pieces: Vec<Vec<Vertex>> = shape
            .intersection(&window)
            .into_iter()
            .filter(|piece| piece.unsigned_area() > 0.0)
            .map(|piece| fragment_ring(piece.exterior(), origin, snap_decimals))
            .filter(|ring| ring.len() >= 4)
            .collect();

        if pieces.is_empty() {
            report.dropped.push(polygon.id());
            continue;
        }
        let mut clip = Clipped {
            before: public
                .iter()
                .map(|&(x, y)| (x - origin.0, y - origin.1))
                .collect(),
            pieces: Vec::with_capacity(pieces.len()),
        };
        for (k, ring) in pieces.into_iter().enumerate() {
            let file_ring = ring.iter().map(|&v| fix_vertex(v, height)).collect();
            kept.push(Polygon::new(polygon.header.clone(), file_ring));
            clip.pieces.push((kept.len() - 1, ring));
            if k > 0 {
                fragments.push((polygon.id(), kept.len() - 1));
            }
        }
        clipped.insert(polygon.id(), clip);
    }

    let mut taken: HashSet<PolygonId> = kept.iter().map(Polygon::id).collect();
    for (original, index) in fragments {
        let id = ids.allocate(&taken);
        taken.insert(id);
        kept[index].header.id = id;
        match report.split.iter_mut().find(|(o, _)| *o == original) {
            Some((_, extra)) => extra.push(id),
            None => report.split.push((original, vec![id])),
        }
    }

    log::info!(
        "[INFO] Crop kept {} polygons, dropped {}, split {}",
        kept.len(),
        report.dropped.len(),
        report.split.len()
    );

    geometry.polygons = kept;
    geometry.drop_references(&report.dropped.iter().copied().collect());
    let tolerance = 10f64.powi(-(snap_decimals as i32)).max(1e-9);
    relocate_references(geometry, &clipped, tolerance);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap() {
        assert_eq!(snap(19.999_999_999, 6), 20.0);
        assert_eq!(snap(-0.000_000_1, 6), 0.0);
        assert_eq!(snap(1.234_567_8, 3), 1.235);
    }

    #[test]
    fn test_on_segment() {
        let edge = ((0.0, 0.0), (10.0, 0.0));
        assert!(on_segment((5.0, 0.0), edge, 1e-6));
        assert!(on_segment((10.0, 0.0), edge, 1e-6));
        assert!(!on_segment((11.0, 0.0), edge, 1e-6));
        assert!(!on_segment((5.0, 0.1), edge, 1e-6));
    }

    #[test]
    fn test_fragment_ring_translates_and_dedupes() {
        let ring = LineString::from(vec![(5.0, 5.0), (5.0, 5.0), (7.0, 5.0), (7.0, 8.0), (5.0, 5.0)]);
        assert_eq!(
            fragment_ring(&ring, (5.0, 5.0), 6),
            vec![(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (0.0, 0.0)]
        );
    }
}
