// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Feed-line synthesis
//!
//! A feed line is a rectangular strip running from a polygon edge out to a
//! box wall, with a standard port on its outer edge. All geometry here is
//! done in API coordinates (y up) and converted back at the end.

use ::geo::{Contains, Point};

use super::coords::{fix_ring, fix_vertex};
use super::crop::to_geo_polygon;
use super::ids::IdAllocator;
use crate::config::FeedLineSettings;
use crate::error::{Result, SonError};
use crate::geo::{
    Geometry, PlaneAnchor, Polygon, PolygonHeader, PolygonId, Port, PortKind, ReferencePlane,
    Vertex, Wall,
};

const EPSILON: f64 = 1e-9;

/// Outcome of a feed-line synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct FeedLine {
    /// The strip, or the source polygon when its edge already lies on a wall
    pub polygon_id: PolygonId,
    pub port_number: i32,
    /// Wall the strip ends on, `None` when inference was ambiguous
    pub wall: Option<Wall>,
}

/// Box extent in API coordinates
#[derive(Debug, Clone, Copy)]
struct Extent {
    width: f64,
    height: f64,
}

impl Extent {
    /// Point of `v` moved straight onto `wall`
    fn project(&self, (x, y): Vertex, wall: Wall) -> Vertex {
        match wall {
            Wall::Left => (0.0, y),
            Wall::Right => (self.width, y),
            Wall::Top => (x, self.height),
            Wall::Bottom => (x, 0.0),
        }
    }

    /// First wall hit from `v` travelling along `normal`, and the hit point
    fn cast(&self, (x, y): Vertex, (nx, ny): Vertex) -> Option<(Wall, Vertex)> {
        let mut hits: Vec<(f64, Wall)> = Vec::with_capacity(2);
        if nx > EPSILON {
            hits.push(((self.width - x) / nx, Wall::Right));
        } else if nx < -EPSILON {
            hits.push((-x / nx, Wall::Left));
        }
        if ny > EPSILON {
            hits.push(((self.height - y) / ny, Wall::Top));
        } else if ny < -EPSILON {
            hits.push((-y / ny, Wall::Bottom));
        }
        hits.into_iter()
            .filter(|(t, _)| *t >= -EPSILON)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, wall)| (wall, (x + nx * t, y + ny * t)))
    }
}

/// Signed shoelace area of an open ring
fn ring_area(ring: &[Vertex]) -> f64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(p, q)| p.0 * q.1 - q.0 * p.1)
        .sum::<f64>()
        / 2.0
}

fn near(a: Vertex, b: Vertex) -> bool {
    (a.0 - b.0).abs() < EPSILON && (a.1 - b.1).abs() < EPSILON
}

/// Unit normal of the edge pointing away from the polygon interior
///
/// Tests both sides of the edge midpoint at halving distances until exactly
/// one side is inside the polygon.
fn outward_normal(ring: &[Vertex], a: Vertex, b: Vertex, budget: u32) -> Result<Vertex> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length = dx.hypot(dy);
    let normal = (dy / length, -dx / length);
    let middle = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    let shape = to_geo_polygon(ring);

    let mut distance = length / 2.0;
    for _ in 0..budget {
        let ahead = Point::new(middle.0 + normal.0 * distance, middle.1 + normal.1 * distance);
        let behind = Point::new(middle.0 - normal.0 * distance, middle.1 - normal.1 * distance);
        match (shape.contains(&ahead), shape.contains(&behind)) {
            (false, true) => return Ok(normal),
            (true, false) => return Ok((-normal.0, -normal.1)),
            _ => distance /= 2.0,
        }
    }
    Err(SonError::Geometry(format!(
        "could not tell the outward side of edge ({}, {})-({}, {}) after {budget} halvings",
        a.0, a.1, b.0, b.1
    )))
}

/// Extend edge `vertex` of polygon `polygon_id` to a wall and put a port on it
pub fn synthesize_feedline(
    geometry: &mut Geometry,
    polygon_id: PolygonId,
    vertex: usize,
    direction: Option<Wall>,
    settings: &FeedLineSettings,
    ids: &mut IdAllocator,
) -> Result<FeedLine> {
    let height = geometry.box_height();
    let (width, _) = geometry.box_size();
    let extent = Extent {
        width: width as f64,
        height,
    };

    let source = geometry
        .polygon(polygon_id)
        .ok_or_else(|| SonError::InvalidEdit(format!("no polygon with id {polygon_id}")))?;
    let (a, b) = source.edge(vertex).ok_or_else(|| {
        SonError::InvalidEdit(format!("polygon {polygon_id} has no edge {vertex}"))
    })?;
    let (a, b) = (fix_vertex(a, height), fix_vertex(b, height));
    if near(a, b) {
        return Err(SonError::InvalidEdit(format!(
            "edge {vertex} of polygon {polygon_id} has zero length"
        )));
    }

    let (wall, a_out, b_out) = match direction {
        Some(wall) => (Some(wall), extent.project(a, wall), extent.project(b, wall)),
        None => {
            let ring = fix_ring(&source.ring, height);
            let normal = outward_normal(&ring, a, b, settings.halving_budget)?;
            let miss = || SonError::Geometry(format!("edge {vertex} points out of the box"));
            let (wall_a, a_out) = extent.cast(a, normal).ok_or_else(miss)?;
            let (wall_b, b_out) = extent.cast(b, normal).ok_or_else(miss)?;
            if wall_a == wall_b {
                (Some(wall_a), a_out, b_out)
            } else {
                log::warn!(
                    "[WARN] Feed line from polygon {polygon_id} edge {vertex} reaches {wall_a} and {wall_b}, no reference plane set"
                );
                (None, a_out, b_out)
            }
        }
    };

    let number = geometry.next_port_number();
    let (strip_id, port_vertex, outer) = if near(a, a_out) && near(b, b_out) {
        // Edge already lies on the wall
        (polygon_id, vertex, (a, b))
    } else {
        let strip = [a, b, b_out, a_out];
        if near(a_out, b_out) || ring_area(&strip).abs() < EPSILON {
            return Err(SonError::Geometry(format!(
                "feed line from edge {vertex} of polygon {polygon_id} towards {} has no area",
                wall.map_or_else(|| "the box".to_string(), |w| w.to_string())
            )));
        }
        let mut header = PolygonHeader::metal(
            source.header.level,
            Some(&source.header.metal_type),
            0,
        );
        header.tech_layer = source.header.tech_layer.clone();
        header.id = ids.allocate(&geometry.polygon_ids());
        let ring = fix_ring(&strip, height);
        let id = header.id;
        geometry.polygons.push(Polygon::new(header, ring));
        (id, 2, (b_out, a_out))
    };

    let (x, y) = fix_vertex(
        ((outer.0 .0 + outer.1 .0) / 2.0, (outer.0 .1 + outer.1 .1) / 2.0),
        height,
    );
    geometry.push_port(Port {
        kind: PortKind::Std,
        polygon: strip_id,
        points: 1,
        vertex: port_vertex,
        number,
        resistance: settings.resistance,
        reactance: 0.0,
        inductance: 0.0,
        capacitance: 0.0,
        x,
        y,
        extra: Vec::new(),
    });

    if let (Some(wall), true) = (wall, settings.link_reference_plane) {
        geometry.set_plane(ReferencePlane {
            wall,
            anchor: PlaneAnchor::Link {
                polygon: polygon_id,
                points: 1,
                vertex,
            },
        });
    }

    log::info!(
        "[INFO] Feed line polygon {strip_id} with port {number} towards {}",
        wall.map_or_else(|| "an ambiguous wall".to_string(), |w| w.to_string())
    );
    Ok(FeedLine {
        polygon_id: strip_id,
        port_number: number,
        wall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: [Vertex; 5] = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];

    #[test]
    fn test_outward_normal_of_counter_clockwise_ring() {
        // Right-hand normal of the top edge points up, away from the square
        let n = outward_normal(&SQUARE, (4.0, 4.0), (0.0, 4.0), 8).unwrap();
        assert!(near(n, (0.0, 1.0)));
        // Bottom edge: right-hand normal points down
        let n = outward_normal(&SQUARE, (0.0, 0.0), (4.0, 0.0), 8).unwrap();
        assert!(near(n, (0.0, -1.0)));
    }

    #[test]
    fn test_outward_normal_of_clockwise_ring() {
        let ring: Vec<Vertex> = SQUARE.iter().rev().copied().collect();
        let n = outward_normal(&ring, (4.0, 4.0), (4.0, 0.0), 8).unwrap();
        assert!(near(n, (1.0, 0.0)));
    }

    #[test]
    fn test_halving_budget_exhausted() {
        let err = outward_normal(&SQUARE, (4.0, 4.0), (0.0, 4.0), 0).unwrap_err();
        assert!(matches!(err, SonError::Geometry(_)));
    }

    #[test]
    fn test_cast_picks_nearer_wall() {
        let extent = Extent {
            width: 100.0,
            height: 50.0,
        };
        let diagonal = (std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2);
        let (wall, hit) = extent.cast((10.0, 40.0), diagonal).unwrap();
        assert_eq!(wall, Wall::Top);
        assert!((hit.0 - 20.0).abs() < 1e-6);
        assert!((hit.1 - 50.0).abs() < 1e-6);
        let (wall, _) = extent.cast((95.0, 10.0), diagonal).unwrap();
        assert_eq!(wall, Wall::Right);
    }

    #[test]
    fn test_ring_area() {
        assert_eq!(ring_area(&SQUARE[..4]), 16.0);
        assert_eq!(ring_area(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 0.0)]), 0.0);
    }

    #[test]
    fn test_project_onto_wall() {
        let extent = Extent {
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(extent.project((3.0, 4.0), Wall::Left), (0.0, 4.0));
        assert_eq!(extent.project((3.0, 4.0), Wall::Top), (3.0, 50.0));
    }
}
