// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Feed-line synthesis tests
//!
//! Tests cover:
//! - Wall inference from the outward edge normal
//! - Explicit wall direction
//! - Edges already on a wall
//! - Ambiguous walls and reference plane linking
//! - Walls parallel to the edge

use approx::assert_abs_diff_eq;
use son_editor::config::{IdSettings, IdStrategy};
use son_editor::geo::{PlaneAnchor, Vertex};
use son_editor::{
    EditorConfig, NewPolygon, PortKind, Project, ProjectEditor, SonError, StructuralEditor, Wall,
};

fn config() -> EditorConfig {
    EditorConfig {
        ids: IdSettings {
            strategy: IdStrategy::Sequential,
            seed: None,
        },
        ..EditorConfig::default()
    }
}

fn editor_with(vertices: &[Vertex]) -> (StructuralEditor, u32) {
    let mut editor = StructuralEditor::new(Project::template_now(), config());
    let id = editor
        .add_polygon(&NewPolygon::from_vertices(0, vertices).with_metal_type("Lossless"))
        .unwrap();
    (editor, id)
}

fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> [Vertex; 4] {
    [(x1, y1), (x2, y1), (x2, y2), (x1, y2)]
}

#[test]
fn test_feedline_to_inferred_wall() {
    let (mut editor, id) = editor_with(&rect(60.0, 100.0, 100.0, 140.0));
    // Edge 2 runs along the top of the rectangle
    let feed = editor.synthesize_feedline(id, 2, None).unwrap();
    assert_eq!(feed.wall, Some(Wall::Top));
    assert_eq!(feed.port_number, 1);
    assert_ne!(feed.polygon_id, id);

    let strip = editor.polygon_outline(feed.polygon_id).unwrap();
    assert_eq!(
        strip,
        vec![
            (100.0, 140.0),
            (60.0, 140.0),
            (60.0, 160.0),
            (100.0, 160.0),
            (100.0, 140.0)
        ]
    );

    let geometry = editor.geometry().unwrap();
    let port = &geometry.ports[0];
    assert_eq!(port.kind, PortKind::Std);
    assert_eq!(port.polygon, feed.polygon_id);
    assert_eq!(port.vertex, 2);
    assert_eq!(port.resistance, 50.0);
    // Stored in file coordinates, the top wall is y = 0
    assert_abs_diff_eq!(port.x, 80.0);
    assert_abs_diff_eq!(port.y, 0.0);

    assert_eq!(
        geometry.plane(Wall::Top).map(|p| &p.anchor),
        Some(&PlaneAnchor::Link {
            polygon: id,
            points: 1,
            vertex: 2
        })
    );
    let strip = geometry.polygon(feed.polygon_id).unwrap();
    assert_eq!(strip.header.level, 0);
    assert_eq!(strip.header.metal_type, "Lossless");
}

#[test]
fn test_feedline_towards_explicit_wall() {
    let (mut editor, id) = editor_with(&rect(60.0, 100.0, 100.0, 140.0));
    let feed = editor
        .synthesize_feedline(id, 1, Some(Wall::Right))
        .unwrap();
    assert_eq!(feed.wall, Some(Wall::Right));

    let strip = editor.polygon_outline(feed.polygon_id).unwrap();
    assert_eq!(
        strip,
        vec![
            (100.0, 100.0),
            (100.0, 140.0),
            (160.0, 140.0),
            (160.0, 100.0),
            (100.0, 100.0)
        ]
    );

    let geometry = editor.geometry().unwrap();
    assert_abs_diff_eq!(geometry.ports[0].x, 160.0);
    assert_abs_diff_eq!(geometry.ports[0].y, 40.0);
    assert!(geometry.plane(Wall::Right).is_some());
}

#[test]
fn test_edge_on_wall_gets_port_only() {
    let (mut editor, id) = editor_with(&rect(60.0, 120.0, 100.0, 160.0));
    let feed = editor.synthesize_feedline(id, 2, None).unwrap();
    assert_eq!(feed.polygon_id, id);
    assert_eq!(feed.wall, Some(Wall::Top));

    let geometry = editor.geometry().unwrap();
    assert_eq!(geometry.polygons.len(), 1);
    assert_eq!(geometry.ports.len(), 1);
    assert_eq!(geometry.ports[0].polygon, id);
    assert_eq!(geometry.ports[0].vertex, 2);
    assert_abs_diff_eq!(geometry.ports[0].x, 80.0);
    assert_abs_diff_eq!(geometry.ports[0].y, 0.0);
}

#[test]
fn test_ambiguous_wall_sets_no_plane() {
    let (mut editor, id) = editor_with(&[(100.0, 100.0), (150.0, 100.0), (100.0, 150.0)]);
    // The hypotenuse points diagonally out towards both TOP and RIGHT
    let feed = editor.synthesize_feedline(id, 1, None).unwrap();
    assert_eq!(feed.wall, None);

    let geometry = editor.geometry().unwrap();
    assert!(geometry.planes.is_empty());
    assert_eq!(geometry.ports.len(), 1);
    assert_eq!(geometry.polygons.len(), 2);
}

#[test]
fn test_port_numbers_continue() {
    let (mut editor, id) = editor_with(&rect(60.0, 60.0, 100.0, 100.0));
    let first = editor.synthesize_feedline(id, 0, None).unwrap();
    let second = editor.synthesize_feedline(id, 2, None).unwrap();
    assert_eq!(first.wall, Some(Wall::Bottom));
    assert_eq!(second.wall, Some(Wall::Top));
    assert_eq!((first.port_number, second.port_number), (1, 2));
    assert_ne!(first.polygon_id, second.polygon_id);
}

#[test]
fn test_reference_plane_linking_disabled() {
    let mut config = config();
    config.feedline.link_reference_plane = false;
    let mut editor = StructuralEditor::new(Project::template_now(), config);
    let id = editor
        .add_polygon(&NewPolygon::from_vertices(0, &rect(60.0, 100.0, 100.0, 140.0)))
        .unwrap();
    editor.synthesize_feedline(id, 2, None).unwrap();
    assert!(editor.geometry().unwrap().planes.is_empty());
}

#[test]
fn test_unknown_polygon_or_edge() {
    let (mut editor, id) = editor_with(&rect(60.0, 100.0, 100.0, 140.0));
    assert!(matches!(
        editor.synthesize_feedline(id + 100, 0, None),
        Err(SonError::InvalidEdit(_))
    ));
    assert!(matches!(
        editor.synthesize_feedline(id, 9, None),
        Err(SonError::InvalidEdit(_))
    ));
    // Nothing was changed by the failed calls
    assert!(editor.geometry().unwrap().ports.is_empty());
}

#[test]
fn test_wall_parallel_to_edge_fails() {
    let (mut editor, id) = editor_with(&rect(60.0, 100.0, 100.0, 140.0));
    // Edge 1 is the vertical right side, so a strip up to TOP has no width
    assert!(matches!(
        editor.synthesize_feedline(id, 1, Some(Wall::Top)),
        Err(SonError::Geometry(_))
    ));
    let geometry = editor.geometry().unwrap();
    assert_eq!(geometry.polygons.len(), 1);
    assert!(geometry.ports.is_empty());
    assert!(geometry.planes.is_empty());
}
