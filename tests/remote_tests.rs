// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Remote backend tests against a recording engine
//!
//! Tests cover:
//! - Commands sent for open, polygon and sizing edits
//! - File round trips for edits without an engine command
//! - VALVAR cleanup on save
//! - Operations the backend refuses

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use son_editor::{
    EditorConfig, NewPolygon, NewPort, Project, ProjectEditor, RemoteEditor, Result,
    ScriptEngine, Session, SonError, SonReader, SonWriter, StructuralEditor, Wall,
};
use tempfile::TempDir;

/// Engine that records every command and answers expressions from a table
#[derive(Clone, Default)]
struct MockEngine {
    log: Rc<RefCell<Vec<String>>>,
    numbers: HashMap<String, f64>,
}

impl MockEngine {
    fn new() -> Self {
        let mut engine = Self::default();
        engine.numbers.insert("Project.xBoxSize()".to_string(), 160.0);
        engine.numbers.insert("Project.yBoxSize()".to_string(), 160.0);
        engine
    }

    fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl ScriptEngine for MockEngine {
    fn eval(&mut self, command: &str) -> Result<()> {
        self.log.borrow_mut().push(command.to_string());
        Ok(())
    }

    fn number(&mut self, expression: &str) -> Result<f64> {
        self.numbers
            .get(expression)
            .copied()
            .ok_or_else(|| SonError::Backend(format!("unknown expression {expression}")))
    }
}

const DUPLICATE_VALVARS: &str = "VALVAR W LNG 10 \"Width\"\nVALVAR W LNG 10 \"Width\"\nNUM 0\n";

fn write_project(dir: &TempDir, project: &Project) -> PathBuf {
    let path = dir.path().join("circuit.son");
    SonWriter::new().write(project, &path).unwrap();
    path
}

fn with_duplicate_valvars() -> Project {
    let mut project = Project::template_now();
    let geo = project
        .geo_text()
        .unwrap()
        .replace("NUM 0\n", DUPLICATE_VALVARS);
    project.set_geo_text(geo);
    project
}

fn valvar_count(path: &Path) -> usize {
    let project = SonReader::new().read(path).unwrap();
    project
        .geo_text()
        .unwrap()
        .lines()
        .filter(|l| l.starts_with("VALVAR"))
        .count()
}

#[test]
fn test_open_loads_project() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &Project::template_now());
    let editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();

    assert_eq!(editor.path(), path.as_path());
    assert_eq!(
        editor.engine().commands(),
        vec![
            "clear Project;".to_string(),
            format!("Project = SonnetProject(\"{}\");", path.display()),
        ]
    );
}

#[test]
fn test_add_polygon_sends_flipped_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &Project::template_now());
    let mut engine = MockEngine::new();
    engine.numbers.insert("polyId".to_string(), 42.0);
    let mut editor = RemoteEditor::open(engine, &path, EditorConfig::default()).unwrap();

    let id = editor
        .add_polygon(&NewPolygon::from_vertices(
            0,
            &[(10.0, 10.0), (30.0, 10.0), (30.0, 30.0)],
        ))
        .unwrap();
    assert_eq!(id, 42);

    let id = editor
        .add_polygon(
            &NewPolygon::from_vertices(1, &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)])
                .with_metal_type("Copper"),
        )
        .unwrap();
    assert_eq!(id, 42);

    let commands = editor.engine().commands();
    assert_eq!(
        commands[2],
        "polyId = Project.addMetalPolygonEasy(0, [10; 30; 30], [150; 150; 130]).DebugId;"
    );
    assert_eq!(
        commands[3],
        "polyId = Project.addMetalPolygonEasy(1, [0; 5; 5], [160; 160; 155], \"Copper\").DebugId;"
    );
}

#[test]
fn test_add_polygon_rejects_short_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &Project::template_now());
    let mut editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();
    let polygon = NewPolygon::new(0, vec![0.0, 1.0, 2.0], vec![0.0, 1.0]);
    assert!(matches!(
        editor.add_polygon(&polygon),
        Err(SonError::InvalidEdit(_))
    ));
    assert_eq!(editor.engine().commands().len(), 2);
}

#[test]
fn test_sizing_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &Project::template_now());
    let mut editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();

    assert_eq!(editor.box_size().unwrap(), (160, 160));
    editor.change_box_size(200, 100).unwrap();
    editor.change_cell_size(2.5, 5.0).unwrap();
    editor.change_dielectric_layer_thickness(0, 25.0).unwrap();
    assert!(matches!(
        editor.change_cell_size(500.0, 1.0),
        Err(SonError::InvalidEdit(_))
    ));

    let commands = editor.engine().commands();
    assert_eq!(
        &commands[2..],
        &[
            "Project.changeBoxSize(200, 100);".to_string(),
            "Project.changeCellSizeUsingNumberOfCellsXY(64, 32);".to_string(),
            "Project.changeDielectricLayerThickness(1, 25);".to_string(),
        ]
    );
}

#[test]
fn test_save_removes_duplicate_valvars() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &with_duplicate_valvars());
    assert_eq!(valvar_count(&path), 2);

    let mut editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();
    editor.save(None).unwrap();
    assert_eq!(editor.engine().commands().last().unwrap(), "Project.save();");
    assert_eq!(valvar_count(&path), 1);
}

#[test]
fn test_save_keeps_valvars_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &with_duplicate_valvars());
    let mut config = EditorConfig::default();
    config.remote.dedupe_valvars = false;

    let mut editor = RemoteEditor::open(MockEngine::new(), &path, config).unwrap();
    editor.save(None).unwrap();
    assert_eq!(valvar_count(&path), 2);
}

#[test]
fn test_add_port_goes_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut structural = StructuralEditor::new(Project::template_now(), EditorConfig::default());
    let id = structural
        .add_polygon(&NewPolygon::from_vertices(
            0,
            &[(10.0, 10.0), (30.0, 10.0), (30.0, 30.0), (10.0, 30.0)],
        ))
        .unwrap();
    let path = write_project(&dir, &structural.into_project());

    let mut editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();
    let number = editor.add_port(&NewPort::new(id, 0)).unwrap();
    assert_eq!(number, 1);

    let geometry = SonReader::new().read(&path).unwrap().geometry().unwrap();
    assert_eq!(geometry.ports.len(), 1);
    assert_eq!(geometry.ports[0].polygon, id);

    // Saved, rewritten, then reopened in the engine
    let commands = editor.engine().commands();
    assert_eq!(commands[2], "Project.save();");
    assert_eq!(
        commands.iter().filter(|c| *c == "clear Project;").count(),
        2
    );

    let polygons = editor.polygons().unwrap();
    assert_eq!(polygons.len(), 1);
    assert_eq!(polygons[0].ring[0], (10.0, 10.0));
}

#[test]
fn test_clear_reference_plane_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::template_now();
    let geo = project
        .geo_text()
        .unwrap()
        .replace("NUM 0\n", "DRP1 LEFT FIX 5\nNUM 0\n");
    project.set_geo_text(geo);
    let path = write_project(&dir, &project);

    let mut editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();
    editor.clear_reference_plane(Wall::Left).unwrap();
    let geometry = SonReader::new().read(&path).unwrap().geometry().unwrap();
    assert!(geometry.planes.is_empty());
}

#[test]
fn test_unsupported_operations() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &Project::template_now());
    let mut editor = RemoteEditor::open(MockEngine::new(), &path, EditorConfig::default()).unwrap();

    assert!(matches!(editor.delete_polygon(1), Err(SonError::Unsupported(_))));
    assert!(matches!(
        editor.crop(0.0, 0.0, 10.0, 10.0),
        Err(SonError::Unsupported(_))
    ));
    assert!(matches!(
        editor.synthesize_feedline(1, 0, None),
        Err(SonError::Unsupported(_))
    ));
    assert!(matches!(
        editor.set_valvar("W", Some("1"), None, None),
        Err(SonError::Unsupported(_))
    ));
    assert!(matches!(
        editor.place_subcircuit(&Project::template_now(), 0.0, 0.0),
        Err(SonError::Unsupported(_))
    ));
    // Refusals never reach the engine
    assert_eq!(editor.engine().commands().len(), 2);
}

#[test]
fn test_session_params_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, &Project::template_now());
    let engine = MockEngine::new();
    let log = Rc::clone(&engine.log);

    let mut session = Session::remote(engine, &path, EditorConfig::default()).unwrap();
    assert_eq!(session.backend(), "remote");
    session.set_speed(2).unwrap();

    let project = SonReader::new().read(&path).unwrap();
    assert!(project
        .lines("CONTROL")
        .unwrap()
        .contains(&"SPEED 2".to_string()));
    assert!(log.borrow().contains(&"Project.save();".to_string()));
}
