//! SON Project Editor Library
//!
//! This library reads, edits and writes Sonnet SON project files: a
//! byte-faithful block codec, a structured model of the GEO block, and
//! geometric edits (cropping, subcircuit placement, feed-line synthesis)
//! behind a common editing interface.

pub mod config;
pub mod edit;
pub mod error;
pub mod export;
pub mod geo;
pub mod son;

// Re-export commonly used types
pub use crate::config::EditorConfig;
pub use crate::edit::{
    CropReport, FeedLine, NewPolygon, NewPort, ProjectEditor, RemoteEditor, ScriptEngine,
    Session, StructuralEditor,
};
pub use crate::error::{Result, SonError};
pub use crate::geo::{Geometry, Polygon, PolygonId, Port, PortKind, ReferencePlane, Wall};
pub use crate::son::reader::{SonReader, SonWriter};
pub use crate::son::{Block, Project};
