// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! SON project files
//!
//! A project is an opaque file header followed by named blocks. Most blocks
//! are lists of header-style lines; the GEO block is kept as one verbatim
//! text blob because its layout is positionally significant.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::error::{Result, SonError};
use crate::geo::Geometry;

pub mod envelope;
pub mod params;
pub mod reader;

/// Line separating the opaque file header from the first block
pub const HEADER_MARKER: &str = "HEADER";
/// Name of the geometry block
pub const GEO_BLOCK: &str = "GEO";

const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Ordinary block body, one entry per line
    Lines(Vec<String>),
    /// GEO body, stored exactly as read
    Raw(String),
}

/// Text around a block's name and end lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framing {
    /// Blank lines before the name line
    pub gap: String,
    /// Whatever follows the name on its line, newline included
    pub open_eol: String,
    /// Whatever follows `END <name>` on its line, newline included
    pub close_eol: String,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            gap: String::new(),
            open_eol: "\n".to_string(),
            close_eol: "\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub file_header: String,
    /// Blocks in file order
    pub blocks: IndexMap<String, Block>,
    /// Non-default framing of blocks read from a file
    pub framing: IndexMap<String, Framing>,
    /// Blank lines after the last block
    pub trailer: String,
}

impl Project {
    pub fn new(file_header: impl Into<String>) -> Self {
        Self {
            file_header: file_header.into(),
            blocks: IndexMap::new(),
            framing: IndexMap::new(),
            trailer: String::new(),
        }
    }

    /// Decode a whole project file
    pub fn parse(text: &str) -> Result<Self> {
        envelope::decode(text)
    }

    /// Re-linearize the project into file text
    pub fn encode(&self) -> String {
        envelope::encode(self)
    }

    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    /// Lines of an ordinary block
    pub fn lines(&self, name: &str) -> Option<&[String]> {
        match self.blocks.get(name) {
            Some(Block::Lines(lines)) => Some(lines),
            _ => None,
        }
    }

    /// Mutable lines of an ordinary block, created empty at the end when missing
    pub fn lines_mut(&mut self, name: &str) -> Result<&mut Vec<String>> {
        let block = self
            .blocks
            .entry(name.to_string())
            .or_insert_with(|| Block::Lines(Vec::new()));
        match block {
            Block::Lines(lines) => Ok(lines),
            Block::Raw(_) => Err(SonError::Unsupported(format!(
                "block {name} is stored as raw text"
            ))),
        }
    }

    pub fn geo_text(&self) -> Result<&str> {
        match self.blocks.get(GEO_BLOCK) {
            Some(Block::Raw(text)) => Ok(text),
            Some(Block::Lines(_)) => Err(SonError::Format(
                "GEO block is not stored as raw text".to_string(),
            )),
            None => Err(SonError::Format("missing GEO block".to_string())),
        }
    }

    /// Replace the GEO text, keeping the block at its position
    pub fn set_geo_text(&mut self, text: String) {
        match self.blocks.get_mut(GEO_BLOCK) {
            Some(block) => *block = Block::Raw(text),
            None => {
                self.blocks.insert(GEO_BLOCK.to_string(), Block::Raw(text));
            }
        }
    }

    /// Structurally decode the GEO block
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::parse(self.geo_text()?)
    }

    pub fn set_geometry(&mut self, geometry: &Geometry) {
        self.set_geo_text(geometry.encode());
    }

    /// A fresh project with default units, controls and a 160 x 160 box
    pub fn template(now: NaiveDateTime) -> Self {
        let stamp = now.format("%d/%m/%Y %H:%M:%S").to_string();
        let mut project =
            Project::new("FTYP SONPROJ 16.52 ! Sonnet Project File\nVER 16.52\n".to_string());

        let lines = |items: &[&str]| Block::Lines(items.iter().map(|s| s.to_string()).collect());

        project.blocks.insert(
            "HEADER".to_string(),
            Block::Lines(vec![
                format!("DAT {stamp}"),
                format!("BUILT_BY_CREATED son-editor v{PROGRAM_VERSION}"),
                format!("BUILT_BY_SAVED son-editor v{PROGRAM_VERSION}"),
                format!("MDATE {stamp}"),
                format!("HDATE {stamp}"),
            ]),
        );
        project.blocks.insert(
            "DIM".to_string(),
            lines(&[
                "ANG DEG", "CAP PF", "CON /OH", "FREQ GHZ", "IND NH", "LNG UM", "RES OH",
            ]),
        );
        project.blocks.insert("FREQ".to_string(), lines(&[]));
        project.blocks.insert(
            "CONTROL".to_string(),
            lines(&["ABS", "OPTIONS -d", "SPEED 0", "CACHE_ABS 1", "Q_ACC N"]),
        );
        project.blocks.insert(
            GEO_BLOCK.to_string(),
            Block::Raw(
                "TMET Lossless 0 SUP 0 0 0 0\n\
                 BMET Lossless 0 SUP 0 0 0 0\n\
                 BOX 1 160 160 32 32 20 0\n      \
                 0 1 1 0 0 0 0 \"Unnamed\"\n      \
                 0 1 1 0 0 0 0 \"Unnamed\"\n\
                 NUM 0\n"
                    .to_string(),
            ),
        );
        project
            .blocks
            .insert("OPT".to_string(), lines(&["MAX 100"]));
        project.blocks.insert("VARSWP".to_string(), lines(&[]));
        project.blocks.insert("FILEOUT".to_string(), lines(&[]));
        project.blocks.insert("SMDFILES".to_string(), lines(&[]));
        project
    }

    /// Template stamped with the local time
    pub fn template_now() -> Self {
        Self::template(chrono::Local::now().naive_local())
    }
}
