// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs;
use std::path::Path;

use super::{envelope, Project, GEO_BLOCK};
use crate::error::Result;

pub struct SonReader;

impl SonReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Project> {
        let path_str = path.as_ref().display().to_string();
        log::info!("[LOAD] Loading SON file: {path_str}");

        let content = fs::read_to_string(path)?;
        log::debug!("[FILE] SON file size: {} bytes", content.len());

        match envelope::decode(&content) {
            Ok(project) => {
                log::info!(
                    "[PASS] SON parsed successfully: {} blocks",
                    project.blocks.len()
                );
                if !project.blocks.contains_key(GEO_BLOCK) {
                    log::warn!("[WARN] {path_str} has no {GEO_BLOCK} block");
                }
                Ok(project)
            }
            Err(e) => {
                log::error!("[FAIL] Failed to parse SON file {path_str}: {e}");
                Err(e)
            }
        }
    }
}

impl Default for SonReader {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SonWriter;

impl SonWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write<P: AsRef<Path>>(&self, project: &Project, path: P) -> Result<()> {
        let text = envelope::encode(project);
        log::info!(
            "[SAVE] Writing {} bytes to {}",
            text.len(),
            path.as_ref().display()
        );
        fs::write(path, text)?;
        Ok(())
    }
}

impl Default for SonWriter {
    fn default() -> Self {
        Self::new()
    }
}
