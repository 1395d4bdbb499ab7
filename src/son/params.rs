// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Parameter edits on header-style blocks (FREQ, CONTROL, FILEOUT) and
//! VALVAR housekeeping on the GEO text.

use std::collections::HashSet;
use std::fmt;

use super::{Project, GEO_BLOCK};
use crate::error::Result;

/// Default MDIF output name, expanded by the solver
pub const DEFAULT_MDIF_OUTPUT: &str = "$BASENAME.mdf";

/// A single token of a parameter line
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(true) => write!(f, "Y"),
            ParamValue::Flag(false) => write!(f, "N"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

impl Project {
    /// Replace the line starting with `param` in `block`, or append it
    pub fn replace_param(&mut self, block: &str, param: &str, values: &[ParamValue]) -> Result<()> {
        let mut line = param.to_string();
        for value in values {
            line.push(' ');
            line.push_str(&value.to_string());
        }

        let lines = self.lines_mut(block)?;
        match lines.iter_mut().find(|l| first_token(l) == Some(param)) {
            Some(existing) => *existing = line,
            None => lines.push(line),
        }
        Ok(())
    }

    pub fn has_param(&self, block: &str, param: &str) -> bool {
        self.lines(block)
            .is_some_and(|lines| lines.iter().any(|l| first_token(l) == Some(param)))
    }

    /// Target number of adaptive frequency points
    pub fn set_targ_abs(&mut self, points: i64) -> Result<()> {
        self.replace_param("CONTROL", "TARG_ABS", &[points.into()])
    }

    pub fn set_res_abs(&mut self, enable: bool, resolution: f64) -> Result<()> {
        self.replace_param("CONTROL", "RES_ABS", &[enable.into(), resolution.into()])
    }

    pub fn set_speed(&mut self, speed: i64) -> Result<()> {
        self.replace_param("CONTROL", "SPEED", &[speed.into()])
    }

    /// Adaptive sweep between `start` and `stop`; adds `TARG_ABS 300` when
    /// the control block has no target yet
    pub fn set_abs_sweep(&mut self, start: f64, stop: f64) -> Result<()> {
        self.replace_param("FREQ", "ABS", &[start.into(), stop.into()])?;
        if !self.has_param("CONTROL", "TARG_ABS") {
            self.set_targ_abs(300)?;
        }
        Ok(())
    }

    pub fn add_mdif_output(&mut self, file_output: Option<&str>) -> Result<()> {
        let name = file_output.unwrap_or(DEFAULT_MDIF_OUTPUT);
        self.lines_mut("FILEOUT")?
            .push(format!("MDIF D Y {name} IC 8 S RI R 50.00000"));
        Ok(())
    }

    pub fn remove_mdif_output(&mut self, file_output: Option<&str>) -> Result<()> {
        let name = file_output.unwrap_or(DEFAULT_MDIF_OUTPUT);
        self.lines_mut("FILEOUT")?.retain(|l| !l.contains(name));
        Ok(())
    }

    /// Drop repeated VALVAR lines from the GEO text
    ///
    /// Returns the number of removed lines.
    pub fn dedupe_valvars(&mut self) -> Result<usize> {
        let (text, removed) = dedupe_valvar_lines(self.geo_text()?);
        if removed > 0 {
            log::info!("[INFO] Removed {removed} duplicate VALVAR lines from {GEO_BLOCK}");
            self.set_geo_text(text);
        }
        Ok(removed)
    }
}

/// Remove every VALVAR line identical to an earlier one
pub fn dedupe_valvar_lines(text: &str) -> (String, usize) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = String::with_capacity(text.len());
    let mut removed = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end();
        if first_token(content) == Some("VALVAR") && !seen.insert(content) {
            removed += 1;
            continue;
        }
        out.push_str(line);
    }
    (out, removed)
}
