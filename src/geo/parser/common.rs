// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Common utilities for parsing GEO lines

use std::str::FromStr;

use crate::error::{Result, SonError};

/// Whitespace separated tokens of a line
pub fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Check whether the first token of a line is `keyword`
pub fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.split_whitespace().next() == Some(keyword)
}

/// A line is indented when it begins with a tab or a space
pub fn is_indented(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with(' ')
}

/// Leading whitespace of a line
pub fn indent_of(line: &str) -> &str {
    let end = line.len() - line.trim_start().len();
    &line[..end]
}

/// Parse token `index`, naming the field in the error
pub fn field<T: FromStr>(parts: &[&str], index: usize, name: &str, line: usize) -> Result<T> {
    let token = parts.get(index).ok_or_else(|| {
        SonError::at_line(line, format!("missing {name} (field {})", index + 1))
    })?;
    token
        .parse::<T>()
        .map_err(|_| SonError::at_line(line, format!("invalid {name} '{token}'")))
}

/// Parse a `POLY <id> <points>` line
pub fn parse_poly_ref(parts: &[&str], line: usize) -> Result<(u32, u32)> {
    if parts.first() != Some(&"POLY") {
        return Err(SonError::at_line(line, "expected POLY <id> <points>"));
    }
    Ok((
        field(parts, 1, "polygon id", line)?,
        field(parts, 2, "point count", line)?,
    ))
}

/// Non-blank line at or after `start`
pub fn next_content_line(lines: &[&str], start: usize) -> Option<usize> {
    (start..lines.len()).find(|&i| !lines[i].trim().is_empty())
}
