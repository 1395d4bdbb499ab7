// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Block envelope codec
//!
//! Splits a SON file into its opaque header and named blocks, and joins
//! them back. Unknown blocks are carried through untouched.

use std::mem;

use super::{Block, Framing, Project, GEO_BLOCK, HEADER_MARKER};
use crate::error::{Result, SonError};

/// Decode file text into a project
///
/// Everything before the `HEADER` line is the file header. After it the
/// decoder alternates between a block name line and the block body, which
/// runs until `END <name>`. Blank lines between blocks and line endings of
/// the name and end lines are recorded as the block's framing.
pub fn decode(text: &str) -> Result<Project> {
    let mut project = Project::new(String::new());
    let mut pre_header = true;
    let mut current: Option<(String, Block, Framing)> = None;
    let mut gap = String::new();

    for (index, line) in text.split_inclusive('\n').enumerate() {
        // Keep a trailing '\r' so CRLF bodies survive re-encoding
        let content = line.strip_suffix('\n').unwrap_or(line);

        if pre_header {
            if content.trim_end() == HEADER_MARKER {
                pre_header = false;
            } else {
                project.file_header.push_str(line);
                continue;
            }
        }

        let mut close = false;
        match current.as_mut() {
            None => {
                let name = content.trim();
                if name.is_empty() {
                    gap.push_str(line);
                    continue;
                }
                if name == "END" || name.starts_with("END ") {
                    return Err(SonError::at_line(
                        index,
                        format!("'{name}' without an open block"),
                    ));
                }
                let block = if name == GEO_BLOCK {
                    Block::Raw(String::new())
                } else {
                    Block::Lines(Vec::new())
                };
                let framing = Framing {
                    gap: mem::take(&mut gap),
                    open_eol: line_ending(line, content),
                    ..Framing::default()
                };
                current = Some((name.to_string(), block, framing));
            }
            Some((name, block, framing)) => {
                if is_end_marker(content, name) {
                    framing.close_eol = line_ending(line, content);
                    close = true;
                } else {
                    match block {
                        Block::Raw(raw) => raw.push_str(line),
                        Block::Lines(lines) => lines.push(content.to_string()),
                    }
                }
            }
        }

        if close {
            if let Some((name, block, framing)) = current.take() {
                if project.blocks.contains_key(&name) {
                    log::warn!("[WARN] Duplicate block {name}, keeping the last one");
                }
                if framing != Framing::default() {
                    project.framing.insert(name.clone(), framing);
                } else {
                    project.framing.shift_remove(&name);
                }
                project.blocks.insert(name, block);
            }
        }
    }

    if pre_header {
        return Err(SonError::Format(format!(
            "missing {HEADER_MARKER} marker line"
        )));
    }
    if let Some((name, _, _)) = current {
        return Err(SonError::Format(format!(
            "end of input inside block {name}"
        )));
    }

    log::debug!(
        "[INFO] Decoded {} blocks: {}",
        project.blocks.len(),
        project
            .blocks
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    );
    project.trailer = gap;
    Ok(project)
}

/// Text after the trimmed content of `line`: trailing blanks, `\r` and `\n`
fn line_ending(line: &str, content: &str) -> String {
    line[content.trim_end().len()..].to_string()
}

fn is_end_marker(line: &str, name: &str) -> bool {
    line.trim_end()
        .strip_prefix("END ")
        .is_some_and(|rest| rest == name)
}

/// Encode a project back into file text, blocks in recorded order
pub fn encode(project: &Project) -> String {
    let mut out = String::with_capacity(project.file_header.len() + 4096);
    out.push_str(&project.file_header);

    let plain = Framing::default();
    for (name, block) in &project.blocks {
        let framing = project.framing.get(name).unwrap_or(&plain);
        out.push_str(&framing.gap);
        out.push_str(name);
        out.push_str(&framing.open_eol);
        match block {
            Block::Lines(lines) => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Block::Raw(raw) => {
                out.push_str(raw);
                if !raw.is_empty() && !raw.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push_str("END ");
        out.push_str(name);
        out.push_str(&framing.close_eol);
    }
    out.push_str(&project.trailer);
    out
}
