// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Y-axis convention
//!
//! Files store y growing downward from the top wall; the editing API uses y
//! growing upward. `fix_y` maps one to the other for a given box height and
//! is its own inverse while the height stays the same.

use crate::geo::Vertex;

pub fn fix_y(y: f64, box_height: f64) -> f64 {
    box_height - y
}

pub fn fix_ys(ys: &[f64], box_height: f64) -> Vec<f64> {
    ys.iter().map(|&y| fix_y(y, box_height)).collect()
}

pub fn fix_vertex((x, y): Vertex, box_height: f64) -> Vertex {
    (x, fix_y(y, box_height))
}

pub fn fix_ring(ring: &[Vertex], box_height: f64) -> Vec<Vertex> {
    ring.iter().map(|&v| fix_vertex(v, box_height)).collect()
}
