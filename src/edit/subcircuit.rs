// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Copy the polygons of one project into another at an offset

use std::collections::BTreeMap;

use super::coords::fix_y;
use super::ids::IdAllocator;
use crate::error::{Result, SonError};
use crate::geo::{Geometry, Polygon, PolygonId};

/// Place every polygon of `source` into `target`, translated by `(dx, dy)`
///
/// Offsets are in API coordinates. Each file stores y relative to its own
/// box, so vertices are lifted out of the source with the source height and
/// written with the target height. Every copy gets a fresh id; the returned
/// map goes from source id to the id used in `target`.
pub fn place_subcircuit(
    target: &mut Geometry,
    source: &Geometry,
    (dx, dy): (f64, f64),
    ids: &mut IdAllocator,
) -> Result<BTreeMap<PolygonId, PolygonId>> {
    if source.has_vias() {
        return Err(SonError::Unsupported(
            "subcircuit contains via polygons".to_string(),
        ));
    }

    let source_height = source.box_height();
    let target_height = target.box_height();
    let mut taken = target.polygon_ids();
    let mut mapping = BTreeMap::new();

    for polygon in &source.polygons {
        let ring = polygon
            .ring
            .iter()
            .map(|&(x, y)| (x + dx, fix_y(fix_y(y, source_height) + dy, target_height)))
            .collect();

        let id = ids.allocate(&taken);
        taken.insert(id);
        mapping.insert(polygon.id(), id);

        let mut header = polygon.header.clone();
        header.id = id;
        target.polygons.push(Polygon::new(header, ring));
    }

    log::info!(
        "[INFO] Placed {} subcircuit polygons at ({dx}, {dy})",
        mapping.len()
    );
    Ok(mapping)
}
