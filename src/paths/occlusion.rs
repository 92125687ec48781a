// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Occlusion predicates over the obstacle set.
//!
//! All predicates work on the 2D projection of a 3D segment plus a height
//! test: an obstacle blocks only where its top exceeds the linear
//! interpolation of z along the segment. Hits within the grazing tolerance
//! of an edge or an endpoint count as non-blocked.

use crate::{
    constants::GEOM_EPSILON,
    geom::{intersect_segments, Point2, Point3},
};

use super::{BuildingGeometry, SceneGeometry};

/// Which obstacle a leg is allowed to touch. Diffraction and reflection legs
/// end on their own obstacle; validity is judged against the *others*.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Skip {
    None,
    Barrier(usize),
    Building(usize),
}

/// A building whose footprint is crossed by a segment's 2D projection.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BuildingCrossing {
    /// Index into [SceneGeometry::buildings].
    pub index: usize,
    /// First footprint-edge intersection, ordered from the segment start.
    pub entry: Point2,
    /// Last footprint-edge intersection.
    pub exit: Point2,
    /// Segment parameter of `entry`.
    pub entry_t: f64,
    /// Segment parameter of `exit`.
    pub exit_t: f64,
}

/// A hit strictly inside both segments; grazing passes don't count.
fn strict_hit(a: Point2, b: Point2, c: Point2, d: Point2) -> Option<(Point2, f64)> {
    let hit = intersect_segments(a, b, c, d)?;
    let interior = |v: f64| v > GEOM_EPSILON && v < 1.0 - GEOM_EPSILON;
    if interior(hit.t) && interior(hit.u) {
        Some((hit.point, hit.t))
    } else {
        None
    }
}

/// The 2D footprint crossing of `src → dst` through one building, if any.
fn building_crossing(
    src: Point2,
    dst: Point2,
    index: usize,
    building: &BuildingGeometry,
) -> Option<BuildingCrossing> {
    let mut hits: Vec<(Point2, f64)> = building
        .edges
        .iter()
        .filter_map(|&(a, b)| strict_hit(src, dst, a, b))
        .collect();
    if hits.is_empty() {
        return None;
    }
    hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let (entry, entry_t) = hits[0];
    let (exit, exit_t) = *hits.last().unwrap();
    Some(BuildingCrossing {
        index,
        entry,
        exit,
        entry_t,
        exit_t,
    })
}

/// Does this crossing actually block a 3D segment? Only where the roof
/// exceeds the interpolated segment height somewhere between entry and exit.
fn crossing_blocks(crossing: &BuildingCrossing, height: f64, src: Point3, dst: Point3) -> bool {
    let z_entry = src.z + crossing.entry_t * (dst.z - src.z);
    let z_exit = src.z + crossing.exit_t * (dst.z - src.z);
    height > z_entry.min(z_exit)
}

/// The first enabled building blocking `src → dst`, ordered by entry
/// distance.
pub(crate) fn first_blocking_building(
    src: Point3,
    dst: Point3,
    geometry: &SceneGeometry,
) -> Option<BuildingCrossing> {
    all_blocking_buildings(src, dst, geometry).into_iter().next()
}

/// Every enabled building blocking `src → dst`, sorted by entry distance
/// from `src`.
pub(crate) fn all_blocking_buildings(
    src: Point3,
    dst: Point3,
    geometry: &SceneGeometry,
) -> Vec<BuildingCrossing> {
    let (s2, d2) = (src.xy(), dst.xy());
    let mut crossings: Vec<BuildingCrossing> = geometry
        .buildings
        .iter()
        .enumerate()
        .filter_map(|(i, b)| building_crossing(s2, d2, i, b))
        .filter(|c| crossing_blocks(c, geometry.buildings[c.index].building.height, src, dst))
        .collect();
    crossings.sort_by(|a, b| {
        a.entry_t
            .partial_cmp(&b.entry_t)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    crossings
}

/// Does any enabled barrier block the 3D segment?
pub(crate) fn any_barrier_blocks(
    src: Point3,
    dst: Point3,
    geometry: &SceneGeometry,
    skip: Skip,
) -> bool {
    let (s2, d2) = (src.xy(), dst.xy());
    geometry.barriers.iter().enumerate().any(|(i, barrier)| {
        if skip == Skip::Barrier(i) {
            return false;
        }
        match strict_hit(s2, d2, barrier.p1, barrier.p2) {
            Some((_, t)) => {
                let z_at = src.z + t * (dst.z - src.z);
                barrier.top_z() > z_at
            }
            None => false,
        }
    })
}

/// Is the 3D segment blocked by any enabled obstacle other than `skip`?
pub(crate) fn segment_blocked(src: Point3, dst: Point3, geometry: &SceneGeometry, skip: Skip) -> bool {
    if any_barrier_blocks(src, dst, geometry, skip) {
        return true;
    }
    let (s2, d2) = (src.xy(), dst.xy());
    geometry.buildings.iter().enumerate().any(|(i, b)| {
        if skip == Skip::Building(i) {
            return false;
        }
        match building_crossing(s2, d2, i, b) {
            Some(crossing) => crossing_blocks(&crossing, b.building.height, src, dst),
            None => false,
        }
    })
}

/// Is the 2D projection of a ground-reflection leg crossed by any enabled
/// building (other than `skip`)? Heights are ignored; the leg dips to the
/// ground plane.
pub(crate) fn leg_crosses_building_2d(
    src: Point2,
    dst: Point2,
    geometry: &SceneGeometry,
    skip: Skip,
) -> bool {
    geometry.buildings.iter().enumerate().any(|(i, b)| {
        skip != Skip::Building(i)
            && b.edges
                .iter()
                .any(|&(a, c)| strict_hit(src, dst, a, c).is_some())
    })
}
