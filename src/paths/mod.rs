// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The path enumerator.

For one (source, receiver) pair this walks the obstacle set and produces
every physically significant candidate path: the direct ray, the specular
ground reflection, first-order wall reflections off building faces, and
diffraction over and around barriers and buildings. Geometry only — the
per-band attenuation and phase are applied by the spectral summation.
 */

pub(crate) mod occlusion;

use log::trace;

use crate::{
    constants::GEOM_EPSILON,
    geom::{
        convex_hull, ground_reflection_geometry, intersect_segments, polygon_edges,
        reflect_across_line, signed_offset, Point2, Point3,
    },
    scene::{Barrier, Building, PropagationConfig, Scene},
};
use occlusion::{all_blocking_buildings, first_blocking_building, segment_blocked, Skip};

/// The topology of one propagation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    Direct,
    /// Specular ground reflection via the image source.
    Ground,
    /// First-order reflection off a building face.
    WallReflection,
    /// Over the top edge or around an end of a barrier.
    BarrierDiffraction,
    /// Over the roof or around a corner of a building.
    BuildingDiffraction,
}

/// The image-method distances of a ground reflection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPathInfo {
    /// Direct source-receiver distance \[m\].
    pub r1: f64,
    /// Reflected path length \[m\].
    pub r2: f64,
}

/// One candidate path from a source to a receiver, with everything the
/// spectral summation needs.
#[derive(Clone, Debug, PartialEq)]
pub struct PropagationPath {
    pub kind: PathKind,
    /// Total travelled distance \[m\].
    pub length: f64,
    /// Path-length excesses of the diffraction edges \[m\]. The second entry
    /// is zero for single-edge paths.
    pub deltas: (f64, f64),
    /// Number of diffraction edges (0, 1 or 2).
    pub edge_count: u8,
    /// Set for ground paths.
    pub ground: Option<GroundPathInfo>,
    /// Insertion-loss cap from the obstacle's transmission loss \[dB\].
    pub attenuation_cap_db: f64,
    /// Path polyline for diagnostics.
    pub points: Vec<Point3>,
}

/// A building with its derived geometry.
#[derive(Clone, Debug)]
pub struct BuildingGeometry {
    pub building: Building,
    pub edges: Vec<(Point2, Point2)>,
    pub hull: Vec<Point2>,
}

/// The enabled obstacles of a scene with precomputed footprint edges and
/// convex hulls. Build once per compute call; immutable afterwards.
#[derive(Clone, Debug, Default)]
pub struct SceneGeometry {
    pub barriers: Vec<Barrier>,
    pub buildings: Vec<BuildingGeometry>,
}

impl SceneGeometry {
    /// Disabled obstacles are absent for the enumerator.
    pub fn new(scene: &Scene) -> SceneGeometry {
        SceneGeometry::from_obstacles(
            scene.barriers.iter().filter(|b| b.enabled).cloned(),
            scene.buildings.iter().filter(|b| b.enabled).cloned(),
        )
    }

    pub fn from_obstacles(
        barriers: impl IntoIterator<Item = Barrier>,
        buildings: impl IntoIterator<Item = Building>,
    ) -> SceneGeometry {
        SceneGeometry {
            barriers: barriers.into_iter().collect(),
            buildings: buildings
                .into_iter()
                .map(|building| BuildingGeometry {
                    edges: polygon_edges(&building.footprint),
                    hull: convex_hull(&building.footprint),
                    building,
                })
                .collect(),
        }
    }
}

/// Enumerate every valid path from `source` to `receiver`.
pub fn enumerate_paths(
    source: Point3,
    receiver: Point3,
    geometry: &SceneGeometry,
    config: &PropagationConfig,
) -> Vec<PropagationPath> {
    let mut paths = vec![];
    let direct_length = source.distance(receiver);

    // 1. Direct ray.
    let direct_blocked = segment_blocked(source, receiver, geometry, Skip::None);
    if !direct_blocked {
        paths.push(PropagationPath {
            kind: PathKind::Direct,
            length: direct_length,
            deltas: (0.0, 0.0),
            edge_count: 0,
            ground: None,
            attenuation_cap_db: f64::INFINITY,
            points: vec![source, receiver],
        });
    }

    // 2. Specular ground reflection. Skipped silently when either endpoint
    // sits on the ground.
    if config.ground.enabled && source.z > 0.0 && receiver.z > 0.0 {
        ground_path(source, receiver, geometry, &mut paths);
    }

    // 3. Diffraction over and around barriers.
    for (i, barrier) in geometry.barriers.iter().enumerate() {
        barrier_paths(
            source,
            receiver,
            direct_length,
            i,
            barrier,
            geometry,
            config,
            &mut paths,
        );
    }

    // 4. Diffraction over roofs and around corners of blocking buildings.
    for crossing in all_blocking_buildings(source, receiver, geometry) {
        building_paths(source, receiver, direct_length, &crossing, geometry, &mut paths);
    }

    // 5. First-order wall reflections.
    for (i, bg) in geometry.buildings.iter().enumerate() {
        wall_reflection_paths(source, receiver, i, bg, geometry, &mut paths);
    }

    trace!(
        "{} path(s) for source at ({}, {}, {})",
        paths.len(),
        source.x,
        source.y,
        source.z
    );
    paths
}

fn ground_path(
    source: Point3,
    receiver: Point3,
    geometry: &SceneGeometry,
    paths: &mut Vec<PropagationPath>,
) {
    let d = source.xy().distance(receiver.xy());
    let g = ground_reflection_geometry(d, source.z, receiver.z);
    let t = source.z / (source.z + receiver.z);
    let mut reflection_point = source.lerp(receiver, t);
    reflection_point.z = 0.0;

    // The legs are tested against buildings in 2D only; the leg heights dip
    // to the ground plane, below every roof.
    let blocked = occlusion::leg_crosses_building_2d(
        source.xy(),
        reflection_point.xy(),
        geometry,
        Skip::None,
    ) || occlusion::leg_crosses_building_2d(
        reflection_point.xy(),
        receiver.xy(),
        geometry,
        Skip::None,
    );
    if blocked {
        return;
    }

    paths.push(PropagationPath {
        kind: PathKind::Ground,
        length: g.r2,
        deltas: (0.0, 0.0),
        edge_count: 0,
        ground: Some(GroundPathInfo { r1: g.r1, r2: g.r2 }),
        attenuation_cap_db: f64::INFINITY,
        points: vec![source, reflection_point, receiver],
    });
}

#[allow(clippy::too_many_arguments)]
fn barrier_paths(
    source: Point3,
    receiver: Point3,
    direct_length: f64,
    index: usize,
    barrier: &Barrier,
    geometry: &SceneGeometry,
    config: &PropagationConfig,
    paths: &mut Vec<PropagationPath>,
) {
    let hit = match intersect_segments(source.xy(), receiver.xy(), barrier.p1, barrier.p2) {
        Some(hit) => hit,
        None => return,
    };

    // A barrier below the line of sight at the crossing doesn't diffract;
    // its candidates would reduce to the direct path.
    let z_los = source.z + hit.t * (receiver.z - source.z);
    if barrier.top_z() <= z_los {
        return;
    }

    // (a) Over the top edge, above the crossing.
    let top = hit.point.at_z(barrier.top_z());
    let over_length = source.distance(top) + top.distance(receiver);
    let delta = over_length - direct_length;
    if delta > 0.0
        && !segment_blocked(source, top, geometry, Skip::Barrier(index))
        && !segment_blocked(top, receiver, geometry, Skip::Barrier(index))
    {
        paths.push(PropagationPath {
            kind: PathKind::BarrierDiffraction,
            length: over_length,
            deltas: (delta, 0.0),
            edge_count: 1,
            ground: None,
            attenuation_cap_db: barrier.attenuation_db,
            points: vec![source, top, receiver],
        });
    }

    // (b) Around each end, when side diffraction applies to this barrier.
    if !config.side_diffraction.enabled_for(barrier.length()) {
        return;
    }
    for end in [barrier.p1, barrier.p2] {
        let to_end = source.xy().distance(end);
        let from_end = end.distance(receiver.xy());
        let horizontal = to_end + from_end;
        if horizontal < GEOM_EPSILON {
            continue;
        }
        // The bend height follows the horizontal fraction of the detour.
        let bend = end.at_z(source.z + (to_end / horizontal) * (receiver.z - source.z));
        let side_length = source.distance(bend) + bend.distance(receiver);
        let delta = side_length - direct_length;
        if delta <= 0.0 {
            continue;
        }
        if segment_blocked(source, bend, geometry, Skip::Barrier(index))
            || segment_blocked(bend, receiver, geometry, Skip::Barrier(index))
        {
            continue;
        }
        paths.push(PropagationPath {
            kind: PathKind::BarrierDiffraction,
            length: side_length,
            deltas: (delta, 0.0),
            edge_count: 1,
            ground: None,
            attenuation_cap_db: barrier.attenuation_db,
            points: vec![source, bend, receiver],
        });
    }
}

fn building_paths(
    source: Point3,
    receiver: Point3,
    direct_length: f64,
    crossing: &occlusion::BuildingCrossing,
    geometry: &SceneGeometry,
    paths: &mut Vec<PropagationPath>,
) {
    let bg = &geometry.buildings[crossing.index];
    let height = bg.building.height;
    let skip = Skip::Building(crossing.index);

    // (a) Over the roof: a double edge at the two footprint crossings,
    // lifted to the building height.
    let edge1 = crossing.entry.at_z(height);
    let edge2 = crossing.exit.at_z(height);
    let over_length =
        source.distance(edge1) + edge1.distance(edge2) + edge2.distance(receiver);
    let delta1 = source.distance(edge1) + edge1.distance(receiver) - direct_length;
    let delta2 = source.distance(edge2) + edge2.distance(receiver) - direct_length;
    if over_length - direct_length > 0.0
        && !segment_blocked(source, edge1, geometry, skip)
        && !segment_blocked(edge2, receiver, geometry, skip)
    {
        paths.push(PropagationPath {
            kind: PathKind::BuildingDiffraction,
            length: over_length,
            deltas: (delta1.max(0.0), delta2.max(0.0)),
            edge_count: 2,
            ground: None,
            attenuation_cap_db: bg.building.attenuation_db,
            points: vec![source, edge1, edge2, receiver],
        });
    }

    // (b) Around the silhouette corners: the extreme hull vertex on each
    // side of the sight line.
    let (s2, r2) = (source.xy(), receiver.xy());
    let mut left: Option<(Point2, f64)> = None;
    let mut right: Option<(Point2, f64)> = None;
    for &v in &bg.hull {
        let offset = signed_offset(v, s2, r2);
        if offset > GEOM_EPSILON && left.map_or(true, |(_, best)| offset > best) {
            left = Some((v, offset));
        }
        if offset < -GEOM_EPSILON && right.map_or(true, |(_, best)| offset < best) {
            right = Some((v, offset));
        }
    }
    for (corner, _) in [left, right].into_iter().flatten() {
        let to_corner = s2.distance(corner);
        let from_corner = corner.distance(r2);
        let horizontal = to_corner + from_corner;
        if horizontal < GEOM_EPSILON {
            continue;
        }
        let bend = corner.at_z(source.z + (to_corner / horizontal) * (receiver.z - source.z));
        let around_length = source.distance(bend) + bend.distance(receiver);
        let delta = around_length - direct_length;
        if delta <= 0.0 {
            continue;
        }
        if segment_blocked(source, bend, geometry, skip)
            || segment_blocked(bend, receiver, geometry, skip)
        {
            continue;
        }
        paths.push(PropagationPath {
            kind: PathKind::BuildingDiffraction,
            length: around_length,
            deltas: (delta, 0.0),
            edge_count: 1,
            ground: None,
            attenuation_cap_db: bg.building.attenuation_db,
            points: vec![source, bend, receiver],
        });
    }
}

fn wall_reflection_paths(
    source: Point3,
    receiver: Point3,
    index: usize,
    bg: &BuildingGeometry,
    geometry: &SceneGeometry,
    paths: &mut Vec<PropagationPath>,
) {
    let (s2, r2) = (source.xy(), receiver.xy());
    let skip = Skip::Building(index);

    for &(a, b) in &bg.edges {
        // Footprints are CCW, so the exterior is to the right of each
        // directed edge. Both endpoints must see the outer face.
        if signed_offset(s2, a, b) >= -GEOM_EPSILON || signed_offset(r2, a, b) >= -GEOM_EPSILON {
            continue;
        }
        let image = match reflect_across_line(s2, a, b) {
            Some(p) => p,
            None => continue,
        };
        // The image path must cross the wall within its extent.
        let hit = match intersect_segments(image, r2, a, b) {
            Some(hit) => hit,
            None => continue,
        };
        let z_reflect = source.z + hit.t * (receiver.z - source.z);
        if bg.building.height <= z_reflect {
            continue;
        }
        let reflection_point = hit.point.at_z(z_reflect);
        if segment_blocked(source, reflection_point, geometry, skip)
            || segment_blocked(reflection_point, receiver, geometry, skip)
        {
            continue;
        }
        // Unfolded length: image source to receiver in 3D.
        let image3 = image.at_z(source.z);
        paths.push(PropagationPath {
            kind: PathKind::WallReflection,
            length: image3.distance(receiver),
            deltas: (0.0, 0.0),
            edge_count: 0,
            ground: None,
            attenuation_cap_db: f64::INFINITY,
            points: vec![source, reflection_point, receiver],
        });
    }
}

/// Convenience wrapper matching the geometry-kernel contract: the first
/// enabled building blocking `src → dst`, with its entry/exit points.
pub fn first_blocking(
    src: Point3,
    dst: Point3,
    geometry: &SceneGeometry,
) -> Option<(usize, Point2, Point2)> {
    first_blocking_building(src, dst, geometry).map(|c| (c.index, c.entry, c.exit))
}
