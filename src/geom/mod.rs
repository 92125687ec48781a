// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The geometry kernel.

Coordinates are local metres in a right-handed ENU frame: +x east, +y north,
+z up. Everything here is frequency independent; the physics kernel and the
path enumerator build on these primitives.
 */

#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::GEOM_EPSILON;

/// A point in the horizontal plane \[m\].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Point2 {
        Point2 { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Lift to 3D at the given height.
    pub fn at_z(self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }
}

/// A point in the ENU frame \[m\].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Point3 {
        Point3 { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Drop the vertical component.
    pub fn xy(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`.
    pub fn lerp(self, other: Point3, t: f64) -> Point3 {
        Point3::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
            self.z + t * (other.z - self.z),
        )
    }
}

/// Intersection of segments AB and CD in the plane, by the parametric form.
///
/// Returns `None` for (near-)parallel segments (denominator magnitude below
/// 1e-10) and when either parameter lies outside `[0, 1]` beyond the grazing
/// tolerance. The returned `t` is the parameter along AB.
pub fn intersect_segments(a: Point2, b: Point2, c: Point2, d: Point2) -> Option<SegmentHit> {
    let r = Point2::new(b.x - a.x, b.y - a.y);
    let s = Point2::new(d.x - c.x, d.y - c.y);
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < GEOM_EPSILON {
        return None;
    }
    let qp = Point2::new(c.x - a.x, c.y - a.y);
    let t = (qp.x * s.y - qp.y * s.x) / denom;
    let u = (qp.x * r.y - qp.y * r.x) / denom;
    if !(-GEOM_EPSILON..=1.0 + GEOM_EPSILON).contains(&t)
        || !(-GEOM_EPSILON..=1.0 + GEOM_EPSILON).contains(&u)
    {
        return None;
    }
    Some(SegmentHit {
        point: Point2::new(a.x + t * r.x, a.y + t * r.y),
        t,
        u,
    })
}

/// An intersection point with the parameters along both segments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentHit {
    pub point: Point2,
    /// Parameter along the first segment, in `[0, 1]`.
    pub t: f64,
    /// Parameter along the second segment, in `[0, 1]`.
    pub u: f64,
}

/// Does segment AB intersect any of the given segments?
pub fn segment_intersects_any(a: Point2, b: Point2, segments: &[(Point2, Point2)]) -> bool {
    segments
        .iter()
        .any(|&(c, d)| intersect_segments(a, b, c, d).is_some())
}

/// Is `p` strictly inside the simple polygon `poly`?
///
/// Standard ray casting with a horizontal ray; edges touching the ray are
/// counted on one side only, so the result on the boundary is deterministic
/// but unspecified.
pub fn point_in_polygon(p: Point2, poly: &[Point2]) -> bool {
    let mut inside = false;
    let n = poly.len();
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (poly[i], poly[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// The edges of a polygon, last-to-first edge included.
pub fn polygon_edges(poly: &[Point2]) -> Vec<(Point2, Point2)> {
    poly.iter()
        .copied()
        .circular_tuple_windows()
        .collect::<Vec<_>>()
}

/// Signed area by the shoelace formula; positive for counter-clockwise
/// winding.
pub fn polygon_signed_area(poly: &[Point2]) -> f64 {
    poly.iter()
        .copied()
        .circular_tuple_windows()
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
        / 2.0
}

/// Is any pair of non-adjacent edges crossing? Used to reject
/// self-intersecting footprints at ingest.
pub fn polygon_is_simple(poly: &[Point2]) -> bool {
    let edges = polygon_edges(poly);
    let n = edges.len();
    for i in 0..n {
        for j in (i + 1)..n {
            // Skip adjacent edges (they share a vertex).
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            if intersect_segments(edges[i].0, edges[i].1, edges[j].0, edges[j].1).is_some() {
                return false;
            }
        }
    }
    true
}

/// The convex hull of a footprint by Andrew's monotone chain, in CCW order.
/// Degenerate inputs (fewer than three distinct points) are returned as-is.
pub fn convex_hull(points: &[Point2]) -> Vec<Point2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut sorted: Vec<Point2> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup_by(|a, b| a.distance(*b) < GEOM_EPSILON);
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: Point2, a: Point2, b: Point2| -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point2> = vec![];
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point2> = vec![];
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Mirror `p` across the supporting line of segment AB. Returns `None` when
/// the segment is degenerate.
pub fn reflect_across_line(p: Point2, a: Point2, b: Point2) -> Option<Point2> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 < GEOM_EPSILON {
        return None;
    }
    let t = ((p.x - a.x) * dx + (p.y - a.y) * dy) / len2;
    let foot = Point2::new(a.x + t * dx, a.y + t * dy);
    Some(Point2::new(2.0 * foot.x - p.x, 2.0 * foot.y - p.y))
}

/// Signed perpendicular offset of `p` from the directed line AB. Positive on
/// the left of the direction of travel.
pub fn signed_offset(p: Point2, a: Point2, b: Point2) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len < GEOM_EPSILON {
        return 0.0;
    }
    (dx * (p.y - a.y) - dy * (p.x - a.x)) / len
}

/// The image-method geometry of a specular ground reflection for a source at
/// height `hs`, a receiver at height `hr`, and horizontal separation `d`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundReflectionGeometry {
    /// Direct source-receiver distance \[m\].
    pub r1: f64,
    /// Image-source to receiver distance, i.e. the reflected path length \[m\].
    pub r2: f64,
    /// Horizontal offset of the reflection point from the source \[m\].
    pub x_reflect: f64,
}

/// See [GroundReflectionGeometry].
pub fn ground_reflection_geometry(d: f64, hs: f64, hr: f64) -> GroundReflectionGeometry {
    let dh = hs - hr;
    let sh = hs + hr;
    GroundReflectionGeometry {
        r1: (d * d + dh * dh).sqrt(),
        r2: (d * d + sh * sh).sqrt(),
        x_reflect: if sh > 0.0 { d * hs / sh } else { 0.0 },
    }
}
