// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

fn unit_square() -> Vec<Point2> {
    vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ]
}

#[test]
fn segments_crossing_at_centre() {
    let hit = intersect_segments(
        Point2::new(-1.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, -1.0),
        Point2::new(0.0, 1.0),
    )
    .unwrap();
    assert_abs_diff_eq!(hit.point.x, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(hit.point.y, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(hit.t, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(hit.u, 0.5, epsilon = 1e-12);
}

#[test]
fn parallel_segments_do_not_intersect() {
    assert!(intersect_segments(
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, 1.0),
        Point2::new(1.0, 1.0),
    )
    .is_none());
}

#[test]
fn disjoint_segments_do_not_intersect() {
    // The supporting lines cross, but outside both segments.
    assert!(intersect_segments(
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(2.0, -1.0),
        Point2::new(2.0, 1.0),
    )
    .is_none());
}

#[test]
fn endpoint_touch_counts_as_intersection() {
    // Grazing tolerance admits parameter values at the segment ends.
    let hit = intersect_segments(
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, -1.0),
        Point2::new(1.0, 1.0),
    );
    assert!(hit.is_some());
}

#[test]
fn point_in_polygon_basics() {
    let square = unit_square();
    assert!(point_in_polygon(Point2::new(0.5, 0.5), &square));
    assert!(!point_in_polygon(Point2::new(1.5, 0.5), &square));
    assert!(!point_in_polygon(Point2::new(-0.5, 0.5), &square));
    assert!(!point_in_polygon(Point2::new(0.5, 2.0), &square));
}

#[test]
fn point_in_concave_polygon() {
    // A "U" shape; the notch is outside.
    let poly = vec![
        Point2::new(0.0, 0.0),
        Point2::new(3.0, 0.0),
        Point2::new(3.0, 3.0),
        Point2::new(2.0, 3.0),
        Point2::new(2.0, 1.0),
        Point2::new(1.0, 1.0),
        Point2::new(1.0, 3.0),
        Point2::new(0.0, 3.0),
    ];
    assert!(point_in_polygon(Point2::new(0.5, 2.0), &poly));
    assert!(point_in_polygon(Point2::new(2.5, 2.0), &poly));
    assert!(!point_in_polygon(Point2::new(1.5, 2.0), &poly));
}

#[test]
fn signed_area_and_winding() {
    let square = unit_square();
    assert_abs_diff_eq!(polygon_signed_area(&square), 1.0, epsilon = 1e-12);
    let mut cw = square;
    cw.reverse();
    assert_abs_diff_eq!(polygon_signed_area(&cw), -1.0, epsilon = 1e-12);
}

#[test]
fn simple_and_self_intersecting_polygons() {
    assert!(polygon_is_simple(&unit_square()));
    // A bow tie crosses itself.
    let bow_tie = vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, 1.0),
    ];
    assert!(!polygon_is_simple(&bow_tie));
}

#[test]
fn convex_hull_of_square_with_interior_point() {
    let mut points = unit_square();
    points.push(Point2::new(0.5, 0.5));
    let hull = convex_hull(&points);
    assert_eq!(hull.len(), 4);
    assert!(hull
        .iter()
        .all(|p| !(p.x == 0.5 && p.y == 0.5)));
    // Monotone chain returns CCW winding.
    assert!(polygon_signed_area(&hull) > 0.0);
}

#[test]
fn reflect_point_across_vertical_line() {
    let image = reflect_across_line(
        Point2::new(1.0, 2.0),
        Point2::new(3.0, -1.0),
        Point2::new(3.0, 1.0),
    )
    .unwrap();
    assert_abs_diff_eq!(image.x, 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(image.y, 2.0, epsilon = 1e-12);
}

#[test]
fn reflect_across_degenerate_segment_is_none() {
    assert!(reflect_across_line(
        Point2::new(1.0, 2.0),
        Point2::new(3.0, 3.0),
        Point2::new(3.0, 3.0),
    )
    .is_none());
}

#[test]
fn signed_offset_sides() {
    let a = Point2::new(0.0, 0.0);
    let b = Point2::new(1.0, 0.0);
    assert!(signed_offset(Point2::new(0.5, 1.0), a, b) > 0.0);
    assert!(signed_offset(Point2::new(0.5, -1.0), a, b) < 0.0);
    assert_abs_diff_eq!(signed_offset(Point2::new(0.5, 0.0), a, b), 0.0, epsilon = 1e-12);
}

#[test]
fn ground_reflection_geometry_coplanar() {
    // hs = hr: the reflection point is half way and r2 exceeds r1.
    let g = ground_reflection_geometry(10.0, 1.5, 1.5);
    assert_abs_diff_eq!(g.r1, 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(g.r2, (100.0_f64 + 9.0).sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(g.x_reflect, 5.0, epsilon = 1e-12);
}

#[test]
fn ground_reflection_geometry_asymmetric() {
    let g = ground_reflection_geometry(30.0, 2.0, 4.0);
    assert_abs_diff_eq!(g.r1, (900.0_f64 + 4.0).sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(g.r2, (900.0_f64 + 36.0).sqrt(), epsilon = 1e-12);
    // The reflection point is closer to the lower endpoint.
    assert_abs_diff_eq!(g.x_reflect, 10.0, epsilon = 1e-12);
}

#[test]
fn segment_intersects_any_over_edge_list() {
    let edges = polygon_edges(&unit_square());
    assert!(segment_intersects_any(
        Point2::new(-1.0, 0.5),
        Point2::new(2.0, 0.5),
        &edges
    ));
    assert!(!segment_intersects_any(
        Point2::new(-1.0, 2.0),
        Point2::new(2.0, 2.0),
        &edges
    ));
}

#[test]
fn distances() {
    assert_abs_diff_eq!(
        Point3::new(0.0, 0.0, 0.0).distance(Point3::new(3.0, 4.0, 12.0)),
        13.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        Point2::new(1.0, 1.0).distance(Point2::new(4.0, 5.0)),
        5.0,
        epsilon = 1e-12
    );
}

#[test]
fn lerp_interpolates_all_axes() {
    let p = Point3::new(0.0, 0.0, 1.0).lerp(Point3::new(10.0, 20.0, 3.0), 0.25);
    assert_abs_diff_eq!(p.x, 2.5, epsilon = 1e-12);
    assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(p.z, 1.5, epsilon = 1e-12);
}
