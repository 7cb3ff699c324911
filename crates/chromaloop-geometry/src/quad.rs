// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral canonicalization.

use chromaloop_core::Quadrilateral;

/// Reorder four points so they start at the top-left corner and run
/// clockwise (in image coordinates, y down).
///
/// The top-left point is the one with the smallest `x + y`; ties go to the
/// earliest point in input order. The traversal direction is read off the
/// point that follows top-left in the input: if it lies further right, the
/// input order is kept, otherwise it is reversed.
///
/// Duplicate points give an unspecified but well-formed result.
pub fn canonicalize(quad: &Quadrilateral) -> Quadrilateral {
    let points = quad.points();

    let mut top_left = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let best = points[top_left];
        if p.x + p.y < best.x + best.y {
            top_left = i;
        }
    }

    let next = points[(top_left + 1) % 4];
    let step: isize = if next.x > points[top_left].x { 1 } else { -1 };

    Quadrilateral::new(std::array::from_fn(|i| {
        let idx = (top_left as isize + step * i as isize).rem_euclid(4) as usize;
        points[idx]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromaloop_core::Point2D;

    fn quad(pairs: [(f64, f64); 4]) -> Quadrilateral {
        Quadrilateral::from_pairs(pairs)
    }

    #[test]
    fn reverses_counter_clockwise_input() {
        let input = quad([(10.0, 10.0), (0.0, 10.0), (0.0, 0.0), (10.0, 0.0)]);
        let expected = quad([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert_eq!(canonicalize(&input), expected);
    }

    #[test]
    fn rotates_clockwise_input_to_top_left() {
        let input = quad([(471.0, 614.0), (462.0, 214.0), (1424.0, 214.0), (1415.0, 610.0)]);
        let out = canonicalize(&input);
        assert_eq!(out.points()[0], Point2D::new(462.0, 214.0));
        assert_eq!(out.points()[1], Point2D::new(1424.0, 214.0));
        assert_eq!(out.points()[2], Point2D::new(1415.0, 610.0));
        assert_eq!(out.points()[3], Point2D::new(471.0, 614.0));
    }

    #[test]
    fn reverses_when_neighbour_is_below() {
        let input = quad([(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]);
        let expected = quad([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert_eq!(canonicalize(&input), expected);
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let inputs = [
            quad([(10.0, 10.0), (0.0, 10.0), (0.0, 0.0), (10.0, 0.0)]),
            quad([(38.0, 30.0), (160.0, 24.0), (171.0, 140.0), (30.0, 133.0)]),
            quad([(171.0, 140.0), (160.0, 24.0), (38.0, 30.0), (30.0, 133.0)]),
            quad([(5.0, 1.0), (1.0, 5.0), (9.0, 9.0), (12.0, 2.0)]),
        ];
        for q in inputs {
            let once = canonicalize(&q);
            assert_eq!(canonicalize(&once), once, "input {q:?}");
        }
    }

    #[test]
    fn ties_resolve_to_first_occurrence() {
        // (0, 4) and (4, 0) share the minimal coordinate sum.
        let input = quad([(4.0, 0.0), (10.0, 6.0), (6.0, 10.0), (0.0, 4.0)]);
        let out = canonicalize(&input);
        assert_eq!(out.points()[0], Point2D::new(4.0, 0.0));
        assert_eq!(out.points()[1], Point2D::new(10.0, 6.0));
    }

    #[test]
    fn duplicate_points_do_not_panic() {
        let input = quad([(1.0, 1.0); 4]);
        let out = canonicalize(&input);
        assert_eq!(out.points()[0], Point2D::new(1.0, 1.0));
    }
}
