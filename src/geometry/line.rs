// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use smallvec::SmallVec;

const EPSILON: f64 = 1e-9;

/// Slope and intercept through two points; `None` for vertical lines.
pub fn slope_intercept(p1: (f64, f64), p2: (f64, f64)) -> Option<(f64, f64)> {
    let run = p2.0 - p1.0;
    if run.abs() < EPSILON {
        return None;
    }
    let slope = (p2.1 - p1.1) / run;
    let intercept = p1.1 - slope * p1.0;
    Some((slope, intercept))
}

/// The two board-edge intersection points of `y = slope * x + intercept`
/// within the bounding box `[xMin, yMax, xMax, yMin]`, with
/// corner-coincident intersections deduplicated and the result sorted
/// left-to-right.
///
/// Used both for manual slope/intercept editing and for clamping a
/// movable line's control points to the visible board.
pub fn board_edge_points(
    slope: f64,
    intercept: f64,
    bounding_box: [f64; 4],
) -> SmallVec<[(f64, f64); 2]> {
    let mut points: SmallVec<[(f64, f64); 2]> = SmallVec::new();
    if !slope.is_finite() || !intercept.is_finite() {
        return points;
    }

    let [x_min, y_max, x_max, y_min] = bounding_box;
    let mut candidates: SmallVec<[(f64, f64); 4]> = SmallVec::new();
    candidates.push((x_min, slope * x_min + intercept));
    candidates.push((x_max, slope * x_max + intercept));
    if slope.abs() > EPSILON {
        candidates.push(((y_min - intercept) / slope, y_min));
        candidates.push(((y_max - intercept) / slope, y_max));
    }

    for candidate in candidates {
        let (x, y) = candidate;
        let inside = x >= x_min - EPSILON
            && x <= x_max + EPSILON
            && y >= y_min - EPSILON
            && y <= y_max + EPSILON;
        let duplicate = points
            .iter()
            .any(|(px, py)| (px - x).abs() < EPSILON && (py - y).abs() < EPSILON);
        if inside && !duplicate {
            points.push(candidate);
        }
    }

    points.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));
    points
}

/// Display label of a movable line: a pure function of its current
/// slope/intercept, recomputed on every geometry change and never
/// persisted.
pub fn line_equation_label(p1: (f64, f64), p2: (f64, f64)) -> String {
    match slope_intercept(p1, p2) {
        None => format!("x = {}", trim2(p1.0)),
        Some((slope, intercept)) => {
            if intercept < 0.0 {
                format!("y = {}x - {}", trim2(slope), trim2(-intercept))
            } else {
                format!("y = {}x + {}", trim2(slope), trim2(intercept))
            }
        }
    }
}

fn trim2(value: f64) -> String {
    let mut s = format!("{value:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}
