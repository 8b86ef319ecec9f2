// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// > 0 when `point` is left of the directed line `from -> to`,
/// < 0 when right, 0 when collinear.
fn is_left(from: (f64, f64), to: (f64, f64), point: (f64, f64)) -> f64 {
    (to.0 - from.0) * (point.1 - from.1) - (point.0 - from.0) * (to.1 - from.1)
}

/// Winding-number point-in-polygon test.
///
/// The vertex list is treated as a closed ring; the final edge runs from
/// the last vertex back to the first. Points on an edge count as inside.
pub fn point_in_polygon(point: (f64, f64), vertices: &[(f64, f64)]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut winding = 0i32;
    for (index, &from) in vertices.iter().enumerate() {
        let to = vertices[(index + 1) % vertices.len()];
        if from.1 <= point.1 {
            if to.1 > point.1 && is_left(from, to, point) >= 0.0 {
                winding += 1;
            }
        } else if to.1 <= point.1 && is_left(from, to, point) <= 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}
