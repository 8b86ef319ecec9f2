// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Supporting geometry calculations: board bounds/unit derivation, line
//! clamping against the visible board, and the winding-number
//! point-in-polygon test.

pub mod bounds;
pub mod line;
pub mod winding;

pub use bounds::{
    axis_units, board_bounds, buffered_bounding_box, pixels_per_unit, user_bounding_box,
    AXIS_BUFFER, DEFAULT_AXIS_MIN, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH,
    DEFAULT_PIXELS_PER_UNIT,
};
pub use line::{board_edge_points, line_equation_label, slope_intercept};
pub use winding::point_in_polygon;
