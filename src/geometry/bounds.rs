// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Fixed logical canvas the unit arithmetic is defined against. A board
/// exported with `unitX = 20` spans `480 / 20 = 24` horizontal units.
pub const DEFAULT_CANVAS_WIDTH: f64 = 480.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 320.0;
pub const DEFAULT_PIXELS_PER_UNIT: f64 = 18.3;
pub const DEFAULT_AXIS_MIN: f64 = -1.0;

/// Pixel margin reserved along each canvas edge for the axis area.
pub const AXIS_BUFFER: f64 = 25.0;

/// Pixels-per-unit for each axis from a desired coordinate range.
///
/// A single-value range is treated as the vertical range and mirrored to
/// both axes so square boards stay square.
pub fn axis_units(proto_range: Option<&[f64]>) -> (f64, f64) {
    match proto_range {
        None | Some([]) => (DEFAULT_PIXELS_PER_UNIT, DEFAULT_PIXELS_PER_UNIT),
        Some([y_range]) => {
            let unit = DEFAULT_CANVAS_HEIGHT / y_range;
            (unit, unit)
        }
        Some([x_range, y_range, ..]) => (
            DEFAULT_CANVAS_WIDTH / x_range,
            DEFAULT_CANVAS_HEIGHT / y_range,
        ),
    }
}

/// The user-visible bounding box `[xMin, yMax, xMax, yMin]` spanned by
/// the default canvas at the derived units.
pub fn board_bounds(axis_min: Option<[f64; 2]>, proto_range: Option<&[f64]>) -> [f64; 4] {
    let [x_min, y_min] = axis_min.unwrap_or([DEFAULT_AXIS_MIN, DEFAULT_AXIS_MIN]);
    let (unit_x, unit_y) = axis_units(proto_range);
    let x_max = x_min + DEFAULT_CANVAS_WIDTH / unit_x;
    let y_max = y_min + DEFAULT_CANVAS_HEIGHT / unit_y;
    [x_min, y_max, x_max, y_min]
}

/// Expands a user-visible bounding box into the internal one by adding
/// the axis buffer margins (doubled on the left edge, where the y-axis
/// labels live).
pub fn buffered_bounding_box(user: [f64; 4], unit_x: f64, unit_y: f64) -> [f64; 4] {
    let [x_min, y_max, x_max, y_min] = user;
    let x_buffer = AXIS_BUFFER / unit_x;
    let y_buffer = AXIS_BUFFER / unit_y;
    [
        x_min - x_buffer * 2.0,
        y_max + y_buffer,
        x_max + x_buffer,
        y_min - y_buffer,
    ]
}

/// Inverse of [`buffered_bounding_box`]: recovers the bounding box the
/// user intended from the internal, buffered one.
pub fn user_bounding_box(internal: [f64; 4], unit_x: f64, unit_y: f64) -> [f64; 4] {
    let [x_min, y_max, x_max, y_min] = internal;
    let x_buffer = AXIS_BUFFER / unit_x;
    let y_buffer = AXIS_BUFFER / unit_y;
    [
        x_min + x_buffer * 2.0,
        y_max - y_buffer,
        x_max - x_buffer,
        y_min + y_buffer,
    ]
}

/// Pixels-per-unit for a canvas dimension after subtracting the axis
/// buffer from both ends.
pub fn pixels_per_unit(canvas_px: f64, range_min: f64, range_max: f64) -> f64 {
    (canvas_px - AXIS_BUFFER * 2.0) / (range_max - range_min)
}

#[cfg(test)]
mod tests {
    use super::{
        axis_units, board_bounds, buffered_bounding_box, pixels_per_unit, user_bounding_box,
        DEFAULT_PIXELS_PER_UNIT,
    };

    #[test]
    fn units_default_when_no_range_given() {
        assert_eq!(
            axis_units(None),
            (DEFAULT_PIXELS_PER_UNIT, DEFAULT_PIXELS_PER_UNIT)
        );
    }

    #[test]
    fn single_range_value_mirrors_vertical_units() {
        let (unit_x, unit_y) = axis_units(Some(&[10.0]));
        assert_eq!(unit_x, 32.0);
        assert_eq!(unit_y, 32.0);
    }

    #[test]
    fn range_pair_derives_each_axis() {
        let (unit_x, unit_y) = axis_units(Some(&[24.0, 16.0]));
        assert_eq!(unit_x, 20.0);
        assert_eq!(unit_y, 20.0);
    }

    #[test]
    fn board_bounds_span_the_canvas() {
        let bounds = board_bounds(Some([-2.0, -1.0]), Some(&[24.0, 16.0]));
        assert_eq!(bounds, [-2.0, 15.0, 22.0, -1.0]);
    }

    #[test]
    fn buffered_and_user_bounds_invert() {
        let user = [-2.0, 15.0, 22.0, -1.0];
        let internal = buffered_bounding_box(user, 20.0, 20.0);
        let recovered = user_bounding_box(internal, 20.0, 20.0);
        for (a, b) in recovered.iter().zip(user.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn pixels_per_unit_subtracts_buffers() {
        assert_eq!(pixels_per_unit(850.0, 0.0, 16.0), 50.0);
    }
}
