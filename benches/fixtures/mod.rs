// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::json;

/// A synthetic change log: the board, `points` free points, a polygon
/// every `polygon_stride` points, and a position update per point.
pub fn synthetic_log(points: usize, polygon_stride: usize) -> Vec<String> {
    let mut changes = Vec::with_capacity(points * 2 + 2);
    changes.push(
        json!({
            "operation": "create",
            "target": "board",
            "properties": { "axis": true, "boundingBox": [-2, 15, 22, -1], "unitX": 20, "unitY": 20 }
        })
        .to_string(),
    );

    for index in 0..points {
        let x = (index % 24) as f64;
        let y = (index % 16) as f64;
        changes.push(
            json!({
                "operation": "create",
                "target": "point",
                "parents": [x, y],
                "properties": { "id": format!("pt_{index:06}") }
            })
            .to_string(),
        );
    }

    if polygon_stride >= 2 {
        for (polygon_index, chunk_start) in (0..points).step_by(polygon_stride).enumerate() {
            let vertex_ids: Vec<String> = (chunk_start..(chunk_start + polygon_stride).min(points))
                .map(|index| format!("pt_{index:06}"))
                .collect();
            if vertex_ids.len() < 2 {
                continue;
            }
            changes.push(
                json!({
                    "operation": "create",
                    "target": "polygon",
                    "parents": vertex_ids,
                    "properties": { "id": format!("poly_{polygon_index:04}") }
                })
                .to_string(),
            );
        }
    }

    for index in 0..points {
        let x = ((index + 7) % 24) as f64;
        let y = ((index + 3) % 16) as f64;
        changes.push(
            json!({
                "operation": "update",
                "target": "point",
                "targetID": format!("pt_{index:06}"),
                "properties": { "position": [x, y] }
            })
            .to_string(),
        );
    }

    changes
}
