// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::Value;

use crate::geometry;
use crate::model::{ChangeRecord, PropertyBag};
use crate::scene::Scene;

use super::{AgentContext, AgentResult, ChangeAgent};

/// The board itself: axis ranges, units and names. Not an arena object;
/// it lives in the scene's board state and is never deletable.
#[derive(Debug, Default)]
pub struct BoardAgent;

fn bounding_box(bag: &PropertyBag) -> Option<[f64; 4]> {
    let entries = bag.get("boundingBox")?.as_array()?;
    if entries.len() < 4 {
        return None;
    }
    let mut bounds = [0.0; 4];
    for (slot, entry) in bounds.iter_mut().zip(entries.iter()) {
        *slot = entry.as_f64()?;
    }
    Some(bounds)
}

fn set_optional_name(target: &mut Option<String>, value: Option<&Value>) {
    if let Some(value) = value.and_then(Value::as_str) {
        *target = Some(value.to_owned());
    }
}

impl BoardAgent {
    fn apply_scale(&self, scene: &mut Scene, scale: &PropertyBag) -> AgentResult {
        let board = scene.board_mut();
        let x_min = scale.f64_prop("xMin")?;
        let y_min = scale.f64_prop("yMin")?;
        let unit_x = scale.f64_prop("unitX").unwrap_or(board.unit_x);
        let unit_y = scale.f64_prop("unitY").unwrap_or(board.unit_y);
        let canvas_width = scale.f64_prop("canvasWidth").unwrap_or(board.canvas_width);
        let canvas_height = scale.f64_prop("canvasHeight").unwrap_or(board.canvas_height);

        board.unit_x = unit_x;
        board.unit_y = unit_y;
        board.canvas_width = canvas_width;
        board.canvas_height = canvas_height;
        board.bounding_box = [
            x_min,
            y_min + canvas_height / unit_y,
            x_min + canvas_width / unit_x,
            y_min,
        ];
        set_optional_name(&mut board.x_name, scale.get("xName"));
        set_optional_name(&mut board.y_name, scale.get("yName"));
        set_optional_name(&mut board.x_annotation, scale.get("xAnnotation"));
        set_optional_name(&mut board.y_annotation, scale.get("yAnnotation"));
        Some(Vec::new())
    }
}

impl ChangeAgent for BoardAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let board = scene.board_mut();
        if let Some(bag) = change.single_properties() {
            if let Some(bounds) = bounding_box(bag) {
                board.bounding_box = bounds;
            }
            board.unit_x = bag
                .f64_prop("unitX")
                .unwrap_or(geometry::DEFAULT_PIXELS_PER_UNIT);
            board.unit_y = bag
                .f64_prop("unitY")
                .unwrap_or(geometry::DEFAULT_PIXELS_PER_UNIT);
            if let Some(width) = bag.f64_prop("canvasWidth") {
                board.canvas_width = width;
            }
            if let Some(height) = bag.f64_prop("canvasHeight") {
                board.canvas_height = height;
            }
            set_optional_name(&mut board.x_name, bag.get("xName"));
            set_optional_name(&mut board.y_name, bag.get("yName"));
            set_optional_name(&mut board.x_annotation, bag.get("xAnnotation"));
            set_optional_name(&mut board.y_annotation, bag.get("yAnnotation"));
        }
        board.ready = true;
        Some(Vec::new())
    }

    fn update(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let bag = change.single_properties()?;
        if let Some(scale) = bag.get("boardScale").and_then(Value::as_object) {
            return self.apply_scale(scene, &PropertyBag(scale.clone()));
        }

        let board = scene.board_mut();
        if let Some(bounds) = bounding_box(bag) {
            board.bounding_box = bounds;
        }
        if let Some(unit_x) = bag.f64_prop("unitX") {
            board.unit_x = unit_x;
        }
        if let Some(unit_y) = bag.f64_prop("unitY") {
            board.unit_y = unit_y;
        }
        set_optional_name(&mut board.x_name, bag.get("xName"));
        set_optional_name(&mut board.y_name, bag.get("yName"));
        set_optional_name(&mut board.x_annotation, bag.get("xAnnotation"));
        set_optional_name(&mut board.y_annotation, bag.get("yAnnotation"));
        Some(Vec::new())
    }

    fn delete(&self, _scene: &mut Scene, _change: &ChangeRecord) -> AgentResult {
        // The board's creation is the first log record and is never
        // undone or deleted.
        None
    }
}
