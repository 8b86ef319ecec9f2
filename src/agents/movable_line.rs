// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Movable line: a compound of two control points, the line itself, and
//! a renderer-computed equation label, created and deleted as one unit.

use serde_json::{Map, Value};

use crate::geometry;
use crate::model::{coord_pair, ChangeRecord, ObjectId, ObjectKind};
use crate::scene::Scene;

use super::{attributes_from_bag, object, target_or_bag_id, AgentContext, AgentResult, ChangeAgent};

/// Derived ids of a line's two control points. The control points are
/// never independently addressable by the end user, but they are
/// ordinary points internally so generic update/delete reaches them.
pub fn control_point_ids(line_id: &ObjectId) -> [ObjectId; 2] {
    [
        ObjectId::new(format!("{line_id}-point1")).expect("non-empty id"),
        ObjectId::new(format!("{line_id}-point2")).expect("non-empty id"),
    ]
}

/// The owning line of a control-point id, by suffix.
pub fn line_id_of_control_point(id: &ObjectId) -> Option<ObjectId> {
    let line = id
        .as_str()
        .strip_suffix("-point1")
        .or_else(|| id.as_str().strip_suffix("-point2"))?;
    ObjectId::new(line).ok()
}

/// Equation label of a live line: a pure function of the current
/// control-point geometry, recomputed on every change, never stored.
pub fn line_label(scene: &Scene, line_id: &ObjectId) -> Option<String> {
    let [p1, p2] = control_point_ids(line_id);
    Some(geometry::line_equation_label(
        scene.position(&p1)?,
        scene.position(&p2)?,
    ))
}

#[derive(Debug, Default)]
pub struct MovableLineAgent;

fn control_point_attributes(bag: Option<&Value>) -> Map<String, Value> {
    let mut attributes = Map::new();
    if let Some(Value::Object(entries)) = bag {
        for (key, value) in entries {
            if key != "id" && key != "position" {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }
    attributes
}

impl ChangeAgent for MovableLineAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let parents = change.parents.as_deref()?;
        let [Some(x1), Some(y1)] = coord_pair(parents.first()?)? else {
            return None;
        };
        let [Some(x2), Some(y2)] = coord_pair(parents.get(1)?)? else {
            return None;
        };

        let id = target_or_bag_id(change).unwrap_or_else(ObjectId::generate);
        let bag = change.single_properties();
        let [p1_id, p2_id] = control_point_ids(&id);

        let p1_attrs = control_point_attributes(bag.and_then(|b| b.get("pt1")));
        let p2_attrs = control_point_attributes(bag.and_then(|b| b.get("pt2")));
        if !scene.insert(p1_id.clone(), ObjectKind::Point, Some((x1, y1)), p1_attrs, Vec::new()) {
            return None;
        }
        if !scene.insert(p2_id.clone(), ObjectKind::Point, Some((x2, y2)), p2_attrs, Vec::new()) {
            scene.remove(&p1_id);
            return None;
        }

        let attributes = attributes_from_bag(bag, &["pt1", "pt2"]);
        if !scene.insert(
            id.clone(),
            ObjectKind::MovableLine,
            None,
            attributes,
            vec![p1_id.clone(), p2_id.clone()],
        ) {
            scene.remove(&p1_id);
            scene.remove(&p2_id);
            return None;
        }

        Some(vec![id, p1_id, p2_id])
    }

    fn update(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let id = change.target_ids().first()?;
        let bag = change.single_properties()?;
        object::update_object(scene, id, bag).then(Vec::new)
    }

    fn delete(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let id = change.target_ids().first()?;
        let removed = object::delete_object(scene, id);
        (!removed.is_empty()).then_some(removed)
    }
}
