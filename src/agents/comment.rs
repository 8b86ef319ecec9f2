// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Comments/annotations anchored to another object. The anchor-tracking
//! point follows the anchor's live centroid; the leader line and text
//! layout belong to the renderer.

use serde_json::Value;

use crate::model::{ChangeRecord, ObjectId, ObjectKind};
use crate::scene::Scene;

use super::{attributes_from_bag, flat_coord_parents, object, target_or_bag_id, AgentContext,
    AgentResult, ChangeAgent};

/// Derived id of the invisible point that tracks the anchor centroid.
pub fn anchor_tracker_id(comment_id: &ObjectId) -> ObjectId {
    ObjectId::new(format!("{comment_id}-anchor")).expect("non-empty id")
}

/// Anchor ids named by a comment record (`anchor` or `anchors`).
fn anchor_ids(change: &ChangeRecord) -> Vec<ObjectId> {
    let Some(bag) = change.single_properties() else {
        return Vec::new();
    };
    if let Some(anchor) = bag.str_prop("anchor") {
        return ObjectId::new(anchor).into_iter().collect();
    }
    bag.get("anchors")
        .and_then(Value::as_array)
        .map(|anchors| {
            anchors
                .iter()
                .filter_map(|value| ObjectId::new(value.as_str()?).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Live position the anchor tracker reports: the mean of the anchors'
/// current centroids. Re-evaluated each call, never persisted.
pub fn anchor_position(scene: &Scene, comment_id: &ObjectId) -> Option<(f64, f64)> {
    let anchors = scene.dependencies_of(comment_id);
    let mut x_sum = 0.0;
    let mut y_sum = 0.0;
    let mut count = 0usize;
    for anchor in anchors {
        if let Some((x, y)) = scene.centroid_of(anchor) {
            x_sum += x;
            y_sum += y;
            count += 1;
        }
    }
    (count > 0).then(|| (x_sum / count as f64, y_sum / count as f64))
}

/// Where the comment text sits: the live anchor centroid plus the
/// stored centroid-relative offset.
pub fn comment_position(scene: &Scene, comment_id: &ObjectId) -> Option<(f64, f64)> {
    let centroid = anchor_position(scene, comment_id)?;
    let offset = scene
        .get(comment_id)
        .and_then(|object| object.attribute("offset"))
        .and_then(crate::model::coord_pair);
    match offset {
        Some([Some(dx), Some(dy)]) => Some((centroid.0 + dx, centroid.1 + dy)),
        _ => Some(centroid),
    }
}

#[derive(Debug, Default)]
pub struct CommentAgent;

impl ChangeAgent for CommentAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let anchors: Vec<ObjectId> = anchor_ids(change)
            .into_iter()
            .filter(|anchor| scene.contains(anchor))
            .collect();
        if anchors.is_empty() {
            return None;
        }

        let id = target_or_bag_id(change).unwrap_or_else(ObjectId::generate);
        let mut attributes = attributes_from_bag(change.single_properties(), &[]);

        // An explicit `parents` pair is the centroid-relative offset.
        if let [Some(dx), Some(dy)] = flat_coord_parents(change) {
            attributes.insert(
                "offset".to_owned(),
                crate::model::coord_value(dx, dy),
            );
        }

        let tracker_id = anchor_tracker_id(&id);
        let tracker_position = anchors
            .first()
            .and_then(|anchor| scene.centroid_of(anchor));
        let mut tracker_attrs = serde_json::Map::new();
        tracker_attrs.insert("visible".to_owned(), Value::Bool(false));
        if !scene.insert(
            tracker_id.clone(),
            ObjectKind::Point,
            tracker_position,
            tracker_attrs,
            Vec::new(),
        ) {
            return None;
        }

        let position = {
            let centroid = tracker_position;
            match (centroid, attributes.get("offset").and_then(crate::model::coord_pair)) {
                (Some((cx, cy)), Some([Some(dx), Some(dy)])) => Some((cx + dx, cy + dy)),
                (centroid, _) => centroid,
            }
        };

        if !scene.insert(id.clone(), ObjectKind::Comment, position, attributes, anchors) {
            scene.remove(&tracker_id);
            return None;
        }

        Some(vec![id, tracker_id])
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
