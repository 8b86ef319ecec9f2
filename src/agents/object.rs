// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Generic update/delete shared by most object kinds, including the
//! dependency cascade evaluated on every removal.

use tracing::debug;

use crate::model::{ObjectId, ObjectKind, PropertyBag};
use crate::scene::Scene;

use super::{comment, movable_line};

/// Applies a property bag to one live object. Returns `false` when the
/// id does not resolve (the change is a no-op, not an error).
pub fn update_object(scene: &mut Scene, id: &ObjectId, bag: &PropertyBag) -> bool {
    let Some(object) = scene.get_mut(id) else {
        debug!(id = %id, "update target not in scene, skipping");
        return false;
    };
    object.apply_properties(bag);
    true
}

/// Removes one object and everything its removal invalidates:
///
/// - a comment goes with its anchor-tracking point;
/// - a movable line goes with both control points (and vice versa);
/// - a vertex angle goes when any of its points or its polygon goes;
/// - a polygon is deleted outright when its live vertex count would
///   drop below two, and trimmed otherwise.
///
/// Returns the removed ids, the requested object first.
pub fn delete_object(scene: &mut Scene, id: &ObjectId) -> Vec<ObjectId> {
    let mut removed = Vec::new();
    delete_recursive(scene, id, &mut removed);
    removed
}

fn delete_recursive(scene: &mut Scene, id: &ObjectId, removed: &mut Vec<ObjectId>) {
    let Some(kind) = scene.kind_of(id) else {
        return;
    };

    match kind {
        ObjectKind::Point | ObjectKind::LinkedPoint => {
            delete_point(scene, id, removed);
        }
        ObjectKind::Polygon => {
            delete_dependents_of_kinds(
                scene,
                id,
                &[ObjectKind::VertexAngle, ObjectKind::Comment],
                removed,
            );
            remove_one(scene, id, removed);
        }
        ObjectKind::MovableLine => {
            delete_dependents_of_kinds(scene, id, &[ObjectKind::Comment], removed);
            let control_points = movable_line::control_point_ids(id);
            remove_one(scene, id, removed);
            for point_id in control_points {
                remove_one(scene, &point_id, removed);
            }
        }
        ObjectKind::Comment => {
            remove_one(scene, id, removed);
            remove_one(scene, &comment::anchor_tracker_id(id), removed);
        }
        ObjectKind::VertexAngle | ObjectKind::Image => {
            delete_dependents_of_kinds(scene, id, &[ObjectKind::Comment], removed);
            remove_one(scene, id, removed);
        }
    }
}

fn delete_point(scene: &mut Scene, id: &ObjectId, removed: &mut Vec<ObjectId>) {
    let dependents: Vec<ObjectId> = scene.dependents_of(id).to_vec();

    // Angles, comments and movable lines cannot survive a missing
    // point; polygons are judged after the removal trims them.
    let mut polygons = Vec::new();
    for dependent in dependents {
        match scene.kind_of(&dependent) {
            Some(ObjectKind::VertexAngle | ObjectKind::Comment | ObjectKind::MovableLine) => {
                delete_recursive(scene, &dependent, removed);
            }
            Some(ObjectKind::Polygon) => polygons.push(dependent),
            _ => {}
        }
    }

    remove_one(scene, id, removed);

    for polygon_id in polygons {
        if scene.live_dependencies(&polygon_id).len() < 2 {
            delete_recursive(scene, &polygon_id, removed);
        }
    }
}

fn delete_dependents_of_kinds(
    scene: &mut Scene,
    id: &ObjectId,
    kinds: &[ObjectKind],
    removed: &mut Vec<ObjectId>,
) {
    let dependents: Vec<ObjectId> = scene.dependents_of(id).to_vec();
    for dependent in dependents {
        if scene
            .kind_of(&dependent)
            .is_some_and(|kind| kinds.contains(&kind))
        {
            delete_recursive(scene, &dependent, removed);
        }
    }
}

fn remove_one(scene: &mut Scene, id: &ObjectId, removed: &mut Vec<ObjectId>) {
    if scene.remove(id).is_some() {
        removed.push(id.clone());
    }
}
