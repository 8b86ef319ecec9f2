// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Selection state, including the bridge to an external shared
//! selection keyed by tabular row ids for linked points.

use std::collections::BTreeMap;

use crate::model::{linked_point_parts, ObjectId, ObjectKind, RowId, SourceId};
use crate::scene::Scene;

/// External shared-selection store. Selecting a linked point mirrors
/// into it by row; any source selecting a row reflects back here.
pub trait SharedSelection {
    fn select(&mut self, source_id: &SourceId, row_id: &RowId, selected: bool);
    fn is_row_selected(&self, row_id: &RowId) -> bool;
}

#[derive(Default)]
pub struct SelectionSet {
    selection: BTreeMap<ObjectId, bool>,
    shared: Option<Box<dyn SharedSelection>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_shared(&mut self, shared: Box<dyn SharedSelection>) {
        self.shared = Some(shared);
    }

    pub fn is_selected(&self, id: &ObjectId) -> bool {
        if self.selection.get(id).copied().unwrap_or(false) {
            return true;
        }
        if let Some(shared) = &self.shared {
            if let Some((row_id, _)) = linked_point_parts(id) {
                return shared.is_row_selected(&row_id);
            }
        }
        false
    }

    pub fn has_selection(&self) -> bool {
        self.selection.values().any(|selected| *selected)
    }

    pub fn set_selected(&mut self, scene: Option<&Scene>, id: &ObjectId, selected: bool) {
        if self.is_selected(id) == selected {
            return;
        }
        self.selection.insert(id.clone(), selected);

        // Mirror linked points into the external shared selection.
        let link = scene.and_then(|scene| {
            let object = scene.get(id)?;
            let source_id = SourceId::new(object.str_attribute("linkedSourceId")?).ok()?;
            let row_id = RowId::new(object.str_attribute("linkedRowId")?).ok()?;
            Some((source_id, row_id))
        });
        if let (Some(shared), Some((source_id, row_id))) = (&mut self.shared, link) {
            shared.select(&source_id, &row_id, selected);
        }
    }

    pub fn deselect_all(&mut self, scene: Option<&Scene>) {
        let ids: Vec<ObjectId> = self.selection.keys().cloned().collect();
        for id in ids {
            self.set_selected(scene, &id, false);
        }
    }

    /// Selected ids in creation order.
    pub fn selected_ids(&self, scene: &Scene) -> Vec<ObjectId> {
        scene
            .ids_in_creation_order()
            .into_iter()
            .filter(|id| self.is_selected(id))
            .collect()
    }

    /// Selected ids the user may delete, excluding fixed/protected
    /// objects, in creation order.
    pub fn deletable_selected_ids(&self, scene: &Scene) -> Vec<ObjectId> {
        scene
            .objects_in_creation_order()
            .into_iter()
            .filter(|object| {
                self.is_selected(object.id()) && !object.is_fixed() && !object.is_undeletable()
            })
            .map(|object| object.id().clone())
            .collect()
    }

    /// The selection expanded with dependents that are fully enclosed by
    /// it: a polygon or vertex angle joins once every point backing it
    /// is individually selected.
    pub fn selected_ids_and_children(&self, scene: &Scene) -> Vec<ObjectId> {
        let mut selected = self.selected_ids(scene);

        let mut candidates: Vec<ObjectId> = Vec::new();
        for id in &selected {
            for dependent in scene.dependents_of(id) {
                let copyable = matches!(
                    scene.kind_of(dependent),
                    Some(ObjectKind::Polygon | ObjectKind::VertexAngle)
                );
                if copyable && !self.is_selected(dependent) && !candidates.contains(dependent) {
                    candidates.push(dependent.clone());
                }
            }
        }

        let mut included: Vec<ObjectId> = candidates
            .into_iter()
            .filter(|candidate| {
                scene
                    .dependencies_of(candidate)
                    .iter()
                    .filter(|dependency| {
                        matches!(
                            scene.kind_of(dependency),
                            Some(ObjectKind::Point | ObjectKind::LinkedPoint)
                        )
                    })
                    .all(|dependency| self.is_selected(dependency))
            })
            .collect();
        included.sort_by_key(|id| scene.creation_index(id));
        selected.extend(included);
        selected
    }
}
