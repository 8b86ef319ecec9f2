// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::model::{ChangeRecord, ObjectId, ObjectKind};
use crate::scene::Scene;

use super::{
    attributes_from_bag, flat_coord_parents, object, target_or_bag_id, AgentContext, AgentResult,
    ChangeAgent,
};

/// Grid snap increment applied to interactively created points.
pub const SNAP_UNIT: f64 = 0.1;

#[derive(Debug, Default)]
pub struct PointAgent;

impl ChangeAgent for PointAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let id = target_or_bag_id(change).unwrap_or_else(ObjectId::generate);
        let [x, y] = flat_coord_parents(change);
        let position = match (x, y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };
        let attributes = attributes_from_bag(change.single_properties(), &[]);

        scene
            .insert(id.clone(), ObjectKind::Point, position, attributes, Vec::new())
            .then(|| vec![id])
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
