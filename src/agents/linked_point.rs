// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Points driven by an external tabular source, and the table-link
//! records that create/update/delete them in bulk.

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{
    coord_pair, linked_point_parts, ChangeRecord, ObjectId, ObjectKind, SourceId,
};
use crate::scene::Scene;

use super::{
    attributes_from_bag, flat_coord_parents, object, target_or_bag_id, AgentContext, AgentResult,
    ChangeAgent, LinkedDataSource,
};

#[derive(Debug, Default)]
pub struct LinkedPointAgent;

fn insert_linked_point(
    scene: &mut Scene,
    source: &dyn LinkedDataSource,
    id: ObjectId,
    position: Option<(f64, f64)>,
    mut attributes: serde_json::Map<String, Value>,
) -> Option<ObjectId> {
    attributes.insert(
        "linkedSourceId".to_owned(),
        Value::String(source.source_id().to_string()),
    );
    if let Some((row_id, column_id)) = linked_point_parts(&id) {
        if let Some(color) = source.link_color(&column_id) {
            attributes.insert("linkColor".to_owned(), Value::String(color));
        }
        attributes.insert("linkedRowId".to_owned(), Value::String(row_id.into_string()));
        attributes.insert(
            "linkedColId".to_owned(),
            Value::String(column_id.into_string()),
        );
    }

    scene
        .insert(id.clone(), ObjectKind::LinkedPoint, position, attributes, Vec::new())
        .then_some(id)
}

impl ChangeAgent for LinkedPointAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        ctx: &AgentContext<'_>,
    ) -> AgentResult {
        // No registered link resolver means the point cannot be colored
        // or kept in sync; the record is a no-op, not an error.
        let Some(source) = ctx.data_source else {
            debug!("linked point create without a registered data source, skipping");
            return None;
        };

        let id = target_or_bag_id(change)?;
        let [x, y] = flat_coord_parents(change);
        let position = match (x, y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };
        let attributes = attributes_from_bag(change.single_properties(), &[]);
        let created = insert_linked_point(scene, source, id, position, attributes)?;
        Some(vec![created])
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

/// Bulk agent for `tableLink` records. A create carries parallel `ids`
/// and `points` lists in its property bag; a delete removes every point
/// of the source; an update only triggers the axis-label resync hook.
#[derive(Debug, Default)]
pub struct TableLinkAgent;

impl TableLinkAgent {
    fn source_id_of(change: &ChangeRecord) -> Option<SourceId> {
        SourceId::new(change.target_ids().first()?.as_str()).ok()
    }

    /// Ids of every live point belonging to `source_id`, creation order.
    fn points_of_source(scene: &Scene, source_id: &SourceId) -> Vec<ObjectId> {
        scene
            .objects_in_creation_order()
            .into_iter()
            .filter(|object| {
                object.kind() == ObjectKind::LinkedPoint
                    && object.str_attribute("linkedSourceId") == Some(source_id.as_str())
            })
            .map(|object| object.id().clone())
            .collect()
    }
}

impl ChangeAgent for TableLinkAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let Some(source) = ctx.data_source else {
            debug!("table link create without a registered data source, skipping");
            return None;
        };
        let bag = change.single_properties()?;
        let Some(ids) = bag.get("ids").and_then(Value::as_array) else {
            warn!("table link create without an ids list, skipping");
            return None;
        };
        let points = bag.get("points").and_then(Value::as_array);

        let mut created = Vec::new();
        for (index, id_value) in ids.iter().enumerate() {
            let Some(id) = id_value.as_str().and_then(|s| ObjectId::new(s).ok()) else {
                continue;
            };
            let entry = points.and_then(|points| points.get(index));
            let coords = entry
                .and_then(|entry| entry.get("coords"))
                .and_then(coord_pair);
            let position = match coords {
                Some([Some(x), Some(y)]) => Some((x, y)),
                _ => None,
            };
            let mut attributes = serde_json::Map::new();
            if let Some(label) = entry
                .and_then(|entry| entry.get("label"))
                .and_then(Value::as_str)
            {
                attributes.insert("name".to_owned(), Value::String(label.to_owned()));
            }
            if let Some(id) = insert_linked_point(scene, source, id, position, attributes) {
                created.push(id);
            }
        }
        Some(created)
    }

    fn update(&self, _scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        // Axis-label refresh; the did-apply hook does the work.
        Self::source_id_of(change)?;
        Some(Vec::new())
    }

    fn delete(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let source_id = Self::source_id_of(change)?;
        let ids = Self::points_of_source(scene, &source_id);
        let mut removed = Vec::new();
        // Dependents (e.g. polygons over linked points) are evaluated in
        // reverse creation order, newest first.
        for id in ids.iter().rev() {
            removed.extend(object::delete_object(scene, id));
        }
        (!removed.is_empty()).then_some(removed)
    }
}
