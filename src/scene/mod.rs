// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The live scene graph: an arena of objects addressed by stable ids
//! plus explicit dependency/dependent adjacency, and the board state.
//!
//! The arena is the single source of truth for an object's kind; there
//! are no element-to-element pointers, so no reference cycles. Only the
//! engine/dispatcher entry points mutate it.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::geometry;
use crate::model::{ObjectId, ObjectKind, PropertyBag};

/// One live diagram object.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    id: ObjectId,
    kind: ObjectKind,
    position: Option<(f64, f64)>,
    name: Option<String>,
    visible: bool,
    attributes: Map<String, Value>,
    dependencies: Vec<ObjectId>,
    dependents: Vec<ObjectId>,
    creation_index: u64,
}

impl SceneObject {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_owned(), value);
    }

    pub fn bool_attribute(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn str_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)?.as_str()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn is_fixed(&self) -> bool {
        self.bool_attribute("fixed")
    }

    pub fn is_undeletable(&self) -> bool {
        self.bool_attribute("undeletable")
    }

    pub fn dependencies(&self) -> &[ObjectId] {
        &self.dependencies
    }

    pub fn dependents(&self) -> &[ObjectId] {
        &self.dependents
    }

    pub fn creation_index(&self) -> u64 {
        self.creation_index
    }

    /// Folds a property bag into the object the way a generic update
    /// does: position, name and visibility are interpreted, everything
    /// else lands in the attribute bag.
    pub fn apply_properties(&mut self, bag: &PropertyBag) {
        for (key, value) in &bag.0 {
            match key.as_str() {
                "position" => {
                    if let Some([Some(x), Some(y)]) = bag.position() {
                        self.position = Some((x, y));
                    }
                }
                "name" => self.name = value.as_str().map(ToOwned::to_owned),
                "visible" => {
                    if let Some(visible) = value.as_bool() {
                        self.visible = visible;
                    }
                }
                _ => {
                    self.attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Board-level state mutated only by the board agent.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    pub ready: bool,
    pub bounding_box: [f64; 4],
    pub unit_x: f64,
    pub unit_y: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub x_name: Option<String>,
    pub y_name: Option<String>,
    pub x_annotation: Option<String>,
    pub y_annotation: Option<String>,
    pub x_axis_label: Option<String>,
    pub y_axis_label: Option<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            ready: false,
            bounding_box: geometry::board_bounds(None, None),
            unit_x: geometry::DEFAULT_PIXELS_PER_UNIT,
            unit_y: geometry::DEFAULT_PIXELS_PER_UNIT,
            canvas_width: geometry::DEFAULT_CANVAS_WIDTH,
            canvas_height: geometry::DEFAULT_CANVAS_HEIGHT,
            x_name: None,
            y_name: None,
            x_annotation: None,
            y_annotation: None,
            x_axis_label: None,
            y_axis_label: None,
        }
    }
}

impl BoardState {
    /// The bounding box the user intended, with axis buffers removed.
    pub fn user_bounding_box(&self) -> [f64; 4] {
        geometry::user_bounding_box(self.bounding_box, self.unit_x, self.unit_y)
    }

    pub fn sync_axis_labels(&mut self, x_label: String, y_label: String) {
        self.x_axis_label = Some(x_label);
        self.y_axis_label = Some(y_label);
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Scene {
    objects: HashMap<ObjectId, SceneObject>,
    next_creation_index: u64,
    board: BoardState,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut BoardState {
        &mut self.board
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    pub fn kind_of(&self, id: &ObjectId) -> Option<ObjectKind> {
        Some(self.objects.get(id)?.kind())
    }

    pub fn position(&self, id: &ObjectId) -> Option<(f64, f64)> {
        self.objects.get(id)?.position()
    }

    pub fn set_position(&mut self, id: &ObjectId, position: Option<(f64, f64)>) {
        if let Some(object) = self.objects.get_mut(id) {
            object.position = position;
        }
    }

    /// Inserts a new object, wiring adjacency in both directions.
    /// Returns `false` (and leaves the scene unchanged) when the id is
    /// already taken.
    pub fn insert(
        &mut self,
        id: ObjectId,
        kind: ObjectKind,
        position: Option<(f64, f64)>,
        attributes: Map<String, Value>,
        dependencies: Vec<ObjectId>,
    ) -> bool {
        if self.objects.contains_key(&id) {
            return false;
        }

        let creation_index = self.next_creation_index;
        self.next_creation_index += 1;

        let name = attributes
            .get("name")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        let visible = attributes
            .get("visible")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        for dependency in &dependencies {
            if let Some(parent) = self.objects.get_mut(dependency) {
                parent.dependents.push(id.clone());
            }
        }

        self.objects.insert(
            id.clone(),
            SceneObject {
                id,
                kind,
                position,
                name,
                visible,
                attributes,
                dependencies,
                dependents: Vec::new(),
                creation_index,
            },
        );
        true
    }

    /// Removes one object and detaches it from the adjacency lists of
    /// its neighbors. Cascade decisions belong to the agents; a removed
    /// dependency is simply trimmed from its dependents here.
    pub fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let removed = self.objects.remove(id)?;
        for dependency in &removed.dependencies {
            if let Some(parent) = self.objects.get_mut(dependency) {
                parent.dependents.retain(|d| d != id);
            }
        }
        for dependent in &removed.dependents {
            if let Some(child) = self.objects.get_mut(dependent) {
                child.dependencies.retain(|d| d != id);
            }
        }
        Some(removed)
    }

    /// Rewires an object's dependency list in place, keeping its
    /// creation index. Used by vertex-list updates on polygons.
    pub fn set_dependencies(&mut self, id: &ObjectId, dependencies: Vec<ObjectId>) -> bool {
        if !self.objects.contains_key(id) {
            return false;
        }
        let old = self
            .objects
            .get(id)
            .map(|object| object.dependencies.clone())
            .unwrap_or_default();
        for dependency in &old {
            if let Some(parent) = self.objects.get_mut(dependency) {
                parent.dependents.retain(|d| d != id);
            }
        }
        for dependency in &dependencies {
            if let Some(parent) = self.objects.get_mut(dependency) {
                parent.dependents.push(id.clone());
            }
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.dependencies = dependencies;
        }
        true
    }

    pub fn dependents_of(&self, id: &ObjectId) -> &[ObjectId] {
        self.objects.get(id).map_or(&[], SceneObject::dependents)
    }

    pub fn dependencies_of(&self, id: &ObjectId) -> &[ObjectId] {
        self.objects.get(id).map_or(&[], SceneObject::dependencies)
    }

    /// Dependencies that still resolve to live objects.
    pub fn live_dependencies(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.dependencies_of(id)
            .iter()
            .filter(|dep| self.objects.contains_key(*dep))
            .cloned()
            .collect()
    }

    pub fn ids_in_creation_order(&self) -> Vec<ObjectId> {
        let mut entries: Vec<_> = self
            .objects
            .values()
            .map(|object| (object.creation_index, object.id.clone()))
            .collect();
        entries.sort_by_key(|(index, _)| *index);
        entries.into_iter().map(|(_, id)| id).collect()
    }

    pub fn objects_in_creation_order(&self) -> Vec<&SceneObject> {
        let mut objects: Vec<_> = self.objects.values().collect();
        objects.sort_by_key(|object| object.creation_index);
        objects
    }

    pub fn creation_index(&self, id: &ObjectId) -> Option<u64> {
        Some(self.objects.get(id)?.creation_index)
    }

    /// Live centroid of an object: a point's own coordinates, or the
    /// mean of a polygon's/movable line's live vertex positions.
    /// Re-evaluated from current geometry on every call, never stored.
    pub fn centroid_of(&self, id: &ObjectId) -> Option<(f64, f64)> {
        let object = self.objects.get(id)?;
        match object.kind() {
            ObjectKind::Point | ObjectKind::LinkedPoint | ObjectKind::Image => object.position(),
            ObjectKind::Polygon | ObjectKind::MovableLine => {
                let mut x_sum = 0.0;
                let mut y_sum = 0.0;
                let mut count = 0usize;
                for dependency in &object.dependencies {
                    if let Some(position) = self.position(dependency) {
                        x_sum += position.0;
                        y_sum += position.1;
                        count += 1;
                    }
                }
                (count > 0).then(|| (x_sum / count as f64, y_sum / count as f64))
            }
            _ => None,
        }
    }

    /// Points not yet claimed by any dependent shape, in creation order,
    /// optionally restricted to one external source/column.
    pub fn free_point_ids(&self, link: Option<(&str, &str)>) -> Vec<ObjectId> {
        self.objects_in_creation_order()
            .into_iter()
            .filter(|object| {
                matches!(object.kind(), ObjectKind::Point | ObjectKind::LinkedPoint)
                    && object.dependents.is_empty()
                    && match link {
                        None => object.str_attribute("linkedSourceId").is_none(),
                        Some((source_id, column_id)) => {
                            object.str_attribute("linkedSourceId") == Some(source_id)
                                && object.str_attribute("linkedColId") == Some(column_id)
                        }
                    }
            })
            .map(|object| object.id.clone())
            .collect()
    }
}
