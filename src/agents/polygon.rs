// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};
use tracing::warn;

use crate::model::{ChangeRecord, ObjectId, ObjectKind, PropertyBag};
use crate::scene::Scene;

use super::{object, target_or_bag_id, AgentContext, AgentResult, ChangeAgent};

/// Display mode of a polygon edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentLabelOption {
    #[default]
    None,
    Label,
    Length,
}

impl SegmentLabelOption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Label => "label",
            Self::Length => "length",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "none" => Some(Self::None),
            "label" => Some(Self::Label),
            "length" => Some(Self::Length),
            _ => None,
        }
    }
}

/// Canonical attribute key for one edge, independent of point order.
fn segment_key(a: &ObjectId, b: &ObjectId) -> String {
    if a.as_str() <= b.as_str() {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

/// Current display text for one polygon edge: `None` when unlabeled, the
/// stored (or point-name derived) label, or the live segment length.
/// Length labels are recomputed from current geometry on every call.
pub fn segment_label_text(
    scene: &Scene,
    polygon_id: &ObjectId,
    a: &ObjectId,
    b: &ObjectId,
) -> Option<String> {
    let polygon = scene.get(polygon_id)?;
    let labels = polygon.attribute("segmentLabels")?.as_object()?;
    let entry = labels.get(&segment_key(a, b))?.as_object()?;
    let option = SegmentLabelOption::from_tag(entry.get("labelOption")?.as_str()?)?;
    match option {
        SegmentLabelOption::None => None,
        SegmentLabelOption::Label => {
            let stored = entry.get("name").and_then(Value::as_str);
            match stored {
                Some(name) => Some(name.to_owned()),
                None => {
                    let name_a = scene.get(a)?.name().unwrap_or(a.as_str()).to_owned();
                    let name_b = scene.get(b)?.name().unwrap_or(b.as_str()).to_owned();
                    Some(format!("{name_a}{name_b}"))
                }
            }
        }
        SegmentLabelOption::Length => {
            let (ax, ay) = scene.position(a)?;
            let (bx, by) = scene.position(b)?;
            let length = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
            Some(format!("{length:.1}"))
        }
    }
}

#[derive(Debug, Default)]
pub struct PolygonAgent;

impl PolygonAgent {
    /// Segment-label update: `parents` carry the edge's two point ids.
    fn update_segment_label(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let polygon_id = change.target_ids().first()?.clone();
        let bag = change.single_properties()?;
        let option = SegmentLabelOption::from_tag(bag.str_prop("labelOption")?)?;
        let parents = change.parent_ids();
        let (a, b) = match parents.as_slice() {
            [a, b] => (a.clone(), b.clone()),
            _ => return None,
        };
        let name = bag.str_prop("name").map(ToOwned::to_owned);

        let polygon = scene.get_mut(&polygon_id)?;
        let mut labels = polygon
            .attribute("segmentLabels")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let key = segment_key(&a, &b);
        if option == SegmentLabelOption::None {
            // Back to the generated name: drop the override entirely.
            labels.remove(&key);
        } else {
            let mut entry = serde_json::Map::new();
            entry.insert("labelOption".to_owned(), json!(option.as_str()));
            if let Some(name) = name {
                entry.insert("name".to_owned(), json!(name));
            }
            labels.insert(key, Value::Object(entry));
        }
        polygon.set_attribute("segmentLabels", Value::Object(labels));
        Some(Vec::new())
    }

    /// Vertex-list update: `parents` carry the replacement vertex ids.
    fn update_vertices(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let polygon_id = change.target_ids().first()?.clone();
        let vertices: Vec<ObjectId> = change
            .parent_ids()
            .into_iter()
            .filter(|id| scene.contains(id))
            .collect();
        scene
            .set_dependencies(&polygon_id, vertices)
            .then(Vec::new)
    }
}

impl ChangeAgent for PolygonAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let requested = change.parent_ids();
        let vertices: Vec<ObjectId> = requested
            .iter()
            .filter(|id| scene.contains(id))
            .cloned()
            .collect();
        if vertices.len() != requested.len() {
            warn!(
                missing = requested.len() - vertices.len(),
                "some points were missing when creating polygon"
            );
        }
        if vertices.len() < 2 {
            return None;
        }

        let id = target_or_bag_id(change).unwrap_or_else(ObjectId::generate);
        let attributes = default_attributes(change.single_properties());
        scene
            .insert(id.clone(), ObjectKind::Polygon, None, attributes, vertices)
            .then(|| vec![id])
    }

    fn update(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let has_parents = change.parents.as_deref().is_some_and(|p| !p.is_empty());
        let has_label_option = change
            .single_properties()
            .and_then(|bag| bag.str_prop("labelOption"))
            .is_some();

        if has_parents && has_label_option {
            return self.update_segment_label(scene, change);
        }
        if has_label_option {
            // Polygon's own label mode; stored for the renderer to read.
            let id = change.target_ids().first()?;
            let bag = change.single_properties()?;
            return object::update_object(scene, id, bag).then(Vec::new);
        }
        if has_parents {
            return self.update_vertices(scene, change);
        }

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

/// Expands a user deletion over the polygon rules before any record is
/// built:
///
/// - polygons whose every vertex is selected are deleted outright;
/// - a selected vertex shared with a polygon that is NOT fully selected
///   survives, so the neighboring shape keeps its corner;
/// - polygons left with fewer than two vertices are deleted instead of
///   trimmed;
/// - vertex angles riding on any deleted vertex are deleted.
///
/// Returns the adjusted full id list (points, polygons, angles, rest).
pub fn prepare_delete_ids(scene: &Scene, ids: &[ObjectId]) -> Vec<ObjectId> {
    let mut selected_points = Vec::new();
    let mut polygons_to_delete = Vec::new();
    let mut angles_to_delete = Vec::new();
    let mut others = Vec::new();

    let mut polygon_vertices: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
    let mut vertex_polygons: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();

    for id in ids {
        match scene.kind_of(id) {
            Some(ObjectKind::Point | ObjectKind::LinkedPoint) => {
                selected_points.push(id.clone());
                let polygons: Vec<ObjectId> = scene
                    .dependents_of(id)
                    .iter()
                    .filter(|dep| scene.kind_of(dep) == Some(ObjectKind::Polygon))
                    .cloned()
                    .collect();
                for polygon in &polygons {
                    polygon_vertices
                        .entry(polygon.clone())
                        .or_default()
                        .push(id.clone());
                }
                vertex_polygons.insert(id.clone(), polygons);
            }
            Some(ObjectKind::Polygon) => polygons_to_delete.push(id.clone()),
            Some(ObjectKind::VertexAngle) => angles_to_delete.push(id.clone()),
            Some(_) => others.push(id.clone()),
            None => {}
        }
    }

    let mut fully_selected: HashSet<ObjectId> = HashSet::new();
    for (polygon, vertices) in &polygon_vertices {
        let live = scene
            .dependencies_of(polygon)
            .iter()
            .filter(|dep| scene.contains(dep))
            .count();
        if vertices.len() == live {
            fully_selected.insert(polygon.clone());
        }
    }

    let mut points_to_delete = selected_points;
    for polygon in &fully_selected {
        let Some(vertices) = polygon_vertices.get(polygon) else {
            continue;
        };
        for vertex in vertices {
            let shared_with_external = vertex_polygons
                .get(vertex)
                .is_some_and(|polygons| polygons.iter().any(|p| !fully_selected.contains(p)));
            if shared_with_external {
                points_to_delete.retain(|candidate| candidate != vertex);
            }
        }
    }

    for (polygon, vertices) in &polygon_vertices {
        let live = scene
            .dependencies_of(polygon)
            .iter()
            .filter(|dep| scene.contains(dep))
            .count();
        let delete_count = vertices
            .iter()
            .filter(|vertex| points_to_delete.contains(vertex))
            .count();
        let undersized = live.saturating_sub(delete_count) <= 1;
        if (fully_selected.contains(polygon) || undersized)
            && !polygons_to_delete.contains(polygon)
        {
            polygons_to_delete.push(polygon.clone());
        }
    }

    for point in &points_to_delete {
        for dependent in scene.dependents_of(point) {
            if scene.kind_of(dependent) == Some(ObjectKind::VertexAngle)
                && !angles_to_delete.contains(dependent)
            {
                angles_to_delete.push(dependent.clone());
            }
        }
    }

    let mut result = points_to_delete;
    result.extend(polygons_to_delete);
    result.extend(angles_to_delete);
    result.extend(others);
    let mut seen = HashSet::new();
    result.retain(|id| seen.insert(id.clone()));
    result
}

/// Merged polygon visual defaults applied at creation when the record
/// does not override them.
pub fn default_attributes(bag: Option<&PropertyBag>) -> serde_json::Map<String, Value> {
    let mut attributes = serde_json::Map::new();
    attributes.insert("hasInnerPoints".to_owned(), json!(true));
    if let Some(bag) = bag {
        for (key, value) in &bag.0 {
            if key != "id" {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }
    attributes
}
