// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Interchange document to change log.
//!
//! The nested format exists so authors never have to invent ids: a
//! polygon's vertices are written inline and the importer generates the
//! ids and the referencing create records. Explicit ids in the document
//! win over generated ones, which is what makes export/import cycles
//! stable from the second round onward.

use serde_json::{json, Value};

use crate::geometry::{axis_units, board_bounds, buffered_bounding_box, DEFAULT_PIXELS_PER_UNIT};
use crate::model::{number_value, ChangeOp, ChangeRecord, ChangeTarget, ObjectKind, PropertyBag};

/// A nested interchange document: `type == "Geometry"`, an object tree,
/// and no flat change log of its own.
pub fn is_import_document(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("Geometry")
        && value.get("changes").is_none()
        && value.get("objects").is_some()
}

/// The board-create record every fresh log starts with; `overrides`
/// replace the defaults key-by-key.
pub fn default_board_change(overrides: Option<&PropertyBag>) -> ChangeRecord {
    let user_bounds = board_bounds(None, None);
    let (unit_x, unit_y) = axis_units(None);
    let buffered = buffered_bounding_box(user_bounds, unit_x, unit_y);

    let mut bag = PropertyBag::new();
    bag.set("axis", Value::Bool(true));
    bag.set(
        "boundingBox",
        Value::Array(buffered.iter().map(|v| number_value(*v)).collect()),
    );
    bag.set("unitX", number_value(unit_x));
    bag.set("unitY", number_value(unit_y));
    if let Some(overrides) = overrides {
        bag.merge(overrides);
    }
    ChangeRecord::new(ChangeOp::Create, ChangeTarget::Board).with_properties(bag)
}

struct Importer {
    changes: Vec<ChangeRecord>,
}

fn fresh_bag(explicit: Option<&Value>) -> PropertyBag {
    let mut bag = PropertyBag::with_id(crate::model::ObjectId::generate());
    if let Some(Value::Object(entries)) = explicit {
        bag.merge(&PropertyBag(entries.clone()));
    }
    bag
}

fn coord_pair_value(value: Option<&Value>) -> Option<Vec<Value>> {
    let entries = value?.as_array()?;
    if entries.len() < 2 {
        return None;
    }
    Some(vec![entries[0].clone(), entries[1].clone()])
}

fn f64_at(value: Option<&Value>, index: usize) -> Option<f64> {
    value?.as_array()?.get(index)?.as_f64()
}

fn str_at(value: Option<&Value>, index: usize) -> Option<&str> {
    value?.as_array()?.get(index)?.as_str()
}

impl Importer {
    fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    fn push_kind(&mut self, kind: ObjectKind, parents: Option<Vec<Value>>, bag: PropertyBag) {
        let mut change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(kind))
            .with_properties(bag);
        change.parents = parents;
        self.changes.push(change);
    }

    fn add_board(&mut self, board: Option<&Value>) {
        let properties = board
            .and_then(|board| board.get("properties"))
            .and_then(Value::as_object);

        let axis_min = properties.and_then(|p| {
            let min = p.get("axisMin")?;
            Some([f64_at(Some(min), 0)?, f64_at(Some(min), 1)?])
        });
        let axis_range: Option<Vec<f64>> = properties
            .and_then(|p| p.get("axisRange"))
            .and_then(Value::as_array)
            .map(|range| range.iter().filter_map(Value::as_f64).collect());

        let bounds = board_bounds(axis_min, axis_range.as_deref());
        let (unit_x, unit_y) = axis_units(axis_range.as_deref());

        let mut overrides = PropertyBag::new();
        overrides.set("unitX", number_value(unit_x));
        overrides.set("unitY", number_value(unit_y));
        let names = properties.and_then(|p| p.get("axisNames"));
        if let Some(name) = str_at(names, 0) {
            overrides.set("xName", json!(name));
        }
        if let Some(name) = str_at(names, 1) {
            overrides.set("yName", json!(name));
        }
        let labels = properties.and_then(|p| p.get("axisLabels"));
        if let Some(label) = str_at(labels, 0) {
            overrides.set("xAnnotation", json!(label));
        }
        if let Some(label) = str_at(labels, 1) {
            overrides.set("yAnnotation", json!(label));
        }
        overrides.set(
            "boundingBox",
            Value::Array(bounds.iter().map(|v| number_value(*v)).collect()),
        );
        if let Some(properties) = properties {
            for (key, value) in properties {
                if !matches!(
                    key.as_str(),
                    "axisNames" | "axisLabels" | "axisMin" | "axisRange"
                ) {
                    overrides.set(key, value.clone());
                }
            }
        }

        self.changes.push(default_board_change(Some(&overrides)));
    }

    fn add_comment_for(&mut self, anchor_id: &str, comment: &Value) {
        let mut bag = fresh_bag(None);
        bag.set("anchor", json!(anchor_id));
        let mut parents = None;
        if let Some(entries) = comment.as_object() {
            for (key, value) in entries {
                if key == "parents" {
                    parents = coord_pair_value(Some(value));
                } else {
                    bag.set(key, value.clone());
                }
            }
        }
        self.push_kind(ObjectKind::Comment, parents, bag);
    }

    fn add_standalone_comment(&mut self, spec: &Value) {
        let bag = fresh_bag(spec.get("properties"));
        let parents = coord_pair_value(spec.get("parents"));
        self.push_kind(ObjectKind::Comment, parents, bag);
    }

    /// Emits the point-create record and returns the id later records
    /// reference.
    fn add_point(&mut self, spec: &Value) -> String {
        let bag = fresh_bag(spec.get("properties"));
        let id = bag.str_prop("id").unwrap_or_default().to_owned();
        let parents = coord_pair_value(spec.get("parents"));
        self.push_kind(ObjectKind::Point, parents, bag);
        if let Some(comment) = spec.get("comment") {
            self.add_comment_for(&id, comment);
        }
        id
    }

    fn add_vertex_angle(&mut self, parents: [&str; 3], properties: Option<&Value>) {
        let bag = fresh_bag(properties);
        self.push_kind(
            ObjectKind::VertexAngle,
            Some(parents.iter().map(|p| json!(p)).collect()),
            bag,
        );
    }

    fn add_polygon(&mut self, spec: &Value) {
        let bag = fresh_bag(spec.get("properties"));
        let id = bag.str_prop("id").unwrap_or_default().to_owned();

        // Vertices are inline point specs or references to ids already
        // emitted; inline specs come first so the polygon's create can
        // name their generated ids.
        let mut vertices: Vec<(String, bool)> = Vec::new();
        if let Some(parents) = spec.get("parents").and_then(Value::as_array) {
            for parent in parents {
                match parent {
                    Value::String(existing) => vertices.push((existing.clone(), false)),
                    Value::Object(_) => {
                        let angle_label = parent
                            .get("angleLabel")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        let point_id = self.add_point(parent);
                        vertices.push((point_id, angle_label));
                    }
                    _ => {}
                }
            }
        }

        self.push_kind(
            ObjectKind::Polygon,
            Some(vertices.iter().map(|(id, _)| json!(id)).collect()),
            bag,
        );

        let last = vertices.len().saturating_sub(1);
        for (index, (vertex_id, angle_label)) in vertices.iter().enumerate() {
            if !angle_label {
                continue;
            }
            let prev = &vertices[if index == 0 { last } else { index - 1 }].0;
            let next = &vertices[if index == last { 0 } else { index + 1 }].0;
            self.add_vertex_angle([prev, vertex_id, next], None);
        }

        if let Some(comment) = spec.get("comment") {
            self.add_comment_for(&id, comment);
        }
    }

    fn add_image(&mut self, spec: &Value) {
        let bag = fresh_bag(spec.get("properties"));
        let id = bag.str_prop("id").unwrap_or_default().to_owned();

        let parents = spec.get("parents");
        let url = parents
            .and_then(|p| p.get("url"))
            .cloned()
            .unwrap_or(Value::Null);
        let coords = parents
            .and_then(|p| p.get("coords"))
            .cloned()
            .unwrap_or(Value::Null);
        // Document sizes are pixels; the engine works in board units.
        let size: Value = parents
            .and_then(|p| p.get("size"))
            .and_then(Value::as_array)
            .map(|size| {
                Value::Array(
                    size.iter()
                        .map(|px| {
                            number_value(px.as_f64().unwrap_or(0.0) / DEFAULT_PIXELS_PER_UNIT)
                        })
                        .collect(),
                )
            })
            .unwrap_or(Value::Null);

        self.push_kind(ObjectKind::Image, Some(vec![url, coords, size]), bag);
        if let Some(comment) = spec.get("comment") {
            self.add_comment_for(&id, comment);
        }
    }

    fn add_movable_line(&mut self, spec: &Value) {
        let mut bag = fresh_bag(spec.get("properties"));
        let id = bag.str_prop("id").unwrap_or_default().to_owned();

        let endpoints = spec.get("parents").and_then(Value::as_array);
        let mut parents = Vec::new();
        for (slot, key) in ["pt1", "pt2"].iter().enumerate() {
            let endpoint = endpoints.and_then(|e| e.get(slot));
            if let Some(pair) = coord_pair_value(endpoint.and_then(|e| e.get("parents"))) {
                parents.push(Value::Array(pair));
            }
            if let Some(properties) = endpoint.and_then(|e| e.get("properties")) {
                bag.set(key, properties.clone());
            }
        }
        if parents.len() < 2 {
            return;
        }

        self.push_kind(ObjectKind::MovableLine, Some(parents), bag);
        if let Some(comment) = spec.get("comment") {
            self.add_comment_for(&id, comment);
        }
    }
}

/// Converts a nested interchange document into the equivalent flat
/// create-record sequence, in canonical wire form. Returns `None` for
/// documents that are not in the nested import format.
pub fn import_document(value: &Value) -> Option<Vec<String>> {
    if !is_import_document(value) {
        return None;
    }

    let mut importer = Importer::new();

    if let Some(title) = value.get("title").and_then(Value::as_str) {
        let mut bag = PropertyBag::new();
        bag.set("title", json!(title));
        importer.changes.push(
            ChangeRecord::new(ChangeOp::Update, ChangeTarget::Metadata).with_properties(bag),
        );
    }

    importer.add_board(value.get("board"));

    if let Some(objects) = value.get("objects").and_then(Value::as_array) {
        for spec in objects {
            match spec.get("type").and_then(Value::as_str) {
                Some("point") => {
                    importer.add_point(spec);
                }
                Some("polygon") => importer.add_polygon(spec),
                Some("vertexAngle") => {
                    let parents = spec.get("parents").and_then(Value::as_array);
                    let ids: Vec<&str> = parents
                        .map(|parents| parents.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    if let &[prev, vertex, next] = ids.as_slice() {
                        importer.add_vertex_angle([prev, vertex, next], spec.get("properties"));
                    }
                }
                Some("image") => importer.add_image(spec),
                Some("movableLine") => importer.add_movable_line(spec),
                Some("comment") => importer.add_standalone_comment(spec),
                _ => {}
            }
        }
    }

    Some(
        importer
            .changes
            .iter()
            .map(ChangeRecord::to_wire)
            .collect(),
    )
}
