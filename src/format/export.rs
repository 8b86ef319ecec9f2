// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Change log to interchange document.
//!
//! One walk over the log builds a per-object info map (type, affecting
//! changes, dependency adjacency, deleted/no-export flags); a second
//! walk over the surviving ids emits the nested document. Objects with
//! missing or insufficient dependencies are filtered, not errors.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::agents::movable_line;
use crate::geometry::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_PIXELS_PER_UNIT};
use crate::model::{number_value, ChangeOp, ChangeRecord, ChangeTarget, ObjectKind, Properties};

#[derive(Debug)]
struct ObjectInfo {
    kind: Option<ObjectKind>,
    changes: Vec<ChangeRecord>,
    dependents: Vec<String>,
    dependencies: Vec<String>,
    deleted: bool,
    no_export: bool,
}

impl ObjectInfo {
    fn new(kind: Option<ObjectKind>, change: ChangeRecord, dependencies: Vec<String>) -> Self {
        let no_export = kind == Some(ObjectKind::LinkedPoint);
        Self {
            kind,
            changes: vec![change],
            dependents: Vec::new(),
            dependencies,
            deleted: false,
            no_export,
        }
    }
}

#[derive(Debug, Default)]
struct LogIndex {
    infos: HashMap<String, ObjectInfo>,
    ordered_ids: Vec<String>,
    board_changes: Vec<ChangeRecord>,
    metadata_changes: Vec<ChangeRecord>,
}

/// Up to three decimal places, no trailing zeros.
fn fix3(value: f64) -> Value {
    number_value((value * 1000.0).round() / 1000.0)
}

fn target_ids(change: &ChangeRecord) -> Vec<String> {
    if change.target == ChangeTarget::TableLink && change.operation == ChangeOp::Create {
        // The created objects are the linked points named in `ids`.
        return change
            .single_properties()
            .and_then(|bag| bag.get("ids"))
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| Some(id.as_str()?.to_owned()))
                    .collect()
            })
            .unwrap_or_default();
    }
    let explicit: Vec<String> = change
        .target_ids()
        .iter()
        .map(|id| id.as_str().to_owned())
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }
    match &change.properties {
        Some(Properties::One(bag)) => bag.id().map(|id| id.into_string()).into_iter().collect(),
        Some(Properties::Many(bags)) => bags
            .iter()
            .filter_map(|bag| Some(bag.id()?.into_string()))
            .collect(),
        None => Vec::new(),
    }
}

fn create_dependencies(change: &ChangeRecord, index: &LogIndex) -> Vec<String> {
    if change.operation != ChangeOp::Create {
        return Vec::new();
    }
    match &change.target {
        ChangeTarget::Kind(ObjectKind::Comment) => {
            let Some(bag) = change.single_properties() else {
                return Vec::new();
            };
            if let Some(anchor) = bag.str_prop("anchor") {
                return vec![anchor.to_owned()];
            }
            bag.get("anchors")
                .and_then(Value::as_array)
                .map(|anchors| {
                    anchors
                        .iter()
                        .filter_map(|a| Some(a.as_str()?.to_owned()))
                        .collect()
                })
                .unwrap_or_default()
        }
        ChangeTarget::Kind(ObjectKind::Polygon) => change
            .parents
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter_map(|p| Some(p.as_str()?.to_owned()))
            .collect(),
        ChangeTarget::Kind(ObjectKind::VertexAngle) => {
            let vertices: Vec<String> = change
                .parents
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .filter_map(|p| Some(p.as_str()?.to_owned()))
                .collect();
            // The owning polygon is the one object every vertex already
            // depends into: it shows up once per vertex.
            let mut dependent_counts: HashMap<&str, usize> = HashMap::new();
            let mut polygon_id = None;
            for vertex in &vertices {
                let Some(info) = index.infos.get(vertex) else {
                    continue;
                };
                for dependent in &info.dependents {
                    let count = dependent_counts.entry(dependent).or_insert(0);
                    *count += 1;
                    if *count >= 3 {
                        polygon_id = Some(dependent.clone());
                    }
                }
            }
            match polygon_id {
                Some(polygon_id) => {
                    let mut dependencies = vec![polygon_id];
                    dependencies.extend(vertices);
                    dependencies
                }
                None => vertices,
            }
        }
        ChangeTarget::Kind(ObjectKind::MovableLine) => {
            match change.single_properties().and_then(|bag| bag.id()) {
                Some(line_id) => movable_line::control_point_ids(&line_id)
                    .iter()
                    .map(|id| id.as_str().to_owned())
                    .collect(),
                None => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn index_log(changes: &[String]) -> LogIndex {
    let mut index = LogIndex::default();

    for wire in changes {
        let change = match ChangeRecord::from_wire(wire) {
            Ok(change) => change,
            Err(error) => {
                warn!(%error, "skipping malformed log record during export");
                continue;
            }
        };

        match &change.target {
            ChangeTarget::Board => {
                index.board_changes.push(change);
                continue;
            }
            ChangeTarget::Metadata => {
                index.metadata_changes.push(change);
                continue;
            }
            _ => {}
        }

        let kind = match &change.target {
            ChangeTarget::TableLink => Some(ObjectKind::LinkedPoint),
            ChangeTarget::Kind(kind) => Some(*kind),
            ChangeTarget::Object => None, // resolved per id below
            _ => None,
        };
        let ids = target_ids(&change);
        let dependencies = create_dependencies(&change, &index);

        for id in ids {
            if let Some(info) = index.infos.get_mut(&id) {
                info.changes.push(change.clone());
                if change.operation == ChangeOp::Delete {
                    info.deleted = true;
                    // Deleting a movable line deletes its control points.
                    if info.kind == Some(ObjectKind::MovableLine) {
                        for point_id in control_point_keys(&id) {
                            if let Some(point) = index.infos.get_mut(&point_id) {
                                point.changes.push(change.clone());
                                point.deleted = true;
                            }
                        }
                    }
                }
                continue;
            }

            if change.operation == ChangeOp::Create && kind == Some(ObjectKind::MovableLine) {
                // Track the control points so later changes to them are
                // folded in; they are never individually exportable.
                for point_id in control_point_keys(&id) {
                    let mut info =
                        ObjectInfo::new(Some(ObjectKind::Point), change.clone(), Vec::new());
                    info.no_export = true;
                    index.infos.insert(point_id.clone(), info);
                    index.ordered_ids.push(point_id);
                }
            }

            let info = ObjectInfo::new(kind, change.clone(), dependencies.clone());
            for dependency in &info.dependencies {
                if let Some(parent) = index.infos.get_mut(dependency) {
                    parent.dependents.push(id.clone());
                }
            }
            index.infos.insert(id.clone(), info);
            index.ordered_ids.push(id);
        }
    }

    index
}

fn control_point_keys(line_id: &str) -> [String; 2] {
    [format!("{line_id}-point1"), format!("{line_id}-point2")]
}

fn is_valid(index: &LogIndex, id: &str) -> bool {
    index.infos.get(id).is_some_and(|info| !info.deleted)
}

/// Parent ids that still resolve, per kind: a comment's anchors, a
/// movable line's control points, everything else's create parents.
fn valid_parent_ids(index: &LogIndex, id: &str) -> Vec<String> {
    let Some(info) = index.infos.get(id) else {
        return Vec::new();
    };
    let parents: Vec<String> = match info.kind {
        Some(ObjectKind::Comment) => info.dependencies.clone(),
        Some(ObjectKind::MovableLine) => control_point_keys(id).to_vec(),
        _ => info
            .changes
            .first()
            .and_then(|change| change.parents.as_deref())
            .unwrap_or(&[])
            .iter()
            .filter_map(|p| Some(p.as_str()?.to_owned()))
            .collect(),
    };
    parents
        .into_iter()
        .filter(|parent| is_valid(index, parent))
        .collect()
}

fn is_exportable(index: &LogIndex, id: &str) -> bool {
    if !is_valid(index, id) {
        return false;
    }
    let info = &index.infos[id];
    let Some(kind) = info.kind else {
        return false;
    };
    if !kind.supports_export() || info.no_export {
        return false;
    }

    if let Some(min_parents) = kind.min_export_dependencies() {
        if valid_parent_ids(index, id).len() < min_parents {
            return false;
        }
        // Dependencies on internal sub-objects block export, except a
        // movable line's own control points.
        if kind != ObjectKind::MovableLine
            && info.dependencies.iter().any(|dependency| {
                index
                    .infos
                    .get(dependency)
                    .is_some_and(|dep| dep.no_export)
            })
        {
            return false;
        }
        // Every dependency must be live, except that a polygon may ride
        // on a surviving subset of its vertices.
        if kind != ObjectKind::Polygon
            && !info
                .dependencies
                .iter()
                .all(|dependency| is_valid(index, dependency))
        {
            return false;
        }
    }
    true
}

/// Properties merged across every change affecting `id`, pairing
/// positionally into batched bags.
fn merged_properties(info: &ObjectInfo, id: &str) -> Map<String, Value> {
    let mut merged = Map::new();
    for change in &info.changes {
        match &change.properties {
            Some(Properties::One(bag)) => {
                for (key, value) in &bag.0 {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Properties::Many(bags)) => {
                let position = change
                    .target_ids()
                    .iter()
                    .position(|target| target.as_str() == id)
                    .or_else(|| bags.iter().position(|bag| bag.str_prop("id") == Some(id)));
                if let Some(position) = position {
                    if let Some(bag) = bags.get(position) {
                        for (key, value) in &bag.0 {
                            merged.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            None => {}
        }
    }
    merged
}

/// `[x, y]` parent pair recorded by the object's creating change.
fn initial_point_parents(info: &ObjectInfo, id: &str) -> Option<[Value; 2]> {
    let change = info.changes.first()?;
    match &change.target {
        ChangeTarget::Kind(ObjectKind::Point | ObjectKind::LinkedPoint) => {
            if let Some(Properties::Many(bags)) = &change.properties {
                let position = bags.iter().position(|bag| bag.str_prop("id") == Some(id))?;
                let pair = change.parents.as_deref()?.get(position)?.as_array()?;
                Some([pair.first()?.clone(), pair.get(1)?.clone()])
            } else {
                let parents = change.parents.as_deref()?;
                Some([parents.first()?.clone(), parents.get(1)?.clone()])
            }
        }
        ChangeTarget::Kind(ObjectKind::MovableLine) => {
            let slot = if id.ends_with("-point1") {
                0
            } else if id.ends_with("-point2") {
                1
            } else {
                return None;
            };
            let pair = change.parents.as_deref()?.get(slot)?.as_array()?;
            Some([pair.first()?.clone(), pair.get(1)?.clone()])
        }
        ChangeTarget::TableLink => {
            let bag = change.single_properties()?;
            let ids = bag.get("ids")?.as_array()?;
            let position = ids.iter().position(|entry| entry.as_str() == Some(id))?;
            let coords = bag
                .get("points")?
                .as_array()?
                .get(position)?
                .get("coords")?
                .as_array()?;
            Some([coords.first()?.clone(), coords.get(1)?.clone()])
        }
        _ => None,
    }
}

/// Final position and leftover properties of a point-like object.
fn point_exportables(info: &ObjectInfo, id: &str) -> (Option<[Value; 2]>, Map<String, Value>) {
    let mut merged = merged_properties(info, id);
    let position = merged
        .remove("position")
        .and_then(|position| {
            let pair = position.as_array()?;
            Some([pair.first()?.clone(), pair.get(1)?.clone()])
        })
        .or_else(|| initial_point_parents(info, id));
    merged.insert("id".to_owned(), Value::String(id.to_owned()));
    (position, merged)
}

/// Centroid of an object as recorded in the log, for comment offsets.
fn object_centroid(index: &LogIndex, id: &str) -> Option<(f64, f64)> {
    let info = index.infos.get(id)?;
    match info.kind? {
        ObjectKind::Point | ObjectKind::LinkedPoint => {
            let (position, _) = point_exportables(info, id);
            let [x, y] = position?;
            Some((x.as_f64()?, y.as_f64()?))
        }
        ObjectKind::Polygon | ObjectKind::MovableLine => {
            let dependencies: Vec<String> = match info.kind? {
                ObjectKind::MovableLine => control_point_keys(id).to_vec(),
                _ => info.dependencies.clone(),
            };
            let mut x_sum = 0.0;
            let mut y_sum = 0.0;
            let mut count = 0usize;
            for dependency in &dependencies {
                let Some(dep_info) = index.infos.get(dependency) else {
                    continue;
                };
                let (position, _) = point_exportables(dep_info, dependency);
                if let Some([x, y]) = position {
                    if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
                        x_sum += x;
                        y_sum += y;
                        count += 1;
                    }
                }
            }
            (count > 0).then(|| (x_sum / count as f64, y_sum / count as f64))
        }
        _ => None,
    }
}

fn export_point(index: &LogIndex, id: &str) -> Value {
    let info = &index.infos[id];
    let (position, others) = point_exportables(info, id);
    let parents = position.map_or(Value::Null, |[x, y]| Value::Array(vec![x, y]));
    json!({ "type": "point", "parents": parents, "properties": Value::Object(others) })
}

fn export_polygon(index: &LogIndex, id: &str) -> Value {
    let info = &index.infos[id];
    let mut properties = merged_properties(info, id);
    properties.insert("id".to_owned(), Value::String(id.to_owned()));
    let parents: Vec<Value> = valid_parent_ids(index, id)
        .into_iter()
        .map(Value::String)
        .collect();
    json!({ "type": "polygon", "parents": parents, "properties": Value::Object(properties) })
}

fn export_vertex_angle(index: &LogIndex, id: &str) -> Value {
    let info = &index.infos[id];
    let mut properties = merged_properties(info, id);
    properties.insert("id".to_owned(), Value::String(id.to_owned()));
    // The polygon dependency is structural; only the points are parents.
    let parents: Vec<Value> = info
        .changes
        .first()
        .and_then(|change| change.parents.as_deref())
        .unwrap_or(&[])
        .iter()
        .filter(|parent| parent.as_str().is_some_and(|p| is_valid(index, p)))
        .cloned()
        .collect();
    json!({ "type": "vertexAngle", "parents": parents, "properties": Value::Object(properties) })
}

fn export_movable_line(index: &LogIndex, id: &str) -> Value {
    let info = &index.infos[id];
    let mut properties = merged_properties(info, id);
    properties.insert("id".to_owned(), Value::String(id.to_owned()));
    let parents: Vec<Value> = control_point_keys(id)
        .iter()
        .map(|point_id| {
            let position = index
                .infos
                .get(point_id)
                .and_then(|point| point_exportables(point, point_id).0);
            let parents = position.map_or(Value::Null, |[x, y]| Value::Array(vec![x, y]));
            json!({ "type": "point", "parents": parents })
        })
        .collect();
    json!({ "type": "movableLine", "parents": parents, "properties": Value::Object(properties) })
}

fn export_image(index: &LogIndex, id: &str) -> Value {
    let info = &index.infos[id];
    let mut properties = merged_properties(info, id);
    let position = properties.remove("position");
    properties.insert("id".to_owned(), Value::String(id.to_owned()));

    let initial = info.changes.first().and_then(|change| change.parents.clone());
    let initial = initial.unwrap_or_default();
    let url = initial.first().cloned().unwrap_or(Value::Null);
    let coords = position
        .or_else(|| initial.get(1).cloned())
        .unwrap_or(Value::Null);
    let size_px: Value = initial
        .get(2)
        .and_then(Value::as_array)
        .map(|size| {
            Value::Array(
                size.iter()
                    .map(|s| {
                        let px = s.as_f64().unwrap_or(0.0) * DEFAULT_PIXELS_PER_UNIT;
                        Value::Number(serde_json::Number::from(px.round() as i64))
                    })
                    .collect(),
            )
        })
        .unwrap_or(Value::Null);

    json!({
        "type": "image",
        "parents": { "url": url, "coords": coords, "size": size_px },
        "properties": Value::Object(properties)
    })
}

fn export_comment(index: &LogIndex, id: &str) -> Value {
    let info = &index.infos[id];
    let mut properties = merged_properties(info, id);
    let position = properties.remove("position");
    properties.insert("id".to_owned(), Value::String(id.to_owned()));

    // Offset relative to the anchor centroid; falls back to the offset
    // the creating change carried.
    let mut parents: Option<[Value; 2]> = info
        .changes
        .first()
        .and_then(|change| change.parents.as_deref())
        .and_then(|parents| Some([parents.first()?.clone(), parents.get(1)?.clone()]));
    if let Some(position) = position.as_ref().and_then(Value::as_array) {
        if let (Some(x), Some(y)) = (
            position.first().and_then(Value::as_f64),
            position.get(1).and_then(Value::as_f64),
        ) {
            let anchor = properties.get("anchor").and_then(Value::as_str);
            if let Some(centroid) = anchor.and_then(|anchor| object_centroid(index, anchor)) {
                parents = Some([fix3(x - centroid.0), fix3(y - centroid.1)]);
            }
        }
    }

    let mut object = Map::new();
    object.insert("type".to_owned(), json!("comment"));
    if let Some([x, y]) = parents {
        object.insert("parents".to_owned(), Value::Array(vec![x, y]));
    }
    object.insert("properties".to_owned(), Value::Object(properties));
    Value::Object(object)
}

fn export_board(index: &LogIndex) -> Option<Value> {
    if index.board_changes.is_empty() {
        return None;
    }

    let mut merged = Map::new();
    for change in &index.board_changes {
        let Some(bag) = change.single_properties() else {
            continue;
        };
        let source = bag
            .get("boardScale")
            .and_then(Value::as_object)
            .unwrap_or(&bag.0);
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }

    let bounds = merged.get("boundingBox").and_then(Value::as_array);
    let bound = |slot: usize| -> Option<f64> { bounds?.get(slot)?.as_f64() };
    let x_min = merged
        .get("xMin")
        .and_then(Value::as_f64)
        .or_else(|| bound(0))?;
    let y_min = merged
        .get("yMin")
        .and_then(Value::as_f64)
        .or_else(|| bound(3))?;
    let x_range = match merged.get("unitX").and_then(Value::as_f64) {
        Some(unit_x) => DEFAULT_CANVAS_WIDTH / unit_x,
        None => bound(2)? - x_min,
    };
    let y_range = match merged.get("unitY").and_then(Value::as_f64) {
        Some(unit_y) => DEFAULT_CANVAS_HEIGHT / unit_y,
        None => bound(1)? - y_min,
    };

    let mut properties = Map::new();
    properties.insert(
        "axisMin".to_owned(),
        Value::Array(vec![fix3(x_min), fix3(y_min)]),
    );
    properties.insert(
        "axisRange".to_owned(),
        Value::Array(vec![fix3(x_range), fix3(y_range)]),
    );
    let name = |key: &str| merged.get(key).cloned().unwrap_or(Value::Null);
    if merged.contains_key("xName") || merged.contains_key("yName") {
        properties.insert(
            "axisNames".to_owned(),
            Value::Array(vec![name("xName"), name("yName")]),
        );
    }
    if merged.contains_key("xAnnotation") || merged.contains_key("yAnnotation") {
        properties.insert(
            "axisLabels".to_owned(),
            Value::Array(vec![name("xAnnotation"), name("yAnnotation")]),
        );
    }
    Some(json!({ "properties": Value::Object(properties) }))
}

fn export_title(index: &LogIndex) -> Option<String> {
    let mut title = None;
    for change in &index.metadata_changes {
        if let Some(value) = change
            .single_properties()
            .and_then(|bag| bag.str_prop("title"))
        {
            title = Some(value.to_owned());
        }
    }
    title
}

/// Exports the change log as a nested interchange document.
pub fn export_document(changes: &[String]) -> Value {
    let index = index_log(changes);

    let mut document = Map::new();
    document.insert("type".to_owned(), json!("Geometry"));
    if let Some(title) = export_title(&index) {
        document.insert("title".to_owned(), Value::String(title));
    }
    if let Some(board) = export_board(&index) {
        document.insert("board".to_owned(), board);
    }

    let objects: Vec<Value> = index
        .ordered_ids
        .iter()
        .filter(|id| is_exportable(&index, id))
        .map(|id| match index.infos[id].kind {
            Some(ObjectKind::Point) => export_point(&index, id),
            Some(ObjectKind::Polygon) => export_polygon(&index, id),
            Some(ObjectKind::VertexAngle) => export_vertex_angle(&index, id),
            Some(ObjectKind::MovableLine) => export_movable_line(&index, id),
            Some(ObjectKind::Image) => export_image(&index, id),
            Some(ObjectKind::Comment) => export_comment(&index, id),
            _ => Value::Null,
        })
        .filter(|object| !object.is_null())
        .collect();
    document.insert("objects".to_owned(), Value::Array(objects));

    Value::Object(document)
}
