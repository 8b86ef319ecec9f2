// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::{json, Value};

use super::fixtures::{link_props, RecordingTelemetry, SharedSelectionStub, TableSource};
use super::{EngineError, GeometryEngine};
use crate::agents::SegmentLabelOption;
use crate::engine::{ColumnsChange, RowsChange};
use crate::model::{
    ChangeOp, ChangeRecord, ChangeTarget, ObjectId, ObjectKind, PropertyBag, SourceId,
};
use crate::scene::Scene;

fn id(value: &str) -> ObjectId {
    ObjectId::new(value).expect("object id")
}

fn bag(value: Value) -> PropertyBag {
    PropertyBag(value.as_object().expect("object").clone())
}

fn engine_and_scene() -> (GeometryEngine, Scene) {
    let mut engine = GeometryEngine::new(None);
    let scene = engine.initialize_scene().expect("board");
    (engine, scene)
}

fn add_triangle(engine: &mut GeometryEngine, scene: &mut Scene) {
    for (name, x, y) in [("v1", 0.0, 0.0), ("v2", 5.0, 0.0), ("v3", 0.0, 5.0)] {
        engine.add_point(Some(scene), [x, y], Some(bag(json!({ "id": name }))));
    }
    let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Polygon))
        .with_parents(vec![json!("v1"), json!("v2"), json!("v3")])
        .with_properties(bag(json!({ "id": "poly" })));
    engine.apply_change(Some(scene), &change).expect("polygon");
}

#[test]
fn fresh_engine_starts_with_the_board_creation() {
    let engine = GeometryEngine::new(None);
    assert_eq!(engine.log().len(), 1);
    let first = ChangeRecord::from_wire(&engine.log()[0]).expect("board record");
    assert_eq!(first.operation, ChangeOp::Create);
    assert_eq!(first.target, ChangeTarget::Board);
}

#[test]
fn title_override_is_emitted_before_the_board() {
    let mut engine = GeometryEngine::new(Some(bag(json!({ "title": "Graph 1" }))));
    assert_eq!(engine.log().len(), 2);
    let first = ChangeRecord::from_wire(&engine.log()[0]).expect("metadata record");
    assert_eq!(first.target, ChangeTarget::Metadata);
    engine.initialize_scene().expect("board");
    assert_eq!(engine.title(), Some("Graph 1"));
}

#[test]
fn apply_change_logs_and_dispatches() {
    let (mut engine, mut scene) = engine_and_scene();
    let created = engine
        .add_point(Some(&mut scene), [2.0, 3.0], None)
        .expect("point");
    assert!(scene.contains(&created));
    assert_eq!(engine.log().len(), 2);
}

#[test]
fn apply_change_without_a_scene_still_logs() {
    let (mut engine, _scene) = engine_and_scene();
    let result = engine.add_point(None, [2.0, 3.0], Some(bag(json!({ "id": "p1" }))));
    assert!(result.is_none());
    assert_eq!(engine.log().len(), 2);

    // Replay picks the record up once a scene exists.
    let scene = engine.initialize_scene().expect("board");
    assert!(scene.contains(&id("p1")));
}

#[test]
fn replay_skips_malformed_records() {
    let (mut engine, mut scene) = engine_and_scene();
    engine.add_point(Some(&mut scene), [1.0, 1.0], Some(bag(json!({ "id": "p1" }))));
    let mut log = engine.log().to_vec();
    log.insert(1, "{not parseable".to_owned());
    log.insert(2, r#"{"operation":"create","target":"wormhole","properties":{"id":"w"}}"#.to_owned());

    let mut replayed = GeometryEngine::from_log(log);
    let scene = replayed.initialize_scene().expect("board survives junk");
    assert!(scene.contains(&id("p1")));
    assert_eq!(scene.len(), 1);
}

#[test]
fn initialize_scene_requires_a_board_record() {
    let mut engine = GeometryEngine::from_log(vec![]);
    assert_eq!(engine.initialize_scene(), Err(EngineError::NotReady));
}

#[test]
fn suspend_resume_nests_and_flushes_once() {
    let (mut engine, mut scene) = engine_and_scene();
    assert!(!engine.is_sync_suspended());

    engine.suspend_sync();
    engine.suspend_sync();
    assert!(engine.is_sync_suspended());

    engine.add_point(Some(&mut scene), [1.0, 1.0], Some(bag(json!({ "id": "p1" }))));
    // Dispatch happens eagerly; only the log write is deferred.
    assert!(scene.contains(&id("p1")));
    assert_eq!(engine.log().len(), 1);
    assert_eq!(engine.batch_change_count(), 1);

    engine.resume_sync();
    assert!(engine.is_sync_suspended());
    assert_eq!(engine.log().len(), 1);

    engine.resume_sync();
    assert!(!engine.is_sync_suspended());
    assert_eq!(engine.batch_change_count(), 0);
    assert_eq!(engine.log().len(), 2);
}

#[test]
fn unbalanced_resume_is_a_noop() {
    let (mut engine, _scene) = engine_and_scene();
    engine.resume_sync();
    assert!(!engine.is_sync_suspended());
    assert_eq!(engine.log().len(), 1);
}

#[test]
fn pop_changeset_returns_the_trailing_run() {
    let (mut engine, mut scene) = engine_and_scene();
    engine.add_point(Some(&mut scene), [1.0, 1.0], Some(bag(json!({ "id": "p1" }))));
    engine.add_point(Some(&mut scene), [2.0, 2.0], Some(bag(json!({ "id": "p2" }))));

    let popped = engine.pop_changeset().expect("changeset");
    assert_eq!(popped.len(), 1);
    assert_eq!(engine.log().len(), 2);

    engine.push_changeset(popped);
    assert_eq!(engine.log().len(), 3);
}

#[test]
fn pop_changeset_never_pops_the_board_creation() {
    let (mut engine, _scene) = engine_and_scene();
    assert!(engine.pop_changeset().is_none());
    assert_eq!(engine.log().len(), 1);
}

#[test]
fn pop_changeset_walks_back_to_the_batch_start() {
    let (mut engine, _scene) = engine_and_scene();
    let mut first = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Object)
        .with_target_ids(id("a"))
        .with_properties(bag(json!({ "position": [1, 1] })));
    first.start_batch = Some(true);
    let middle = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Object)
        .with_target_ids(id("b"))
        .with_properties(bag(json!({ "position": [2, 2] })));
    let mut last = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Object)
        .with_target_ids(id("c"))
        .with_properties(bag(json!({ "position": [3, 3] })));
    last.end_batch = Some(true);
    engine.apply_change(None, &first);
    engine.apply_change(None, &middle);
    engine.apply_change(None, &last);

    let popped = engine.pop_changeset().expect("batched changeset");
    assert_eq!(popped.len(), 3);
    assert_eq!(engine.log().len(), 1);

    // Redo restores the run verbatim and in order.
    engine.push_changeset(popped);
    assert_eq!(engine.log().len(), 4);
    let restored = ChangeRecord::from_wire(&engine.log()[1]).expect("parse");
    assert!(restored.starts_batch());
}

#[test]
fn can_undo_respects_board_and_table_unlink() {
    let (mut engine, mut scene) = engine_and_scene();
    assert!(!engine.can_undo());

    engine.add_point(Some(&mut scene), [1.0, 1.0], None);
    assert!(engine.can_undo());

    let source_id = SourceId::new("t1").expect("source id");
    engine.register_data_source(Box::new(TableSource::new("t1")));
    engine.remove_table_link(Some(&mut scene), &source_id, Some(link_props("l1", "t1")));
    assert!(!engine.can_undo());
}

#[test]
fn telemetry_receives_flattened_payloads() {
    let (mut engine, mut scene) = engine_and_scene();
    let telemetry = RecordingTelemetry::default();
    let events = telemetry.events.clone();
    engine.set_telemetry(Box::new(telemetry));

    engine.add_point(Some(&mut scene), [1.0, 2.0], Some(bag(json!({ "id": "p1" }))));

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    let (operation, payload) = &events[0];
    assert_eq!(*operation, ChangeOp::Create);
    assert_eq!(payload.get("target"), Some(&json!("point")));
    // The single bag is flattened to the top level.
    assert_eq!(payload.get("id"), Some(&json!("p1")));
    assert!(payload.get("operation").is_none());
}

#[test]
fn disabled_features_make_records_noops() {
    let (mut engine, mut scene) = engine_and_scene();
    engine.set_disabled_features(vec!["image".to_owned()]);
    let result = engine.add_image(
        Some(&mut scene),
        "my/image/url",
        [0.0, 0.0],
        [5.0, 5.0],
        None,
    );
    assert!(result.is_none());
    assert_eq!(scene.len(), 0);
}

#[test]
fn selection_expansion_follows_the_vertices() {
    let (mut engine, mut scene) = engine_and_scene();
    add_triangle(&mut engine, &mut scene);

    engine.select_objects(&scene, &[id("v1"), id("poly")]);
    assert!(engine.has_selection());
    // poly's directly-selected entry is its own; expansion does not add
    // siblings while vertices are missing from the selection.
    let expanded = engine.get_selected_ids_and_children(&scene);
    assert_eq!(expanded, vec![id("v1"), id("poly")]);

    engine.select_objects(&scene, &[id("v2"), id("v3")]);
    let expanded = engine.get_selected_ids_and_children(&scene);
    assert_eq!(
        expanded,
        vec![id("v1"), id("v2"), id("v3"), id("poly")]
    );
}

#[test]
fn delete_selection_cascades_and_logs_one_record() {
    let (mut engine, mut scene) = engine_and_scene();
    add_triangle(&mut engine, &mut scene);
    let log_before = engine.log().len();

    engine.select_objects(&scene, &[id("v1"), id("v2")]);
    engine.delete_selection(&mut scene);

    assert!(!scene.contains(&id("poly")));
    assert!(scene.contains(&id("v3")));
    assert!(!engine.has_selection());
    assert_eq!(engine.log().len(), log_before + 1);
}

#[test]
fn copy_selection_remaps_ids_in_creation_order() {
    let (mut engine, mut scene) = engine_and_scene();
    add_triangle(&mut engine, &mut scene);
    engine.select_objects(&scene, &[id("v1"), id("v2"), id("v3")]);

    let copies = engine.copy_selection(&scene);
    assert_eq!(copies.len(), 4);

    let records: Vec<ChangeRecord> = copies
        .iter()
        .map(|wire| ChangeRecord::from_wire(wire).expect("copy parses"))
        .collect();
    let point_ids: Vec<String> = records[..3]
        .iter()
        .map(|record| {
            record
                .single_properties()
                .and_then(PropertyBag::id)
                .expect("fresh id")
                .into_string()
        })
        .collect();
    assert!(point_ids.iter().all(|fresh| fresh != "v1"));

    let polygon = &records[3];
    assert_eq!(polygon.target, ChangeTarget::Kind(ObjectKind::Polygon));
    let parent_ids: Vec<String> = polygon
        .parents
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| Some(p.as_str()?.to_owned()))
        .collect();
    assert_eq!(parent_ids, point_ids);
}

#[test]
fn copy_selection_takes_whole_movable_lines() {
    let (mut engine, mut scene) = engine_and_scene();
    engine.add_movable_line(
        Some(&mut scene),
        [[0.0, 0.0], [5.0, 5.0]],
        Some(bag(json!({ "id": "ml" }))),
    );
    engine.select_objects(&scene, &[id("ml-point1"), id("ml-point2"), id("ml")]);

    let copies = engine.copy_selection(&scene);
    assert_eq!(copies.len(), 1);
    let record = ChangeRecord::from_wire(&copies[0]).expect("parse");
    assert_eq!(record.target, ChangeTarget::Kind(ObjectKind::MovableLine));
    assert_eq!(
        record.parents,
        Some(vec![json!([0, 0]), json!([5, 5])])
    );
}

#[test]
fn segment_label_update_round_trips_through_the_engine() {
    let (mut engine, mut scene) = engine_and_scene();
    add_triangle(&mut engine, &mut scene);

    engine
        .update_polygon_segment_label(
            Some(&mut scene),
            &id("poly"),
            [&id("v1"), &id("v2")],
            SegmentLabelOption::Length,
        )
        .expect("label update");

    assert_eq!(
        crate::agents::polygon::segment_label_text(&scene, &id("poly"), &id("v1"), &id("v2")),
        Some("5.0".to_owned())
    );
}

#[test]
fn rescale_board_writes_a_board_scale_update() {
    let (mut engine, mut scene) = engine_and_scene();
    engine
        .rescale_board(
            &mut scene,
            super::AxesParams {
                x_min: -2.0,
                x_max: 22.0,
                y_min: -1.0,
                y_max: 15.0,
                ..Default::default()
            },
        )
        .expect("rescale");

    let last = ChangeRecord::from_wire(engine.log().last().expect("record")).expect("parse");
    assert_eq!(last.target, ChangeTarget::Board);
    let scale = last
        .single_properties()
        .and_then(|bag| bag.get("boardScale"))
        .and_then(Value::as_object)
        .expect("board scale");
    assert_eq!(scale.get("xMin"), Some(&json!(-2)));
    let board = scene.board();
    assert!((board.bounding_box[0] - -2.0).abs() < 1e-9);
}

#[test]
fn image_url_rewrite_touches_creates_and_updates() {
    let (mut engine, mut scene) = engine_and_scene();
    engine.add_image(
        Some(&mut scene),
        "old/url",
        [0.0, 0.0],
        [5.0, 5.0],
        Some(bag(json!({ "id": "i1" }))),
    );
    let update = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Kind(ObjectKind::Image))
        .with_target_ids(id("i1"))
        .with_properties(bag(json!({ "url": "old/url" })));
    engine.apply_change(Some(&mut scene), &update);

    engine.update_image_url("old/url", "new/url");
    assert_eq!(
        engine.last_image_url(),
        Some(("new/url".to_owned(), None))
    );
    assert!(engine.log().iter().all(|wire| !wire.contains("old/url")));
}

#[test]
fn shared_selection_mirrors_linked_rows() {
    let (mut engine, mut scene) = engine_and_scene();
    let mut source = TableSource::new("t1");
    source.add_column("c1", Some("#0069ff"));
    source.add_row("r1", 1.0, &[2.0]);
    engine.register_data_source(Box::new(source));
    let shared = SharedSelectionStub::default();
    let rows = shared.rows.clone();
    engine.set_shared_selection(Box::new(shared));

    let source_id = SourceId::new("t1").expect("source id");
    let created = engine.add_table_link(Some(&mut scene), &source_id, link_props("l1", "t1"));
    assert_eq!(created, vec![id("r1:c1")]);
    assert!(engine.is_linked_to(&source_id));

    engine.select_objects(&scene, &[id("r1:c1")]);
    assert!(rows.borrow().contains("r1"));
    engine.deselect_all(&scene);
    assert!(!rows.borrow().contains("r1"));
}

#[test]
fn rows_change_create_update_delete_flow() {
    let (mut engine, mut scene) = engine_and_scene();
    let mut source = TableSource::new("t1");
    source.add_column("c1", Some("#0069ff"));
    source.add_row("r1", 1.0, &[2.0]);
    source.add_row("r2", 3.0, &[4.0]);
    engine.register_data_source(Box::new(source));
    let source_id = SourceId::new("t1").expect("source id");
    engine.add_table_link(Some(&mut scene), &source_id, link_props("l1", "t1"));
    assert_eq!(scene.len(), 2);

    // A cell update moves the linked point.
    // (The engine reads positions from the registered source.)
    engine.sync_rows_change(
        Some(&mut scene),
        &source_id,
        &RowsChange::Update {
            row_ids: vec![crate::model::RowId::new("r2").expect("row id")],
        },
        &link_props("l2", "t1"),
    );
    assert_eq!(scene.position(&id("r2:c1")), Some((3.0, 4.0)));

    // Row deletion removes the row's points across all columns.
    engine.sync_rows_change(
        Some(&mut scene),
        &source_id,
        &RowsChange::Delete {
            row_ids: vec![crate::model::RowId::new("r2").expect("row id")],
        },
        &link_props("l3", "t1"),
    );
    assert!(!scene.contains(&id("r2:c1")));
    assert!(scene.contains(&id("r1:c1")));
}

#[test]
fn column_creation_adds_points_for_every_row() {
    let (mut engine, mut scene) = engine_and_scene();
    let mut source = TableSource::new("t1");
    source.add_column("c1", Some("#0069ff"));
    source.add_row("r1", 1.0, &[2.0]);
    source.add_row("r2", 3.0, &[4.0]);
    engine.register_data_source(Box::new(source));
    let source_id = SourceId::new("t1").expect("source id");

    engine.sync_columns_change(
        Some(&mut scene),
        &source_id,
        &ColumnsChange::Create {
            column_ids: vec![crate::model::ColumnId::new("c1").expect("column id")],
        },
        &link_props("l1", "t1"),
    );

    assert_eq!(scene.position(&id("r1:c1")), Some((1.0, 2.0)));
    assert_eq!(scene.position(&id("r2:c1")), Some((3.0, 4.0)));
    assert_eq!(
        scene
            .get(&id("r1:c1"))
            .expect("linked point")
            .str_attribute("linkColor"),
        Some("#0069ff")
    );
}

#[test]
fn column_deletion_removes_points_across_all_rows() {
    let (mut engine, mut scene) = engine_and_scene();
    let mut source = TableSource::new("t1");
    source.add_column("c1", Some("#0069ff"));
    source.add_column("c2", Some("#ff6900"));
    source.add_row("r1", 1.0, &[2.0, 3.0]);
    source.add_row("r2", 4.0, &[5.0, 6.0]);
    engine.register_data_source(Box::new(source));
    let source_id = SourceId::new("t1").expect("source id");
    engine.add_table_link(Some(&mut scene), &source_id, link_props("l1", "t1"));
    assert_eq!(scene.len(), 4);

    engine.sync_columns_change(
        Some(&mut scene),
        &source_id,
        &ColumnsChange::Delete {
            column_ids: vec![crate::model::ColumnId::new("c2").expect("column id")],
        },
        &link_props("l2", "t1"),
    );
    assert!(!scene.contains(&id("r1:c2")));
    assert!(!scene.contains(&id("r2:c2")));
    assert!(scene.contains(&id("r1:c1")));
    assert!(scene.contains(&id("r2:c1")));
}

#[test]
fn linking_a_source_annotates_the_axis_labels() {
    let (mut engine, mut scene) = engine_and_scene();
    let mut source = TableSource::new("t1");
    source.set_axis_labels(Some("time"), Some("height"));
    source.add_column("c1", Some("#0069ff"));
    source.add_row("r1", 1.0, &[2.0]);
    engine.register_data_source(Box::new(source));

    let source_id = SourceId::new("t1").expect("source id");
    engine.add_table_link(Some(&mut scene), &source_id, link_props("l1", "t1"));

    let board = scene.board();
    assert_eq!(board.x_axis_label.as_deref(), Some("x (time)"));
    assert_eq!(board.y_axis_label.as_deref(), Some("y (height)"));

    engine.remove_table_link(Some(&mut scene), &source_id, None);
    let board = scene.board();
    assert_eq!(board.x_axis_label.as_deref(), Some("x"));
    assert_eq!(board.y_axis_label.as_deref(), Some("y"));
}

#[test]
fn table_link_create_for_unknown_source_is_vetoed() {
    let (mut engine, mut scene) = engine_and_scene();
    let source_id = SourceId::new("ghost").expect("source id");
    let created = engine.add_table_link(Some(&mut scene), &source_id, link_props("l1", "ghost"));
    assert!(created.is_empty());
    assert!(scene.is_empty());
}

#[test]
fn engine_round_trips_through_the_interchange_document() {
    let (mut engine, mut scene) = engine_and_scene();
    add_triangle(&mut engine, &mut scene);
    engine.update_title(Some(&mut scene), "Shapes");

    let exported = engine.export_document();
    let mut imported = GeometryEngine::from_document(&exported).expect("imports");
    imported.initialize_scene().expect("board");
    assert_eq!(imported.export_document(), exported);
    assert_eq!(imported.title(), Some("Shapes"));
}

#[test]
fn from_document_accepts_the_wire_format() {
    let (mut engine, mut scene) = engine_and_scene();
    engine.add_point(Some(&mut scene), [1.0, 1.0], Some(bag(json!({ "id": "p1" }))));

    let doc = json!({
        "type": "Geometry",
        "changes": engine.log().to_vec(),
    });
    let mut restored = GeometryEngine::from_document(&doc).expect("wire document");
    let scene = restored.initialize_scene().expect("board");
    assert!(scene.contains(&id("p1")));
}
