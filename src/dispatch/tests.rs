// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::json;

use super::{DispatchContext, DispatchHooks, Dispatcher, NoHooks};
use crate::model::{ChangeOp, ChangeRecord, ChangeTarget, ObjectId, ObjectKind, PropertyBag};
use crate::scene::Scene;

fn id(value: &str) -> ObjectId {
    ObjectId::new(value).expect("object id")
}

fn bag(value: serde_json::Value) -> PropertyBag {
    PropertyBag(value.as_object().expect("object").clone())
}

fn apply(dispatcher: &Dispatcher, scene: &mut Scene, change: &ChangeRecord) -> Option<Vec<ObjectId>> {
    let mut hooks = NoHooks;
    let mut ctx = DispatchContext {
        hooks: &mut hooks,
        data_source: None,
    };
    dispatcher.apply(scene, change, &mut ctx)
}

fn point_create(name: &str, x: f64, y: f64) -> ChangeRecord {
    ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Point))
        .with_parents(vec![json!(x), json!(y)])
        .with_properties(bag(json!({ "id": name })))
}

fn triangle(dispatcher: &Dispatcher, scene: &mut Scene) {
    for (name, x, y) in [("v1", 0.0, 0.0), ("v2", 5.0, 0.0), ("v3", 0.0, 5.0)] {
        apply(dispatcher, scene, &point_create(name, x, y)).expect("point");
    }
    let polygon = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Polygon))
        .with_parents(vec![json!("v1"), json!("v2"), json!("v3")])
        .with_properties(bag(json!({ "id": "poly" })));
    apply(dispatcher, scene, &polygon).expect("polygon");
}

#[test]
fn batched_point_create_places_every_point() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Point))
        .with_parents(vec![json!([0, 0]), json!([5, 5])])
        .with_properties(vec![bag(json!({ "id": "p1" })), bag(json!({ "id": "p2" }))]);

    let created = apply(&dispatcher, &mut scene, &change).expect("created");
    assert_eq!(created, vec![id("p1"), id("p2")]);
    assert_eq!(scene.position(&id("p1")), Some((0.0, 0.0)));
    assert_eq!(scene.position(&id("p2")), Some((5.0, 5.0)));
}

#[test]
fn generic_delete_resolves_concrete_kinds() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    triangle(&dispatcher, &mut scene);
    let line = ChangeRecord::new(
        ChangeOp::Create,
        ChangeTarget::Kind(ObjectKind::MovableLine),
    )
    .with_parents(vec![json!([1, 1]), json!([2, 2])])
    .with_properties(bag(json!({ "id": "l1" })));
    apply(&dispatcher, &mut scene, &line).expect("line");

    // Heterogeneous selection: the caller knows no concrete kinds.
    let delete = ChangeRecord::new(ChangeOp::Delete, ChangeTarget::Object)
        .with_target_ids(vec![id("poly"), id("l1")]);
    let removed = apply(&dispatcher, &mut scene, &delete).expect("removed");

    assert!(removed.contains(&id("poly")));
    assert!(removed.contains(&id("l1")));
    assert!(removed.contains(&id("l1-point1")));
    assert!(scene.contains(&id("v1")));
}

#[test]
fn generic_batched_delete_runs_newest_first() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    triangle(&dispatcher, &mut scene);

    // v2 then v1 leaves the polygon undersized; visiting in reverse
    // creation order trims before the undersize rule fires, and the
    // polygon is removed exactly once.
    let delete = ChangeRecord::new(ChangeOp::Delete, ChangeTarget::Object)
        .with_target_ids(vec![id("v1"), id("v2")]);
    let removed = apply(&dispatcher, &mut scene, &delete).expect("removed");

    assert_eq!(
        removed.iter().filter(|r| *r == &id("poly")).count(),
        1
    );
    assert!(scene.contains(&id("v3")));
    assert!(!scene.contains(&id("poly")));
}

#[test]
fn unknown_target_is_silently_ignored() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    let change = ChangeRecord::from_wire(
        r#"{"operation":"create","target":"hologram","properties":{"id":"h1"}}"#,
    )
    .expect("parse");
    assert!(apply(&dispatcher, &mut scene, &change).is_none());
    assert!(scene.is_empty());
}

#[test]
fn unresolvable_generic_target_is_a_noop() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    let delete =
        ChangeRecord::new(ChangeOp::Delete, ChangeTarget::Object).with_target_ids(id("ghost"));
    assert!(apply(&dispatcher, &mut scene, &delete).is_none());
}

struct RecordingHooks {
    disabled: Vec<String>,
    veto: bool,
    will_count: usize,
    did_count: usize,
}

impl DispatchHooks for RecordingHooks {
    fn is_feature_disabled(&self, feature: &str) -> bool {
        self.disabled.iter().any(|d| d == feature)
    }

    fn will_apply(&mut self, _change: &ChangeRecord) -> bool {
        self.will_count += 1;
        !self.veto
    }

    fn did_apply(&mut self, _scene: &mut Scene, _change: &ChangeRecord) {
        self.did_count += 1;
    }
}

#[test]
fn disabled_feature_records_are_noops() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    let mut hooks = RecordingHooks {
        disabled: vec!["point".to_owned()],
        veto: false,
        will_count: 0,
        did_count: 0,
    };
    let mut ctx = DispatchContext {
        hooks: &mut hooks,
        data_source: None,
    };
    let result = dispatcher.apply(&mut scene, &point_create("p1", 0.0, 0.0), &mut ctx);
    assert!(result.is_none());
    assert!(scene.is_empty());
    assert_eq!(hooks.will_count, 0);
}

#[test]
fn will_apply_veto_skips_and_did_apply_runs_after_apply() {
    let dispatcher = Dispatcher::new();
    let mut scene = Scene::new();
    let mut hooks = RecordingHooks {
        disabled: Vec::new(),
        veto: true,
        will_count: 0,
        did_count: 0,
    };
    {
        let mut ctx = DispatchContext {
            hooks: &mut hooks,
            data_source: None,
        };
        assert!(dispatcher
            .apply(&mut scene, &point_create("p1", 0.0, 0.0), &mut ctx)
            .is_none());
    }
    assert_eq!(hooks.will_count, 1);
    assert_eq!(hooks.did_count, 0);
    assert!(scene.is_empty());

    hooks.veto = false;
    {
        let mut ctx = DispatchContext {
            hooks: &mut hooks,
            data_source: None,
        };
        dispatcher
            .apply(&mut scene, &point_create("p1", 0.0, 0.0), &mut ctx)
            .expect("applied");
    }
    assert_eq!(hooks.did_count, 1);
    assert!(scene.contains(&id("p1")));
}
