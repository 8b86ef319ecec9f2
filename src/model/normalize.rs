// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Expansion of batched change records into single-target records.
//!
//! A batched create (parallel parent/property lists) or a multi-id
//! update/delete expands into one logical record per target, preserving
//! order. Pure; never consults live scene state.

use serde_json::Value;

use super::change::{ChangeOp, ChangeRecord, Properties, TargetIds};

pub fn normalize(record: &ChangeRecord) -> Vec<ChangeRecord> {
    match record.operation {
        ChangeOp::Create => normalize_create(record),
        ChangeOp::Update | ChangeOp::Delete => normalize_targeted(record),
    }
}

fn normalize_create(record: &ChangeRecord) -> Vec<ChangeRecord> {
    let Some(Properties::Many(bags)) = &record.properties else {
        // Single create: the target id, when known, lives in the bag.
        let mut single = record.clone();
        if single.target_id.is_none() {
            if let Some(id) = single.single_properties().and_then(|bag| bag.id()) {
                single.target_id = Some(TargetIds::One(id));
            }
        }
        return vec![single];
    };

    let parents = record.parents.as_deref().unwrap_or(&[]);
    bags.iter()
        .enumerate()
        .map(|(index, bag)| {
            let mut normalized = ChangeRecord::new(record.operation, record.target.clone());
            normalized.parents = parents.get(index).map(entry_as_parents);
            normalized.target_id = bag.id().map(TargetIds::One);
            normalized.properties = Some(Properties::One(bag.clone()));
            normalized.links = record.links.clone();
            normalized
        })
        .collect()
}

fn normalize_targeted(record: &ChangeRecord) -> Vec<ChangeRecord> {
    let Some(TargetIds::Many(ids)) = &record.target_id else {
        return vec![record.clone()];
    };

    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            let mut normalized = ChangeRecord::new(record.operation, record.target.clone());
            normalized.target_id = Some(TargetIds::One(id.clone()));
            normalized.parents = record.parents.clone();
            normalized.properties = record
                .properties
                .as_ref()
                .and_then(|properties| properties.bag_at(index))
                .cloned()
                .map(Properties::One);
            normalized.links = record.links.clone();
            normalized
        })
        .collect()
}

/// A batched parent entry is itself the full parent list of the
/// normalized record: `[[0,0],[5,5]]` yields `parents: [0, 0]` and
/// `parents: [5, 5]`.
fn entry_as_parents(entry: &Value) -> Vec<Value> {
    match entry {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
