// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The wire-level change record: one serializable mutation instruction
//! against the diagram.
//!
//! Records are stored in the content log in canonical JSON string form.
//! Property bags are kept as raw JSON maps so that fields this version of
//! the engine does not understand survive a load/save cycle untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{LinkId, ObjectId, SourceId};
use super::kind::ChangeTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single id or an id list; batched records address several targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetIds {
    One(ObjectId),
    Many(Vec<ObjectId>),
}

impl TargetIds {
    pub fn as_slice(&self) -> &[ObjectId] {
        match self {
            Self::One(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<ObjectId> for TargetIds {
    fn from(id: ObjectId) -> Self {
        Self::One(id)
    }
}

impl From<Vec<ObjectId>> for TargetIds {
    fn from(ids: Vec<ObjectId>) -> Self {
        Self::Many(ids)
    }
}

/// A free-form property bag. Typed accessors cover the fields the engine
/// interprets; everything else is carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(pub Map<String, Value>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: ObjectId) -> Self {
        let mut bag = Self::default();
        bag.set("id", Value::String(id.into_string()));
        bag
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_owned(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Later bags win key-by-key, matching how the log folds updates.
    pub fn merge(&mut self, other: &PropertyBag) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn f64_prop(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    pub fn bool_prop(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn id(&self) -> Option<ObjectId> {
        ObjectId::new(self.str_prop("id")?).ok()
    }

    pub fn position(&self) -> Option<[Option<f64>; 2]> {
        coord_pair(self.get("position")?)
    }
}

/// Single bag or per-target bag list; pairs positionally with the
/// record's target ids (or parent entries for batched creates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Properties {
    One(PropertyBag),
    Many(Vec<PropertyBag>),
}

impl Properties {
    /// The bag paired with position `index`, broadcasting a single bag.
    pub fn bag_at(&self, index: usize) -> Option<&PropertyBag> {
        match self {
            Self::One(bag) => Some(bag),
            Self::Many(bags) => bags.get(index).or_else(|| bags.first()),
        }
    }

    pub fn single(&self) -> Option<&PropertyBag> {
        match self {
            Self::One(bag) => Some(bag),
            Self::Many(_) => None,
        }
    }

    pub fn batch_len(&self) -> Option<usize> {
        match self {
            Self::One(_) => None,
            Self::Many(bags) => Some(bags.len()),
        }
    }
}

impl From<PropertyBag> for Properties {
    fn from(bag: PropertyBag) -> Self {
        Self::One(bag)
    }
}

impl From<Vec<PropertyBag>> for Properties {
    fn from(bags: Vec<PropertyBag>) -> Self {
        Self::Many(bags)
    }
}

/// Ties a change record to an external tabular data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkProps {
    pub id: LinkId,
    #[serde(rename = "sourceIds")]
    pub source_ids: Vec<SourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<AxisLabelEntry>>,
}

impl LinkProps {
    pub fn source_id(&self) -> Option<&SourceId> {
        self.source_ids.first()
    }

    pub fn axis_label(&self, axis: &str) -> Option<&str> {
        self.labels
            .as_deref()?
            .iter()
            .find(|entry| entry.id == axis)
            .map(|entry| entry.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLabelEntry {
    pub id: String,
    pub label: String,
}

/// One mutation instruction. The first record of every log is the
/// board's own creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub operation: ChangeOp,
    pub target: ChangeTarget,
    #[serde(rename = "targetID", skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetIds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkProps>,
    #[serde(rename = "startBatch", skip_serializing_if = "Option::is_none")]
    pub start_batch: Option<bool>,
    #[serde(rename = "endBatch", skip_serializing_if = "Option::is_none")]
    pub end_batch: Option<bool>,
}

impl ChangeRecord {
    pub fn new(operation: ChangeOp, target: ChangeTarget) -> Self {
        Self {
            operation,
            target,
            target_id: None,
            parents: None,
            properties: None,
            links: None,
            start_batch: None,
            end_batch: None,
        }
    }

    pub fn with_target_ids(mut self, ids: impl Into<TargetIds>) -> Self {
        self.target_id = Some(ids.into());
        self
    }

    pub fn with_parents(mut self, parents: Vec<Value>) -> Self {
        self.parents = Some(parents);
        self
    }

    pub fn with_properties(mut self, properties: impl Into<Properties>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    pub fn with_links(mut self, links: LinkProps) -> Self {
        self.links = Some(links);
        self
    }

    /// Canonical string form used for log storage.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).expect("change record serializes")
    }

    pub fn from_wire(wire: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(wire)
    }

    pub fn target_ids(&self) -> &[ObjectId] {
        self.target_id.as_ref().map_or(&[], TargetIds::as_slice)
    }

    pub fn single_properties(&self) -> Option<&PropertyBag> {
        self.properties.as_ref()?.single()
    }

    pub fn parent_ids(&self) -> Vec<ObjectId> {
        self.parents
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter_map(|value| ObjectId::new(value.as_str()?).ok())
            .collect()
    }

    pub fn parent_coord(&self, index: usize) -> Option<[Option<f64>; 2]> {
        coord_pair(self.parents.as_deref()?.get(index)?)
    }

    pub fn starts_batch(&self) -> bool {
        self.start_batch.unwrap_or(false)
    }

    pub fn ends_batch(&self) -> bool {
        self.end_batch.unwrap_or(false)
    }
}

/// Reads a `[x, y]` pair, tolerating nulls for values an external source
/// has not supplied.
pub fn coord_pair(value: &Value) -> Option<[Option<f64>; 2]> {
    let entries = value.as_array()?;
    if entries.len() < 2 {
        return None;
    }
    Some([entries[0].as_f64(), entries[1].as_f64()])
}

pub fn coord_value(x: f64, y: f64) -> Value {
    Value::Array(vec![number_value(x), number_value(y)])
}

/// Emits integral values as JSON integers so that `5.0` and `5` compare
/// equal across a serialize/parse cycle.
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(serde_json::Number::from(value as i64))
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
