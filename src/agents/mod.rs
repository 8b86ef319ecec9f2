// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Type agents: one create/update/delete handler per object kind.
//!
//! Agents receive normalized (single-target) records and mutate the live
//! scene. They never touch the content log; logging is the engine's job.

pub mod board;
pub mod comment;
pub mod image;
pub mod linked_point;
pub mod movable_line;
pub mod object;
pub mod point;
pub mod polygon;
pub mod vertex_angle;

use serde_json::{Map, Value};

use crate::model::{ChangeRecord, ColumnId, ObjectId, ObjectKind, PropertyBag, RowId, SourceId};
use crate::scene::Scene;

pub use polygon::SegmentLabelOption;

/// Ids created or affected by one applied record; `None` means the
/// record did not apply (unresolvable reference, missing collaborator,
/// unknown kind).
pub type AgentResult = Option<Vec<ObjectId>>;

/// External tabular data source consumed by the linked-point and
/// table-link agents. Registration of a source doubles as the "link
/// color" resolver a linked-point create requires.
pub trait LinkedDataSource {
    fn source_id(&self) -> &SourceId;
    fn row_ids(&self) -> Vec<RowId>;
    fn column_ids(&self) -> Vec<ColumnId>;
    /// Cell position for a linked point; either component may be absent.
    fn position(&self, row_id: &RowId, column_id: &ColumnId) -> [Option<f64>; 2];
    fn row_label(&self, row_id: &RowId) -> Option<String>;
    fn axis_labels(&self) -> [Option<String>; 2];
    fn link_color(&self, column_id: &ColumnId) -> Option<String>;
}

/// Collaborators an agent may need while applying a record.
pub struct AgentContext<'a> {
    pub data_source: Option<&'a dyn LinkedDataSource>,
}

impl AgentContext<'_> {
    pub fn detached() -> Self {
        AgentContext { data_source: None }
    }
}

pub trait ChangeAgent {
    fn create(&self, scene: &mut Scene, change: &ChangeRecord, ctx: &AgentContext<'_>)
        -> AgentResult;
    fn update(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult;
    fn delete(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult;
}

/// The full set of registered agents, constructed once at engine start
/// and owned by the dispatcher.
#[derive(Debug, Default)]
pub struct AgentSet {
    point: point::PointAgent,
    linked_point: linked_point::LinkedPointAgent,
    polygon: polygon::PolygonAgent,
    vertex_angle: vertex_angle::VertexAngleAgent,
    movable_line: movable_line::MovableLineAgent,
    image: image::ImageAgent,
    comment: comment::CommentAgent,
    board: board::BoardAgent,
    table_link: linked_point::TableLinkAgent,
}

impl AgentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_kind(&self, kind: ObjectKind) -> &dyn ChangeAgent {
        match kind {
            ObjectKind::Point => &self.point,
            ObjectKind::LinkedPoint => &self.linked_point,
            ObjectKind::Polygon => &self.polygon,
            ObjectKind::VertexAngle => &self.vertex_angle,
            ObjectKind::MovableLine => &self.movable_line,
            ObjectKind::Image => &self.image,
            ObjectKind::Comment => &self.comment,
        }
    }

    pub fn board(&self) -> &board::BoardAgent {
        &self.board
    }

    pub fn table_link(&self) -> &linked_point::TableLinkAgent {
        &self.table_link
    }
}

/// The target id of a normalized record, falling back to the property
/// bag's `id` field.
pub(crate) fn target_or_bag_id(change: &ChangeRecord) -> Option<ObjectId> {
    change
        .target_ids()
        .first()
        .cloned()
        .or_else(|| change.single_properties()?.id())
}

/// Reads a flat `parents: [x, y]` pair from a normalized record.
pub(crate) fn flat_coord_parents(change: &ChangeRecord) -> [Option<f64>; 2] {
    let parents = change.parents.as_deref().unwrap_or(&[]);
    [
        parents.first().and_then(Value::as_f64),
        parents.get(1).and_then(Value::as_f64),
    ]
}

/// Property-bag entries destined for the scene attribute bag, with the
/// structural keys stripped.
pub(crate) fn attributes_from_bag(bag: Option<&PropertyBag>, skip: &[&str]) -> Map<String, Value> {
    let mut attributes = Map::new();
    if let Some(bag) = bag {
        for (key, value) in &bag.0 {
            if key != "id" && key != "position" && !skip.contains(&key.as_str()) {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }
    attributes
}
