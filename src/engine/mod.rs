// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The content-log engine: the authoritative ordered sequence of
//! serialized change records, batching for atomic compound operations,
//! changeset pop/push for undo/redo, selection state, and the hooks
//! tying table links and titles into every applied record.

pub mod selection;
pub mod table_sync;

#[cfg(test)]
pub(crate) mod fixtures;

use std::collections::HashMap;
use std::fmt;

use serde_json::{json, Value};
use tracing::warn;

use crate::agents::movable_line;
use crate::agents::point::SNAP_UNIT;
use crate::agents::polygon::{self, SegmentLabelOption};
use crate::dispatch::{DispatchContext, DispatchHooks, Dispatcher};
use crate::format::{default_board_change, export_document, import_document};
use crate::geometry;
use crate::model::{
    normalize, ChangeOp, ChangeRecord, ChangeTarget, LinkProps, ObjectId, ObjectKind, Properties,
    PropertyBag, SourceId,
};
use crate::scene::Scene;

pub use crate::agents::LinkedDataSource;
pub use selection::{SelectionSet, SharedSelection};
pub use table_sync::{ColumnUpdate, ColumnsChange, RowsChange};

/// Receives a flattened `(operation, properties)` record on every
/// apply; failures to record are the collaborator's problem, never the
/// engine's.
pub trait Telemetry {
    fn log_change(&mut self, operation: ChangeOp, payload: &Value);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A stateful operation needs a live scene and the log could not
    /// produce one (no board-create record survived).
    NotReady,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => f.write_str("no live scene: the log contains no board creation"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Batching state machine: records are buffered while batching and
/// flushed to the log exactly on the transition back to idle.
enum SyncState {
    Idle,
    Batching { depth: u32, buffered: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkedSourceEntry {
    id: SourceId,
    x: Option<String>,
    y: Option<String>,
}

/// Engine-side state that never enters the change log: the display
/// title, disabled features, and table-link bookkeeping.
#[derive(Debug, Default)]
struct EngineMetadata {
    title: Option<String>,
    disabled_features: Vec<String>,
    linked_sources: Vec<LinkedSourceEntry>,
}

impl EngineMetadata {
    fn is_disabled(&self, feature: &str) -> bool {
        self.disabled_features.iter().any(|f| f == feature)
    }

    fn is_linked_to(&self, source_id: &SourceId) -> bool {
        self.linked_sources.iter().any(|entry| &entry.id == source_id)
    }

    fn add_source_link(&mut self, source_id: SourceId, x: Option<String>, y: Option<String>) {
        if !self.is_linked_to(&source_id) {
            self.linked_sources.push(LinkedSourceEntry {
                id: source_id,
                x,
                y,
            });
        }
    }

    fn remove_source_link(&mut self, source_id: &SourceId) {
        self.linked_sources.retain(|entry| &entry.id != source_id);
    }

    fn set_source_names(&mut self, source_id: &SourceId, x: Option<String>, y: Option<String>) {
        if let Some(entry) = self
            .linked_sources
            .iter_mut()
            .find(|entry| &entry.id == source_id)
        {
            if x.is_some() {
                entry.x = x;
            }
            if y.is_some() {
                entry.y = y;
            }
        }
    }

    fn axis_label(&self, base: &str, annotation: Option<&str>, x_axis: bool) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(annotation) = annotation {
            if !annotation.is_empty() {
                parts.push(annotation.to_owned());
            }
        }
        let default_name = if x_axis { "x" } else { "y" };
        for entry in &self.linked_sources {
            let name = if x_axis {
                entry.x.as_deref()
            } else {
                entry.y.as_deref()
            };
            if let Some(name) = name {
                if name != default_name && name != base {
                    parts.push(name.to_owned());
                }
            }
        }
        if parts.is_empty() {
            base.to_owned()
        } else {
            format!("{base} ({})", parts.join(", "))
        }
    }
}

/// Per-apply hooks: metadata/title upkeep, table-link bookkeeping (with
/// veto when the source is gone), and axis-label resync afterwards.
struct EngineHooks<'a> {
    metadata: &'a mut EngineMetadata,
    sources: &'a [Box<dyn LinkedDataSource>],
}

fn change_source_id(change: &ChangeRecord) -> Option<SourceId> {
    if change.target == ChangeTarget::TableLink {
        return SourceId::new(change.target_ids().first()?.as_str()).ok();
    }
    change.links.as_ref()?.source_id().cloned()
}

impl DispatchHooks for EngineHooks<'_> {
    fn is_feature_disabled(&self, feature: &str) -> bool {
        self.metadata.is_disabled(feature)
    }

    fn will_apply(&mut self, change: &ChangeRecord) -> bool {
        if change.operation == ChangeOp::Update && change.target == ChangeTarget::Metadata {
            if let Some(title) = change
                .single_properties()
                .and_then(|bag| bag.str_prop("title"))
            {
                self.metadata.title = Some(title.to_owned());
            }
        }

        if change.target == ChangeTarget::TableLink {
            let Some(source_id) = change_source_id(change) else {
                return true;
            };
            let x_label = change
                .links
                .as_ref()
                .and_then(|links| links.axis_label("xAxis"))
                .map(ToOwned::to_owned);
            let y_label = change
                .links
                .as_ref()
                .and_then(|links| links.axis_label("yAxis"))
                .map(ToOwned::to_owned);
            match change.operation {
                ChangeOp::Create => {
                    let registered = self
                        .sources
                        .iter()
                        .any(|source| source.source_id() == &source_id);
                    if !registered {
                        // The source is no longer present; ignore the
                        // change entirely.
                        return false;
                    }
                    self.metadata.add_source_link(source_id, x_label, y_label);
                }
                ChangeOp::Delete => self.metadata.remove_source_link(&source_id),
                ChangeOp::Update => {
                    if x_label.is_some() || y_label.is_some() {
                        self.metadata.set_source_names(&source_id, x_label, y_label);
                    }
                }
            }
        }
        true
    }

    fn did_apply(&mut self, scene: &mut Scene, change: &ChangeRecord) {
        let affects_axes = change.target == ChangeTarget::TableLink
            || (change.target == ChangeTarget::Board && change.operation != ChangeOp::Delete);
        if !affects_axes {
            return;
        }

        let board = scene.board();
        let x_base = board.x_name.clone().unwrap_or_else(|| "x".to_owned());
        let y_base = board.y_name.clone().unwrap_or_else(|| "y".to_owned());
        let x_annotation = board.x_annotation.clone();
        let y_annotation = board.y_annotation.clone();
        let x_label = self
            .metadata
            .axis_label(&x_base, x_annotation.as_deref(), true);
        let y_label = self
            .metadata
            .axis_label(&y_base, y_annotation.as_deref(), false);
        scene.board_mut().sync_axis_labels(x_label, y_label);
    }
}

pub struct GeometryEngine {
    log: Vec<String>,
    sync: SyncState,
    dispatcher: Dispatcher,
    metadata: EngineMetadata,
    selection: SelectionSet,
    telemetry: Option<Box<dyn Telemetry>>,
    sources: Vec<Box<dyn LinkedDataSource>>,
}

impl GeometryEngine {
    /// A fresh engine whose log starts with the board's own creation.
    /// A `title` key in the overrides becomes a metadata update emitted
    /// before the board record.
    pub fn new(overrides: Option<PropertyBag>) -> Self {
        let mut log = Vec::new();
        let mut board_overrides = overrides;
        if let Some(bag) = board_overrides.as_mut() {
            if let Some(title) = bag.remove("title") {
                let mut title_bag = PropertyBag::new();
                title_bag.set("title", title);
                log.push(
                    ChangeRecord::new(ChangeOp::Update, ChangeTarget::Metadata)
                        .with_properties(title_bag)
                        .to_wire(),
                );
            }
        }
        log.push(default_board_change(board_overrides.as_ref()).to_wire());
        Self::from_log(log)
    }

    pub fn from_log(log: Vec<String>) -> Self {
        Self {
            log,
            sync: SyncState::Idle,
            dispatcher: Dispatcher::new(),
            metadata: EngineMetadata::default(),
            selection: SelectionSet::new(),
            telemetry: None,
            sources: Vec::new(),
        }
    }

    /// Builds an engine from either document form: a nested interchange
    /// document is imported, a wire-format document (`changes` array of
    /// serialized records) is taken as the log directly.
    pub fn from_document(value: &Value) -> Option<Self> {
        if let Some(changes) = import_document(value) {
            return Some(Self::from_log(changes));
        }
        let changes = value.get("changes")?.as_array()?;
        let log = changes
            .iter()
            .map(|change| match change {
                Value::String(wire) => wire.clone(),
                other => other.to_string(),
            })
            .collect();
        Some(Self::from_log(log))
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    pub fn set_disabled_features(&mut self, features: Vec<String>) {
        self.metadata.disabled_features = features;
    }

    pub fn set_telemetry(&mut self, telemetry: Box<dyn Telemetry>) {
        self.telemetry = Some(telemetry);
    }

    pub fn set_shared_selection(&mut self, shared: Box<dyn SharedSelection>) {
        self.selection.set_shared(shared);
    }

    /// Registers an external tabular source; registration doubles as
    /// the link-color resolver linked-point creation requires.
    pub fn register_data_source(&mut self, source: Box<dyn LinkedDataSource>) {
        self.sources.push(source);
    }

    pub fn is_linked(&self) -> bool {
        !self.metadata.linked_sources.is_empty()
    }

    pub fn is_linked_to(&self, source_id: &SourceId) -> bool {
        self.metadata.is_linked_to(source_id)
    }

    pub(crate) fn source(&self, source_id: &SourceId) -> Option<&dyn LinkedDataSource> {
        self.sources
            .iter()
            .find(|source| source.source_id() == source_id)
            .map(AsRef::as_ref)
    }

    // ---- applying changes ------------------------------------------------

    /// Dispatches one record into the live scene without touching the
    /// log; used by replay and by `apply_change`.
    pub fn sync_change(&mut self, scene: &mut Scene, change: &ChangeRecord) -> Option<Vec<ObjectId>> {
        let Self {
            dispatcher,
            metadata,
            sources,
            ..
        } = self;
        let sources: &[Box<dyn LinkedDataSource>] = sources.as_slice();
        let data_source = change_source_id(change)
            .and_then(|id| sources.iter().find(|source| source.source_id() == &id))
            .map(AsRef::as_ref);
        let mut hooks = EngineHooks { metadata, sources };
        let mut ctx = DispatchContext {
            hooks: &mut hooks,
            data_source,
        };
        dispatcher.apply(scene, change, &mut ctx)
    }

    /// Normalizes, dispatches (when a live scene is attached), appends
    /// the serialized record to the log or the pending batch, and tells
    /// the telemetry collaborator. Returns the dispatcher's result.
    pub fn apply_change(
        &mut self,
        scene: Option<&mut Scene>,
        change: &ChangeRecord,
    ) -> Option<Vec<ObjectId>> {
        let result = match scene {
            Some(scene) => self.sync_change(scene, change),
            None => None,
        };

        let wire = change.to_wire();
        match &mut self.sync {
            SyncState::Idle => self.log.push(wire),
            SyncState::Batching { buffered, .. } => buffered.push(wire),
        }

        if let Some(telemetry) = &mut self.telemetry {
            telemetry.log_change(change.operation, &flattened_payload(change));
        }

        result
    }

    /// Replays the log from empty into a fresh scene. Malformed records
    /// are skipped with a warning; a log that never creates the board
    /// cannot produce a live scene.
    pub fn initialize_scene(&mut self) -> Result<Scene, EngineError> {
        let mut scene = Scene::new();
        let wires = self.log.clone();
        for wire in &wires {
            match ChangeRecord::from_wire(wire) {
                Ok(change) => {
                    self.sync_change(&mut scene, &change);
                }
                Err(error) => {
                    warn!(%error, "skipping malformed log record during replay");
                }
            }
        }
        if !scene.board().ready {
            return Err(EngineError::NotReady);
        }
        Ok(scene)
    }

    // ---- batching --------------------------------------------------------

    /// Nestable; while suspended, applied records are buffered instead
    /// of written to the log. Dispatch still happens eagerly, so the
    /// scene updates immediately.
    pub fn suspend_sync(&mut self) {
        self.sync = match std::mem::replace(&mut self.sync, SyncState::Idle) {
            SyncState::Idle => SyncState::Batching {
                depth: 1,
                buffered: Vec::new(),
            },
            SyncState::Batching { depth, buffered } => SyncState::Batching {
                depth: depth + 1,
                buffered,
            },
        };
    }

    /// Leaves the outermost batch, flushing buffered records to the log
    /// in order. Unbalanced calls warn and change nothing.
    pub fn resume_sync(&mut self) {
        self.sync = match std::mem::replace(&mut self.sync, SyncState::Idle) {
            SyncState::Idle => {
                warn!("resume_sync without matching suspend_sync");
                SyncState::Idle
            }
            SyncState::Batching { depth: 1, buffered } => {
                self.log.extend(buffered);
                SyncState::Idle
            }
            SyncState::Batching { depth, buffered } => SyncState::Batching {
                depth: depth - 1,
                buffered,
            },
        };
    }

    pub fn is_sync_suspended(&self) -> bool {
        matches!(self.sync, SyncState::Batching { .. })
    }

    pub fn batch_change_count(&self) -> usize {
        match &self.sync {
            SyncState::Idle => 0,
            SyncState::Batching { buffered, .. } => buffered.len(),
        }
    }

    // ---- changesets ------------------------------------------------------

    /// Removes and returns the trailing changeset: the last record, or
    /// the whole `startBatch..endBatch` run it closes. The board
    /// creation is never popped.
    pub fn pop_changeset(&mut self) -> Option<Vec<String>> {
        if self.log.len() <= 1 {
            return None;
        }

        let mut changes = Vec::new();
        let wire = self.log.pop()?;
        let parsed = ChangeRecord::from_wire(&wire).ok();
        changes.push(wire);

        if parsed.is_some_and(|change| change.ends_batch()) {
            while self.log.len() > 1 {
                let wire = self.log.pop().expect("length checked");
                let parsed = ChangeRecord::from_wire(&wire).ok();
                changes.insert(0, wire);
                match parsed {
                    Some(change) if !change.starts_batch() => continue,
                    _ => break,
                }
            }
        }
        Some(changes)
    }

    /// Re-appends a previously popped changeset verbatim.
    pub fn push_changeset(&mut self, changes: Vec<String>) {
        self.log.extend(changes);
    }

    pub fn can_undo(&self) -> bool {
        if self.log.len() <= 1 {
            return false;
        }
        let Some(change) = self
            .log
            .last()
            .and_then(|wire| ChangeRecord::from_wire(wire).ok())
        else {
            return false;
        };
        // Unlinking a table is not undoable.
        if change.operation == ChangeOp::Delete && change.target == ChangeTarget::TableLink {
            return false;
        }
        match change.links {
            None => true,
            // A linked change is only undoable while its source is
            // still registered to mirror the undo on its side.
            Some(links) => links
                .source_id()
                .is_some_and(|source_id| self.source(source_id).is_some()),
        }
    }

    // ---- operations ------------------------------------------------------

    pub fn add_point(
        &mut self,
        scene: Option<&mut Scene>,
        position: [f64; 2],
        properties: Option<PropertyBag>,
    ) -> Option<ObjectId> {
        let mut bag = PropertyBag::with_id(ObjectId::generate());
        if let Some(properties) = &properties {
            bag.merge(properties);
        }
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Point))
            .with_parents(vec![
                crate::model::number_value(position[0]),
                crate::model::number_value(position[1]),
            ])
            .with_properties(bag);
        self.apply_change(scene, &change)?.into_iter().next()
    }

    /// Batched point creation; with `links` the points are linked to an
    /// external source and carry the link on the record.
    pub fn add_points(
        &mut self,
        scene: Option<&mut Scene>,
        positions: &[[Option<f64>; 2]],
        properties: Option<Vec<PropertyBag>>,
        links: Option<LinkProps>,
    ) -> Vec<ObjectId> {
        let kind = if links.is_some() {
            ObjectKind::LinkedPoint
        } else {
            ObjectKind::Point
        };
        let parents: Vec<Value> = positions
            .iter()
            .map(|[x, y]| {
                Value::Array(vec![
                    x.map_or(Value::Null, crate::model::number_value),
                    y.map_or(Value::Null, crate::model::number_value),
                ])
            })
            .collect();
        let bags: Vec<PropertyBag> = positions
            .iter()
            .enumerate()
            .map(|(index, _)| {
                let mut bag = PropertyBag::with_id(ObjectId::generate());
                if let Some(properties) = &properties {
                    if let Some(given) = properties.get(index).or_else(|| properties.first()) {
                        bag.merge(given);
                    }
                }
                bag
            })
            .collect();

        let mut change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(kind))
            .with_parents(parents)
            .with_properties(bags);
        if let Some(links) = links {
            change = change.with_links(links);
        }
        self.apply_change(scene, &change).unwrap_or_default()
    }

    pub fn add_image(
        &mut self,
        scene: Option<&mut Scene>,
        url: &str,
        coords: [f64; 2],
        size: [f64; 2],
        properties: Option<PropertyBag>,
    ) -> Option<ObjectId> {
        let mut bag = PropertyBag::with_id(ObjectId::generate());
        if let Some(properties) = &properties {
            bag.merge(properties);
        }
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Image))
            .with_parents(vec![
                json!(url),
                crate::model::coord_value(coords[0], coords[1]),
                crate::model::coord_value(size[0], size[1]),
            ])
            .with_properties(bag);
        self.apply_change(scene, &change)?.into_iter().next()
    }

    pub fn add_movable_line(
        &mut self,
        scene: Option<&mut Scene>,
        endpoints: [[f64; 2]; 2],
        properties: Option<PropertyBag>,
    ) -> Option<Vec<ObjectId>> {
        let mut bag = PropertyBag::with_id(ObjectId::generate());
        if let Some(properties) = &properties {
            bag.merge(properties);
        }
        let change = ChangeRecord::new(
            ChangeOp::Create,
            ChangeTarget::Kind(ObjectKind::MovableLine),
        )
        .with_parents(vec![
            crate::model::coord_value(endpoints[0][0], endpoints[0][1]),
            crate::model::coord_value(endpoints[1][0], endpoints[1][1]),
        ])
        .with_properties(bag);
        self.apply_change(scene, &change)
    }

    pub fn add_comment(
        &mut self,
        scene: Option<&mut Scene>,
        anchor_id: &ObjectId,
        text: Option<&str>,
    ) -> Option<Vec<ObjectId>> {
        let mut bag = PropertyBag::with_id(ObjectId::generate());
        bag.set("anchor", json!(anchor_id.as_str()));
        if let Some(text) = text {
            bag.set("text", json!(text));
        }
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Comment))
            .with_properties(bag);
        self.apply_change(scene, &change)
    }

    pub fn add_vertex_angle(
        &mut self,
        scene: Option<&mut Scene>,
        parents: [&ObjectId; 3],
        properties: Option<PropertyBag>,
    ) -> Option<ObjectId> {
        let mut bag = PropertyBag::with_id(ObjectId::generate());
        if let Some(properties) = &properties {
            bag.merge(properties);
        }
        let change = ChangeRecord::new(
            ChangeOp::Create,
            ChangeTarget::Kind(ObjectKind::VertexAngle),
        )
        .with_parents(parents.iter().map(|id| json!(id.as_str())).collect())
        .with_properties(bag);
        self.apply_change(scene, &change)?.into_iter().next()
    }

    /// Builds a polygon over every currently free point, optionally
    /// restricted to the free points of one linked source column.
    pub fn create_polygon_from_free_points(
        &mut self,
        scene: &mut Scene,
        link: Option<(&str, &str)>,
        properties: Option<PropertyBag>,
    ) -> Option<ObjectId> {
        let free = scene.free_point_ids(link);
        if free.len() < 2 {
            return None;
        }
        let mut bag = PropertyBag::with_id(ObjectId::generate());
        if let Some(properties) = &properties {
            bag.merge(properties);
        }
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Polygon))
            .with_parents(free.iter().map(|id| json!(id.as_str())).collect())
            .with_properties(bag);
        self.apply_change(Some(scene), &change)?.into_iter().next()
    }

    pub fn remove_objects(
        &mut self,
        scene: Option<&mut Scene>,
        ids: Vec<ObjectId>,
        links: Option<LinkProps>,
    ) -> Option<Vec<ObjectId>> {
        let mut change =
            ChangeRecord::new(ChangeOp::Delete, ChangeTarget::Object).with_target_ids(ids);
        if let Some(links) = links {
            change = change.with_links(links);
        }
        self.apply_change(scene, &change)
    }

    pub fn update_objects(
        &mut self,
        scene: Option<&mut Scene>,
        ids: Vec<ObjectId>,
        properties: Properties,
        links: Option<LinkProps>,
    ) -> Option<Vec<ObjectId>> {
        let mut change = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Object)
            .with_target_ids(ids)
            .with_properties(properties);
        if let Some(links) = links {
            change = change.with_links(links);
        }
        self.apply_change(scene, &change)
    }

    pub fn update_title(&mut self, scene: Option<&mut Scene>, title: &str) {
        let mut bag = PropertyBag::new();
        bag.set("title", json!(title));
        let change =
            ChangeRecord::new(ChangeOp::Update, ChangeTarget::Metadata).with_properties(bag);
        self.apply_change(scene, &change);
        // Without a live scene the hooks never run; the title must not
        // silently diverge from the log.
        self.metadata.title = Some(title.to_owned());
    }

    pub fn update_polygon_segment_label(
        &mut self,
        scene: Option<&mut Scene>,
        polygon_id: &ObjectId,
        points: [&ObjectId; 2],
        option: SegmentLabelOption,
    ) -> Option<Vec<ObjectId>> {
        let mut bag = PropertyBag::new();
        bag.set("labelOption", json!(option.as_str()));
        let change = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Kind(ObjectKind::Polygon))
            .with_target_ids(polygon_id.clone())
            .with_parents(points.iter().map(|id| json!(id.as_str())).collect())
            .with_properties(bag);
        self.apply_change(scene, &change)
    }

    /// Rescales the board to the given axis ranges, deriving new units
    /// from the current canvas minus the axis buffers.
    pub fn rescale_board(
        &mut self,
        scene: &mut Scene,
        params: AxesParams,
    ) -> Option<Vec<ObjectId>> {
        let board = scene.board();
        let width = board.canvas_width - geometry::AXIS_BUFFER * 2.0;
        let height = board.canvas_height - geometry::AXIS_BUFFER * 2.0;
        let unit_x = geometry::pixels_per_unit(board.canvas_width, params.x_min, params.x_max);
        let unit_y = geometry::pixels_per_unit(board.canvas_height, params.y_min, params.y_max);

        let mut scale = serde_json::Map::new();
        scale.insert("xMin".to_owned(), crate::model::number_value(params.x_min));
        scale.insert("yMin".to_owned(), crate::model::number_value(params.y_min));
        scale.insert("unitX".to_owned(), crate::model::number_value(unit_x));
        scale.insert("unitY".to_owned(), crate::model::number_value(unit_y));
        scale.insert("canvasWidth".to_owned(), crate::model::number_value(width));
        scale.insert(
            "canvasHeight".to_owned(),
            crate::model::number_value(height),
        );
        if let Some(name) = params.x_name {
            scale.insert("xName".to_owned(), json!(name));
        }
        if let Some(name) = params.y_name {
            scale.insert("yName".to_owned(), json!(name));
        }
        if let Some(annotation) = params.x_annotation {
            scale.insert("xAnnotation".to_owned(), json!(annotation));
        }
        if let Some(annotation) = params.y_annotation {
            scale.insert("yAnnotation".to_owned(), json!(annotation));
        }

        let mut bag = PropertyBag::new();
        bag.set("boardScale", Value::Object(scale));
        let change =
            ChangeRecord::new(ChangeOp::Update, ChangeTarget::Board).with_properties(bag);
        self.apply_change(Some(scene), &change)
    }

    // ---- image url maintenance ------------------------------------------

    /// Rewrites stored image urls in place, e.g. after an upload gave a
    /// transient url its permanent home.
    pub fn update_image_url(&mut self, old_url: &str, new_url: &str) {
        if old_url.is_empty() || new_url.is_empty() || old_url == new_url {
            return;
        }
        for wire in &mut self.log {
            let Ok(mut change) = ChangeRecord::from_wire(wire) else {
                continue;
            };
            let mut modified = false;
            match change.operation {
                ChangeOp::Create => {
                    if change.target == ChangeTarget::Kind(ObjectKind::Image) {
                        if let Some(parents) = change.parents.as_mut() {
                            if parents.first().and_then(Value::as_str) == Some(old_url) {
                                parents[0] = json!(new_url);
                                modified = true;
                            }
                        }
                    }
                }
                ChangeOp::Update => {
                    if let Some(Properties::One(bag)) = change.properties.as_mut() {
                        if bag.str_prop("url") == Some(old_url) {
                            bag.set("url", json!(new_url));
                            modified = true;
                        }
                    }
                }
                ChangeOp::Delete => {}
            }
            if modified {
                *wire = change.to_wire();
            }
        }
    }

    /// The most recent image url in the log, with its stored filename.
    pub fn last_image_url(&self) -> Option<(String, Option<String>)> {
        for wire in self.log.iter().rev() {
            let Ok(change) = ChangeRecord::from_wire(wire) else {
                continue;
            };
            match change.operation {
                ChangeOp::Create if change.target == ChangeTarget::Kind(ObjectKind::Image) => {
                    if let Some(url) = change
                        .parents
                        .as_deref()
                        .and_then(|parents| parents.first())
                        .and_then(Value::as_str)
                    {
                        let filename = change
                            .single_properties()
                            .and_then(|bag| bag.str_prop("filename"))
                            .map(ToOwned::to_owned);
                        return Some((url.to_owned(), filename));
                    }
                }
                ChangeOp::Update => {
                    if let Some(bag) = change.single_properties() {
                        if let Some(url) = bag.str_prop("url") {
                            let filename = bag.str_prop("filename").map(ToOwned::to_owned);
                            return Some((url.to_owned(), filename));
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    // ---- selection -------------------------------------------------------

    pub fn is_selected(&self, id: &ObjectId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn has_selection(&self) -> bool {
        self.selection.has_selection()
    }

    pub fn select_objects(&mut self, scene: &Scene, ids: &[ObjectId]) {
        for id in ids {
            self.selection.set_selected(Some(scene), id, true);
        }
    }

    pub fn deselect_objects(&mut self, scene: &Scene, ids: &[ObjectId]) {
        for id in ids {
            self.selection.set_selected(Some(scene), id, false);
        }
    }

    pub fn deselect_all(&mut self, scene: &Scene) {
        self.selection.deselect_all(Some(scene));
    }

    pub fn get_selected_ids(&self, scene: &Scene) -> Vec<ObjectId> {
        self.selection.selected_ids(scene)
    }

    pub fn get_deletable_selected_ids(&self, scene: &Scene) -> Vec<ObjectId> {
        self.selection.deletable_selected_ids(scene)
    }

    pub fn get_selected_ids_and_children(&self, scene: &Scene) -> Vec<ObjectId> {
        self.selection.selected_ids_and_children(scene)
    }

    /// Deletes the deletable selection, expanded over the polygon
    /// sharing rules, as a single generic delete record.
    pub fn delete_selection(&mut self, scene: &mut Scene) {
        let selected = self.get_deletable_selected_ids(scene);
        let staged = polygon::prepare_delete_ids(scene, &selected);
        self.deselect_all(scene);
        if !staged.is_empty() {
            self.remove_objects(Some(scene), staged, None);
        }
    }

    /// Builds fresh-id create records for the expanded selection, in
    /// creation order, for an external clipboard to re-apply.
    pub fn copy_selection(&self, scene: &Scene) -> Vec<String> {
        let mut ids = self.get_selected_ids_and_children(scene);
        ids.sort_by_key(|id| scene.creation_index(id));
        let gathered = self.gather_object_properties(&ids);

        let new_ids: HashMap<ObjectId, ObjectId> = ids
            .iter()
            .map(|id| (id.clone(), ObjectId::generate()))
            .collect();

        let mut changes = Vec::new();
        for id in &ids {
            let Some(object) = scene.get(id) else {
                continue;
            };
            let mut bag = gathered.get(id).cloned().unwrap_or_default();
            bag.set("id", json!(new_ids[id].as_str()));
            if let Some(name) = object.name() {
                bag.set("name", json!(name));
            }

            let change = match object.kind() {
                ObjectKind::Point | ObjectKind::LinkedPoint => {
                    // Control points travel with their line, not alone.
                    let owns_line = movable_line::line_id_of_control_point(id)
                        .is_some_and(|line| scene.contains(&line));
                    if owns_line {
                        continue;
                    }
                    let Some((x, y)) = object.position() else {
                        continue;
                    };
                    if object.kind() == ObjectKind::LinkedPoint {
                        // Copies of linked points become free and snap.
                        bag.set("snapToGrid", json!(true));
                        bag.set("snapSizeX", json!(SNAP_UNIT));
                        bag.set("snapSizeY", json!(SNAP_UNIT));
                    }
                    ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Point))
                        .with_parents(vec![
                            crate::model::number_value(x),
                            crate::model::number_value(y),
                        ])
                        .with_properties(bag)
                }
                ObjectKind::Polygon => {
                    let parents: Vec<Value> = object
                        .dependencies()
                        .iter()
                        .filter_map(|dep| Some(json!(new_ids.get(dep)?.as_str())))
                        .collect();
                    if parents.len() < 2 {
                        continue;
                    }
                    ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Polygon))
                        .with_parents(parents)
                        .with_properties(bag)
                }
                ObjectKind::VertexAngle => {
                    let points: Vec<&ObjectId> = object
                        .dependencies()
                        .iter()
                        .filter(|dep| {
                            matches!(
                                scene.kind_of(dep),
                                Some(ObjectKind::Point | ObjectKind::LinkedPoint)
                            )
                        })
                        .collect();
                    let parents: Vec<Value> = points
                        .iter()
                        .filter_map(|dep| Some(json!(new_ids.get(*dep)?.as_str())))
                        .collect();
                    if parents.len() != 3 {
                        continue;
                    }
                    ChangeRecord::new(
                        ChangeOp::Create,
                        ChangeTarget::Kind(ObjectKind::VertexAngle),
                    )
                    .with_parents(parents)
                    .with_properties(bag)
                }
                ObjectKind::MovableLine => {
                    let [p1, p2] = movable_line::control_point_ids(id);
                    let (Some(a), Some(b)) = (scene.position(&p1), scene.position(&p2)) else {
                        continue;
                    };
                    ChangeRecord::new(
                        ChangeOp::Create,
                        ChangeTarget::Kind(ObjectKind::MovableLine),
                    )
                    .with_parents(vec![
                        crate::model::coord_value(a.0, a.1),
                        crate::model::coord_value(b.0, b.1),
                    ])
                    .with_properties(bag)
                }
                ObjectKind::Comment => {
                    let Some(anchor) = object
                        .dependencies()
                        .first()
                        .and_then(|anchor| new_ids.get(anchor))
                    else {
                        continue;
                    };
                    bag.set("anchor", json!(anchor.as_str()));
                    ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Comment))
                        .with_properties(bag)
                }
                ObjectKind::Image => continue,
            };
            changes.push(change.to_wire());
        }
        changes
    }

    /// Non-positional properties accumulated per object across the log.
    fn gather_object_properties(&self, ids: &[ObjectId]) -> HashMap<ObjectId, PropertyBag> {
        let mut gathered: HashMap<ObjectId, PropertyBag> =
            ids.iter().map(|id| (id.clone(), PropertyBag::new())).collect();
        for wire in &self.log {
            let Ok(change) = ChangeRecord::from_wire(wire) else {
                continue;
            };
            for normalized in normalize(&change) {
                let Some(id) = normalized.target_ids().first() else {
                    continue;
                };
                let Some(bag) = gathered.get_mut(id) else {
                    continue;
                };
                if let Some(properties) = normalized.single_properties() {
                    let mut properties = properties.clone();
                    properties.remove("position");
                    bag.merge(&properties);
                }
            }
        }
        gathered
    }

    // ---- export ----------------------------------------------------------

    pub fn export_document(&self) -> Value {
        export_document(&self.log)
    }
}

/// Axis parameters for a board rescale.
#[derive(Debug, Clone, Default)]
pub struct AxesParams {
    pub x_name: Option<String>,
    pub x_annotation: Option<String>,
    pub x_min: f64,
    pub x_max: f64,
    pub y_name: Option<String>,
    pub y_annotation: Option<String>,
    pub y_min: f64,
    pub y_max: f64,
}

/// Telemetry form of a record: the single property bag flattened into
/// the top level, the operation carried separately.
fn flattened_payload(change: &ChangeRecord) -> Value {
    let mut value = serde_json::to_value(change).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("operation");
        match map.remove("properties") {
            Some(Value::Object(bag)) => {
                for (key, entry) in bag {
                    map.insert(key, entry);
                }
            }
            Some(other) => {
                map.insert("properties".to_owned(), other);
            }
            None => {}
        }
    }
    value
}

#[cfg(test)]
mod tests;
