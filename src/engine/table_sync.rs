// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Translation of external tabular row/column events into linked-point
//! change records, keyed by the composite `rowId:columnId` id.

use serde_json::{json, Value};
use tracing::warn;

use crate::model::{
    linked_point_id, ChangeOp, ChangeRecord, ChangeTarget, ColumnId, LinkProps, ObjectId,
    Properties, PropertyBag, RowId, SourceId,
};
use crate::scene::Scene;

use super::GeometryEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnUpdate {
    pub column_id: ColumnId,
    pub renamed: bool,
    pub expression_changed: bool,
}

/// A column-level event from the external source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnsChange {
    Create { column_ids: Vec<ColumnId> },
    Update { updates: Vec<ColumnUpdate> },
    Delete { column_ids: Vec<ColumnId> },
}

/// A row-level event from the external source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowsChange {
    Create { row_ids: Vec<RowId> },
    Update { row_ids: Vec<RowId> },
    Delete { row_ids: Vec<RowId> },
}

impl GeometryEngine {
    /// Positions of the points for the given columns across every row,
    /// paired with their composite ids.
    fn cell_positions(
        &self,
        source_id: &SourceId,
        row_ids: &[RowId],
        column_ids: &[ColumnId],
    ) -> (Vec<ObjectId>, Vec<[Option<f64>; 2]>) {
        let Some(source) = self.source(source_id) else {
            return (Vec::new(), Vec::new());
        };
        let mut ids = Vec::new();
        let mut positions = Vec::new();
        for row_id in row_ids {
            for column_id in column_ids {
                ids.push(linked_point_id(row_id, column_id));
                positions.push(source.position(row_id, column_id));
            }
        }
        (ids, positions)
    }

    /// Links an external source: one linked point per (row, column)
    /// cell, created atomically through a single tableLink record.
    pub fn add_table_link(
        &mut self,
        scene: Option<&mut Scene>,
        source_id: &SourceId,
        links: LinkProps,
    ) -> Vec<ObjectId> {
        let Some(source) = self.source(source_id) else {
            warn!(source = %source_id, "cannot link an unregistered data source");
            return Vec::new();
        };

        let mut x_label = links.axis_label("xAxis").map(ToOwned::to_owned);
        let mut y_label = links.axis_label("yAxis").map(ToOwned::to_owned);
        let [source_x, source_y] = source.axis_labels();
        if x_label.is_none() {
            x_label = source_x;
        }
        if y_label.is_none() {
            y_label = source_y;
        }

        let mut ids: Vec<Value> = Vec::new();
        let mut points: Vec<Value> = Vec::new();
        for row_id in source.row_ids() {
            let label = source.row_label(&row_id);
            for column_id in source.column_ids() {
                let [x, y] = source.position(&row_id, &column_id);
                ids.push(json!(linked_point_id(&row_id, &column_id).as_str()));
                let mut point = serde_json::Map::new();
                if let Some(label) = &label {
                    point.insert("label".to_owned(), json!(label));
                }
                point.insert(
                    "coords".to_owned(),
                    Value::Array(vec![
                        x.map_or(Value::Null, crate::model::number_value),
                        y.map_or(Value::Null, crate::model::number_value),
                    ]),
                );
                points.push(Value::Object(point));
            }
        }

        self.metadata
            .add_source_link(source_id.clone(), x_label, y_label);

        let mut bag = PropertyBag::new();
        bag.set("ids", Value::Array(ids));
        bag.set("points", Value::Array(points));
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::TableLink)
            .with_target_ids(ObjectId::new(source_id.as_str()).expect("non-empty source id"))
            .with_properties(bag)
            .with_links(links);
        self.apply_change(scene, &change).unwrap_or_default()
    }

    /// Unlinks a source, removing every point it drives.
    pub fn remove_table_link(
        &mut self,
        scene: Option<&mut Scene>,
        source_id: &SourceId,
        links: Option<LinkProps>,
    ) -> Option<Vec<ObjectId>> {
        self.metadata.remove_source_link(source_id);
        let mut change = ChangeRecord::new(ChangeOp::Delete, ChangeTarget::TableLink)
            .with_target_ids(ObjectId::new(source_id.as_str()).expect("non-empty source id"));
        if let Some(links) = links {
            change = change.with_links(links);
        }
        self.apply_change(scene, &change)
    }

    /// Emits the axis-label refresh record after link names changed.
    pub fn update_axis_labels(
        &mut self,
        scene: Option<&mut Scene>,
        source_id: &SourceId,
        links: Option<LinkProps>,
    ) -> Option<Vec<ObjectId>> {
        let mut bag = PropertyBag::new();
        bag.set("axisLabels", Value::Bool(true));
        let mut change = ChangeRecord::new(ChangeOp::Update, ChangeTarget::TableLink)
            .with_target_ids(ObjectId::new(source_id.as_str()).expect("non-empty source id"))
            .with_properties(bag);
        if let Some(links) = links {
            change = change.with_links(links);
        }
        self.apply_change(scene, &change)
    }

    /// Translates a column event: new columns add a point per row,
    /// expression changes move the column's points, deletion removes
    /// the column's points across all rows.
    pub fn sync_columns_change(
        &mut self,
        mut scene: Option<&mut Scene>,
        source_id: &SourceId,
        change: &ColumnsChange,
        links: &LinkProps,
    ) {
        if self.source(source_id).is_none() {
            warn!(source = %source_id, "column change for an unregistered data source, skipping");
            return;
        }
        let row_ids = self
            .source(source_id)
            .map(|source| source.row_ids())
            .unwrap_or_default();

        let mut refresh_labels = false;
        match change {
            ColumnsChange::Create { column_ids } => {
                let (ids, positions) = self.cell_positions(source_id, &row_ids, column_ids);
                if !ids.is_empty() {
                    let bags = ids.iter().map(|id| PropertyBag::with_id(id.clone())).collect();
                    self.add_points(
                        scene.as_deref_mut(),
                        &positions,
                        Some(bags),
                        Some(links.clone()),
                    );
                }
                refresh_labels = true;
            }
            ColumnsChange::Update { updates } => {
                let recomputed: Vec<ColumnId> = updates
                    .iter()
                    .filter(|update| update.expression_changed)
                    .map(|update| update.column_id.clone())
                    .collect();
                refresh_labels = updates.iter().any(|update| update.renamed);
                if !recomputed.is_empty() {
                    let (ids, positions) = self.cell_positions(source_id, &row_ids, &recomputed);
                    if !ids.is_empty() {
                        let bags: Vec<PropertyBag> = positions
                            .iter()
                            .map(|[x, y]| {
                                let mut bag = PropertyBag::new();
                                bag.set(
                                    "position",
                                    Value::Array(vec![
                                        x.map_or(Value::Null, crate::model::number_value),
                                        y.map_or(Value::Null, crate::model::number_value),
                                    ]),
                                );
                                bag
                            })
                            .collect();
                        self.update_objects(
                            scene.as_deref_mut(),
                            ids,
                            Properties::Many(bags),
                            Some(links.clone()),
                        );
                    }
                }
            }
            ColumnsChange::Delete { column_ids } => {
                let mut ids = Vec::new();
                for column_id in column_ids {
                    for row_id in &row_ids {
                        ids.push(linked_point_id(row_id, column_id));
                    }
                }
                if !ids.is_empty() {
                    self.remove_objects(scene.as_deref_mut(), ids, Some(links.clone()));
                }
                refresh_labels = true;
            }
        }

        if refresh_labels {
            self.update_axis_labels(scene, source_id, Some(links.clone()));
        }
    }

    /// Translates a row event: new rows add a point per column, updates
    /// move the row's points, deletion removes the row's points across
    /// all columns.
    pub fn sync_rows_change(
        &mut self,
        scene: Option<&mut Scene>,
        source_id: &SourceId,
        change: &RowsChange,
        links: &LinkProps,
    ) {
        let Some(source) = self.source(source_id) else {
            warn!(source = %source_id, "row change for an unregistered data source, skipping");
            return;
        };
        let column_ids = source.column_ids();

        match change {
            RowsChange::Create { row_ids } => {
                let (ids, positions) = self.cell_positions(source_id, row_ids, &column_ids);
                if !ids.is_empty() {
                    let bags = ids.iter().map(|id| PropertyBag::with_id(id.clone())).collect();
                    self.add_points(scene, &positions, Some(bags), Some(links.clone()));
                }
            }
            RowsChange::Update { row_ids } => {
                let (ids, positions) = self.cell_positions(source_id, row_ids, &column_ids);
                if !ids.is_empty() {
                    let bags: Vec<PropertyBag> = positions
                        .iter()
                        .map(|[x, y]| {
                            let mut bag = PropertyBag::new();
                            bag.set(
                                "position",
                                Value::Array(vec![
                                    x.map_or(Value::Null, crate::model::number_value),
                                    y.map_or(Value::Null, crate::model::number_value),
                                ]),
                            );
                            bag
                        })
                        .collect();
                    self.update_objects(scene, ids, Properties::Many(bags), Some(links.clone()));
                }
            }
            RowsChange::Delete { row_ids } => {
                let mut ids = Vec::new();
                for row_id in row_ids {
                    for column_id in &column_ids {
                        ids.push(linked_point_id(row_id, column_id));
                    }
                }
                if !ids.is_empty() {
                    self.remove_objects(scene, ids, Some(links.clone()));
                }
            }
        }
    }
}
