// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Test doubles for the engine's external collaborators.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use crate::agents::LinkedDataSource;
use crate::model::{ChangeOp, ColumnId, LinkId, LinkProps, RowId, SourceId};

use super::selection::SharedSelection;
use super::Telemetry;

/// In-memory tabular source: one x value per row, one y value per
/// (row, column) cell.
#[derive(Debug, Clone)]
pub(crate) struct TableSource {
    source_id: SourceId,
    columns: Vec<ColumnId>,
    rows: Vec<RowId>,
    x_values: HashMap<RowId, f64>,
    y_values: HashMap<(RowId, ColumnId), f64>,
    colors: HashMap<ColumnId, String>,
    x_label: Option<String>,
    y_label: Option<String>,
}

impl TableSource {
    pub(crate) fn new(source_id: &str) -> Self {
        Self {
            source_id: SourceId::new(source_id).expect("source id"),
            columns: Vec::new(),
            rows: Vec::new(),
            x_values: HashMap::new(),
            y_values: HashMap::new(),
            colors: HashMap::new(),
            x_label: None,
            y_label: None,
        }
    }

    pub(crate) fn add_column(&mut self, column_id: &str, color: Option<&str>) {
        let column_id = ColumnId::new(column_id).expect("column id");
        if let Some(color) = color {
            self.colors.insert(column_id.clone(), color.to_owned());
        }
        self.columns.push(column_id);
    }

    /// Adds one row: its shared x value and one y value per column, in
    /// column order.
    pub(crate) fn add_row(&mut self, row_id: &str, x: f64, ys: &[f64]) {
        let row_id = RowId::new(row_id).expect("row id");
        self.x_values.insert(row_id.clone(), x);
        for (column, y) in self.columns.iter().zip(ys.iter()) {
            self.y_values.insert((row_id.clone(), column.clone()), *y);
        }
        self.rows.push(row_id);
    }

    pub(crate) fn set_axis_labels(&mut self, x: Option<&str>, y: Option<&str>) {
        self.x_label = x.map(ToOwned::to_owned);
        self.y_label = y.map(ToOwned::to_owned);
    }
}

impl LinkedDataSource for TableSource {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    fn row_ids(&self) -> Vec<RowId> {
        self.rows.clone()
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.clone()
    }

    fn position(&self, row_id: &RowId, column_id: &ColumnId) -> [Option<f64>; 2] {
        [
            self.x_values.get(row_id).copied(),
            self.y_values.get(&(row_id.clone(), column_id.clone())).copied(),
        ]
    }

    fn row_label(&self, _row_id: &RowId) -> Option<String> {
        None
    }

    fn axis_labels(&self) -> [Option<String>; 2] {
        [self.x_label.clone(), self.y_label.clone()]
    }

    fn link_color(&self, column_id: &ColumnId) -> Option<String> {
        self.colors.get(column_id).cloned()
    }
}

pub(crate) fn link_props(link_id: &str, source_id: &str) -> LinkProps {
    LinkProps {
        id: LinkId::new(link_id).expect("link id"),
        source_ids: vec![SourceId::new(source_id).expect("source id")],
        labels: None,
    }
}

/// Captures telemetry emissions for assertions.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingTelemetry {
    pub(crate) events: Rc<RefCell<Vec<(ChangeOp, Value)>>>,
}

impl Telemetry for RecordingTelemetry {
    fn log_change(&mut self, operation: ChangeOp, payload: &Value) {
        self.events.borrow_mut().push((operation, payload.clone()));
    }
}

/// Shared-selection double tracking selected row ids.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedSelectionStub {
    pub(crate) rows: Rc<RefCell<HashSet<String>>>,
}

impl SharedSelection for SharedSelectionStub {
    fn select(&mut self, _source_id: &SourceId, row_id: &RowId, selected: bool) {
        let mut rows = self.rows.borrow_mut();
        if selected {
            rows.insert(row_id.as_str().to_owned());
        } else {
            rows.remove(row_id.as_str());
        }
    }

    fn is_row_selected(&self, row_id: &RowId) -> bool {
        self.rows.borrow().contains(row_id.as_str())
    }
}
