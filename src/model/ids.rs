// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A stable identifier used across the change log and scene surfaces.
///
/// This does not enforce a UUID format; callers may supply their own ids
/// (import documents carry explicit ids so that round trips are stable).
/// It only enforces that the id is non-empty, because empty ids would be
/// indistinguishable from an absent `targetID` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// A freshly generated, process-unique id.
    pub fn generate() -> Self {
        Self {
            value: Uuid::new_v4().simple().to_string(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    Empty,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("id must not be empty"),
        }
    }
}

impl std::error::Error for IdError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectIdTag {}
pub type ObjectId = Id<ObjectIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkIdTag {}
pub type LinkId = Id<LinkIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceIdTag {}
pub type SourceId = Id<SourceIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowIdTag {}
pub type RowId = Id<RowIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnIdTag {}
pub type ColumnId = Id<ColumnIdTag>;

/// Deterministic composite id of a point driven by an external tabular
/// cell: `<rowId>:<columnId>`.
pub fn linked_point_id(row_id: &RowId, column_id: &ColumnId) -> ObjectId {
    ObjectId::new(format!("{row_id}:{column_id}")).expect("non-empty composite id")
}

/// Splits a composite linked-point id back into its row/column parts.
pub fn linked_point_parts(id: &ObjectId) -> Option<(RowId, ColumnId)> {
    let (row, column) = id.as_str().split_once(':')?;
    let row_id = RowId::new(row).ok()?;
    let column_id = ColumnId::new(column).ok()?;
    Some((row_id, column_id))
}
