// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: typed ids, object kinds, and the wire-level change
//! record with its normalization.

pub mod change;
pub mod ids;
pub mod kind;
pub mod normalize;

pub use change::{
    coord_pair, coord_value, number_value, AxisLabelEntry, ChangeOp, ChangeRecord, LinkProps,
    Properties, PropertyBag, TargetIds,
};
pub use ids::{
    linked_point_id, linked_point_parts, ColumnId, Id, IdError, LinkId, ObjectId, RowId, SourceId,
};
pub use kind::{ChangeTarget, ObjectKind};
pub use normalize::normalize;
