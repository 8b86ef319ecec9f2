// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The closed set of diagram object kinds the engine knows how to build.
///
/// The kind is carried explicitly on every scene object; generic
/// update/delete records resolve their concrete agent through it rather
/// than through an untyped attribute tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Point,
    LinkedPoint,
    Polygon,
    VertexAngle,
    MovableLine,
    Image,
    Comment,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::LinkedPoint => "linkedPoint",
            Self::Polygon => "polygon",
            Self::VertexAngle => "vertexAngle",
            Self::MovableLine => "movableLine",
            Self::Image => "image",
            Self::Comment => "comment",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "point" => Some(Self::Point),
            "linkedPoint" => Some(Self::LinkedPoint),
            "polygon" => Some(Self::Polygon),
            "vertexAngle" => Some(Self::VertexAngle),
            "movableLine" => Some(Self::MovableLine),
            "image" => Some(Self::Image),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    /// Whether objects of this kind can appear in an exported document.
    /// Linked points are always derived from their external source and
    /// never serialize on their own.
    pub fn supports_export(self) -> bool {
        !matches!(self, Self::LinkedPoint)
    }

    /// Minimum count of live dependencies required for export, if any.
    pub fn min_export_dependencies(self) -> Option<usize> {
        match self {
            Self::Comment => Some(1),
            Self::Polygon | Self::MovableLine => Some(2),
            Self::VertexAngle => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The addressee of a change record.
///
/// `Object` is the generic form used by callers that batch-update or
/// batch-delete a heterogeneous selection without knowing each member's
/// concrete kind. `Other` preserves target strings from newer or older
/// log formats; the dispatcher ignores them without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    Board,
    Metadata,
    Object,
    TableLink,
    Kind(ObjectKind),
    Other(String),
}

impl ChangeTarget {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Board => "board",
            Self::Metadata => "metadata",
            Self::Object => "object",
            Self::TableLink => "tableLink",
            Self::Kind(kind) => kind.as_str(),
            Self::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "board" => Self::Board,
            "metadata" => Self::Metadata,
            "object" => Self::Object,
            "tableLink" => Self::TableLink,
            _ => match ObjectKind::from_tag(tag) {
                Some(kind) => Self::Kind(kind),
                None => Self::Other(tag.to_owned()),
            },
        }
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        match self {
            Self::Kind(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChangeTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChangeTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag.is_empty() {
            return Err(D::Error::custom("change target must not be empty"));
        }
        Ok(Self::from_tag(&tag))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeTarget, ObjectKind};

    #[test]
    fn kind_tags_round_trip() {
        for kind in [
            ObjectKind::Point,
            ObjectKind::LinkedPoint,
            ObjectKind::Polygon,
            ObjectKind::VertexAngle,
            ObjectKind::MovableLine,
            ObjectKind::Image,
            ObjectKind::Comment,
        ] {
            assert_eq!(ObjectKind::from_tag(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_target_is_preserved() {
        let target = ChangeTarget::from_tag("hologram");
        assert_eq!(target, ChangeTarget::Other("hologram".to_owned()));
        assert_eq!(target.as_str(), "hologram");
    }

    #[test]
    fn linked_points_never_export() {
        assert!(!ObjectKind::LinkedPoint.supports_export());
        assert!(ObjectKind::Point.supports_export());
    }
}
