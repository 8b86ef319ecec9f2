// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::json;
use tracing::debug;

use crate::geometry::point_in_polygon;
use crate::model::{ChangeRecord, ObjectId, ObjectKind};
use crate::scene::Scene;

use super::{attributes_from_bag, object, target_or_bag_id, AgentContext, AgentResult, ChangeAgent};

pub const DEFAULT_RADIUS: f64 = 1.0;

/// Offset along the bisector used by the orientation probe, in board
/// units.
const BISECTOR_EPSILON: f64 = 0.1;

#[derive(Debug, Default)]
pub struct VertexAngleAgent;

/// Angle at `vertex` swept from the ray toward `from` to the ray toward
/// `to`, in `[0, 2*PI)`. Measured in the renderer's screen orientation
/// (y axis pointing down), i.e. clockwise in board coordinates.
fn sweep_angle(from: (f64, f64), vertex: (f64, f64), to: (f64, f64)) -> f64 {
    let start = (from.1 - vertex.1).atan2(from.0 - vertex.0);
    let end = (to.1 - vertex.1).atan2(to.0 - vertex.0);
    let mut sweep = start - end;
    if sweep < 0.0 {
        sweep += std::f64::consts::TAU;
    }
    sweep
}

/// The polygon every one of the given points participates in, if any.
fn owning_polygon(scene: &Scene, points: &[ObjectId]) -> Option<ObjectId> {
    let first = points.first()?;
    scene
        .dependents_of(first)
        .iter()
        .find(|candidate| {
            scene.kind_of(candidate) == Some(ObjectKind::Polygon)
                && points
                    .iter()
                    .all(|point| scene.dependencies_of(candidate).contains(point))
        })
        .cloned()
}

/// Chooses the parent order so the rendered sweep matches the visually
/// smaller angle: a probe point nudged from the vertex along the
/// bisector is tested against the owning polygon, and when that
/// disagrees with the raw magnitude heuristic (`sweep <= PI`) the point
/// order is reversed.
fn oriented_parents(
    scene: &Scene,
    parents: &[ObjectId; 3],
    polygon_id: Option<&ObjectId>,
) -> [ObjectId; 3] {
    let reversed = || [parents[2].clone(), parents[1].clone(), parents[0].clone()];

    let Some(polygon_id) = polygon_id else {
        return parents.clone();
    };
    let (Some(p0), Some(p1), Some(p2)) = (
        scene.position(&parents[0]),
        scene.position(&parents[1]),
        scene.position(&parents[2]),
    ) else {
        return parents.clone();
    };

    let mid = ((p0.0 + p2.0) / 2.0, (p0.1 + p2.1) / 2.0);
    let diff = (mid.0 - p1.0, mid.1 - p1.1);
    let length = (diff.0 * diff.0 + diff.1 * diff.1).sqrt();
    if length == 0.0 {
        return parents.clone();
    }
    let scale = BISECTOR_EPSILON / length;
    let probe = (p1.0 + diff.0 * scale, p1.1 + diff.1 * scale);

    let ring: Vec<(f64, f64)> = scene
        .dependencies_of(polygon_id)
        .iter()
        .filter_map(|vertex| scene.position(vertex))
        .collect();
    let probe_inside = point_in_polygon(probe, &ring);
    let sweep = sweep_angle(p0, p1, p2);

    if probe_inside == (sweep <= std::f64::consts::PI) {
        parents.clone()
    } else {
        reversed()
    }
}

impl ChangeAgent for VertexAngleAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let parents = change.parent_ids();
        let parents: [ObjectId; 3] = match <[ObjectId; 3]>::try_from(parents) {
            Ok(parents) => parents,
            Err(_) => {
                debug!("vertex angle requires exactly three point parents");
                return None;
            }
        };
        if parents.iter().any(|id| !scene.contains(id)) {
            return None;
        }

        let polygon_id = owning_polygon(scene, &parents);
        let ordered = oriented_parents(scene, &parents, polygon_id.as_ref());

        let id = target_or_bag_id(change).unwrap_or_else(ObjectId::generate);
        let mut attributes = attributes_from_bag(change.single_properties(), &[]);
        attributes
            .entry("radius".to_owned())
            .or_insert_with(|| json!(DEFAULT_RADIUS));

        let mut dependencies: Vec<ObjectId> = ordered.to_vec();
        if let Some(polygon_id) = polygon_id {
            dependencies.push(polygon_id);
        }

        scene
            .insert(id.clone(), ObjectKind::VertexAngle, None, attributes, dependencies)
            .then(|| vec![id])
    }

    fn update(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let id = change.target_ids().first()?;
        let bag = change.single_properties()?;
        object::update_object(scene, id, bag).then(Vec::new)
    }

    fn delete(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let id = change.target_ids().first()?;
        let removed = object::delete_object(scene, id);
        (!removed.is_empty()).then_some(removed)
    }
}
