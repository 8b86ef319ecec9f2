// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Routes normalized change records to the registered type agents.
//!
//! Generic `object` records are expanded by inspecting each referenced
//! object's declared kind in the scene; batched generic deletes visit
//! their targets in reverse creation order so dependents are evaluated
//! before the objects backing them.

use tracing::debug;

use crate::agents::{AgentContext, AgentResult, AgentSet, ChangeAgent, LinkedDataSource};
use crate::model::{normalize, ChangeOp, ChangeRecord, ChangeTarget};
use crate::scene::Scene;

/// Caller-supplied hooks around every applied record.
pub trait DispatchHooks {
    /// Records addressed at a disabled feature are no-ops.
    fn is_feature_disabled(&self, _feature: &str) -> bool {
        false
    }

    /// Runs before the record is applied; returning `false` skips it.
    fn will_apply(&mut self, _change: &ChangeRecord) -> bool {
        true
    }

    /// Runs after the record is applied, whether or not an agent
    /// produced a result.
    fn did_apply(&mut self, _scene: &mut Scene, _change: &ChangeRecord) {}
}

/// Hook implementation that does nothing; used for replay into a
/// detached scene and in tests.
#[derive(Debug, Default)]
pub struct NoHooks;

impl DispatchHooks for NoHooks {}

pub struct DispatchContext<'a> {
    pub hooks: &'a mut dyn DispatchHooks,
    pub data_source: Option<&'a dyn LinkedDataSource>,
}

impl<'a> DispatchContext<'a> {
    fn agent_context(&self) -> AgentContext<'a> {
        AgentContext {
            data_source: self.data_source,
        }
    }
}

/// Owns the agent registry; constructed once at engine start.
#[derive(Debug, Default)]
pub struct Dispatcher {
    agents: AgentSet,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        ctx: &mut DispatchContext<'_>,
    ) -> AgentResult {
        if ctx.hooks.is_feature_disabled(change.target.as_str()) {
            return None;
        }
        if !ctx.hooks.will_apply(change) {
            return None;
        }
        let result = self.dispatch(scene, change, ctx);
        ctx.hooks.did_apply(scene, change);
        result
    }

    fn dispatch(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        ctx: &mut DispatchContext<'_>,
    ) -> AgentResult {
        match &change.target {
            ChangeTarget::Board => {
                self.run_agent(self.agents.board(), scene, change, ctx)
            }
            ChangeTarget::Metadata => {
                // Metadata lives outside the scene; the hooks own it.
                None
            }
            ChangeTarget::TableLink => {
                self.run_agent(self.agents.table_link(), scene, change, ctx)
            }
            ChangeTarget::Kind(kind) => {
                let mut applied = false;
                let mut created = Vec::new();
                for normalized in normalize(change) {
                    let agent = self.agents.for_kind(*kind);
                    if let Some(ids) = self.run_agent(agent, scene, &normalized, ctx) {
                        applied = true;
                        created.extend(ids);
                    }
                }
                applied.then_some(created)
            }
            ChangeTarget::Object => self.dispatch_generic(scene, change, ctx),
            ChangeTarget::Other(tag) => {
                // Forward/backward format skew; tolerated silently.
                debug!(target = %tag, "no agent registered for target, ignoring");
                None
            }
        }
    }

    /// Generic update/delete: resolve each target's concrete kind from
    /// the scene, then re-dispatch per object.
    fn dispatch_generic(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        ctx: &mut DispatchContext<'_>,
    ) -> AgentResult {
        let mut normalized = normalize(change);
        if change.operation == ChangeOp::Delete {
            // Reverse creation order: a polygon must be detached before
            // the removal of a vertex that backs it is evaluated.
            normalized.sort_by_key(|record| {
                record
                    .target_ids()
                    .first()
                    .and_then(|id| scene.creation_index(id))
                    .map(std::cmp::Reverse)
            });
        }

        let mut applied = false;
        let mut affected = Vec::new();
        for record in &normalized {
            let Some(id) = record.target_ids().first() else {
                continue;
            };
            let Some(kind) = scene.kind_of(id) else {
                debug!(id = %id, "generic change target not in scene, skipping");
                continue;
            };
            let agent = self.agents.for_kind(kind);
            if let Some(ids) = self.run_agent(agent, scene, record, ctx) {
                applied = true;
                affected.extend(ids);
            }
        }
        applied.then_some(affected)
    }

    fn run_agent(
        &self,
        agent: &dyn ChangeAgent,
        scene: &mut Scene,
        change: &ChangeRecord,
        ctx: &mut DispatchContext<'_>,
    ) -> AgentResult {
        match change.operation {
            ChangeOp::Create => agent.create(scene, change, &ctx.agent_context()),
            ChangeOp::Update => agent.update(scene, change),
            ChangeOp::Delete => agent.delete(scene, change),
        }
    }
}

#[cfg(test)]
mod tests;
