// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Thetis — event-sourced geometry diagram engine.
//!
//! An interactive diagram is an ordered, replayable log of typed change
//! records. Records normalize, dispatch to per-kind agents that mutate
//! the live scene arena, and convert to/from a nested interchange
//! document with round-trip fidelity.

pub mod agents;
pub mod dispatch;
pub mod engine;
pub mod format;
pub mod geometry;
pub mod model;
pub mod scene;
