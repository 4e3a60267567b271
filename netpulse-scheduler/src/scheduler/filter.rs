/*
SPDX-FileCopyrightText: Copyright 2026 NetPulse Contributors
SPDX-License-Identifier: MIT
*/

//! Eligibility filtering over a cluster snapshot.
//!
//! Two pure phases reduce a [`ClusterView`] to the set a policy may choose
//! from:
//!
//! 1. [`alive_and_capable`]: liveness plus requirement matching.
//! 2. [`with_capacity`]: drop workers with no free slot.
//!
//! The phases are kept separate because the facade reports them differently:
//! an empty phase-1 result means the task fits nowhere in this fleet, while
//! an empty phase-2 result means the fleet is merely full right now.

use crate::cluster::{ClusterView, Task, WorkerNode};

/// Phase 1: keep live workers whose capability set covers the task's
/// requirements.
pub fn alive_and_capable<'a>(view: &'a ClusterView, task: &Task) -> Vec<&'a WorkerNode> {
    view.nodes
        .iter()
        .filter(|node| node.alive && node.satisfies(&task.requirements))
        .collect()
}

/// Phase 2: keep workers with at least one free slot.
pub fn with_capacity<'a>(candidates: &[&'a WorkerNode]) -> Vec<&'a WorkerNode> {
    candidates
        .iter()
        .copied()
        .filter(|node| node.remaining() > 0)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
