/*
SPDX-FileCopyrightText: Copyright 2026 NetPulse Contributors
SPDX-License-Identifier: MIT
*/

//! Core cluster data structures for the NetPulse task scheduler.
//!
//! ```text
//! store ──(list_nodes)──► ClusterView ──(filter + policy)──► Decision ──(bind)──► queue
//!                           ↑ immutable snapshot                ↑ published result
//! ```
//!
//! # Ownership model
//! A [`ClusterView`] is owned by a single scheduling attempt and dropped when
//! the attempt completes. The [`WorkerNode`] records inside it are snapshots:
//! the store is the sole authority on `load`, and nothing in this crate
//! mutates fleet state directly. A [`Decision`] is the immutable output of an
//! attempt, handed to the bind step and then to the caller.

use std::collections::BTreeSet;

// ── WorkerNode ────────────────────────────────────────────────────────────────

/// One worker process in the fleet, as observed at snapshot time.
///
/// A worker owns a pool of persistent device connections and advertises how
/// many concurrently assigned tasks it accepts (`capacity`) together with how
/// many it currently holds (`load`). Workers that have missed their heartbeat
/// are reported with `alive == false` and are invisible to every policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerNode {
    /// Stable opaque identifier, unique across the fleet.
    pub id: String,

    /// Printable host name. Used as the deterministic tie-break key and as
    /// the perturbation seed in the weighted policy, so it must be non-empty.
    pub hostname: String,

    /// Maximum number of concurrently assigned tasks this node accepts.
    pub capacity: u32,

    /// Number of tasks currently assigned (queued or running) on the node.
    pub load: u32,

    /// Heartbeat status. Dead nodes never receive tasks.
    pub alive: bool,

    /// Capability tags this worker advertises (driver names, device vendors,
    /// site labels). Matched against [`Task::requirements`] by set inclusion;
    /// the scheduler does not interpret individual tags.
    pub capabilities: BTreeSet<String>,
}

impl WorkerNode {
    /// Free slot count: `capacity - load`.
    ///
    /// Saturating: per-node reads are consistent, but a snapshot taken while
    /// the store is reconciling may briefly report `load > capacity`. The
    /// derived value is still well-defined and non-negative.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.load)
    }

    /// Whether this worker advertises every tag in `requirements`.
    ///
    /// An empty requirement set matches every worker.
    pub fn satisfies(&self, requirements: &BTreeSet<String>) -> bool {
        requirements.is_subset(&self.capabilities)
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A single scheduling request.
///
/// A task enters the scheduler exactly once per attempt; no task state is
/// retained across attempts. The `requirements` set is pass-through: a worker
/// is eligible only if its capability set is a superset of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    /// Unique opaque identifier. The downstream queue deduplicates on it.
    pub id: String,

    /// Capability tags an eligible worker must advertise. Empty means
    /// unconstrained.
    pub requirements: BTreeSet<String>,
}

impl Task {
    /// Convenience constructor for an unconstrained task.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            requirements: BTreeSet::new(),
        }
    }
}

// ── ClusterView ───────────────────────────────────────────────────────────────

/// Read-only snapshot of the worker fleet at the instant of one scheduling
/// decision.
///
/// Consistency is per-node (no torn reads within a node) but not cross-node
/// linearizable; policies tolerate slight staleness and the bind step resolves
/// the races that staleness can cause. The collection is unordered; only a
/// policy imposes an order, and only while choosing.
#[derive(Debug, Clone, Default)]
pub struct ClusterView {
    pub nodes: Vec<WorkerNode>,
}

impl ClusterView {
    pub fn new(nodes: Vec<WorkerNode>) -> Self {
        Self { nodes }
    }

    /// The fleet may legitimately be empty (cold start, rolling restart).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

// ── Decision ──────────────────────────────────────────────────────────────────

/// The outcome of one successful scheduling attempt.
///
/// Immutable once produced. `observed_remaining` is the chosen node's free
/// slot count at snapshot time, before the bind increment; callers log it to
/// correlate decisions with fleet occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub task_id: String,
    pub node_id: String,
    pub policy: crate::scheduler::policy::SchedulePolicy,
    pub observed_remaining: u32,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
