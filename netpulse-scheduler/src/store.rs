/*
SPDX-FileCopyrightText: Copyright 2026 NetPulse Contributors
SPDX-License-Identifier: MIT
*/

//! External store and queue seams.
//!
//! The scheduler owns no durable state. Two async traits describe everything
//! it needs from the outside world:
//!
//! * [`NodeStore`]: an atomic fleet snapshot plus the bounded-increment
//!   primitive that resolves bind races. Backed by Redis in production.
//! * [`TaskQueue`]: publishes a bound task so the selected worker picks it
//!   up. Idempotent per task id.
//!
//! Both trait calls are the only suspension points of a scheduling attempt;
//! dropping the future at either boundary cancels the attempt without any
//! cleanup, because no resources are held across the calls.
//!
//! [`InMemoryStore`] and [`InMemoryQueue`] are reference implementations used
//! by the crate's own tests and by embedders that want the full scheduling
//! path without a store deployment.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::cluster::WorkerNode;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Transient store or queue failure.
///
/// Always retryable at the caller's discretion; the scheduler surfaces it
/// unchanged instead of consuming bind-retry budget on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("store unavailable: {reason}")]
pub struct StoreError {
    pub reason: String,
}

impl StoreError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ── Increment outcome ─────────────────────────────────────────────────────────

/// Result of the store's atomic "increment load iff `load < capacity`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The increment was accepted. `remaining` is the node's free slot count
    /// after the increment.
    Bound { remaining: u32 },

    /// The node reached capacity between snapshot and bind. The attempt lost
    /// the race and may be retried from a fresh snapshot.
    AtCapacity,

    /// The node is no longer registered. Also a lost race: the node was
    /// deregistered between snapshot and bind.
    NotFound,
}

// ── Traits ────────────────────────────────────────────────────────────────────

/// Fleet state authority.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Atomic snapshot of all currently-known workers. Per-node tuples
    /// `(capacity, load, alive)` are internally consistent; cross-node
    /// ordering is not guaranteed.
    async fn list_nodes(&self) -> Result<Vec<WorkerNode>, StoreError>;

    /// Atomic bounded increment of `node_id`'s load.
    async fn try_increment_load(&self, node_id: &str) -> Result<IncrementOutcome, StoreError>;
}

/// Downstream task queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Publish the assignment so the selected worker picks the task up.
    /// Publishing the same `task_id` twice is a no-op.
    async fn publish(&self, task_id: &str, node_id: &str) -> Result<(), StoreError>;
}

// ── In-memory reference implementations ───────────────────────────────────────

/// Mutex-guarded fleet map implementing [`NodeStore`].
///
/// The increment is atomic under the lock, which is what makes this a
/// faithful stand-in for the production store's compare-and-set. No await
/// ever happens while the lock is held.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    nodes: Mutex<HashMap<String, WorkerNode>>,
}

impl InMemoryStore {
    pub fn new(nodes: impl IntoIterator<Item = WorkerNode>) -> Self {
        Self {
            nodes: Mutex::new(nodes.into_iter().map(|n| (n.id.clone(), n)).collect()),
        }
    }

    /// Current snapshot of a single node, if registered.
    pub fn node(&self, node_id: &str) -> Option<WorkerNode> {
        self.nodes
            .lock()
            .ok()
            .and_then(|nodes| nodes.get(node_id).cloned())
    }

    /// Completion-side primitive: decrement `node_id`'s load, saturating at
    /// zero. The worker runtime calls this when a task finishes.
    pub fn release(&self, node_id: &str) -> Result<(), StoreError> {
        let mut nodes = self
            .nodes
            .lock()
            .map_err(|_| StoreError::new("fleet map lock poisoned"))?;
        if let Some(node) = nodes.get_mut(node_id) {
            node.load = node.load.saturating_sub(1);
        }
        Ok(())
    }
}

#[async_trait]
impl NodeStore for InMemoryStore {
    async fn list_nodes(&self) -> Result<Vec<WorkerNode>, StoreError> {
        let nodes = self
            .nodes
            .lock()
            .map_err(|_| StoreError::new("fleet map lock poisoned"))?;
        Ok(nodes.values().cloned().collect())
    }

    async fn try_increment_load(&self, node_id: &str) -> Result<IncrementOutcome, StoreError> {
        let mut nodes = self
            .nodes
            .lock()
            .map_err(|_| StoreError::new("fleet map lock poisoned"))?;
        match nodes.get_mut(node_id) {
            None => Ok(IncrementOutcome::NotFound),
            Some(node) if node.load < node.capacity => {
                node.load += 1;
                Ok(IncrementOutcome::Bound {
                    remaining: node.capacity - node.load,
                })
            }
            Some(_) => Ok(IncrementOutcome::AtCapacity),
        }
    }
}

/// Deduplicating in-memory [`TaskQueue`].
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    inner: Mutex<QueueInner>,
}

#[derive(Debug, Default)]
struct QueueInner {
    seen: HashSet<String>,
    published: Vec<(String, String)>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All accepted `(task_id, node_id)` publications, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|inner| inner.published.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn publish(&self, task_id: &str, node_id: &str) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::new("queue lock poisoned"))?;
        if inner.seen.insert(task_id.to_string()) {
            inner.published.push((task_id.to_string(), node_id.to_string()));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
