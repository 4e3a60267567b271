//! Task-to-worker scheduling for NetPulse.
//!
//! [`Scheduler`] is the stateless per-task coordinator. One call to
//! [`Scheduler::schedule`] runs the full decision path:
//!
//! ```text
//! snapshot ─► filter (liveness + requirements, then capacity)
//!          ─► policy choose ─► atomic bind ─► queue publish ─► Decision
//! ```
//!
//! All fleet state lives behind the [`NodeStore`]; the scheduler caches
//! nothing across attempts, so any number of schedule calls may run
//! concurrently against the same store. Two attempts that observe the same
//! stale view can choose the same worker; the store's bounded increment
//! resolves that race, and the losing attempt restarts from a fresh snapshot
//! up to `bind_retries` more times.
//!
//! Snapshot and bind are the only awaits on the path. Dropping the returned
//! future at either boundary cancels the attempt cleanly: policy evaluation
//! is pure, and no resource is held across the awaits.
//!
//! # Example
//! ```rust,ignore
//! let scheduler = Scheduler::new(store, queue, SchedulerConfig::default());
//! let decision = scheduler.schedule(&Task::new("job-17")).await?;
//! println!("{} -> {}", decision.task_id, decision.node_id);
//! ```

pub mod error;
pub mod filter;
pub mod policy;

pub use error::{CapacityReason, ScheduleError};
pub use policy::SchedulePolicy;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::cluster::{ClusterView, Decision, Task};
use crate::config::SchedulerConfig;
use crate::store::{IncrementOutcome, NodeStore, TaskQueue};

// ── Bind outcome ──────────────────────────────────────────────────────────────

/// Result of publishing one decision through the store's bounded increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The store accepted the increment and the assignment was published.
    /// `remaining` is the node's free slot count after the increment.
    Bound { remaining: u32 },

    /// The chosen node's last free slot was consumed, or the node was
    /// deregistered, between snapshot and bind. The attempt may restart
    /// from a fresh snapshot.
    LostRace,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Stateless scheduling facade.
///
/// Holds shared handles to the store and queue plus the option surface; all
/// per-attempt state (snapshot, candidate sets, generator) is local to one
/// `schedule` call.
pub struct Scheduler<S, Q> {
    store: Arc<S>,
    queue: Arc<Q>,
    config: SchedulerConfig,
}

impl<S: NodeStore, Q: TaskQueue> Scheduler<S, Q> {
    pub fn new(store: Arc<S>, queue: Arc<Q>, config: SchedulerConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// The active option surface.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedule one task onto the fleet.
    ///
    /// On a lost bind race the whole attempt restarts from a fresh snapshot,
    /// at most `bind_retries + 1` times in total; every other failure is
    /// surfaced immediately. The store is called through
    /// `try_increment_load` at most `bind_retries + 1` times per call.
    ///
    /// # Errors
    /// * [`ScheduleError::NoEligibleNode`] if no live worker matches the
    ///   task's requirements.
    /// * [`ScheduleError::Capacity`] if every eligible worker is full, the
    ///   fleet is empty, or the retry budget is spent on bind races.
    /// * [`ScheduleError::StoreUnavailable`] if snapshot, bind, or publish
    ///   fails transiently.
    pub async fn schedule(&self, task: &Task) -> Result<Decision, ScheduleError> {
        let attempts = self.config.bind_retries + 1;

        for attempt in 1..=attempts {
            let view = ClusterView::new(self.store.list_nodes().await?);
            if view.is_empty() {
                return Err(ScheduleError::Capacity {
                    task: task.id.clone(),
                    reason: CapacityReason::EmptyFleet,
                });
            }

            let candidates = filter::alive_and_capable(&view, task);
            if candidates.is_empty() {
                warn!(
                    task = %task.id,
                    nodes = view.len(),
                    "no live worker matches the task requirements"
                );
                return Err(ScheduleError::NoEligibleNode {
                    task: task.id.clone(),
                });
            }

            let eligible = filter::with_capacity(&candidates);
            if eligible.is_empty() {
                return Err(ScheduleError::Capacity {
                    task: task.id.clone(),
                    reason: CapacityReason::Exhausted,
                });
            }

            debug!(
                task = %task.id,
                policy = %self.config.policy,
                nodes = view.len(),
                eligible = eligible.len(),
                attempt,
                "evaluating policy against snapshot"
            );

            // One generator per attempt, seeded from the OS. A shared global
            // generator would serialize parallel attempts and correlate
            // their draws, which defeats the randomized policies.
            let mut rng = StdRng::from_entropy();
            let chosen = self
                .config
                .policy
                .choose(&eligible, self.config.weight_perturbation, &mut rng)
                .map_err(|reason| ScheduleError::Capacity {
                    task: task.id.clone(),
                    reason,
                })?;

            let decision = Decision {
                task_id: task.id.clone(),
                node_id: chosen.id.clone(),
                policy: self.config.policy,
                observed_remaining: chosen.remaining(),
            };

            match self.bind(&decision).await? {
                BindOutcome::Bound { remaining } => {
                    info!(
                        task = %decision.task_id,
                        node = %decision.node_id,
                        policy = %decision.policy,
                        remaining,
                        attempt,
                        "task bound"
                    );
                    return Ok(decision);
                }
                BindOutcome::LostRace => {
                    warn!(
                        task = %task.id,
                        node = %decision.node_id,
                        attempt,
                        "lost bind race, restarting from a fresh snapshot"
                    );
                }
            }
        }

        Err(ScheduleError::Capacity {
            task: task.id.clone(),
            reason: CapacityReason::RetriesExhausted { attempts },
        })
    }

    /// Publish `decision` under the store's atomic "increment load iff
    /// `load < capacity`" primitive.
    ///
    /// The binder never mutates node records itself; the store is the sole
    /// authority on `load`. A node reported missing counts as a lost race,
    /// since it was deregistered between snapshot and bind and the next
    /// snapshot will no longer offer it.
    ///
    /// # Errors
    /// [`ScheduleError::StoreUnavailable`] if the increment or the queue
    /// publish fails transiently.
    pub async fn bind(&self, decision: &Decision) -> Result<BindOutcome, ScheduleError> {
        match self.store.try_increment_load(&decision.node_id).await? {
            IncrementOutcome::Bound { remaining } => {
                self.queue
                    .publish(&decision.task_id, &decision.node_id)
                    .await?;
                Ok(BindOutcome::Bound { remaining })
            }
            IncrementOutcome::AtCapacity => {
                debug!(
                    task = %decision.task_id,
                    node = %decision.node_id,
                    "bind refused: node at capacity"
                );
                Ok(BindOutcome::LostRace)
            }
            IncrementOutcome::NotFound => {
                debug!(
                    task = %decision.task_id,
                    node = %decision.node_id,
                    "bind refused: node no longer registered"
                );
                Ok(BindOutcome::LostRace)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
