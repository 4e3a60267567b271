/*
SPDX-FileCopyrightText: Copyright 2026 NetPulse Contributors
SPDX-License-Identifier: MIT
*/

//! NetPulse pinned-worker task scheduler.
//!
//! NetPulse dispatches network-device operations onto a fleet of long-lived
//! worker processes, each owning a pool of persistent device connections.
//! This crate is the scheduling core: for each incoming task it selects
//! exactly one worker, subject to liveness, capability, and capacity
//! constraints, under concurrent submission pressure, with a pluggable
//! selection policy.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── cluster      – fleet snapshot types: WorkerNode, ClusterView, Task, Decision
//! ├── store        – NodeStore / TaskQueue seams + in-memory reference impls
//! ├── config       – worker.* option surface (YAML)
//! └── scheduler    – the facade and its bind-retry loop
//!     ├── error    – ScheduleError taxonomy
//!     ├── filter   – two-phase eligibility filtering
//!     └── policy   – greedy / least_load / least_load_random / load_weighted_random
//! ```
//!
//! # Example
//! ```rust,ignore
//! use netpulse_scheduler::{Scheduler, SchedulerConfig, Task};
//!
//! let scheduler = Scheduler::new(store, queue, SchedulerConfig::default());
//! let decision = scheduler.schedule(&Task::new("job-17")).await?;
//! ```

pub mod cluster;
pub mod config;
pub mod scheduler;
pub mod store;

pub use cluster::{ClusterView, Decision, Task, WorkerNode};
pub use config::SchedulerConfig;
pub use scheduler::{BindOutcome, CapacityReason, ScheduleError, SchedulePolicy, Scheduler};
pub use store::{
    InMemoryQueue, InMemoryStore, IncrementOutcome, NodeStore, StoreError, TaskQueue,
};
