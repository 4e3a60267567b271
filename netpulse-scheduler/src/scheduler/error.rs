/*
SPDX-FileCopyrightText: Copyright 2026 NetPulse Contributors
SPDX-License-Identifier: MIT
*/

//! Structured error types for the NetPulse scheduler.
//!
//! Two layers model the two failure granularities:
//!
//! * [`CapacityReason`]: why a specific attempt found no room. Callers do not
//!   need to distinguish the variants; they exist as observability subcodes.
//! * [`ScheduleError`]: top-level failure returned from
//!   [`Scheduler::schedule()`](super::Scheduler::schedule), with one stable
//!   variant per caller-visible error name.
//!
//! The API layer maps variants onto its transport:
//!
//! | Variant | Typical HTTP mapping |
//! |---|---|
//! | `Capacity` | 503 Service Unavailable |
//! | `NoEligibleNode` | 422 Unprocessable Entity |
//! | `StoreUnavailable` | 503 Service Unavailable, retryable |
//! | `UnknownPolicy` | startup failure, never per-request |
//!
//! Do not collapse these into `anyhow::Error` on the scheduling path; the
//! structured variants are intentional.

use thiserror::Error;

use crate::store::StoreError;

// ── Capacity subcodes ─────────────────────────────────────────────────────────

/// Why a scheduling attempt found no room.
///
/// Carried inside [`ScheduleError::Capacity`]. All variants answer the same
/// caller question ("no worker can take this task right now"); the subcode is
/// for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityReason {
    /// The fleet snapshot contained no workers at all.
    EmptyFleet,

    /// Every worker that passed liveness and requirements is at capacity.
    Exhausted,

    /// A policy was handed an empty candidate set.
    NoCandidates,

    /// The weighted policy computed a zero total weight, so no draw was
    /// possible.
    ZeroWeight,

    /// Every allowed attempt lost the bind race.
    RetriesExhausted { attempts: u32 },
}

impl std::fmt::Display for CapacityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityReason::EmptyFleet => write!(f, "no workers registered"),
            CapacityReason::Exhausted => {
                write!(f, "every eligible worker is at capacity")
            }
            CapacityReason::NoCandidates => write!(f, "no candidate workers"),
            CapacityReason::ZeroWeight => {
                write!(f, "selection weights sum to zero")
            }
            CapacityReason::RetriesExhausted { attempts } => {
                write!(f, "lost the bind race on all {attempts} attempts")
            }
        }
    }
}

// ── Top-level scheduler errors ────────────────────────────────────────────────

/// Top-level error returned by
/// [`Scheduler::schedule()`](super::Scheduler::schedule).
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No worker has a free slot for this task. Includes bind-retry
    /// exhaustion; see [`CapacityReason`] for the subcode.
    #[error("no capacity for task '{task}': {reason}")]
    Capacity { task: String, reason: CapacityReason },

    /// The fleet has workers, but none is alive and advertises every
    /// capability the task requires. Distinct from capacity exhaustion so
    /// callers can tell "wrong fleet" from "full fleet".
    #[error("no eligible worker for task '{task}': no live worker matches its requirements")]
    NoEligibleNode { task: String },

    /// Snapshot or bind failed transiently. Retry at the caller's
    /// discretion.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// The configured policy name is not recognized. Fatal at startup.
    #[error("unknown scheduler policy '{0}' (valid: greedy, least_load, least_load_random, load_weighted_random)")]
    UnknownPolicy(String),
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_message_includes_task_and_subcode() {
        let err = ScheduleError::Capacity {
            task: "t42".into(),
            reason: CapacityReason::RetriesExhausted { attempts: 4 },
        };
        let msg = err.to_string();
        assert!(msg.contains("t42"), "message should name the task: {msg}");
        assert!(msg.contains("4 attempts"), "message should carry the attempt count: {msg}");
    }

    #[test]
    fn store_error_passes_through_transparently() {
        let err: ScheduleError = StoreError::new("redis timed out").into();
        assert_eq!(err.to_string(), "store unavailable: redis timed out");
    }

    #[test]
    fn unknown_policy_message_lists_valid_names() {
        let msg = ScheduleError::UnknownPolicy("round_robin".into()).to_string();
        assert!(msg.contains("round_robin"));
        assert!(msg.contains("load_weighted_random"));
    }
}
