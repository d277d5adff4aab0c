//! Structured error types for Turnstile.
//!
//! All fallible public APIs return `TurnstileResult<T>`. The simulation is
//! closed (no I/O), so most variants are either caller mistakes such as an
//! unknown scenario name, or invariant violations that a correct engine
//! never produces.

use thiserror::Error;

use crate::queue::Sequence;
use crate::task::TaskId;

/// The top-level error type for the scheduling engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnstileError {
    // ── Registry errors ───────────────────────────────────

    /// The requested scenario is not in the registry.
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),

    /// A scenario with this label is already registered.
    #[error("scenario `{0}` is already registered")]
    DuplicateScenario(String),

    /// A scenario or program definition is malformed.
    #[error("invalid program: {0}")]
    InvalidProgram(String),

    // ── Task errors ───────────────────────────────────────

    /// A task handle does not refer to any task in the arena.
    #[error("{0} does not exist")]
    UnknownTask(TaskId),

    /// The completion of this task was already delivered to an awaiter.
    #[error("completion of {0} was already delivered")]
    AlreadyJoined(TaskId),

    /// The driver already has a background task running.
    #[error("background task already started as {0}")]
    BackgroundAlreadyStarted(TaskId),

    // ── Scheduling invariants ─────────────────────────────

    /// A resumable was invoked for a suspension that is no longer pending.
    #[error("resumable {sequence} for {task} was already consumed")]
    DoubleResume { task: TaskId, sequence: Sequence },

    /// Pumping went idle while a task was neither complete nor pending.
    #[error("scheduler went idle while {task} is neither complete nor pending")]
    SchedulerDeadlock { task: TaskId },

    /// A single pump call dispatched more entries than the configured limit.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    /// A due time did not fit in the virtual clock.
    #[error("virtual time overflow scheduling {delay} ticks after {now}")]
    TimeOverflow { now: u64, delay: u64 },

    // ── Serialization ─────────────────────────────────────

    /// Loading or exporting scenarios failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, TurnstileError>`.
pub type TurnstileResult<T> = Result<T, TurnstileError>;
