//! # Turnstile: Deterministic Cooperative Scheduling Simulator
//!
//! A discrete-event model of a single-threaded cooperative runtime. Tasks
//! are explicit state machines; a virtual clock and two queues decide who
//! runs next. No async, no threads, no wall-clock time.
//!
//! The model pins down one asymmetry:
//!
//! - **entry** into a nested task runs it synchronously, in place, with no
//!   scheduling boundary
//! - **exit** from a nested task always crosses a boundary: its completion
//!   reaches the awaiter through the immediate queue, so anything queued
//!   ahead of it runs first
//!
//! A background [`Ticker`] polls a shared flag on every zero-delay turn and
//! makes those boundaries visible in the trace.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │   Driver / Sampler            │ ← runs registered scenarios
//! │  ┌─────────────────────────┐  │
//! │  │   Engine                │  │ ← event loop, entry/exit rules
//! │  │  ┌───────────────────┐  │  │
//! │  │  │ Queues            │  │  │ ← immediate FIFO + timer map
//! │  │  └───────────────────┘  │  │
//! │  │  ┌───────────────────┐  │  │
//! │  │  │ TaskArena         │  │  │ ← Body state machines
//! │  │  └───────────────────┘  │  │
//! │  │  ┌───────────────────┐  │  │
//! │  │  │ SharedContext     │  │  │ ← flag, done
//! │  │  └───────────────────┘  │  │
//! │  │  ┌───────────────────┐  │  │
//! │  │  │ Trace             │  │  │ ← emitted tokens
//! │  │  └───────────────────┘  │  │
//! │  └─────────────────────────┘  │
//! └───────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use turnstile::{Driver, SchedulerConfig};
//!
//! let mut driver = Driver::with_builtin(SchedulerConfig::default());
//! driver.start().unwrap();
//! let run = driver.run_scenario("demo1").unwrap();
//! assert_eq!(run.line, "a b in! c d");
//! driver.finish().unwrap();
//! ```

pub mod config;
pub mod context;
pub mod driver;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod queue;
pub mod rng;
pub mod sampler;
pub mod scenario;
pub mod task;
pub mod time;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenience.
pub use config::{SchedulerConfig, TieBreak, ZeroDelay};
pub use context::{SharedContext, TaskCx};
pub use driver::{Driver, ScenarioRun};
pub use dsl::ProgramBuilder;
pub use engine::Engine;
pub use error::{TurnstileError, TurnstileResult};
pub use queue::{QueueEntry, Queues, Resumable, Sequence};
pub use sampler::{Distribution, Sampler};
pub use scenario::{Scenario, ScenarioRegistry};
pub use task::{Body, Directive, Program, Step, TaskHandle, TaskId, TaskState, Ticker};
pub use time::VirtualTime;
pub use trace::{Trace, TraceEntry};
