//! `Body` trait: the resumable state machine behind every task.

use crate::context::TaskCx;
use crate::error::TurnstileError;

use super::id::TaskHandle;

// ── Directive ─────────────────────────────────────────────────────────

/// What a body asks the engine to do when it stops running.
///
/// Everything a body does between two directives is synchronous and
/// cannot be interleaved with other tasks.
pub enum Directive {
    /// Zero-delay suspension (`yield_immediate`). Lands on the configured
    /// zero-delay channel.
    Yield,
    /// Suspend for `delay` ticks (`yield_after`). A delay of 0 is the same
    /// as [`Directive::Yield`].
    Sleep(u64),
    /// Run a nested task in place and resume once its completion is
    /// delivered.
    Await(Box<dyn Body>),
    /// Resume once a previously spawned task's completion is delivered.
    Join(TaskHandle),
    /// Finish, optionally handing a result token to the awaiter.
    Complete(Option<String>),
    /// Abort the pump with an error. Used for malformed programs.
    Fault(TurnstileError),
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::Yield => write!(f, "Yield"),
            Directive::Sleep(d) => write!(f, "Sleep({})", d),
            Directive::Await(body) => write!(f, "Await({})", body.name()),
            Directive::Join(h) => write!(f, "Join({})", h),
            Directive::Complete(r) => write!(f, "Complete({:?})", r),
            Directive::Fault(e) => write!(f, "Fault({})", e),
        }
    }
}

// ── Body ──────────────────────────────────────────────────────────────

/// A task's logic as an explicit state machine.
///
/// The engine calls `resume` once when the task starts and once per
/// delivered continuation afterwards. The body keeps its own cursor and
/// locals between calls and reports where it stopped with a [`Directive`].
///
/// # Contract
///
/// Implementations **must**:
/// - Route all shared-state access and emissions through `cx`.
/// - Be deterministic for equal inputs.
/// - Never resume themselves; only the engine calls `resume`.
///
/// # Example
///
/// ```rust
/// use turnstile::context::TaskCx;
/// use turnstile::task::{Body, Directive};
///
/// struct Twice { ran: u32 }
///
/// impl Body for Twice {
///     fn name(&self) -> &str { "twice" }
///     fn resume(&mut self, cx: &mut TaskCx<'_>) -> Directive {
///         self.ran += 1;
///         cx.emit(format!("run{}", self.ran));
///         if self.ran < 2 { Directive::Yield } else { Directive::Complete(None) }
///     }
///     fn as_any(&self) -> &dyn std::any::Any { self }
/// }
/// ```
pub trait Body {
    /// Label used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Run until the next suspension point or completion.
    fn resume(&mut self, cx: &mut TaskCx<'_>) -> Directive;

    /// Downcast support for [`Engine::body`](crate::engine::Engine::body).
    fn as_any(&self) -> &dyn std::any::Any;
}
