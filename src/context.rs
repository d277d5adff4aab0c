/// Shared coordination state and the per-resume task context.
///
/// `SharedContext` holds the two booleans the background ticker and the
/// foreground scenarios communicate through. It is owned by the engine and
/// reached only through a `TaskCx` or the driver, never through a global.

use tracing::debug;

use crate::queue::{Queues, Resumable};
use crate::task::arena::{TaskArena, TaskSlot, TaskState};
use crate::task::{Body, TaskHandle, TaskId};
use crate::time::VirtualTime;
use crate::trace::Trace;

// ── SharedContext ────────────────────────────────────────────────────

/// The `flag` / `done` pair shared by every task and the driver.
///
/// Single-threaded execution makes plain fields safe; ordering between
/// reads and writes is exactly the interleaving under study.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SharedContext {
    flag: bool,
    done: bool,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self) -> bool {
        self.flag
    }

    pub fn set_flag(&mut self, value: bool) {
        self.flag = value;
    }

    /// Read and clear the flag in one step.
    pub fn take_flag(&mut self) -> bool {
        std::mem::take(&mut self.flag)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Tell the background task to terminate at its next check.
    pub fn signal_done(&mut self) {
        self.done = true;
    }
}

// ── TaskCx ───────────────────────────────────────────────────────────

/// Context handed to a [`Body`] for the duration of one `resume` call.
///
/// Provides the body with:
/// - the current virtual time and its own id
/// - emission into the trace (`emit`, `announce`)
/// - the shared flag / done state
/// - the result of the child it last awaited
/// - `spawn` for starting tasks it does not await right away
pub struct TaskCx<'a> {
    pub(crate) task: TaskId,
    pub(crate) now: VirtualTime,
    pub(crate) shared: &'a mut SharedContext,
    pub(crate) trace: &'a mut Trace,
    pub(crate) tasks: &'a mut TaskArena,
    pub(crate) queues: &'a mut Queues,
    pub(crate) received: Option<String>,
}

impl<'a> TaskCx<'a> {
    #[inline]
    pub fn task(&self) -> TaskId {
        self.task
    }

    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Append a token to the trace.
    pub fn emit(&mut self, token: impl Into<String>) {
        let token = token.into();
        debug!(task = %self.task, now = %self.now, %token, "emit");
        self.trace.record(self.now, self.task, token);
    }

    /// Emit `token`, then raise the shared flag.
    pub fn announce(&mut self, token: impl Into<String>) {
        self.emit(token);
        self.shared.set_flag(true);
    }

    pub fn shared(&self) -> &SharedContext {
        self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedContext {
        self.shared
    }

    /// Read and clear the shared flag.
    pub fn take_flag(&mut self) -> bool {
        self.shared.take_flag()
    }

    pub fn is_done(&self) -> bool {
        self.shared.is_done()
    }

    /// Result token of the child whose completion resumed this call.
    pub fn received(&self) -> Option<&str> {
        self.received.as_deref()
    }

    pub fn take_received(&mut self) -> Option<String> {
        self.received.take()
    }

    /// Start `body` as a new task without awaiting it.
    ///
    /// The child does not run eagerly: its first resume is queued on the
    /// immediate queue behind everything already there. Join it later with
    /// [`Directive::Join`](crate::task::Directive::Join).
    pub fn spawn(&mut self, body: Box<dyn Body>) -> TaskHandle {
        let mut slot = TaskSlot::new(body);
        slot.state = TaskState::Suspended;
        let id = self.tasks.insert(slot);
        let sequence = self.queues.enqueue_immediate(Resumable::Task(id));
        if let Ok(slot) = self.tasks.get_mut(id) {
            slot.pending = Some(sequence);
        }
        debug!(parent = %self.task, child = %id, %sequence, "spawn");
        TaskHandle::new(id)
    }
}
