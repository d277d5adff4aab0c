/// The event loop.
///
/// `Engine` owns the clock and queues, the task arena, the shared context
/// and the trace. It resumes tasks in queue order and applies the two rules
/// the whole model rests on:
///
/// - entering a nested task runs it synchronously, in place, until it first
///   suspends or finishes
/// - a finished task's completion always reaches its awaiter through the
///   immediate queue, even if the task never suspended
///
/// Everything is single-threaded and deterministic for a given
/// [`SchedulerConfig`].

use tracing::{debug, trace, warn};

use crate::config::{SchedulerConfig, ZeroDelay};
use crate::context::{SharedContext, TaskCx};
use crate::error::{TurnstileError, TurnstileResult};
use crate::queue::{QueueEntry, Queues, Resumable, TieBreaker};
use crate::task::{
    Awaiter, Body, Directive, Program, TaskArena, TaskHandle, TaskId, TaskSlot, TaskState,
};
use crate::time::VirtualTime;
use crate::trace::Trace;

/// Single-threaded cooperative scheduler.
pub struct Engine {
    config: SchedulerConfig,
    queues: Queues,
    tie_break: TieBreaker,
    tasks: TaskArena,
    context: SharedContext,
    trace: Trace,
    dispatched: u64,
}

impl Engine {
    pub fn new(config: SchedulerConfig) -> Self {
        Engine {
            tie_break: TieBreaker::new(config.tie_break),
            config,
            queues: Queues::new(),
            tasks: TaskArena::new(),
            context: SharedContext::new(),
            trace: Trace::new(),
            dispatched: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.queues.now()
    }

    /// Total queue entries dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Entries waiting on either queue.
    pub fn pending_count(&self) -> usize {
        self.queues.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queues.is_idle()
    }

    pub fn queues(&self) -> &Queues {
        &self.queues
    }

    pub fn tasks(&self) -> &TaskArena {
        &self.tasks
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SharedContext {
        &mut self.context
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn task_state(&self, handle: TaskHandle) -> TurnstileResult<TaskState> {
        Ok(self.tasks.get(handle.id())?.state())
    }

    /// Result token the task completed with, if it completed with one.
    pub fn result(&self, handle: TaskHandle) -> TurnstileResult<Option<&str>> {
        Ok(self.tasks.get(handle.id())?.result.as_deref())
    }

    /// Downcast a task's body for inspection.
    ///
    /// Returns `None` for an unknown handle or a body of another type.
    pub fn body<T: Body + 'static>(&self, handle: TaskHandle) -> Option<&T> {
        self.tasks
            .get(handle.id())
            .ok()?
            .body
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    // ── Starting and joining ──────────────────────────────────

    /// Start `body` as a new task and run it synchronously until its first
    /// suspension or its completion. No scheduling boundary is inserted.
    ///
    /// The task starts detached; hand the handle to [`Engine::join`] to wait
    /// for it, or leave it running in the background.
    pub fn run(&mut self, body: Box<dyn Body>) -> TurnstileResult<TaskHandle> {
        let name = body.name().to_string();
        let id = self.tasks.insert(TaskSlot::new(body));
        debug!(task = %id, %name, now = %self.now(), "run");
        self.drive(id)?;
        Ok(TaskHandle::new(id))
    }

    /// Validate `program` and [`run`](Engine::run) it.
    pub fn run_program(&mut self, program: Program) -> TurnstileResult<TaskHandle> {
        program.validate()?;
        self.run(program.into_body())
    }

    /// Wait, as the driver, for `handle` to finish.
    ///
    /// Pumps until the task's completion has been delivered through the
    /// immediate queue, then returns its result token. A handle can be
    /// joined once; joining again fails with `AlreadyJoined`.
    pub fn join(&mut self, handle: TaskHandle) -> TurnstileResult<Option<String>> {
        let id = handle.id();
        self.claim(id, Awaiter::Driver)?;
        if self.tasks.get(id)?.is_complete() {
            self.deliver(id)?;
        }

        self.pump_while(|engine| {
            engine
                .tasks
                .get(id)
                .map(|slot| !slot.delivered)
                .unwrap_or(false)
        })?;

        let slot = self.tasks.get(id)?;
        if !slot.delivered {
            warn!(task = %id, "went idle before completion was delivered");
            return Err(TurnstileError::SchedulerDeadlock { task: id });
        }
        Ok(slot.result.clone())
    }

    /// Raise the `done` signal for the background task.
    pub fn signal_done(&mut self) {
        debug!(now = %self.now(), "done signalled");
        self.context.signal_done();
    }

    // ── Pumping ───────────────────────────────────────────────

    /// Dispatch entries until both queues are empty.
    ///
    /// Once idle, every task must be complete: anything else can never be
    /// resumed again and is reported as `SchedulerDeadlock`.
    ///
    /// Returns the number of entries dispatched during this call.
    pub fn pump(&mut self) -> TurnstileResult<u64> {
        let steps = self.pump_while(|_| true)?;
        self.check_quiescent()?;
        Ok(steps)
    }

    fn pump_while<F>(&mut self, keep_going: F) -> TurnstileResult<u64>
    where
        F: Fn(&Engine) -> bool,
    {
        let mut steps = 0u64;
        while keep_going(self) {
            if let Some(limit) = self.config.max_steps {
                if steps >= limit && !self.queues.is_idle() {
                    warn!(limit, now = %self.now(), "step limit exceeded");
                    return Err(TurnstileError::StepLimitExceeded { limit });
                }
            }
            let Some(entry) = self.queues.next_ready(&mut self.tie_break) else {
                break;
            };
            steps += 1;
            self.dispatched += 1;
            self.dispatch(entry)?;
        }
        Ok(steps)
    }

    /// Invoke one queue entry. Each entry may fire exactly once: it must
    /// match the single suspension its task is waiting on.
    pub(crate) fn dispatch(&mut self, entry: QueueEntry) -> TurnstileResult<()> {
        let id = entry.resumable.task();
        let slot = self.tasks.get_mut(id)?;
        if slot.pending != Some(entry.sequence) {
            return Err(TurnstileError::DoubleResume {
                task: id,
                sequence: entry.sequence,
            });
        }
        slot.pending = None;
        trace!(task = %id, sequence = %entry.sequence, due = %entry.due, "dispatch");

        match entry.resumable {
            Resumable::Task(_) => self.drive(id),
            Resumable::Driver(_) => {
                slot.delivered = true;
                debug!(task = %id, now = %entry.due, "completion delivered to driver");
                Ok(())
            }
        }
    }

    fn check_quiescent(&self) -> TurnstileResult<()> {
        if !self.queues.is_idle() {
            return Ok(());
        }
        match self.tasks.iter().find(|(_, slot)| !slot.is_complete()) {
            Some((task, slot)) => {
                warn!(%task, state = ?slot.state(), "idle with unfinished task");
                Err(TurnstileError::SchedulerDeadlock { task })
            }
            None => Ok(()),
        }
    }

    // ── Task driving ──────────────────────────────────────────

    /// Resume `id` and act on the directive it stops with.
    ///
    /// An `Await` enters the child right away and keeps going with it, so a
    /// chain of nested awaits runs in one loop rather than one call frame
    /// per level.
    fn drive(&mut self, id: TaskId) -> TurnstileResult<()> {
        let mut id = id;
        loop {
            match self.resume(id)? {
                Directive::Await(child) => {
                    let child = self.tasks.insert(TaskSlot::new(child));
                    self.claim(child, Awaiter::Task(id))?;
                    debug!(parent = %id, %child, "await");
                    // Entry: the child runs right here, no boundary.
                    id = child;
                }
                Directive::Yield => return self.suspend(id, 0),
                Directive::Sleep(delay) => return self.suspend(id, delay),
                Directive::Join(handle) => {
                    let child = handle.id();
                    self.claim(child, Awaiter::Task(id))?;
                    debug!(parent = %id, %child, "join");
                    if self.tasks.get(child)?.is_complete() {
                        self.deliver(child)?;
                    }
                    return Ok(());
                }
                Directive::Complete(result) => return self.complete(id, result),
                Directive::Fault(err) => {
                    warn!(task = %id, %err, "task faulted");
                    return Err(err);
                }
            }
        }
    }

    /// Run one `resume` call of `id`'s body.
    fn resume(&mut self, id: TaskId) -> TurnstileResult<Directive> {
        let slot = self.tasks.get_mut(id)?;
        let mut body = slot.body.take().ok_or(TurnstileError::UnknownTask(id))?;
        let received = slot.received.take();
        slot.state = TaskState::Running;

        let directive = {
            let mut cx = TaskCx {
                task: id,
                now: self.queues.now(),
                shared: &mut self.context,
                trace: &mut self.trace,
                tasks: &mut self.tasks,
                queues: &mut self.queues,
                received,
            };
            body.resume(&mut cx)
        };
        trace!(task = %id, ?directive, "stopped");
        self.tasks.get_mut(id)?.body = Some(body);
        Ok(directive)
    }

    /// Queue the continuation of `id` after `delay` ticks. Zero-delay
    /// suspensions use the configured channel.
    fn suspend(&mut self, id: TaskId, delay: u64) -> TurnstileResult<()> {
        let resumable = Resumable::Task(id);
        let sequence = match (delay, self.config.zero_delay) {
            (0, ZeroDelay::Immediate) => self.queues.enqueue_immediate(resumable),
            _ => self
                .queues
                .enqueue_after(self.config.effective_delay(delay), resumable)?,
        };
        let slot = self.tasks.get_mut(id)?;
        slot.pending = Some(sequence);
        slot.state = TaskState::Suspended;
        Ok(())
    }

    /// Register `awaiter` as the receiver of `child`'s completion.
    fn claim(&mut self, child: TaskId, awaiter: Awaiter) -> TurnstileResult<()> {
        let slot = self.tasks.get_mut(child)?;
        if slot.awaiter != Awaiter::Detached {
            return Err(TurnstileError::AlreadyJoined(child));
        }
        slot.awaiter = awaiter;
        if let Awaiter::Task(parent) = awaiter {
            self.tasks.get_mut(parent)?.state = TaskState::Awaiting(child);
        }
        Ok(())
    }

    fn complete(&mut self, id: TaskId, result: Option<String>) -> TurnstileResult<()> {
        let slot = self.tasks.get_mut(id)?;
        slot.state = TaskState::Complete;
        slot.result = result;
        debug!(task = %id, name = %slot.name(), now = %self.queues.now(), "complete");
        self.deliver(id)
    }

    /// Exit boundary: post the awaiter's continuation on the immediate
    /// queue. Never transfers control directly.
    fn deliver(&mut self, id: TaskId) -> TurnstileResult<()> {
        let slot = self.tasks.get(id)?;
        let (awaiter, result) = (slot.awaiter, slot.result.clone());
        match awaiter {
            Awaiter::Detached => Ok(()),
            Awaiter::Task(parent) => {
                let sequence = self.queues.enqueue_immediate(Resumable::Task(parent));
                let waiting = self.tasks.get_mut(parent)?;
                waiting.received = result;
                waiting.pending = Some(sequence);
                waiting.state = TaskState::Suspended;
                self.tasks.get_mut(id)?.delivered = true;
                Ok(())
            }
            Awaiter::Driver => {
                let sequence = self.queues.enqueue_immediate(Resumable::Driver(id));
                self.tasks.get_mut(id)?.pending = Some(sequence);
                Ok(())
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("now", &self.now())
            .field("pending", &self.pending_count())
            .field("tasks", &self.tasks.len())
            .field("dispatched", &self.dispatched)
            .field("context", &self.context)
            .finish()
    }
}
