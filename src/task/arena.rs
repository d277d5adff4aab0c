//! Task arena: every task's state, indexed by `TaskId`.

use crate::error::{TurnstileError, TurnstileResult};
use crate::queue::Sequence;

use super::body::Body;
use super::id::TaskId;

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskState {
    /// Inside a `resume` call right now.
    Running,
    /// Waiting for its pending queue entry.
    Suspended,
    /// Waiting for a child task's completion to be delivered.
    Awaiting(TaskId),
    /// Finished. The body stays in the slot for inspection.
    Complete,
}

/// Who receives a task's completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaiter {
    /// Nobody yet. Background and freshly spawned tasks start here.
    Detached,
    /// A parent task, resumed through the immediate queue.
    Task(TaskId),
    /// The driver, notified through the immediate queue.
    Driver,
}

/// Arena slot for one task.
pub struct TaskSlot {
    pub(crate) name: String,
    /// `None` only while the body is out being resumed.
    pub(crate) body: Option<Box<dyn Body>>,
    pub(crate) state: TaskState,
    pub(crate) awaiter: Awaiter,
    /// Sequence of the single queue entry allowed to resume this task, or
    /// to announce its completion to the driver.
    pub(crate) pending: Option<Sequence>,
    /// Result token the task completed with.
    pub(crate) result: Option<String>,
    /// Result of an awaited child, handed to the body on its next resume.
    pub(crate) received: Option<String>,
    /// Completion has reached the awaiter.
    pub(crate) delivered: bool,
}

impl TaskSlot {
    pub(crate) fn new(body: Box<dyn Body>) -> Self {
        TaskSlot {
            name: body.name().to_string(),
            body: Some(body),
            state: TaskState::Running,
            awaiter: Awaiter::Detached,
            pending: None,
            result: None,
            received: None,
            delivered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == TaskState::Complete
    }
}

impl std::fmt::Debug for TaskSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSlot")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("awaiter", &self.awaiter)
            .field("pending", &self.pending)
            .field("result", &self.result)
            .field("delivered", &self.delivered)
            .finish()
    }
}

/// Append-only store of task slots. Ids are never reused.
#[derive(Debug, Default)]
pub struct TaskArena {
    slots: Vec<TaskSlot>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, slot: TaskSlot) -> TaskId {
        let id = TaskId::new(self.slots.len() as u64);
        self.slots.push(slot);
        id
    }

    pub fn get(&self, id: TaskId) -> TurnstileResult<&TaskSlot> {
        self.slots.get(id.index()).ok_or(TurnstileError::UnknownTask(id))
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> TurnstileResult<&mut TaskSlot> {
        self.slots
            .get_mut(id.index())
            .ok_or(TurnstileError::UnknownTask(id))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &TaskSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (TaskId::new(i as u64), slot))
    }
}
