//! Task identifiers.

/// Index of a task in the engine's arena.
///
/// A newtype so it cannot be mixed up with sequences or tick counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskId(u64);

impl TaskId {
    #[inline]
    pub fn new(id: u64) -> Self {
        TaskId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task {}", self.0)
    }
}

/// Handle returned by [`Engine::run`](crate::engine::Engine::run) and
/// [`TaskCx::spawn`](crate::context::TaskCx::spawn).
///
/// A handle can be joined at most once; a second join is rejected with
/// [`AlreadyJoined`](crate::error::TurnstileError::AlreadyJoined).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskHandle(TaskId);

impl TaskHandle {
    pub(crate) fn new(id: TaskId) -> Self {
        TaskHandle(id)
    }

    pub fn id(self) -> TaskId {
        self.0
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
