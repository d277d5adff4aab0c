/// The virtual clock and the two ordered queues.
///
/// Continuations wait on one of two queues:
/// - the immediate-continuation queue, a FIFO of entries due *now*
/// - the timer queue, ordered by `(due, sequence)`
///
/// The immediate queue always drains first. Only when it is empty does
/// the clock jump to the earliest timer, releasing one entry of that
/// due-time bucket at a time. Every entry gets a fresh [`Sequence`], so
/// `(due, sequence)` is a strict total order over everything ever queued.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::config::TieBreak;
use crate::error::{TurnstileError, TurnstileResult};
use crate::rng::DeterministicRng;
use crate::task::TaskId;
use crate::time::VirtualTime;

// ── Sequence ──────────────────────────────────────────────────────────

/// Strictly increasing enqueue counter.
///
/// Breaks ties between entries with the same due time and doubles as the
/// identity of a suspension: a task remembers the sequence of the entry
/// that will resume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence(u64);

impl Sequence {
    pub const MIN: Sequence = Sequence(0);
    pub const MAX: Sequence = Sequence(u64::MAX);

    #[inline]
    pub fn new(raw: u64) -> Self {
        Sequence(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints sequences. One per engine; never rewinds.
#[derive(Debug, Clone, Default)]
pub struct SequenceGen {
    next: u64,
}

impl SequenceGen {
    pub fn new() -> Self {
        SequenceGen { next: 0 }
    }

    pub fn next_seq(&mut self) -> Sequence {
        let seq = Sequence(self.next);
        self.next += 1;
        seq
    }

    /// The sequence the next call to `next_seq` will return.
    pub fn peek(&self) -> Sequence {
        Sequence(self.next)
    }
}

// ── Resumable / QueueEntry ────────────────────────────────────────────

/// What to do when a queued entry is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Resumable {
    /// Continue a suspended task from its cursor.
    Task(TaskId),
    /// Hand a finished root task's completion back to the driver.
    Driver(TaskId),
}

impl Resumable {
    pub fn task(self) -> TaskId {
        match self {
            Resumable::Task(id) | Resumable::Driver(id) => id,
        }
    }
}

/// A continuation waiting on one of the queues.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueEntry {
    pub due: VirtualTime,
    pub sequence: Sequence,
    pub resumable: Resumable,
}

impl QueueEntry {
    pub fn key(&self) -> (VirtualTime, Sequence) {
        (self.due, self.sequence)
    }
}

/// Natural order: earliest `(due, sequence)` first.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ── TieBreaker ────────────────────────────────────────────────────────

/// Picks which entry of a due-time bucket is released next.
#[derive(Debug, Clone)]
pub struct TieBreaker {
    policy: TieBreak,
    rng: Option<DeterministicRng>,
}

impl TieBreaker {
    pub fn new(policy: TieBreak) -> Self {
        TieBreaker {
            policy,
            rng: policy.rng(),
        }
    }

    pub fn policy(&self) -> TieBreak {
        self.policy
    }

    /// Index into a bucket of `len` entries sorted by sequence.
    fn pick(&mut self, len: usize) -> usize {
        match (self.policy, self.rng.as_mut()) {
            (TieBreak::Lifo, _) => len.saturating_sub(1),
            (TieBreak::Seeded(_), Some(rng)) => rng.next_index(len),
            _ => 0,
        }
    }
}

// ── Queues ────────────────────────────────────────────────────────────

/// Clock plus immediate and timer queues.
#[derive(Debug, Clone, Default)]
pub struct Queues {
    now: VirtualTime,
    seq_gen: SequenceGen,
    immediate: VecDeque<QueueEntry>,
    timers: BTreeMap<(VirtualTime, Sequence), Resumable>,
}

impl Queues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// The sequence the next enqueue will be assigned.
    pub fn next_sequence(&self) -> Sequence {
        self.seq_gen.peek()
    }

    /// Queue `resumable` to run at the current time, after everything
    /// already on the immediate queue.
    pub fn enqueue_immediate(&mut self, resumable: Resumable) -> Sequence {
        let sequence = self.seq_gen.next_seq();
        trace!(%sequence, now = %self.now, ?resumable, "enqueue immediate");
        self.immediate.push_back(QueueEntry {
            due: self.now,
            sequence,
            resumable,
        });
        sequence
    }

    /// Queue `resumable` on the timer queue, due `delay` ticks from now.
    pub fn enqueue_after(&mut self, delay: u64, resumable: Resumable) -> TurnstileResult<Sequence> {
        let due = self.now.checked_add(delay).ok_or(TurnstileError::TimeOverflow {
            now: self.now.ticks(),
            delay,
        })?;
        let sequence = self.seq_gen.next_seq();
        trace!(%sequence, %due, ?resumable, "enqueue timer");
        self.timers.insert((due, sequence), resumable);
        Ok(sequence)
    }

    /// Pop the next entry to dispatch.
    ///
    /// Drains the immediate queue first. When it is empty, advances the
    /// clock to the earliest timer and releases one entry of that bucket,
    /// chosen by `tie_break`. Returns `None` when both queues are empty.
    pub fn next_ready(&mut self, tie_break: &mut TieBreaker) -> Option<QueueEntry> {
        if let Some(entry) = self.immediate.pop_front() {
            return Some(entry);
        }
        self.release_timer(tie_break);
        self.immediate.pop_front()
    }

    fn release_timer(&mut self, tie_break: &mut TieBreaker) {
        let Some(&(due, _)) = self.timers.keys().next() else {
            return;
        };
        let bucket: Vec<Sequence> = self
            .timers
            .range((due, Sequence::MIN)..=(due, Sequence::MAX))
            .map(|(&(_, seq), _)| seq)
            .collect();
        let sequence = bucket[tie_break.pick(bucket.len())];
        let Some(resumable) = self.timers.remove(&(due, sequence)) else {
            return;
        };

        // Virtual time must never go backward.
        debug_assert!(due >= self.now, "timer due {} before now {}", due, self.now);
        if due > self.now {
            trace!(from = %self.now, to = %due, "clock advance");
            self.now = due;
        }
        self.immediate.push_back(QueueEntry {
            due,
            sequence,
            resumable,
        });
    }

    /// `true` when neither queue holds an entry.
    pub fn is_idle(&self) -> bool {
        self.immediate.is_empty() && self.timers.is_empty()
    }

    pub fn immediate_len(&self) -> usize {
        self.immediate.len()
    }

    pub fn timer_len(&self) -> usize {
        self.timers.len()
    }

    /// Total pending entries across both queues.
    pub fn len(&self) -> usize {
        self.immediate_len() + self.timer_len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_idle()
    }

    /// `true` if an entry with this sequence is waiting on either queue.
    pub fn contains(&self, sequence: Sequence) -> bool {
        self.immediate.iter().any(|e| e.sequence == sequence)
            || self.timers.keys().any(|&(_, s)| s == sequence)
    }

    /// Every pending entry, immediate queue first, then timers in
    /// `(due, sequence)` order. Useful for inspection in tests.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        let timers = self.timers.iter().map(|(&(due, sequence), &resumable)| QueueEntry {
            due,
            sequence,
            resumable,
        });
        self.immediate.iter().cloned().chain(timers).collect()
    }
}
