//! Scheduler configuration.
//!
//! The configuration controls every policy decision the engine makes:
//! - which queue zero-delay suspensions land on
//! - how entries sharing a due time are released
//! - the minimum delay of any timer
//! - the step limit of a single pump

use crate::rng::DeterministicRng;

/// Where `yield_immediate()` and `yield_after(0)` enqueue their continuation.
///
/// Both suspensions are equivalent; this only selects their shared channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "kebab-case"))]
pub enum ZeroDelay {
    /// A zero-delay timer, clamped by the timer granularity. Completion
    /// deliveries always drain before it fires.
    #[default]
    Timer,
    /// The immediate-continuation queue, interleaving in sequence order
    /// with completion deliveries.
    Immediate,
}

/// Release order for timer entries that share a due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "kebab-case"))]
pub enum TieBreak {
    /// Lowest sequence first (enqueue order).
    #[default]
    Fifo,
    /// Highest sequence first.
    Lifo,
    /// Uniform choice among the bucket, drawn from a seeded stream.
    Seeded(u64),
}

impl TieBreak {
    pub(crate) fn rng(self) -> Option<DeterministicRng> {
        match self {
            TieBreak::Seeded(seed) => Some(DeterministicRng::new(seed)),
            TieBreak::Fifo | TieBreak::Lifo => None,
        }
    }
}

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Channel shared by zero-delay suspensions.
    pub zero_delay: ZeroDelay,
    /// Release order within a due-time bucket.
    pub tie_break: TieBreak,
    /// Every timer delay is raised to at least this many ticks.
    pub timer_granularity: u64,
    /// Maximum entries a single pump call may dispatch.
    pub max_steps: Option<u64>,
}

impl SchedulerConfig {
    /// Default step limit for a single pump call.
    pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            zero_delay: ZeroDelay::Timer,
            tie_break: TieBreak::Fifo,
            timer_granularity: 1,
            max_steps: Some(Self::DEFAULT_MAX_STEPS),
        }
    }

    #[must_use]
    pub const fn zero_delay(mut self, channel: ZeroDelay) -> Self {
        self.zero_delay = channel;
        self
    }

    #[must_use]
    pub const fn tie_break(mut self, policy: TieBreak) -> Self {
        self.tie_break = policy;
        self
    }

    /// Shorthand for `tie_break(TieBreak::Seeded(seed))`.
    #[must_use]
    pub const fn seeded(self, seed: u64) -> Self {
        self.tie_break(TieBreak::Seeded(seed))
    }

    #[must_use]
    pub const fn timer_granularity(mut self, ticks: u64) -> Self {
        self.timer_granularity = ticks;
        self
    }

    #[must_use]
    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    #[must_use]
    pub const fn no_step_limit(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// The delay a timer actually waits for after granularity clamping.
    pub(crate) fn effective_delay(&self, delay: u64) -> u64 {
        delay.max(self.timer_granularity)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
