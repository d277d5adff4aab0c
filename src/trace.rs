/// Trace sink.
///
/// Records every emitted token in cross-task emission order, with the
/// virtual time and the emitting task. Supports marks for slicing one
/// scenario's tokens out of a long-running engine, a deterministic digest
/// for replay comparison, and a line-oriented text export.

use std::io::{self, Write};

use crate::task::TaskId;
use crate::time::VirtualTime;

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// FNV-1a over a byte slice.
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── TraceEntry ────────────────────────────────────────────────────────

/// One emitted token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    pub time: VirtualTime,
    pub task: TaskId,
    pub token: String,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {}] {}", self.time, self.task, self.token)
    }
}

/// Position in a trace, taken with [`Trace::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TraceMark(usize);

// ── Trace ─────────────────────────────────────────────────────────────

/// Append-only record of emissions.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: VirtualTime, task: TaskId, token: String) {
        self.entries.push(TraceEntry { time, task, token });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current end of the trace.
    pub fn mark(&self) -> TraceMark {
        TraceMark(self.entries.len())
    }

    /// Tokens emitted at or after `mark`.
    pub fn tokens_since(&self, mark: TraceMark) -> Vec<&str> {
        self.entries
            .get(mark.0..)
            .unwrap_or_default()
            .iter()
            .map(|e| e.token.as_str())
            .collect()
    }

    /// Tokens emitted at or after `mark`, space separated.
    pub fn line_since(&self, mark: TraceMark) -> String {
        self.tokens_since(mark).join(" ")
    }

    /// The whole trace as one line.
    pub fn line(&self) -> String {
        self.line_since(TraceMark::default())
    }

    /// Deterministic hash over time, task and token of every entry.
    pub fn digest(&self) -> u64 {
        self.entries.iter().fold(0u64, |h, e| {
            let h = hash_combine(h, e.time.ticks());
            let h = hash_combine(h, e.task.raw());
            hash_combine(h, hash_bytes(e.token.as_bytes()))
        })
    }

    /// Write the trace in a line-oriented text format:
    ///
    /// ```text
    /// # TURNSTILE TRACE v1
    /// # entries: 2
    /// 0 1 a
    /// 1 0 in!
    /// ```
    ///
    /// Each line is `<time> <task> <token>`.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# TURNSTILE TRACE v1")?;
        writeln!(w, "# entries: {}", self.entries.len())?;
        for e in &self.entries {
            writeln!(w, "{} {} {}", e.time.ticks(), e.task.raw(), e.token)?;
        }
        Ok(())
    }
}
