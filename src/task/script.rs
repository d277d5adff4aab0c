//! Scripted programs: a list of steps plus a cursor.

use crate::context::TaskCx;
use crate::error::{TurnstileError, TurnstileResult};

use super::body::{Body, Directive};
use super::id::TaskHandle;

// ── Step ──────────────────────────────────────────────────────────────

/// One step of a scripted program.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum Step {
    /// Append a token to the trace.
    Emit(String),
    /// Append a token, then raise the shared flag.
    Announce(String),
    /// Zero-delay suspension.
    YieldImmediate,
    /// Suspend for the given number of ticks.
    YieldAfter(u64),
    /// Run a nested program in place and wait for it.
    AwaitTask(Program),
    /// Start a program as a separate task without waiting for it.
    Spawn(Program),
    /// Wait for the n-th task this program spawned (0-based).
    Join(usize),
    /// Emit the result token of the last awaited or joined task, if any.
    EmitResult,
    /// Finish with a result token.
    Return(String),
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Emit(t) => write!(f, "emit({})", t),
            Step::Announce(t) => write!(f, "announce({})", t),
            Step::YieldImmediate => write!(f, "yield_immediate()"),
            Step::YieldAfter(d) => write!(f, "yield_after({})", d),
            Step::AwaitTask(p) => write!(f, "await_task({})", p.name()),
            Step::Spawn(p) => write!(f, "spawn({})", p.name()),
            Step::Join(i) => write!(f, "join({})", i),
            Step::EmitResult => write!(f, "emit_result()"),
            Step::Return(t) => write!(f, "return({})", t),
        }
    }
}

// ── Program ───────────────────────────────────────────────────────────

/// A named, immutable list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    name: String,
    steps: Vec<Step>,
}

impl Program {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Program {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Check that every `Join` names a task spawned earlier in the same
    /// program, recursing into nested programs.
    pub fn validate(&self) -> TurnstileResult<()> {
        let mut spawned = 0usize;
        for (pos, step) in self.steps.iter().enumerate() {
            match step {
                Step::Spawn(child) => {
                    child.validate()?;
                    spawned += 1;
                }
                Step::AwaitTask(child) => child.validate()?,
                Step::Join(slot) if *slot >= spawned => {
                    return Err(TurnstileError::InvalidProgram(format!(
                        "`{}` step {} joins spawn #{} but only {} spawned before it",
                        self.name, pos, slot, spawned
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Wrap the program in a fresh [`Script`] body.
    pub fn into_body(self) -> Box<dyn Body> {
        Box::new(Script::new(self))
    }
}

// ── Script ────────────────────────────────────────────────────────────

/// Body that executes a [`Program`] step by step.
///
/// Synchronous steps (`Emit`, `Announce`, `Spawn`, `EmitResult`) run back
/// to back inside one resume. The cursor stops after any step that hands
/// control back to the engine.
///
/// A nested program is moved into its own task when its step runs; the
/// script keeps only an empty program with the same name in its place.
#[derive(Debug, Clone)]
pub struct Script {
    program: Program,
    cursor: usize,
    spawned: Vec<TaskHandle>,
    last_result: Option<String>,
}

impl Script {
    pub fn new(program: Program) -> Self {
        Script {
            program,
            cursor: 0,
            spawned: Vec::new(),
            last_result: None,
        }
    }

    /// Index of the next step to run.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

/// Move `child` out of a step the cursor has already passed.
fn hand_off(child: &mut Program) -> Program {
    let placeholder = Program::new(child.name.clone(), Vec::new());
    std::mem::replace(child, placeholder)
}

impl Body for Script {
    fn name(&self) -> &str {
        self.program.name()
    }

    fn resume(&mut self, cx: &mut TaskCx<'_>) -> Directive {
        if let Some(result) = cx.take_received() {
            self.last_result = Some(result);
        }

        while self.cursor < self.program.steps.len() {
            let pos = self.cursor;
            self.cursor += 1;
            match &mut self.program.steps[pos] {
                Step::Emit(token) => cx.emit(token.clone()),
                Step::Announce(token) => cx.announce(token.clone()),
                Step::YieldImmediate => return Directive::Yield,
                Step::YieldAfter(delay) => return Directive::Sleep(*delay),
                Step::AwaitTask(child) => return Directive::Await(hand_off(child).into_body()),
                Step::Spawn(child) => {
                    let handle = cx.spawn(hand_off(child).into_body());
                    self.spawned.push(handle);
                }
                Step::Join(slot) => {
                    let slot = *slot;
                    return match self.spawned.get(slot) {
                        Some(&handle) => Directive::Join(handle),
                        None => Directive::Fault(TurnstileError::InvalidProgram(format!(
                            "`{}` joins spawn #{} which does not exist",
                            self.program.name, slot
                        ))),
                    };
                }
                Step::EmitResult => {
                    if let Some(result) = self.last_result.clone() {
                        cx.emit(result);
                    }
                }
                Step::Return(token) => return Directive::Complete(Some(token.clone())),
            }
        }
        Directive::Complete(None)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
