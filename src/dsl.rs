/// Fluent builder DSL for scripted programs.
///
/// Hides the `Step` plumbing when writing scenarios by hand. Every method
/// appends one step, so the builder reads top to bottom like the program
/// it describes.

use crate::task::{Program, Step};

/// Fluent builder for a [`Program`].
///
/// # Example
/// ```rust
/// use turnstile::dsl::ProgramBuilder;
///
/// let helper = ProgramBuilder::new("demo2bc")
///     .announce("b")
///     .sleep(100)
///     .announce("c")
///     .build();
///
/// let program = ProgramBuilder::new("demo2")
///     .announce("a")
///     .call(helper)
///     .announce("d")
///     .build();
///
/// assert_eq!(program.steps().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    name: String,
    steps: Vec<Step>,
}

impl ProgramBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ProgramBuilder {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append an arbitrary step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    // ── Output ────────────────────────────────────────────────

    pub fn emit(self, token: impl Into<String>) -> Self {
        self.step(Step::Emit(token.into()))
    }

    /// Emit `token` and raise the shared flag.
    pub fn announce(self, token: impl Into<String>) -> Self {
        self.step(Step::Announce(token.into()))
    }

    /// Emit whatever the last awaited or joined task returned.
    pub fn emit_result(self) -> Self {
        self.step(Step::EmitResult)
    }

    // ── Suspension ────────────────────────────────────────────

    /// Zero-delay suspension.
    pub fn yield_now(self) -> Self {
        self.step(Step::YieldImmediate)
    }

    /// Suspend for `ticks` of virtual time. `sleep(0)` is `yield_now()`.
    pub fn sleep(self, ticks: u64) -> Self {
        self.step(Step::YieldAfter(ticks))
    }

    // ── Nesting ───────────────────────────────────────────────

    /// Run `program` in place and wait for it.
    pub fn call(self, program: Program) -> Self {
        self.step(Step::AwaitTask(program))
    }

    /// Start `program` as a separate task. Spawns are numbered from 0 in
    /// the order they appear; pass that number to [`join`](Self::join).
    pub fn spawn(self, program: Program) -> Self {
        self.step(Step::Spawn(program))
    }

    pub fn join(self, spawn: usize) -> Self {
        self.step(Step::Join(spawn))
    }

    /// Finish with a result token. Steps after it never run.
    pub fn returns(self, token: impl Into<String>) -> Self {
        self.step(Step::Return(token.into()))
    }

    pub fn build(self) -> Program {
        Program::new(self.name, self.steps)
    }
}
