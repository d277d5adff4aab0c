//! `Ticker`: the background task racing the foreground scenarios.

use crate::context::TaskCx;

use super::body::{Body, Directive};

/// Token the ticker emits each time it finds the flag raised.
pub const TICK_TOKEN: &str = "in!";

/// Polls the shared flag on every zero-delay turn.
///
/// Each resume: if the flag is raised, clear it and emit `in!`; if the
/// driver signalled done, finish; otherwise yield with zero delay.
#[derive(Debug, Clone)]
pub struct Ticker {
    token: String,
    /// Number of times the flag has been checked.
    pub checks: u64,
    /// Number of tokens emitted.
    pub hits: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self::with_token(TICK_TOKEN)
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Ticker {
            token: token.into(),
            checks: 0,
            hits: 0,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl Body for Ticker {
    fn name(&self) -> &str {
        "ticker"
    }

    fn resume(&mut self, cx: &mut TaskCx<'_>) -> Directive {
        self.checks += 1;
        if cx.take_flag() {
            self.hits += 1;
            cx.emit(self.token.clone());
        }
        if cx.is_done() {
            return Directive::Complete(None);
        }
        Directive::Yield
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
