//! Tasks: resumable computations with explicit suspension points.
//!
//! A task is a [`Body`] state machine living in the engine's arena. The
//! engine resumes it, the body runs synchronously until it returns a
//! [`Directive`], and the directive decides how the task continues.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`TaskId`], [`TaskHandle`] |
//! | [`body`] | [`Body`] trait, [`Directive`] |
//! | [`arena`] | [`TaskArena`], [`TaskSlot`], [`TaskState`] |
//! | [`script`] | [`Program`], [`Step`], [`Script`] |
//! | [`ticker`] | [`Ticker`] background task |

pub mod arena;
pub mod body;
pub mod id;
pub mod script;
pub mod ticker;

pub use arena::{Awaiter, TaskArena, TaskSlot, TaskState};
pub use body::{Body, Directive};
pub use id::{TaskHandle, TaskId};
pub use script::{Program, Script, Step};
pub use ticker::{Ticker, TICK_TOKEN};
